use crate::{MySqlDriver, RowWrap};
use async_stream::try_stream;
use mysql_async::{Conn, Opts, prelude::Queryable};
use reprise_core::{
    Connection, ConnectionHandle, Error, ErrorContext, Executor, QueryResult, Result,
    RowsAffected, StatementsPool, parse_connection_url,
    stream::{Stream, StreamExt, TryStreamExt},
    truncate_long,
};
use std::{borrow::Cow, sync::Arc};

/// One MySQL session, its prepared statements and `@p` variables are private to it.
pub struct MySqlConnection {
    pub(crate) connection: Conn,
    handle: ConnectionHandle,
}

impl Executor for MySqlConnection {
    type Driver = MySqlDriver;

    fn driver(&self) -> &Self::Driver {
        &MySqlDriver {}
    }

    fn handle(&self) -> &ConnectionHandle {
        &self.handle
    }

    fn run(&mut self, query: String) -> impl Stream<Item = Result<QueryResult>> + Send {
        let context = Arc::new(format!("While running the query:\n{}", truncate_long!(query)));
        try_stream! {
            let mut result = self.connection.query_iter(query).await?;
            let mut rows = 0;
            while let Some(mut stream) = result.stream::<RowWrap>().await? {
                while let Some(row) = stream.next().await.transpose()? {
                    rows += 1;
                    yield QueryResult::Row(row.0);
                }
            }
            if rows == 0 {
                yield QueryResult::Affected(RowsAffected {
                    rows_affected: result.affected_rows(),
                    last_affected_id: result.last_insert_id().map(|v| v as _),
                });
            }
        }
        .map_err(move |e: Error| {
            let e = e.context(context.clone());
            log::error!("{:#}", e);
            e
        })
    }
}

impl Connection for MySqlConnection {
    async fn connect(url: Cow<'static, str>) -> Result<MySqlConnection> {
        let context = || format!("While trying to connect to `{}`", truncate_long!(url));
        let url = parse_connection_url::<MySqlDriver>(&url).with_context(context)?;
        let config = Opts::from_url(url.as_str()).with_context(context)?;
        let connection = Conn::new(config).await.with_context(context)?;
        let handle = ConnectionHandle::new();
        log::debug!("Connected to MySQL, connection {}", handle.id());
        Ok(MySqlConnection { connection, handle })
    }

    async fn disconnect(self, pool: &StatementsPool) -> Result<()> {
        pool.notify_on_close(&self.handle);
        self.connection.disconnect().await.map_err(|e| {
            let e = Error::new(e).context("While closing the MySQL connection");
            log::error!("{:#}", e);
            e
        })
    }
}
