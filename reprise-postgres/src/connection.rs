use crate::{
    PostgresDriver,
    util::{stream_postgres_rows, stream_postgres_simple_messages},
};
use openssl::ssl::{SslConnector, SslFiletype, SslMethod, SslVerifyMode};
use postgres_openssl::MakeTlsConnector;
use reprise_core::{
    Connection, ConnectionHandle, Error, ErrorContext, Executor, QueryResult, Result, RowLabeled,
    parse_connection_url,
    stream::{Stream, TryStreamExt},
    truncate_long,
};
use std::{borrow::Cow, env, path::Path, sync::Arc};
use tokio::spawn;
use tokio_postgres::{NoTls, types::ToSql};

/// One physical Postgres session.
///
/// Statements prepared with `PREPARE` live as long as this session, the connection handle
/// identifies it for the statements pool.
pub struct PostgresConnection {
    pub(crate) client: tokio_postgres::Client,
    handle: ConnectionHandle,
}

impl Executor for PostgresConnection {
    type Driver = PostgresDriver;

    fn driver(&self) -> &Self::Driver {
        &PostgresDriver {}
    }

    fn handle(&self) -> &ConnectionHandle {
        &self.handle
    }

    fn run(&mut self, query: String) -> impl Stream<Item = Result<QueryResult>> + Send {
        let context = Arc::new(format!("While running the query:\n{}", truncate_long!(query)));
        stream_postgres_simple_messages(async move || {
            self.client
                .simple_query_raw(&query)
                .await
                .map_err(Into::into)
        })
        .map_err(move |e: Error| {
            let e = e.context(context.clone());
            log::error!("{:#}", e);
            e
        })
    }

    fn fetch(&mut self, query: String) -> impl Stream<Item = Result<RowLabeled>> + Send {
        let context = Arc::new(format!("While fetching the query:\n{}", truncate_long!(query)));
        stream_postgres_rows(async move || {
            self.client
                .query_raw(&query, Vec::<&(dyn ToSql + Sync)>::new())
                .await
                .map_err(Into::into)
        })
        .map_err(move |e: Error| {
            let e = e.context(context.clone());
            log::error!("{:#}", e);
            e
        })
    }
}

impl Connection for PostgresConnection {
    #[allow(refining_impl_trait)]
    async fn connect(url: Cow<'static, str>) -> Result<PostgresConnection> {
        let context = || format!("While trying to connect to `{}`", truncate_long!(url));
        let mut url = parse_connection_url::<PostgresDriver>(&url).with_context(context)?;
        let mut take_url_param = |key: &str, env_var: &str| {
            let mut value = None;
            let mut pairs: Vec<(String, String)> = url
                .query_pairs()
                .map(|(k, v)| (k.into(), v.into()))
                .collect();
            if let Some(pos) = pairs.iter().position(|(k, _)| k == key) {
                let (_, v) = pairs.remove(pos);
                value = Some(v);
            }
            if pairs.is_empty() {
                url.set_query(None);
            } else {
                url.query_pairs_mut()
                    .clear()
                    .extend_pairs(pairs.iter().map(|(k, v)| (k.as_str(), v.as_str())));
            }
            value.or_else(|| env::var(env_var).ok())
        };
        let sslmode = take_url_param("sslmode", "PGSSLMODE").unwrap_or("disable".into());
        let client = if sslmode == "disable" {
            let (client, connection) = tokio_postgres::connect(url.as_str(), NoTls)
                .await
                .with_context(context)?;
            spawn(async move {
                if let Err(e) = connection.await
                    && !e.is_closed()
                {
                    log::error!("Postgres connection error: {:#}", e);
                }
            });
            client
        } else {
            let mut builder = SslConnector::builder(SslMethod::tls())?;
            if let Some(path) = take_url_param("sslrootcert", "PGSSLROOTCERT")
                .as_deref()
                .map(Path::new)
                && path.exists()
            {
                builder.set_ca_file(path)?;
            }
            if let Some(path) = take_url_param("sslcert", "PGSSLCERT")
                .as_deref()
                .map(Path::new)
                && path.exists()
            {
                builder.set_certificate_chain_file(path)?;
            }
            if let Some(path) = take_url_param("sslkey", "PGSSLKEY")
                .as_deref()
                .map(Path::new)
                && path.exists()
            {
                builder.set_private_key_file(path, SslFiletype::PEM)?;
            }
            builder.set_verify(match &*sslmode {
                "require" | "prefer" | "allow" => SslVerifyMode::NONE,
                _ => SslVerifyMode::PEER,
            });
            let connector = MakeTlsConnector::new(builder.build());
            let (client, connection) = tokio_postgres::connect(url.as_str(), connector)
                .await
                .with_context(context)?;
            spawn(async move {
                if let Err(e) = connection.await
                    && !e.is_closed()
                {
                    log::error!("Postgres connection error: {:#}", e);
                }
            });
            client
        };
        let handle = ConnectionHandle::new();
        log::debug!("Connected to Postgres, connection {}", handle.id());
        Ok(Self { client, handle })
    }
}
