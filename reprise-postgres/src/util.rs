use crate::ValueHolder;
use async_stream::try_stream;
use reprise_core::{
    Error, QueryResult, Result, Row, RowLabeled, RowNames, RowsAffected,
    stream::{Stream, StreamExt},
};
use std::pin::pin;
use tokio_postgres::SimpleQueryMessage;

pub(crate) fn row_to_reprise_row(row: tokio_postgres::Row) -> Result<Row> {
    (0..row.len())
        .map(|i| match row.try_get::<_, ValueHolder>(i) {
            Ok(v) => Ok(v.0),
            Err(..) => {
                let col = &row.columns()[i];
                Err(Error::msg(format!(
                    "Could not deserialize column {} `{}`: {}",
                    i,
                    col.name(),
                    col.type_()
                )))
            }
        })
        .collect::<Result<Row>>()
}

/// Rows of the extended protocol, labeled once from the first row.
pub(crate) fn stream_postgres_rows<V>(
    stream: impl AsyncFnOnce() -> Result<V>,
) -> impl Stream<Item = Result<RowLabeled>>
where
    V: Stream<Item = std::result::Result<tokio_postgres::Row, tokio_postgres::Error>>,
{
    try_stream! {
        let stream = stream().await?;
        let mut stream = pin!(stream);
        let mut labels: Option<RowNames> = None;
        while let Some(row) = stream.next().await.transpose()? {
            let labels = labels.get_or_insert_with(|| {
                row.columns().iter().map(|c| c.name().to_string()).collect()
            });
            yield RowLabeled::new(labels.clone(), row_to_reprise_row(row)?);
        }
    }
}

/// Messages of the simple protocol, text cells become [`reprise_core::Value::Unknown`].
pub(crate) fn stream_postgres_simple_messages<V>(
    stream: impl AsyncFnOnce() -> Result<V>,
) -> impl Stream<Item = Result<QueryResult>>
where
    V: Stream<Item = std::result::Result<SimpleQueryMessage, tokio_postgres::Error>>,
{
    try_stream! {
        let stream = stream().await?;
        let mut stream = pin!(stream);
        let mut labels: Option<RowNames> = None;
        while let Some(message) = stream.next().await.transpose()? {
            match message {
                SimpleQueryMessage::RowDescription(columns) => {
                    labels = Some(columns.iter().map(|c| c.name().to_string()).collect());
                }
                SimpleQueryMessage::Row(row) => {
                    let labels = labels.get_or_insert_with(|| {
                        row.columns().iter().map(|c| c.name().to_string()).collect()
                    });
                    let values = (0..row.len())
                        .map(|i| reprise_core::Value::Unknown(row.get(i).map(Into::into)))
                        .collect::<Row>();
                    yield QueryResult::Row(RowLabeled::new(labels.clone(), values));
                }
                SimpleQueryMessage::CommandComplete(rows_affected) => {
                    labels = None;
                    yield QueryResult::Affected(RowsAffected {
                        rows_affected,
                        last_affected_id: None,
                    });
                }
                _ => {}
            }
        }
    }
}
