use crate::decode_value;
use mysql_async::FromRowError;
use reprise_core::{Row, RowLabeled, RowNames};

pub(crate) struct RowWrap(pub(crate) RowLabeled);

impl mysql_async::prelude::FromRow for RowWrap {
    fn from_row_opt(mut row: mysql_async::Row) -> Result<Self, FromRowError>
    where
        Self: Sized,
    {
        let columns = row.columns();
        let names: RowNames = columns.iter().map(|v| v.name_str().into_owned()).collect();
        let mut values = Vec::with_capacity(columns.len());
        for (i, column) in columns.iter().enumerate() {
            let Some(value) = row.take::<mysql_async::Value, _>(i) else {
                return Err(FromRowError(row));
            };
            match decode_value(value, column) {
                Some(value) => values.push(value),
                None => return Err(FromRowError(row)),
            }
        }
        Ok(RowWrap(RowLabeled::new(names, Row::from(values))))
    }
}
