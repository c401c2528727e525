use crate::{
    AsValue, ColumnDef, Driver, Error, Executor, QuerySet, Result, Row, RowLabeled,
    RowsAffected, TableRef, Value,
};
use std::future::Future;

/// Conversion of a result row into the shape requested by the caller.
///
/// Model instances, labeled rows (`values()`), bare rows (`values_list()`) and single
/// scalars (flat `values_list()`) all come from the same [`RowLabeled`].
pub trait FromRow: Sized + Send {
    fn from_row(row: RowLabeled) -> Result<Self>;
}

impl FromRow for RowLabeled {
    fn from_row(row: RowLabeled) -> Result<Self> {
        Ok(row)
    }
}

impl FromRow for Row {
    fn from_row(row: RowLabeled) -> Result<Self> {
        Ok(row.values)
    }
}

impl<T: AsValue + Send> FromRow for T {
    fn from_row(row: RowLabeled) -> Result<Self> {
        let Some(value) = row.values.into_vec().into_iter().next() else {
            return Err(Error::msg("The row does not have any column"));
        };
        T::try_from_value(value)
    }
}

impl<A: AsValue + Send, B: AsValue + Send> FromRow for (A, B) {
    fn from_row(row: RowLabeled) -> Result<Self> {
        let mut values = row.values.into_vec().into_iter();
        match (values.next(), values.next()) {
            (Some(a), Some(b)) => Ok((A::try_from_value(a)?, B::try_from_value(b)?)),
            _ => Err(Error::msg("The row has less than 2 columns")),
        }
    }
}

impl<A: AsValue + Send, B: AsValue + Send, C: AsValue + Send> FromRow for (A, B, C) {
    fn from_row(row: RowLabeled) -> Result<Self> {
        let mut values = row.values.into_vec().into_iter();
        match (values.next(), values.next(), values.next()) {
            (Some(a), Some(b), Some(c)) => Ok((
                A::try_from_value(a)?,
                B::try_from_value(b)?,
                C::try_from_value(c)?,
            )),
            _ => Err(Error::msg("The row has less than 3 columns")),
        }
    }
}

/// Take the value of column `name` out of `row` and convert it.
pub fn take_column<T: AsValue>(row: &mut RowLabeled, name: &str) -> Result<T> {
    let Some(i) = row.labels.iter().position(|v| v == name) else {
        return Err(Error::msg(format!(
            "Column `{}` is missing from the row {:?}",
            name,
            row.labels.as_ref()
        )));
    };
    T::try_from_value(std::mem::take(&mut row.values[i]))
}

/// A table mapped to a Rust type.
pub trait Model: FromRow + Send + Sync + Sized + 'static {
    fn table_ref() -> &'static TableRef;
    fn columns() -> &'static [ColumnDef];
    fn primary_key_def() -> &'static ColumnDef;

    /// Column values for an `INSERT`, an unset auto primary key is left out.
    fn row(&self) -> Vec<(&'static str, Value)>;
    fn primary_key(&self) -> Value;

    /// Lazy query over every row of the table.
    fn objects() -> QuerySet<Self> {
        QuerySet::new()
    }

    fn create_table<E: Executor>(
        executor: &mut E,
        if_not_exists: bool,
    ) -> impl Future<Output = Result<()>> + Send {
        async move {
            let mut query = String::with_capacity(512);
            executor
                .driver()
                .dialect()?
                .sql_writer()
                .write_create_table(&mut query, Self::table_ref(), Self::columns(), if_not_exists);
            executor.execute(query).await.map(|_| ())
        }
    }

    fn drop_table<E: Executor>(
        executor: &mut E,
        if_exists: bool,
    ) -> impl Future<Output = Result<()>> + Send {
        async move {
            let mut query = String::with_capacity(64);
            executor
                .driver()
                .dialect()?
                .sql_writer()
                .write_drop_table(&mut query, Self::table_ref(), if_exists);
            executor.execute(query).await.map(|_| ())
        }
    }

    fn insert_one<E: Executor>(
        executor: &mut E,
        model: &Self,
    ) -> impl Future<Output = Result<RowsAffected>> + Send {
        let rows = [model.row()];
        async move {
            let mut query = String::with_capacity(256);
            executor.driver().dialect()?.sql_writer().write_insert(
                &mut query,
                Self::table_ref(),
                Self::columns(),
                &rows,
            );
            executor.execute(query).await
        }
    }

    fn insert_many<'a, E, It>(
        executor: &mut E,
        items: It,
    ) -> impl Future<Output = Result<RowsAffected>> + Send
    where
        E: Executor,
        It: IntoIterator<Item = &'a Self>,
    {
        let rows = items.into_iter().map(Self::row).collect::<Vec<_>>();
        async move {
            if rows.is_empty() {
                return Ok(RowsAffected::default());
            }
            let mut query = String::with_capacity(128 + rows.len() * 64);
            executor.driver().dialect()?.sql_writer().write_insert(
                &mut query,
                Self::table_ref(),
                Self::columns(),
                &rows,
            );
            executor.execute(query).await
        }
    }
}
