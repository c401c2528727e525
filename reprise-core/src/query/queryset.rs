use crate::{
    Arguments, AsValue, BinaryOpType, Bound, ColumnDef, CompiledPrepareArtifact, Dialect, Driver,
    Error, ExecuteCompiler, Executor, Expression, FromRow, GeneratedSql, GenericSqlWriter,
    LogicalQuery, Model, Order, Ordered, PrepareCompiler, PreparedError, Result, RowLabeled,
    RowsAffected, SharedExpression, StatementsPool, Value,
    future::TryFutureExt,
    stream::{Stream, StreamExt, TryStreamExt},
    truncate_long,
};
use async_stream::try_stream;
use std::{
    collections::HashMap,
    fmt::{self, Display, Formatter},
    marker::PhantomData,
    pin::pin,
    sync::Arc,
};

/// Rows fetched by `get()` to tell "one" from "many".
const MAX_GET_RESULTS: u64 = 21;

#[derive(Debug, Clone)]
struct PreparedPhase {
    query: LogicalQuery,
    artifact: Arc<CompiledPrepareArtifact>,
    dialect: Arc<dyn Dialect>,
}

#[derive(Debug, Clone)]
enum Phase {
    Building(LogicalQuery),
    Prepared(PreparedPhase),
}

/// Lazy query over the rows of `M`.
///
/// A query set is a value: every builder method returns a new one and leaves the receiver
/// untouched. Once [`prepare`](QuerySet::prepare)d its shape is frozen, only
/// [`execute`](QuerySet::execute), [`execute_iterator`](QuerySet::execute_iterator) and
/// the read only accessors are allowed.
pub struct QuerySet<M> {
    phase: Phase,
    _model: PhantomData<fn() -> M>,
}

impl<M> Clone for QuerySet<M> {
    fn clone(&self) -> Self {
        Self {
            phase: self.phase.clone(),
            _model: PhantomData,
        }
    }
}

impl<M: Model> Default for QuerySet<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M: Model> QuerySet<M> {
    pub fn new() -> Self {
        Self::from_query(LogicalQuery::new(
            M::table_ref(),
            M::columns(),
            M::primary_key_def(),
        ))
    }

    pub fn from_query(query: LogicalQuery) -> Self {
        Self {
            phase: Phase::Building(query),
            _model: PhantomData,
        }
    }

    /// The logical query, in either phase.
    pub fn query(&self) -> &LogicalQuery {
        match &self.phase {
            Phase::Building(query) => query,
            Phase::Prepared(prepared) => &prepared.query,
        }
    }

    fn building(&self, operation: &'static str) -> Result<&LogicalQuery> {
        match &self.phase {
            Phase::Building(query) => Ok(query),
            Phase::Prepared(..) => {
                Err(PreparedError::OperationOnPreparedStatement { operation }.into())
            }
        }
    }

    /// Copy of the logical query changed by `f`, detached from the compiled statement.
    fn narrowed<F>(&self, operation: &'static str, f: F) -> Result<LogicalQuery>
    where
        F: FnOnce(&mut LogicalQuery) -> Result<()>,
    {
        let mut query = self.building(operation)?.clone();
        query.invalidate();
        f(&mut query)?;
        Ok(query)
    }

    fn derive<F>(&self, operation: &'static str, f: F) -> Result<Self>
    where
        F: FnOnce(&mut LogicalQuery) -> Result<()>,
    {
        self.narrowed(operation, f).map(Self::from_query)
    }

    pub fn filter(&self, condition: impl Expression + 'static) -> Result<Self> {
        self.derive("filter", |query| {
            query.add_condition(Arc::new(condition), BinaryOpType::And)
        })
    }

    pub fn exclude(&self, condition: impl Expression + 'static) -> Result<Self> {
        self.derive("exclude", |query| query.exclude(Arc::new(condition)))
    }

    pub fn order_by<E: Expression + 'static>(&self, ordered: Ordered<E>) -> Result<Self> {
        self.derive("order_by", |query| {
            query.add_ordering(Ordered {
                order: ordered.order,
                expression: Arc::new(ordered.expression) as SharedExpression,
            })
        })
    }

    pub fn annotate(
        &self,
        alias: impl Into<String>,
        expression: impl Expression + 'static,
    ) -> Result<Self> {
        self.derive("annotate", |query| {
            query.annotate(alias.into(), Arc::new(expression))
        })
    }

    fn project(&self, operation: &'static str, fields: &[&'static ColumnDef]) -> Result<Self> {
        self.derive(operation, |query| {
            query.fields = Some(fields.to_vec());
            Ok(())
        })
    }

    /// Select only `fields`, rows are read as [`RowLabeled`].
    pub fn values(&self, fields: &[&'static ColumnDef]) -> Result<Self> {
        self.project("values", fields)
    }

    /// Select only `fields`, rows are read as tuples or scalars.
    pub fn values_list(&self, fields: &[&'static ColumnDef]) -> Result<Self> {
        self.project("values_list", fields)
    }

    /// Load only `fields` and the primary key.
    pub fn only(&self, fields: &[&'static ColumnDef]) -> Result<Self> {
        self.derive("only", |query| {
            let mut selected = Vec::with_capacity(fields.len() + 1);
            if !fields.iter().any(|v| v.is_primary_key()) {
                selected.push(query.primary_key);
            }
            selected.extend_from_slice(fields);
            query.fields = Some(selected);
            Ok(())
        })
    }

    /// Load everything but `fields`.
    pub fn defer(&self, fields: &[&'static ColumnDef]) -> Result<Self> {
        self.derive("defer", |query| {
            let current = match &query.fields {
                Some(current) => current.clone(),
                None => query.model_columns.iter().collect(),
            };
            query.fields = Some(
                current
                    .into_iter()
                    .filter(|v| {
                        v.is_primary_key() || !fields.iter().any(|f| f.column_ref == v.column_ref)
                    })
                    .collect(),
            );
            Ok(())
        })
    }

    pub fn select_related(&self, relations: &[&'static str]) -> Result<Self> {
        self.derive("select_related", |query| {
            query.related.extend_from_slice(relations);
            Ok(())
        })
    }

    pub fn prefetch_related(&self, relations: &[&'static str]) -> Result<Self> {
        self.derive("prefetch_related", |query| {
            query.related.extend_from_slice(relations);
            Ok(())
        })
    }

    pub fn distinct(&self) -> Result<Self> {
        self.derive("distinct", |query| {
            query.distinct = true;
            Ok(())
        })
    }

    pub fn reverse(&self) -> Result<Self> {
        self.derive("reverse", |query| {
            query.reverse();
            Ok(())
        })
    }

    pub fn using(&self, database: impl Into<String>) -> Result<Self> {
        self.derive("using", |query| {
            query.database = Some(database.into());
            Ok(())
        })
    }

    /// Query set matching no row.
    pub fn none(&self) -> Result<Self> {
        self.derive("none", |query| {
            query.add_condition(Arc::new(false), BinaryOpType::And)
        })
    }

    fn combine(&self, operation: &'static str, other: &Self, op: BinaryOpType) -> Result<Self> {
        let other = other.building(operation)?;
        self.derive(operation, |query| query.combine(other, op))
    }

    /// Rows matched by both query sets.
    pub fn and(&self, other: &Self) -> Result<Self> {
        self.combine("and", other, BinaryOpType::And)
    }

    /// Rows matched by either query set.
    pub fn or(&self, other: &Self) -> Result<Self> {
        self.combine("or", other, BinaryOpType::Or)
    }

    /// Rows `low..high` of the current rows.
    pub fn slice(&self, low: impl Into<Bound>, high: Option<Bound>) -> Result<Self> {
        self.derive("slice", |query| query.slice(low.into(), high))
    }

    pub fn limit(&self, count: impl Into<Bound>) -> Result<Self> {
        self.derive("limit", |query| {
            query.slice(Bound::Value(0), Some(count.into()))
        })
    }

    pub fn offset(&self, skip: impl Into<Bound>) -> Result<Self> {
        self.derive("offset", |query| query.slice(skip.into(), None))
    }

    async fn load<T: FromRow, E: Executor>(executor: &mut E, query: &LogicalQuery) -> Result<Vec<T>> {
        let dialect = executor.driver().dialect()?;
        let writer = dialect.sql_writer();
        let sql = query.generate_select(writer).inline(writer)?;
        executor
            .fetch(sql)
            .map(|v| v.and_then(T::from_row))
            .try_collect()
            .await
    }

    pub async fn count<E: Executor>(&self, executor: &mut E) -> Result<u64> {
        let query = self.building("count")?;
        let dialect = executor.driver().dialect()?;
        let writer = dialect.sql_writer();
        let sql = query.generate_count(writer).inline(writer)?;
        let rows: Vec<RowLabeled> = executor.fetch(sql).try_collect().await?;
        let Some(value) = rows
            .into_iter()
            .next()
            .and_then(|v| v.values.into_vec().into_iter().next())
        else {
            return Err(Error::msg("The count query did not return any row"));
        };
        u64::try_from_value(value)
    }

    pub async fn exists<E: Executor>(&self, executor: &mut E) -> Result<bool> {
        let query = self.narrowed("exists", |query| {
            query.slice(Bound::Value(0), Some(Bound::Value(1)))
        })?;
        Ok(!Self::load::<RowLabeled, E>(executor, &query).await?.is_empty())
    }

    /// The single row matched, fails when there are none or more than one.
    pub async fn get<E: Executor>(&self, executor: &mut E) -> Result<M> {
        let query = self.narrowed("get", |query| {
            query.slice(Bound::Value(0), Some(Bound::Value(MAX_GET_RESULTS)))
        })?;
        let rows = Self::load::<M, E>(executor, &query).await?;
        let len = rows.len();
        let mut rows = rows.into_iter();
        match (rows.next(), len) {
            (Some(row), 1) => Ok(row),
            (None, ..) => Err(Error::msg(format!(
                "{} matching query does not exist",
                M::table_ref().full_name()
            ))),
            (.., len) => Err(Error::msg(format!(
                "get() returned more than one {}, it returned {}{}",
                M::table_ref().full_name(),
                if len as u64 >= MAX_GET_RESULTS {
                    "more than "
                } else {
                    ""
                },
                len.min(MAX_GET_RESULTS as usize - 1)
            ))),
        }
    }

    /// First row, by primary key unless ordered.
    pub async fn first<E: Executor>(&self, executor: &mut E) -> Result<Option<M>> {
        let query = self.narrowed("first", |query| {
            if query.order_by.is_empty() && !query.is_sliced() {
                query.add_ordering(Ordered {
                    order: Order::ASC,
                    expression: Arc::new(*query.primary_key),
                })?;
            }
            query.slice(Bound::Value(0), Some(Bound::Value(1)))
        })?;
        Ok(Self::load::<M, E>(executor, &query).await?.into_iter().next())
    }

    /// Last row, by primary key unless ordered.
    pub async fn last<E: Executor>(&self, executor: &mut E) -> Result<Option<M>> {
        let query = self.narrowed("last", |query| {
            query.reverse();
            query.slice(Bound::Value(0), Some(Bound::Value(1)))
        })?;
        Ok(Self::load::<M, E>(executor, &query).await?.into_iter().next())
    }

    pub async fn all<E: Executor>(&self, executor: &mut E) -> Result<Vec<M>> {
        Self::load(executor, self.building("all")?).await
    }

    /// Every row read as `T`, the shape matching `values()` or `values_list()`.
    pub async fn all_as<T: FromRow, E: Executor>(&self, executor: &mut E) -> Result<Vec<T>> {
        Self::load(executor, self.building("all")?).await
    }

    /// Stream the rows without collecting them.
    pub fn iter<'e, E: Executor>(
        &self,
        executor: &'e mut E,
    ) -> Result<impl Stream<Item = Result<M>> + Send + use<'e, M, E>> {
        let query = self.building("iter")?;
        let dialect = executor.driver().dialect()?;
        let writer = dialect.sql_writer();
        let sql = query.generate_select(writer).inline(writer)?;
        Ok(executor.fetch(sql).map(|v| v.and_then(M::from_row)))
    }

    /// Row at `index`, `None` past the end.
    pub async fn get_index<E: Executor>(&self, executor: &mut E, index: u64) -> Result<Option<M>> {
        let query = self.narrowed("get_index", |query| {
            query.slice(Bound::Value(index), Some(Bound::Value(index.saturating_add(1))))
        })?;
        Ok(Self::load::<M, E>(executor, &query).await?.into_iter().next())
    }

    pub async fn create<E: Executor>(&self, executor: &mut E, model: &M) -> Result<RowsAffected> {
        self.building("create")?;
        M::insert_one(executor, model).await
    }

    pub async fn update<E: Executor>(
        &self,
        executor: &mut E,
        assignments: &[(&ColumnDef, &dyn Expression)],
    ) -> Result<RowsAffected> {
        let query = self.building("update")?;
        let dialect = executor.driver().dialect()?;
        let writer = dialect.sql_writer();
        let sql = query.generate_update(writer, assignments)?.inline(writer)?;
        executor.execute(sql).await
    }

    pub async fn delete<E: Executor>(&self, executor: &mut E) -> Result<RowsAffected> {
        let query = self.building("delete")?;
        let dialect = executor.driver().dialect()?;
        let writer = dialect.sql_writer();
        let sql = query.generate_delete(writer)?.inline(writer)?;
        executor.execute(sql).await
    }

    /// Run `sql` as is and read the rows as `T`.
    pub async fn raw<T: FromRow, E: Executor>(
        &self,
        executor: &mut E,
        sql: impl Into<String>,
    ) -> Result<Vec<T>> {
        self.building("raw")?;
        executor
            .fetch(sql.into())
            .map(|v| v.and_then(T::from_row))
            .try_collect()
            .await
    }

    /// Compile the query for the engine behind `executor`.
    pub fn prepare<E: Executor>(&self, executor: &E) -> Result<Self> {
        self.prepare_with(executor.driver().dialect()?)
    }

    /// Compile the query with `dialect`, preparing a prepared query set again returns it.
    pub fn prepare_with(&self, dialect: Arc<dyn Dialect>) -> Result<Self> {
        let query = match &self.phase {
            Phase::Prepared(prepared) if prepared.dialect.vendor() == dialect.vendor() => {
                return Ok(self.clone());
            }
            Phase::Prepared(prepared) => &prepared.query,
            Phase::Building(query) => query,
        };
        let artifact = PrepareCompiler::compile(query, dialect.as_ref())?;
        Ok(Self {
            phase: Phase::Prepared(PreparedPhase {
                query: query.clone(),
                artifact,
                dialect,
            }),
            _model: PhantomData,
        })
    }

    pub fn is_prepared(&self) -> bool {
        matches!(self.phase, Phase::Prepared(..))
    }

    pub fn artifact(&self) -> Option<&Arc<CompiledPrepareArtifact>> {
        match &self.phase {
            Phase::Prepared(prepared) => Some(&prepared.artifact),
            Phase::Building(..) => None,
        }
    }

    pub fn statement_name(&self) -> Option<&str> {
        self.artifact().map(|v| v.name.as_str())
    }

    /// The `PREPARE` statement.
    pub fn sql(&self) -> Option<&str> {
        self.artifact().map(|v| v.statement_sql.as_str())
    }

    /// Names of the bind parameters, in registration order.
    pub fn param_names(&self) -> Vec<&str> {
        self.query().params.names().collect()
    }

    /// Check that `arguments` names exactly the parameters, then clean every value.
    fn clean_arguments(
        query: &LogicalQuery,
        arguments: &Arguments,
    ) -> Result<HashMap<String, Vec<Value>>> {
        let matches = arguments.len() == query.params.len()
            && query.params.names().all(|v| arguments.contains(v));
        if !matches {
            let mut expected = query.params.names().map(String::from).collect::<Vec<_>>();
            let mut received = arguments.names().map(String::from).collect::<Vec<_>>();
            expected.sort();
            received.sort();
            return Err(PreparedError::IncorrectBindParameter { expected, received }.into());
        }
        let mut cleaned = HashMap::with_capacity(query.params.len());
        for param in query.params.iter() {
            if let Some(argument) = arguments.get(param.name()) {
                cleaned.insert(param.name().to_string(), param.clean(argument)?);
            }
        }
        Ok(cleaned)
    }

    /// Run the prepared statement and stream the rows.
    ///
    /// The arguments are checked before anything is sent. The statement is prepared on the
    /// connection behind `executor` the first time `pool` sees it there.
    pub fn execute_iterator<'e, T, E>(
        &self,
        executor: &'e mut E,
        pool: &'e StatementsPool,
        arguments: &Arguments,
    ) -> Result<impl Stream<Item = Result<T>> + Send + use<'e, M, T, E>>
    where
        T: FromRow + 'e,
        E: Executor,
    {
        let Phase::Prepared(prepared) = &self.phase else {
            return Err(PreparedError::QueryNotPrepared.into());
        };
        let cleaned = Self::clean_arguments(&prepared.query, arguments)?;
        let statement =
            ExecuteCompiler::compile(&prepared.artifact, prepared.dialect.as_ref(), &cleaned)?;
        let artifact = prepared.artifact.clone();
        let context = format!(
            "While executing the prepared statement `{}`",
            truncate_long!(artifact.statement_sql)
        );
        let stream = try_stream! {
            let handle = executor.handle().clone();
            pool.ensure_prepared(&handle, &artifact.name, || {
                log::debug!("{}", truncate_long!(artifact.statement_sql));
                executor
                    .execute(artifact.statement_sql.clone())
                    .map_ok(|_| ())
            })
            .await?;
            if let Some(setup) = statement.setup {
                log::debug!("{}", truncate_long!(setup));
                if let Err(e) = executor.execute(setup).await {
                    if let Some(cleanup) = statement.cleanup
                        && let Err(cleanup_error) = executor.execute(cleanup).await
                    {
                        log::warn!("Ignoring the failure of the cleanup: {:#}", cleanup_error);
                    }
                    Err::<(), Error>(e)?;
                }
            }
            log::debug!("{}", truncate_long!(statement.sql));
            let rows = executor.fetch(statement.sql);
            let mut rows = pin!(rows);
            while let Some(row) = rows.next().await.transpose()? {
                yield T::from_row(row)?;
            }
        };
        Ok(stream.map_err(move |e: Error| e.context(context.clone())))
    }

    /// Run the prepared statement and collect the rows.
    pub async fn execute<T: FromRow, E: Executor>(
        &self,
        executor: &mut E,
        pool: &StatementsPool,
        arguments: &Arguments,
    ) -> Result<Vec<T>> {
        self.execute_iterator(executor, pool, arguments)?
            .try_collect()
            .await
    }
}

impl<M: Model> Display for QuerySet<M> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match &self.phase {
            Phase::Prepared(prepared) => write!(f, "PreparedQuerySet <{}>", prepared.artifact),
            Phase::Building(query) => {
                let generated: GeneratedSql = query.generate_select(&GenericSqlWriter::new());
                write!(f, "QuerySet <{}>", generated)
            }
        }
    }
}

impl<M: Model> fmt::Debug for QuerySet<M> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("QuerySet")
            .field("table", &M::table_ref().full_name())
            .field("phase", &self.phase)
            .finish()
    }
}
