use crate::{Dialect, Driver, Executor, Model, QuerySet, Result};
use std::{
    collections::HashMap,
    fmt::{self, Debug, Formatter},
    sync::{Arc, Mutex, PoisonError},
};

/// Prepared query sets of a model, built once per key and vendor.
///
/// Meant to live as long as the application, the statements are then compiled once and
/// every request only executes them:
///
/// ```rust,ignore
/// let by_id = manager.get_or_prepare("get_by_id", &connection, |objects| {
///     objects.filter(Author::ID.eq(BindParam::new("id")))
/// })?;
/// let author: Vec<Author> = by_id.execute(&mut connection, &pool, &args! { "id" => 1 }).await?;
/// ```
pub struct PreparedManager<M> {
    cache: Mutex<HashMap<(String, &'static str), QuerySet<M>>>,
}

impl<M: Model> PreparedManager<M> {
    pub fn new() -> Self {
        Self {
            cache: Default::default(),
        }
    }

    /// Cached query set for `key`, `build` shapes it from `M::objects()` on first use.
    pub fn get_or_prepare<E, F>(&self, key: &str, executor: &E, build: F) -> Result<QuerySet<M>>
    where
        E: Executor,
        F: FnOnce(QuerySet<M>) -> Result<QuerySet<M>>,
    {
        self.get_or_prepare_with(key, executor.driver().dialect()?, build)
    }

    pub fn get_or_prepare_with<F>(
        &self,
        key: &str,
        dialect: Arc<dyn Dialect>,
        build: F,
    ) -> Result<QuerySet<M>>
    where
        F: FnOnce(QuerySet<M>) -> Result<QuerySet<M>>,
    {
        let cache_key = (key.to_string(), dialect.vendor());
        if let Some(cached) = self
            .cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&cache_key)
        {
            return Ok(cached.clone());
        }
        let prepared = build(M::objects())?.prepare_with(dialect)?;
        log::debug!(
            "Prepared `{}` for {}: {}",
            key,
            cache_key.1,
            prepared.statement_name().unwrap_or_default()
        );
        Ok(self
            .cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(cache_key)
            .or_insert(prepared)
            .clone())
    }

    pub fn len(&self) -> usize {
        self.cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

impl<M: Model> Default for PreparedManager<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M: Model> Debug for PreparedManager<M> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
        f.debug_list()
            .entries(cache.keys().map(|(key, vendor)| format!("{}@{}", key, vendor)))
            .finish()
    }
}
