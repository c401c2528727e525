use crate::Result;
use std::{
    collections::{HashMap, HashSet},
    fmt::{self, Debug, Formatter},
    future::Future,
    sync::{
        Arc, Mutex, PoisonError, Weak,
        atomic::{AtomicU64, Ordering},
    },
};

static NEXT_HANDLE: AtomicU64 = AtomicU64::new(1);

#[derive(Debug)]
struct HandleId(u64);

/// Identity of one physical connection.
///
/// Every connection mints a handle when it is opened, ids are never reused in the process.
#[derive(Clone)]
pub struct ConnectionHandle(Arc<HandleId>);

impl ConnectionHandle {
    pub fn new() -> Self {
        Self(Arc::new(HandleId(NEXT_HANDLE.fetch_add(1, Ordering::Relaxed))))
    }
    pub fn id(&self) -> u64 {
        self.0.0
    }
}

impl Default for ConnectionHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for ConnectionHandle {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for ConnectionHandle {}

impl Debug for ConnectionHandle {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "ConnectionHandle({})", self.id())
    }
}

struct Entry {
    handle: Weak<HandleId>,
    names: HashSet<String>,
}

/// Statement names already prepared, per live connection.
///
/// A name is recorded only after its `PREPARE` succeeded on that connection. Entries of
/// dropped connections are pruned, a closing connection evicts its own entry through
/// [`StatementsPool::notify_on_close`].
#[derive(Default)]
pub struct StatementsPool {
    entries: Mutex<HashMap<u64, Entry>>,
}

impl StatementsPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `prepare` unless `name` is already prepared on `handle`, returns whether it ran.
    pub async fn ensure_prepared<F, Fut>(
        &self,
        handle: &ConnectionHandle,
        name: &str,
        prepare: F,
    ) -> Result<bool>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<()>>,
    {
        if self.contains(handle, name) {
            log::debug!(
                "Statement `{}` is already prepared on connection {}",
                name,
                handle.id()
            );
            return Ok(false);
        }
        log::debug!(
            "Statement `{}` is not prepared on connection {}",
            name,
            handle.id()
        );
        prepare().await?;
        self.record(handle, name);
        Ok(true)
    }

    pub fn contains(&self, handle: &ConnectionHandle, name: &str) -> bool {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries
            .get(&handle.id())
            .is_some_and(|v| v.names.contains(name))
    }

    fn record(&self, handle: &ConnectionHandle, name: &str) {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        if !entries.contains_key(&handle.id()) {
            // Connections dropped without disconnecting
            entries.retain(|_, v| v.handle.strong_count() > 0);
        }
        entries
            .entry(handle.id())
            .or_insert_with(|| Entry {
                handle: Arc::downgrade(&handle.0),
                names: HashSet::new(),
            })
            .names
            .insert(name.to_string());
    }

    /// Forget everything prepared on `handle`.
    pub fn notify_on_close(&self, handle: &ConnectionHandle) {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(entry) = entries.remove(&handle.id()) {
            log::debug!(
                "Connection {} closed, forgetting {} prepared statements",
                handle.id(),
                entry.names.len()
            );
        }
    }

    /// Number of live connections with at least one prepared statement.
    pub fn len(&self) -> usize {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.retain(|_, v| v.handle.strong_count() > 0);
        entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of statements prepared on `handle`.
    pub fn prepared_on(&self, handle: &ConnectionHandle) -> usize {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.get(&handle.id()).map_or(0, |v| v.names.len())
    }

    pub fn clear(&self) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

impl Debug for StatementsPool {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        f.debug_map()
            .entries(entries.iter().map(|(k, v)| (k, &v.names)))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    #[tokio::test]
    async fn prepares_once_per_connection() {
        let pool = StatementsPool::new();
        let first = ConnectionHandle::new();
        let second = ConnectionHandle::new();
        assert_ne!(first, second);
        assert_eq!(first, first.clone());

        let mut calls = 0;
        for handle in [&first, &first, &second] {
            pool.ensure_prepared(handle, "book_0", || {
                calls += 1;
                async { Ok(()) }
            })
            .await
            .unwrap();
        }
        assert_eq!(calls, 2);
        assert!(pool.contains(&first, "book_0"));
        assert_eq!(pool.len(), 2);

        pool.notify_on_close(&first);
        assert!(!pool.contains(&first, "book_0"));
        drop(second);
        assert!(pool.is_empty());
    }

    #[tokio::test]
    async fn dropped_connections_are_pruned() {
        let pool = StatementsPool::new();
        for _ in 0..100 {
            let handle = ConnectionHandle::new();
            pool.ensure_prepared(&handle, "book_0", || async { Ok(()) })
                .await
                .unwrap();
        }
        let live = ConnectionHandle::new();
        pool.ensure_prepared(&live, "book_0", || async { Ok(()) })
            .await
            .unwrap();
        let entries = pool.entries.lock().unwrap();
        assert_eq!(entries.len(), 1);
        assert!(entries.contains_key(&live.id()));
    }

    #[tokio::test]
    async fn failed_prepare_is_not_recorded() {
        let pool = StatementsPool::new();
        let handle = ConnectionHandle::new();
        let result = pool
            .ensure_prepared(&handle, "book_0", || async {
                Err(Error::msg("syntax error"))
            })
            .await;
        assert!(result.is_err());
        assert!(!pool.contains(&handle, "book_0"));
        assert!(
            pool.ensure_prepared(&handle, "book_0", || async { Ok(()) })
                .await
                .unwrap()
        );
    }
}
