use crate::{Connection, Dialect, Result, dialect_for};
use std::{borrow::Cow, future::Future, sync::Arc};

/// Entry point of a backend.
pub trait Driver: Send + Sync {
    type Connection: Connection<Driver = Self>;

    /// Vendor identifier, it selects the dialect and the accepted URL scheme.
    const NAME: &'static str;

    fn get_instance() -> Self;

    fn dialect(&self) -> Result<Arc<dyn Dialect>> {
        dialect_for(Self::NAME)
    }

    fn connect(
        &self,
        url: Cow<'static, str>,
    ) -> impl Future<Output = Result<Self::Connection>> + Send {
        Self::Connection::connect(url)
    }
}
