use crate::{Driver, Error, Executor, Result, StatementsPool, future, truncate_long};
use std::{borrow::Cow, future::Future};
use url::Url;

pub trait Connection: Executor {
    /// Establish a connection to the given URL.
    fn connect(url: Cow<'static, str>) -> impl Future<Output = Result<Self>> + Send;

    /// Close the connection, the statements it prepared are forgotten by `pool`.
    fn disconnect(self, pool: &StatementsPool) -> impl Future<Output = Result<()>> + Send {
        pool.notify_on_close(self.handle());
        drop(self);
        future::ready(Ok(()))
    }
}

/// Percent-decode `url` and check that its scheme names the driver.
pub fn parse_connection_url<D: Driver>(url: &str) -> Result<Url> {
    let decoded = urlencoding::decode(url)
        .map_err(|e| Error::new(e).context(format!("While decoding `{}`", truncate_long!(url))))?;
    let parsed = Url::parse(&decoded).map_err(|e| {
        Error::new(e).context(format!(
            "While parsing the connection URL `{}`",
            truncate_long!(url)
        ))
    })?;
    let scheme = parsed.scheme();
    let accepted = scheme == D::NAME
        || matches!(
            (D::NAME, scheme),
            ("postgres", "postgresql") | ("mysql", "mariadb")
        );
    if !accepted {
        let error = Error::msg(format!(
            "Connection URL `{}` must start with `{}://`",
            truncate_long!(url),
            D::NAME
        ));
        log::error!("{:#}", error);
        return Err(error);
    }
    Ok(parsed)
}
