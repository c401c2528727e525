mod mysql;
mod postgres;

pub use mysql::*;
pub use postgres::*;

use crate::{FieldType, PreparedError, Result, SqlWriter, Value};
use std::{fmt::Debug, sync::Arc};

/// Per engine rendering of the prepared statement protocol.
pub trait Dialect: Send + Sync + Debug {
    /// Vendor identifier, also the memo key of compiled statements.
    fn vendor(&self) -> &'static str;

    fn sql_writer(&self) -> &dyn SqlWriter;

    /// Placeholder text for the argument at `position` (zero based).
    fn placeholder(&self, position: usize) -> String;

    /// Whether placeholders are numbered, a numbered placeholder can be repeated in the
    /// statement while an anonymous one consumes one argument each time it appears.
    fn numbered_placeholders(&self) -> bool;

    fn write_prepare(&self, name: &str, types: &[FieldType], body: &str) -> String;

    fn write_execute(&self, name: &str, arguments: &[Value]) -> String;

    /// Engines that cannot pass arguments to `EXECUTE` stage them in session variables.
    fn requires_session_setup(&self) -> bool {
        false
    }

    /// Statement staging `arguments`, none when nothing must be staged.
    fn write_session_setup(&self, _arguments: &[Value]) -> Option<String> {
        None
    }

    /// Statement resetting what the setup staged.
    fn write_session_cleanup(&self, _count: usize) -> Option<String> {
        None
    }
}

/// Dialect of the engine named `vendor`.
pub fn dialect_for(vendor: &str) -> Result<Arc<dyn Dialect>> {
    match vendor.to_ascii_lowercase().as_str() {
        "postgres" | "postgresql" => Ok(Arc::new(PostgresDialect::new())),
        "mysql" | "mariadb" => Ok(Arc::new(MySqlDialect::new())),
        _ => Err(PreparedError::UnsupportedVendor {
            vendor: vendor.into(),
        }
        .into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vendors() {
        assert_eq!(dialect_for("postgres").unwrap().vendor(), "postgres");
        assert_eq!(dialect_for("PostgreSQL").unwrap().vendor(), "postgres");
        assert_eq!(dialect_for("mariadb").unwrap().vendor(), "mysql");
        for vendor in ["sqlite", "oracle", ""] {
            let error = dialect_for(vendor).unwrap_err();
            assert_eq!(
                PreparedError::of(&error),
                Some(&PreparedError::UnsupportedVendor {
                    vendor: vendor.into()
                })
            );
        }
    }
}
