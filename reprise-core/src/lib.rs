mod as_value;
mod column;
mod connection;
mod dialect;
mod driver;
mod error;
mod executor;
mod expression;
mod field_type;
mod model;
mod param;
mod query;
mod statements_pool;
mod table_ref;
mod util;
mod value;
mod writer;

pub use ::anyhow::Context as ErrorContext;
pub use as_value::*;
pub use column::*;
pub use connection::*;
pub use dialect::*;
pub use driver::*;
pub use error::*;
pub use executor::*;
pub use expression::*;
pub use field_type::*;
pub use model::*;
pub use param::*;
pub use query::*;
pub use statements_pool::*;
pub use table_ref::*;
pub use util::*;
pub use value::*;
pub use writer::*;
pub mod stream {
    pub use ::futures::stream::*;
}
pub use ::futures::future;

pub type Result<T> = anyhow::Result<T>;
pub type Error = anyhow::Error;
