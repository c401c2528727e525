mod context;
mod generated;
mod sql_writer;

pub use context::*;
pub use generated::*;
pub use sql_writer::*;
