mod compiler;
mod logical;
mod manager;
mod queryset;

pub use compiler::*;
pub use logical::*;
pub use manager::*;
pub use queryset::*;
