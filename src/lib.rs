//! Server side prepared statements for the Rust data layer.
//!
//! Build a [`QuerySet`] with [`BindParam`]s where the values will go, [`prepare`](QuerySet::prepare)
//! it once, then [`execute`](QuerySet::execute) it with [`args!`] as many times as needed. The
//! [`StatementsPool`] remembers which statements are already prepared on each connection.
pub use reprise_core::*;
