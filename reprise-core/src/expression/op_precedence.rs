use crate::{Value, writer::SqlWriter};
use std::sync::Arc;

/// Provides numeric precedence for expressions allowing sql writers to insert parentheses.
pub trait OpPrecedence {
    /// Lower numbers bind weaker, writers parenthesize when child precedence <= operator precedence.
    fn precedence(&self, writer: &dyn SqlWriter) -> i32;
}

impl<T: OpPrecedence + ?Sized> OpPrecedence for &T {
    fn precedence(&self, writer: &dyn SqlWriter) -> i32 {
        (*self).precedence(writer)
    }
}

impl<T: OpPrecedence + ?Sized> OpPrecedence for Arc<T> {
    fn precedence(&self, writer: &dyn SqlWriter) -> i32 {
        self.as_ref().precedence(writer)
    }
}

impl<T: OpPrecedence + ?Sized> OpPrecedence for Box<T> {
    fn precedence(&self, writer: &dyn SqlWriter) -> i32 {
        self.as_ref().precedence(writer)
    }
}

impl OpPrecedence for bool {
    fn precedence(&self, _writer: &dyn SqlWriter) -> i32 {
        1_000_000
    }
}

impl OpPrecedence for Value {
    fn precedence(&self, _writer: &dyn SqlWriter) -> i32 {
        1_000_000
    }
}
