use crate::{
    BinaryOp, BinaryOpType, BindParam, Case, ColumnDef, ColumnRef, Expression, Order, Ordered,
    Raw, UnaryOp, UnaryOpType, ValueList,
};
use std::sync::Arc;

/// Builder vocabulary shared by every node that can start a predicate.
///
/// ```rust
/// use reprise_core::{BindParam, ColumnDef, ExpressionExt, FieldType};
/// const NAME: ColumnDef = ColumnDef::new("author", "name", FieldType::Text);
/// let condition = NAME.eq(BindParam::new("name")).or(NAME.is_null());
/// # let _ = condition;
/// ```
pub trait ExpressionExt: Expression + Sized + 'static {
    fn eq<R: Expression>(self, rhs: R) -> BinaryOp<Self, R> {
        BinaryOp::new(BinaryOpType::Equal, self, rhs)
    }
    fn ne<R: Expression>(self, rhs: R) -> BinaryOp<Self, R> {
        BinaryOp::new(BinaryOpType::NotEqual, self, rhs)
    }
    fn lt<R: Expression>(self, rhs: R) -> BinaryOp<Self, R> {
        BinaryOp::new(BinaryOpType::Less, self, rhs)
    }
    fn le<R: Expression>(self, rhs: R) -> BinaryOp<Self, R> {
        BinaryOp::new(BinaryOpType::LessEqual, self, rhs)
    }
    fn gt<R: Expression>(self, rhs: R) -> BinaryOp<Self, R> {
        BinaryOp::new(BinaryOpType::Greater, self, rhs)
    }
    fn ge<R: Expression>(self, rhs: R) -> BinaryOp<Self, R> {
        BinaryOp::new(BinaryOpType::GreaterEqual, self, rhs)
    }
    fn iexact<R: Expression>(self, rhs: R) -> BinaryOp<Self, R> {
        BinaryOp::new(BinaryOpType::IExact, self, rhs)
    }
    fn contains<R: Expression>(self, rhs: R) -> BinaryOp<Self, R> {
        BinaryOp::new(BinaryOpType::Contains, self, rhs)
    }
    fn icontains<R: Expression>(self, rhs: R) -> BinaryOp<Self, R> {
        BinaryOp::new(BinaryOpType::IContains, self, rhs)
    }
    fn startswith<R: Expression>(self, rhs: R) -> BinaryOp<Self, R> {
        BinaryOp::new(BinaryOpType::StartsWith, self, rhs)
    }
    fn endswith<R: Expression>(self, rhs: R) -> BinaryOp<Self, R> {
        BinaryOp::new(BinaryOpType::EndsWith, self, rhs)
    }
    /// Membership test, `rhs` is a [`ValueList`] or an array [`BindParam`].
    fn is_in<R: Expression>(self, rhs: R) -> BinaryOp<Self, R> {
        BinaryOp::new(BinaryOpType::In, self, rhs)
    }
    fn between(
        self,
        low: impl Expression + 'static,
        high: impl Expression + 'static,
    ) -> BinaryOp<Self, ValueList> {
        BinaryOp::new(
            BinaryOpType::Between,
            self,
            ValueList::new().push(low).push(high),
        )
    }
    fn is_null(self) -> UnaryOp<Self> {
        UnaryOp {
            op: UnaryOpType::IsNull,
            arg: self,
        }
    }
    fn is_not_null(self) -> UnaryOp<Self> {
        UnaryOp {
            op: UnaryOpType::IsNotNull,
            arg: self,
        }
    }
    fn and<R: Expression>(self, rhs: R) -> BinaryOp<Self, R> {
        BinaryOp::new(BinaryOpType::And, self, rhs)
    }
    fn or<R: Expression>(self, rhs: R) -> BinaryOp<Self, R> {
        BinaryOp::new(BinaryOpType::Or, self, rhs)
    }
    fn not(self) -> UnaryOp<Self> {
        UnaryOp {
            op: UnaryOpType::Not,
            arg: self,
        }
    }
    fn asc(self) -> Ordered<Self> {
        Ordered {
            order: Order::ASC,
            expression: self,
        }
    }
    fn desc(self) -> Ordered<Self> {
        Ordered {
            order: Order::DESC,
            expression: self,
        }
    }
    fn boxed(self) -> Arc<dyn Expression> {
        Arc::new(self)
    }
}

impl ExpressionExt for ColumnDef {}
impl ExpressionExt for ColumnRef {}
impl ExpressionExt for BindParam {}
impl ExpressionExt for Case {}
impl ExpressionExt for Raw {}
impl ExpressionExt for ValueList {}
impl ExpressionExt for Arc<dyn Expression> {}
impl<L: Expression + 'static, R: Expression + 'static> ExpressionExt for BinaryOp<L, R> {}
impl<E: Expression + 'static> ExpressionExt for UnaryOp<E> {}
