use crate::{
    BinaryOpType, BindParam, FieldType, OpPrecedence, Result, UnaryOpType, Value,
    writer::{Context, SqlWriter},
};
use std::{borrow::Cow, fmt::Debug, sync::Arc};

/// A renderable SQL expression node.
pub trait Expression: OpPrecedence + Send + Sync + Debug {
    /// Serialize the expression into the output string using the sql writer.
    fn write_query(&self, writer: &dyn SqlWriter, context: &mut Context, out: &mut String);
    /// Walk the bind parameters contained in this node, `site` describes where this node is used.
    fn visit_params(&self, _visitor: &mut dyn ParamVisitor, _site: &ParamSite) -> Result<()> {
        Ok(())
    }
    /// Semantic type produced by this expression, when it is column like.
    fn output_type(&self) -> Option<FieldType> {
        None
    }
    /// Whether the column behind this expression accepts NULL.
    fn is_nullable(&self) -> bool {
        false
    }
    /// Whether this expression carries ordering information.
    fn is_ordered(&self) -> bool {
        false
    }
}

/// How an expression is being compared at the point a bind parameter is found.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookup {
    #[default]
    None,
    Binary(BinaryOpType),
    Unary(UnaryOpType),
    /// Bound of a LIMIT / OFFSET clause.
    Slice,
}

#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParamSite {
    pub lookup: Lookup,
    /// Type of the other side of the comparison.
    pub target: Option<FieldType>,
    /// The other side of the comparison is a nullable column.
    pub nullable: bool,
}

impl ParamSite {
    pub fn new(lookup: Lookup, target: Option<FieldType>) -> Self {
        Self {
            lookup,
            target,
            nullable: false,
        }
    }
    pub fn with_nullable(self, nullable: bool) -> Self {
        Self { nullable, ..self }
    }
}

/// Receives every bind parameter occurrence of an expression tree.
pub trait ParamVisitor {
    fn visit(&mut self, param: &BindParam, site: &ParamSite) -> Result<()>;
}

impl<T: Expression + ?Sized> Expression for &T {
    fn write_query(&self, writer: &dyn SqlWriter, context: &mut Context, out: &mut String) {
        (*self).write_query(writer, context, out);
    }
    fn visit_params(&self, visitor: &mut dyn ParamVisitor, site: &ParamSite) -> Result<()> {
        (*self).visit_params(visitor, site)
    }
    fn output_type(&self) -> Option<FieldType> {
        (*self).output_type()
    }
    fn is_nullable(&self) -> bool {
        (*self).is_nullable()
    }
    fn is_ordered(&self) -> bool {
        (*self).is_ordered()
    }
}

impl<T: Expression + ?Sized> Expression for Arc<T> {
    fn write_query(&self, writer: &dyn SqlWriter, context: &mut Context, out: &mut String) {
        self.as_ref().write_query(writer, context, out);
    }
    fn visit_params(&self, visitor: &mut dyn ParamVisitor, site: &ParamSite) -> Result<()> {
        self.as_ref().visit_params(visitor, site)
    }
    fn output_type(&self) -> Option<FieldType> {
        self.as_ref().output_type()
    }
    fn is_nullable(&self) -> bool {
        self.as_ref().is_nullable()
    }
    fn is_ordered(&self) -> bool {
        self.as_ref().is_ordered()
    }
}

impl<T: Expression + ?Sized> Expression for Box<T> {
    fn write_query(&self, writer: &dyn SqlWriter, context: &mut Context, out: &mut String) {
        self.as_ref().write_query(writer, context, out);
    }
    fn visit_params(&self, visitor: &mut dyn ParamVisitor, site: &ParamSite) -> Result<()> {
        self.as_ref().visit_params(visitor, site)
    }
    fn output_type(&self) -> Option<FieldType> {
        self.as_ref().output_type()
    }
    fn is_nullable(&self) -> bool {
        self.as_ref().is_nullable()
    }
    fn is_ordered(&self) -> bool {
        self.as_ref().is_ordered()
    }
}

impl Expression for bool {
    fn write_query(&self, writer: &dyn SqlWriter, context: &mut Context, out: &mut String) {
        writer.write_value_bool(context, out, *self);
    }
}

impl Expression for Value {
    fn write_query(&self, writer: &dyn SqlWriter, context: &mut Context, out: &mut String) {
        writer.write_expression_value(context, out, self);
    }
}

/// SQL text copied verbatim into the query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Raw(pub Cow<'static, str>);

impl Raw {
    pub fn new(sql: impl Into<Cow<'static, str>>) -> Self {
        Self(sql.into())
    }
}

impl OpPrecedence for Raw {
    fn precedence(&self, _writer: &dyn SqlWriter) -> i32 {
        0
    }
}

impl Expression for Raw {
    fn write_query(&self, _writer: &dyn SqlWriter, _context: &mut Context, out: &mut String) {
        out.push_str(&self.0);
    }
}
