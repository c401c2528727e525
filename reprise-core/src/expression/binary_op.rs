use crate::{
    Expression, FieldType, Lookup, OpPrecedence, ParamSite, ParamVisitor, Result,
    writer::{Context, SqlWriter},
};
use std::fmt::{self, Display, Formatter};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOpType {
    Multiplication,
    Division,
    Remainder,
    Addition,
    Subtraction,
    Like,
    NotLike,
    Equal,
    NotEqual,
    Less,
    Greater,
    LessEqual,
    GreaterEqual,
    In,
    Between,
    Contains,
    IContains,
    StartsWith,
    EndsWith,
    IExact,
    And,
    Or,
}

impl BinaryOpType {
    pub fn is_logical(&self) -> bool {
        matches!(self, BinaryOpType::And | BinaryOpType::Or)
    }
    pub fn is_pattern(&self) -> bool {
        matches!(
            self,
            BinaryOpType::Contains
                | BinaryOpType::IContains
                | BinaryOpType::StartsWith
                | BinaryOpType::EndsWith
                | BinaryOpType::IExact
        )
    }
    /// Name of the lookup as written in filter keyword arguments.
    pub fn lookup_name(&self) -> &'static str {
        match self {
            BinaryOpType::Equal => "exact",
            BinaryOpType::NotEqual => "ne",
            BinaryOpType::Less => "lt",
            BinaryOpType::Greater => "gt",
            BinaryOpType::LessEqual => "lte",
            BinaryOpType::GreaterEqual => "gte",
            BinaryOpType::In => "in",
            BinaryOpType::Between => "range",
            BinaryOpType::Contains => "contains",
            BinaryOpType::IContains => "icontains",
            BinaryOpType::StartsWith => "startswith",
            BinaryOpType::EndsWith => "endswith",
            BinaryOpType::IExact => "iexact",
            BinaryOpType::Like => "like",
            BinaryOpType::NotLike => "not_like",
            BinaryOpType::Multiplication => "mul",
            BinaryOpType::Division => "div",
            BinaryOpType::Remainder => "mod",
            BinaryOpType::Addition => "add",
            BinaryOpType::Subtraction => "sub",
            BinaryOpType::And => "and",
            BinaryOpType::Or => "or",
        }
    }
}

impl OpPrecedence for BinaryOpType {
    fn precedence(&self, writer: &dyn SqlWriter) -> i32 {
        writer.expression_binary_op_precedence(self)
    }
}

#[derive(Debug)]
pub struct BinaryOp<L: Expression, R: Expression> {
    pub op: BinaryOpType,
    pub lhs: L,
    pub rhs: R,
}

impl<L: Expression, R: Expression> BinaryOp<L, R> {
    pub fn new(op: BinaryOpType, lhs: L, rhs: R) -> Self {
        Self { op, lhs, rhs }
    }
}

impl<L: Expression, R: Expression> OpPrecedence for BinaryOp<L, R> {
    fn precedence(&self, writer: &dyn SqlWriter) -> i32 {
        writer.expression_binary_op_precedence(&self.op)
    }
}

impl<L: Expression, R: Expression> Expression for BinaryOp<L, R> {
    fn write_query(&self, writer: &dyn SqlWriter, context: &mut Context, out: &mut String) {
        writer.write_expression_binary_op(
            context,
            out,
            &BinaryOp {
                op: self.op,
                lhs: &self.lhs,
                rhs: &self.rhs,
            },
        )
    }

    fn visit_params(&self, visitor: &mut dyn ParamVisitor, site: &ParamSite) -> Result<()> {
        if self.op.is_logical() {
            let site = ParamSite::default();
            self.lhs.visit_params(visitor, &site)?;
            return self.rhs.visit_params(visitor, &site);
        }
        let lookup = Lookup::Binary(self.op);
        let lhs_type = self.lhs.output_type();
        let rhs_type = self.rhs.output_type();
        let nullable = |side: &dyn Expression, side_type: Option<FieldType>| match side_type {
            Some(..) => side.is_nullable(),
            None => site.nullable,
        };
        self.lhs.visit_params(
            visitor,
            &ParamSite::new(lookup, rhs_type.or(site.target))
                .with_nullable(nullable(&self.rhs, rhs_type)),
        )?;
        self.rhs.visit_params(
            visitor,
            &ParamSite::new(lookup, lhs_type.or(site.target))
                .with_nullable(nullable(&self.lhs, lhs_type)),
        )
    }

    fn output_type(&self) -> Option<FieldType> {
        match self.op {
            BinaryOpType::Multiplication
            | BinaryOpType::Division
            | BinaryOpType::Remainder
            | BinaryOpType::Addition
            | BinaryOpType::Subtraction => self.lhs.output_type().or(self.rhs.output_type()),
            _ => Some(FieldType::Boolean),
        }
    }
}

impl Display for BinaryOpType {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.lookup_name())
    }
}
