use crate::{
    Expression, FieldType, Lookup, OpPrecedence, ParamSite, ParamVisitor, Result, SqlWriter,
    writer::Context,
};

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum UnaryOpType {
    Negative,
    Not,
    IsNull,
    IsNotNull,
}

impl OpPrecedence for UnaryOpType {
    fn precedence(&self, writer: &dyn SqlWriter) -> i32 {
        writer.expression_unary_op_precedence(self)
    }
}

#[derive(Debug)]
pub struct UnaryOp<V: Expression> {
    pub op: UnaryOpType,
    pub arg: V,
}

impl<E: Expression> OpPrecedence for UnaryOp<E> {
    fn precedence(&self, writer: &dyn SqlWriter) -> i32 {
        writer.expression_unary_op_precedence(&self.op)
    }
}

impl<E: Expression> Expression for UnaryOp<E> {
    fn write_query(&self, writer: &dyn SqlWriter, context: &mut Context, out: &mut String) {
        writer.write_expression_unary_op(
            context,
            out,
            &UnaryOp {
                op: self.op,
                arg: &self.arg,
            },
        )
    }

    fn visit_params(&self, visitor: &mut dyn ParamVisitor, site: &ParamSite) -> Result<()> {
        let site = match self.op {
            UnaryOpType::Negative => *site,
            UnaryOpType::Not => ParamSite::default(),
            op => ParamSite::new(Lookup::Unary(op), None),
        };
        self.arg.visit_params(visitor, &site)
    }

    fn output_type(&self) -> Option<FieldType> {
        match self.op {
            UnaryOpType::Negative => self.arg.output_type(),
            _ => Some(FieldType::Boolean),
        }
    }
}
