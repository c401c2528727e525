use crate::{
    Expression, FieldType, OpPrecedence, ParamSite, ParamVisitor, Result,
    writer::{Context, SqlWriter},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Order {
    ASC,
    DESC,
}

impl Order {
    pub fn reversed(self) -> Self {
        match self {
            Order::ASC => Order::DESC,
            Order::DESC => Order::ASC,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Ordered<E: Expression> {
    pub order: Order,
    pub expression: E,
}

impl<E: Expression> Ordered<E> {
    pub fn reversed(self) -> Self {
        Self {
            order: self.order.reversed(),
            expression: self.expression,
        }
    }
}

impl<E: Expression> OpPrecedence for Ordered<E> {
    fn precedence(&self, writer: &dyn SqlWriter) -> i32 {
        self.expression.precedence(writer)
    }
}

impl<E: Expression> Expression for Ordered<E> {
    fn write_query(&self, writer: &dyn SqlWriter, context: &mut Context, out: &mut String) {
        writer.write_expression_ordered(
            context,
            out,
            &Ordered {
                order: self.order,
                expression: &self.expression,
            },
        )
    }
    fn visit_params(&self, visitor: &mut dyn ParamVisitor, site: &ParamSite) -> Result<()> {
        self.expression.visit_params(visitor, site)
    }
    fn output_type(&self) -> Option<FieldType> {
        self.expression.output_type()
    }
    fn is_ordered(&self) -> bool {
        true
    }
}
