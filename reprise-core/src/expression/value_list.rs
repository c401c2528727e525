use crate::{
    AsValue, BinaryOpType, Expression, Lookup, OpPrecedence, ParamSite, ParamVisitor, Result,
    writer::{Context, SqlWriter},
};

/// Parenthesized list of expressions, the right hand side of `IN` and `BETWEEN`.
#[derive(Debug, Default)]
pub struct ValueList(pub Vec<Box<dyn Expression>>);

impl ValueList {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn of<V: AsValue>(values: impl IntoIterator<Item = V>) -> Self {
        Self(
            values
                .into_iter()
                .map(|v| Box::new(v.as_value()) as Box<dyn Expression>)
                .collect(),
        )
    }
    pub fn push(mut self, item: impl Expression + 'static) -> Self {
        self.0.push(Box::new(item));
        self
    }
    pub fn len(&self) -> usize {
        self.0.len()
    }
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl OpPrecedence for ValueList {
    fn precedence(&self, _writer: &dyn SqlWriter) -> i32 {
        1_000_000
    }
}

impl Expression for ValueList {
    fn write_query(&self, writer: &dyn SqlWriter, context: &mut Context, out: &mut String) {
        let items = self.0.iter().map(|v| v.as_ref()).collect::<Vec<_>>();
        writer.write_expression_list(context, out, &items);
    }
    fn visit_params(&self, visitor: &mut dyn ParamVisitor, site: &ParamSite) -> Result<()> {
        // Members of an explicit list are compared one by one
        let site = match site.lookup {
            Lookup::Binary(BinaryOpType::In) => {
                ParamSite::new(Lookup::Binary(BinaryOpType::Equal), site.target)
                    .with_nullable(site.nullable)
            }
            _ => *site,
        };
        for item in &self.0 {
            item.visit_params(visitor, &site)?;
        }
        Ok(())
    }
}
