use crate::{
    Expression, FieldType, OpPrecedence, ParamSite, ParamVisitor, Result,
    writer::{Context, SqlWriter},
};

/// `CASE WHEN .. THEN .. ELSE .. END`, mostly used in annotations.
#[derive(Debug, Default)]
pub struct Case {
    pub whens: Vec<(Box<dyn Expression>, Box<dyn Expression>)>,
    pub otherwise: Option<Box<dyn Expression>>,
}

impl Case {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn when(
        mut self,
        condition: impl Expression + 'static,
        then: impl Expression + 'static,
    ) -> Self {
        self.whens.push((Box::new(condition), Box::new(then)));
        self
    }
    pub fn otherwise(mut self, value: impl Expression + 'static) -> Self {
        self.otherwise = Some(Box::new(value));
        self
    }
}

impl OpPrecedence for Case {
    fn precedence(&self, _writer: &dyn SqlWriter) -> i32 {
        1_000_000
    }
}

impl Expression for Case {
    fn write_query(&self, writer: &dyn SqlWriter, context: &mut Context, out: &mut String) {
        writer.write_expression_case(context, out, self);
    }
    fn visit_params(&self, visitor: &mut dyn ParamVisitor, site: &ParamSite) -> Result<()> {
        let target = ParamSite::new(Default::default(), self.output_type().or(site.target))
            .with_nullable(site.nullable);
        for (condition, then) in &self.whens {
            condition.visit_params(visitor, &ParamSite::default())?;
            then.visit_params(visitor, &target)?;
        }
        if let Some(otherwise) = &self.otherwise {
            otherwise.visit_params(visitor, &target)?;
        }
        Ok(())
    }
    fn output_type(&self) -> Option<FieldType> {
        self.whens
            .iter()
            .map(|(_, then)| then.as_ref())
            .chain(self.otherwise.as_deref())
            .find_map(Expression::output_type)
    }
}
