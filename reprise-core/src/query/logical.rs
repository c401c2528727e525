use crate::{
    BinaryOp, BinaryOpType, Bound, ColumnDef, CompiledPrepareArtifact, Context, Error,
    Expression, Fragment, GeneratedSql, Order, Ordered, ParamRegistry, ParamSite, ParamVisitor,
    Result, SelectStatement, SqlWriter, TableRef, UnaryOp, UnaryOpType,
};
use std::sync::{Arc, OnceLock};

pub type SharedExpression = Arc<dyn Expression>;

/// Engine agnostic description of a `SELECT` over one table.
///
/// Clones share the compiled statement memo until one of them is changed.
#[derive(Debug, Clone)]
pub struct LogicalQuery {
    pub table: &'static TableRef,
    /// Every column of the model, used for the default projection.
    pub model_columns: &'static [ColumnDef],
    pub primary_key: &'static ColumnDef,
    /// Projected columns, `None` selects the model columns.
    pub fields: Option<Vec<&'static ColumnDef>>,
    pub annotations: Vec<(String, SharedExpression)>,
    pub condition: Option<SharedExpression>,
    pub order_by: Vec<Ordered<SharedExpression>>,
    pub distinct: bool,
    pub low: Bound,
    pub high: Option<Bound>,
    pub params: ParamRegistry,
    pub related: Vec<&'static str>,
    pub database: Option<String>,
    memo: Arc<OnceLock<Arc<CompiledPrepareArtifact>>>,
}

impl LogicalQuery {
    pub fn new(
        table: &'static TableRef,
        model_columns: &'static [ColumnDef],
        primary_key: &'static ColumnDef,
    ) -> Self {
        Self {
            table,
            model_columns,
            primary_key,
            fields: None,
            annotations: Vec::new(),
            condition: None,
            order_by: Vec::new(),
            distinct: false,
            low: Bound::default(),
            high: None,
            params: ParamRegistry::new(),
            related: Vec::new(),
            database: None,
            memo: Default::default(),
        }
    }

    pub fn memo(&self) -> &OnceLock<Arc<CompiledPrepareArtifact>> {
        &self.memo
    }

    /// Detach from the memo shared with the clones, called before any change.
    pub fn invalidate(&mut self) {
        self.memo = Default::default();
    }

    pub fn is_sliced(&self) -> bool {
        self.high.is_some() || !self.low.is_zero()
    }

    pub fn add_condition(&mut self, condition: SharedExpression, op: BinaryOpType) -> Result<()> {
        if self.is_sliced() {
            return Err(Error::msg("Cannot filter a query once a slice has been taken"));
        }
        self.params.register_expression(condition.as_ref())?;
        let combined: SharedExpression = match self.condition.take() {
            Some(current) => Arc::new(BinaryOp::new(op, current, condition)),
            None => condition,
        };
        self.condition = Some(combined);
        Ok(())
    }

    pub fn exclude(&mut self, condition: SharedExpression) -> Result<()> {
        self.add_condition(
            Arc::new(UnaryOp {
                op: UnaryOpType::Not,
                arg: condition,
            }),
            BinaryOpType::And,
        )
    }

    pub fn add_ordering(&mut self, ordered: Ordered<SharedExpression>) -> Result<()> {
        if self.is_sliced() {
            return Err(Error::msg("Cannot reorder a query once a slice has been taken"));
        }
        self.params.register_expression(&ordered.expression)?;
        self.order_by.push(ordered);
        Ok(())
    }

    pub fn reverse(&mut self) {
        if self.order_by.is_empty() {
            self.order_by.push(Ordered {
                order: Order::DESC,
                expression: Arc::new(*self.primary_key),
            });
        } else {
            for ordered in &mut self.order_by {
                ordered.order = ordered.order.reversed();
            }
        }
    }

    pub fn annotate(&mut self, alias: String, expression: SharedExpression) -> Result<()> {
        if self.annotations.iter().any(|(v, _)| *v == alias) {
            return Err(Error::msg(format!(
                "The annotation `{}` conflicts with another annotation",
                alias
            )));
        }
        self.params.register_expression(expression.as_ref())?;
        self.annotations.push((alias, expression));
        Ok(())
    }

    /// Narrow the rows to `low..high` relative to the current slice.
    pub fn slice(&mut self, low: Bound, high: Option<Bound>) -> Result<()> {
        if !self.is_sliced() {
            for bound in [Some(&low), high.as_ref()].into_iter().flatten() {
                bound.visit_params(&mut self.params, &ParamSite::default())?;
            }
            self.low = low;
            self.high = high;
            return Ok(());
        }
        let parametrized = || {
            Error::msg("Cannot slice again a query when one of the bounds is a bind parameter")
        };
        let Bound::Value(current_low) = self.low else {
            return Err(parametrized());
        };
        let current_high = match &self.high {
            Some(Bound::Value(v)) => Some(*v),
            Some(Bound::Param(..)) => return Err(parametrized()),
            None => None,
        };
        let Bound::Value(low) = low else {
            return Err(parametrized());
        };
        let high = match high {
            Some(Bound::Value(v)) => Some(v),
            Some(Bound::Param(..)) => return Err(parametrized()),
            None => None,
        };
        let new_low = current_low.saturating_add(low);
        let new_high = match (high, current_high) {
            (Some(high), Some(current)) => Some(current.min(current_low.saturating_add(high))),
            (Some(high), None) => Some(current_low.saturating_add(high)),
            (None, current) => current,
        };
        self.low = Bound::Value(new_high.map_or(new_low, |h| new_low.min(h)));
        self.high = new_high.map(Bound::Value);
        Ok(())
    }

    /// Merge the condition and the parameters of `other`.
    pub fn combine(&mut self, other: &LogicalQuery, op: BinaryOpType) -> Result<()> {
        if self.table != other.table {
            return Err(Error::msg(format!(
                "Cannot combine queries on different tables `{}` and `{}`",
                self.table.full_name(),
                other.table.full_name()
            )));
        }
        if self.is_sliced() || other.is_sliced() {
            return Err(Error::msg("Cannot combine queries once a slice has been taken"));
        }
        let lhs = self.condition.take();
        let rhs = other.condition.clone();
        self.condition = match (lhs, rhs) {
            (Some(lhs), Some(rhs)) => {
                let combined: SharedExpression = Arc::new(BinaryOp::new(op, lhs, rhs));
                Some(combined)
            }
            (lhs, rhs) if op == BinaryOpType::And => lhs.or(rhs),
            // A side without condition matches every row
            _ => None,
        };
        let mut params = ParamRegistry::new();
        self.visit_params(&mut params)?;
        self.params = params;
        Ok(())
    }

    /// Walk every bind parameter occurrence with its comparison site.
    pub fn visit_params(&self, visitor: &mut dyn ParamVisitor) -> Result<()> {
        let site = ParamSite::default();
        for (_, expression) in &self.annotations {
            expression.visit_params(visitor, &site)?;
        }
        if let Some(condition) = &self.condition {
            condition.visit_params(visitor, &site)?;
        }
        for ordered in &self.order_by {
            ordered.visit_params(visitor, &site)?;
        }
        self.low.visit_params(visitor, &site)?;
        if let Some(high) = &self.high {
            high.visit_params(visitor, &site)?;
        }
        Ok(())
    }

    fn select_statement<'a>(
        &'a self,
        columns: Vec<(&'a dyn Expression, Option<&'a str>)>,
    ) -> SelectStatement<'a> {
        SelectStatement {
            table: self.table,
            distinct: self.distinct,
            columns,
            condition: self.condition.as_deref(),
            order_by: self
                .order_by
                .iter()
                .map(|v| v as &dyn Expression)
                .collect(),
            low: &self.low,
            high: self.high.as_ref(),
        }
    }

    fn projection(&self) -> Vec<(&dyn Expression, Option<&str>)> {
        let fields = match &self.fields {
            Some(fields) => fields.clone(),
            None => self.model_columns.iter().collect(),
        };
        fields
            .into_iter()
            .map(|v| (v as &dyn Expression, None))
            .chain(
                self.annotations
                    .iter()
                    .map(|(alias, v)| (v.as_ref() as &dyn Expression, Some(alias.as_str()))),
            )
            .collect()
    }

    /// Text and parameters of the `SELECT`, the same generation feeds every execution path.
    pub fn generate_select(&self, writer: &dyn SqlWriter) -> GeneratedSql {
        let mut context = Context::new(Fragment::None, false);
        let mut sql = String::with_capacity(256);
        writer.write_select(&mut context, &mut sql, &self.select_statement(self.projection()));
        GeneratedSql::new(sql, context.params)
    }

    pub fn generate_count(&self, writer: &dyn SqlWriter) -> GeneratedSql {
        let mut context = Context::new(Fragment::None, false);
        let mut sql = String::with_capacity(256);
        let columns = if self.distinct {
            self.projection()
        } else {
            vec![(self.primary_key as &dyn Expression, None)]
        };
        writer.write_select_count(&mut context, &mut sql, &self.select_statement(columns));
        GeneratedSql::new(sql, context.params)
    }

    pub fn generate_update(
        &self,
        writer: &dyn SqlWriter,
        assignments: &[(&ColumnDef, &dyn Expression)],
    ) -> Result<GeneratedSql> {
        if self.is_sliced() {
            return Err(Error::msg("Cannot update a query once a slice has been taken"));
        }
        let mut context = Context::new(Fragment::None, false);
        let mut sql = String::with_capacity(256);
        writer.write_update(
            &mut context,
            &mut sql,
            self.table,
            assignments,
            self.condition.as_deref(),
        );
        Ok(GeneratedSql::new(sql, context.params))
    }

    pub fn generate_delete(&self, writer: &dyn SqlWriter) -> Result<GeneratedSql> {
        if self.is_sliced() {
            return Err(Error::msg("Cannot delete a query once a slice has been taken"));
        }
        let mut context = Context::new(Fragment::None, false);
        let mut sql = String::with_capacity(128);
        writer.write_delete(&mut context, &mut sql, self.table, self.condition.as_deref());
        Ok(GeneratedSql::new(sql, context.params))
    }
}
