use crate::{
    Bound, Error, GenericSqlWriter, PreparedError, Result, SqlWriter, Value, truncate_long,
    writer::Context,
};
use std::{
    fmt::{self, Display, Formatter},
    sync::Arc,
};

/// Something that belongs at an offset of the generated text.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlParam {
    /// Ordinary literal.
    Value(Value),
    /// One placeholder slot of a bind parameter, `element` is zero for scalars.
    Token { token: Arc<str>, element: usize },
    /// Row count of a slice with a bind parameter bound, `high - low` clamped at zero.
    Span { low: Bound, high: Bound },
}

/// Text of a statement and the parameters that go in it.
///
/// Offsets are increasing byte positions inside `sql`, the same generation serves inline
/// execution (literals written in place), prepared compilation (placeholders written at
/// the tokens) and display.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GeneratedSql {
    pub sql: String,
    pub params: Vec<(usize, SqlParam)>,
}

impl GeneratedSql {
    pub fn new(sql: String, params: Vec<(usize, SqlParam)>) -> Self {
        Self { sql, params }
    }

    pub fn has_tokens(&self) -> bool {
        self.params
            .iter()
            .any(|(_, v)| matches!(v, SqlParam::Token { .. } | SqlParam::Span { .. }))
    }

    /// Walk the text, `f` writes the replacement for each parameter.
    pub fn render<F>(&self, mut f: F) -> Result<String>
    where
        F: FnMut(&mut String, &SqlParam) -> Result<()>,
    {
        let mut out = String::with_capacity(self.sql.len() + self.params.len() * 8);
        let mut position = 0;
        for (offset, param) in &self.params {
            let Some(chunk) = self.sql.get(position..*offset) else {
                return Err(Error::msg(format!(
                    "Parameter offset {} is not valid for the query `{}`",
                    offset,
                    truncate_long!(self.sql)
                )));
            };
            out.push_str(chunk);
            f(&mut out, param)?;
            position = *offset;
        }
        out.push_str(&self.sql[position..]);
        Ok(out)
    }

    /// Text with every literal written in place, fails if a bind parameter is still present.
    pub fn inline(&self, writer: &dyn SqlWriter) -> Result<String> {
        let mut context = Context::default();
        self.render(|out, param| match param {
            SqlParam::Value(value) => {
                writer.write_value(&mut context, out, value);
                Ok(())
            }
            SqlParam::Token { .. } | SqlParam::Span { .. } => {
                Err(PreparedError::QueryNotPrepared.into())
            }
        })
    }
}

impl Display for GeneratedSql {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let writer = GenericSqlWriter::new();
        let mut context = Context::default();
        let rendered = self.render(|out, param| {
            match param {
                SqlParam::Value(value) => writer.write_value(&mut context, out, value),
                SqlParam::Token { .. } | SqlParam::Span { .. } => out.push('?'),
            }
            Ok(())
        });
        match rendered {
            Ok(v) => f.write_str(&v),
            Err(..) => f.write_str(&self.sql),
        }
    }
}
