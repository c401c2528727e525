use crate::{
    BinaryOp, Bound, ColumnDef, Context, Dialect, Expression, FieldType, GenericSqlWriter,
    SqlWriter, Value, separated_by,
};
use std::fmt::Write;

#[derive(Default)]
pub struct MySqlSqlWriter {}

impl MySqlSqlWriter {
    pub fn new() -> Self {
        Self {}
    }
}

impl SqlWriter for MySqlSqlWriter {
    fn as_dyn(&self) -> &dyn SqlWriter {
        self
    }

    fn write_identifier_quoted(&self, context: &mut Context, out: &mut String, value: &str) {
        out.push('`');
        self.write_escaped(context, out, value, '`', "``");
        out.push('`');
    }

    fn write_column_type(&self, context: &mut Context, out: &mut String, value: &FieldType) {
        match value {
            FieldType::AutoField => out.push_str("INTEGER AUTO_INCREMENT"),
            FieldType::BigAutoField => out.push_str("BIGINT AUTO_INCREMENT"),
            FieldType::SmallInteger => out.push_str("SMALLINT"),
            FieldType::PositiveSmallInteger => out.push_str("SMALLINT UNSIGNED"),
            FieldType::Integer => out.push_str("INTEGER"),
            FieldType::PositiveInteger => out.push_str("INTEGER UNSIGNED"),
            FieldType::BigInteger => out.push_str("BIGINT"),
            FieldType::Float => out.push_str("DOUBLE"),
            FieldType::Decimal { precision, scale } => {
                let _ = write!(out, "DECIMAL({},{})", precision, scale);
            }
            FieldType::Boolean | FieldType::NullBoolean => out.push_str("BOOLEAN"),
            FieldType::Char { max_length }
            | FieldType::Email { max_length }
            | FieldType::Url { max_length }
            | FieldType::Slug { max_length } => {
                let _ = write!(out, "VARCHAR({})", max_length);
            }
            FieldType::Text => out.push_str("LONGTEXT"),
            FieldType::IpAddress => out.push_str("VARCHAR(39)"),
            FieldType::Binary => out.push_str("LONGBLOB"),
            FieldType::Date => out.push_str("DATE"),
            FieldType::DateTime => out.push_str("DATETIME(6)"),
            FieldType::Time => out.push_str("TIME(6)"),
            FieldType::Uuid => out.push_str("CHAR(36)"),
            FieldType::ForeignKey { target } => {
                self.write_column_type(context, out, &target.bind_type())
            }
        }
    }

    fn write_column_check(&self, _context: &mut Context, _out: &mut String, _column: &ColumnDef) {
        // Positive columns are UNSIGNED
    }

    fn write_value_infinity(&self, _context: &mut Context, out: &mut String, negative: bool) {
        if negative {
            out.push('-');
        }
        out.push_str("1.0e+10000");
    }

    fn write_value_string(&self, _context: &mut Context, out: &mut String, value: &str) {
        out.push('\'');
        for c in value.chars() {
            match c {
                '\'' => out.push_str("''"),
                '\\' => out.push_str("\\\\"),
                '\0' => out.push_str("\\0"),
                c => out.push(c),
            }
        }
        out.push('\'');
    }

    fn write_value_list(&self, context: &mut Context, out: &mut String, value: &[Value]) {
        out.push('(');
        separated_by(
            out,
            value,
            |out, v| {
                self.write_value(context, out, v);
            },
            ", ",
        );
        out.push(')');
    }

    fn write_like_operator(&self, _context: &mut Context, out: &mut String, _case_insensitive: bool) {
        // Default collations already compare case insensitively
        out.push_str(" LIKE ");
    }

    fn write_like_pattern(
        &self,
        context: &mut Context,
        out: &mut String,
        prefix: &str,
        value: &dyn Expression,
        suffix: &str,
    ) {
        out.push_str("CONCAT(");
        if !prefix.is_empty() {
            self.write_value_string(context, out, prefix);
            out.push_str(", ");
        }
        value.write_query(self, context, out);
        if !suffix.is_empty() {
            out.push_str(", ");
            self.write_value_string(context, out, suffix);
        }
        out.push(')');
    }

    fn write_expression_iexact(
        &self,
        context: &mut Context,
        out: &mut String,
        value: &BinaryOp<&dyn Expression, &dyn Expression>,
    ) {
        value.lhs.write_query(self, context, out);
        out.push_str(" = ");
        value.rhs.write_query(self, context, out);
    }

    fn write_limit_offset(
        &self,
        context: &mut Context,
        out: &mut String,
        low: &Bound,
        high: Option<&Bound>,
    ) {
        match high {
            None if low.is_zero() => {}
            None => {
                out.push_str("\nLIMIT 18446744073709551615 OFFSET ");
                low.write_query(self, context, out);
            }
            Some(high) => GenericSqlWriter::new().write_limit_offset(context, out, low, Some(high)),
        }
    }
}

/// `PREPARE name FROM '...'`, arguments staged in `@p{n}` session variables.
#[derive(Debug, Default)]
pub struct MySqlDialect;

impl MySqlDialect {
    pub fn new() -> Self {
        Self
    }
}

static WRITER: MySqlSqlWriter = MySqlSqlWriter {};

fn write_variable(out: &mut String, position: usize) {
    let _ = write!(out, "@p{}", position);
}

impl Dialect for MySqlDialect {
    fn vendor(&self) -> &'static str {
        "mysql"
    }

    fn sql_writer(&self) -> &dyn SqlWriter {
        &WRITER
    }

    fn placeholder(&self, _position: usize) -> String {
        "?".into()
    }

    fn numbered_placeholders(&self) -> bool {
        false
    }

    fn write_prepare(&self, name: &str, _types: &[FieldType], body: &str) -> String {
        let mut out = String::with_capacity(body.len() + name.len() + 24);
        out.push_str("PREPARE ");
        out.push_str(name);
        out.push_str(" FROM ");
        WRITER.write_value_string(&mut Context::default(), &mut out, body);
        out.push(';');
        out
    }

    fn write_execute(&self, name: &str, arguments: &[Value]) -> String {
        let mut out = String::with_capacity(name.len() + arguments.len() * 6 + 24);
        out.push_str("EXECUTE ");
        out.push_str(name);
        if !arguments.is_empty() {
            out.push_str(" USING ");
            separated_by(&mut out, 0..arguments.len(), write_variable, ", ");
        }
        out.push(';');
        out
    }

    fn requires_session_setup(&self) -> bool {
        true
    }

    fn write_session_setup(&self, arguments: &[Value]) -> Option<String> {
        if arguments.is_empty() {
            return None;
        }
        let mut out = String::with_capacity(arguments.len() * 16 + 4);
        let mut context = Context::default();
        out.push_str("SET ");
        separated_by(
            &mut out,
            arguments.iter().enumerate(),
            |out, (i, v)| {
                write_variable(out, i);
                out.push_str(" = ");
                WRITER.write_value(&mut context, out, v);
            },
            ", ",
        );
        out.push(';');
        Some(out)
    }

    fn write_session_cleanup(&self, count: usize) -> Option<String> {
        if count == 0 {
            return None;
        }
        let mut out = String::with_capacity(count * 16 + 4);
        out.push_str("SET ");
        separated_by(
            &mut out,
            0..count,
            |out, i| {
                write_variable(out, i);
                out.push_str(" = NULL");
            },
            ", ",
        );
        out.push(';');
        Some(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ColumnDef, ExpressionExt, Fragment};

    #[test]
    fn session_variables() {
        let dialect = MySqlDialect::new();
        assert_eq!(dialect.placeholder(3), "?");
        assert_eq!(
            dialect.write_prepare("book_1f", &[FieldType::Integer], "SELECT 'it''s' WHERE ? = \\"),
            "PREPARE book_1f FROM 'SELECT ''it''''s'' WHERE ? = \\\\';"
        );
        let arguments = [Value::Int32(Some(7)), Value::Null];
        assert_eq!(
            dialect.write_session_setup(&arguments).as_deref(),
            Some("SET @p0 = 7, @p1 = NULL;")
        );
        assert_eq!(
            dialect.write_execute("book_1f", &arguments),
            "EXECUTE book_1f USING @p0, @p1;"
        );
        assert_eq!(
            dialect.write_session_cleanup(2).as_deref(),
            Some("SET @p0 = NULL, @p1 = NULL;")
        );
        assert_eq!(dialect.write_session_setup(&[]), None);
        assert_eq!(dialect.write_execute("a", &[]), "EXECUTE a;");
    }

    #[test]
    fn patterns_use_concat() {
        const TITLE: ColumnDef = ColumnDef::new("book", "title", FieldType::Text);
        let mut context = Context::new(Fragment::SqlSelectWhere, false);
        let mut out = String::new();
        TITLE
            .icontains(crate::Raw::new("?"))
            .write_query(&WRITER, &mut context, &mut out);
        assert_eq!(out, "`title` LIKE CONCAT('%', ?, '%')");
    }
}
