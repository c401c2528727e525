use crate::{
    Context, Dialect, FieldType, GenericSqlWriter, SqlWriter, Value, separated_by,
};

pub struct PostgresSqlWriter {}

impl PostgresSqlWriter {
    pub fn new() -> Self {
        Self {}
    }
}

impl Default for PostgresSqlWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl SqlWriter for PostgresSqlWriter {
    fn as_dyn(&self) -> &dyn SqlWriter {
        self
    }

    fn write_column_type(&self, context: &mut Context, out: &mut String, value: &FieldType) {
        match value {
            FieldType::Binary => out.push_str("BYTEA"),
            FieldType::ForeignKey { target } => {
                self.write_column_type(context, out, &target.bind_type())
            }
            _ => GenericSqlWriter::new().write_column_type(context, out, value),
        }
    }

    fn write_value_blob(&self, _context: &mut Context, out: &mut String, value: &[u8]) {
        out.push_str("'\\x");
        out.push_str(&hex::encode(value));
        out.push('\'');
    }
}

/// `PREPARE name (types) AS body;` and `EXECUTE name(arguments);` with `$k` placeholders.
#[derive(Debug, Default)]
pub struct PostgresDialect;

impl PostgresDialect {
    pub fn new() -> Self {
        Self
    }
}

static WRITER: PostgresSqlWriter = PostgresSqlWriter {};

impl Dialect for PostgresDialect {
    fn vendor(&self) -> &'static str {
        "postgres"
    }

    fn sql_writer(&self) -> &dyn SqlWriter {
        &WRITER
    }

    fn placeholder(&self, position: usize) -> String {
        format!("${}", position + 1)
    }

    fn numbered_placeholders(&self) -> bool {
        true
    }

    fn write_prepare(&self, name: &str, types: &[FieldType], body: &str) -> String {
        let mut out = String::with_capacity(body.len() + name.len() + 32);
        let mut context = Context::default();
        out.push_str("PREPARE ");
        out.push_str(name);
        if !types.is_empty() {
            out.push_str(" (");
            separated_by(
                &mut out,
                types,
                |out, v| WRITER.write_bind_type(&mut context, out, v),
                ", ",
            );
            out.push(')');
        }
        out.push_str(" AS ");
        out.push_str(body);
        out.push(';');
        out
    }

    fn write_execute(&self, name: &str, arguments: &[Value]) -> String {
        // Utility statements take no protocol level parameters, the values go in the text
        let mut out = String::with_capacity(name.len() + arguments.len() * 16 + 16);
        let mut context = Context::default();
        out.push_str("EXECUTE ");
        out.push_str(name);
        if !arguments.is_empty() {
            out.push('(');
            separated_by(
                &mut out,
                arguments,
                |out, v| WRITER.write_value(&mut context, out, v),
                ", ",
            );
            out.push(')');
        }
        out.push(';');
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prepare_and_execute() {
        let dialect = PostgresDialect::new();
        assert_eq!(dialect.placeholder(0), "$1");
        assert_eq!(
            dialect.write_prepare(
                "author_0a",
                &[FieldType::AutoField, FieldType::Text],
                "SELECT 1 WHERE $1 = $2"
            ),
            "PREPARE author_0a (INTEGER, TEXT) AS SELECT 1 WHERE $1 = $2;"
        );
        assert_eq!(
            dialect.write_prepare("a", &[], "SELECT 1"),
            "PREPARE a AS SELECT 1;"
        );
        assert_eq!(
            dialect.write_execute(
                "author_0a",
                &[Value::Int32(Some(1)), Value::Varchar(Some("O'Brien".into()))]
            ),
            "EXECUTE author_0a(1, 'O''Brien');"
        );
        assert_eq!(dialect.write_execute("a", &[]), "EXECUTE a;");
        assert!(!dialect.requires_session_setup());
        assert!(dialect.write_session_setup(&[Value::Null]).is_none());
    }

    #[test]
    fn blobs_are_bytea() {
        let mut out = String::new();
        WRITER.write_value(
            &mut Context::default(),
            &mut out,
            &Value::Blob(Some([0xde, 0xad].into())),
        );
        assert_eq!(out, "'\\xdead'");
        out.clear();
        WRITER.write_column_type(&mut Context::default(), &mut out, &FieldType::Binary);
        assert_eq!(out, "BYTEA");
    }
}
