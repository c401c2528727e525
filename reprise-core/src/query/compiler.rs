use crate::{
    AsValue, BinaryOpType, BindParam, Bound, Dialect, Error, FieldType, Lookup, LogicalQuery, ParamSite,
    ParamVisitor, PreparedError, Result, SqlParam, UnaryOpType, Value, truncate_long,
    writer::Context,
};
use sha2::{Digest, Sha256};
use std::{
    collections::HashMap,
    fmt::{self, Display, Formatter},
    sync::Arc,
};

/// What feeds one placeholder slot of a prepared statement.
#[derive(Debug, Clone, PartialEq)]
pub enum SlotSource {
    /// Element of a bind parameter, arrays own `size` consecutive slots.
    Param {
        token: Arc<str>,
        name: String,
        element: usize,
    },
    /// Row count of a slice, computed from the bounds when executing.
    Span { low: Bound, high: Bound },
}

#[derive(Debug, Clone, PartialEq)]
pub struct PrepareSlot {
    pub source: SlotSource,
    pub field_type: FieldType,
}

/// Result of compiling a logical query for one vendor.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledPrepareArtifact {
    pub vendor: &'static str,
    /// Server side statement name, derived from the body.
    pub name: String,
    /// Query text with the vendor placeholders.
    pub body: String,
    /// The complete `PREPARE` statement.
    pub statement_sql: String,
    /// Ordinary literals, written in the body.
    pub fixed_params: Vec<Value>,
    /// Correlation tokens of the bind parameters, in first seen order.
    pub params_order: Vec<Arc<str>>,
    /// Names of the bind parameters, aligned with `params_order`.
    pub names: Vec<String>,
    pub slots: Vec<PrepareSlot>,
    /// Slot feeding each argument of `EXECUTE`.
    ///
    /// Numbered placeholders map one to one on the slots, anonymous placeholders get one
    /// entry per occurrence in the text.
    pub positions: Vec<usize>,
}

impl CompiledPrepareArtifact {
    /// Bind parameter names in the order of `params_order`.
    pub fn param_names(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }
}

impl Display for CompiledPrepareArtifact {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{} (", self.statement_sql)?;
        for (i, token) in self.params_order.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            f.write_str(token)?;
        }
        f.write_str(")")
    }
}

/// Assigns a field type to every parameter and rejects the shapes that can't be prepared.
struct TypeResolver;

impl ParamVisitor for TypeResolver {
    fn visit(&mut self, param: &BindParam, site: &ParamSite) -> Result<()> {
        match site.lookup {
            Lookup::Unary(UnaryOpType::IsNull | UnaryOpType::IsNotNull) => {
                return Err(PreparedError::UnsupportedLookup {
                    lookup: "isnull".into(),
                }
                .into());
            }
            Lookup::Binary(BinaryOpType::In) if !param.is_array() => {
                return Err(PreparedError::ArrayParameterRequired {
                    name: param.name().into(),
                }
                .into());
            }
            Lookup::Binary(
                BinaryOpType::Contains
                | BinaryOpType::IContains
                | BinaryOpType::StartsWith
                | BinaryOpType::EndsWith
                | BinaryOpType::Like
                | BinaryOpType::NotLike,
            ) => {
                // The parameter is the pattern, not a value of the column
                param.infer_type(FieldType::Text);
            }
            _ => {
                if let Some(target) = site.target {
                    param.infer_type(target);
                    param.infer_nullable(site.nullable);
                }
            }
        }
        Ok(())
    }
}

/// `<table>_<24 hex digits of sha256(body)>`, equal bodies share the name.
pub fn statement_name(table: &str, body: &str) -> String {
    let mut prefix = table
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '_'
            }
        })
        .take(38)
        .collect::<String>();
    if prefix.is_empty() || prefix.starts_with(|c: char| c.is_ascii_digit()) {
        prefix.insert(0, 's');
    }
    let digest = Sha256::digest(body.as_bytes());
    format!("{}_{}", prefix, &hex::encode(digest)[..24])
}

pub struct PrepareCompiler;

impl PrepareCompiler {
    pub fn compile(
        query: &LogicalQuery,
        dialect: &dyn Dialect,
    ) -> Result<Arc<CompiledPrepareArtifact>> {
        if let Some(artifact) = query.memo().get()
            && artifact.vendor == dialect.vendor()
        {
            return Ok(artifact.clone());
        }
        query.visit_params(&mut TypeResolver)?;
        if let Some(param) = query.params.iter().find(|v| v.field_type().is_none()) {
            return Err(PreparedError::MissingParameterType {
                name: param.name().into(),
            }
            .into());
        }
        let writer = dialect.sql_writer();
        let generated = query.generate_select(writer);
        let mut context = Context::default();
        let mut fixed_params = Vec::new();
        let mut params_order = Vec::new();
        let mut names = Vec::new();
        let mut seen = |param: &BindParam| {
            if !params_order.iter().any(|v: &Arc<str>| **v == *param.token()) {
                params_order.push(param.shared_token());
                names.push(param.name().to_string());
            }
        };
        let mut slots: Vec<PrepareSlot> = Vec::new();
        let mut positions = Vec::new();
        let mut bases = HashMap::<Arc<str>, usize>::new();
        let body = generated.render(|out, param| {
            match param {
                SqlParam::Value(value) => {
                    writer.write_value(&mut context, out, value);
                    fixed_params.push(value.clone());
                }
                SqlParam::Token { token, element } => {
                    let base = match bases.get(token) {
                        Some(base) => *base,
                        None => {
                            let Some(param) = query.params.by_token(token) else {
                                return Err(Error::msg(format!(
                                    "Token `{}` does not belong to any registered bind parameter",
                                    token
                                )));
                            };
                            let base = slots.len();
                            let field_type = param
                                .field_type()
                                .map(|v| v.bind_type())
                                .unwrap_or(FieldType::Text);
                            slots.extend((0..param.size()).map(|element| PrepareSlot {
                                source: SlotSource::Param {
                                    token: token.clone(),
                                    name: param.name().into(),
                                    element,
                                },
                                field_type,
                            }));
                            bases.insert(token.clone(), base);
                            seen(param);
                            base
                        }
                    };
                    let slot = base + element;
                    if !dialect.numbered_placeholders() {
                        positions.push(slot);
                    }
                    out.push_str(&dialect.placeholder(slot));
                }
                SqlParam::Span { low, high } => {
                    for bound in [low, high] {
                        if let Bound::Param(param) = bound {
                            seen(param);
                        }
                    }
                    let slot = slots.len();
                    slots.push(PrepareSlot {
                        source: SlotSource::Span {
                            low: low.clone(),
                            high: high.clone(),
                        },
                        field_type: FieldType::BigInteger,
                    });
                    if !dialect.numbered_placeholders() {
                        positions.push(slot);
                    }
                    out.push_str(&dialect.placeholder(slot));
                }
            }
            Ok(())
        })?;
        if dialect.numbered_placeholders() {
            positions = (0..slots.len()).collect();
        }
        let name = statement_name(query.table.name, &body);
        let types = positions
            .iter()
            .map(|v| slots[*v].field_type)
            .collect::<Vec<_>>();
        let statement_sql = dialect.write_prepare(&name, &types, &body);
        log::debug!(
            "Compiled `{}` for {}: {}",
            name,
            dialect.vendor(),
            truncate_long!(statement_sql)
        );
        let artifact = Arc::new(CompiledPrepareArtifact {
            vendor: dialect.vendor(),
            name,
            body,
            statement_sql,
            fixed_params,
            params_order,
            names,
            slots,
            positions,
        });
        let _ = query.memo().set(artifact.clone());
        Ok(artifact)
    }
}

/// Statements running one execution of a prepared query, in order: `setup`, `sql`, `cleanup`.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecuteStatement {
    pub setup: Option<String>,
    pub cleanup: Option<String>,
    pub sql: String,
    /// Positional argument values, already carried by `setup` or `sql`.
    pub arguments: Vec<Value>,
}

pub struct ExecuteCompiler;

impl ExecuteCompiler {
    /// `cleaned` maps each parameter name to its wire values, one per slot.
    pub fn compile(
        artifact: &CompiledPrepareArtifact,
        dialect: &dyn Dialect,
        cleaned: &HashMap<String, Vec<Value>>,
    ) -> Result<ExecuteStatement> {
        let mut arguments = Vec::with_capacity(artifact.positions.len());
        for position in &artifact.positions {
            let Some(slot) = artifact.slots.get(*position) else {
                return Err(Error::msg(format!(
                    "Statement `{}` has no slot {}",
                    artifact.name, position
                )));
            };
            let value = match &slot.source {
                SlotSource::Param { name, element, .. } => {
                    let Some(value) = cleaned.get(name).and_then(|v| v.get(*element)) else {
                        return Err(Error::msg(format!(
                            "No value for element {} of bind parameter `{}`",
                            element, name
                        )));
                    };
                    value.clone()
                }
                SlotSource::Span { low, high } => {
                    let count = Self::bound(high, cleaned)?.saturating_sub(Self::bound(low, cleaned)?);
                    Value::Int64(Some(count.max(0)))
                }
            };
            arguments.push(value);
        }
        let sql = dialect.write_execute(&artifact.name, &arguments);
        let (setup, cleanup) = if dialect.requires_session_setup() {
            (
                dialect.write_session_setup(&arguments),
                dialect.write_session_cleanup(arguments.len()),
            )
        } else {
            (None, None)
        };
        Ok(ExecuteStatement {
            setup,
            cleanup,
            sql,
            arguments,
        })
    }

    fn bound(bound: &Bound, cleaned: &HashMap<String, Vec<Value>>) -> Result<i64> {
        match bound {
            Bound::Value(v) => Ok(i64::try_from(*v).unwrap_or(i64::MAX)),
            Bound::Param(param) => {
                let Some(value) = cleaned.get(param.name()).and_then(|v| v.first()) else {
                    return Err(Error::msg(format!(
                        "No value for the slice bound `{}`",
                        param.name()
                    )));
                };
                i64::try_from_value(value.clone())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        BindArray, Bound, ColumnDef, ExpressionExt, MySqlDialect, PostgresDialect, TableRef,
    };
    use indoc::indoc;

    static AUTHOR: TableRef = TableRef::new("author");
    static COLUMNS: [ColumnDef; 2] = [
        ColumnDef::new("author", "id", FieldType::AutoField).primary_key(),
        ColumnDef::new("author", "name", FieldType::Char { max_length: 255 }),
    ];

    fn query() -> LogicalQuery {
        LogicalQuery::new(&AUTHOR, &COLUMNS, &COLUMNS[0])
    }

    fn filtered(condition: impl ExpressionExt) -> LogicalQuery {
        let mut query = query();
        query
            .add_condition(condition.boxed(), BinaryOpType::And)
            .unwrap();
        query
    }

    fn error_of<T: std::fmt::Debug>(result: Result<T>) -> PreparedError {
        let error = result.expect_err("should fail");
        PreparedError::of(&error)
            .cloned()
            .unwrap_or_else(|| panic!("unexpected error {:#}", error))
    }

    #[test]
    fn prepare_postgres() {
        let query = filtered(COLUMNS[1].eq(BindParam::new("name")));
        let artifact = PrepareCompiler::compile(&query, &PostgresDialect::new()).unwrap();
        assert_eq!(
            artifact.body,
            indoc! {r#"
                SELECT "id", "name"
                FROM "author"
                WHERE "name" = $1"#}
        );
        assert!(artifact.name.starts_with("author_"));
        assert_eq!(artifact.name.len(), "author_".len() + 24);
        assert_eq!(
            artifact.statement_sql,
            format!("PREPARE {} (VARCHAR(255)) AS {};", artifact.name, artifact.body)
        );
        assert_eq!(artifact.param_names().collect::<Vec<_>>(), ["name"]);
        assert_eq!(artifact.positions, [0]);
        assert!(artifact.fixed_params.is_empty());
    }

    #[test]
    fn prepare_is_memoized() {
        let query = filtered(COLUMNS[1].eq(BindParam::new("name")));
        let dialect = PostgresDialect::new();
        let first = PrepareCompiler::compile(&query, &dialect).unwrap();
        let second = PrepareCompiler::compile(&query, &dialect).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        let clone = query.clone();
        assert!(Arc::ptr_eq(
            &first,
            &PrepareCompiler::compile(&clone, &dialect).unwrap()
        ));

        // Another vendor compiles its own statement
        let mysql = PrepareCompiler::compile(&query, &MySqlDialect::new()).unwrap();
        assert_eq!(mysql.vendor, "mysql");
        assert_ne!(mysql.body, first.body);

        let mut changed = query.clone();
        changed.invalidate();
        let third = PrepareCompiler::compile(&changed, &dialect).unwrap();
        assert!(!Arc::ptr_eq(&first, &third));
        assert_eq!(*first, *third);
    }

    #[test]
    fn literals_stay_in_the_body() {
        let query = filtered(
            COLUMNS[0]
                .gt(Value::Int32(Some(2)))
                .and(COLUMNS[1].eq(BindParam::new("name"))),
        );
        let artifact = PrepareCompiler::compile(&query, &PostgresDialect::new()).unwrap();
        assert!(artifact.body.ends_with(r#"WHERE "id" > 2 AND "name" = $1"#));
        assert_eq!(artifact.fixed_params, [Value::Int32(Some(2))]);
        assert_eq!(artifact.params_order.len(), 1);
    }

    #[test]
    fn repeated_parameter() {
        let name = BindParam::new("name");
        let query = filtered(
            COLUMNS[1]
                .eq(name.clone())
                .or(COLUMNS[1].startswith(name.clone())),
        );
        let postgres = PrepareCompiler::compile(&query, &PostgresDialect::new()).unwrap();
        assert_eq!(postgres.body.matches("$1").count(), 2);
        assert_eq!(postgres.positions, [0]);
        assert_eq!(name.field_type(), Some(FieldType::Char { max_length: 255 }));

        let mysql = PrepareCompiler::compile(&query, &MySqlDialect::new()).unwrap();
        assert_eq!(mysql.positions, [0, 0]);
        let cleaned = HashMap::from([("name".to_string(), vec![Value::Varchar(Some("S".into()))])]);
        let statement = ExecuteCompiler::compile(&mysql, &MySqlDialect::new(), &cleaned).unwrap();
        assert_eq!(statement.setup.as_deref(), Some("SET @p0 = 'S', @p1 = 'S';"));
        assert_eq!(
            statement.sql,
            format!("EXECUTE {} USING @p0, @p1;", mysql.name)
        );
        assert_eq!(
            statement.cleanup.as_deref(),
            Some("SET @p0 = NULL, @p1 = NULL;")
        );
    }

    #[test]
    fn array_parameter_slots() {
        let query = filtered(
            COLUMNS[0]
                .is_in(BindArray::new("ids", 2))
                .and(COLUMNS[1].icontains(BindParam::new("part"))),
        );
        let artifact = PrepareCompiler::compile(&query, &PostgresDialect::new()).unwrap();
        assert!(artifact.body.contains(r#""id" IN ($1, $2)"#));
        assert!(artifact.body.contains(r#""name" ILIKE '%' || $3 || '%'"#));
        assert_eq!(
            artifact
                .slots
                .iter()
                .map(|v| match &v.source {
                    SlotSource::Param { name, element, .. } => {
                        (name.as_str(), *element, v.field_type)
                    }
                    SlotSource::Span { .. } => ("", 0, v.field_type),
                })
                .collect::<Vec<_>>(),
            [
                ("ids", 0, FieldType::Integer),
                ("ids", 1, FieldType::Integer),
                ("part", 0, FieldType::Text),
            ]
        );
        assert!(
            artifact
                .statement_sql
                .starts_with(&format!("PREPARE {} (INTEGER, INTEGER, TEXT) AS ", artifact.name))
        );

        let cleaned = HashMap::from([
            (
                "ids".to_string(),
                vec![Value::Int32(Some(1)), Value::Int32(None)],
            ),
            ("part".to_string(), vec![Value::Varchar(Some("ana".into()))]),
        ]);
        let statement =
            ExecuteCompiler::compile(&artifact, &PostgresDialect::new(), &cleaned).unwrap();
        assert_eq!(statement.setup, None);
        assert_eq!(
            statement.sql,
            format!("EXECUTE {}(1, NULL, 'ana');", artifact.name)
        );
        assert_eq!(statement.arguments.len(), 3);
    }

    #[test]
    fn slice_parameters() {
        let mut query = query();
        query
            .slice(
                Bound::from(BindParam::new("start")),
                Some(BindParam::new("end").into()),
            )
            .unwrap();
        let artifact = PrepareCompiler::compile(&query, &PostgresDialect::new()).unwrap();
        assert!(artifact.body.ends_with("LIMIT $1\nOFFSET $2"));
        assert_eq!(
            artifact.param_names().collect::<Vec<_>>(),
            ["start", "end"]
        );
        assert!(artifact.statement_sql.contains("(BIGINT, BIGINT)"));
        let cleaned = |start: i64, end: i64| {
            HashMap::from([
                ("start".to_string(), vec![Value::Int64(Some(start))]),
                ("end".to_string(), vec![Value::Int64(Some(end))]),
            ])
        };
        let statement =
            ExecuteCompiler::compile(&artifact, &PostgresDialect::new(), &cleaned(1, 3)).unwrap();
        assert_eq!(statement.sql, format!("EXECUTE {}(2, 1);", artifact.name));

        // An empty window reads no rows, like the literal slice
        let statement =
            ExecuteCompiler::compile(&artifact, &PostgresDialect::new(), &cleaned(5, 2)).unwrap();
        assert_eq!(statement.sql, format!("EXECUTE {}(0, 5);", artifact.name));

        let mysql = PrepareCompiler::compile(&query, &MySqlDialect::new()).unwrap();
        assert!(mysql.body.ends_with("LIMIT ?\nOFFSET ?"));
        assert_eq!(mysql.positions, [0, 1]);
        let statement =
            ExecuteCompiler::compile(&mysql, &MySqlDialect::new(), &cleaned(2, 6)).unwrap();
        assert_eq!(statement.setup.as_deref(), Some("SET @p0 = 4, @p1 = 2;"));
        assert_eq!(statement.sql, format!("EXECUTE {} USING @p0, @p1;", mysql.name));

        let mut query = self::query();
        query
            .slice(Bound::Value(0), Some(BindParam::new("end").into()))
            .unwrap();
        let artifact = PrepareCompiler::compile(&query, &MySqlDialect::new()).unwrap();
        assert!(artifact.body.ends_with("LIMIT ?"));

        // Literal start, the offset stays in the text
        let mut query = self::query();
        query
            .slice(Bound::Value(3), Some(BindParam::new("end").into()))
            .unwrap();
        let artifact = PrepareCompiler::compile(&query, &PostgresDialect::new()).unwrap();
        assert!(artifact.body.ends_with("LIMIT $1\nOFFSET 3"));
        let statement = ExecuteCompiler::compile(
            &artifact,
            &PostgresDialect::new(),
            &HashMap::from([("end".to_string(), vec![Value::Int64(Some(2))])]),
        )
        .unwrap();
        assert_eq!(statement.sql, format!("EXECUTE {}(0);", artifact.name));
    }

    #[test]
    fn rejected_shapes() {
        assert_eq!(
            error_of(PrepareCompiler::compile(
                &filtered(BindParam::new("missing").is_null()),
                &PostgresDialect::new()
            )),
            PreparedError::UnsupportedLookup {
                lookup: "isnull".into()
            }
        );
        assert_eq!(
            error_of(PrepareCompiler::compile(
                &filtered(COLUMNS[0].is_in(BindParam::new("ids"))),
                &PostgresDialect::new()
            )),
            PreparedError::ArrayParameterRequired { name: "ids".into() }
        );
        let mut query = query();
        query
            .annotate("flag".into(), BindParam::new("flag").boxed())
            .unwrap();
        assert_eq!(
            error_of(PrepareCompiler::compile(&query, &PostgresDialect::new())),
            PreparedError::MissingParameterType {
                name: "flag".into()
            }
        );
    }

    #[test]
    fn missing_execute_value() {
        let query = filtered(COLUMNS[1].eq(BindParam::new("name")));
        let artifact = PrepareCompiler::compile(&query, &PostgresDialect::new()).unwrap();
        assert!(
            ExecuteCompiler::compile(&artifact, &PostgresDialect::new(), &HashMap::new()).is_err()
        );
    }

    #[test]
    fn statement_names() {
        let a = statement_name("author", "SELECT 1");
        assert_eq!(a, statement_name("author", "SELECT 1"));
        assert_ne!(a, statement_name("author", "SELECT 2"));
        assert!(statement_name("Book Shelf", "SELECT 1").starts_with("book_shelf_"));
        assert!(statement_name("2fa", "SELECT 1").starts_with("s2fa_"));
    }
}
