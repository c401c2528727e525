use crate::{
    BinaryOp, BinaryOpType, BindParam, Bound, Case, ColumnDef, ColumnRef, Expression, FieldType,
    Order, Ordered, Raw, SqlParam, TableRef, UnaryOp, UnaryOpType, Value, possibly_parenthesized,
    separated_by,
    writer::{Context, Fragment},
};
use std::fmt::Write;
use time::{Date, OffsetDateTime, PrimitiveDateTime, Time};

macro_rules! write_integer {
    ($out:ident, $value:expr) => {{
        let mut buffer = itoa::Buffer::new();
        $out.push_str(buffer.format($value));
    }};
}
macro_rules! write_float {
    ($this:ident, $context:ident,$out:ident, $value:expr) => {{
        if $value.is_infinite() {
            $this.write_value_infinity($context, $out, $value.is_sign_negative());
        } else if $value.is_nan() {
            $this.write_value_nan($context, $out);
        } else {
            let mut buffer = ryu::Buffer::new();
            $out.push_str(buffer.format($value));
        }
    }};
}

/// Pieces of a `SELECT` statement, borrowed from a logical query.
pub struct SelectStatement<'a> {
    pub table: &'a TableRef,
    pub distinct: bool,
    /// Projected expressions with their optional alias.
    pub columns: Vec<(&'a dyn Expression, Option<&'a str>)>,
    pub condition: Option<&'a dyn Expression>,
    pub order_by: Vec<&'a dyn Expression>,
    /// Rows to skip.
    pub low: &'a Bound,
    /// Row index where the result stops, exclusive.
    pub high: Option<&'a Bound>,
}

impl SelectStatement<'_> {
    pub fn is_sliced(&self) -> bool {
        self.high.is_some() || !self.low.is_zero()
    }
}

/// Dialect printer converting semantic constructs into concrete SQL strings.
pub trait SqlWriter: Send + Sync {
    fn as_dyn(&self) -> &dyn SqlWriter;

    /// Escape occurrences of `search` char with `replace` while copying into buffer.
    fn write_escaped(
        &self,
        _context: &mut Context,
        out: &mut String,
        value: &str,
        search: char,
        replace: &str,
    ) {
        let mut position = 0;
        for (i, c) in value.char_indices() {
            if c == search {
                out.push_str(&value[position..i]);
                out.push_str(replace);
                position = i + c.len_utf8();
            }
        }
        out.push_str(&value[position..]);
    }

    /// Quote identifiers ("name") doubling inner quotes.
    fn write_identifier_quoted(&self, context: &mut Context, out: &mut String, value: &str) {
        out.push('"');
        self.write_escaped(context, out, value, '"', "\"\"");
        out.push('"');
    }

    /// Render a table reference with optional alias.
    fn write_table_ref(&self, context: &mut Context, out: &mut String, value: &TableRef) {
        if !value.schema.is_empty() {
            self.write_identifier_quoted(context, out, value.schema);
            out.push('.');
        }
        self.write_identifier_quoted(context, out, value.name);
        if !value.alias.is_empty() {
            let _ = write!(out, " {}", value.alias);
        }
    }

    /// Render a column reference optionally qualifying with schema/table.
    fn write_column_ref(&self, context: &mut Context, out: &mut String, value: &ColumnRef) {
        if context.qualify_columns && !value.table.is_empty() {
            if !value.schema.is_empty() {
                self.write_identifier_quoted(context, out, value.schema);
                out.push('.');
            }
            self.write_identifier_quoted(context, out, value.table);
            out.push('.');
        }
        self.write_identifier_quoted(context, out, value.name);
    }

    /// Render the column type used in `CREATE TABLE`.
    fn write_column_type(&self, context: &mut Context, out: &mut String, value: &FieldType) {
        match value {
            FieldType::AutoField => out.push_str("SERIAL"),
            FieldType::BigAutoField => out.push_str("BIGSERIAL"),
            FieldType::SmallInteger | FieldType::PositiveSmallInteger => out.push_str("SMALLINT"),
            FieldType::Integer | FieldType::PositiveInteger => out.push_str("INTEGER"),
            FieldType::BigInteger => out.push_str("BIGINT"),
            FieldType::Float => out.push_str("DOUBLE PRECISION"),
            FieldType::Decimal { precision, scale } => {
                let _ = write!(out, "NUMERIC({},{})", precision, scale);
            }
            FieldType::Boolean | FieldType::NullBoolean => out.push_str("BOOLEAN"),
            FieldType::Char { max_length }
            | FieldType::Email { max_length }
            | FieldType::Url { max_length }
            | FieldType::Slug { max_length } => {
                let _ = write!(out, "VARCHAR({})", max_length);
            }
            FieldType::Text => out.push_str("TEXT"),
            FieldType::IpAddress => out.push_str("VARCHAR(39)"),
            FieldType::Binary => out.push_str("BLOB"),
            FieldType::Date => out.push_str("DATE"),
            FieldType::DateTime => out.push_str("TIMESTAMP"),
            FieldType::Time => out.push_str("TIME"),
            FieldType::Uuid => out.push_str("UUID"),
            FieldType::ForeignKey { target } => {
                self.write_column_type(context, out, &target.bind_type())
            }
        }
    }

    /// Render the type of a prepared statement argument.
    fn write_bind_type(&self, context: &mut Context, out: &mut String, value: &FieldType) {
        self.write_column_type(context, out, &value.bind_type());
    }

    /// Render a concrete value (including proper quoting / escaping).
    fn write_value(&self, context: &mut Context, out: &mut String, value: &Value) {
        match value {
            v if v.is_null() => self.write_value_none(context, out),
            Value::Boolean(Some(v)) => self.write_value_bool(context, out, *v),
            Value::Int8(Some(v)) => write_integer!(out, *v),
            Value::Int16(Some(v)) => write_integer!(out, *v),
            Value::Int32(Some(v)) => write_integer!(out, *v),
            Value::Int64(Some(v)) => write_integer!(out, *v),
            Value::UInt8(Some(v)) => write_integer!(out, *v),
            Value::UInt16(Some(v)) => write_integer!(out, *v),
            Value::UInt32(Some(v)) => write_integer!(out, *v),
            Value::UInt64(Some(v)) => write_integer!(out, *v),
            Value::Float32(Some(v)) => write_float!(self, context, out, *v),
            Value::Float64(Some(v)) => write_float!(self, context, out, *v),
            Value::Decimal(Some(v), ..) => drop(write!(out, "{}", v)),
            Value::Varchar(Some(v)) | Value::Unknown(Some(v)) => {
                self.write_value_string(context, out, v)
            }
            Value::Blob(Some(v)) => self.write_value_blob(context, out, v.as_ref()),
            Value::Date(Some(v)) => self.write_value_date(context, out, v, false),
            Value::Time(Some(v)) => self.write_value_time(context, out, v, false),
            Value::Timestamp(Some(v)) => self.write_value_timestamp(context, out, v),
            Value::TimestampWithTimezone(Some(v)) => self.write_value_timestamptz(context, out, v),
            Value::Uuid(Some(v)) => drop(write!(out, "'{}'", v)),
            Value::List(Some(v), ..) => self.write_value_list(context, out, v),
            _ => self.write_value_none(context, out),
        };
    }

    /// Render NULL literal.
    fn write_value_none(&self, _context: &mut Context, out: &mut String) {
        out.push_str("NULL");
    }

    /// Render boolean literal.
    fn write_value_bool(&self, _context: &mut Context, out: &mut String, value: bool) {
        out.push_str(["false", "true"][value as usize]);
    }

    fn write_value_infinity(&self, _context: &mut Context, out: &mut String, negative: bool) {
        out.push_str(if negative { "'-Infinity'" } else { "'Infinity'" });
    }

    fn write_value_nan(&self, _context: &mut Context, out: &mut String) {
        out.push_str("'NaN'");
    }

    /// Render and escape a string literal using single quotes.
    fn write_value_string(&self, context: &mut Context, out: &mut String, value: &str) {
        out.push('\'');
        self.write_escaped(context, out, value, '\'', "''");
        out.push('\'');
    }

    /// Render a blob literal as a hex string.
    fn write_value_blob(&self, _context: &mut Context, out: &mut String, value: &[u8]) {
        out.push_str("X'");
        out.push_str(&hex::encode_upper(value));
        out.push('\'');
    }

    /// Render a DATE literal (optionally as part of TIMESTAMP composition).
    fn write_value_date(
        &self,
        _context: &mut Context,
        out: &mut String,
        value: &Date,
        timestamp: bool,
    ) {
        let b = if timestamp { "" } else { "'" };
        let _ = write!(
            out,
            "{b}{:04}-{:02}-{:02}{b}",
            value.year(),
            value.month() as u8,
            value.day()
        );
    }

    /// Render a TIME literal (optionally as part of TIMESTAMP composition).
    fn write_value_time(
        &self,
        _context: &mut Context,
        out: &mut String,
        value: &Time,
        timestamp: bool,
    ) {
        let mut subsecond = value.nanosecond();
        let mut width = 9;
        while width > 1 && subsecond % 10 == 0 {
            subsecond /= 10;
            width -= 1;
        }
        let b = if timestamp { "" } else { "'" };
        let _ = write!(
            out,
            "{b}{:02}:{:02}:{:02}.{:0width$}{b}",
            value.hour(),
            value.minute(),
            value.second(),
            subsecond
        );
    }

    /// Render a TIMESTAMP literal.
    fn write_value_timestamp(
        &self,
        context: &mut Context,
        out: &mut String,
        value: &PrimitiveDateTime,
    ) {
        out.push('\'');
        self.write_value_date(context, out, &value.date(), true);
        out.push(' ');
        self.write_value_time(context, out, &value.time(), true);
        out.push('\'');
    }

    /// Render a TIMESTAMPTZ literal, normalized to UTC.
    fn write_value_timestamptz(
        &self,
        context: &mut Context,
        out: &mut String,
        value: &OffsetDateTime,
    ) {
        let date_time = value.to_offset(time::UtcOffset::UTC);
        self.write_value_timestamp(
            context,
            out,
            &PrimitiveDateTime::new(date_time.date(), date_time.time()),
        );
    }

    /// Render list/array literal.
    fn write_value_list(&self, context: &mut Context, out: &mut String, value: &[Value]) {
        out.push_str("ARRAY[");
        separated_by(
            out,
            value,
            |out, v| {
                self.write_value(context, out, v);
            },
            ",",
        );
        out.push(']');
    }

    /// Literal found while rendering an expression, recorded in the context at this offset.
    fn write_expression_value(&self, context: &mut Context, out: &mut String, value: &Value) {
        context
            .params
            .push((out.len(), SqlParam::Value(value.clone())));
    }

    /// Bind parameter occurrence, one recorded slot per element.
    fn write_bind_param(&self, context: &mut Context, out: &mut String, value: &BindParam) {
        let token = value.shared_token();
        if value.is_array() {
            out.push('(');
            for element in 0..value.size() {
                if element > 0 {
                    out.push_str(", ");
                }
                context.params.push((
                    out.len(),
                    SqlParam::Token {
                        token: token.clone(),
                        element,
                    },
                ));
            }
            out.push(')');
        } else {
            context
                .params
                .push((out.len(), SqlParam::Token { token, element: 0 }));
        }
    }

    /// Precedence table for unary operators.
    fn expression_unary_op_precedence(&self, value: &UnaryOpType) -> i32 {
        match value {
            UnaryOpType::Negative => 1250,
            UnaryOpType::Not => 250,
            UnaryOpType::IsNull | UnaryOpType::IsNotNull => 400,
        }
    }

    /// Precedence table for binary operators.
    fn expression_binary_op_precedence(&self, value: &BinaryOpType) -> i32 {
        match value {
            BinaryOpType::Or => 100,
            BinaryOpType::And => 200,
            BinaryOpType::Equal
            | BinaryOpType::NotEqual
            | BinaryOpType::Less
            | BinaryOpType::Greater
            | BinaryOpType::LessEqual
            | BinaryOpType::GreaterEqual
            | BinaryOpType::IExact => 300,
            BinaryOpType::Like
            | BinaryOpType::NotLike
            | BinaryOpType::In
            | BinaryOpType::Between
            | BinaryOpType::Contains
            | BinaryOpType::IContains
            | BinaryOpType::StartsWith
            | BinaryOpType::EndsWith => 400,
            BinaryOpType::Subtraction | BinaryOpType::Addition => 800,
            BinaryOpType::Multiplication | BinaryOpType::Division | BinaryOpType::Remainder => 900,
        }
    }

    /// Render unary operator expression.
    fn write_expression_unary_op(
        &self,
        context: &mut Context,
        out: &mut String,
        value: &UnaryOp<&dyn Expression>,
    ) {
        let precedence = self.expression_unary_op_precedence(&value.op);
        match value.op {
            UnaryOpType::Negative => out.push('-'),
            UnaryOpType::Not => out.push_str("NOT "),
            UnaryOpType::IsNull | UnaryOpType::IsNotNull => {}
        };
        possibly_parenthesized!(
            out,
            value.arg.precedence(self.as_dyn()) <= precedence,
            value.arg.write_query(self.as_dyn(), context, out)
        );
        match value.op {
            UnaryOpType::IsNull => out.push_str(" IS NULL"),
            UnaryOpType::IsNotNull => out.push_str(" IS NOT NULL"),
            UnaryOpType::Negative | UnaryOpType::Not => {}
        };
    }

    /// Render binary operator expression handling precedence / parenthesis.
    fn write_expression_binary_op(
        &self,
        context: &mut Context,
        out: &mut String,
        value: &BinaryOp<&dyn Expression, &dyn Expression>,
    ) {
        let (infix, rhs_parenthesized) = match value.op {
            BinaryOpType::Multiplication => (" * ", false),
            BinaryOpType::Division => (" / ", false),
            BinaryOpType::Remainder => (" % ", false),
            BinaryOpType::Addition => (" + ", false),
            BinaryOpType::Subtraction => (" - ", false),
            BinaryOpType::Like => (" LIKE ", false),
            BinaryOpType::NotLike => (" NOT LIKE ", false),
            BinaryOpType::Equal => (" = ", false),
            BinaryOpType::NotEqual => (" != ", false),
            BinaryOpType::Less => (" < ", false),
            BinaryOpType::LessEqual => (" <= ", false),
            BinaryOpType::Greater => (" > ", false),
            BinaryOpType::GreaterEqual => (" >= ", false),
            BinaryOpType::In => (" IN ", true),
            BinaryOpType::Between => (" BETWEEN ", true),
            BinaryOpType::And => (" AND ", false),
            BinaryOpType::Or => (" OR ", false),
            BinaryOpType::IExact => {
                return self.write_expression_iexact(context, out, value);
            }
            BinaryOpType::Contains
            | BinaryOpType::IContains
            | BinaryOpType::StartsWith
            | BinaryOpType::EndsWith => {
                return self.write_expression_pattern(context, out, value);
            }
        };
        let precedence = self.expression_binary_op_precedence(&value.op);
        possibly_parenthesized!(
            out,
            value.lhs.precedence(self.as_dyn()) < precedence,
            value.lhs.write_query(self.as_dyn(), context, out)
        );
        out.push_str(infix);
        let mut context = context.switch_fragment(if value.op == BinaryOpType::Between {
            Fragment::RangeBounds
        } else {
            context.fragment
        });
        possibly_parenthesized!(
            out,
            !rhs_parenthesized && value.rhs.precedence(self.as_dyn()) <= precedence,
            value
                .rhs
                .write_query(self.as_dyn(), &mut context.current, out)
        );
    }

    /// Render `contains`, `icontains`, `startswith` and `endswith` as a LIKE pattern.
    fn write_expression_pattern(
        &self,
        context: &mut Context,
        out: &mut String,
        value: &BinaryOp<&dyn Expression, &dyn Expression>,
    ) {
        let (prefix, suffix) = match value.op {
            BinaryOpType::StartsWith => ("", "%"),
            BinaryOpType::EndsWith => ("%", ""),
            _ => ("%", "%"),
        };
        let precedence = self.expression_binary_op_precedence(&value.op);
        possibly_parenthesized!(
            out,
            value.lhs.precedence(self.as_dyn()) < precedence,
            value.lhs.write_query(self.as_dyn(), context, out)
        );
        self.write_like_operator(context, out, value.op == BinaryOpType::IContains);
        self.write_like_pattern(context, out, prefix, value.rhs, suffix);
    }

    fn write_like_operator(&self, _context: &mut Context, out: &mut String, case_insensitive: bool) {
        out.push_str(if case_insensitive { " ILIKE " } else { " LIKE " });
    }

    /// Render `prefix || value || suffix`, the wildcards are written directly.
    fn write_like_pattern(
        &self,
        context: &mut Context,
        out: &mut String,
        prefix: &str,
        value: &dyn Expression,
        suffix: &str,
    ) {
        if !prefix.is_empty() {
            self.write_value_string(context, out, prefix);
            out.push_str(" || ");
        }
        possibly_parenthesized!(
            out,
            value.precedence(self.as_dyn())
                < self.expression_binary_op_precedence(&BinaryOpType::Addition),
            value.write_query(self.as_dyn(), context, out)
        );
        if !suffix.is_empty() {
            out.push_str(" || ");
            self.write_value_string(context, out, suffix);
        }
    }

    /// Case insensitive equality.
    fn write_expression_iexact(
        &self,
        context: &mut Context,
        out: &mut String,
        value: &BinaryOp<&dyn Expression, &dyn Expression>,
    ) {
        out.push_str("UPPER(");
        value.lhs.write_query(self.as_dyn(), context, out);
        out.push_str(") = UPPER(");
        value.rhs.write_query(self.as_dyn(), context, out);
        out.push(')');
    }

    /// Render a parenthesized list, or the two bounds of a `BETWEEN`.
    fn write_expression_list(
        &self,
        context: &mut Context,
        out: &mut String,
        items: &[&dyn Expression],
    ) {
        if context.fragment == Fragment::RangeBounds {
            let precedence = self.expression_binary_op_precedence(&BinaryOpType::And);
            let mut context = context.switch_fragment(Fragment::None);
            separated_by(
                out,
                items.iter().copied(),
                |out, v| {
                    possibly_parenthesized!(
                        out,
                        v.precedence(self.as_dyn()) <= precedence,
                        v.write_query(self.as_dyn(), &mut context.current, out)
                    );
                },
                " AND ",
            );
            return;
        }
        if items.is_empty() {
            // Matches nothing
            out.push_str("(NULL)");
            return;
        }
        out.push('(');
        separated_by(
            out,
            items.iter().copied(),
            |out, v| {
                v.write_query(self.as_dyn(), context, out);
            },
            ", ",
        );
        out.push(')');
    }

    /// Render ordered expression inside ORDER BY.
    fn write_expression_ordered(
        &self,
        context: &mut Context,
        out: &mut String,
        value: &Ordered<&dyn Expression>,
    ) {
        value.expression.write_query(self.as_dyn(), context, out);
        if context.fragment == Fragment::SqlSelectOrderBy {
            let _ = write!(
                out,
                " {}",
                match value.order {
                    Order::ASC => "ASC",
                    Order::DESC => "DESC",
                }
            );
        }
    }

    fn write_expression_case(&self, context: &mut Context, out: &mut String, value: &Case) {
        out.push_str("CASE");
        for (condition, then) in &value.whens {
            out.push_str(" WHEN ");
            condition.write_query(self.as_dyn(), context, out);
            out.push_str(" THEN ");
            then.write_query(self.as_dyn(), context, out);
        }
        if let Some(otherwise) = &value.otherwise {
            out.push_str(" ELSE ");
            otherwise.write_query(self.as_dyn(), context, out);
        }
        out.push_str(" END");
    }

    /// Emit CREATE TABLE with columns and constraints.
    fn write_create_table(
        &self,
        out: &mut String,
        table: &TableRef,
        columns: &[ColumnDef],
        if_not_exists: bool,
    ) {
        let mut context = Context::new(Fragment::SqlCreateTable, false);
        out.reserve(128 + columns.len() * 64);
        if !out.is_empty() {
            out.push('\n');
        }
        out.push_str("CREATE TABLE ");
        if if_not_exists {
            out.push_str("IF NOT EXISTS ");
        }
        self.write_table_ref(&mut context, out, table);
        out.push_str(" (\n");
        separated_by(
            out,
            columns,
            |out, v| {
                self.write_create_table_column_fragment(&mut context, out, v);
            },
            ",\n",
        );
        out.push_str(");");
    }

    /// Emit single column definition fragment.
    fn write_create_table_column_fragment(
        &self,
        context: &mut Context,
        out: &mut String,
        column: &ColumnDef,
    ) {
        self.write_identifier_quoted(context, out, column.name());
        out.push(' ');
        self.write_column_type(context, out, &column.field_type);
        if !column.nullable && !column.is_primary_key() {
            out.push_str(" NOT NULL");
        }
        if column.is_primary_key() {
            out.push_str(" PRIMARY KEY");
        }
        if column.unique && !column.is_primary_key() {
            out.push_str(" UNIQUE");
        }
        self.write_column_check(context, out, column);
        if let Some(references) = column.references {
            out.push_str(" REFERENCES ");
            self.write_table_ref(context, out, &references.table());
            out.push('(');
            self.write_column_ref(context, out, &references);
            out.push(')');
        }
    }

    /// Emit the CHECK constraint of positive integer columns.
    fn write_column_check(&self, context: &mut Context, out: &mut String, column: &ColumnDef) {
        if matches!(
            column.field_type,
            FieldType::PositiveSmallInteger | FieldType::PositiveInteger
        ) {
            out.push_str(" CHECK (");
            self.write_identifier_quoted(context, out, column.name());
            out.push_str(" >= 0)");
        }
    }

    /// Emit DROP TABLE statement.
    fn write_drop_table(&self, out: &mut String, table: &TableRef, if_exists: bool) {
        out.reserve(24 + table.schema.len() + table.name.len());
        if !out.is_empty() {
            out.push('\n');
        }
        out.push_str("DROP TABLE ");
        let mut context = Context::new(Fragment::SqlDropTable, false);
        if if_exists {
            out.push_str("IF EXISTS ");
        }
        self.write_table_ref(&mut context, out, table);
        out.push(';');
    }

    /// Emit SELECT statement (projection, FROM, WHERE, ORDER, LIMIT).
    fn write_select(&self, context: &mut Context, out: &mut String, select: &SelectStatement) {
        out.reserve(128 + select.columns.len() * 32);
        out.push_str("SELECT ");
        if select.distinct {
            out.push_str("DISTINCT ");
        }
        {
            let mut context = context.switch_fragment(Fragment::SqlSelect);
            separated_by(
                out,
                &select.columns,
                |out, (column, alias)| {
                    column.write_query(self.as_dyn(), &mut context.current, out);
                    if let Some(alias) = alias {
                        out.push_str(" AS ");
                        self.write_identifier_quoted(&mut context.current, out, alias);
                    }
                },
                ", ",
            );
        }
        out.push_str("\nFROM ");
        self.write_table_ref(
            &mut context.switch_fragment(Fragment::SqlSelectFrom).current,
            out,
            select.table,
        );
        if let Some(condition) = select.condition {
            out.push_str("\nWHERE ");
            condition.write_query(
                self.as_dyn(),
                &mut context.switch_fragment(Fragment::SqlSelectWhere).current,
                out,
            );
        }
        if !select.order_by.is_empty() {
            out.push_str("\nORDER BY ");
            let mut context = context.switch_fragment(Fragment::SqlSelectOrderBy);
            separated_by(
                out,
                select.order_by.iter().copied(),
                |out, v| {
                    v.write_query(self.as_dyn(), &mut context.current, out);
                },
                ", ",
            );
        }
        self.write_limit_offset(
            &mut context.switch_fragment(Fragment::SqlSelectLimit).current,
            out,
            select.low,
            select.high,
        );
    }

    /// Emit `SELECT COUNT(*)`, wrapping the query when it is sliced or distinct.
    fn write_select_count(&self, context: &mut Context, out: &mut String, select: &SelectStatement) {
        let count = Raw::new("COUNT(*)");
        if select.is_sliced() || select.distinct {
            out.push_str("SELECT COUNT(*) FROM (");
            self.write_select(context, out, select);
            out.push_str(") AS ");
            self.write_identifier_quoted(context, out, "subquery");
        } else {
            let select = SelectStatement {
                columns: vec![(&count, None)],
                order_by: Vec::new(),
                ..*select
            };
            self.write_select(context, out, &select);
        }
    }

    /// Emit LIMIT / OFFSET, the bounds may be bind parameters.
    fn write_limit_offset(
        &self,
        context: &mut Context,
        out: &mut String,
        low: &Bound,
        high: Option<&Bound>,
    ) {
        match (high, low) {
            (None, low) if low.is_zero() => {}
            (None, low) => {
                out.push_str("\nOFFSET ");
                low.write_query(self.as_dyn(), context, out);
            }
            (Some(Bound::Value(high)), Bound::Value(low)) => {
                out.push_str("\nLIMIT ");
                write_integer!(out, high.saturating_sub(*low));
                if *low > 0 {
                    out.push_str("\nOFFSET ");
                    write_integer!(out, *low);
                }
            }
            (Some(high), low) if low.is_zero() => {
                out.push_str("\nLIMIT ");
                high.write_query(self.as_dyn(), context, out);
            }
            (Some(high), low) => {
                out.push_str("\nLIMIT ");
                context.params.push((
                    out.len(),
                    SqlParam::Span {
                        low: low.clone(),
                        high: high.clone(),
                    },
                ));
                out.push_str("\nOFFSET ");
                low.write_query(self.as_dyn(), context, out);
            }
        }
    }

    /// Emit INSERT, a single row lists only its own columns, many rows use DEFAULT for the missing ones.
    fn write_insert(
        &self,
        out: &mut String,
        table: &TableRef,
        columns: &[ColumnDef],
        rows: &[Vec<(&'static str, Value)>],
    ) {
        let Some(first) = rows.first() else {
            return;
        };
        let single = rows.len() == 1;
        out.reserve(128 + columns.len() * 48 * rows.len());
        if !out.is_empty() {
            out.push('\n');
        }
        out.push_str("INSERT INTO ");
        let mut context = Context::new(Fragment::SqlInsertInto, false);
        self.write_table_ref(&mut context, out, table);
        out.push_str(" (");
        if single {
            separated_by(
                out,
                first,
                |out, (name, _)| {
                    self.write_identifier_quoted(&mut context, out, name);
                },
                ", ",
            );
        } else {
            separated_by(
                out,
                columns,
                |out, v| {
                    self.write_identifier_quoted(&mut context, out, v.name());
                },
                ", ",
            );
        }
        out.push_str(") VALUES\n");
        let mut context = context.switch_fragment(Fragment::SqlInsertIntoValues);
        separated_by(
            out,
            rows,
            |out, row| {
                out.push('(');
                if single {
                    separated_by(
                        out,
                        row,
                        |out, (_, value)| {
                            self.write_value(&mut context.current, out, value);
                        },
                        ", ",
                    );
                } else {
                    separated_by(
                        out,
                        columns,
                        |out, column| match row.iter().find(|(name, _)| *name == column.name()) {
                            Some((_, value)) => self.write_value(&mut context.current, out, value),
                            None => out.push_str("DEFAULT"),
                        },
                        ", ",
                    );
                }
                out.push(')');
            },
            ",\n",
        );
        out.push(';');
    }

    /// Emit UPDATE, assigned values are recorded like any other literal.
    fn write_update(
        &self,
        context: &mut Context,
        out: &mut String,
        table: &TableRef,
        assignments: &[(&ColumnDef, &dyn Expression)],
        condition: Option<&dyn Expression>,
    ) {
        out.push_str("UPDATE ");
        self.write_table_ref(
            &mut context.switch_fragment(Fragment::SqlUpdate).current,
            out,
            table,
        );
        out.push_str("\nSET ");
        {
            let mut context = context.switch_fragment(Fragment::SqlUpdateSet);
            separated_by(
                out,
                assignments,
                |out, (column, value)| {
                    self.write_identifier_quoted(&mut context.current, out, column.name());
                    out.push_str(" = ");
                    value.write_query(self.as_dyn(), &mut context.current, out);
                },
                ", ",
            );
        }
        if let Some(condition) = condition {
            out.push_str("\nWHERE ");
            condition.write_query(
                self.as_dyn(),
                &mut context.switch_fragment(Fragment::SqlUpdateWhere).current,
                out,
            );
        }
    }

    /// Emit DELETE statement with WHERE clause.
    fn write_delete(
        &self,
        context: &mut Context,
        out: &mut String,
        table: &TableRef,
        condition: Option<&dyn Expression>,
    ) {
        out.push_str("DELETE FROM ");
        self.write_table_ref(
            &mut context.switch_fragment(Fragment::SqlDeleteFrom).current,
            out,
            table,
        );
        if let Some(condition) = condition {
            out.push_str("\nWHERE ");
            condition.write_query(
                self.as_dyn(),
                &mut context
                    .switch_fragment(Fragment::SqlDeleteFromWhere)
                    .current,
                out,
            );
        }
    }
}

/// Fallback generic SQL writer (closest to PostgreSQL conventions).
#[derive(Default)]
pub struct GenericSqlWriter;

impl GenericSqlWriter {
    /// Construct a new generic writer.
    pub fn new() -> Self {
        Self {}
    }
}

impl SqlWriter for GenericSqlWriter {
    fn as_dyn(&self) -> &dyn SqlWriter {
        self
    }
}
