use crate::{
    AsValue, Error, Expression, FieldType, GenericSqlWriter, Lookup, Model, OpPrecedence,
    ParamSite, ParamVisitor, PreparedError, Result, SqlWriter, Value,
    writer::Context,
};
use std::{
    collections::{HashMap, hash_map},
    fmt::{self, Debug, Formatter},
    sync::{Arc, OnceLock},
};
use uuid::Uuid;

struct Inner {
    name: String,
    token: Arc<str>,
    size: Option<usize>,
    field_type: OnceLock<FieldType>,
    nullable: OnceLock<bool>,
}

/// Placeholder for a value supplied only when a prepared query is executed.
///
/// Clones share the same identity: the correlation token, the name and the field type. The
/// type may be given at construction or inferred once from the column the parameter is
/// compared with.
///
/// ```rust
/// use reprise_core::{BindArray, BindParam, FieldType};
/// let name = BindParam::new("name");
/// let ids = BindArray::typed("ids", 3, FieldType::Integer);
/// assert!(name.token().starts_with("bind_"));
/// assert_eq!(ids.size(), 3);
/// ```
#[derive(Clone)]
pub struct BindParam(Arc<Inner>);

/// Constructors of fixed size array parameters, the right hand side of `IN`.
pub struct BindArray;

impl BindArray {
    pub fn new(name: impl Into<String>, size: usize) -> BindParam {
        BindParam::array(name, size)
    }
    pub fn typed(name: impl Into<String>, size: usize, field_type: FieldType) -> BindParam {
        BindParam::typed_array(name, size, field_type)
    }
}

impl BindParam {
    pub fn new(name: impl Into<String>) -> Self {
        Self::build(name.into(), None, None)
    }
    pub fn typed(name: impl Into<String>, field_type: FieldType) -> Self {
        Self::build(name.into(), None, Some(field_type))
    }
    /// Array parameter reserving `size` placeholders, at least one.
    pub fn array(name: impl Into<String>, size: usize) -> Self {
        Self::build(name.into(), Some(size.max(1)), None)
    }
    pub fn typed_array(name: impl Into<String>, size: usize, field_type: FieldType) -> Self {
        Self::build(name.into(), Some(size.max(1)), Some(field_type))
    }

    fn build(name: String, size: Option<usize>, field_type: Option<FieldType>) -> Self {
        let cell = OnceLock::new();
        if let Some(field_type) = field_type {
            let _ = cell.set(field_type);
        }
        Self(Arc::new(Inner {
            name,
            token: format!("bind_{}", Uuid::new_v4().simple()).into(),
            size,
            field_type: cell,
            nullable: OnceLock::new(),
        }))
    }

    pub fn name(&self) -> &str {
        &self.0.name
    }
    /// Opaque correlation token, unique in the process.
    pub fn token(&self) -> &str {
        &self.0.token
    }
    pub fn shared_token(&self) -> Arc<str> {
        self.0.token.clone()
    }
    pub fn is_array(&self) -> bool {
        self.0.size.is_some()
    }
    /// Number of placeholders reserved in the statement, 1 for scalars.
    pub fn size(&self) -> usize {
        self.0.size.unwrap_or(1)
    }
    pub fn field_type(&self) -> Option<FieldType> {
        self.0.field_type.get().copied()
    }
    /// Back-fill the field type, the first type set wins.
    pub fn infer_type(&self, field_type: FieldType) -> FieldType {
        *self.0.field_type.get_or_init(|| field_type)
    }
    /// Whether NULL is a valid argument, true when compared with a nullable column.
    pub fn is_nullable(&self) -> bool {
        self.0.nullable.get().copied().unwrap_or(false)
    }
    pub fn infer_nullable(&self, nullable: bool) -> bool {
        *self.0.nullable.get_or_init(|| nullable)
    }
    /// Whether both handles are the same parameter.
    pub fn same(&self, other: &BindParam) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// Wire values for this parameter, one per reserved placeholder.
    ///
    /// Arrays are padded with NULL up to their size so the statement shape never changes.
    pub fn clean(&self, argument: &Argument) -> Result<Vec<Value>> {
        let Some(field_type) = self.field_type() else {
            return Err(PreparedError::MissingParameterType {
                name: self.name().into(),
            }
            .into());
        };
        let value = argument.value();
        let Some(size) = self.0.size else {
            return Ok(vec![self.clean_one(&field_type, value)?]);
        };
        let items: &[Value] = match value {
            Value::List(Some(items), ..) => items.as_slice(),
            Value::List(None, ..) | Value::Null => &[],
            v => {
                return Err(self.invalid(v, "Expected a list of values".into()));
            }
        };
        if items.len() > size {
            return Err(PreparedError::ArraySizeExceeded {
                name: self.name().into(),
                size,
                len: items.len(),
            }
            .into());
        }
        let mut result = items
            .iter()
            .map(|v| self.clean_one(&field_type, v))
            .collect::<Result<Vec<_>>>()?;
        result.resize(size, field_type.value_prototype());
        Ok(result)
    }

    fn clean_one(&self, field_type: &FieldType, value: &Value) -> Result<Value> {
        field_type
            .clean(value.clone(), self.is_nullable())
            .map_err(|reason| self.invalid(value, reason))
    }

    fn invalid(&self, value: &Value, reason: String) -> Error {
        let mut rendered = String::new();
        GenericSqlWriter::new().write_value(&mut Context::default(), &mut rendered, value);
        PreparedError::InvalidParameterType {
            name: self.name().into(),
            value: rendered,
            reason,
        }
        .into()
    }
}

impl Debug for BindParam {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("BindParam")
            .field("name", &self.0.name)
            .field("token", &self.0.token)
            .field("size", &self.0.size)
            .field("field_type", &self.field_type())
            .field("nullable", &self.is_nullable())
            .finish()
    }
}

impl OpPrecedence for BindParam {
    fn precedence(&self, _writer: &dyn SqlWriter) -> i32 {
        1_000_000
    }
}

impl Expression for BindParam {
    fn write_query(&self, writer: &dyn SqlWriter, context: &mut Context, out: &mut String) {
        writer.write_bind_param(context, out, self);
    }
    fn visit_params(&self, visitor: &mut dyn ParamVisitor, site: &ParamSite) -> Result<()> {
        visitor.visit(self, site)
    }
    fn output_type(&self) -> Option<FieldType> {
        self.field_type()
    }
}

/// Parameters attached to one logical query, in registration order.
#[derive(Default, Debug, Clone)]
pub struct ParamRegistry {
    params: Vec<BindParam>,
    by_name: HashMap<String, usize>,
    by_token: HashMap<Arc<str>, usize>,
}

impl ParamRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach `param`, returns false when this very parameter was already attached.
    pub fn register(&mut self, param: &BindParam) -> Result<bool> {
        if self.by_token.contains_key(param.token()) {
            return Ok(false);
        }
        match self.by_name.entry(param.name().to_string()) {
            hash_map::Entry::Occupied(..) => Err(PreparedError::DuplicateParameterName {
                name: param.name().into(),
            }
            .into()),
            hash_map::Entry::Vacant(entry) => {
                let index = self.params.len();
                entry.insert(index);
                self.by_token.insert(param.shared_token(), index);
                self.params.push(param.clone());
                log::trace!("Registered bind parameter `{}`", param.name());
                Ok(true)
            }
        }
    }

    /// Attach every parameter found in `expression`.
    pub fn register_expression(&mut self, expression: &dyn Expression) -> Result<()> {
        expression.visit_params(self, &ParamSite::default())
    }

    pub fn get(&self, name: &str) -> Option<&BindParam> {
        self.by_name.get(name).map(|i| &self.params[*i])
    }
    pub fn by_token(&self, token: &str) -> Option<&BindParam> {
        self.by_token.get(token).map(|i| &self.params[*i])
    }
    pub fn iter(&self) -> impl Iterator<Item = &BindParam> {
        self.params.iter()
    }
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.params.iter().map(BindParam::name)
    }
    pub fn len(&self) -> usize {
        self.params.len()
    }
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }
}

impl ParamVisitor for ParamRegistry {
    fn visit(&mut self, param: &BindParam, _site: &ParamSite) -> Result<()> {
        self.register(param).map(|_| ())
    }
}

/// Bound of a slice, a literal row index or a parameter.
#[derive(Debug, Clone)]
pub enum Bound {
    Value(u64),
    Param(BindParam),
}

impl Bound {
    pub fn is_zero(&self) -> bool {
        matches!(self, Bound::Value(0))
    }
    pub fn is_param(&self) -> bool {
        matches!(self, Bound::Param(..))
    }
}

impl PartialEq for Bound {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Bound::Value(a), Bound::Value(b)) => a == b,
            (Bound::Param(a), Bound::Param(b)) => a.same(b),
            _ => false,
        }
    }
}

impl Default for Bound {
    fn default() -> Self {
        Bound::Value(0)
    }
}

impl From<u64> for Bound {
    fn from(value: u64) -> Self {
        Bound::Value(value)
    }
}

impl From<u32> for Bound {
    fn from(value: u32) -> Self {
        Bound::Value(value as u64)
    }
}

impl From<usize> for Bound {
    fn from(value: usize) -> Self {
        Bound::Value(value as u64)
    }
}

impl From<i32> for Bound {
    fn from(value: i32) -> Self {
        Bound::Value(value.max(0) as u64)
    }
}

impl From<BindParam> for Bound {
    fn from(value: BindParam) -> Self {
        Bound::Param(value)
    }
}

impl From<&BindParam> for Bound {
    fn from(value: &BindParam) -> Self {
        Bound::Param(value.clone())
    }
}

impl OpPrecedence for Bound {
    fn precedence(&self, _writer: &dyn SqlWriter) -> i32 {
        1_000_000
    }
}

impl Expression for Bound {
    fn write_query(&self, writer: &dyn SqlWriter, context: &mut Context, out: &mut String) {
        match self {
            Bound::Value(v) => writer.write_value(context, out, &Value::UInt64(Some(*v))),
            Bound::Param(v) => writer.write_bind_param(context, out, v),
        }
    }
    fn visit_params(&self, visitor: &mut dyn ParamVisitor, _site: &ParamSite) -> Result<()> {
        match self {
            Bound::Value(..) => Ok(()),
            Bound::Param(v) => visitor.visit(
                v,
                &ParamSite::new(Lookup::Slice, Some(FieldType::BigInteger)),
            ),
        }
    }
}

/// Value supplied for a bind parameter at execution time.
#[derive(Debug, Clone, PartialEq)]
pub enum Argument {
    Value(Value),
    /// Foreign reference, already resolved to the primary key of the referenced row.
    Reference(Value),
}

impl Argument {
    pub fn reference<M: Model>(model: &M) -> Self {
        Argument::Reference(model.primary_key())
    }
    pub fn value(&self) -> &Value {
        match self {
            Argument::Value(v) | Argument::Reference(v) => v,
        }
    }
}

impl<T: AsValue> From<T> for Argument {
    fn from(value: T) -> Self {
        Argument::Value(value.as_value())
    }
}

impl From<Value> for Argument {
    fn from(value: Value) -> Self {
        Argument::Value(value)
    }
}

/// Named execution values, see [`args!`](crate::args).
#[derive(Default, Debug, Clone)]
pub struct Arguments(HashMap<String, Argument>);

impl Arguments {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Argument>) -> &mut Self {
        self.0.insert(name.into(), value.into());
        self
    }
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Argument>) -> Self {
        self.insert(name, value);
        self
    }
    pub fn get(&self, name: &str) -> Option<&Argument> {
        self.0.get(name)
    }
    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }
    pub fn len(&self) -> usize {
        self.0.len()
    }
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<Argument>> FromIterator<(K, V)> for Arguments {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// Build [`Arguments`] from `name => value` pairs.
///
/// ```rust
/// use reprise_core::args;
/// let arguments = args! { "name" => "Svetlana Alexievich", "limit" => 5 };
/// assert_eq!(arguments.len(), 2);
/// ```
#[macro_export]
macro_rules! args {
    () => {
        $crate::Arguments::new()
    };
    ($($name:expr => $value:expr),+ $(,)?) => {{
        let mut arguments = $crate::Arguments::new();
        $(arguments.insert($name, $value);)+
        arguments
    }};
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ColumnDef, ExpressionExt};

    const TITLE: ColumnDef = ColumnDef::new("book", "title", FieldType::Char { max_length: 8 });

    fn error_of(result: Result<impl Debug>) -> PreparedError {
        let error = result.expect_err("should fail");
        PreparedError::of(&error)
            .cloned()
            .unwrap_or_else(|| panic!("unexpected error {:#}", error))
    }

    #[test]
    fn tokens_are_unique_and_shared_by_clones() {
        let a = BindParam::new("a");
        let b = BindParam::new("a");
        assert_ne!(a.token(), b.token());
        let c = a.clone();
        assert!(a.same(&c));
        assert!(!a.same(&b));
        c.infer_type(FieldType::Integer);
        assert_eq!(a.field_type(), Some(FieldType::Integer));
        assert_eq!(a.infer_type(FieldType::Text), FieldType::Integer);
    }

    #[test]
    fn registry_rejects_duplicate_names() {
        let mut registry = ParamRegistry::new();
        let first = BindParam::new("param");
        assert!(registry.register(&first).unwrap());
        assert!(!registry.register(&first.clone()).unwrap());
        assert_eq!(
            error_of(registry.register(&BindParam::new("param"))),
            PreparedError::DuplicateParameterName {
                name: "param".into()
            }
        );
        assert_eq!(registry.len(), 1);

        let mut registry = ParamRegistry::new();
        let condition = TITLE
            .eq(BindParam::new("param"))
            .or(TITLE.eq(BindParam::new("param")));
        assert!(matches!(
            error_of(registry.register_expression(&condition)),
            PreparedError::DuplicateParameterName { .. }
        ));
    }

    #[test]
    fn scalar_clean() {
        let param = BindParam::typed("id", FieldType::AutoField.bind_type());
        assert_eq!(
            param.clean(&Argument::from("12")).unwrap(),
            vec![Value::Int32(Some(12))]
        );
        assert!(matches!(
            error_of(param.clean(&Argument::from("twelve"))),
            PreparedError::InvalidParameterType { name, .. } if name == "id"
        ));
        let untyped = BindParam::new("x");
        assert!(matches!(
            error_of(untyped.clean(&Argument::from(1))),
            PreparedError::MissingParameterType { .. }
        ));
        let title = BindParam::typed("title", TITLE.field_type);
        assert!(matches!(
            error_of(title.clean(&Argument::from("much too long"))),
            PreparedError::InvalidParameterType { .. }
        ));
    }

    #[test]
    fn array_clean_pads_with_null() {
        let ids = BindArray::typed("ids", 2, FieldType::Integer);
        assert_eq!(
            ids.clean(&Argument::from(Vec::<i32>::new())).unwrap(),
            vec![Value::Int32(None), Value::Int32(None)]
        );
        assert_eq!(
            ids.clean(&Argument::from(vec![1])).unwrap(),
            vec![Value::Int32(Some(1)), Value::Int32(None)]
        );
        assert_eq!(
            error_of(ids.clean(&Argument::from(vec![1, 2, 3]))),
            PreparedError::ArraySizeExceeded {
                name: "ids".into(),
                size: 2,
                len: 3
            }
        );
    }

    #[test]
    fn args_macro() {
        let arguments = args! { "a" => 1, "b" => "two", "c" => Value::Null };
        assert_eq!(arguments.len(), 3);
        assert_eq!(arguments.get("a"), Some(&Argument::Value(Value::Int32(Some(1)))));
        assert!(args!().is_empty());
    }
}
