use thiserror::Error;

/// Failures raised by the prepared statement layer.
///
/// They travel inside [`crate::Error`], callers can classify them with
/// `error.downcast_ref::<PreparedError>()`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PreparedError {
    #[error("Bind parameter `{name}` is already registered on this query")]
    DuplicateParameterName { name: String },

    #[error("Bind parameter `{name}` has no field type, declare it or compare it with a column")]
    MissingParameterType { name: String },

    #[error("Lookup `{lookup}` is not supported in prepared statements")]
    UnsupportedLookup { lookup: String },

    #[error("Bind parameter `{name}` is used in a membership test and must be an array parameter")]
    ArrayParameterRequired { name: String },

    #[error("Bind parameter `{name}` accepts at most {size} values, {len} were supplied")]
    ArraySizeExceeded { name: String, size: usize, len: usize },

    #[error("Query is not prepared, call prepare() before executing it")]
    QueryNotPrepared,

    #[error("{operation} is not allowed on a prepared statement")]
    OperationOnPreparedStatement { operation: &'static str },

    #[error("Incorrect bind parameters: expected {expected:?}, received {received:?}")]
    IncorrectBindParameter {
        expected: Vec<String>,
        received: Vec<String>,
    },

    #[error("{value} is incorrect type for `{name}` parameter: {reason}")]
    InvalidParameterType {
        name: String,
        value: String,
        reason: String,
    },

    #[error("Prepared statements are not supported for vendor `{vendor}`")]
    UnsupportedVendor { vendor: String },
}

impl PreparedError {
    /// Find the prepared statement failure carried by `error`, if any.
    pub fn of(error: &crate::Error) -> Option<&PreparedError> {
        error.downcast_ref::<PreparedError>()
    }
}
