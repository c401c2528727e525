use crate::{Error, Result, Value, consume_while, truncate_long};
use anyhow::Context;
use atoi::FromRadix10SignedChecked;
use fast_float::parse_partial;
use rust_decimal::{
    Decimal,
    prelude::{FromPrimitive, ToPrimitive},
};
use std::{any, str::FromStr};
use time::{OffsetDateTime, PrimitiveDateTime, format_description::parse_borrowed};
use uuid::Uuid;

/// Conversion between native Rust types and the dynamically typed [`Value`].
///
/// It is used in both directions: to turn arguments and literals into values that the
/// writers can render, and to decode the values received from a driver back into
/// native types while materializing rows.
///
/// # Parsing contract
/// - `parse` delegates to `extract` then verifies the input is exhausted.
/// - `extract` updates the input slice only on success.
///
/// # Examples
/// ```rust
/// use reprise_core::{AsValue, Value};
/// let v = 42i32.as_value();
/// assert!(matches!(v, Value::Int32(Some(42))));
/// let n: i32 = AsValue::try_from_value(v).unwrap();
/// assert_eq!(n, 42);
/// let n = i64::try_from_value(Value::Unknown(Some("-17".into()))).unwrap();
/// assert_eq!(n, -17);
/// ```
pub trait AsValue {
    /// The NULL variant matching this type, also used as a type prototype.
    fn as_empty_value() -> Value;
    /// Convert into the owned [`Value`] representation.
    fn as_value(self) -> Value;
    /// Attempt to convert a dynamic [`Value`] into `Self`.
    fn try_from_value(value: Value) -> Result<Self>
    where
        Self: Sized;
    /// Parse a full string into `Self`, trailing input is an error.
    fn parse(input: impl AsRef<str>) -> Result<Self>
    where
        Self: Sized,
    {
        let mut value = input.as_ref();
        let result = Self::extract(&mut value)?;
        if !value.is_empty() {
            return Err(Error::msg(format!(
                "Value `{}` parsed correctly as {} but it did not consume all the input (remaining: `{}`)",
                truncate_long!(input.as_ref()),
                any::type_name::<Self>(),
                truncate_long!(value),
            )));
        }
        Ok(result)
    }
    /// Parse a prefix of `value`, advancing it past the consumed characters.
    fn extract(value: &mut &str) -> Result<Self>
    where
        Self: Sized,
    {
        Err(Error::msg(format!(
            "Cannot parse '{value}' as {}",
            any::type_name::<Self>()
        )))
    }
}

impl<T: AsValue> From<T> for Value {
    fn from(value: T) -> Self {
        value.as_value()
    }
}

fn cannot_convert<T>(value: &Value) -> Error {
    Error::msg(format!(
        "Cannot convert {value:?} to {}",
        any::type_name::<T>()
    ))
}

macro_rules! impl_as_value_integer {
    ($($source:ty => $destination:path),+ $(,)?) => {$(
        impl AsValue for $source {
            fn as_empty_value() -> Value {
                $destination(None)
            }
            fn as_value(self) -> Value {
                $destination(Some(self))
            }
            fn try_from_value(value: Value) -> Result<Self> {
                let wide: i128 = match value {
                    Value::Int8(Some(v)) => v as _,
                    Value::Int16(Some(v)) => v as _,
                    Value::Int32(Some(v)) => v as _,
                    Value::Int64(Some(v)) => v as _,
                    Value::UInt8(Some(v)) => v as _,
                    Value::UInt16(Some(v)) => v as _,
                    Value::UInt32(Some(v)) => v as _,
                    Value::UInt64(Some(v)) => v as _,
                    Value::Decimal(Some(v), ..) => {
                        if !v.is_integer() {
                            return Err(Error::msg(format!(
                                "Value {v}: Decimal is not an integer"
                            )));
                        }
                        v.to_i128().ok_or_else(|| cannot_convert::<Self>(&value))?
                    }
                    Value::Varchar(Some(ref v)) | Value::Unknown(Some(ref v)) => {
                        return Self::parse(v.trim());
                    }
                    _ => return Err(cannot_convert::<Self>(&value)),
                };
                <$source>::try_from(wide).map_err(|_| {
                    Error::msg(format!(
                        "Value {wide} is out of range for {}",
                        any::type_name::<Self>(),
                    ))
                })
            }
            fn extract(input: &mut &str) -> Result<Self> {
                let value = *input;
                let (number, len) = i128::from_radix_10_signed_checked(value.as_bytes());
                if value[..len].trim_start_matches(['+', '-']).is_empty() {
                    return Err(Error::msg(format!(
                        "Cannot extract {} from `{}`",
                        any::type_name::<Self>(),
                        truncate_long!(value),
                    )));
                }
                let result = number
                    .and_then(|v| <$source>::try_from(v).ok())
                    .ok_or_else(|| {
                        Error::msg(format!(
                            "Value {} is out of range for {}",
                            &value[..len],
                            any::type_name::<Self>(),
                        ))
                    })?;
                *input = &value[len..];
                Ok(result)
            }
        }
    )+};
}
impl_as_value_integer!(
    i8 => Value::Int8,
    i16 => Value::Int16,
    i32 => Value::Int32,
    i64 => Value::Int64,
    u8 => Value::UInt8,
    u16 => Value::UInt16,
    u32 => Value::UInt32,
    u64 => Value::UInt64,
);

macro_rules! impl_as_value_float {
    ($($source:ty => $destination:path),+ $(,)?) => {$(
        impl AsValue for $source {
            fn as_empty_value() -> Value {
                $destination(None)
            }
            fn as_value(self) -> Value {
                $destination(Some(self))
            }
            fn try_from_value(value: Value) -> Result<Self> {
                match value {
                    Value::Float32(Some(v)) => Ok(v as _),
                    Value::Float64(Some(v)) => Ok(v as _),
                    Value::Int8(Some(v)) => Ok(v as _),
                    Value::Int16(Some(v)) => Ok(v as _),
                    Value::Int32(Some(v)) => Ok(v as _),
                    Value::Int64(Some(v)) => Ok(v as _),
                    Value::UInt8(Some(v)) => Ok(v as _),
                    Value::UInt16(Some(v)) => Ok(v as _),
                    Value::UInt32(Some(v)) => Ok(v as _),
                    Value::UInt64(Some(v)) => Ok(v as _),
                    Value::Decimal(Some(v), ..) => {
                        v.to_f64().map(|v| v as _).ok_or_else(|| cannot_convert::<Self>(&value))
                    }
                    Value::Varchar(Some(ref v)) | Value::Unknown(Some(ref v)) => {
                        Self::parse(v.trim())
                    }
                    _ => Err(cannot_convert::<Self>(&value)),
                }
            }
            fn extract(input: &mut &str) -> Result<Self> {
                let value = *input;
                let (number, len) = parse_partial::<$source, _>(value).with_context(|| {
                    format!(
                        "Cannot extract a floating point value from `{}`",
                        truncate_long!(value)
                    )
                })?;
                *input = &value[len..];
                Ok(number)
            }
        }
    )+};
}
impl_as_value_float!(f32 => Value::Float32, f64 => Value::Float64);

impl AsValue for bool {
    fn as_empty_value() -> Value {
        Value::Boolean(None)
    }
    fn as_value(self) -> Value {
        Value::Boolean(Some(self))
    }
    fn try_from_value(value: Value) -> Result<Self> {
        match value {
            Value::Boolean(Some(v)) => Ok(v),
            Value::Int8(Some(v)) => Ok(v != 0),
            Value::Int16(Some(v)) => Ok(v != 0),
            Value::Int32(Some(v)) => Ok(v != 0),
            Value::Int64(Some(v)) => Ok(v != 0),
            Value::UInt8(Some(v)) => Ok(v != 0),
            Value::UInt16(Some(v)) => Ok(v != 0),
            Value::UInt32(Some(v)) => Ok(v != 0),
            Value::UInt64(Some(v)) => Ok(v != 0),
            Value::Unknown(Some(ref v)) => Self::parse(v),
            _ => Err(cannot_convert::<Self>(&value)),
        }
    }
    fn extract(input: &mut &str) -> Result<Self> {
        let mut value = *input;
        let word = consume_while(&mut value, |v| v.is_alphanumeric());
        let result = match word {
            x if x.eq_ignore_ascii_case("true") || x.eq_ignore_ascii_case("t") || x == "1" => true,
            x if x.eq_ignore_ascii_case("false") || x.eq_ignore_ascii_case("f") || x == "0" => {
                false
            }
            _ => return Err(Error::msg(format!("Cannot parse boolean from '{input}'"))),
        };
        *input = value;
        Ok(result)
    }
}

impl AsValue for String {
    fn as_empty_value() -> Value {
        Value::Varchar(None)
    }
    fn as_value(self) -> Value {
        Value::Varchar(Some(self))
    }
    fn try_from_value(value: Value) -> Result<Self> {
        match value {
            Value::Varchar(Some(v)) | Value::Unknown(Some(v)) => Ok(v),
            _ => Err(cannot_convert::<Self>(&value)),
        }
    }
    fn extract(input: &mut &str) -> Result<Self> {
        let result = (*input).to_owned();
        *input = "";
        Ok(result)
    }
}

impl AsValue for &str {
    fn as_empty_value() -> Value {
        Value::Varchar(None)
    }
    fn as_value(self) -> Value {
        Value::Varchar(Some(self.to_owned()))
    }
    fn try_from_value(value: Value) -> Result<Self> {
        Err(Error::msg(format!(
            "Cannot borrow a string from {value:?}, decode it as String instead"
        )))
    }
}

impl AsValue for Box<[u8]> {
    fn as_empty_value() -> Value {
        Value::Blob(None)
    }
    fn as_value(self) -> Value {
        Value::Blob(Some(self))
    }
    fn try_from_value(value: Value) -> Result<Self> {
        match value {
            Value::Blob(Some(v)) => Ok(v),
            Value::Unknown(Some(ref v)) => Self::parse(v),
            _ => Err(cannot_convert::<Self>(&value)),
        }
    }
    fn extract(input: &mut &str) -> Result<Self> {
        let mut value = *input;
        if value.len() >= 2 && value[0..2].eq_ignore_ascii_case("\\x") {
            value = &value[2..];
        }
        let digits = consume_while(&mut value, char::is_ascii_hexdigit);
        let result = hex::decode(digits)
            .map(Into::into)
            .with_context(|| format!("While decoding `{}` as a blob", truncate_long!(input)))?;
        *input = value;
        Ok(result)
    }
}

impl AsValue for Decimal {
    fn as_empty_value() -> Value {
        Value::Decimal(None, 0, 0)
    }
    fn as_value(self) -> Value {
        Value::Decimal(Some(self), 0, self.scale() as _)
    }
    fn try_from_value(value: Value) -> Result<Self> {
        match value {
            Value::Decimal(Some(v), ..) => Ok(v),
            Value::Int8(Some(v)) => Ok(v.into()),
            Value::Int16(Some(v)) => Ok(v.into()),
            Value::Int32(Some(v)) => Ok(v.into()),
            Value::Int64(Some(v)) => Ok(v.into()),
            Value::UInt8(Some(v)) => Ok(v.into()),
            Value::UInt16(Some(v)) => Ok(v.into()),
            Value::UInt32(Some(v)) => Ok(v.into()),
            Value::UInt64(Some(v)) => Ok(v.into()),
            Value::Float32(Some(v)) => {
                Decimal::from_f32(v).ok_or_else(|| cannot_convert::<Self>(&value))
            }
            Value::Float64(Some(v)) => {
                Decimal::from_f64(v).ok_or_else(|| cannot_convert::<Self>(&value))
            }
            Value::Varchar(Some(ref v)) | Value::Unknown(Some(ref v)) => Self::parse(v.trim()),
            _ => Err(cannot_convert::<Self>(&value)),
        }
    }
    fn extract(input: &mut &str) -> Result<Self> {
        let original = *input;
        let mut value = original.strip_prefix(['-', '+']).unwrap_or(original);
        let sign = original.len() - value.len();
        let number = consume_while(&mut value, |c| c.is_ascii_digit() || *c == '.');
        let result = Decimal::from_str(&original[..sign + number.len()]).with_context(|| {
            format!("Cannot extract a Decimal from `{}`", truncate_long!(original))
        })?;
        *input = value;
        Ok(result)
    }
}

macro_rules! parse_time {
    ($value: ident, $($formats:literal),+ $(,)?) => {
        'value: {
            for format in [$($formats,)+] {
                let format = parse_borrowed::<2>(format)?;
                let mut parsed = time::parsing::Parsed::new();
                if let Ok(remaining) = parsed.parse_items($value.as_bytes(), &format) {
                    let result = parsed.try_into()?;
                    *$value = &$value[($value.len() - remaining.len())..];
                    break 'value Ok(result);
                }
            }
            Err(Error::msg(format!(
                "Cannot extract from `{}` as {}",
                $value,
                any::type_name::<Self>()
            )))
        }
    }
}

macro_rules! impl_as_value_temporal {
    ($source:ty, $destination:path, $extract:expr $(, $pat_rest:pat => $expr_rest:expr)* $(,)?) => {
        impl AsValue for $source {
            fn as_empty_value() -> Value {
                $destination(None)
            }
            fn as_value(self) -> Value {
                $destination(Some(self))
            }
            fn try_from_value(value: Value) -> Result<Self> {
                match value {
                    $destination(Some(v)) => Ok(v),
                    $($pat_rest => $expr_rest,)*
                    Value::Varchar(Some(ref v)) | Value::Unknown(Some(ref v)) => {
                        <Self as AsValue>::parse(v.trim())
                    }
                    _ => Err(cannot_convert::<Self>(&value)),
                }
            }
            fn extract(value: &mut &str) -> Result<Self> {
                $extract(value)
            }
        }
    };
}
impl_as_value_temporal!(time::Date, Value::Date, |v: &mut &str| {
    parse_time!(v, "[year]-[month]-[day]")
});
impl_as_value_temporal!(time::Time, Value::Time, |v: &mut &str| {
    parse_time!(
        v,
        "[hour]:[minute]:[second].[subsecond]",
        "[hour]:[minute]:[second]",
        "[hour]:[minute]",
    )
});
impl_as_value_temporal!(
    PrimitiveDateTime,
    Value::Timestamp,
    |v: &mut &str| {
        parse_time!(
            v,
            "[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond]",
            "[year]-[month]-[day]T[hour]:[minute]:[second]",
            "[year]-[month]-[day]T[hour]:[minute]",
            "[year]-[month]-[day] [hour]:[minute]:[second].[subsecond]",
            "[year]-[month]-[day] [hour]:[minute]:[second]",
            "[year]-[month]-[day] [hour]:[minute]",
        )
    },
    Value::Date(Some(v)) => Ok(v.midnight()),
    Value::TimestampWithTimezone(Some(v)) => {
        let v = v.to_offset(time::UtcOffset::UTC);
        Ok(PrimitiveDateTime::new(v.date(), v.time()))
    },
);
impl_as_value_temporal!(
    OffsetDateTime,
    Value::TimestampWithTimezone,
    |v: &mut &str| {
        let result: Result<OffsetDateTime> = parse_time!(
            v,
            "[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond][offset_hour sign:mandatory]:[offset_minute]",
            "[year]-[month]-[day]T[hour]:[minute]:[second][offset_hour sign:mandatory]:[offset_minute]",
            "[year]-[month]-[day] [hour]:[minute]:[second].[subsecond][offset_hour sign:mandatory]:[offset_minute]",
            "[year]-[month]-[day] [hour]:[minute]:[second].[subsecond][offset_hour sign:mandatory]",
            "[year]-[month]-[day] [hour]:[minute]:[second][offset_hour sign:mandatory]:[offset_minute]",
            "[year]-[month]-[day] [hour]:[minute]:[second][offset_hour sign:mandatory]",
        );
        result.or_else(|_| <PrimitiveDateTime as AsValue>::extract(v).map(|v| v.assume_utc()))
    },
    Value::Timestamp(Some(v)) => Ok(v.assume_utc()),
);

impl AsValue for Uuid {
    fn as_empty_value() -> Value {
        Value::Uuid(None)
    }
    fn as_value(self) -> Value {
        Value::Uuid(Some(self))
    }
    fn try_from_value(value: Value) -> Result<Self> {
        match value {
            Value::Uuid(Some(v)) => Ok(v),
            Value::Varchar(Some(ref v)) | Value::Unknown(Some(ref v)) => Self::parse(v.trim()),
            _ => Err(cannot_convert::<Self>(&value)),
        }
    }
    fn extract(input: &mut &str) -> Result<Self> {
        let value = *input;
        let context = || format!("Cannot extract a uuid value from `{}`", truncate_long!(value));
        let Some(candidate) = value.get(0..36) else {
            return Err(Error::msg(context()));
        };
        let uuid = Uuid::parse_str(candidate).with_context(context)?;
        *input = &value[36..];
        Ok(uuid)
    }
}

impl<T: AsValue> AsValue for Option<T> {
    fn as_empty_value() -> Value {
        T::as_empty_value()
    }
    fn as_value(self) -> Value {
        match self {
            Some(v) => v.as_value(),
            None => T::as_empty_value(),
        }
    }
    fn try_from_value(value: Value) -> Result<Self> {
        if value.is_null() {
            return Ok(None);
        }
        T::try_from_value(value).map(Some)
    }
    fn parse(input: impl AsRef<str>) -> Result<Self> {
        T::parse(input).map(Some)
    }
}

impl<T: AsValue> AsValue for Vec<T> {
    fn as_empty_value() -> Value {
        Value::List(None, Box::new(T::as_empty_value()))
    }
    fn as_value(self) -> Value {
        Value::List(
            Some(self.into_iter().map(AsValue::as_value).collect()),
            Box::new(T::as_empty_value()),
        )
    }
    fn try_from_value(value: Value) -> Result<Self> {
        match value {
            Value::List(Some(v), ..) => v.into_iter().map(T::try_from_value).collect(),
            _ => Err(cannot_convert::<Self>(&value)),
        }
    }
}
