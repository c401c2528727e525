use crate::{AsValue, Value};
use regex::Regex;
use rust_decimal::Decimal;
use std::{fmt::Display, net::IpAddr, sync::LazyLock};
use time::{Date, PrimitiveDateTime, Time};
use uuid::Uuid;

static EMAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9.!#$%&'*+/=?^_`{|}~-]+@[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?(?:\.[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?)+$")
        .expect("email pattern is valid")
});
static SLUG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[-a-zA-Z0-9_]+$").expect("slug pattern is valid"));

/// Semantic type of a column.
///
/// It decides the column DDL, the wire type of a bind parameter compared with the column
/// and the cleaning applied to the values bound to that parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    AutoField,
    BigAutoField,
    SmallInteger,
    Integer,
    BigInteger,
    PositiveSmallInteger,
    PositiveInteger,
    Float,
    Decimal { precision: u8, scale: u8 },
    Boolean,
    NullBoolean,
    Char { max_length: u32 },
    Text,
    Email { max_length: u32 },
    Url { max_length: u32 },
    Slug { max_length: u32 },
    IpAddress,
    Binary,
    Date,
    DateTime,
    Time,
    Uuid,
    ForeignKey { target: &'static FieldType },
}

impl FieldType {
    pub const EMAIL: FieldType = FieldType::Email { max_length: 254 };
    pub const URL: FieldType = FieldType::Url { max_length: 200 };
    pub const SLUG: FieldType = FieldType::Slug { max_length: 50 };

    /// Type used when a parameter of this type is bound, auto keys are plain integers.
    pub fn bind_type(&self) -> FieldType {
        match self {
            FieldType::AutoField => FieldType::Integer,
            FieldType::BigAutoField => FieldType::BigInteger,
            FieldType::ForeignKey { target } => target.bind_type(),
            _ => *self,
        }
    }

    pub fn is_auto(&self) -> bool {
        matches!(self, FieldType::AutoField | FieldType::BigAutoField)
    }

    pub fn max_length(&self) -> Option<u32> {
        match self {
            FieldType::Char { max_length }
            | FieldType::Email { max_length }
            | FieldType::Url { max_length }
            | FieldType::Slug { max_length } => Some(*max_length),
            FieldType::IpAddress => Some(39),
            _ => None,
        }
    }

    /// The `Value` variant carrying this type.
    pub fn value_prototype(&self) -> Value {
        match self {
            FieldType::AutoField | FieldType::Integer | FieldType::PositiveInteger => {
                Value::Int32(None)
            }
            FieldType::BigAutoField | FieldType::BigInteger => Value::Int64(None),
            FieldType::SmallInteger | FieldType::PositiveSmallInteger => Value::Int16(None),
            FieldType::Float => Value::Float64(None),
            FieldType::Decimal { precision, scale } => Value::Decimal(None, *precision, *scale),
            FieldType::Boolean | FieldType::NullBoolean => Value::Boolean(None),
            FieldType::Char { .. }
            | FieldType::Text
            | FieldType::Email { .. }
            | FieldType::Url { .. }
            | FieldType::Slug { .. }
            | FieldType::IpAddress => Value::Varchar(None),
            FieldType::Binary => Value::Blob(None),
            FieldType::Date => Value::Date(None),
            FieldType::DateTime => Value::Timestamp(None),
            FieldType::Time => Value::Time(None),
            FieldType::Uuid => Value::Uuid(None),
            FieldType::ForeignKey { target } => target.bind_type().value_prototype(),
        }
    }

    /// Coerce `value` into the wire representation of this type and validate it.
    ///
    /// The error is a human readable reason, callers wrap it with the parameter name.
    pub fn clean(&self, value: Value, nullable: bool) -> Result<Value, String> {
        if value.is_null() {
            return if nullable || *self == FieldType::NullBoolean {
                Ok(self.value_prototype())
            } else {
                Err("This field cannot be null".into())
            };
        }
        match self.bind_type() {
            FieldType::SmallInteger => clean_integer(value, -32768, 32767).map(|v| Value::Int16(Some(v as _))),
            FieldType::Integer => {
                clean_integer(value, i32::MIN as _, i32::MAX as _).map(|v| Value::Int32(Some(v as _)))
            }
            FieldType::BigInteger => {
                clean_integer(value, i64::MIN, i64::MAX).map(|v| Value::Int64(Some(v)))
            }
            FieldType::PositiveSmallInteger => {
                clean_integer(value, 0, 32767).map(|v| Value::Int16(Some(v as _)))
            }
            FieldType::PositiveInteger => {
                clean_integer(value, 0, i32::MAX as _).map(|v| Value::Int32(Some(v as _)))
            }
            FieldType::Float => match value {
                Value::Boolean(..) => Err(invalid("a number", &value)),
                value => f64::try_from_value(value)
                    .map(|v| Value::Float64(Some(v)))
                    .map_err(|_| "A number is required".into()),
            },
            FieldType::Decimal { precision, scale } => clean_decimal(value, precision, scale),
            FieldType::Boolean | FieldType::NullBoolean => clean_boolean(value),
            FieldType::Char { max_length } => {
                let v = stringify(value)?;
                check_length(&v, max_length)?;
                Ok(Value::Varchar(Some(v)))
            }
            FieldType::Text => stringify(value).map(|v| Value::Varchar(Some(v))),
            FieldType::Email { max_length } => {
                let v = stringify(value)?;
                check_length(&v, max_length)?;
                if !EMAIL.is_match(&v) {
                    return Err("Enter a valid email address".into());
                }
                Ok(Value::Varchar(Some(v)))
            }
            FieldType::Url { max_length } => {
                let v = stringify(value)?;
                check_length(&v, max_length)?;
                match url::Url::parse(&v) {
                    Ok(url)
                        if matches!(url.scheme(), "http" | "https" | "ftp" | "ftps")
                            && url.has_host() =>
                    {
                        Ok(Value::Varchar(Some(v)))
                    }
                    _ => Err("Enter a valid URL".into()),
                }
            }
            FieldType::Slug { max_length } => {
                let v = stringify(value)?;
                check_length(&v, max_length)?;
                if !SLUG.is_match(&v) {
                    return Err(
                        "Enter a valid slug consisting of letters, numbers, underscores or hyphens"
                            .into(),
                    );
                }
                Ok(Value::Varchar(Some(v)))
            }
            FieldType::IpAddress => match value {
                Value::Varchar(Some(ref v)) | Value::Unknown(Some(ref v)) => v
                    .trim()
                    .parse::<IpAddr>()
                    .map(|ip| Value::Varchar(Some(ip.to_string())))
                    .map_err(|_| "Enter a valid IPv4 or IPv6 address".into()),
                _ => Err(invalid("an IP address string", &value)),
            },
            FieldType::Binary => match value {
                Value::Blob(Some(..)) => Ok(value),
                _ => Err(invalid("binary data", &value)),
            },
            FieldType::Date => match value {
                Value::Date(..) | Value::Timestamp(..) | Value::TimestampWithTimezone(..) => {
                    Date::try_from_value(value.clone())
                        .or_else(|_| PrimitiveDateTime::try_from_value(value).map(|v| v.date()))
                        .map(|v| Value::Date(Some(v)))
                        .map_err(|e| e.to_string())
                }
                Value::Varchar(Some(ref v)) => <Date as AsValue>::parse(v.trim())
                    .map(|v| Value::Date(Some(v)))
                    .map_err(|_| format!("'{v}' value has an invalid date format, it must be in YYYY-MM-DD format")),
                _ => Err(invalid("a date", &value)),
            },
            FieldType::DateTime => match value {
                Value::Date(..) | Value::Timestamp(..) | Value::TimestampWithTimezone(..) => {
                    PrimitiveDateTime::try_from_value(value)
                        .map(|v| Value::Timestamp(Some(v)))
                        .map_err(|e| e.to_string())
                }
                Value::Varchar(Some(ref v)) => {
                    let v = v.trim();
                    <PrimitiveDateTime as AsValue>::parse(v)
                        .or_else(|_| <Date as AsValue>::parse(v).map(Date::midnight))
                        .map(|v| Value::Timestamp(Some(v)))
                        .map_err(|_| format!("'{v}' value has an invalid format, it must be in YYYY-MM-DD HH:MM[:ss[.uuuuuu]] format"))
                }
                _ => Err(invalid("a date and time", &value)),
            },
            FieldType::Time => match value {
                Value::Time(Some(v)) => Ok(Value::Time(Some(v))),
                Value::Timestamp(Some(v)) => Ok(Value::Time(Some(v.time()))),
                Value::Varchar(Some(ref v)) => <Time as AsValue>::parse(v.trim())
                    .map(|v| Value::Time(Some(v)))
                    .map_err(|_| format!("'{v}' value has an invalid format, it must be in HH:MM[:ss[.uuuuuu]] format")),
                _ => Err(invalid("a time", &value)),
            },
            FieldType::Uuid => match value {
                Value::Uuid(..) | Value::Varchar(..) | Value::Unknown(..) => Uuid::try_from_value(value)
                    .map(|v| Value::Uuid(Some(v)))
                    .map_err(|_| "Enter a valid UUID".into()),
                _ => Err(invalid("a UUID", &value)),
            },
            FieldType::AutoField | FieldType::BigAutoField | FieldType::ForeignKey { .. } => {
                Err("Auto and foreign key types must be cleaned through their bind type".into())
            }
        }
    }
}

fn invalid(expected: impl Display, value: &Value) -> String {
    format!("Expected {expected}, got {value:?}")
}

fn clean_integer(value: Value, min: i64, max: i64) -> Result<i64, String> {
    let v = match value {
        Value::Boolean(..) | Value::Float32(..) | Value::Float64(..) => {
            return Err(invalid("an integer", &value));
        }
        value => i64::try_from_value(value).map_err(|e| e.to_string())?,
    };
    if v < min {
        return Err(format!(
            "Ensure this value is greater than or equal to {min}"
        ));
    }
    if v > max {
        return Err(format!("Ensure this value is less than or equal to {max}"));
    }
    Ok(v)
}

fn clean_decimal(value: Value, precision: u8, scale: u8) -> Result<Value, String> {
    let v = match value {
        Value::Boolean(..) => return Err(invalid("a decimal number", &value)),
        value => Decimal::try_from_value(value).map_err(|_| "A number is required".to_string())?,
    };
    let normalized = v.normalize();
    let decimals = normalized.scale() as u32;
    let digits = normalized.mantissa().unsigned_abs().to_string().len() as u32;
    let whole = digits.saturating_sub(decimals);
    if decimals > scale as u32 {
        return Err(format!(
            "Ensure that there are no more than {scale} decimal places"
        ));
    }
    if whole > precision.saturating_sub(scale) as u32 {
        return Err(format!(
            "Ensure that there are no more than {} digits before the decimal point",
            precision.saturating_sub(scale)
        ));
    }
    Ok(Value::Decimal(Some(normalized), precision, scale))
}

fn clean_boolean(value: Value) -> Result<Value, String> {
    match value {
        Value::Boolean(Some(..)) => Ok(value),
        _ => Err(invalid("either true or false", &value)),
    }
}

fn stringify(value: Value) -> Result<String, String> {
    Ok(match value {
        Value::Varchar(Some(v)) | Value::Unknown(Some(v)) => v,
        Value::Boolean(Some(v)) => if v { "True" } else { "False" }.into(),
        Value::Int8(Some(v)) => v.to_string(),
        Value::Int16(Some(v)) => v.to_string(),
        Value::Int32(Some(v)) => v.to_string(),
        Value::Int64(Some(v)) => v.to_string(),
        Value::UInt8(Some(v)) => v.to_string(),
        Value::UInt16(Some(v)) => v.to_string(),
        Value::UInt32(Some(v)) => v.to_string(),
        Value::UInt64(Some(v)) => v.to_string(),
        Value::Float32(Some(v)) => v.to_string(),
        Value::Float64(Some(v)) => v.to_string(),
        Value::Decimal(Some(v), ..) => v.to_string(),
        Value::Uuid(Some(v)) => v.to_string(),
        _ => return Err(invalid("a string", &value)),
    })
}

fn check_length(value: &str, max_length: u32) -> Result<(), String> {
    let len = value.chars().count();
    if len > max_length as usize {
        return Err(format!(
            "Ensure this value has at most {max_length} characters (it has {len})"
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::FieldType;
    use crate::Value;

    #[test]
    fn integers() {
        let ty = FieldType::PositiveSmallInteger;
        assert_eq!(
            ty.clean(Value::Int64(Some(5)), false),
            Ok(Value::Int16(Some(5)))
        );
        assert!(ty.clean(Value::Int64(Some(65536)), false).is_err());
        assert!(ty.clean(Value::Int32(Some(-5)), false).is_err());
        assert_eq!(
            FieldType::Integer.clean(Value::Varchar(Some("42".into())), false),
            Ok(Value::Int32(Some(42)))
        );
        assert!(
            FieldType::Integer
                .clean(Value::Varchar(Some("text".into())), false)
                .is_err()
        );
        assert!(FieldType::BigInteger.clean(Value::Float64(Some(1.5)), false).is_err());
        assert!(
            FieldType::BigInteger
                .clean(Value::Varchar(Some("12345678901234567890".into())), false)
                .is_err()
        );
    }

    #[test]
    fn auto_and_foreign_keys_bind_as_integers() {
        static TARGET: FieldType = FieldType::AutoField;
        let fk = FieldType::ForeignKey { target: &TARGET };
        assert_eq!(fk.bind_type(), FieldType::Integer);
        assert_eq!(
            fk.clean(Value::Int64(Some(3)), false),
            Ok(Value::Int32(Some(3)))
        );
        assert_eq!(FieldType::BigAutoField.bind_type(), FieldType::BigInteger);
    }

    #[test]
    fn nulls() {
        assert!(FieldType::Integer.clean(Value::Null, false).is_err());
        assert_eq!(
            FieldType::Integer.clean(Value::Null, true),
            Ok(Value::Int32(None))
        );
        assert_eq!(
            FieldType::NullBoolean.clean(Value::Boolean(None), false),
            Ok(Value::Boolean(None))
        );
    }

    #[test]
    fn booleans() {
        assert_eq!(
            FieldType::Boolean.clean(Value::Boolean(Some(true)), false),
            Ok(Value::Boolean(Some(true)))
        );
        for value in [
            Value::Varchar(Some("true".into())),
            Value::Varchar(Some("t".into())),
            Value::Int32(Some(1)),
            Value::Int64(Some(0)),
        ] {
            assert!(FieldType::Boolean.clean(value, false).is_err());
        }
        assert_eq!(
            FieldType::NullBoolean.clean(Value::Null, false),
            Ok(Value::Boolean(None))
        );
    }

    #[test]
    fn strings() {
        let ty = FieldType::Char { max_length: 5 };
        assert_eq!(
            ty.clean(Value::Int32(Some(123)), false),
            Ok(Value::Varchar(Some("123".into())))
        );
        assert!(ty.clean(Value::Varchar(Some("too long".into())), false).is_err());
        assert!(
            FieldType::EMAIL
                .clean(Value::Varchar(Some("user@example.com".into())), false)
                .is_ok()
        );
        assert!(FieldType::EMAIL.clean(Value::Int32(Some(123)), false).is_err());
        assert!(
            FieldType::URL
                .clean(Value::Varchar(Some("not url".into())), false)
                .is_err()
        );
        assert!(
            FieldType::URL
                .clean(Value::Varchar(Some("https://example.com/a".into())), false)
                .is_ok()
        );
        assert!(
            FieldType::SLUG
                .clean(Value::Varchar(Some("a slug".into())), false)
                .is_err()
        );
    }

    #[test]
    fn ip_addresses() {
        let ty = FieldType::IpAddress;
        assert!(ty.clean(Value::Varchar(Some("192.0.2.1".into())), false).is_ok());
        assert!(ty.clean(Value::Varchar(Some("2001:db8::1".into())), false).is_ok());
        assert!(
            ty.clean(Value::Varchar(Some("::ffff:192.0.2.1".into())), false)
                .is_ok()
        );
        assert!(ty.clean(Value::Int32(Some(127001)), false).is_err());
        assert!(ty.clean(Value::Varchar(Some("256.0.0.1".into())), false).is_err());
    }

    #[test]
    fn temporals() {
        assert!(
            FieldType::Date
                .clean(Value::Varchar(Some("2018-01-01".into())), false)
                .is_ok()
        );
        assert!(FieldType::Date.clean(Value::Int64(Some(1234567890)), false).is_err());
        assert!(
            FieldType::Date
                .clean(Value::Varchar(Some("1234567890".into())), false)
                .is_err()
        );
        assert!(
            FieldType::DateTime
                .clean(Value::Varchar(Some("2018-01-01 10:00".into())), false)
                .is_ok()
        );
        assert!(
            FieldType::Time
                .clean(Value::Varchar(Some("14:20".into())), false)
                .is_ok()
        );
    }

    #[test]
    fn decimals() {
        let ty = FieldType::Decimal {
            precision: 5,
            scale: 2,
        };
        assert!(ty.clean(Value::Varchar(Some("123.45".into())), false).is_ok());
        assert!(ty.clean(Value::Varchar(Some("1.234".into())), false).is_err());
        assert!(ty.clean(Value::Int32(Some(12345)), false).is_err());
    }
}
