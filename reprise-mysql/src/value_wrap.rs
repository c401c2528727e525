use mysql_async::{Column, consts::ColumnType};
use reprise_core::Value;
use time::{Date, Month, PrimitiveDateTime, Time};

/// Collation id of binary strings.
const BINARY_CHARSET: u16 = 63;

fn is_binary(column: &Column) -> bool {
    column.character_set() == BINARY_CHARSET
        && matches!(
            column.column_type(),
            ColumnType::MYSQL_TYPE_BLOB
                | ColumnType::MYSQL_TYPE_TINY_BLOB
                | ColumnType::MYSQL_TYPE_MEDIUM_BLOB
                | ColumnType::MYSQL_TYPE_LONG_BLOB
                | ColumnType::MYSQL_TYPE_VAR_STRING
                | ColumnType::MYSQL_TYPE_STRING
                | ColumnType::MYSQL_TYPE_VARCHAR
        )
}

/// Convert a cell, text protocol cells become [`Value::Unknown`] and are parsed on read.
pub(crate) fn decode_value(value: mysql_async::Value, column: &Column) -> Option<Value> {
    Some(match value {
        mysql_async::Value::NULL => Value::Null,
        mysql_async::Value::Bytes(v) if is_binary(column) => Value::Blob(Some(v.into())),
        mysql_async::Value::Bytes(v) => Value::Unknown(Some(String::from_utf8(v).ok()?)),
        mysql_async::Value::Int(v) => Value::Int64(Some(v)),
        mysql_async::Value::UInt(v) => Value::UInt64(Some(v)),
        mysql_async::Value::Float(v) => Value::Float32(Some(v)),
        mysql_async::Value::Double(v) => Value::Float64(Some(v)),
        mysql_async::Value::Date(year, month, day, hour, minute, second, microsecond) => {
            Value::Timestamp(Some(PrimitiveDateTime::new(
                Date::from_calendar_date(year as _, Month::try_from(month).ok()?, day).ok()?,
                Time::from_hms_micro(hour, minute, second, microsecond).ok()?,
            )))
        }
        mysql_async::Value::Time(false, 0, hours, minutes, seconds, micro) => {
            Value::Time(Some(Time::from_hms_micro(hours, minutes, seconds, micro).ok()?))
        }
        mysql_async::Value::Time(..) => return None,
    })
}
