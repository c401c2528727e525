use crate::{
    AsValue, Expression, OpPrecedence,
    writer::{Context, SqlWriter},
};
use rust_decimal::Decimal;
use time::{Date, OffsetDateTime, PrimitiveDateTime, Time};
use uuid::Uuid;

macro_rules! impl_literal_expression {
    ($($ty:ty),+ $(,)?) => {$(
        impl OpPrecedence for $ty {
            fn precedence(&self, _writer: &dyn SqlWriter) -> i32 {
                1_000_000
            }
        }
        impl Expression for $ty {
            fn write_query(&self, writer: &dyn SqlWriter, context: &mut Context, out: &mut String) {
                writer.write_expression_value(context, out, &self.clone().as_value());
            }
        }
    )+};
}

impl_literal_expression!(
    i8,
    i16,
    i32,
    i64,
    u8,
    u16,
    u32,
    u64,
    f32,
    f64,
    String,
    &'static str,
    Decimal,
    Date,
    Time,
    PrimitiveDateTime,
    OffsetDateTime,
    Uuid,
);
