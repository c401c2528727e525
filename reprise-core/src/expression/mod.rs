mod binary_op;
mod case;
mod expression;
mod literal;
mod op_precedence;
mod ops;
mod ordered;
mod unary_op;
mod value_list;

pub use binary_op::*;
pub use case::*;
pub use expression::*;
pub use op_precedence::*;
pub use ops::*;
pub use ordered::*;
pub use unary_op::*;
pub use value_list::*;
