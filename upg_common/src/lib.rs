mod amount;
mod helpers;

pub mod op;
mod secret;

pub use amount::{as_number, Amount, AmountConversionError, AMOUNT_SCALE};
pub use helpers::{parse_boolean_flag, parse_list};
pub use secret::Secret;
