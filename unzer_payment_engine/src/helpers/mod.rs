mod basket;
mod checkout_token;
mod customer;
mod transaction_status;

pub use basket::basket_for_checkout;
pub use checkout_token::extract_checkout_token;
pub use customer::{gateway_customer, CustomerMappingError};
pub use transaction_status::{transaction_status, TransactionStatus};
