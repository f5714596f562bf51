use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum UnzerApiError {
    #[error("Could not initialize client: {0}")]
    Initialization(String),
    #[error("Invalid REST request: {0}")]
    RestRequestError(String),
    #[error("Invalid REST response: {0}")]
    RestResponseError(String),
    #[error("Could not deserialize JSON: {0}")]
    JsonError(String),
    #[error("Query failed. Error {status}. {message}")]
    QueryError { status: u16, message: String },
    #[error("The gateway rejected the request: {}", join_messages(.0))]
    GatewayError(Vec<UnzerErrorDetail>),
    #[error("Refusing to send credentials to a URL outside the gateway API: {0}")]
    UntrustedUrl(String),
}

/// A single entry of the `errors` array in a gateway error response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnzerErrorDetail {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub merchant_message: String,
    #[serde(default)]
    pub customer_message: String,
}

fn join_messages(errors: &[UnzerErrorDetail]) -> String {
    if errors.is_empty() {
        return "no details given".to_string();
    }
    errors.iter().map(|e| format!("[{}] {}", e.code, e.merchant_message)).collect::<Vec<_>>().join(", ")
}
