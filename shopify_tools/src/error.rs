use thiserror::Error;

use crate::UserError;

#[derive(Debug, Error)]
pub enum ShopifyApiError {
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
    #[error("Invalid GraphQL query: {0}")]
    InvalidGraphQL(String),
    #[error("GraphQL query failed: {0}")]
    GraphQLError(String),
    #[error("The mutation was refused: {}", join_user_errors(.0))]
    UserErrors(Vec<UserError>),
    #[error("The GraphQL response did not contain any data")]
    EmptyResponse,
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),
}

fn join_user_errors(errors: &[UserError]) -> String {
    errors.iter().map(|e| e.to_string()).collect::<Vec<_>>().join(", ")
}
