use actix_web::{
    error::ResponseError,
    http::{header::ContentType, StatusCode},
    HttpResponse,
};
use log::error;
use thiserror::Error;
use unzer_payment_engine::{ConfigurationApiError, DashboardApiError, PaymentFlowError, WebhookError};

/// Every error a route can return. The `Display` text ends up in the response body, so variants never carry
/// gateway or marketplace messages. Those are logged where the error is converted.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Could not initialize server. {0}")]
    InitializeError(String),
    #[error("An error occurred on the backend of the server. {0}")]
    BackendError(String),
    #[error("The {0} could not complete the request.")]
    ExternalServiceError(&'static str),
    #[error("Could not read request body: {0}")]
    InvalidRequestBody(String),
    #[error("Missing or invalid header: {0}")]
    InvalidHeader(&'static str),
    #[error("An I/O error happened in the server. {0}")]
    IOError(#[from] std::io::Error),
    #[error("Invalid server configuration. {0}")]
    ConfigurationError(String),
    #[error("The data was not found. {0}")]
    NoRecordFound(String),
    #[error("The request cannot be carried out. {0}")]
    Conflict(String),
    #[error("Unknown event: {0}")]
    UnknownEvent(String),
    #[error("UnspecifiedError. {0}")]
    Unspecified(String),
}

impl ResponseError for ServerError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequestBody(_) => StatusCode::BAD_REQUEST,
            Self::InvalidHeader(_) => StatusCode::BAD_REQUEST,
            Self::NoRecordFound(_) => StatusCode::NOT_FOUND,
            Self::UnknownEvent(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::InitializeError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::BackendError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ExternalServiceError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::IOError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ConfigurationError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Unspecified(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code())
            .insert_header(ContentType::json())
            .body(serde_json::json!({ "error": self.to_string() }).to_string())
    }
}

impl From<PaymentFlowError> for ServerError {
    fn from(e: PaymentFlowError) -> Self {
        match e {
            PaymentFlowError::InvalidRequest(_) |
            PaymentFlowError::MissingCheckoutToken(_) |
            PaymentFlowError::InvalidCustomer(_) => Self::InvalidRequestBody(e.to_string()),
            PaymentFlowError::PaymentSessionNotFound(_) => Self::NoRecordFound(e.to_string()),
            PaymentFlowError::PaymentNotStarted(_) | PaymentFlowError::NothingToCancel(..) => {
                Self::Conflict(e.to_string())
            },
            PaymentFlowError::MissingConfiguration(_) | PaymentFlowError::MissingAccessToken(_) => {
                Self::BackendError(e.to_string())
            },
            PaymentFlowError::DatabaseError(_) => {
                error!("💻️ {e}");
                Self::BackendError("Database error".into())
            },
            PaymentFlowError::GatewayError(_) | PaymentFlowError::IncompleteGatewayResponse(_) => {
                error!("💻️ {e}");
                Self::ExternalServiceError("payment gateway")
            },
            PaymentFlowError::MarketplaceError(_) | PaymentFlowError::MissingRedirect => {
                error!("💻️ {e}");
                Self::ExternalServiceError("marketplace")
            },
        }
    }
}

impl From<WebhookError> for ServerError {
    fn from(e: WebhookError) -> Self {
        match e {
            WebhookError::MalformedNotification(_) => Self::InvalidRequestBody(e.to_string()),
            WebhookError::UnknownEvent(event) => Self::UnknownEvent(event),
            WebhookError::DatabaseError(_) => {
                error!("💻️ {e}");
                Self::BackendError("Database error".into())
            },
            WebhookError::GatewayError(_) => {
                error!("💻️ {e}");
                Self::ExternalServiceError("payment gateway")
            },
        }
    }
}

impl From<ConfigurationApiError> for ServerError {
    fn from(e: ConfigurationApiError) -> Self {
        match e {
            ConfigurationApiError::ShopNotFound(_) => Self::NoRecordFound(e.to_string()),
            ConfigurationApiError::MissingShop => Self::InvalidRequestBody(e.to_string()),
            ConfigurationApiError::MissingKeys(_) | ConfigurationApiError::MissingAccessToken(_) => {
                Self::Conflict(e.to_string())
            },
            ConfigurationApiError::DatabaseError(_) => {
                error!("💻️ {e}");
                Self::BackendError("Database error".into())
            },
            ConfigurationApiError::GatewayError(_) => {
                error!("💻️ {e}");
                Self::ExternalServiceError("payment gateway")
            },
            ConfigurationApiError::MarketplaceError(_) => {
                error!("💻️ {e}");
                Self::ExternalServiceError("marketplace")
            },
        }
    }
}

impl From<DashboardApiError> for ServerError {
    fn from(e: DashboardApiError) -> Self {
        match e {
            DashboardApiError::QueryError(_) => Self::InvalidRequestBody(e.to_string()),
            DashboardApiError::DatabaseError(_) => {
                error!("💻️ {e}");
                Self::BackendError("Database error".into())
            },
        }
    }
}
