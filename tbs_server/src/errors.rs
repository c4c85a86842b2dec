use actix_web::{
    error::ResponseError,
    http::StatusCode,
    HttpResponse,
};
use log::error;
use serde_json::json;
use thiserror::Error;

use booking_engine::BookingFlowError;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Payload deserialization error")]
    CouldNotDeserializePayload,
    #[error("Could not read request body: {0}")]
    InvalidRequestBody(String),
    #[error("Authentication failed: {0}")]
    AuthenticationError(String),
    #[error("One or more of the requested seats is not available")]
    SeatNotAvailable,
    #[error("The payment could not be initiated and the reservation was rolled back")]
    PaymentFailed,
    #[error("Invalid webhook payload: {0}")]
    InvalidWebhookPayload(String),
    #[error("The webhook timestamp is outside the accepted freshness window")]
    StaleWebhook,
    #[error("An upstream dependency is unavailable: {0}")]
    Unavailable(String),
    #[error("An internal error occurred: {0}")]
    BackendError(String),
    #[error("Could not initialize the server: {0}")]
    InitializeError(String),
    #[error("Invalid server configuration: {0}")]
    ConfigurationError(String),
    #[error("An I/O error happened in the server: {0}")]
    IOError(#[from] std::io::Error),
}

impl ResponseError for ServerError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::CouldNotDeserializePayload
            | Self::InvalidRequestBody(_)
            | Self::InvalidWebhookPayload(_) => StatusCode::BAD_REQUEST,
            Self::AuthenticationError(_) => StatusCode::UNAUTHORIZED,
            Self::StaleWebhook => StatusCode::FORBIDDEN,
            Self::SeatNotAvailable | Self::PaymentFailed => StatusCode::CONFLICT,
            Self::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        if self.status_code().is_server_error() {
            error!("💻️ Request failed: {self}");
        }
        HttpResponse::build(self.status_code()).json(json!({ "error": self.to_string() }))
    }
}

/// The default mapping, used by the booking route. The webhook route maps upstream failures
/// to 503 instead; see [`crate::routes::payment_webhook`].
impl From<BookingFlowError> for ServerError {
    fn from(e: BookingFlowError) -> Self {
        match e {
            BookingFlowError::SeatNotAvailable => ServerError::SeatNotAvailable,
            BookingFlowError::PaymentFailed => ServerError::PaymentFailed,
            BookingFlowError::EmptySeatSelection => ServerError::InvalidRequestBody(e.to_string()),
            BookingFlowError::InvalidPaymentStatus(s) => ServerError::InvalidWebhookPayload(s),
            e => ServerError::BackendError(e.to_string()),
        }
    }
}
