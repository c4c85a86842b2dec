use thiserror::Error;

use crate::traits::{BookingDatabaseError, CatalogError, PaymentGatewayError};

#[derive(Debug, Clone, Error)]
pub enum BookingFlowError {
    #[error("One or more of the requested seats is not available")]
    SeatNotAvailable,
    #[error("A booking must reserve at least one seat")]
    EmptySeatSelection,
    #[error("The payment could not be initiated. The reservation has been rolled back")]
    PaymentFailed,
    #[error("'{0}' is not a valid payment outcome")]
    InvalidPaymentStatus(String),
    #[error("{0}")]
    DatabaseError(BookingDatabaseError),
    #[error("{0}")]
    CatalogError(#[from] CatalogError),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<BookingDatabaseError> for BookingFlowError {
    fn from(e: BookingDatabaseError) -> Self {
        match e {
            BookingDatabaseError::SeatNotAvailable => BookingFlowError::SeatNotAvailable,
            e => BookingFlowError::DatabaseError(e),
        }
    }
}

impl From<PaymentGatewayError> for BookingFlowError {
    fn from(_: PaymentGatewayError) -> Self {
        BookingFlowError::PaymentFailed
    }
}
