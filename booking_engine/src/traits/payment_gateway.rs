use async_trait::async_trait;
use tbs_common::Cents;
use thiserror::Error;

/// Starts an asynchronous payment with the external provider.
///
/// `Ok(())` means the provider accepted the request, not that the payment succeeded. The
/// outcome arrives later through the payment webhook, or never, in which case the booking
/// expires through the delay queue.
#[async_trait]
pub trait PaymentGateway: Clone + Send + Sync + 'static {
    async fn initiate_payment(&self, booking_id: i64, amount: Cents) -> Result<(), PaymentGatewayError>;
}

#[derive(Debug, Clone, Error)]
pub enum PaymentGatewayError {
    #[error("Could not reach the payment provider: {0}")]
    Transport(String),
    #[error("The payment provider rejected the request with status {0}")]
    RejectedRequest(u16),
    #[error("The payment provider did not answer in time")]
    Timeout,
}
