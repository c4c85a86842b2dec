//! HTTP adapter for the external payment provider.
//!
//! The provider's API is asynchronous: a 2xx answer only means the payment was accepted for
//! processing. The verdict arrives later on the webhook ingress, or not at all, in which
//! case the delay queue expires the booking.

use std::time::Duration;

use async_trait::async_trait;
use booking_engine::traits::{PaymentGateway, PaymentGatewayError};
use log::*;
use reqwest::Client;
use serde_json::json;
use tbs_common::Cents;

use crate::errors::ServerError;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Clone)]
pub struct HttpPaymentGateway {
    client: Client,
    target_url: String,
}

impl HttpPaymentGateway {
    pub fn new(target_url: &str) -> Result<Self, ServerError> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| ServerError::InitializeError(e.to_string()))?;
        Ok(Self { client, target_url: target_url.to_string() })
    }
}

#[async_trait]
impl PaymentGateway for HttpPaymentGateway {
    async fn initiate_payment(&self, booking_id: i64, amount: Cents) -> Result<(), PaymentGatewayError> {
        trace!("💳️ Requesting payment of {amount} for booking {booking_id}");
        let body = json!({ "booking_id": booking_id, "amount": amount });
        let response = self.client.post(&self.target_url).json(&body).send().await.map_err(|e| {
            if e.is_timeout() {
                PaymentGatewayError::Timeout
            } else {
                PaymentGatewayError::Transport(e.to_string())
            }
        })?;
        let status = response.status();
        if status.is_success() {
            debug!("💳️ Payment provider accepted the request for booking {booking_id}");
            Ok(())
        } else {
            warn!("💳️ Payment provider rejected booking {booking_id} with status {status}");
            Err(PaymentGatewayError::RejectedRequest(status.as_u16()))
        }
    }
}
