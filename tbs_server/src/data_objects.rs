use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateBookingRequest {
    pub event_id: i64,
    pub seat_ids: Vec<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateBookingResponse {
    pub booking_id: i64,
}

/// The body the payment provider posts to `/api/v1/payments/webhook`. The raw bytes are
/// HMAC-verified before this is ever parsed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentWebhookPayload {
    pub booking_id: i64,
    pub status: String,
    pub timestamp: DateTime<Utc>,
}

/// A dead-lettered `booking.created` message as it arrives on the expired-bookings queue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExpiredBookingMessage {
    pub booking_id: i64,
}
