use chrono::{DateTime, Utc};
use log::error;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use std::fmt::Display;
use std::str::FromStr;
use tbs_common::Cents;
use thiserror::Error;

//--------------------------------------    SeatStatus     -----------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(type_name = "seat_status")]
pub enum SeatStatus {
    /// The seat can be claimed by a new booking.
    #[sqlx(rename = "AVAILABLE")]
    #[serde(rename = "AVAILABLE")]
    Available,
    /// The seat is held by a PENDING booking awaiting payment.
    #[sqlx(rename = "RESERVED")]
    #[serde(rename = "RESERVED")]
    Reserved,
    /// The seat belongs to a CONFIRMED booking.
    #[sqlx(rename = "BOOKED")]
    #[serde(rename = "BOOKED")]
    Booked,
}

impl Display for SeatStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SeatStatus::Available => write!(f, "AVAILABLE"),
            SeatStatus::Reserved => write!(f, "RESERVED"),
            SeatStatus::Booked => write!(f, "BOOKED"),
        }
    }
}

impl FromStr for SeatStatus {
    type Err = StatusConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "AVAILABLE" => Ok(Self::Available),
            "RESERVED" => Ok(Self::Reserved),
            "BOOKED" => Ok(Self::Booked),
            s => Err(StatusConversionError(format!("Invalid seat status: {s}"))),
        }
    }
}

//--------------------------------------   BookingStatus   -----------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(type_name = "booking_status")]
pub enum BookingStatus {
    /// The booking is created and the payment outcome is not known yet.
    #[sqlx(rename = "PENDING")]
    #[serde(rename = "PENDING")]
    Pending,
    /// The payment succeeded. Terminal.
    #[sqlx(rename = "CONFIRMED")]
    #[serde(rename = "CONFIRMED")]
    Confirmed,
    /// The payment failed, or the user/admin cancelled. Terminal.
    #[sqlx(rename = "CANCELLED")]
    #[serde(rename = "CANCELLED")]
    Cancelled,
    /// No payment outcome arrived within the hold window. Terminal.
    #[sqlx(rename = "EXPIRED")]
    #[serde(rename = "EXPIRED")]
    Expired,
}

impl BookingStatus {
    /// A booking in a terminal state never changes again.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, BookingStatus::Pending)
    }
}

impl Display for BookingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BookingStatus::Pending => write!(f, "PENDING"),
            BookingStatus::Confirmed => write!(f, "CONFIRMED"),
            BookingStatus::Cancelled => write!(f, "CANCELLED"),
            BookingStatus::Expired => write!(f, "EXPIRED"),
        }
    }
}

impl From<String> for BookingStatus {
    fn from(value: String) -> Self {
        value.parse().unwrap_or_else(|_| {
            error!("Invalid booking status: {value}. But this conversion cannot fail. Defaulting to Pending");
            BookingStatus::Pending
        })
    }
}

#[derive(Debug, Clone, Error)]
#[error("{0}")]
pub struct StatusConversionError(String);

impl FromStr for BookingStatus {
    type Err = StatusConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(Self::Pending),
            "CONFIRMED" => Ok(Self::Confirmed),
            "CANCELLED" => Ok(Self::Cancelled),
            "EXPIRED" => Ok(Self::Expired),
            s => Err(StatusConversionError(format!("Invalid booking status: {s}"))),
        }
    }
}

//--------------------------------------       Seat        -----------------------------------------------------------
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Seat {
    pub id: i64,
    pub event_id: i64,
    pub status: SeatStatus,
}

//--------------------------------------      Booking      -----------------------------------------------------------
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Booking {
    pub id: i64,
    pub user_id: i64,
    pub event_id: i64,
    pub status: BookingStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

//--------------------------------------     EventInfo     -----------------------------------------------------------
/// A row from the event catalog. The catalog's lifecycle (creation, editing) is outside the
/// engine; the booking flow only reads it for seat scoping and the per-seat price.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct EventInfo {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub starts_at: DateTime<Utc>,
    pub price: Cents,
}

//--------------------------------------   OutboxMessage   -----------------------------------------------------------
/// A domain event awaiting delivery to the broker.
///
/// Rows are inserted in the same transaction as the state change they describe and marked
/// processed only after the broker acknowledges the publish.
#[derive(Debug, Clone, FromRow)]
pub struct OutboxMessage {
    pub id: i64,
    pub exchange: String,
    pub routing_key: String,
    pub payload: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct NewOutboxMessage {
    pub exchange: String,
    pub routing_key: String,
    pub payload: serde_json::Value,
}

impl NewOutboxMessage {
    pub fn new<S: Into<String>>(exchange: S, routing_key: S, payload: serde_json::Value) -> Self {
        Self { exchange: exchange.into(), routing_key: routing_key.into(), payload }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn booking_status_round_trips_through_strings() {
        for status in
            [BookingStatus::Pending, BookingStatus::Confirmed, BookingStatus::Cancelled, BookingStatus::Expired]
        {
            assert_eq!(status.to_string().parse::<BookingStatus>().unwrap(), status);
        }
        assert!("PAID".parse::<BookingStatus>().is_err());
    }

    #[test]
    fn only_pending_is_mutable() {
        assert!(!BookingStatus::Pending.is_terminal());
        assert!(BookingStatus::Confirmed.is_terminal());
        assert!(BookingStatus::Cancelled.is_terminal());
        assert!(BookingStatus::Expired.is_terminal());
    }

    #[test]
    fn seat_status_round_trips_through_strings() {
        for status in [SeatStatus::Available, SeatStatus::Reserved, SeatStatus::Booked] {
            assert_eq!(status.to_string().parse::<SeatStatus>().unwrap(), status);
        }
    }
}
