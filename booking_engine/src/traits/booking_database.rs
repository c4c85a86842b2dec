use async_trait::async_trait;
use thiserror::Error;

use crate::{
    db_types::{Booking, Seat},
    traits::{CatalogError, EventCatalog},
};

/// The transactional store behind the booking flow.
///
/// Implementations must uphold two invariants on every mutation:
/// * the seat state change and the booking state change commit atomically;
/// * the outbox row announcing the change is written in the same transaction, so publishing
///   can never diverge from committed state.
///
/// Status transitions are guarded with `WHERE status = <expected>` clauses. The database is
/// the serialization point; there are no in-process locks anywhere in the engine.
#[async_trait]
pub trait BookingDatabase: Clone + EventCatalog + Send + Sync + 'static {
    /// The URL of the database.
    fn url(&self) -> &str;

    /// Atomically reserve `seat_ids` for `event_id` and create a PENDING booking.
    ///
    /// All requested seats must exist, belong to the event and be AVAILABLE; otherwise the
    /// whole transaction fails with [`BookingDatabaseError::SeatNotAvailable`] and nothing is
    /// reserved. On success the seats are RESERVED, one booking-seat link exists per seat,
    /// and a `booking.created` outbox row is queued.
    async fn create_booking(
        &self,
        user_id: i64,
        event_id: i64,
        seat_ids: &[i64],
    ) -> Result<i64, BookingDatabaseError>;

    /// Transition a PENDING booking to CONFIRMED and its seats to BOOKED, queueing a
    /// `booking.confirmed` outbox row.
    ///
    /// If the booking is not PENDING (already confirmed, cancelled or expired), the guarded
    /// update matches zero rows and [`BookingDatabaseError::BookingCannotBeChanged`] is
    /// returned. Callers that only care about "the booking reached a terminal state" treat
    /// that error as already-handled.
    async fn confirm_booking(&self, booking_id: i64) -> Result<(), BookingDatabaseError>;

    /// Transition a PENDING booking to CANCELLED, release its seats to AVAILABLE, and queue a
    /// `booking.cancelled` outbox row.
    ///
    /// Idempotent: if the booking is already terminal this commits without effect and returns
    /// `Ok`, so duplicate deliveries are safe.
    async fn cancel_booking(&self, booking_id: i64) -> Result<(), BookingDatabaseError>;

    /// Same as [`cancel_booking`](BookingDatabase::cancel_booking), but the terminal state is
    /// EXPIRED and the outbox row is `booking.expired`.
    async fn expire_booking(&self, booking_id: i64) -> Result<(), BookingDatabaseError>;

    /// Fetch a booking by id.
    async fn fetch_booking(&self, booking_id: i64) -> Result<Option<Booking>, BookingDatabaseError>;

    /// The seats linked to a booking, ordered by seat id.
    async fn seats_for_booking(&self, booking_id: i64) -> Result<Vec<Seat>, BookingDatabaseError>;
}

#[derive(Debug, Clone, Error)]
pub enum BookingDatabaseError {
    #[error("Seat is not available or does not exist")]
    SeatNotAvailable,
    #[error("Booking {0} is not in a state that can be changed")]
    BookingCannotBeChanged(i64),
    #[error("{0}")]
    CatalogError(#[from] CatalogError),
    #[error("Internal database error: {0}")]
    DatabaseError(String),
}

impl From<sqlx::Error> for BookingDatabaseError {
    fn from(e: sqlx::Error) -> Self {
        BookingDatabaseError::DatabaseError(e.to_string())
    }
}
