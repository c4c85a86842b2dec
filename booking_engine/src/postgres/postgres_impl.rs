//! `PostgresDatabase` is the concrete backend of the booking engine.
//!
//! Every mutating operation opens one transaction and commits every effect (booking row,
//! seat statuses, booking-seat links and the outbox row) or none of them.
use std::fmt::Debug;

use async_trait::async_trait;
use log::*;
use serde_json::json;
use sqlx::PgPool;

use super::db::{bookings, events, new_pool, outbox, seats};
use crate::{
    booking_objects::{EventList, Pagination},
    db_types::{Booking, BookingStatus, EventInfo, NewOutboxMessage, Seat, SeatStatus},
    traits::{BookingDatabase, BookingDatabaseError, CatalogError, EventCatalog},
    wire,
};

#[derive(Clone)]
pub struct PostgresDatabase {
    url: String,
    pool: PgPool,
}

impl Debug for PostgresDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "PostgresDatabase ({:?})", self.pool)
    }
}

impl PostgresDatabase {
    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, BookingDatabaseError> {
        let pool = new_pool(url, max_connections).await?;
        Ok(Self { url: url.to_string(), pool })
    }

    pub fn new_with_pool(url: &str, pool: PgPool) -> Self {
        Self { url: url.to_string(), pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// The shared CANCELLED/EXPIRED path. The guarded update matching zero rows means the
    /// booking already reached a terminal state; the transaction commits with no effect so
    /// duplicate deliveries (webhook retries, message redelivery) stay safe.
    async fn release_from_pending(
        &self,
        booking_id: i64,
        new_status: BookingStatus,
        routing_key: &str,
    ) -> Result<(), BookingDatabaseError> {
        let mut tx = self.pool.begin().await?;
        let changed = bookings::transition_from_pending(booking_id, new_status, &mut tx).await?;
        if changed == 0 {
            debug!("🗃️ Booking {booking_id} is already terminal; {new_status} transition is a no-op");
            tx.commit().await?;
            return Ok(());
        }
        seats::set_status_for_booking_seats(booking_id, SeatStatus::Available, &mut tx).await?;
        let payload = json!({"booking_id": booking_id, "reason": new_status});
        outbox::insert_message(NewOutboxMessage::new(wire::BOOKINGS_EXCHANGE, routing_key, payload), &mut tx).await?;
        tx.commit().await?;
        info!("🗃️ Booking {booking_id} moved to {new_status}, seats released");
        Ok(())
    }
}

#[async_trait]
impl BookingDatabase for PostgresDatabase {
    fn url(&self) -> &str {
        self.url.as_str()
    }

    async fn create_booking(
        &self,
        user_id: i64,
        event_id: i64,
        seat_ids: &[i64],
    ) -> Result<i64, BookingDatabaseError> {
        let mut tx = self.pool.begin().await?;
        let locked = seats::lock_available_seats(seat_ids, event_id, &mut tx).await?;
        if locked.len() != seat_ids.len() {
            // Missing, wrong event, duplicate in the request, or already taken. All-or-nothing,
            // so the transaction rolls back on drop.
            return Err(BookingDatabaseError::SeatNotAvailable);
        }
        let booking_id = bookings::insert_booking(user_id, event_id, &mut tx).await?;
        bookings::link_seats_to_booking(booking_id, &locked, &mut tx).await?;
        seats::set_status_for_seats(&locked, SeatStatus::Reserved, &mut tx).await?;
        let payload = json!({"booking_id": booking_id});
        outbox::insert_message(
            NewOutboxMessage::new(wire::BOOKINGS_EXCHANGE, wire::BOOKING_CREATED, payload),
            &mut tx,
        )
        .await?;
        tx.commit().await?;
        info!("🗃️ Booking {booking_id} reserved {} seats on event {event_id}", locked.len());
        Ok(booking_id)
    }

    async fn confirm_booking(&self, booking_id: i64) -> Result<(), BookingDatabaseError> {
        let mut tx = self.pool.begin().await?;
        let changed = bookings::transition_from_pending(booking_id, BookingStatus::Confirmed, &mut tx).await?;
        if changed == 0 {
            return Err(BookingDatabaseError::BookingCannotBeChanged(booking_id));
        }
        seats::set_status_for_booking_seats(booking_id, SeatStatus::Booked, &mut tx).await?;
        let payload = json!({"booking_id": booking_id});
        outbox::insert_message(
            NewOutboxMessage::new(wire::BOOKINGS_EXCHANGE, wire::BOOKING_CONFIRMED, payload),
            &mut tx,
        )
        .await?;
        tx.commit().await?;
        info!("🗃️ Booking {booking_id} confirmed, seats booked");
        Ok(())
    }

    async fn cancel_booking(&self, booking_id: i64) -> Result<(), BookingDatabaseError> {
        self.release_from_pending(booking_id, BookingStatus::Cancelled, wire::BOOKING_CANCELLED).await
    }

    async fn expire_booking(&self, booking_id: i64) -> Result<(), BookingDatabaseError> {
        self.release_from_pending(booking_id, BookingStatus::Expired, wire::BOOKING_EXPIRED).await
    }

    async fn fetch_booking(&self, booking_id: i64) -> Result<Option<Booking>, BookingDatabaseError> {
        let mut conn = self.pool.acquire().await?;
        let booking = bookings::fetch_booking(booking_id, &mut conn).await?;
        Ok(booking)
    }

    async fn seats_for_booking(&self, booking_id: i64) -> Result<Vec<Seat>, BookingDatabaseError> {
        let mut conn = self.pool.acquire().await?;
        let seats = seats::fetch_seats_for_booking(booking_id, &mut conn).await?;
        Ok(seats)
    }
}

#[async_trait]
impl EventCatalog for PostgresDatabase {
    async fn list_events(&self, pagination: Pagination) -> Result<EventList, CatalogError> {
        let mut conn = self.pool.acquire().await?;
        let events = events::list_events(pagination, &mut conn).await?;
        let total_count = events::count_events(&mut conn).await?;
        Ok(EventList {
            events,
            total_count,
            page_number: pagination.page_number(),
            page_size: pagination.page_size(),
        })
    }

    async fn fetch_event(&self, event_id: i64) -> Result<Option<EventInfo>, CatalogError> {
        let mut conn = self.pool.acquire().await?;
        let event = events::fetch_event(event_id, &mut conn).await?;
        Ok(event)
    }

    async fn seats_for_event(&self, event_id: i64) -> Result<Vec<Seat>, CatalogError> {
        let mut conn = self.pool.acquire().await?;
        let seats = seats::fetch_seats_for_event(event_id, &mut conn).await?;
        Ok(seats)
    }
}
