use async_trait::async_trait;
use thiserror::Error;

use crate::{
    booking_objects::{EventList, Pagination},
    db_types::{EventInfo, Seat},
};

/// Read access to the event catalog.
///
/// Catalog maintenance (creating events, seeding seats) belongs to a different service; the
/// engine only needs to list what is on sale and price a reservation.
#[async_trait]
pub trait EventCatalog: Send + Sync {
    /// Fetch one page of upcoming events, newest first.
    async fn list_events(&self, pagination: Pagination) -> Result<EventList, CatalogError>;

    /// Fetch a single event, or `None` if the id is unknown.
    async fn fetch_event(&self, event_id: i64) -> Result<Option<EventInfo>, CatalogError>;

    /// All seats belonging to an event, ordered by seat id.
    async fn seats_for_event(&self, event_id: i64) -> Result<Vec<Seat>, CatalogError>;
}

#[derive(Debug, Clone, Error)]
pub enum CatalogError {
    #[error("The requested event {0} does not exist")]
    EventNotFound(i64),
    #[error("Internal database error: {0}")]
    DatabaseError(String),
}

impl From<sqlx::Error> for CatalogError {
    fn from(e: sqlx::Error) -> Self {
        CatalogError::DatabaseError(e.to_string())
    }
}
