use sqlx::PgConnection;

use crate::{booking_objects::Pagination, db_types::EventInfo};

pub async fn list_events(pagination: Pagination, conn: &mut PgConnection) -> Result<Vec<EventInfo>, sqlx::Error> {
    sqlx::query_as(
        r#"
            SELECT id, title, description, starts_at, price
            FROM event.events
            ORDER BY starts_at DESC
            LIMIT $1 OFFSET $2;
        "#,
    )
    .bind(pagination.page_size())
    .bind(pagination.offset())
    .fetch_all(conn)
    .await
}

pub async fn count_events(conn: &mut PgConnection) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM event.events").fetch_one(conn).await
}

pub async fn fetch_event(event_id: i64, conn: &mut PgConnection) -> Result<Option<EventInfo>, sqlx::Error> {
    sqlx::query_as("SELECT id, title, description, starts_at, price FROM event.events WHERE id = $1")
        .bind(event_id)
        .fetch_optional(conn)
        .await
}
