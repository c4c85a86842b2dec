//! Helpers for tests that exercise the Postgres backend for real.
//!
//! Set `TBS_TEST_DATABASE_URL` (a `.env.test` file works too) to point at a throwaway
//! Postgres instance. Tests that need the database call [`prepare_test_env`] and skip
//! themselves when it returns `None`, so the rest of the suite stays runnable anywhere.

use log::*;

use crate::PostgresDatabase;

pub async fn prepare_test_env() -> Option<PostgresDatabase> {
    dotenvy::from_filename(".env.test").ok();
    let _ = env_logger::try_init();
    let url = match std::env::var("TBS_TEST_DATABASE_URL") {
        Ok(url) => url,
        Err(_) => {
            eprintln!("TBS_TEST_DATABASE_URL is not set. Skipping database test.");
            return None;
        },
    };
    let db = PostgresDatabase::new_with_url(&url, 10).await.expect("Error connecting to the test database");
    crate::postgres::db::run_migrations(db.pool()).await.expect("Error running DB migrations");
    debug!("🚀️ Test database ready at {url}");
    Some(db)
}

/// Seeds a user plus a fresh event with `seat_count` AVAILABLE seats. Each caller gets its
/// own event, so tests stay independent without wiping shared tables.
///
/// Returns the event id and the new seat ids.
pub async fn seed_event_with_seats(
    db: &PostgresDatabase,
    user_id: i64,
    price: i64,
    seat_count: usize,
) -> (i64, Vec<i64>) {
    let pool = db.pool();
    sqlx::query("INSERT INTO auth.users (id) VALUES ($1) ON CONFLICT DO NOTHING")
        .bind(user_id)
        .execute(pool)
        .await
        .expect("Error seeding user");
    let event_id: i64 = sqlx::query_scalar(
        "INSERT INTO event.events (title, starts_at, price) VALUES ('test event', NOW() + INTERVAL '7 days', $1) \
         RETURNING id",
    )
    .bind(price)
    .fetch_one(pool)
    .await
    .expect("Error seeding event");
    let mut seat_ids = Vec::with_capacity(seat_count);
    for _ in 0..seat_count {
        let seat_id: i64 = sqlx::query_scalar("INSERT INTO event.seats (event_id) VALUES ($1) RETURNING id")
            .bind(event_id)
            .fetch_one(pool)
            .await
            .expect("Error seeding seat");
        seat_ids.push(seat_id);
    }
    (event_id, seat_ids)
}
