pub mod bookings;
pub mod events;
pub mod outbox;
pub mod seats;

use sqlx::{postgres::PgPoolOptions, PgPool};

pub async fn new_pool(url: &str, max_connections: u32) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new().max_connections(max_connections).connect(url).await
}

pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}
