//! Postgres backend of the booking engine.
//!
//! The `db` module holds the per-table query functions. They take a `&mut PgConnection` so
//! they can be embedded in a caller-owned transaction; [`PostgresDatabase`] composes them
//! into the atomic operations the [`crate::traits::BookingDatabase`] contract demands.

pub mod db;
mod postgres_impl;

pub use postgres_impl::PostgresDatabase;
