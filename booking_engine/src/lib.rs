//! Booking Engine
//!
//! The booking engine is the core of the ticket booking system. It owns the hard part of the
//! domain: reserving a set of seats atomically, coordinating the asynchronous payment saga,
//! and recording every state change together with the outbox event that announces it, in a
//! single database transaction.
//!
//! The library is divided into three main sections:
//! 1. Database management and control. Postgres is the supported backend. You should never
//!    need to access the database directly; use the public API of the engine instead. The
//!    exception is the data types used in the database, defined in the `db_types` module.
//! 2. The booking flow. [`BookingFlowApi`] sequences reserve → request-payment →
//!    confirm/cancel with explicit compensation, and is the single entry point used by the
//!    server, the webhook ingress and the expiration consumer.
//! 3. The trait seams. The storage, the event catalog and the payment provider are traits so
//!    the flow can be exercised against test doubles.

pub mod booking_objects;
pub mod db_types;
pub mod traits;
pub mod wire;

mod booking_flow;
pub mod postgres;

pub mod test_utils;

pub use booking_flow::{BookingFlowApi, BookingFlowError};
pub use postgres::PostgresDatabase;
