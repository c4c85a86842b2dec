//! Trait seams of the booking engine.
//!
//! The engine talks to the outside world through three contracts:
//!
//! * [`BookingDatabase`] is the transactional store. Every mutation it performs commits the
//!   business state change together with the outbox row describing it, or neither.
//! * [`EventCatalog`] is the read-only view of the event catalog (events, seats, prices).
//! * [`PaymentGateway`] starts an asynchronous payment with the external provider. The
//!   outcome never comes back through this trait; it arrives later via the webhook ingress.

mod booking_database;
mod event_catalog;
mod payment_gateway;

pub use booking_database::{BookingDatabase, BookingDatabaseError};
pub use event_catalog::{CatalogError, EventCatalog};
pub use payment_gateway::{PaymentGateway, PaymentGatewayError};
