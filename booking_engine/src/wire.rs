//! Names shared between the store, the relay and the broker topology.
//!
//! Consumers key their bindings off these constants, so changing any of them is a breaking
//! wire change.

/// Topic exchange all booking events are published to.
pub const BOOKINGS_EXCHANGE: &str = "bookings_exchange";
/// Fanout dead-letter exchange fed by the delay queue.
pub const BOOKINGS_DLX: &str = "bookings_dlx";

/// Holds `booking.created` messages for the payment window, then dead-letters them.
pub const DELAY_QUEUE: &str = "bookings_delay_15m";
/// Where dead-lettered `booking.created` messages land; consumed by the expiration worker.
pub const EXPIRED_QUEUE: &str = "bookings_expired_queue";
pub const NOTIFICATION_QUEUE: &str = "notification_queue";
pub const TICKET_QUEUE: &str = "ticket_queue";

pub const BOOKING_CREATED: &str = "booking.created";
pub const BOOKING_CONFIRMED: &str = "booking.confirmed";
pub const BOOKING_CANCELLED: &str = "booking.cancelled";
pub const BOOKING_EXPIRED: &str = "booking.expired";

/// How long an unpaid booking is held before it expires: 15 minutes, enforced broker-side.
pub const DELAY_TTL_MS: u32 = 900_000;
