//! Broker topology, declared idempotently at startup.
//!
//! The delay queue is the system's distributed timer: `booking.created` messages sit in
//! `bookings_delay_15m` until their TTL fires, then dead-letter through `bookings_dlx` into
//! `bookings_expired_queue`, where the expiration consumer picks them up. Broker storage is
//! durable, so a crash inside the 15-minute window loses no expirations.

use booking_engine::wire;
use lapin::{
    options::{ExchangeDeclareOptions, QueueBindOptions, QueueDeclareOptions},
    types::{AMQPValue, FieldTable},
    Channel, ExchangeKind,
};
use log::debug;

use super::BrokerError;

fn durable_exchange() -> ExchangeDeclareOptions {
    ExchangeDeclareOptions { durable: true, ..Default::default() }
}

fn durable_queue() -> QueueDeclareOptions {
    QueueDeclareOptions { durable: true, ..Default::default() }
}

pub async fn declare_topology(channel: &Channel) -> Result<(), BrokerError> {
    channel
        .exchange_declare(wire::BOOKINGS_EXCHANGE, ExchangeKind::Topic, durable_exchange(), FieldTable::default())
        .await
        .map_err(topology_error)?;
    channel
        .exchange_declare(wire::BOOKINGS_DLX, ExchangeKind::Fanout, durable_exchange(), FieldTable::default())
        .await
        .map_err(topology_error)?;

    // Expired messages land here. The exchange is a fanout, so the binding key is ignored.
    channel
        .queue_declare(wire::EXPIRED_QUEUE, durable_queue(), FieldTable::default())
        .await
        .map_err(topology_error)?;
    channel
        .queue_bind(wire::EXPIRED_QUEUE, wire::BOOKINGS_DLX, "", QueueBindOptions::default(), FieldTable::default())
        .await
        .map_err(topology_error)?;

    let mut delay_args = FieldTable::default();
    delay_args.insert("x-message-ttl".into(), AMQPValue::LongInt(wire::DELAY_TTL_MS as i32));
    delay_args.insert("x-dead-letter-exchange".into(), AMQPValue::LongString(wire::BOOKINGS_DLX.into()));
    channel.queue_declare(wire::DELAY_QUEUE, durable_queue(), delay_args).await.map_err(topology_error)?;
    channel
        .queue_bind(
            wire::DELAY_QUEUE,
            wire::BOOKINGS_EXCHANGE,
            wire::BOOKING_CREATED,
            QueueBindOptions::default(),
            FieldTable::default(),
        )
        .await
        .map_err(topology_error)?;

    declare_consumer_queue(
        channel,
        wire::NOTIFICATION_QUEUE,
        &[wire::BOOKING_CONFIRMED, wire::BOOKING_CANCELLED, wire::BOOKING_EXPIRED],
    )
    .await?;
    declare_consumer_queue(channel, wire::TICKET_QUEUE, &[wire::BOOKING_CONFIRMED]).await?;

    debug!("🐇️ Broker topology declared");
    Ok(())
}

/// Declares a durable consumer queue with its own DLQ (via the default exchange), bound to
/// the given routing keys on the bookings exchange.
async fn declare_consumer_queue(channel: &Channel, queue: &str, routing_keys: &[&str]) -> Result<(), BrokerError> {
    let dlq = format!("{queue}_dlq");
    channel.queue_declare(&dlq, durable_queue(), FieldTable::default()).await.map_err(topology_error)?;

    let mut args = FieldTable::default();
    args.insert("x-dead-letter-exchange".into(), AMQPValue::LongString("".into()));
    args.insert("x-dead-letter-routing-key".into(), AMQPValue::LongString(dlq.into()));
    channel.queue_declare(queue, durable_queue(), args).await.map_err(topology_error)?;

    for key in routing_keys {
        channel
            .queue_bind(queue, wire::BOOKINGS_EXCHANGE, key, QueueBindOptions::default(), FieldTable::default())
            .await
            .map_err(topology_error)?;
    }
    Ok(())
}

fn topology_error(e: lapin::Error) -> BrokerError {
    BrokerError::TopologyError(e.to_string())
}
