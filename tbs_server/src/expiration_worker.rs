//! Consumer of the expired-bookings queue.
//!
//! Messages arriving here are `booking.created` events whose 15-minute TTL ran out in the
//! delay queue. The worker asks the booking flow to expire each one; bookings that were
//! confirmed or cancelled in the meantime no-op inside the store, so redelivery is always
//! safe.

use std::time::Duration;

use booking_engine::{
    traits::{BookingDatabase, PaymentGateway},
    wire, BookingFlowApi,
};
use futures::StreamExt;
use lapin::{
    message::Delivery,
    options::{BasicAckOptions, BasicConsumeOptions, BasicNackOptions},
    types::FieldTable,
};
use log::*;
use tokio::sync::watch;

use crate::{data_objects::ExpiredBookingMessage, rabbit::ConnectionManager};

const CONSUMER_TAG: &str = "booking_expiration";
const RECONNECT_DELAY: Duration = Duration::from_secs(10);
/// Budget for a single expire call against the store.
const HANDLE_BUDGET: Duration = Duration::from_secs(60);

pub struct ExpirationWorker<B, G> {
    api: BookingFlowApi<B, G>,
    manager: ConnectionManager,
}

impl<B, G> ExpirationWorker<B, G>
where
    B: BookingDatabase,
    G: PaymentGateway,
{
    pub fn new(api: BookingFlowApi<B, G>, manager: ConnectionManager) -> Self {
        Self { api, manager }
    }

    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        info!("🕰️ Expiration worker started. Waiting for the broker...");
        tokio::select! {
            _ = self.manager.wait_until_ready() => {},
            _ = shutdown.changed() => {
                info!("🕰️ Expiration worker stopping before the broker came up");
                return;
            },
        }
        'outer: loop {
            if *shutdown.borrow() {
                break;
            }
            let channel = match self.manager.get_channel().await {
                Ok(channel) => channel,
                Err(e) => {
                    error!("🕰️ Failed to get a channel, retrying: {e}");
                    if pause(&mut shutdown).await {
                        break;
                    }
                    continue;
                },
            };
            let mut consumer = match channel
                .basic_consume(wire::EXPIRED_QUEUE, CONSUMER_TAG, BasicConsumeOptions::default(), FieldTable::default())
                .await
            {
                Ok(consumer) => consumer,
                Err(e) => {
                    error!("🕰️ Failed to start the consumer, retrying: {e}");
                    if pause(&mut shutdown).await {
                        break;
                    }
                    continue;
                },
            };
            info!("🕰️ Consuming {}. Waiting for messages...", wire::EXPIRED_QUEUE);

            loop {
                tokio::select! {
                    _ = shutdown.changed() => {
                        if *shutdown.borrow() {
                            break 'outer;
                        }
                    },
                    delivery = consumer.next() => {
                        match delivery {
                            None => {
                                warn!("🕰️ Delivery stream closed by the broker. Reconnecting...");
                                break;
                            },
                            Some(Err(e)) => {
                                warn!("🕰️ Consumer error: {e}. Reconnecting...");
                                break;
                            },
                            Some(Ok(delivery)) => self.handle_delivery(delivery).await,
                        }
                    },
                }
            }
            if pause(&mut shutdown).await {
                break;
            }
        }
        info!("🕰️ Expiration worker stopped");
    }

    async fn handle_delivery(&self, delivery: Delivery) {
        let message: ExpiredBookingMessage = match serde_json::from_slice(&delivery.data) {
            Ok(message) => message,
            Err(e) => {
                // Poison message: without requeue it dead-letters instead of looping forever.
                error!("🕰️ Could not parse expiration message, discarding: {e}");
                nack(delivery, false).await;
                return;
            },
        };
        let booking_id = message.booking_id;
        debug!("🕰️ Booking {booking_id} reached the end of its payment window");
        match tokio::time::timeout(HANDLE_BUDGET, self.api.expire_booking(booking_id)).await {
            Ok(Ok(())) => {
                info!("🕰️ Booking {booking_id} expiry handled");
                if let Err(e) = delivery.ack(BasicAckOptions::default()).await {
                    error!("🕰️ Failed to acknowledge message for booking {booking_id}: {e}");
                }
            },
            Ok(Err(e)) => {
                error!("🕰️ Failed to expire booking {booking_id}, requeueing: {e}");
                nack(delivery, true).await;
            },
            Err(_) => {
                error!("🕰️ Expiring booking {booking_id} timed out, requeueing");
                nack(delivery, true).await;
            },
        }
    }
}

async fn nack(delivery: Delivery, requeue: bool) {
    if let Err(e) = delivery.nack(BasicNackOptions { requeue, ..Default::default() }).await {
        error!("🕰️ Failed to negative-acknowledge message: {e}");
    }
}

/// Sleeps between reconnect attempts. Returns `true` when shutdown fired during the pause.
async fn pause(shutdown: &mut watch::Receiver<bool>) -> bool {
    tokio::select! {
        _ = shutdown.changed() => *shutdown.borrow(),
        _ = tokio::time::sleep(RECONNECT_DELAY) => false,
    }
}
