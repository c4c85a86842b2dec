//! The outbox relay.
//!
//! Every tick, the relay claims a batch of undelivered outbox rows under row locks that
//! competing relay instances skip, publishes them with publisher confirms, and marks only the
//! acknowledged rows processed. A crash between ack and mark re-publishes the row on the next
//! tick: delivery is at-least-once and consumers dedupe through the store's status guards.

use std::time::Duration;

use booking_engine::{db_types::OutboxMessage, postgres::db::outbox, PostgresDatabase};
use lapin::{
    options::{BasicPublishOptions, ConfirmSelectOptions},
    publisher_confirm::Confirmation,
    BasicProperties, Channel,
};
use log::*;
use thiserror::Error;
use tokio::sync::watch;

use crate::rabbit::{BrokerError, ConnectionManager};

const DEFAULT_TICK_INTERVAL: Duration = Duration::from_secs(10);
const DEFAULT_BATCH_SIZE: i64 = 10;
const PUBLISH_CONFIRM_TIMEOUT: Duration = Duration::from_secs(15);
/// AMQP persistent delivery mode; messages survive a broker restart.
const PERSISTENT: u8 = 2;

pub struct OutboxWorker {
    db: PostgresDatabase,
    manager: ConnectionManager,
    tick_interval: Duration,
    batch_size: i64,
}

#[derive(Debug, Clone, Error)]
pub enum RelayError {
    #[error("{0}")]
    Broker(#[from] BrokerError),
    #[error("Database error: {0}")]
    Database(String),
    #[error("Publish failed: {0}")]
    PublishError(String),
    #[error("The broker did not confirm the publish in time")]
    ConfirmTimeout,
    #[error("The broker refused the publish")]
    Nacked,
}

impl From<sqlx::Error> for RelayError {
    fn from(e: sqlx::Error) -> Self {
        RelayError::Database(e.to_string())
    }
}

impl OutboxWorker {
    pub fn new(db: PostgresDatabase, manager: ConnectionManager) -> Self {
        Self { db, manager, tick_interval: DEFAULT_TICK_INTERVAL, batch_size: DEFAULT_BATCH_SIZE }
    }

    pub fn with_tick_interval(mut self, tick_interval: Duration) -> Self {
        self.tick_interval = tick_interval;
        self
    }

    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        info!("📮️ Outbox relay started");
        let mut ticker = tokio::time::interval(self.tick_interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        break;
                    }
                },
                _ = ticker.tick() => {
                    if let Err(e) = self.process_batch().await {
                        error!("📮️ Outbox tick failed, messages stay queued: {e}");
                    }
                },
            }
        }
        info!("📮️ Outbox relay stopped");
    }

    async fn process_batch(&self) -> Result<(), RelayError> {
        let channel = self.manager.get_channel().await?;
        channel
            .confirm_select(ConfirmSelectOptions::default())
            .await
            .map_err(|e| RelayError::PublishError(e.to_string()))?;

        let mut tx = self.db.pool().begin().await?;
        let batch = outbox::fetch_unprocessed_batch(self.batch_size, &mut tx).await?;
        if batch.is_empty() {
            return Ok(());
        }
        trace!("📮️ Claimed {} outbox messages", batch.len());

        let mut delivered = Vec::with_capacity(batch.len());
        for message in &batch {
            match publish_with_confirm(&channel, message).await {
                Ok(()) => {
                    debug!("📮️ Message {} published to {}/{}", message.id, message.exchange, message.routing_key);
                    delivered.push(message.id);
                },
                Err(e) => {
                    warn!("📮️ Message {} was not acknowledged: {e}. It stays queued", message.id);
                },
            }
        }

        if delivered.is_empty() {
            // Dropping the transaction releases the row locks without marking anything.
            return Ok(());
        }
        outbox::mark_processed(&delivered, &mut tx).await?;
        tx.commit().await?;
        debug!("📮️ Delivered {} outbox messages", delivered.len());
        Ok(())
    }
}

async fn publish_with_confirm(channel: &Channel, message: &OutboxMessage) -> Result<(), RelayError> {
    let payload = serde_json::to_vec(&message.payload).map_err(|e| RelayError::PublishError(e.to_string()))?;
    let confirm = channel
        .basic_publish(
            &message.exchange,
            &message.routing_key,
            BasicPublishOptions::default(),
            &payload,
            BasicProperties::default()
                .with_content_type("application/json".into())
                .with_delivery_mode(PERSISTENT),
        )
        .await
        .map_err(|e| RelayError::PublishError(e.to_string()))?;
    match tokio::time::timeout(PUBLISH_CONFIRM_TIMEOUT, confirm).await {
        Err(_) => Err(RelayError::ConfirmTimeout),
        Ok(Err(e)) => Err(RelayError::PublishError(e.to_string())),
        Ok(Ok(Confirmation::Ack(_))) => Ok(()),
        Ok(Ok(_)) => Err(RelayError::Nacked),
    }
}
