//! The broker connection manager.
//!
//! One AMQP connection per process, owned here. A background loop establishes the connection
//! and re-establishes it after a drop, with exponential backoff. Everything else in the
//! service (the relay, the expiration consumer, topology setup) borrows lightweight channels
//! off the current connection via [`ConnectionManager::get_channel`].

use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};

use lapin::{Channel, Connection, ConnectionProperties};
use log::*;
use tokio::sync::{mpsc, watch, RwLock};

use super::BrokerError;

const INITIAL_BACKOFF: Duration = Duration::from_secs(1);
const MAX_BACKOFF: Duration = Duration::from_secs(300);

#[derive(Clone)]
pub struct ConnectionManager {
    inner: Arc<Inner>,
}

struct Inner {
    url: String,
    connection: RwLock<Option<Connection>>,
    ready_tx: watch::Sender<bool>,
    done_tx: watch::Sender<bool>,
    closed: AtomicBool,
}

impl ConnectionManager {
    /// Creates the manager and starts the reconnect loop. The returned handle is cheap to
    /// clone and share between tasks.
    pub fn new(url: &str) -> Self {
        let (ready_tx, _) = watch::channel(false);
        let (done_tx, _) = watch::channel(false);
        let inner = Arc::new(Inner {
            url: url.to_string(),
            connection: RwLock::new(None),
            ready_tx,
            done_tx,
            closed: AtomicBool::new(false),
        });
        tokio::spawn(run_reconnect_loop(Arc::clone(&inner)));
        Self { inner }
    }

    /// Opens a new channel on the current connection. Fails fast when disconnected; callers
    /// retry on their own schedule instead of queueing up here.
    pub async fn get_channel(&self) -> Result<Channel, BrokerError> {
        let guard = self.inner.connection.read().await;
        match guard.as_ref() {
            Some(conn) if conn.status().connected() => {
                conn.create_channel().await.map_err(|e| BrokerError::ChannelError(e.to_string()))
            },
            _ => Err(BrokerError::NotConnected),
        }
    }

    /// Blocks until the first successful connection (and after a drop, until the next one).
    pub async fn wait_until_ready(&self) {
        let mut ready_rx = self.inner.ready_tx.subscribe();
        let _ = ready_rx.wait_for(|ready| *ready).await;
    }

    /// Single-shot shutdown: stops the reconnect loop and closes the connection. Subsequent
    /// calls are no-ops, so the signal handler and the teardown path cannot race.
    pub async fn close(&self) {
        if self.inner.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        let _ = self.inner.done_tx.send(true);
        if let Some(conn) = self.inner.connection.write().await.take() {
            info!("🐇️ Closing broker connection");
            if let Err(e) = conn.close(200, "Goodbye").await {
                error!("🐇️ Failed to close broker connection: {e}");
            }
        }
    }
}

async fn run_reconnect_loop(inner: Arc<Inner>) {
    info!("🐇️ Connection manager started");
    let mut done_rx = inner.done_tx.subscribe();
    let mut backoff = INITIAL_BACKOFF;
    loop {
        if *done_rx.borrow() {
            break;
        }
        info!("🐇️ Attempting to connect to the broker...");
        match Connection::connect(&inner.url, ConnectionProperties::default()).await {
            Ok(conn) => {
                info!("🐇️ Connection established!");
                backoff = INITIAL_BACKOFF;
                let (closed_tx, mut closed_rx) = mpsc::unbounded_channel();
                conn.on_error(move |e| {
                    let _ = closed_tx.send(e);
                });
                *inner.connection.write().await = Some(conn);
                let _ = inner.ready_tx.send(true);
                tokio::select! {
                    _ = done_rx.changed() => {
                        info!("🐇️ Connection manager stopping while connected");
                        break;
                    },
                    err = closed_rx.recv() => {
                        warn!("🐇️ Connection lost: {err:?}. Reconnecting...");
                        *inner.connection.write().await = None;
                        let _ = inner.ready_tx.send(false);
                    },
                }
            },
            Err(e) => {
                error!("🐇️ Failed to connect: {e}. Retrying in {backoff:?}");
                tokio::select! {
                    _ = done_rx.changed() => break,
                    _ = tokio::time::sleep(backoff) => {},
                }
                backoff = (backoff * 2).min(MAX_BACKOFF);
            },
        }
    }
    info!("🐇️ Connection manager stopped");
}
