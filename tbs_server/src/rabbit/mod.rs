mod manager;
mod topology;

use thiserror::Error;

pub use manager::ConnectionManager;
pub use topology::declare_topology;

#[derive(Debug, Clone, Error)]
pub enum BrokerError {
    #[error("The broker connection is not established")]
    NotConnected,
    #[error("Could not open a channel: {0}")]
    ChannelError(String),
    #[error("Could not declare the broker topology: {0}")]
    TopologyError(String),
}
