pub mod event;
pub mod settings;

pub use event::{Entity, EventContext};
pub use settings::{Config, TriggerConfig, WorkloadConfig};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Required environment variable {0} is not set")]
    Missing(&'static str),

    #[error("Invalid config value: {0}")]
    InvalidValue(String),

    #[error("Failed to read event payload: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse event payload: {0}")]
    InvalidEvent(#[from] serde_json::Error),
}
