use thiserror::Error;
use timer_core::ConfigError;

pub type Result<T> = std::result::Result<T, TimerError>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TimerError {
    #[error(transparent)]
    InvalidConfiguration(#[from] ConfigError),
    #[error("timer host is no longer running")]
    HostDisconnected,
}
