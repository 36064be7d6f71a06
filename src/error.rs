//! Unified error types for the node firmware.
//!
//! Start-up code funnels every failure into [`Error`]. The variants are
//! `Copy` so they can be logged and returned without allocation. Wire
//! decoding errors stay in their own modules (`wire::WireError`,
//! `rdm::RdmError`) since they never leave the protocol layer.

use core::fmt;

use crate::app::ports::{ConfigError, NetworkError};
use crate::dmx::{PortError, TransportError};

/// Every fallible start-up operation funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The DMX line could not be configured or driven.
    Transport(TransportError),
    /// A configured port refused a direction or frame operation.
    Port(PortError),
    /// The UDP socket could not be opened.
    Network(NetworkError),
    /// Configuration is invalid or could not be loaded.
    Config(&'static str),
    /// Peripheral or task initialisation failed.
    Init(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transport(e) => write!(f, "transport: {e}"),
            Self::Port(e) => write!(f, "port: {e}"),
            Self::Network(e) => write!(f, "network: {e}"),
            Self::Config(msg) => write!(f, "config: {msg}"),
            Self::Init(msg) => write!(f, "init: {msg}"),
        }
    }
}

impl std::error::Error for Error {}

impl From<TransportError> for Error {
    fn from(e: TransportError) -> Self {
        Self::Transport(e)
    }
}

impl From<PortError> for Error {
    fn from(e: PortError) -> Self {
        Self::Port(e)
    }
}

impl From<NetworkError> for Error {
    fn from(e: NetworkError) -> Self {
        Self::Network(e)
    }
}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        match e {
            ConfigError::Corrupted => Self::Config("stored config corrupted"),
            ConfigError::ValidationFailed(msg) => Self::Config(msg),
            ConfigError::IoError => Self::Config("storage I/O error"),
        }
    }
}

/// Firmware-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
