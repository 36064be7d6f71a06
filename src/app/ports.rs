//! Port traits: the hexagonal boundary between the protocol core and the
//! outside world.
//!
//! ```text
//!   UdpNetwork ──▶ NetworkPort ──▶ ArtNetNode ──▶ DmxSink / RdmSink / PixelSink
//! ```
//!
//! The Art-Net node receives its sinks at construction and its
//! [`EventSink`] at each call site, so the protocol logic never touches
//! sockets, UARTs or flash directly.

use core::net::{Ipv4Addr, SocketAddr};

use crate::config::{MergeMode, NodeConfig};

/// Largest RDM message on the wire (255 + checksum).
pub const RDM_MAX_LEN: usize = 257;

pub type RdmBytes = heapless::Vec<u8, RDM_MAX_LEN>;

// ───────────────────────────────────────────────────────────────
// DMX sink (Art-Net → DMX512 engine)
// ───────────────────────────────────────────────────────────────

/// One ArtDmx/ArtNzs payload destined for a DMX port.
#[derive(Debug, Clone, Copy)]
pub struct DmxWrite<'a> {
    /// 15-bit Art-Net port address the payload was sent to.
    pub port_address: u16,
    /// 0-based channel the first byte of `data` lands on.
    pub first_channel: usize,
    pub start_code: u8,
    pub data: &'a [u8],
    pub merge: MergeMode,
    /// Keep the frame staged until the next ArtSync.
    pub hold_for_sync: bool,
}

pub trait DmxSink {
    fn write_dmx(&mut self, write: &DmxWrite<'_>);

    /// Output whatever is staged now (ArtSync).
    fn sync(&mut self);

    /// Zero all levels (ArtAddress clear-output command).
    fn clear(&mut self);
}

// ───────────────────────────────────────────────────────────────
// RDM sink (Art-Net → RDM responder)
// ───────────────────────────────────────────────────────────────

/// An RDM message plus the Art-Net peer it belongs to.
#[derive(Debug, Clone)]
pub struct RdmPacket {
    pub peer: SocketAddr,
    pub data: RdmBytes,
}

pub trait RdmSink {
    /// May block while the responder's queue is full.
    fn submit(&mut self, request: RdmPacket);
}

// ───────────────────────────────────────────────────────────────
// Pixel sink (Art-Net → LED strip)
// ───────────────────────────────────────────────────────────────

pub trait PixelSink {
    /// `payload` holds `length` DMX levels for `universe`.
    fn on_universe(&mut self, universe: u16, payload: &[u8], length: usize);
}

// ───────────────────────────────────────────────────────────────
// Network port (driven adapter: UDP ↔ node)
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkError {
    BindFailed,
    SendFailed,
}

impl core::fmt::Display for NetworkError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::BindFailed => write!(f, "UDP bind failed"),
            Self::SendFailed => write!(f, "UDP send failed"),
        }
    }
}

pub trait NetworkPort {
    /// Non-blocking. Copies at most one datagram into `buf`.
    fn receive(&mut self, buf: &mut [u8]) -> Option<(usize, SocketAddr)>;

    fn send_to(&mut self, data: &[u8], dest: SocketAddr) -> Result<(), NetworkError>;

    /// Address reported in ArtPollReply.
    fn local_ip(&self) -> Ipv4Addr;
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: core → logging / telemetry)
// ───────────────────────────────────────────────────────────────

/// The core emits structured [`AppEvent`](super::events::AppEvent)s
/// through this port.
pub trait EventSink {
    fn emit(&mut self, event: &super::events::AppEvent);
}

// ───────────────────────────────────────────────────────────────
// Configuration port (driven adapter: core ↔ persistent config)
// ───────────────────────────────────────────────────────────────

/// Loads and persists the node configuration.
///
/// Implementations MUST validate before persisting and reject rather than
/// clamp out-of-range values.
pub trait ConfigPort {
    /// Returns [`NodeConfig::default()`] if nothing is stored.
    fn load(&self) -> Result<NodeConfig, ConfigError>;

    fn save(&self, config: &NodeConfig) -> Result<(), ConfigError>;
}

// ───────────────────────────────────────────────────────────────
// Storage port (driven adapter: core ↔ NVS / flash)
// ───────────────────────────────────────────────────────────────

/// Namespaced key-value storage. Writes are atomic.
pub trait StoragePort {
    /// Returns the number of bytes written to `buf`.
    fn read(&self, namespace: &str, key: &str, buf: &mut [u8]) -> Result<usize, StorageError>;

    fn write(&mut self, namespace: &str, key: &str, data: &[u8]) -> Result<(), StorageError>;

    /// `Ok(())` even if the key didn't exist.
    fn delete(&mut self, namespace: &str, key: &str) -> Result<(), StorageError>;

    fn exists(&self, namespace: &str, key: &str) -> bool;
}

// ───────────────────────────────────────────────────────────────
// Error types
// ───────────────────────────────────────────────────────────────

/// Errors from [`ConfigPort`] operations.
#[derive(Debug)]
pub enum ConfigError {
    /// Stored config failed deserialization.
    Corrupted,
    /// A config field failed range validation.
    ValidationFailed(&'static str),
    /// Generic I/O error from the storage backend.
    IoError,
}

/// Errors from [`StoragePort`] operations.
#[derive(Debug)]
pub enum StorageError {
    NotFound,
    IoError,
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Corrupted => write!(f, "config corrupted"),
            Self::ValidationFailed(msg) => write!(f, "validation failed: {}", msg),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}

impl core::fmt::Display for StorageError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotFound => write!(f, "key not found"),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}
