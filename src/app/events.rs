//! Outbound application events.
//!
//! The node and the port tasks emit these through the
//! [`EventSink`](super::ports::EventSink) port. Adapters on the other side
//! decide what to do with them.

use crate::config::{MergeMode, NodeAddress};
use crate::dmx::PortError;
use crate::rdm::Uid;

/// Structured events emitted by the application core.
#[derive(Debug, Clone)]
pub enum AppEvent {
    /// Node is up and listening.
    Started { uid: Uid, port_address: u16 },

    /// ArtAddress or local config changed the addressing.
    AddressChanged(NodeAddress),

    MergeModeChanged(MergeMode),

    /// ArtAddress asked for all outputs to be zeroed.
    OutputCleared,

    SyncReceived,

    /// A transport fault disabled a DMX port.
    PortFault { port: u8, error: PortError },

    /// A previously faulted port is transmitting again.
    PortRecovered { port: u8 },

    /// The responder answered an RDM request.
    RdmHandled {
        command_class: u8,
        pid: u16,
        nack: bool,
    },

    /// Periodic counters.
    Telemetry(NodeTelemetry),
}

/// A point-in-time snapshot suitable for logging or transmission.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NodeTelemetry {
    pub packets_received: u32,
    pub dmx_packets: u32,
    pub polls_answered: u32,
    pub rdm_forwarded: u32,
    pub frames_sent: u32,
    pub port_faulted: bool,
}
