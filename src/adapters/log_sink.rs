//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing structured application events to
//! the ESP-IDF logger (UART / USB-CDC in production).

use log::{info, warn};

use crate::app::events::AppEvent;
use crate::app::ports::EventSink;

/// Adapter that logs every [`AppEvent`] to the serial console.
#[derive(Debug, Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        match event {
            AppEvent::Telemetry(t) => {
                info!(
                    "TELEM | rx={} dmx={} polls={} rdm={} | frames={} | port={}",
                    t.packets_received,
                    t.dmx_packets,
                    t.polls_answered,
                    t.rdm_forwarded,
                    t.frames_sent,
                    if t.port_faulted { "FAULT" } else { "OK" },
                );
            }
            AppEvent::Started { uid, port_address } => {
                info!("START | uid={} port_address={:#06x}", uid, port_address);
            }
            AppEvent::AddressChanged(a) => {
                info!(
                    "ADDR  | net={} subnet={} universe={} start={}",
                    a.net, a.subnet, a.universe, a.start_address
                );
            }
            AppEvent::MergeModeChanged(mode) => info!("MERGE | {:?}", mode),
            AppEvent::OutputCleared => info!("DMX   | output cleared"),
            AppEvent::SyncReceived => log::debug!("SYNC"),
            AppEvent::PortFault { port, error } => {
                warn!("FAULT | port {} disabled: {}", port, error);
            }
            AppEvent::PortRecovered { port } => info!("FAULT | port {} recovered", port),
            AppEvent::RdmHandled {
                command_class,
                pid,
                nack,
            } => {
                info!(
                    "RDM   | cc={:#04x} pid={:#06x} {}",
                    command_class,
                    pid,
                    if *nack { "NACK" } else { "ACK" }
                );
            }
        }
    }
}
