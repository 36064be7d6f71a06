//! Task contexts: the two loops the node runs.
//!
//! ```text
//!            core 0 (PRO)                              core 1 (APP)
//!  ┌──────────────────────────┐   Arc<PortShared>   ┌─────────────────────────┐
//!  │ NetworkContext           │ ──── frames ──────▶ │ OutputContext           │
//!  │  ArtNetNode::update()    │ ──── RDM req ─────▶ │  RdmResponder::respond  │
//!  │  send_rdm_reply()        │ ◀─── RDM reply ──── │  DmxPort::update()      │
//!  │  telemetry · persistence │ ◀─── fault/addr ─── │  fault recovery         │
//!  │  set_config()            │ ──── settings ────▶ │  responder settings     │
//!  │  ArtSync                 │ ──── flush ───────▶ │  early wake             │
//!  └──────────────────────────┘                     └─────────────────────────┘
//! ```
//!
//! Each context owns everything its loop touches; the only shared state is
//! [`PortShared`]. Both expose a `*_once` step so tests can drive them
//! without threads.

use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use log::{debug, info, warn};

use crate::adapters::time::MonotonicClock;
use crate::artnet::{ArtNetNode, PacketOutcome};
use crate::config::NodeConfig;
use crate::dmx::{
    DmxFrame, DmxPort, FrameTiming, FrameTransport, FrameWriter, PortError, PortShared,
    RdmForwarder, ResponderSettings,
};
use crate::drivers::task_pin::{Core, spawn_on_core};
use crate::drivers::watchdog::Watchdog;
use crate::error::Error;
use crate::rdm::{DeviceIdentity, RdmResponder};

use super::events::{AppEvent, NodeTelemetry};
use super::ports::{ConfigError, ConfigPort, EventSink, NetworkPort, PixelSink, RdmPacket};

/// Minimum spacing between re-initialisation attempts of a faulted port.
pub const RECOVERY_INTERVAL_US: u64 = 1_000_000;

/// Minimum spacing between config writes triggered by ArtAddress / RDM.
pub const PERSIST_INTERVAL_US: u64 = 2_000_000;

const OUTPUT_TASK_NAME: &str = "dmx_out\0";
const OUTPUT_TASK_PRIORITY: u8 = 20;
const OUTPUT_TASK_STACK_KB: usize = 8;

// ───────────────────────────────────────────────────────────────
// Output context (one per DMX port)
// ───────────────────────────────────────────────────────────────

pub struct OutputContext<T: FrameTransport, S: AsRef<PortShared>> {
    port_index: u8,
    port: DmxPort<T>,
    responder: RdmResponder,
    shared: S,
    scratch: DmxFrame,
    faulted: bool,
    next_recovery_us: u64,
    clock: MonotonicClock,
}

impl<T: FrameTransport, S: AsRef<PortShared>> OutputContext<T, S> {
    pub fn new(port_index: u8, port: DmxPort<T>, responder: RdmResponder, shared: S) -> Self {
        Self {
            port_index,
            port,
            responder,
            shared,
            scratch: DmxFrame::new(),
            faulted: false,
            next_recovery_us: 0,
            clock: MonotonicClock::new(),
        }
    }

    /// One pass: pending settings, at most one RDM exchange, then one DMX
    /// frame.
    ///
    /// Returns `true` when a frame went out.
    pub fn run_once(&mut self, events: &mut impl EventSink) -> bool {
        if let Some(settings) = self.shared.as_ref().take_settings() {
            self.apply_settings(&settings);
        }

        if self.faulted {
            self.try_recover(events);
            if self.faulted {
                return false;
            }
        }

        if let Some(request) = self.shared.as_ref().next_request() {
            self.handle_rdm(request, events);
        }

        // A sync released the held frame: it goes out on this pass.
        if self.shared.as_ref().take_flush_request() {
            debug!("OutputContext[{}]: sync flush", self.port_index);
        }
        if self.shared.as_ref().take_frame(&mut self.scratch) {
            self.port.load(&self.scratch);
        }

        match self.port.update() {
            Ok(sent) => {
                if sent {
                    self.shared.as_ref().record_frame();
                }
                sent
            }
            Err(error) => {
                self.enter_fault(error, events);
                false
            }
        }
    }

    fn handle_rdm(&mut self, request: RdmPacket, events: &mut impl EventSink) {
        let before = self.responder.identity().dmx_start_address;
        match self.responder.respond(&request.data, &mut self.port) {
            Ok(Some(response)) => {
                events.emit(&AppEvent::RdmHandled {
                    command_class: response.command_class,
                    pid: response.pid,
                    nack: response.nack,
                });
                self.shared.as_ref().push_reply(RdmPacket {
                    peer: request.peer,
                    data: response.bytes,
                });
            }
            Ok(None) => {}
            Err(error) => self.enter_fault(error, events),
        }

        let after = self.responder.identity().dmx_start_address;
        if after != before {
            self.shared.as_ref().publish_start_address(after);
        }
    }

    /// Mirror the node configuration into the responder.
    pub fn apply_settings(&mut self, settings: &ResponderSettings) {
        self.responder.set_device_info(
            &settings.manufacturer_label,
            &settings.model_description,
            &settings.device_label,
        );
        if !self.responder.set_dmx_start_address(settings.start_address) {
            warn!(
                "OutputContext[{}]: start address {} rejected",
                self.port_index, settings.start_address
            );
        }
        self.responder.enable_discovery(settings.discovery);
    }

    /// Sleep until the next frame is due, or until a sync asks for one.
    pub fn wait_for_next_frame(&self, interval: Duration) -> bool {
        self.shared.as_ref().wait_for_flush(interval)
    }

    fn enter_fault(&mut self, error: PortError, events: &mut impl EventSink) {
        if self.faulted {
            return;
        }
        self.faulted = true;
        self.next_recovery_us = self.clock.uptime_us() + RECOVERY_INTERVAL_US;
        self.shared.as_ref().set_faulted(true);
        events.emit(&AppEvent::PortFault {
            port: self.port_index,
            error,
        });
    }

    fn try_recover(&mut self, events: &mut impl EventSink) {
        let now = self.clock.uptime_us();
        if now < self.next_recovery_us {
            return;
        }
        self.next_recovery_us = now + RECOVERY_INTERVAL_US;

        let recovered = self
            .port
            .reinitialize()
            .and_then(|()| self.port.start_output());
        match recovered {
            Ok(()) => {
                self.faulted = false;
                self.shared.as_ref().set_faulted(false);
                events.emit(&AppEvent::PortRecovered {
                    port: self.port_index,
                });
            }
            Err(e) => warn!("OutputContext[{}]: recovery failed: {}", self.port_index, e),
        }
    }

    /// Skip the recovery back-off on the next pass.
    pub fn retry_now(&mut self) {
        self.next_recovery_us = 0;
    }

    pub fn is_faulted(&self) -> bool {
        self.faulted
    }

    pub fn port(&self) -> &DmxPort<T> {
        &self.port
    }

    pub fn port_mut(&mut self) -> &mut DmxPort<T> {
        &mut self.port
    }

    pub fn responder(&self) -> &RdmResponder {
        &self.responder
    }

    /// Frame loop. Never returns.
    pub fn run(mut self, interval: Duration, mut events: impl EventSink) -> ! {
        let watchdog = Watchdog::new();
        info!(
            "OutputContext[{}]: running, {}us between frames",
            self.port_index,
            interval.as_micros()
        );
        loop {
            self.run_once(&mut events);
            watchdog.feed();
            self.wait_for_next_frame(interval);
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Network context
// ───────────────────────────────────────────────────────────────

pub type SharedNode<N, P, S> = ArtNetNode<N, FrameWriter<S>, RdmForwarder<S>, P>;

pub struct NetworkContext<N: NetworkPort, P: PixelSink, S: AsRef<PortShared> + Clone> {
    node: SharedNode<N, P, S>,
    shared: S,
    /// What the responder was last told.
    published: ResponderSettings,
    saved: NodeConfig,
    last_persist_us: u64,
    clock: MonotonicClock,
}

impl<N, P, S> NetworkContext<N, P, S>
where
    N: NetworkPort,
    P: PixelSink,
    S: AsRef<PortShared> + Clone,
{
    pub fn new(network: N, pixels: P, shared: S, config: NodeConfig, mac: [u8; 6]) -> Self {
        let node = ArtNetNode::new(
            network,
            FrameWriter::new(shared.clone()),
            RdmForwarder::new(shared.clone()),
            pixels,
            config.clone(),
            mac,
        );
        Self {
            node,
            shared,
            published: ResponderSettings::from_config(&config),
            saved: config,
            last_persist_us: 0,
            clock: MonotonicClock::new(),
        }
    }

    /// Handle one datagram and drain whatever the output task posted back.
    pub fn poll_once(&mut self, events: &mut impl EventSink) -> PacketOutcome {
        let outcome = self.node.update(events);

        while let Some(reply) = self.shared.as_ref().next_reply() {
            if let Err(e) = self.node.send_rdm_reply(&reply) {
                warn!("NetworkContext: RDM reply to {} failed: {}", reply.peer, e);
            }
        }

        if let Some(start) = self.shared.as_ref().take_start_address() {
            if self.node.set_start_address(start) {
                events.emit(&AppEvent::AddressChanged(self.node.config().address));
            }
        }

        self.publish_settings();
        self.node.set_output_faulted(self.shared.as_ref().is_faulted());
        outcome
    }

    /// Validate and install a new configuration, then forward the parts
    /// the responder mirrors.
    pub fn set_config(&mut self, config: NodeConfig) -> Result<(), ConfigError> {
        self.node.set_config(config)?;
        self.publish_settings();
        Ok(())
    }

    fn publish_settings(&mut self) {
        let current = ResponderSettings::from_config(self.node.config());
        if current != self.published {
            self.shared.as_ref().publish_settings(current.clone());
            self.published = current;
        }
    }

    /// Write the config back once it has drifted from what is stored.
    ///
    /// Rate-limited so a burst of ArtAddress packets costs one flash write.
    pub fn persist_if_changed(&mut self, store: &impl ConfigPort) -> bool {
        if self.node.config() == &self.saved {
            return false;
        }
        let now = self.clock.uptime_us();
        if self.last_persist_us != 0
            && now.saturating_sub(self.last_persist_us) < PERSIST_INTERVAL_US
        {
            return false;
        }
        self.last_persist_us = now.max(1);
        match store.save(self.node.config()) {
            Ok(()) => {
                self.saved = self.node.config().clone();
                info!("NetworkContext: config persisted");
                true
            }
            Err(e) => {
                warn!("NetworkContext: config save failed: {}", e);
                false
            }
        }
    }

    pub fn telemetry(&self) -> NodeTelemetry {
        let stats = self.node.stats();
        let shared = self.shared.as_ref();
        NodeTelemetry {
            packets_received: stats.packets_received,
            dmx_packets: stats.dmx_packets,
            polls_answered: stats.polls_answered,
            rdm_forwarded: stats.rdm_forwarded,
            frames_sent: shared.frames_sent(),
            port_faulted: shared.is_faulted(),
        }
    }

    pub fn node(&self) -> &SharedNode<N, P, S> {
        &self.node
    }

    pub fn node_mut(&mut self) -> &mut SharedNode<N, P, S> {
        &mut self.node
    }

    /// Receive loop. Never returns.
    pub fn run(mut self, store: impl ConfigPort, mut events: impl EventSink) -> ! {
        let telemetry_every = u64::from(self.node.config().telemetry_interval_secs.max(1));
        let mut next_telemetry = self.clock.uptime_secs() + telemetry_every;
        loop {
            if matches!(self.poll_once(&mut events), PacketOutcome::Idle) {
                self.persist_if_changed(&store);
                std::thread::sleep(Duration::from_millis(1));
            }
            let now = self.clock.uptime_secs();
            if now >= next_telemetry {
                next_telemetry = now + telemetry_every;
                events.emit(&AppEvent::Telemetry(self.telemetry()));
            }
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Node context (wiring)
// ───────────────────────────────────────────────────────────────

/// Both contexts of a single-port node, wired to one [`PortShared`].
pub struct NodeContext<T, N, P>
where
    T: FrameTransport,
    N: NetworkPort,
    P: PixelSink,
{
    pub output: OutputContext<T, Arc<PortShared>>,
    pub network: NetworkContext<N, P, Arc<PortShared>>,
}

impl<T, N, P> NodeContext<T, N, P>
where
    T: FrameTransport,
    N: NetworkPort,
    P: PixelSink,
{
    /// Bring up the DMX port in output mode and build both contexts.
    pub fn new(
        config: &NodeConfig,
        transport: T,
        identity: DeviceIdentity,
        network: N,
        pixels: P,
        mac: [u8; 6],
    ) -> Result<Self, Error> {
        let shared = Arc::new(PortShared::new());

        let mut port = DmxPort::new(transport, FrameTiming::new(config.break_us, config.mab_us))?;
        port.start_output()?;

        let mut output =
            OutputContext::new(0, port, RdmResponder::new(identity), Arc::clone(&shared));
        output.apply_settings(&ResponderSettings::from_config(config));

        Ok(Self {
            output,
            network: NetworkContext::new(network, pixels, shared, config.clone(), mac),
        })
    }

    pub fn split(
        self,
    ) -> (
        OutputContext<T, Arc<PortShared>>,
        NetworkContext<N, P, Arc<PortShared>>,
    ) {
        (self.output, self.network)
    }
}

impl<T, N, P> NodeContext<T, N, P>
where
    T: FrameTransport + Send + 'static,
    N: NetworkPort,
    P: PixelSink,
{
    /// Start the output loop on the APP core and hand back the network
    /// context for the caller's own task.
    pub fn spawn_output(
        self,
        interval: Duration,
        events: impl EventSink + Send + 'static,
    ) -> Result<(JoinHandle<()>, NetworkContext<N, P, Arc<PortShared>>), Error> {
        let (output, network) = self.split();
        let handle = spawn_on_core(
            Core::App,
            OUTPUT_TASK_PRIORITY,
            OUTPUT_TASK_STACK_KB,
            OUTPUT_TASK_NAME,
            move || output.run(interval, events),
        )
        .map_err(|_| Error::Init("output task spawn failed"))?;
        Ok((handle, network))
    }
}
