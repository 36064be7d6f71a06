//! The Art-Net node: one datagram in, sink calls and replies out.
//!
//! ```text
//!   NetworkPort ──receive──▶ parse ──▶ OpPoll    ──▶ ArtPollReply (unicast)
//!                                 ├─▶ OpDmx/Nzs ──▶ DmxSink + PixelSink
//!                                 ├─▶ OpAddress ──▶ config + status
//!                                 ├─▶ OpRdm     ──▶ RdmSink
//!                                 └─▶ OpSync    ──▶ DmxSink::sync (sync mode)
//! ```
//!
//! Each call to [`ArtNetNode::update`] handles at most one datagram. A
//! datagram without the Art-Net ID leaves the node untouched: no counters,
//! no replies, no sink calls.

use core::net::{IpAddr, SocketAddr};
use core::time::Duration;

use burster::Limiter;
use log::{debug, info, warn};

use crate::adapters::time::platform_now;
use crate::app::events::AppEvent;
use crate::app::ports::{
    ConfigError, DmxSink, DmxWrite, EventSink, NetworkError, NetworkPort, PixelSink, RDM_MAX_LEN,
    RdmBytes, RdmPacket, RdmSink,
};
use crate::config::{MergeMode, NodeConfig};
use crate::rdm::layout::SC_RDM;

use super::layout::*;
use super::packet::{self, ArtAddress, ArtDmx, ArtPacket, DropReason};
use super::poll_reply::{self, ReportCode};
use super::status::{ArtNetStatus, OutputHealth};

/// Sources remembered for the merging indicator.
pub const MAX_SOURCES: usize = 2;

/// RDM standard version carried in ArtRdm.
const RDM_VERSION: u8 = 0x01;

/// What [`ArtNetNode::update`] did with the datagram it read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketOutcome {
    /// Nothing was pending.
    Idle,
    Dropped(DropReason),
    /// ArtDmx/ArtNzs for another universe, or RDM while RDM is off.
    Ignored(u16),
    /// ArtPoll over the reply budget.
    RateLimited,
    Handled(u16),
}

/// Running counters for telemetry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NodeStats {
    pub packets_received: u32,
    pub dmx_packets: u32,
    pub polls_answered: u32,
    pub polls_limited: u32,
    pub rdm_forwarded: u32,
    pub rdm_replies: u32,
    /// Art-Net packets too short for their opcode.
    pub parse_failures: u32,
}

pub struct ArtNetNode<N, D, R, P>
where
    N: NetworkPort,
    D: DmxSink,
    R: RdmSink,
    P: PixelSink,
{
    network: N,
    dmx: D,
    rdm: R,
    pixels: P,
    config: NodeConfig,
    status: ArtNetStatus,
    poll_limiter: burster::TokenBucket<fn() -> Duration>,
    sources: [Option<IpAddr>; MAX_SOURCES],
    sync_received: bool,
    dmx_seen: bool,
    output_faulted: bool,
    /// A parse failure is waiting to be reported in the next poll reply.
    parse_failed: bool,
    stats: NodeStats,
    buf: Vec<u8>,
}

impl<N, D, R, P> ArtNetNode<N, D, R, P>
where
    N: NetworkPort,
    D: DmxSink,
    R: RdmSink,
    P: PixelSink,
{
    pub fn new(network: N, dmx: D, rdm: R, pixels: P, config: NodeConfig, mac: [u8; 6]) -> Self {
        let status = ArtNetStatus::new(network.local_ip(), mac);
        let mut node = Self {
            network,
            dmx,
            rdm,
            pixels,
            poll_limiter: poll_limiter(config.poll_reply_rate),
            config,
            status,
            sources: [None; MAX_SOURCES],
            sync_received: false,
            dmx_seen: false,
            output_faulted: false,
            parse_failed: false,
            stats: NodeStats::default(),
            buf: vec![0; MAX_PACKET_LEN],
        };
        node.refresh_status();
        node
    }

    /// Read and handle at most one datagram. Never blocks.
    pub fn update(&mut self, events: &mut impl EventSink) -> PacketOutcome {
        let Some((len, peer)) = self.network.receive(&mut self.buf) else {
            return PacketOutcome::Idle;
        };
        let len = len.min(self.buf.len());

        // Handlers need `&mut self` while the packet borrows the buffer.
        let buf = core::mem::take(&mut self.buf);
        let outcome = match packet::parse(&buf[..len]) {
            Ok(packet) => {
                self.stats.packets_received = self.stats.packets_received.wrapping_add(1);
                self.dispatch(packet, peer, events)
            }
            Err(reason) => {
                debug!("ArtNet: dropped {} bytes from {}: {}", len, peer, reason);
                if matches!(reason, DropReason::Truncated { .. }) {
                    self.stats.parse_failures = self.stats.parse_failures.wrapping_add(1);
                    self.parse_failed = true;
                }
                PacketOutcome::Dropped(reason)
            }
        };
        self.buf = buf;
        outcome
    }

    fn dispatch(
        &mut self,
        packet: ArtPacket<'_>,
        peer: SocketAddr,
        events: &mut impl EventSink,
    ) -> PacketOutcome {
        match packet {
            ArtPacket::Poll => self.on_poll(peer),
            ArtPacket::Dmx(dmx) => self.on_dmx(&dmx, peer),
            ArtPacket::Address(address) => self.on_address(&address, events),
            ArtPacket::Rdm { opcode, payload } => self.on_rdm(opcode, payload, peer),
            ArtPacket::Sync => {
                self.sync_received = true;
                if self.config.sync_mode {
                    self.dmx.sync();
                }
                events.emit(&AppEvent::SyncReceived);
                PacketOutcome::Handled(OP_SYNC)
            }
            ArtPacket::Other(opcode) => {
                debug!(
                    "ArtNet: {} ({:#06x}) from {} not handled",
                    packet::opcode_name(opcode),
                    opcode,
                    peer
                );
                PacketOutcome::Ignored(opcode)
            }
        }
    }

    // ── Opcode handlers ───────────────────────────────────────

    fn on_poll(&mut self, peer: SocketAddr) -> PacketOutcome {
        if self.poll_limiter.try_consume(1).is_err() {
            self.stats.polls_limited = self.stats.polls_limited.wrapping_add(1);
            return PacketOutcome::RateLimited;
        }

        self.status.ip = self.network.local_ip();
        let counter = self.stats.polls_answered.wrapping_add(1) as u16;
        let report = if self.output_faulted {
            poll_reply::node_report(ReportCode::OutputFault, counter, "DMX output faulted")
        } else if core::mem::take(&mut self.parse_failed) {
            poll_reply::node_report(ReportCode::ParseFail, counter, "Packet parse failed")
        } else {
            poll_reply::node_report(ReportCode::PowerOk, counter, "DMX output OK")
        };
        let reply = poll_reply::build(&self.config, &self.status, &report);

        match self.network.send_to(&reply, peer) {
            Ok(()) => {
                self.stats.polls_answered = self.stats.polls_answered.wrapping_add(1);
            }
            Err(e) => warn!("ArtNet: poll reply to {} failed: {}", peer, e),
        }
        PacketOutcome::Handled(OP_POLL)
    }

    fn on_dmx(&mut self, dmx: &ArtDmx<'_>, peer: SocketAddr) -> PacketOutcome {
        let opcode = if dmx.start_code == 0 { OP_DMX } else { OP_NZS };
        let address = self.config.address;
        if dmx.start_code == SC_RDM {
            // RDM never travels in ArtNzs.
            return PacketOutcome::Ignored(opcode);
        }
        if dmx.subnet != address.subnet || dmx.universe != address.universe {
            return PacketOutcome::Ignored(opcode);
        }

        self.stats.dmx_packets = self.stats.dmx_packets.wrapping_add(1);
        let newly_merging = self.track_source(peer.ip());

        self.dmx.write_dmx(&DmxWrite {
            port_address: address.port_address(),
            first_channel: address.first_channel(),
            start_code: dmx.start_code,
            data: dmx.data,
            merge: self.config.merge_mode,
            hold_for_sync: self.config.sync_mode,
        });

        if dmx.start_code == 0 && self.config.pixels_enabled {
            self.pixels
                .on_universe(u16::from(dmx.universe), dmx.data, dmx.data.len());
        }

        if !self.dmx_seen || newly_merging {
            self.dmx_seen = true;
            self.refresh_status();
        }
        PacketOutcome::Handled(opcode)
    }

    fn on_address(&mut self, a: &ArtAddress, events: &mut impl EventSink) -> PacketOutcome {
        let mut address = self.config.address;
        if let Some(net) = a.net {
            address.net = net & 0x7F;
        }
        if let Some(subnet) = a.subnet {
            address.subnet = subnet & 0x0F;
        }
        if let Some(universe) = a.universe {
            address.universe = universe & 0x0F;
        }
        if address != self.config.address {
            info!(
                "ArtNet: address {}.{}.{} -> {}.{}.{}",
                self.config.address.net,
                self.config.address.subnet,
                self.config.address.universe,
                address.net,
                address.subnet,
                address.universe
            );
            self.config.address = address;
            events.emit(&AppEvent::AddressChanged(address));
        }

        match a.command {
            AC_NONE => {}
            AC_CANCEL_MERGE => self.sources = [None; MAX_SOURCES],
            AC_MERGE_LTP => self.set_merge_mode(MergeMode::Ltp, events),
            AC_MERGE_HTP => self.set_merge_mode(MergeMode::Htp, events),
            AC_CLEAR_OUTPUT => {
                self.dmx.clear();
                events.emit(&AppEvent::OutputCleared);
            }
            other => debug!("ArtNet: ArtAddress command {:#04x} not supported", other),
        }

        self.refresh_status();
        PacketOutcome::Handled(OP_ADDRESS)
    }

    fn on_rdm(&mut self, opcode: u16, payload: &[u8], peer: SocketAddr) -> PacketOutcome {
        if !self.config.rdm_enabled {
            return PacketOutcome::Ignored(opcode);
        }
        let Ok(data) = RdmBytes::from_slice(payload) else {
            debug!(
                "ArtNet: RDM payload of {} bytes exceeds {}",
                payload.len(),
                RDM_MAX_LEN
            );
            return PacketOutcome::Ignored(opcode);
        };
        self.rdm.submit(RdmPacket { peer, data });
        self.stats.rdm_forwarded = self.stats.rdm_forwarded.wrapping_add(1);
        PacketOutcome::Handled(opcode)
    }

    // ── Outbound RDM ──────────────────────────────────────────

    /// Wrap a responder reply in ArtRdm and send it to the requesting peer.
    pub fn send_rdm_reply(&mut self, reply: &RdmPacket) -> Result<(), NetworkError> {
        let mut out: heapless::Vec<u8, { RDM_PAYLOAD_OFFSET + RDM_MAX_LEN }> =
            heapless::Vec::new();
        let mut header = [0u8; RDM_PAYLOAD_OFFSET];
        packet::write_header(&mut header, OP_RDM);
        header[10..12].copy_from_slice(&PROTOCOL_VERSION.to_be_bytes());
        header[12] = RDM_VERSION;
        header[13] = self.config.address.net;
        // Both parts are bounded by the vector's capacity.
        let _ = out.extend_from_slice(&header);
        let _ = out.extend_from_slice(&reply.data);

        self.network.send_to(&out, reply.peer)?;
        self.stats.rdm_replies = self.stats.rdm_replies.wrapping_add(1);
        Ok(())
    }

    // ── Configuration ─────────────────────────────────────────

    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    /// Replace the whole configuration snapshot. An invalid config is
    /// rejected and the current one kept.
    pub fn set_config(&mut self, config: NodeConfig) -> Result<(), ConfigError> {
        config.validate().map_err(ConfigError::ValidationFailed)?;
        if config.poll_reply_rate != self.config.poll_reply_rate {
            self.poll_limiter = poll_limiter(config.poll_reply_rate);
        }
        self.config = config;
        self.refresh_status();
        Ok(())
    }

    /// Apply a DMX start address set over RDM. Returns `false` when out of range.
    pub fn set_start_address(&mut self, start_address: u16) -> bool {
        if !(1..=512).contains(&start_address) {
            return false;
        }
        self.config.address.start_address = start_address;
        true
    }

    fn set_merge_mode(&mut self, mode: MergeMode, events: &mut impl EventSink) {
        if self.config.merge_mode != mode {
            self.config.merge_mode = mode;
            events.emit(&AppEvent::MergeModeChanged(mode));
        }
    }

    // ── Status ────────────────────────────────────────────────

    pub fn status(&self) -> &ArtNetStatus {
        &self.status
    }

    pub fn stats(&self) -> NodeStats {
        self.stats
    }

    /// True once any ArtSync has arrived.
    pub fn sync_received(&self) -> bool {
        self.sync_received
    }

    pub fn is_merging(&self) -> bool {
        self.sources.iter().all(Option::is_some)
    }

    /// Reflect the output task's health in the next poll reply.
    pub fn set_output_faulted(&mut self, faulted: bool) {
        if self.output_faulted != faulted {
            self.output_faulted = faulted;
            self.refresh_status();
        }
    }

    pub fn network(&self) -> &N {
        &self.network
    }

    pub fn network_mut(&mut self) -> &mut N {
        &mut self.network
    }

    pub fn pixels(&self) -> &P {
        &self.pixels
    }

    pub fn pixels_mut(&mut self) -> &mut P {
        &mut self.pixels
    }

    fn refresh_status(&mut self) {
        let health = OutputHealth {
            transmitting: self.dmx_seen && !self.output_faulted,
            merging: self.is_merging(),
        };
        self.status.recompute(&self.config, health);
    }

    /// Remember `ip` as a source. Returns `true` if this made the node
    /// start merging.
    fn track_source(&mut self, ip: IpAddr) -> bool {
        if self.sources.contains(&Some(ip)) {
            return false;
        }
        let was_merging = self.is_merging();
        match self.sources.iter_mut().find(|s| s.is_none()) {
            Some(slot) => *slot = Some(ip),
            // Table full: the newest source replaces the older one.
            None => {
                self.sources.rotate_left(1);
                self.sources[MAX_SOURCES - 1] = Some(ip);
            }
        }
        !was_merging && self.is_merging()
    }
}

fn poll_limiter(rate: u32) -> burster::TokenBucket<fn() -> Duration> {
    burster::TokenBucket::new_with_time_provider(
        rate.into(),
        rate.into(),
        platform_now as fn() -> Duration,
    )
}
