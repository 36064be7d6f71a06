//! Mock adapters and packet builders for integration tests.
//!
//! Every mock records what it saw so tests can assert on the full history
//! without a UART, a socket or flash.

#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::net::{Ipv4Addr, SocketAddr};

use artnode::app::events::AppEvent;
use artnode::app::ports::{
    ConfigError, ConfigPort, EventSink, NetworkError, NetworkPort, PixelSink, StorageError,
    StoragePort,
};
use artnode::artnet::layout::{
    AC_NONE, OP_ADDRESS, OP_DMX, OP_NZS, OP_POLL, OP_RDM, OP_SYNC, PROTOCOL_VERSION,
};
use artnode::config::NodeConfig;
use artnode::dmx::{FrameTransport, LineDirection, TransportError};
use artnode::rdm::Uid;
use artnode::rdm::checksum;

pub const NODE_IP: Ipv4Addr = Ipv4Addr::new(10, 0, 0, 5);
pub const CONTROLLER: [u8; 6] = [0x45, 0x4E, 0, 0, 0, 1];
pub const NODE_MAC: [u8; 6] = [0xDE, 0xAD, 0xBE, 0xEF, 0xCA, 0xFE];

pub fn controller(last: u8) -> SocketAddr {
    SocketAddr::from((Ipv4Addr::new(10, 0, 0, last), 6454))
}

pub fn node_uid() -> Uid {
    Uid::from_mac(&NODE_MAC)
}

// ── Network ───────────────────────────────────────────────────

#[derive(Default)]
pub struct MockNet {
    pub inbox: VecDeque<(Vec<u8>, SocketAddr)>,
    pub sent: Vec<(Vec<u8>, SocketAddr)>,
    pub fail_sends: bool,
}

impl MockNet {
    pub fn push(&mut self, datagram: Vec<u8>, from: SocketAddr) {
        self.inbox.push_back((datagram, from));
    }
}

impl NetworkPort for MockNet {
    fn receive(&mut self, buf: &mut [u8]) -> Option<(usize, SocketAddr)> {
        let (data, peer) = self.inbox.pop_front()?;
        let n = data.len().min(buf.len());
        buf[..n].copy_from_slice(&data[..n]);
        Some((n, peer))
    }

    fn send_to(&mut self, data: &[u8], dest: SocketAddr) -> Result<(), NetworkError> {
        if self.fail_sends {
            return Err(NetworkError::SendFailed);
        }
        self.sent.push((data.to_vec(), dest));
        Ok(())
    }

    fn local_ip(&self) -> Ipv4Addr {
        NODE_IP
    }
}

// ── DMX line ──────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineOp {
    Break(u32),
    Mark(u32),
    Bytes(Vec<u8>),
    Baud(u32),
    Direction(LineDirection),
    Drain,
}

#[derive(Default)]
pub struct MockLine {
    pub ops: Vec<LineOp>,
    pub fail_writes: bool,
}

impl MockLine {
    /// Every 513-byte DMX frame written so far.
    pub fn frames(&self) -> Vec<&[u8]> {
        self.ops
            .iter()
            .filter_map(|op| match op {
                LineOp::Bytes(b) if b.len() == 513 => Some(b.as_slice()),
                _ => None,
            })
            .collect()
    }

    /// Writes that were not DMX frames (RDM replies).
    pub fn rdm_writes(&self) -> Vec<&[u8]> {
        self.ops
            .iter()
            .filter_map(|op| match op {
                LineOp::Bytes(b) if b.len() != 513 => Some(b.as_slice()),
                _ => None,
            })
            .collect()
    }
}

impl FrameTransport for MockLine {
    fn send_break(&mut self, us: u32) -> Result<(), TransportError> {
        self.ops.push(LineOp::Break(us));
        Ok(())
    }

    fn send_mark(&mut self, us: u32) -> Result<(), TransportError> {
        self.ops.push(LineOp::Mark(us));
        Ok(())
    }

    fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), TransportError> {
        if self.fail_writes {
            return Err(TransportError::WriteFailed);
        }
        self.ops.push(LineOp::Bytes(bytes.to_vec()));
        Ok(())
    }

    fn wait_tx_done(&mut self) -> Result<(), TransportError> {
        self.ops.push(LineOp::Drain);
        Ok(())
    }

    fn set_baud_rate(&mut self, baud: u32) -> Result<(), TransportError> {
        self.ops.push(LineOp::Baud(baud));
        Ok(())
    }

    fn set_line_direction(&mut self, direction: LineDirection) -> Result<(), TransportError> {
        self.ops.push(LineOp::Direction(direction));
        Ok(())
    }
}

// ── Pixels ────────────────────────────────────────────────────

#[derive(Default)]
pub struct MockPixels {
    pub calls: Vec<(u16, Vec<u8>, usize)>,
}

impl PixelSink for MockPixels {
    fn on_universe(&mut self, universe: u16, payload: &[u8], length: usize) {
        self.calls.push((universe, payload.to_vec(), length));
    }
}

// ── Events ────────────────────────────────────────────────────

#[derive(Default)]
pub struct LogSink {
    pub events: Vec<AppEvent>,
}

impl LogSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self, pred: impl Fn(&AppEvent) -> bool) -> usize {
        self.events.iter().filter(|e| pred(e)).count()
    }
}

impl EventSink for LogSink {
    fn emit(&mut self, event: &AppEvent) {
        self.events.push(event.clone());
    }
}

// ── Storage ───────────────────────────────────────────────────

#[derive(Default)]
pub struct MockNvs {
    pub data: HashMap<String, Vec<u8>>,
    pub config: RefCell<Option<NodeConfig>>,
    pub saves: RefCell<u32>,
}

impl MockNvs {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StoragePort for MockNvs {
    fn read(&self, namespace: &str, key: &str, buf: &mut [u8]) -> Result<usize, StorageError> {
        let v = self
            .data
            .get(&format!("{namespace}::{key}"))
            .ok_or(StorageError::NotFound)?;
        let n = v.len().min(buf.len());
        buf[..n].copy_from_slice(&v[..n]);
        Ok(n)
    }

    fn write(&mut self, namespace: &str, key: &str, data: &[u8]) -> Result<(), StorageError> {
        self.data.insert(format!("{namespace}::{key}"), data.to_vec());
        Ok(())
    }

    fn delete(&mut self, namespace: &str, key: &str) -> Result<(), StorageError> {
        self.data.remove(&format!("{namespace}::{key}"));
        Ok(())
    }

    fn exists(&self, namespace: &str, key: &str) -> bool {
        self.data.contains_key(&format!("{namespace}::{key}"))
    }
}

impl ConfigPort for MockNvs {
    fn load(&self) -> Result<NodeConfig, ConfigError> {
        Ok(self.config.borrow().clone().unwrap_or_default())
    }

    fn save(&self, config: &NodeConfig) -> Result<(), ConfigError> {
        config.validate().map_err(ConfigError::ValidationFailed)?;
        *self.config.borrow_mut() = Some(config.clone());
        *self.saves.borrow_mut() += 1;
        Ok(())
    }
}

// ── Art-Net packet builders ───────────────────────────────────

fn header(opcode: u16) -> Vec<u8> {
    let mut p = b"Art-Net\0".to_vec();
    p.extend_from_slice(&opcode.to_le_bytes());
    p.extend_from_slice(&PROTOCOL_VERSION.to_be_bytes());
    p
}

pub fn art_poll() -> Vec<u8> {
    let mut p = header(OP_POLL);
    p.extend_from_slice(&[0, 0]);
    p
}

pub fn art_dmx(sub_uni: u8, net: u8, data: &[u8]) -> Vec<u8> {
    art_dmx_seq(1, sub_uni, net, data)
}

pub fn art_dmx_seq(sequence: u8, sub_uni: u8, net: u8, data: &[u8]) -> Vec<u8> {
    let mut p = header(OP_DMX);
    p.extend_from_slice(&[sequence, 0, sub_uni, net]);
    p.extend_from_slice(&(data.len() as u16).to_be_bytes());
    p.extend_from_slice(data);
    p
}

pub fn art_nzs(start_code: u8, sub_uni: u8, data: &[u8]) -> Vec<u8> {
    let mut p = header(OP_NZS);
    p.extend_from_slice(&[1, start_code, sub_uni, 0]);
    p.extend_from_slice(&(data.len() as u16).to_be_bytes());
    p.extend_from_slice(data);
    p
}

pub fn art_address(net: u8, subnet: u8, universe: u8, command: u8) -> Vec<u8> {
    let mut p = header(OP_ADDRESS);
    p.extend_from_slice(&[net, subnet, universe, command]);
    p
}

pub fn art_address_none(net: u8, subnet: u8, universe: u8) -> Vec<u8> {
    art_address(net, subnet, universe, AC_NONE)
}

pub fn art_sync() -> Vec<u8> {
    let mut p = header(OP_SYNC);
    p.extend_from_slice(&[0, 0]);
    p
}

pub fn art_rdm(payload: &[u8]) -> Vec<u8> {
    let mut p = header(OP_RDM);
    p.extend_from_slice(&[1, 0]);
    p.extend_from_slice(payload);
    p
}

// ── RDM request builder ───────────────────────────────────────

pub fn rdm_request(cc: u8, pid: u16, dest: Uid, data: &[u8]) -> Vec<u8> {
    let mut m = vec![0u8; 24];
    m[0] = 0xCC;
    m[1] = 0x01;
    m[2] = (24 + data.len()) as u8;
    m[3..9].copy_from_slice(dest.as_bytes());
    m[9..15].copy_from_slice(&CONTROLLER);
    m[15] = 7;
    m[16] = 1;
    m[20] = cc;
    m[21..23].copy_from_slice(&pid.to_be_bytes());
    m[23] = data.len() as u8;
    m.extend_from_slice(data);
    let sum = checksum(&m);
    m.extend_from_slice(&sum.to_be_bytes());
    m
}

/// Parameter data of a framed RDM reply.
pub fn reply_data(reply: &[u8]) -> &[u8] {
    let pdl = reply[23] as usize;
    &reply[24..24 + pdl]
}
