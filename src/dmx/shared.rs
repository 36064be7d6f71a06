//! State shared between the network task and a port's output task.
//!
//! ```text
//!  network task                     PortShared                   DMX task
//!  ─────────────                    ──────────                   ────────
//!  FrameWriter ── stage() ───▶ [staged frame | dirty | held] ──▶ take_frame()
//!  RdmForwarder ─ submit ───▶ [rdm_requests  (bounded)]     ──▶ next_request()
//!  poll replies ◀─────────── [rdm_replies   (bounded)]     ◀── push_reply()
//!  on sync ───── release() ─▶ flush signal                  ──▶ wait_for_flush()
//!  node config ◀──────────── [start_address]               ◀── publish_start_address()
//!  node config ── publish ──▶ [responder settings]          ──▶ take_settings()
//! ```
//!
//! The staged frame lives behind a critical-section mutex and is only ever
//! touched for one copy at a time. The DMX task owns the authoritative
//! frame inside its [`DmxPort`](super::engine::DmxPort); it pulls the staged
//! copy between frames, so a frame is never torn mid-transmission.

use core::cell::RefCell;
use core::sync::atomic::{AtomicBool, AtomicU16, AtomicU32, Ordering};
use std::time::{Duration, Instant};

use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use embassy_sync::signal::Signal;
use log::{debug, warn};

use crate::app::ports::{DmxSink, DmxWrite, RdmPacket, RdmSink};
use crate::config::{MergeMode, NodeConfig};

use super::frame::DmxFrame;

/// Pending RDM requests per port. A full queue blocks the submitter.
pub const RDM_QUEUE_DEPTH: usize = 4;

/// Granularity of [`PortShared::wait_for_flush`]. One FreeRTOS tick.
const FLUSH_POLL: Duration = Duration::from_millis(1);

/// The parts of [`NodeConfig`] the RDM responder mirrors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponderSettings {
    pub start_address: u16,
    pub manufacturer_label: String,
    pub model_description: String,
    pub device_label: String,
    pub discovery: bool,
}

impl ResponderSettings {
    pub fn from_config(config: &NodeConfig) -> Self {
        Self {
            start_address: config.address.start_address,
            manufacturer_label: config.manufacturer_label.clone(),
            model_description: config.model_description.clone(),
            device_label: config.device_label.clone(),
            discovery: config.rdm_enabled,
        }
    }
}

struct Staging {
    frame: DmxFrame,
    /// Written since the output task last took a copy.
    dirty: bool,
    /// Held back until the next ArtSync.
    held: bool,
}

pub struct PortShared {
    staging: Mutex<CriticalSectionRawMutex, RefCell<Staging>>,
    rdm_requests: Channel<CriticalSectionRawMutex, RdmPacket, RDM_QUEUE_DEPTH>,
    rdm_replies: Channel<CriticalSectionRawMutex, RdmPacket, RDM_QUEUE_DEPTH>,
    flush: Signal<CriticalSectionRawMutex, ()>,
    faulted: AtomicBool,
    frames_sent: AtomicU32,
    /// DMX start address set over RDM, 0 when nothing is pending.
    start_address: AtomicU16,
    /// Latest config the responder has not picked up yet.
    settings: Mutex<CriticalSectionRawMutex, RefCell<Option<ResponderSettings>>>,
}

impl Default for PortShared {
    fn default() -> Self {
        Self::new()
    }
}

impl AsRef<PortShared> for PortShared {
    fn as_ref(&self) -> &PortShared {
        self
    }
}

impl PortShared {
    pub const fn new() -> Self {
        Self {
            staging: Mutex::new(RefCell::new(Staging {
                frame: DmxFrame::new(),
                dirty: false,
                held: false,
            })),
            rdm_requests: Channel::new(),
            rdm_replies: Channel::new(),
            flush: Signal::new(),
            faulted: AtomicBool::new(false),
            frames_sent: AtomicU32::new(0),
            start_address: AtomicU16::new(0),
            settings: Mutex::new(RefCell::new(None)),
        }
    }

    // ── Frame staging ─────────────────────────────────────────

    /// Merge a payload into the staged frame. Returns channels written.
    ///
    /// HTP keeps the per-channel maximum of everything staged since the
    /// output task last took a copy; LTP overwrites.
    pub fn stage(&self, write: &DmxWrite<'_>) -> usize {
        self.staging.lock(|cell| {
            let mut s = cell.borrow_mut();
            let n = match write.merge {
                MergeMode::Htp if s.dirty => {
                    s.frame.merge_channels_htp(write.first_channel, write.data)
                }
                _ => s.frame.write_channels(write.first_channel, write.data),
            };
            s.frame.set_start_code(write.start_code);
            s.dirty = true;
            s.held |= write.hold_for_sync;
            n
        })
    }

    /// Release a held frame and ask the output task to send it now.
    pub fn release(&self) {
        self.staging.lock(|cell| cell.borrow_mut().held = false);
        self.flush.signal(());
    }

    /// Zero every staged level and mark the frame for output.
    pub fn clear(&self) {
        self.staging.lock(|cell| {
            let mut s = cell.borrow_mut();
            s.frame.clear_channels();
            s.dirty = true;
        });
    }

    /// Copy the staged frame into `out` if it changed and is not held.
    pub fn take_frame(&self, out: &mut DmxFrame) -> bool {
        self.staging.lock(|cell| {
            let mut s = cell.borrow_mut();
            if !s.dirty || s.held {
                return false;
            }
            out.clone_from(&s.frame);
            s.dirty = false;
            true
        })
    }

    pub fn take_flush_request(&self) -> bool {
        self.flush.try_take().is_some()
    }

    /// Sleep for up to `timeout`, returning early with `true` as soon as a
    /// sync asks for a flush. The request stays pending for
    /// [`take_flush_request`](Self::take_flush_request).
    pub fn wait_for_flush(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            if self.flush.signaled() {
                return true;
            }
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            std::thread::sleep(FLUSH_POLL.min(deadline - now));
        }
    }

    // ── RDM queues ────────────────────────────────────────────

    /// Queue a request for the output task, blocking while the queue is full.
    pub fn submit_request(&self, request: RdmPacket) {
        futures_lite::future::block_on(self.rdm_requests.send(request));
    }

    pub fn next_request(&self) -> Option<RdmPacket> {
        self.rdm_requests.try_receive().ok()
    }

    /// Hand a responder reply back to the network task. Dropped if the
    /// network side has fallen behind; the controller will retry.
    pub fn push_reply(&self, reply: RdmPacket) {
        if self.rdm_replies.try_send(reply).is_err() {
            warn!("PortShared: RDM reply queue full, reply dropped");
        }
    }

    pub fn next_reply(&self) -> Option<RdmPacket> {
        self.rdm_replies.try_receive().ok()
    }

    // ── Port health ───────────────────────────────────────────

    pub fn set_faulted(&self, faulted: bool) {
        self.faulted.store(faulted, Ordering::Release);
    }

    pub fn is_faulted(&self) -> bool {
        self.faulted.load(Ordering::Acquire)
    }

    pub fn record_frame(&self) {
        self.frames_sent.fetch_add(1, Ordering::Relaxed);
    }

    pub fn frames_sent(&self) -> u32 {
        self.frames_sent.load(Ordering::Relaxed)
    }

    // ── Addressing set over RDM ───────────────────────────────

    pub fn publish_start_address(&self, address: u16) {
        self.start_address.store(address, Ordering::Release);
    }

    pub fn take_start_address(&self) -> Option<u16> {
        match self.start_address.swap(0, Ordering::AcqRel) {
            0 => None,
            a => Some(a),
        }
    }

    // ── Config changes for the responder ──────────────────────

    /// Replace any unapplied settings with `settings`.
    pub fn publish_settings(&self, settings: ResponderSettings) {
        self.with_settings(|pending| *pending = Some(settings));
    }

    pub fn take_settings(&self) -> Option<ResponderSettings> {
        self.with_settings(Option::take)
    }

    fn with_settings<R>(&self, f: impl FnOnce(&mut Option<ResponderSettings>) -> R) -> R {
        self.settings.lock(|cell| f(&mut cell.borrow_mut()))
    }
}

// ── Sink adapters used by the Art-Net node ────────────────────

/// [`DmxSink`] that stages payloads for a port's output task.
pub struct FrameWriter<S: AsRef<PortShared>> {
    shared: S,
}

impl<S: AsRef<PortShared>> FrameWriter<S> {
    pub fn new(shared: S) -> Self {
        Self { shared }
    }
}

impl<S: AsRef<PortShared>> DmxSink for FrameWriter<S> {
    fn write_dmx(&mut self, write: &DmxWrite<'_>) {
        let n = self.shared.as_ref().stage(write);
        debug!(
            "FrameWriter: staged {} ch at {} (port {})",
            n, write.first_channel, write.port_address
        );
    }

    fn sync(&mut self) {
        self.shared.as_ref().release();
    }

    fn clear(&mut self) {
        self.shared.as_ref().clear();
    }
}

/// [`RdmSink`] that queues requests for a port's responder.
pub struct RdmForwarder<S: AsRef<PortShared>> {
    shared: S,
}

impl<S: AsRef<PortShared>> RdmForwarder<S> {
    pub fn new(shared: S) -> Self {
        Self { shared }
    }
}

impl<S: AsRef<PortShared>> RdmSink for RdmForwarder<S> {
    fn submit(&mut self, request: RdmPacket) {
        self.shared.as_ref().submit_request(request);
    }
}
