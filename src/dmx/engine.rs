//! DMX512 output engine for one physical port.
//!
//! ```text
//!            start_frame()                       write_frame()   end_frame()
//!   Idle ──▶ Break ──(≥176 µs)──▶ MarkAfterBreak ──(≥12 µs)──▶ Transmitting ──▶ Idle
//! ```
//!
//! The port owns its authoritative [`DmxFrame`]. [`DmxPort::update`] runs one
//! full cycle when the port is in [`PortDirection::Output`] and does nothing
//! in [`PortDirection::Receive`]. Callers pace `update()`.
//!
//! A transport error disables the port: every later call is a no-op until
//! [`DmxPort::reinitialize`] succeeds.

use core::fmt;

use log::{debug, error, info};

use crate::adapters::time::MonotonicClock;

use super::frame::DmxFrame;
use super::transport::{
    BREAK_FLOOR_US, DMX_BAUD, FrameTransport, LineDirection, MAB_FLOOR_US, TransportError,
};

/// RDM shares the DMX512 line rate.
pub const RDM_BAUD: u32 = 250_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortState {
    Idle,
    Break,
    MarkAfterBreak,
    Transmitting,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortDirection {
    Output,
    Receive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortError {
    /// The port was disabled by an earlier transport fault.
    Disabled,
    Transport(TransportError),
}

impl fmt::Display for PortError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disabled => write!(f, "port disabled"),
            Self::Transport(e) => write!(f, "transport: {e}"),
        }
    }
}

impl From<TransportError> for PortError {
    fn from(e: TransportError) -> Self {
        Self::Transport(e)
    }
}

/// Break and mark-after-break lengths, floored at the DMX512 minimums.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameTiming {
    pub break_us: u32,
    pub mab_us: u32,
}

impl FrameTiming {
    pub fn new(break_us: u32, mab_us: u32) -> Self {
        Self {
            break_us: break_us.max(BREAK_FLOOR_US),
            mab_us: mab_us.max(MAB_FLOOR_US),
        }
    }
}

impl Default for FrameTiming {
    fn default() -> Self {
        Self::new(BREAK_FLOOR_US, MAB_FLOOR_US)
    }
}

pub struct DmxPort<T: FrameTransport> {
    transport: T,
    frame: DmxFrame,
    timing: FrameTiming,
    state: PortState,
    direction: PortDirection,
    enabled: bool,
    frame_count: u32,
    last_frame_us: u64,
    last_fault: Option<TransportError>,
    clock: MonotonicClock,
}

impl<T: FrameTransport> DmxPort<T> {
    /// Configure the line for DMX512 and park it in receive.
    pub fn new(transport: T, timing: FrameTiming) -> Result<Self, TransportError> {
        let mut port = Self {
            transport,
            frame: DmxFrame::new(),
            timing: FrameTiming::new(timing.break_us, timing.mab_us),
            state: PortState::Idle,
            direction: PortDirection::Receive,
            enabled: true,
            frame_count: 0,
            last_frame_us: 0,
            last_fault: None,
            clock: MonotonicClock::new(),
        };
        port.configure_line()?;
        info!(
            "DmxPort: ready (break={}us, mab={}us)",
            port.timing.break_us, port.timing.mab_us
        );
        Ok(port)
    }

    fn configure_line(&mut self) -> Result<(), TransportError> {
        self.transport.set_baud_rate(DMX_BAUD)?;
        let line = match self.direction {
            PortDirection::Output => LineDirection::Transmit,
            PortDirection::Receive => LineDirection::Receive,
        };
        self.transport.set_line_direction(line)
    }

    fn ensure_enabled(&self) -> Result<(), PortError> {
        if self.enabled {
            Ok(())
        } else {
            Err(PortError::Disabled)
        }
    }

    /// Run a transport operation; a failure disables the port.
    fn guard<R>(
        &mut self,
        op: impl FnOnce(&mut T) -> Result<R, TransportError>,
    ) -> Result<R, PortError> {
        match op(&mut self.transport) {
            Ok(r) => Ok(r),
            Err(e) => {
                error!("DmxPort: transport fault ({}), port disabled", e);
                self.enabled = false;
                self.state = PortState::Idle;
                self.last_fault = Some(e);
                Err(PortError::Transport(e))
            }
        }
    }

    // ── Direction ─────────────────────────────────────────────

    pub fn start_output(&mut self) -> Result<(), PortError> {
        self.ensure_enabled()?;
        self.guard(|t| t.set_line_direction(LineDirection::Transmit))?;
        self.direction = PortDirection::Output;
        Ok(())
    }

    pub fn stop_output(&mut self) -> Result<(), PortError> {
        self.ensure_enabled()?;
        self.guard(|t| {
            t.wait_tx_done()?;
            t.set_line_direction(LineDirection::Receive)
        })?;
        self.direction = PortDirection::Receive;
        self.state = PortState::Idle;
        Ok(())
    }

    // ── Frame cycle ───────────────────────────────────────────

    pub fn start_frame(&mut self) -> Result<(), PortError> {
        self.ensure_enabled()?;
        let timing = self.timing;
        self.state = PortState::Break;
        self.guard(|t| t.send_break(timing.break_us))?;
        self.state = PortState::MarkAfterBreak;
        self.guard(|t| t.send_mark(timing.mab_us))?;
        self.state = PortState::Transmitting;
        Ok(())
    }

    /// Stream all 513 slots.
    pub fn write_frame(&mut self) -> Result<(), PortError> {
        self.ensure_enabled()?;
        self.state = PortState::Transmitting;
        match self.transport.write_bytes(self.frame.as_slots()) {
            Ok(()) => Ok(()),
            Err(e) => self.guard(|_| Err(e)),
        }
    }

    pub fn end_frame(&mut self) -> Result<(), PortError> {
        self.ensure_enabled()?;
        self.guard(FrameTransport::wait_tx_done)?;
        self.frame_count = self.frame_count.wrapping_add(1);
        self.last_frame_us = self.clock.uptime_us();
        self.state = PortState::Idle;
        Ok(())
    }

    /// One full frame cycle. Returns `Ok(false)` when nothing was sent
    /// because the port is receiving or disabled.
    pub fn update(&mut self) -> Result<bool, PortError> {
        if !self.enabled || self.direction != PortDirection::Output {
            return Ok(false);
        }
        self.start_frame()?;
        self.write_frame()?;
        self.end_frame()?;
        Ok(true)
    }

    // ── RDM turnaround ────────────────────────────────────────

    /// Put an RDM message on the line between DMX frames.
    ///
    /// Output is paused for the exchange and resumed afterwards if it was
    /// running. Discovery responses go out without a break.
    pub fn send_rdm(&mut self, bytes: &[u8], with_break: bool) -> Result<(), PortError> {
        self.ensure_enabled()?;
        let resume = self.direction == PortDirection::Output;
        self.direction = PortDirection::Receive;
        self.state = PortState::Idle;

        let timing = self.timing;
        let sent = self.guard(|t| {
            t.wait_tx_done()?;
            t.set_baud_rate(RDM_BAUD)?;
            t.set_line_direction(LineDirection::Transmit)?;
            if with_break {
                t.send_break(timing.break_us)?;
                t.send_mark(timing.mab_us)?;
            }
            t.write_bytes(bytes)?;
            t.wait_tx_done()?;
            t.set_line_direction(LineDirection::Receive)?;
            t.set_baud_rate(DMX_BAUD)
        });

        if resume {
            self.direction = PortDirection::Output;
            if sent.is_ok() {
                self.guard(|t| t.set_line_direction(LineDirection::Transmit))?;
            }
        }
        debug!("DmxPort: RDM {} bytes sent (break={})", bytes.len(), with_break);
        sent
    }

    /// Re-apply line settings after a fault and re-enable the port.
    pub fn reinitialize(&mut self) -> Result<(), PortError> {
        self.state = PortState::Idle;
        self.configure_line()?;
        self.enabled = true;
        self.last_fault = None;
        info!("DmxPort: re-initialised");
        Ok(())
    }

    // ── Channel access ────────────────────────────────────────

    pub fn set_channel(&mut self, channel: usize, value: u8) {
        self.frame.set_channel(channel, value);
    }

    pub fn channel(&self, channel: usize) -> u8 {
        self.frame.channel(channel)
    }

    pub fn clear_channels(&mut self) {
        self.frame.clear_channels();
    }

    /// Overwrite levels from channel 0 onward.
    pub fn write(&mut self, data: &[u8]) -> usize {
        self.frame.write_channels(0, data)
    }

    /// Replace the whole authoritative frame.
    pub fn load(&mut self, frame: &DmxFrame) {
        self.frame.clone_from(frame);
    }

    pub fn frame(&self) -> &DmxFrame {
        &self.frame
    }

    // ── Status ────────────────────────────────────────────────

    pub fn state(&self) -> PortState {
        self.state
    }

    pub fn direction(&self) -> PortDirection {
        self.direction
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn is_outputting(&self) -> bool {
        self.enabled && self.direction == PortDirection::Output
    }

    pub fn frame_count(&self) -> u32 {
        self.frame_count
    }

    /// Microseconds since boot at the end of the last completed frame.
    pub fn last_frame_time_us(&self) -> u64 {
        self.last_frame_us
    }

    pub fn last_fault(&self) -> Option<TransportError> {
        self.last_fault
    }

    pub fn timing(&self) -> FrameTiming {
        self.timing
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }
}
