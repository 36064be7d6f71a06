//! Frame transport: the byte-level boundary under the DMX512 engine.
//!
//! A transport knows how to hold the line low (break), hold it high (mark),
//! push bytes through the UART and flip the RS-485 driver between transmit
//! and receive. It knows nothing about DMX frames or RDM messages.
//!
//! Every call is blocking with bounded latency. Implementations must drain
//! the transmitter before a baud-rate or direction change.

use core::fmt;

/// DMX512 line rate (also used by RDM).
pub const DMX_BAUD: u32 = 250_000;

/// Minimum break length in microseconds.
pub const BREAK_FLOOR_US: u32 = 176;

/// Minimum mark-after-break length in microseconds.
pub const MAB_FLOOR_US: u32 = 12;

/// State of the half-duplex RS-485 driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineDirection {
    Transmit,
    Receive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportError {
    /// `uart_param_config` rejected the line settings.
    ConfigFailed(i32),
    /// `uart_driver_install` failed.
    DriverInstallFailed(i32),
    /// TX/RX pin routing failed.
    PinConfigFailed(i32),
    /// Baud rate could not be applied.
    BaudRateFailed(i32),
    /// The UART accepted fewer bytes than requested.
    WriteFailed,
    /// The transmitter did not drain within the bounded wait.
    TxTimeout,
    /// The driver-enable GPIO could not be driven.
    DirectionPinFailed,
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConfigFailed(rc) => write!(f, "UART config failed (rc={})", rc),
            Self::DriverInstallFailed(rc) => write!(f, "UART driver install failed (rc={})", rc),
            Self::PinConfigFailed(rc) => write!(f, "UART pin config failed (rc={})", rc),
            Self::BaudRateFailed(rc) => write!(f, "baud rate change failed (rc={})", rc),
            Self::WriteFailed => write!(f, "UART write failed"),
            Self::TxTimeout => write!(f, "TX drain timed out"),
            Self::DirectionPinFailed => write!(f, "direction pin write failed"),
        }
    }
}

/// Byte-level line control for one physical DMX port.
pub trait FrameTransport {
    /// Hold the line in the spacing (low) state for `us` microseconds.
    fn send_break(&mut self, us: u32) -> Result<(), TransportError>;

    /// Hold the line in the marking (high) state for `us` microseconds.
    fn send_mark(&mut self, us: u32) -> Result<(), TransportError>;

    /// Queue `bytes` for transmission.
    fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), TransportError>;

    /// Block until every queued byte has left the shift register.
    fn wait_tx_done(&mut self) -> Result<(), TransportError>;

    fn set_baud_rate(&mut self, baud: u32) -> Result<(), TransportError>;

    fn set_line_direction(&mut self, direction: LineDirection) -> Result<(), TransportError>;
}

impl<T: FrameTransport + ?Sized> FrameTransport for &mut T {
    fn send_break(&mut self, us: u32) -> Result<(), TransportError> {
        (**self).send_break(us)
    }

    fn send_mark(&mut self, us: u32) -> Result<(), TransportError> {
        (**self).send_mark(us)
    }

    fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), TransportError> {
        (**self).write_bytes(bytes)
    }

    fn wait_tx_done(&mut self) -> Result<(), TransportError> {
        (**self).wait_tx_done()
    }

    fn set_baud_rate(&mut self, baud: u32) -> Result<(), TransportError> {
        (**self).set_baud_rate(baud)
    }

    fn set_line_direction(&mut self, direction: LineDirection) -> Result<(), TransportError> {
        (**self).set_line_direction(direction)
    }
}
