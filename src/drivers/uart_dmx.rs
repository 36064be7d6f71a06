//! UART + RS-485 transceiver implementing [`FrameTransport`].
//!
//! ```text
//!   UART TX ──▶ ┌─────────┐
//!               │ MAX485  │ ──▶ XLR pins 2/3
//!   DIR GPIO ─▶ │ DE / RE │
//!               └─────────┘
//! ```
//!
//! Break is produced by inverting the TX signal for the break length, which
//! holds the line in the spacing state without touching the baud rate.
//! Mark-after-break is idle line, so it is only a delay.
//!
//! On host targets the UART is simulated: bytes and breaks are counted so
//! the engine can be exercised without hardware.

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;
use log::info;

use crate::dmx::transport::{DMX_BAUD, FrameTransport, LineDirection, TransportError};

/// Driver RX ring buffer. Must exceed the hardware FIFO.
#[cfg_attr(not(target_os = "espidf"), allow(dead_code))]
const RX_BUFFER_LEN: i32 = 512;

/// Bound on `uart_wait_tx_done`. A full frame takes ~23 ms.
#[cfg_attr(not(target_os = "espidf"), allow(dead_code))]
const TX_DONE_TIMEOUT_MS: u32 = 50;

/// UART number and pin routing for one DMX port.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UartPins {
    pub uart: i32,
    pub tx_gpio: i32,
    /// -1 when the port has no receive path.
    pub rx_gpio: i32,
}

/// Line activity seen by the simulated UART.
#[cfg(not(target_os = "espidf"))]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SimLine {
    pub bytes_written: usize,
    pub breaks: u32,
    pub baud: u32,
}

pub struct UartTransport<P: OutputPin, D: DelayNs> {
    pins: UartPins,
    dir: P,
    delay: D,
    #[cfg(not(target_os = "espidf"))]
    sim: SimLine,
}

impl<P: OutputPin, D: DelayNs> UartTransport<P, D> {
    /// Configure the UART for 250 kbaud 8N2 and park the transceiver in
    /// receive. Any failure is permanent for this port.
    #[cfg(target_os = "espidf")]
    pub fn new(pins: UartPins, mut dir: P, delay: D) -> Result<Self, TransportError> {
        dir.set_low().map_err(|_| TransportError::DirectionPinFailed)?;

        let cfg = uart_config_t {
            baud_rate: DMX_BAUD as i32,
            data_bits: uart_word_length_t_UART_DATA_8_BITS,
            parity: uart_parity_t_UART_PARITY_DISABLE,
            stop_bits: uart_stop_bits_t_UART_STOP_BITS_2,
            flow_ctrl: uart_hw_flowcontrol_t_UART_HW_FLOWCTRL_DISABLE,
            rx_flow_ctrl_thresh: 0,
            ..Default::default()
        };
        // SAFETY: plain driver calls on a UART this transport exclusively owns.
        unsafe {
            check(uart_param_config(pins.uart, &cfg), TransportError::ConfigFailed)?;
            check(
                uart_driver_install(
                    pins.uart,
                    RX_BUFFER_LEN,
                    0,
                    0,
                    core::ptr::null_mut(),
                    0,
                ),
                TransportError::DriverInstallFailed,
            )?;
        }

        // Built before pin routing so `Drop` deletes the driver if that fails.
        let transport = Self { pins, dir, delay };
        // SAFETY: driver installed above.
        check(
            unsafe { uart_set_pin(pins.uart, pins.tx_gpio, pins.rx_gpio, -1, -1) },
            TransportError::PinConfigFailed,
        )?;

        info!(
            "UartTransport: UART{} tx={} rx={} at {} baud 8N2",
            pins.uart, pins.tx_gpio, pins.rx_gpio, DMX_BAUD
        );
        Ok(transport)
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn new(pins: UartPins, mut dir: P, delay: D) -> Result<Self, TransportError> {
        dir.set_low().map_err(|_| TransportError::DirectionPinFailed)?;
        info!("UartTransport(sim): UART{} tx={}", pins.uart, pins.tx_gpio);
        Ok(Self {
            pins,
            dir,
            delay,
            sim: SimLine {
                baud: DMX_BAUD,
                ..SimLine::default()
            },
        })
    }

    pub fn pins(&self) -> UartPins {
        self.pins
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn sim_line(&self) -> SimLine {
        self.sim
    }

    #[cfg(target_os = "espidf")]
    fn invert_tx(&mut self, invert: bool) -> Result<(), TransportError> {
        let mask = if invert {
            uart_signal_inv_t_UART_SIGNAL_TXD_INV as u32
        } else {
            0
        };
        // SAFETY: driver installed in `new`.
        check(
            unsafe { uart_set_line_inverse(self.pins.uart, mask) },
            TransportError::ConfigFailed,
        )
    }

    #[cfg(not(target_os = "espidf"))]
    fn invert_tx(&mut self, invert: bool) -> Result<(), TransportError> {
        if invert {
            self.sim.breaks += 1;
        }
        Ok(())
    }
}

#[cfg(target_os = "espidf")]
fn check(rc: esp_err_t, err: fn(i32) -> TransportError) -> Result<(), TransportError> {
    if rc == ESP_OK as esp_err_t {
        Ok(())
    } else {
        Err(err(rc))
    }
}

impl<P: OutputPin, D: DelayNs> FrameTransport for UartTransport<P, D> {
    fn send_break(&mut self, us: u32) -> Result<(), TransportError> {
        self.invert_tx(true)?;
        self.delay.delay_us(us);
        self.invert_tx(false)
    }

    fn send_mark(&mut self, us: u32) -> Result<(), TransportError> {
        self.delay.delay_us(us);
        Ok(())
    }

    #[cfg(target_os = "espidf")]
    fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), TransportError> {
        // SAFETY: `bytes` is valid for `len` reads for the whole call.
        let written =
            unsafe { uart_write_bytes(self.pins.uart, bytes.as_ptr().cast(), bytes.len()) };
        if written < 0 || written as usize != bytes.len() {
            return Err(TransportError::WriteFailed);
        }
        Ok(())
    }

    #[cfg(not(target_os = "espidf"))]
    fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), TransportError> {
        self.sim.bytes_written += bytes.len();
        Ok(())
    }

    #[cfg(target_os = "espidf")]
    fn wait_tx_done(&mut self) -> Result<(), TransportError> {
        let ticks = esp_idf_hal::delay::TickType::new_millis(u64::from(TX_DONE_TIMEOUT_MS)).ticks();
        // SAFETY: driver installed in `new`.
        let rc = unsafe { uart_wait_tx_done(self.pins.uart, ticks) };
        if rc == ESP_OK as esp_err_t {
            Ok(())
        } else {
            Err(TransportError::TxTimeout)
        }
    }

    #[cfg(not(target_os = "espidf"))]
    fn wait_tx_done(&mut self) -> Result<(), TransportError> {
        Ok(())
    }

    #[cfg(target_os = "espidf")]
    fn set_baud_rate(&mut self, baud: u32) -> Result<(), TransportError> {
        // SAFETY: driver installed in `new`.
        check(
            unsafe { uart_set_baudrate(self.pins.uart, baud) },
            TransportError::BaudRateFailed,
        )
    }

    #[cfg(not(target_os = "espidf"))]
    fn set_baud_rate(&mut self, baud: u32) -> Result<(), TransportError> {
        self.sim.baud = baud;
        Ok(())
    }

    fn set_line_direction(&mut self, direction: LineDirection) -> Result<(), TransportError> {
        match direction {
            LineDirection::Transmit => self.dir.set_high(),
            LineDirection::Receive => self.dir.set_low(),
        }
        .map_err(|_| TransportError::DirectionPinFailed)
    }
}

#[cfg(target_os = "espidf")]
impl<P: OutputPin, D: DelayNs> Drop for UartTransport<P, D> {
    fn drop(&mut self) {
        // SAFETY: the driver was installed by `new`.
        unsafe {
            uart_driver_delete(self.pins.uart);
        }
    }
}
