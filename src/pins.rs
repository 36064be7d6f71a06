//! GPIO / peripheral pin assignments for the node board.
//!
//! Single source of truth: every driver references this module rather than
//! hard-coding pin numbers.

use crate::drivers::uart_dmx::UartPins;

// ---------------------------------------------------------------------------
// DMX512 port (UART1 → MAX485)
// ---------------------------------------------------------------------------

pub const DMX_UART: i32 = 1;
pub const DMX_TX_GPIO: i32 = 17;
/// Transceiver DE/RE, HIGH = transmit.
pub const DMX_DIR_GPIO: i32 = 16;
/// No receive path is wired; RDM replies are transmit-only.
pub const DMX_RX_GPIO: i32 = -1;

pub const DMX_PORT: UartPins = UartPins {
    uart: DMX_UART,
    tx_gpio: DMX_TX_GPIO,
    rx_gpio: DMX_RX_GPIO,
};
