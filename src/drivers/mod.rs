//! Peripheral drivers: the DMX UART, task placement and the watchdog.

pub mod task_pin;
pub mod uart_dmx;
pub mod watchdog;
