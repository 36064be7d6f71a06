//! Application core.
//!
//! The protocol logic lives in [`crate::artnet`], [`crate::dmx`] and
//! [`crate::rdm`]; this module holds the port traits they talk through,
//! the events they emit, and the task contexts that wire them together.
//! All interaction with hardware happens through **port traits** defined
//! in [`ports`], so every context is testable without real peripherals.

pub mod context;
pub mod events;
pub mod ports;
