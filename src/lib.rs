//! Art-Net → DMX512 / RDM node firmware library.
//!
//! Exposes the protocol and application modules for integration testing.
//! All ESP-IDF-specific code is guarded by `#[cfg(target_os = "espidf")]`
//! within each module, so the whole crate builds and tests on the host.

#![deny(unused_must_use)]

pub mod app;
pub mod artnet;
pub mod config;
pub mod dmx;
pub mod error;
pub mod pins;
pub mod rdm;
pub mod wire;

pub mod adapters;
pub mod drivers;
