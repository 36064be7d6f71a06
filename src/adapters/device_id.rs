//! Device identity derived from the ESP32 factory MAC address.
//!
//! The MAC is burned into eFuse, so everything derived from it is stable
//! across reboots and reflashes:
//! - RDM UID `7777:xxxxxxxx` (vendor prefix + last four MAC bytes)
//! - DHCP hostname `artnode-xxyyzz`
//! - MAC field of ArtPollReply

use crate::rdm::Uid;

/// Full 6-byte MAC address.
pub type MacAddress = [u8; 6];

/// Read the factory MAC address from eFuse.
#[cfg(target_os = "espidf")]
pub fn read_mac() -> MacAddress {
    let mut mac: MacAddress = [0u8; 6];
    unsafe {
        esp_idf_svc::sys::esp_efuse_mac_get_default(mac.as_mut_ptr());
    }
    mac
}

/// Simulation: returns a deterministic fake MAC.
#[cfg(not(target_os = "espidf"))]
pub fn read_mac() -> MacAddress {
    [0xDE, 0xAD, 0xBE, 0xEF, 0xCA, 0xFE]
}

pub fn uid(mac: &MacAddress) -> Uid {
    Uid::from_mac(mac)
}

/// Format: `artnode-xxyyzz` (lowercase, last three MAC bytes).
pub fn hostname(mac: &MacAddress) -> heapless::String<24> {
    let mut name = heapless::String::<24>::new();
    use core::fmt::Write;
    let _ = write!(name, "artnode-{:02x}{:02x}{:02x}", mac[3], mac[4], mac[5]);
    name
}
