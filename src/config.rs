//! Node configuration
//!
//! Every tunable parameter of the Art-Net node. Persisted to NVS as a
//! postcard blob and exchanged with the web UI as JSON.

use serde::{Deserialize, Serialize};

use crate::dmx::transport::{BREAK_FLOOR_US, MAB_FLOOR_US};

/// Longest pixel strip the pixel sink will drive.
pub const MAX_PIXELS: u16 = 1360;

/// How overlapping sources are combined into one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MergeMode {
    /// Highest takes precedence (per channel).
    #[default]
    Htp,
    /// Latest takes precedence.
    Ltp,
}

/// Art-Net addressing plus the local DMX start address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeAddress {
    /// 0–127
    pub net: u8,
    /// 0–15
    pub subnet: u8,
    /// 0–15
    pub universe: u8,
    /// 1–512
    pub start_address: u16,
}

impl Default for NodeAddress {
    fn default() -> Self {
        Self {
            net: 0,
            subnet: 0,
            universe: 0,
            start_address: 1,
        }
    }
}

impl NodeAddress {
    /// 15-bit Art-Net port address.
    pub fn port_address(&self) -> u16 {
        (u16::from(self.net & 0x7F) << 8)
            | (u16::from(self.subnet & 0x0F) << 4)
            | u16::from(self.universe & 0x0F)
    }

    /// ArtDmx byte 14: subnet in the high nibble, universe in the low.
    pub fn sub_uni(&self) -> u8 {
        ((self.subnet & 0x0F) << 4) | (self.universe & 0x0F)
    }

    /// 0-based channel offset of the start address.
    pub fn first_channel(&self) -> usize {
        usize::from(self.start_address.saturating_sub(1))
    }
}

/// Core node configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeConfig {
    // --- Identity ---
    /// ArtPollReply short name (truncated to 17 chars on the wire)
    pub short_name: String,
    /// ArtPollReply long name (truncated to 63 chars on the wire)
    pub long_name: String,

    // --- Art-Net ---
    pub address: NodeAddress,
    pub merge_mode: MergeMode,
    /// Hold staged frames until ArtSync
    pub sync_mode: bool,
    /// Maximum ArtPollReply bursts per second
    pub poll_reply_rate: u32,

    // --- RDM ---
    pub rdm_enabled: bool,
    pub manufacturer_label: String,
    pub model_description: String,
    pub device_label: String,

    // --- Pixels ---
    pub pixels_enabled: bool,
    pub pixel_count: u16,
    /// 0–255, 255 = unscaled
    pub pixel_brightness: u8,

    // --- DMX timing ---
    /// Break length in microseconds (≥ 176)
    pub break_us: u32,
    /// Mark-after-break in microseconds (≥ 12)
    pub mab_us: u32,
    /// Idle gap between output frames (microseconds)
    pub refresh_interval_us: u32,

    // --- Telemetry ---
    pub telemetry_interval_secs: u32,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            short_name: "ESP32 ArtNode".into(),
            long_name: "ESP32 Art-Net to DMX512/RDM Node".into(),

            address: NodeAddress::default(),
            merge_mode: MergeMode::Htp,
            sync_mode: false,
            poll_reply_rate: 10,

            rdm_enabled: true,
            manufacturer_label: "ArtNode".into(),
            model_description: "ArtNode DMX512 Node".into(),
            device_label: "ESP32-ArtNode".into(),

            pixels_enabled: true,
            pixel_count: 170,
            pixel_brightness: 255,

            break_us: BREAK_FLOOR_US,
            mab_us: MAB_FLOOR_US,
            refresh_interval_us: 1000, // ~40 Hz with a full frame

            telemetry_interval_secs: 60,
        }
    }
}

impl NodeConfig {
    /// Range-check every field. Out-of-range values are rejected, not clamped.
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.address.net > 0x7F {
            return Err("net must be 0–127");
        }
        if self.address.subnet > 0x0F {
            return Err("subnet must be 0–15");
        }
        if self.address.universe > 0x0F {
            return Err("universe must be 0–15");
        }
        if !(1..=512).contains(&self.address.start_address) {
            return Err("start_address must be 1–512");
        }
        if self.break_us < BREAK_FLOOR_US {
            return Err("break_us must be ≥ 176");
        }
        if self.mab_us < MAB_FLOOR_US {
            return Err("mab_us must be ≥ 12");
        }
        if self.pixel_count > MAX_PIXELS {
            return Err("pixel_count must be ≤ 1360");
        }
        if !(1..=100).contains(&self.poll_reply_rate) {
            return Err("poll_reply_rate must be 1–100");
        }
        if self.short_name.is_empty() {
            return Err("short_name must not be empty");
        }
        Ok(())
    }

    /// Parse a JSON document from the configuration UI and validate it.
    pub fn from_json(json: &str) -> Result<Self, &'static str> {
        let cfg: Self = serde_json::from_str(json).map_err(|_| "malformed config JSON")?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn to_json(&self) -> Result<String, &'static str> {
        serde_json::to_string(self).map_err(|_| "config serialisation failed")
    }
}
