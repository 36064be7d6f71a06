//! The 513-slot DMX512 frame.

/// Number of level slots after the start code.
pub const DMX_CHANNELS: usize = 512;

/// Start code plus 512 levels.
pub const DMX_FRAME_LEN: usize = DMX_CHANNELS + 1;

/// Null start code for dimmer data.
pub const START_CODE_DMX: u8 = 0x00;

/// One complete DMX512 packet as it goes on the wire.
///
/// Slot 0 is the start code. Channels are addressed 0-based through
/// [`set_channel`](Self::set_channel) / [`channel`](Self::channel) and map
/// to slot `c + 1`.
#[derive(Clone, PartialEq, Eq)]
pub struct DmxFrame {
    slots: [u8; DMX_FRAME_LEN],
}

impl Default for DmxFrame {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Debug for DmxFrame {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("DmxFrame")
            .field("start_code", &self.slots[0])
            .field("first", &&self.slots[1..9])
            .finish_non_exhaustive()
    }
}

impl DmxFrame {
    pub const fn new() -> Self {
        Self {
            slots: [0; DMX_FRAME_LEN],
        }
    }

    pub fn start_code(&self) -> u8 {
        self.slots[0]
    }

    pub fn set_start_code(&mut self, code: u8) {
        self.slots[0] = code;
    }

    /// Out-of-range channels are ignored.
    pub fn set_channel(&mut self, channel: usize, value: u8) {
        if channel < DMX_CHANNELS {
            self.slots[channel + 1] = value;
        }
    }

    /// Out-of-range channels read as 0.
    pub fn channel(&self, channel: usize) -> u8 {
        if channel < DMX_CHANNELS {
            self.slots[channel + 1]
        } else {
            0
        }
    }

    /// Copy `data` into consecutive channels starting at `first`; anything
    /// past channel 511 is dropped. Returns the number of channels written.
    pub fn write_channels(&mut self, first: usize, data: &[u8]) -> usize {
        if first >= DMX_CHANNELS {
            return 0;
        }
        let n = data.len().min(DMX_CHANNELS - first);
        self.slots[first + 1..first + 1 + n].copy_from_slice(&data[..n]);
        n
    }

    /// Like [`write_channels`](Self::write_channels) but keeps the higher of
    /// the old and new level per channel.
    pub fn merge_channels_htp(&mut self, first: usize, data: &[u8]) -> usize {
        if first >= DMX_CHANNELS {
            return 0;
        }
        let n = data.len().min(DMX_CHANNELS - first);
        for (slot, &v) in self.slots[first + 1..first + 1 + n].iter_mut().zip(data) {
            *slot = (*slot).max(v);
        }
        n
    }

    /// Zero every level; the start code is left alone.
    pub fn clear_channels(&mut self) {
        self.slots[1..].fill(0);
    }

    pub fn channels(&self) -> &[u8] {
        &self.slots[1..]
    }

    /// The full wire image including the start code.
    pub fn as_slots(&self) -> &[u8; DMX_FRAME_LEN] {
        &self.slots
    }
}
