//! Pixel sink: DMX levels to an RGB pixel frame.
//!
//! Every three consecutive levels form one pixel (R, G, B). Levels beyond
//! `pixel_count * 3` are ignored, and brightness scales each component as
//! `(c * b) >> 8` unless it is 255. The strip driver picks up the frame via
//! [`PixelBuffer::take_frame`].

use log::trace;

use crate::app::ports::PixelSink;
use crate::config::MAX_PIXELS;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

pub struct PixelBuffer {
    pixels: Vec<Rgb>,
    brightness: u8,
    dirty: bool,
    last_universe: Option<u16>,
}

impl PixelBuffer {
    pub fn new(pixel_count: u16, brightness: u8) -> Self {
        let count = usize::from(pixel_count.min(MAX_PIXELS));
        Self {
            pixels: vec![Rgb::default(); count],
            brightness,
            dirty: false,
            last_universe: None,
        }
    }

    pub fn set_brightness(&mut self, brightness: u8) {
        self.brightness = brightness;
    }

    pub fn pixel_count(&self) -> usize {
        self.pixels.len()
    }

    pub fn pixel(&self, index: usize) -> Option<Rgb> {
        self.pixels.get(index).copied()
    }

    pub fn last_universe(&self) -> Option<u16> {
        self.last_universe
    }

    /// The frame, if it changed since the last call.
    pub fn take_frame(&mut self) -> Option<&[Rgb]> {
        if !core::mem::take(&mut self.dirty) {
            return None;
        }
        Some(&self.pixels)
    }

    fn scale(&self, c: u8) -> u8 {
        if self.brightness == u8::MAX {
            c
        } else {
            ((u16::from(c) * u16::from(self.brightness)) >> 8) as u8
        }
    }
}

impl PixelSink for PixelBuffer {
    fn on_universe(&mut self, universe: u16, payload: &[u8], length: usize) {
        let length = length.min(payload.len()).min(self.pixels.len() * 3);
        let mut written = 0;
        for (i, rgb) in payload[..length].chunks_exact(3).enumerate() {
            self.pixels[i] = Rgb {
                r: self.scale(rgb[0]),
                g: self.scale(rgb[1]),
                b: self.scale(rgb[2]),
            };
            written += 1;
        }
        self.last_universe = Some(universe);
        self.dirty = true;
        trace!("PixelBuffer: {} pixels from universe {}", written, universe);
    }
}
