//! Bounds-checked byte views over received datagrams.
//!
//! Every Art-Net and RDM field read goes through [`WireReader`], so a short
//! or truncated packet surfaces as [`WireError::TooShort`] instead of an
//! out-of-bounds index.

use core::ops::Range;

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum WireError {
    #[error("payload too short: need {needed} bytes, got {actual}")]
    TooShort { needed: usize, actual: usize },
}

/// Read-only cursor over a borrowed byte slice.
#[derive(Debug, Clone, Copy)]
pub struct WireReader<'a> {
    payload: &'a [u8],
}

impl<'a> WireReader<'a> {
    pub fn new(payload: &'a [u8]) -> Self {
        Self { payload }
    }

    pub fn len(&self) -> usize {
        self.payload.len()
    }

    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }

    pub fn require_len(&self, needed: usize) -> Result<(), WireError> {
        if self.payload.len() < needed {
            return Err(WireError::TooShort {
                needed,
                actual: self.payload.len(),
            });
        }
        Ok(())
    }

    pub fn read_u8(&self, offset: usize) -> Result<u8, WireError> {
        self.payload
            .get(offset)
            .copied()
            .ok_or(WireError::TooShort {
                needed: offset + 1,
                actual: self.payload.len(),
            })
    }

    pub fn read_u16_le(&self, offset: usize) -> Result<u16, WireError> {
        let b = self.read_array::<2>(offset)?;
        Ok(u16::from_le_bytes(b))
    }

    pub fn read_u16_be(&self, offset: usize) -> Result<u16, WireError> {
        let b = self.read_array::<2>(offset)?;
        Ok(u16::from_be_bytes(b))
    }

    pub fn read_array<const N: usize>(&self, offset: usize) -> Result<[u8; N], WireError> {
        let slice = self.read_slice(offset..offset + N)?;
        let mut out = [0u8; N];
        out.copy_from_slice(slice);
        Ok(out)
    }

    pub fn read_slice(&self, range: Range<usize>) -> Result<&'a [u8], WireError> {
        self.payload
            .get(range.clone())
            .ok_or(WireError::TooShort {
                needed: range.end,
                actual: self.payload.len(),
            })
    }

    /// Everything from `offset` to the end; empty if `offset` is past the end.
    pub fn tail(&self, offset: usize) -> &'a [u8] {
        self.payload.get(offset..).unwrap_or(&[])
    }
}
