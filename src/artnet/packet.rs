//! Art-Net datagram decoding.
//!
//! [`parse`] never panics: every field goes through [`WireReader`], and a
//! datagram that is too short for its opcode comes back as a
//! [`DropReason`] rather than a partial packet.

use thiserror::Error;

use crate::wire::{WireError, WireReader};

use super::layout::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DropReason {
    #[error("not an Art-Net packet")]
    NotArtNet,
    #[error("truncated {opcode:#06x} packet: {source}")]
    Truncated {
        opcode: u16,
        #[source]
        source: WireError,
    },
}

/// ArtDmx or ArtNzs payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArtDmx<'a> {
    pub sequence: u8,
    /// ArtDmx: physical input. ArtNzs: always 0.
    pub physical: u8,
    /// 0x00 for ArtDmx, the alternate start code for ArtNzs.
    pub start_code: u8,
    pub subnet: u8,
    pub universe: u8,
    pub net: u8,
    /// Declared length clamped to 512 and to what the datagram carries.
    pub data: &'a [u8],
}

/// ArtAddress fields. `None` means the sender asked for no change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArtAddress {
    pub net: Option<u8>,
    pub subnet: Option<u8>,
    pub universe: Option<u8>,
    pub command: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtPacket<'a> {
    Poll,
    Dmx(ArtDmx<'a>),
    Address(ArtAddress),
    Rdm { opcode: u16, payload: &'a [u8] },
    Sync,
    /// Valid Art-Net with an opcode this node does not act on.
    Other(u16),
}

/// Check the ID and opcode, then decode the body the opcode calls for.
pub fn parse(bytes: &[u8]) -> Result<ArtPacket<'_>, DropReason> {
    let r = WireReader::new(bytes);
    if r.len() < MIN_PACKET_LEN || r.read_slice(0..ARTNET_ID.len()) != Ok(ARTNET_ID.as_slice())
    {
        return Err(DropReason::NotArtNet);
    }
    let opcode = r
        .read_u16_le(OP_CODE_OFFSET)
        .map_err(|_| DropReason::NotArtNet)?;
    let truncated = |source| DropReason::Truncated { opcode, source };

    match opcode {
        OP_POLL => Ok(ArtPacket::Poll),
        OP_DMX | OP_NZS => parse_dmx(&r, opcode == OP_NZS)
            .map(ArtPacket::Dmx)
            .map_err(truncated),
        OP_ADDRESS => parse_address(&r)
            .map(ArtPacket::Address)
            .map_err(truncated),
        OP_RDM | OP_RDM_SUB => {
            r.require_len(RDM_PAYLOAD_OFFSET).map_err(truncated)?;
            Ok(ArtPacket::Rdm {
                opcode,
                payload: r.tail(RDM_PAYLOAD_OFFSET),
            })
        }
        OP_SYNC => Ok(ArtPacket::Sync),
        other => Ok(ArtPacket::Other(other)),
    }
}

fn parse_dmx<'a>(r: &WireReader<'a>, nzs: bool) -> Result<ArtDmx<'a>, WireError> {
    r.require_len(DMX_DATA_OFFSET)?;
    let sub_uni = r.read_u8(SUB_UNI_OFFSET)?;
    let declared = usize::from(r.read_u16_be(LENGTH_OFFSET)?);
    let available = r.len() - DMX_DATA_OFFSET;
    let len = declared.min(DMX_MAX_SLOTS).min(available);
    let physical_or_sc = r.read_u8(PHYSICAL_OFFSET)?;

    Ok(ArtDmx {
        sequence: r.read_u8(SEQUENCE_OFFSET)?,
        physical: if nzs { 0 } else { physical_or_sc },
        start_code: if nzs { physical_or_sc } else { 0 },
        subnet: sub_uni >> 4,
        universe: sub_uni & 0x0F,
        net: r.read_u8(NET_OFFSET)? & 0x7F,
        data: r.read_slice(DMX_DATA_OFFSET..DMX_DATA_OFFSET + len)?,
    })
}

fn parse_address(r: &WireReader<'_>) -> Result<ArtAddress, WireError> {
    r.require_len(ADDRESS_MIN_LEN)?;
    let field = |offset| {
        r.read_u8(offset)
            .map(|b| (b != ADDRESS_NO_CHANGE).then_some(b))
    };
    Ok(ArtAddress {
        net: field(ADDRESS_NET_OFFSET)?,
        subnet: field(ADDRESS_SUBNET_OFFSET)?,
        universe: field(ADDRESS_UNIVERSE_OFFSET)?,
        command: r.read_u8(ADDRESS_COMMAND_OFFSET).unwrap_or(AC_NONE),
    })
}

/// Human-readable opcode for logs.
pub fn opcode_name(opcode: u16) -> &'static str {
    match opcode {
        OP_POLL => "OpPoll",
        OP_POLL_REPLY => "OpPollReply",
        OP_DMX => "OpDmx",
        OP_NZS => "OpNzs",
        OP_SYNC => "OpSync",
        OP_ADDRESS => "OpAddress",
        OP_INPUT => "OpInput",
        OP_RDM | OP_RDM_SUB => "OpRdm",
        OP_IP_PROG => "OpIpProg",
        _ => "unknown",
    }
}

/// Header shared by every packet the node sends.
pub fn write_header(buf: &mut [u8], opcode: u16) {
    buf[..ARTNET_ID.len()].copy_from_slice(ARTNET_ID);
    buf[OP_CODE_OFFSET..OP_CODE_OFFSET + 2].copy_from_slice(&opcode.to_le_bytes());
}
