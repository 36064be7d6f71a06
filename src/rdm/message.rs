//! RDM message decoding and response framing.

use thiserror::Error;

use crate::app::ports::RdmBytes;
use crate::wire::{WireError, WireReader};

use super::layout::{
    CHECKSUM_SIZE, COMMAND_CLASS_OFFSET, DESTINATION_UID_OFFSET, HEADER_SIZE,
    MAX_DISCOVERY_RESPONSE_SIZE, MAX_PARAMETER_DATA_LENGTH, MESSAGE_COUNT_OFFSET,
    MESSAGE_LENGTH_OFFSET, PARAMETER_ID_OFFSET, PDL_OFFSET, PORT_ID_OFFSET, PREAMBLE_BYTE,
    SC_RDM, SC_SUB_MESSAGE, SEPARATOR_BYTE, SOURCE_UID_OFFSET, SUB_DEVICE_OFFSET,
    SUB_START_CODE_OFFSET, START_CODE_OFFSET, TRANSACTION_OFFSET,
};
use super::uid::Uid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RdmError {
    #[error(transparent)]
    Wire(#[from] WireError),
    #[error("bad start code {0:#04x}")]
    BadStartCode(u8),
    #[error("bad sub start code {0:#04x}")]
    BadSubStartCode(u8),
    #[error("message length {declared} invalid for {actual}-byte buffer")]
    BadMessageLength { declared: usize, actual: usize },
    #[error("parameter data length {pdl} overruns message length {message_length}")]
    ParameterOverflow { pdl: usize, message_length: usize },
}

/// Decoded 24-byte RDM header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RdmHeader {
    pub message_length: u8,
    pub destination: Uid,
    pub source: Uid,
    pub transaction: u8,
    pub port_id: u8,
    pub message_count: u8,
    pub sub_device: u16,
    pub command_class: u8,
    pub pid: u16,
    pub pdl: u8,
}

/// A validated request borrowing its parameter data from the input buffer.
#[derive(Debug, Clone, Copy)]
pub struct RdmRequest<'a> {
    pub header: RdmHeader,
    pub data: &'a [u8],
}

/// Check start codes and lengths, then decode the header.
pub fn validate_header(bytes: &[u8]) -> Result<RdmHeader, RdmError> {
    let r = WireReader::new(bytes);
    r.require_len(HEADER_SIZE)?;

    let sc = r.read_u8(START_CODE_OFFSET)?;
    if sc != SC_RDM {
        return Err(RdmError::BadStartCode(sc));
    }
    let sub = r.read_u8(SUB_START_CODE_OFFSET)?;
    if sub != SC_SUB_MESSAGE {
        return Err(RdmError::BadSubStartCode(sub));
    }

    let message_length = r.read_u8(MESSAGE_LENGTH_OFFSET)?;
    let declared = usize::from(message_length);
    if declared < HEADER_SIZE || declared > bytes.len() {
        return Err(RdmError::BadMessageLength {
            declared,
            actual: bytes.len(),
        });
    }

    let pdl = r.read_u8(PDL_OFFSET)?;
    if HEADER_SIZE + usize::from(pdl) > declared {
        return Err(RdmError::ParameterOverflow {
            pdl: usize::from(pdl),
            message_length: declared,
        });
    }

    Ok(RdmHeader {
        message_length,
        destination: Uid::new(r.read_array(DESTINATION_UID_OFFSET)?),
        source: Uid::new(r.read_array(SOURCE_UID_OFFSET)?),
        transaction: r.read_u8(TRANSACTION_OFFSET)?,
        port_id: r.read_u8(PORT_ID_OFFSET)?,
        message_count: r.read_u8(MESSAGE_COUNT_OFFSET)?,
        sub_device: r.read_u16_be(SUB_DEVICE_OFFSET)?,
        command_class: r.read_u8(COMMAND_CLASS_OFFSET)?,
        pid: r.read_u16_be(PARAMETER_ID_OFFSET)?,
        pdl,
    })
}

pub fn parse_request(bytes: &[u8]) -> Result<RdmRequest<'_>, RdmError> {
    let header = validate_header(bytes)?;
    let data = WireReader::new(bytes)
        .read_slice(HEADER_SIZE..HEADER_SIZE + usize::from(header.pdl))?;
    Ok(RdmRequest { header, data })
}

/// 16-bit additive checksum.
pub fn checksum(bytes: &[u8]) -> u16 {
    bytes
        .iter()
        .fold(0u16, |acc, &b| acc.wrapping_add(u16::from(b)))
}

/// Fields the responder fills in on top of the request header.
#[derive(Debug, Clone, Copy)]
pub struct ResponseFields {
    pub source: Uid,
    pub transaction: u8,
    pub response_type: u8,
    pub command_class: u8,
}

/// Frame a response to `request`: UIDs swapped, sub-device and PID echoed,
/// checksum appended. `data` beyond 231 bytes is cut.
pub fn encode_response(request: &RdmHeader, fields: ResponseFields, data: &[u8]) -> RdmBytes {
    let data = &data[..data.len().min(MAX_PARAMETER_DATA_LENGTH)];
    let message_length = HEADER_SIZE + data.len();

    let mut out = RdmBytes::new();
    // Capacity is 257 = 24 + 231 + 2, so none of these pushes can fail.
    let _ = out.extend_from_slice(&[SC_RDM, SC_SUB_MESSAGE, message_length as u8]);
    let _ = out.extend_from_slice(request.source.as_bytes());
    let _ = out.extend_from_slice(fields.source.as_bytes());
    let _ = out.extend_from_slice(&[fields.transaction, fields.response_type, 0]);
    let _ = out.extend_from_slice(&request.sub_device.to_be_bytes());
    let _ = out.push(fields.command_class);
    let _ = out.extend_from_slice(&request.pid.to_be_bytes());
    let _ = out.push(data.len() as u8);
    let _ = out.extend_from_slice(data);
    let sum = checksum(&out);
    let _ = out.extend_from_slice(&sum.to_be_bytes());
    debug_assert_eq!(out.len(), message_length + CHECKSUM_SIZE);
    out
}

/// DISC_UNIQUE_BRANCH reply: preamble, separator, then the UID and its
/// checksum with every byte split into `b | 0xAA`, `b | 0x55`.
pub fn encode_discovery_response(uid: Uid) -> heapless::Vec<u8, MAX_DISCOVERY_RESPONSE_SIZE> {
    let mut out = heapless::Vec::new();
    for _ in 0..7 {
        let _ = out.push(PREAMBLE_BYTE);
    }
    let _ = out.push(SEPARATOR_BYTE);

    let mut euid = [0u8; 12];
    for (i, &b) in uid.as_bytes().iter().enumerate() {
        euid[2 * i] = b | 0xAA;
        euid[2 * i + 1] = b | 0x55;
    }
    let _ = out.extend_from_slice(&euid);

    let [hi, lo] = checksum(&euid).to_be_bytes();
    let _ = out.extend_from_slice(&[hi | 0xAA, hi | 0x55, lo | 0xAA, lo | 0x55]);
    out
}

/// Recover a UID from an encoded discovery reply, as a controller would.
/// `None` when the checksum does not match.
pub fn decode_discovery_response(bytes: &[u8]) -> Option<Uid> {
    let start = bytes.iter().position(|&b| b == SEPARATOR_BYTE)? + 1;
    let body = bytes.get(start..start + 16)?;
    let (euid, sum) = body.split_at(12);
    let mut uid = [0u8; 6];
    for (i, pair) in euid.chunks_exact(2).enumerate() {
        uid[i] = pair[0] & pair[1];
    }
    let expected = u16::from_be_bytes([sum[0] & sum[1], sum[2] & sum[3]]);
    (checksum(euid) == expected).then_some(Uid::new(uid))
}
