//! RDM (ANSI E1.20) wire constants.

pub const SC_RDM: u8 = 0xCC;
pub const SC_SUB_MESSAGE: u8 = 0x01;

pub const PREAMBLE_BYTE: u8 = 0xFE;
pub const SEPARATOR_BYTE: u8 = 0xAA;

// ── Header layout (all multi-byte fields big-endian) ──────────

pub const START_CODE_OFFSET: usize = 0;
pub const SUB_START_CODE_OFFSET: usize = 1;
pub const MESSAGE_LENGTH_OFFSET: usize = 2;
pub const DESTINATION_UID_OFFSET: usize = 3;
pub const SOURCE_UID_OFFSET: usize = 9;
pub const TRANSACTION_OFFSET: usize = 15;
pub const PORT_ID_OFFSET: usize = 16;
pub const MESSAGE_COUNT_OFFSET: usize = 17;
pub const SUB_DEVICE_OFFSET: usize = 18;
pub const COMMAND_CLASS_OFFSET: usize = 20;
pub const PARAMETER_ID_OFFSET: usize = 21;
pub const PDL_OFFSET: usize = 23;
pub const HEADER_SIZE: usize = 24;

pub const MAX_PARAMETER_DATA_LENGTH: usize = 231;
pub const CHECKSUM_SIZE: usize = 2;

/// Encoded EUID (12) + encoded checksum (4).
pub const DISCOVERY_RESPONSE_SIZE: usize = 16;
/// Including 7 bytes preamble + 1 byte separator.
pub const MAX_DISCOVERY_RESPONSE_SIZE: usize = DISCOVERY_RESPONSE_SIZE + 8;

pub const DEVICE_INFO_SIZE: usize = 0x13;
pub const MAX_LABEL_LEN: usize = 32;

pub const ROOT_DEVICE: u16 = 0x0000;
pub const ALL_SUB_DEVICES: u16 = 0xFFFF;

// ── Command classes ───────────────────────────────────────────

pub const DISCOVERY_COMMAND: u8 = 0x10;
pub const DISCOVERY_COMMAND_RESPONSE: u8 = 0x11;
pub const GET_COMMAND: u8 = 0x20;
pub const GET_COMMAND_RESPONSE: u8 = 0x21;
pub const SET_COMMAND: u8 = 0x30;
pub const SET_COMMAND_RESPONSE: u8 = 0x31;

// ── Response types ────────────────────────────────────────────

pub const RESPONSE_TYPE_ACK: u8 = 0x00;
pub const RESPONSE_TYPE_NACK_REASON: u8 = 0x02;

// ── NACK reason codes ─────────────────────────────────────────

pub const NR_UNKNOWN_PID: u16 = 0x0000;
pub const NR_FORMAT_ERROR: u16 = 0x0001;
pub const NR_UNSUPPORTED_COMMAND_CLASS: u16 = 0x0005;
pub const NR_DATA_OUT_OF_RANGE: u16 = 0x0006;
pub const NR_SUB_DEVICE_OUT_OF_RANGE: u16 = 0x0009;

// ── Parameter IDs ─────────────────────────────────────────────

pub const PID_DISC_UNIQUE_BRANCH: u16 = 0x0001;
pub const PID_DISC_MUTE: u16 = 0x0002;
pub const PID_DISC_UN_MUTE: u16 = 0x0003;
pub const PID_SUPPORTED_PARAMETERS: u16 = 0x0050;
pub const PID_DEVICE_INFO: u16 = 0x0060;
pub const PID_DEVICE_MODEL_DESCRIPTION: u16 = 0x0080;
pub const PID_MANUFACTURER_LABEL: u16 = 0x0081;
pub const PID_DEVICE_LABEL: u16 = 0x0082;
pub const PID_SOFTWARE_VERSION_LABEL: u16 = 0x00C0;
pub const PID_DMX_START_ADDRESS: u16 = 0x00F0;
pub const PID_DEVICE_POWER_CYCLES: u16 = 0x0405;
pub const PID_IDENTIFY_DEVICE: u16 = 0x1000;

// ── DEVICE_INFO fields ────────────────────────────────────────

pub const RDM_PROTOCOL_VERSION: u16 = 0x0100;
pub const DEVICE_MODEL_ID: u16 = 0x0001;
/// PRODUCT_CATEGORY_FIXTURE_FIXED
pub const PRODUCT_CATEGORY: u16 = 0x0101;
pub const SOFTWARE_VERSION_ID: u32 = 0x0000_0100;
pub const DMX_FOOTPRINT: u16 = 512;
