//! Art-Net 4 packet layout.

use core::ops::Range;

pub const ARTNET_PORT: u16 = 6454;
pub const ARTNET_ID: &[u8; 8] = b"Art-Net\0";
pub const PROTOCOL_VERSION: u16 = 14;

/// ID + opcode.
pub const MIN_PACKET_LEN: usize = 10;
/// Largest datagram the node reads.
pub const MAX_PACKET_LEN: usize = 1024;

pub const OP_CODE_OFFSET: usize = 8;

// ── Opcodes (little-endian on the wire) ───────────────────────

pub const OP_POLL: u16 = 0x2000;
pub const OP_POLL_REPLY: u16 = 0x2100;
pub const OP_DMX: u16 = 0x5000;
pub const OP_NZS: u16 = 0x5100;
pub const OP_SYNC: u16 = 0x5200;
pub const OP_ADDRESS: u16 = 0x6000;
pub const OP_INPUT: u16 = 0x7000;
pub const OP_RDM: u16 = 0x8300;
/// Some controllers send RDM under the sub-device opcode.
pub const OP_RDM_SUB: u16 = 0x8400;
pub const OP_IP_PROG: u16 = 0xF800;

// ── ArtDmx / ArtNzs ───────────────────────────────────────────

pub const SEQUENCE_OFFSET: usize = 12;
/// ArtDmx: physical input port. ArtNzs: start code.
pub const PHYSICAL_OFFSET: usize = 13;
pub const SUB_UNI_OFFSET: usize = 14;
pub const NET_OFFSET: usize = 15;
pub const LENGTH_OFFSET: usize = 16;
pub const DMX_DATA_OFFSET: usize = 18;
pub const DMX_MAX_SLOTS: usize = 512;

// ── ArtAddress ────────────────────────────────────────────────

pub const ADDRESS_NET_OFFSET: usize = 12;
pub const ADDRESS_SUBNET_OFFSET: usize = 13;
pub const ADDRESS_UNIVERSE_OFFSET: usize = 14;
pub const ADDRESS_COMMAND_OFFSET: usize = 15;
pub const ADDRESS_MIN_LEN: usize = 15;
/// Field value meaning "leave unchanged".
pub const ADDRESS_NO_CHANGE: u8 = 0x7F;

pub const AC_NONE: u8 = 0x00;
pub const AC_CANCEL_MERGE: u8 = 0x01;
pub const AC_MERGE_LTP: u8 = 0x10;
pub const AC_MERGE_HTP: u8 = 0x50;
pub const AC_CLEAR_OUTPUT: u8 = 0x90;

// ── ArtRdm ────────────────────────────────────────────────────

pub const RDM_PAYLOAD_OFFSET: usize = 14;

// ── ArtPollReply ──────────────────────────────────────────────

pub const POLL_REPLY_LEN: usize = 239;
pub const REPLY_IP: Range<usize> = 10..14;
pub const REPLY_PORT: Range<usize> = 14..16;
pub const REPLY_VERSION: Range<usize> = 16..18;
pub const REPLY_SUBNET: usize = 18;
pub const REPLY_FIRMWARE: usize = 19;
pub const REPLY_STATUS1: usize = 21;
pub const REPLY_STATUS2: usize = 22;
pub const REPLY_SHORT_NAME: Range<usize> = 26..44;
pub const REPLY_LONG_NAME: Range<usize> = 44..108;
pub const REPLY_NODE_REPORT: Range<usize> = 108..172;
pub const REPLY_NUM_PORTS: Range<usize> = 172..174;
pub const REPLY_PORT_TYPES: Range<usize> = 174..178;
pub const REPLY_GOOD_INPUT: Range<usize> = 178..182;
pub const REPLY_GOOD_OUTPUT: Range<usize> = 182..186;
pub const REPLY_SW_OUT: Range<usize> = 190..194;
pub const REPLY_MAC: Range<usize> = 201..207;

// ── Status bits ───────────────────────────────────────────────

/// PortTypes: port can output DMX512 from the network.
pub const PORT_TYPE_OUTPUT: u8 = 0x80;
/// GoodOutput: data is being transmitted.
pub const GOOD_OUTPUT_TRANSMITTING: u8 = 0x80;
/// GoodOutput: output is merging two sources.
pub const GOOD_OUTPUT_MERGING: u8 = 0x08;
/// GoodOutput: merge mode is LTP.
pub const GOOD_OUTPUT_LTP: u8 = 0x02;
/// Status1: indicators in normal mode.
pub const STATUS1_NORMAL: u8 = 0x80;
/// Status1: RDM capable.
pub const STATUS1_RDM: u8 = 0x02;
/// Status2: 15-bit port addresses supported.
pub const STATUS2_PORT_ADDRESS_15: u8 = 0x08;
