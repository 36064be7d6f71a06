//! ArtPollReply encoding.
//!
//! Fixed 239-byte layout. Text fields are truncated to their width minus one
//! so the last byte is always a NUL terminator.

use core::fmt::Write;

use crate::config::NodeConfig;

use super::layout::*;
use super::packet::write_header;
use super::status::ArtNetStatus;

pub type PollReply = [u8; POLL_REPLY_LEN];

/// NodeReport status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportCode {
    PowerOk = 0x0001,
    ParseFail = 0x0004,
    OutputFault = 0x000B,
}

/// NodeReport text: `#xxxx [yyyy] text`, where yyyy counts replies sent.
pub fn node_report(code: ReportCode, counter: u16, text: &str) -> heapless::String<64> {
    let mut s = heapless::String::new();
    // Overflow only truncates the report.
    let _ = write!(s, "#{:04X} [{:04}] {}", code as u16, counter % 10_000, text);
    s
}

pub fn build(config: &NodeConfig, status: &ArtNetStatus, report: &str) -> PollReply {
    let mut reply = [0u8; POLL_REPLY_LEN];
    write_header(&mut reply, OP_POLL_REPLY);

    reply[REPLY_IP].copy_from_slice(&status.ip.octets());
    reply[REPLY_PORT].copy_from_slice(&ARTNET_PORT.to_be_bytes());
    reply[REPLY_VERSION].copy_from_slice(&status.version.to_be_bytes());
    reply[REPLY_SUBNET] = status.subnet;
    reply[REPLY_FIRMWARE] = status.firmware;
    reply[REPLY_STATUS1] = status.status1;
    reply[REPLY_STATUS2] = status.status2;

    copy_text(&mut reply[REPLY_SHORT_NAME], &config.short_name);
    copy_text(&mut reply[REPLY_LONG_NAME], &config.long_name);
    copy_text(&mut reply[REPLY_NODE_REPORT], report);

    reply[REPLY_NUM_PORTS].copy_from_slice(&status.num_ports.to_be_bytes());
    reply[REPLY_PORT_TYPES].copy_from_slice(&status.port_types);
    reply[REPLY_GOOD_INPUT].copy_from_slice(&status.good_input);
    reply[REPLY_GOOD_OUTPUT].copy_from_slice(&status.good_output);
    reply[REPLY_SW_OUT].copy_from_slice(&status.sw_out);
    reply[REPLY_MAC].copy_from_slice(&status.mac);

    reply
}

fn copy_text(field: &mut [u8], text: &str) {
    let n = text.len().min(field.len().saturating_sub(1));
    field[..n].copy_from_slice(&text.as_bytes()[..n]);
    field[n..].fill(0);
}
