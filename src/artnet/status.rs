//! Node health as advertised in ArtPollReply.

use core::net::Ipv4Addr;

use crate::config::{MergeMode, NodeConfig};

use super::layout::{
    GOOD_OUTPUT_LTP, GOOD_OUTPUT_MERGING, GOOD_OUTPUT_TRANSMITTING, PORT_TYPE_OUTPUT,
    PROTOCOL_VERSION, STATUS1_NORMAL, STATUS1_RDM, STATUS2_PORT_ADDRESS_15,
};

/// Reported in the firmware field of ArtPollReply.
pub const FIRMWARE_VERSION: u8 = 0x03;

/// Output ports on this node.
pub const NUM_PORTS: u16 = 1;

/// Live conditions that feed the GoodOutput byte.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OutputHealth {
    /// DMX data has been received and the port is not faulted.
    pub transmitting: bool,
    /// More than one source is writing the universe.
    pub merging: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArtNetStatus {
    pub ip: Ipv4Addr,
    pub mac: [u8; 6],
    pub version: u16,
    pub firmware: u8,
    pub subnet: u8,
    pub status1: u8,
    pub status2: u8,
    pub num_ports: u16,
    pub port_types: [u8; 4],
    pub good_input: [u8; 4],
    pub good_output: [u8; 4],
    pub sw_out: [u8; 4],
}

impl ArtNetStatus {
    pub fn new(ip: Ipv4Addr, mac: [u8; 6]) -> Self {
        Self {
            ip,
            mac,
            version: PROTOCOL_VERSION,
            firmware: FIRMWARE_VERSION,
            subnet: 0,
            status1: STATUS1_NORMAL,
            status2: STATUS2_PORT_ADDRESS_15,
            num_ports: NUM_PORTS,
            port_types: [PORT_TYPE_OUTPUT, 0, 0, 0],
            good_input: [0; 4],
            good_output: [0; 4],
            sw_out: [0; 4],
        }
    }

    /// Rebuild every derived field from the current config.
    pub fn recompute(&mut self, config: &NodeConfig, health: OutputHealth) {
        self.subnet = config.address.subnet & 0x0F;
        self.sw_out = [config.address.universe & 0x0F, 0, 0, 0];

        self.status1 = STATUS1_NORMAL;
        if config.rdm_enabled {
            self.status1 |= STATUS1_RDM;
        }

        let mut good = 0;
        if health.transmitting {
            good |= GOOD_OUTPUT_TRANSMITTING;
        }
        if health.merging {
            good |= GOOD_OUTPUT_MERGING;
        }
        if config.merge_mode == MergeMode::Ltp {
            good |= GOOD_OUTPUT_LTP;
        }
        self.good_output = [good, 0, 0, 0];
    }
}
