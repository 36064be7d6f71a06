//! Integration tests for the RDM responder on a recording line.

use artnode::dmx::{DmxPort, FrameTiming};
use artnode::rdm::layout::{
    DISCOVERY_COMMAND, GET_COMMAND, GET_COMMAND_RESPONSE, NR_DATA_OUT_OF_RANGE, NR_UNKNOWN_PID,
    PID_DEVICE_INFO, PID_DEVICE_POWER_CYCLES, PID_DISC_MUTE, PID_DISC_UNIQUE_BRANCH,
    PID_DISC_UN_MUTE, PID_DMX_START_ADDRESS, RESPONSE_TYPE_ACK, RESPONSE_TYPE_NACK_REASON,
    SET_COMMAND,
};
use artnode::rdm::message::decode_discovery_response;
use artnode::rdm::{DeviceIdentity, RdmResponder, Uid};

use crate::mock_hw::{MockLine, MockNvs, node_uid, rdm_request, reply_data};

fn responder() -> RdmResponder {
    RdmResponder::new(DeviceIdentity::new(node_uid()))
}

fn port() -> DmxPort<MockLine> {
    let mut port = DmxPort::new(MockLine::default(), FrameTiming::default()).unwrap();
    port.start_output().unwrap();
    port
}

fn get(r: &mut RdmResponder, pid: u16, dest: Uid) -> Vec<u8> {
    r.handle_command(&rdm_request(GET_COMMAND, pid, dest, &[]))
        .expect("reply")
        .bytes
        .to_vec()
}

#[test]
fn short_buffer_never_dispatches() {
    let mut r = responder();
    let full = rdm_request(GET_COMMAND, PID_DEVICE_INFO, node_uid(), &[]);
    for len in 0..24 {
        assert!(r.handle_command(&full[..len]).is_none(), "len {len}");
    }
    assert_eq!(r.handled(), 0);
}

#[test]
fn broadcast_device_info_reports_footprint_and_start() {
    let mut r = responder();
    r.set_dmx_start_address(37);

    let reply = get(&mut r, PID_DEVICE_INFO, Uid::BROADCAST);

    assert_eq!(reply[20], GET_COMMAND_RESPONSE);
    assert_eq!(reply[16], RESPONSE_TYPE_ACK);
    let info = reply_data(&reply);
    assert_eq!(u16::from_be_bytes([info[10], info[11]]), 512);
    assert_eq!(u16::from_be_bytes([info[14], info[15]]), 37);
}

#[test]
fn reply_swaps_source_and_destination() {
    let mut r = responder();
    let reply = get(&mut r, PID_DEVICE_INFO, node_uid());
    assert_eq!(&reply[3..9], &crate::mock_hw::CONTROLLER);
    assert_eq!(&reply[9..15], node_uid().as_bytes());
    assert_eq!(reply[15], 7, "transaction number echoed");
}

#[test]
fn foreign_destination_is_ignored() {
    let mut r = responder();
    let other = Uid::new([0x12, 0x34, 0, 0, 0, 9]);
    assert!(
        r.handle_command(&rdm_request(GET_COMMAND, PID_DEVICE_INFO, other, &[]))
            .is_none()
    );
}

#[test]
fn start_address_out_of_range_is_nacked_and_retained() {
    let mut r = responder();
    r.set_dmx_start_address(20);

    for bad in [0u16, 513, 0xFFFF] {
        let resp = r
            .handle_command(&rdm_request(
                SET_COMMAND,
                PID_DMX_START_ADDRESS,
                node_uid(),
                &bad.to_be_bytes(),
            ))
            .expect("reply");
        assert!(resp.nack);
        assert_eq!(resp.bytes[16], RESPONSE_TYPE_NACK_REASON);
        assert_eq!(reply_data(&resp.bytes), &NR_DATA_OUT_OF_RANGE.to_be_bytes());
        assert_eq!(r.identity().dmx_start_address, 20);
    }
}

#[test]
fn start_address_in_range_is_applied_and_read_back() {
    let mut r = responder();
    for good in [1u16, 256, 512] {
        let resp = r
            .handle_command(&rdm_request(
                SET_COMMAND,
                PID_DMX_START_ADDRESS,
                node_uid(),
                &good.to_be_bytes(),
            ))
            .expect("reply");
        assert!(!resp.nack);

        let reply = get(&mut r, PID_DMX_START_ADDRESS, node_uid());
        assert_eq!(reply_data(&reply), &good.to_be_bytes());
    }
}

#[test]
fn unknown_pid_is_nacked() {
    let mut r = responder();
    let resp = r
        .handle_command(&rdm_request(GET_COMMAND, 0x7FF0, node_uid(), &[]))
        .expect("reply");
    assert!(resp.nack);
    assert_eq!(reply_data(&resp.bytes), &NR_UNKNOWN_PID.to_be_bytes());
}

#[test]
fn discovery_branch_mute_and_unmute() {
    let mut r = responder();
    let mut range = [0u8; 12];
    range[6..].copy_from_slice(&[0xFF; 6]);

    let resp = r
        .handle_command(&rdm_request(
            DISCOVERY_COMMAND,
            PID_DISC_UNIQUE_BRANCH,
            Uid::BROADCAST,
            &range,
        ))
        .expect("in range");
    assert!(!resp.with_break);
    assert_eq!(decode_discovery_response(&resp.bytes), Some(node_uid()));

    r.handle_command(&rdm_request(DISCOVERY_COMMAND, PID_DISC_MUTE, node_uid(), &[]))
        .expect("mute ack");
    assert!(r.is_muted());
    assert!(
        r.handle_command(&rdm_request(
            DISCOVERY_COMMAND,
            PID_DISC_UNIQUE_BRANCH,
            Uid::BROADCAST,
            &range,
        ))
        .is_none()
    );

    r.handle_command(&rdm_request(DISCOVERY_COMMAND, PID_DISC_UN_MUTE, node_uid(), &[]))
        .expect("un-mute ack");
    assert!(!r.is_muted());
}

#[test]
fn respond_puts_reply_on_the_line() {
    let mut r = responder();
    let mut port = port();

    let resp = r
        .respond(&rdm_request(GET_COMMAND, PID_DEVICE_INFO, node_uid(), &[]), &mut port)
        .unwrap()
        .expect("reply");

    let writes = port.transport().rdm_writes();
    assert_eq!(writes.len(), 1);
    assert_eq!(writes[0], resp.bytes.as_slice());
}

#[test]
fn power_cycles_count_across_boots() {
    let mut nvs = MockNvs::new();
    let first = DeviceIdentity::boot(node_uid(), &mut nvs);
    let second = DeviceIdentity::boot(node_uid(), &mut nvs);
    assert_eq!(first.power_cycles + 1, second.power_cycles);

    let mut r = RdmResponder::new(second);
    let reply = get(&mut r, PID_DEVICE_POWER_CYCLES, node_uid());
    assert_eq!(reply_data(&reply), &2u32.to_be_bytes());
}
