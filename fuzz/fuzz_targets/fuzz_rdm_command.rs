//! Fuzz target: `RdmResponder::handle_command`
//!
//! Drives arbitrary byte sequences into the responder, both raw and with a
//! valid start code and checksum patched in so the header checks get past
//! the first gate. Asserts no panics and that every reply is a well-formed
//! RDM message within the 257-byte limit.
//!
//! cargo fuzz run fuzz_rdm_command

#![no_main]

use artnode::rdm::message::decode_discovery_response;
use artnode::rdm::{DeviceIdentity, RdmResponder, Uid, checksum, validate_header};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let uid = Uid::new([0x77, 0x77, 0xBE, 0xEF, 0xCA, 0xFE]);
    let mut responder = RdmResponder::new(DeviceIdentity::new(uid));

    check(&mut responder, data);

    if data.len() >= 24 {
        let mut patched = data.to_vec();
        patched[0] = 0xCC;
        patched[1] = 0x01;
        let len = usize::from(patched[2]).clamp(24, patched.len());
        patched.truncate(len);
        let sum = checksum(&patched);
        patched.extend_from_slice(&sum.to_be_bytes());
        check(&mut responder, &patched);
    }
});

fn check(responder: &mut RdmResponder, bytes: &[u8]) {
    let Some(reply) = responder.handle_command(bytes) else {
        return;
    };
    assert!(reply.bytes.len() <= 257);
    if reply.with_break {
        assert!(validate_header(&reply.bytes).is_ok(), "malformed reply");
    } else {
        // Unique-branch answers carry our UID and nothing else.
        assert_eq!(decode_discovery_response(&reply.bytes), Some(responder.uid()));
    }
}
