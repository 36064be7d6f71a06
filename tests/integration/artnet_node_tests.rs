//! Integration tests for Art-Net reception and dispatch.
//!
//! The node runs against a mock socket and the real [`PortShared`] staging
//! area, so the assertions are on what the output task would pick up.

use artnode::app::events::AppEvent;
use artnode::artnet::layout::{
    AC_CANCEL_MERGE, AC_CLEAR_OUTPUT, AC_MERGE_LTP, ADDRESS_NO_CHANGE, GOOD_OUTPUT_MERGING,
    OP_DMX, OP_POLL, OP_RDM, POLL_REPLY_LEN, REPLY_GOOD_OUTPUT, REPLY_LONG_NAME,
    REPLY_SHORT_NAME, STATUS1_RDM, REPLY_STATUS1,
};
use artnode::artnet::{ArtNetNode, DropReason, PacketOutcome};
use artnode::config::{MergeMode, NodeConfig};
use artnode::dmx::{DmxFrame, FrameWriter, PortShared, RdmForwarder};

use crate::mock_hw::{
    LogSink, MockNet, MockPixels, NODE_IP, NODE_MAC, art_address, art_address_none, art_dmx,
    art_poll, art_rdm, art_sync, controller,
};

type TestNode<'a> = ArtNetNode<MockNet, FrameWriter<&'a PortShared>, RdmForwarder<&'a PortShared>, MockPixels>;

fn make_node(shared: &PortShared, config: NodeConfig) -> TestNode<'_> {
    ArtNetNode::new(
        MockNet::default(),
        FrameWriter::new(shared),
        RdmForwarder::new(shared),
        MockPixels::default(),
        config,
        NODE_MAC,
    )
}

fn deliver(node: &mut TestNode<'_>, datagram: Vec<u8>, from: u8, sink: &mut LogSink) -> PacketOutcome {
    node.network_mut().push(datagram, controller(from));
    node.update(sink)
}

fn staged(shared: &PortShared) -> Option<DmxFrame> {
    let mut frame = DmxFrame::new();
    shared.take_frame(&mut frame).then_some(frame)
}

// ── Validation ────────────────────────────────────────────────

#[test]
fn foreign_datagram_changes_nothing() {
    let shared = PortShared::new();
    let mut node = make_node(&shared, NodeConfig::default());
    let mut sink = LogSink::new();
    let before = node.stats();

    let outcome = deliver(&mut node, b"NotArtNet-garbage-bytes".to_vec(), 9, &mut sink);

    assert_eq!(outcome, PacketOutcome::Dropped(DropReason::NotArtNet));
    assert_eq!(node.stats(), before);
    assert!(node.network().sent.is_empty());
    assert!(staged(&shared).is_none());
    assert!(sink.events.is_empty());
}

#[test]
fn truncated_dmx_is_dropped() {
    let shared = PortShared::new();
    let mut node = make_node(&shared, NodeConfig::default());
    let mut sink = LogSink::new();

    let mut packet = art_dmx(0, 0, &[1, 2, 3]);
    packet.truncate(15);
    let outcome = deliver(&mut node, packet, 9, &mut sink);

    assert!(matches!(outcome, PacketOutcome::Dropped(DropReason::Truncated { opcode: OP_DMX, .. })));
    assert!(staged(&shared).is_none());
}

#[test]
fn empty_socket_is_idle() {
    let shared = PortShared::new();
    let mut node = make_node(&shared, NodeConfig::default());
    assert_eq!(node.update(&mut LogSink::new()), PacketOutcome::Idle);
}

// ── ArtDmx ────────────────────────────────────────────────────

#[test]
fn dmx_for_our_universe_is_staged_and_forwarded_to_pixels() {
    let shared = PortShared::new();
    let mut node = make_node(&shared, NodeConfig::default());
    let mut sink = LogSink::new();

    let outcome = deliver(&mut node, art_dmx(0x00, 0, &[10, 20, 30, 40]), 9, &mut sink);

    assert_eq!(outcome, PacketOutcome::Handled(OP_DMX));
    let frame = staged(&shared).expect("frame staged");
    assert_eq!(&frame.channels()[..5], &[10, 20, 30, 40, 0]);
    assert_eq!(node.stats().dmx_packets, 1);
    assert_eq!(node.pixels().calls, vec![(0, vec![10, 20, 30, 40], 4)]);
}

#[test]
fn dmx_for_other_universe_is_ignored() {
    let shared = PortShared::new();
    let mut node = make_node(&shared, NodeConfig::default());
    let mut sink = LogSink::new();

    let outcome = deliver(&mut node, art_dmx(0x03, 0, &[1, 2]), 9, &mut sink);

    assert_eq!(outcome, PacketOutcome::Ignored(OP_DMX));
    assert!(staged(&shared).is_none());
    assert_eq!(node.stats().dmx_packets, 0);
}

#[test]
fn dmx_lands_at_start_address() {
    let shared = PortShared::new();
    let mut config = NodeConfig::default();
    config.address.start_address = 11;
    let mut node = make_node(&shared, config);

    deliver(&mut node, art_dmx(0, 0, &[7, 8]), 9, &mut LogSink::new());

    let frame = staged(&shared).expect("frame staged");
    assert_eq!(frame.channel(9), 0);
    assert_eq!(frame.channel(10), 7);
    assert_eq!(frame.channel(11), 8);
}

#[test]
fn oversized_length_is_clamped_to_512() {
    let shared = PortShared::new();
    let mut node = make_node(&shared, NodeConfig::default());

    let data = vec![0xAB; 600];
    deliver(&mut node, art_dmx(0, 0, &data), 9, &mut LogSink::new());

    let frame = staged(&shared).expect("frame staged");
    assert!(frame.channels().iter().all(|&v| v == 0xAB));
    assert_eq!(frame.channels().len(), 512);
}

#[test]
fn declared_length_beyond_datagram_uses_what_arrived() {
    let shared = PortShared::new();
    let mut node = make_node(&shared, NodeConfig::default());

    let mut packet = art_dmx(0, 0, &[5, 6, 7]);
    // Claim 100 slots but only carry three.
    packet[16..18].copy_from_slice(&100u16.to_be_bytes());
    deliver(&mut node, packet, 9, &mut LogSink::new());

    let frame = staged(&shared).expect("frame staged");
    assert_eq!(&frame.channels()[..4], &[5, 6, 7, 0]);
}

#[test]
fn pixels_disabled_skips_pixel_sink() {
    let shared = PortShared::new();
    let mut config = NodeConfig::default();
    config.pixels_enabled = false;
    let mut node = make_node(&shared, config);

    deliver(&mut node, art_dmx(0, 0, &[1, 2, 3]), 9, &mut LogSink::new());
    assert!(staged(&shared).is_some());
    assert!(node.pixels().calls.is_empty());
}

// ── ArtPoll ───────────────────────────────────────────────────

#[test]
fn poll_reply_is_239_bytes_with_truncated_names() {
    let shared = PortShared::new();
    let mut config = NodeConfig::default();
    config.short_name = "S".repeat(40);
    config.long_name = "L".repeat(100);
    let mut node = make_node(&shared, config);

    let outcome = deliver(&mut node, art_poll(), 9, &mut LogSink::new());
    assert_eq!(outcome, PacketOutcome::Handled(OP_POLL));

    let (reply, dest) = &node.network().sent[0];
    assert_eq!(*dest, controller(9));
    assert_eq!(reply.len(), POLL_REPLY_LEN);
    assert_eq!(&reply[..8], b"Art-Net\0");
    assert_eq!(&reply[10..14], &NODE_IP.octets());

    let short = &reply[REPLY_SHORT_NAME];
    assert_eq!(short.len(), 18);
    assert!(short[..17].iter().all(|&b| b == b'S'));
    assert_eq!(short[17], 0);
    let long = &reply[REPLY_LONG_NAME];
    assert_eq!(long.len(), 64);
    assert_eq!(long[63], 0);

    assert_ne!(reply[REPLY_STATUS1] & STATUS1_RDM, 0);
}

#[test]
fn polls_beyond_rate_are_limited() {
    let shared = PortShared::new();
    let mut config = NodeConfig::default();
    config.poll_reply_rate = 2;
    let mut node = make_node(&shared, config);
    let mut sink = LogSink::new();

    assert_eq!(deliver(&mut node, art_poll(), 9, &mut sink), PacketOutcome::Handled(OP_POLL));
    assert_eq!(deliver(&mut node, art_poll(), 9, &mut sink), PacketOutcome::Handled(OP_POLL));
    assert_eq!(deliver(&mut node, art_poll(), 9, &mut sink), PacketOutcome::RateLimited);

    assert_eq!(node.network().sent.len(), 2);
    assert_eq!(node.stats().polls_limited, 1);
}

// ── Merging ───────────────────────────────────────────────────

#[test]
fn second_source_raises_merge_bit_until_cancelled() {
    let shared = PortShared::new();
    let mut node = make_node(&shared, NodeConfig::default());
    let mut sink = LogSink::new();

    deliver(&mut node, art_dmx(0, 0, &[1]), 9, &mut sink);
    assert!(!node.is_merging());
    deliver(&mut node, art_dmx(0, 0, &[2]), 10, &mut sink);
    assert!(node.is_merging());

    deliver(&mut node, art_poll(), 9, &mut sink);
    let reply = &node.network().sent[0].0;
    assert_ne!(reply[REPLY_GOOD_OUTPUT][0] & GOOD_OUTPUT_MERGING, 0);

    deliver(&mut node, art_address_none(ADDRESS_NO_CHANGE, ADDRESS_NO_CHANGE, ADDRESS_NO_CHANGE), 9, &mut sink);
    assert!(node.is_merging());
    deliver(
        &mut node,
        art_address(ADDRESS_NO_CHANGE, ADDRESS_NO_CHANGE, ADDRESS_NO_CHANGE, AC_CANCEL_MERGE),
        9,
        &mut sink,
    );
    assert!(!node.is_merging());
}

#[test]
fn htp_keeps_highest_level_between_takes() {
    let shared = PortShared::new();
    let mut node = make_node(&shared, NodeConfig::default());
    let mut sink = LogSink::new();

    deliver(&mut node, art_dmx(0, 0, &[100, 10]), 9, &mut sink);
    deliver(&mut node, art_dmx(0, 0, &[50, 200]), 10, &mut sink);

    let frame = staged(&shared).expect("frame staged");
    assert_eq!(&frame.channels()[..2], &[100, 200]);
}

// ── ArtAddress ────────────────────────────────────────────────

#[test]
fn address_no_change_keeps_subnet() {
    let shared = PortShared::new();
    let mut config = NodeConfig::default();
    config.address.subnet = 4;
    let mut node = make_node(&shared, config);
    let mut sink = LogSink::new();

    deliver(&mut node, art_address_none(3, ADDRESS_NO_CHANGE, 9), 9, &mut sink);

    let a = node.config().address;
    assert_eq!((a.net, a.subnet, a.universe), (3, 4, 9));
    assert_eq!(
        sink.count(|e| matches!(e, AppEvent::AddressChanged(_))),
        1
    );
}

#[test]
fn address_commands_switch_merge_and_clear() {
    let shared = PortShared::new();
    let mut node = make_node(&shared, NodeConfig::default());
    let mut sink = LogSink::new();

    deliver(
        &mut node,
        art_address(ADDRESS_NO_CHANGE, ADDRESS_NO_CHANGE, ADDRESS_NO_CHANGE, AC_MERGE_LTP),
        9,
        &mut sink,
    );
    assert_eq!(node.config().merge_mode, MergeMode::Ltp);

    deliver(&mut node, art_dmx(0, 0, &[9, 9]), 9, &mut sink);
    let _ = staged(&shared);
    deliver(
        &mut node,
        art_address(ADDRESS_NO_CHANGE, ADDRESS_NO_CHANGE, ADDRESS_NO_CHANGE, AC_CLEAR_OUTPUT),
        9,
        &mut sink,
    );
    let frame = staged(&shared).expect("clear marks the frame dirty");
    assert!(frame.channels().iter().all(|&v| v == 0));
    assert_eq!(sink.count(|e| matches!(e, AppEvent::OutputCleared)), 1);
}

// ── ArtRdm / ArtSync ──────────────────────────────────────────

#[test]
fn rdm_is_queued_for_the_responder() {
    let shared = PortShared::new();
    let mut node = make_node(&shared, NodeConfig::default());

    let outcome = deliver(&mut node, art_rdm(&[0xCC, 0x01, 24]), 9, &mut LogSink::new());

    assert_eq!(outcome, PacketOutcome::Handled(OP_RDM));
    let request = shared.next_request().expect("queued");
    assert_eq!(request.peer, controller(9));
    assert_eq!(request.data.as_slice(), &[0xCC, 0x01, 24]);
}

#[test]
fn rdm_disabled_ignores_requests() {
    let shared = PortShared::new();
    let mut config = NodeConfig::default();
    config.rdm_enabled = false;
    let mut node = make_node(&shared, config);

    let outcome = deliver(&mut node, art_rdm(&[0xCC]), 9, &mut LogSink::new());

    assert_eq!(outcome, PacketOutcome::Ignored(OP_RDM));
    assert!(shared.next_request().is_none());
}

#[test]
fn sync_releases_held_frame() {
    let shared = PortShared::new();
    let mut config = NodeConfig::default();
    config.sync_mode = true;
    let mut node = make_node(&shared, config);
    let mut sink = LogSink::new();

    deliver(&mut node, art_dmx(0, 0, &[42]), 9, &mut sink);
    assert!(staged(&shared).is_none(), "held until sync");

    deliver(&mut node, art_sync(), 9, &mut sink);
    assert!(node.sync_received());
    assert!(shared.take_flush_request());
    assert_eq!(staged(&shared).map(|f| f.channel(0)), Some(42));
}
