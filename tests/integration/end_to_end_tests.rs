//! End-to-end: datagrams in through the network context, bytes out of the
//! DMX line, with both task contexts driven step by step.

use std::time::{Duration, Instant};

use artnode::adapters::pixel_sink::{PixelBuffer, Rgb};
use artnode::app::context::NodeContext;
use artnode::app::events::AppEvent;
use artnode::artnet::PacketOutcome;
use artnode::artnet::layout::{OP_DMX, OP_RDM, RDM_PAYLOAD_OFFSET};
use artnode::config::NodeConfig;
use artnode::rdm::DeviceIdentity;
use artnode::rdm::layout::{GET_COMMAND, PID_DMX_START_ADDRESS, SET_COMMAND};

use crate::mock_hw::{
    LogSink, MockLine, MockNet, MockNvs, MockPixels, NODE_MAC, art_dmx, art_dmx_seq, art_rdm,
    art_sync, controller, node_uid, rdm_request, reply_data,
};

fn node_with<P: artnode::app::ports::PixelSink>(
    config: &NodeConfig,
    pixels: P,
) -> NodeContext<MockLine, MockNet, P> {
    NodeContext::new(
        config,
        MockLine::default(),
        DeviceIdentity::new(node_uid()),
        MockNet::default(),
        pixels,
        NODE_MAC,
    )
    .unwrap()
}

#[test]
fn two_channel_dmx_reaches_frame_and_pixel_sink() {
    let config = NodeConfig::default();
    let (mut output, mut network) = node_with(&config, MockPixels::default()).split();
    let mut sink = LogSink::new();

    network
        .node_mut()
        .network_mut()
        .push(art_dmx_seq(1, 0x00, 0, &[255, 128]), controller(20));
    assert_eq!(network.poll_once(&mut sink), PacketOutcome::Handled(OP_DMX));
    assert!(output.run_once(&mut sink));

    assert_eq!(output.port().channel(0), 255);
    assert_eq!(output.port().channel(1), 128);
    assert_eq!(output.port().channel(2), 0);

    let frame = output.port().transport().frames()[0].to_vec();
    assert_eq!(&frame[..4], &[0, 255, 128, 0]);

    let calls = &network.node().pixels().calls;
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].2, 2);
    assert_eq!(calls[0].1, vec![255, 128]);
}

#[test]
fn pixel_buffer_receives_rgb_triplets() {
    let mut config = NodeConfig::default();
    config.pixel_count = 2;
    let pixels = PixelBuffer::new(config.pixel_count, config.pixel_brightness);
    let (_output, mut network) = node_with(&config, pixels).split();
    let mut sink = LogSink::new();

    network
        .node_mut()
        .network_mut()
        .push(art_dmx(0, 0, &[1, 2, 3, 4, 5, 6, 7, 8, 9]), controller(20));
    network.poll_once(&mut sink);

    let px = network.node_mut().pixels_mut();
    assert_eq!(px.take_frame().map(<[Rgb]>::len), Some(2));
    assert_eq!(px.pixel(1), Some(Rgb { r: 4, g: 5, b: 6 }));
}

#[test]
fn latest_frame_wins_between_output_passes() {
    let mut config = NodeConfig::default();
    config.merge_mode = artnode::config::MergeMode::Ltp;
    let (mut output, mut network) = node_with(&config, MockPixels::default()).split();
    let mut sink = LogSink::new();

    for level in [10u8, 20, 30] {
        network
            .node_mut()
            .network_mut()
            .push(art_dmx(0, 0, &[level]), controller(20));
        network.poll_once(&mut sink);
    }
    output.run_once(&mut sink);

    assert_eq!(output.port().channel(0), 30);
    assert_eq!(output.port().transport().frames().len(), 1);
}

#[test]
fn rdm_set_over_artnet_moves_start_address() {
    let config = NodeConfig::default();
    let (mut output, mut network) = node_with(&config, MockPixels::default()).split();
    let mut sink = LogSink::new();

    let set = rdm_request(SET_COMMAND, PID_DMX_START_ADDRESS, node_uid(), &100u16.to_be_bytes());
    network.node_mut().network_mut().push(art_rdm(&set), controller(20));
    assert_eq!(network.poll_once(&mut sink), PacketOutcome::Handled(OP_RDM));

    output.run_once(&mut sink);
    assert_eq!(output.responder().identity().dmx_start_address, 100);
    assert_eq!(output.port().transport().rdm_writes().len(), 1);

    // The reply and the address change come back on the next network pass.
    network.poll_once(&mut sink);
    assert_eq!(network.node().config().address.start_address, 100);
    assert!(sink.events.iter().any(|e| matches!(
        e,
        AppEvent::AddressChanged(a) if a.start_address == 100
    )));

    let sent = &network.node().network().sent;
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].1, controller(20));
    let reply = &sent[0].0[RDM_PAYLOAD_OFFSET..];
    assert_eq!(reply[0], 0xCC);
    assert_eq!(reply[20], SET_COMMAND + 1);

    // DMX now lands at channel 100.
    network
        .node_mut()
        .network_mut()
        .push(art_dmx(0, 0, &[77]), controller(20));
    network.poll_once(&mut sink);
    output.run_once(&mut sink);
    assert_eq!(output.port().channel(99), 77);

    let get = rdm_request(GET_COMMAND, PID_DMX_START_ADDRESS, node_uid(), &[]);
    network.node_mut().network_mut().push(art_rdm(&get), controller(20));
    network.poll_once(&mut sink);
    output.run_once(&mut sink);
    network.poll_once(&mut sink);
    let sent = &network.node().network().sent;
    assert_eq!(reply_data(&sent[1].0[RDM_PAYLOAD_OFFSET..]), &100u16.to_be_bytes());
}

#[test]
fn local_config_change_is_reported_over_rdm() {
    let config = NodeConfig::default();
    let (mut output, mut network) = node_with(&config, MockPixels::default()).split();
    let mut sink = LogSink::new();

    let mut changed = network.node().config().clone();
    changed.address.start_address = 100;
    network.node_mut().set_config(changed).unwrap();

    let get = rdm_request(GET_COMMAND, PID_DMX_START_ADDRESS, node_uid(), &[]);
    network.node_mut().network_mut().push(art_rdm(&get), controller(20));
    network.poll_once(&mut sink);
    output.run_once(&mut sink);
    network.poll_once(&mut sink);

    let sent = &network.node().network().sent;
    assert_eq!(sent.len(), 1);
    assert_eq!(reply_data(&sent[0].0[RDM_PAYLOAD_OFFSET..]), &100u16.to_be_bytes());
}

#[test]
fn art_sync_flushes_held_frame_without_waiting() {
    let mut config = NodeConfig::default();
    config.sync_mode = true;
    let (mut output, mut network) = node_with(&config, MockPixels::default()).split();
    let mut sink = LogSink::new();

    network
        .node_mut()
        .network_mut()
        .push(art_dmx(0, 0, &[42]), controller(20));
    network.poll_once(&mut sink);
    network.node_mut().network_mut().push(art_sync(), controller(20));
    network.poll_once(&mut sink);

    let started = Instant::now();
    assert!(output.wait_for_next_frame(Duration::from_secs(10)));
    assert!(started.elapsed() < Duration::from_secs(1));
    assert!(output.run_once(&mut sink));

    let frames = output.port().transport().frames();
    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0][1], 42);
}

#[test]
fn line_fault_shows_in_telemetry_and_recovers() {
    let config = NodeConfig::default();
    let (mut output, mut network) = node_with(&config, MockPixels::default()).split();
    let mut sink = LogSink::new();

    output.port_mut().transport_mut().fail_writes = true;
    assert!(!output.run_once(&mut sink));
    network.poll_once(&mut sink);
    assert!(network.telemetry().port_faulted);
    assert_eq!(sink.count(|e| matches!(e, AppEvent::PortFault { port: 0, .. })), 1);

    output.port_mut().transport_mut().fail_writes = false;
    output.retry_now();
    assert!(output.run_once(&mut sink));
    network.poll_once(&mut sink);
    assert!(!network.telemetry().port_faulted);
    assert_eq!(network.telemetry().frames_sent, 1);
}

#[test]
fn address_change_is_persisted() {
    let config = NodeConfig::default();
    let (_output, mut network) = node_with(&config, MockPixels::default()).split();
    let store = MockNvs::new();
    let mut sink = LogSink::new();

    network
        .node_mut()
        .network_mut()
        .push(crate::mock_hw::art_address_none(2, 3, 4), controller(20));
    network.poll_once(&mut sink);

    assert!(network.persist_if_changed(&store));
    let saved = store.config.borrow().clone().expect("saved");
    assert_eq!((saved.address.net, saved.address.subnet, saved.address.universe), (2, 3, 4));
    assert_eq!(*store.saves.borrow(), 1);
}
