//! Fuzz target: `ArtNetNode::update`
//!
//! Feeds arbitrary datagrams through the full receive path and asserts
//! that it never panics, that anything without the Art-Net ID leaves the
//! node untouched, and that the staged frame never exceeds 512 channels.
//!
//! cargo fuzz run fuzz_artnet_packet

#![no_main]

use std::net::{Ipv4Addr, SocketAddr};

use artnode::app::events::AppEvent;
use artnode::app::ports::{EventSink, NetworkError, NetworkPort, PixelSink};
use artnode::artnet::ArtNetNode;
use artnode::config::NodeConfig;
use artnode::dmx::{DmxFrame, FrameWriter, PortShared, RdmForwarder};
use libfuzzer_sys::fuzz_target;

use critical_section as _;

struct OneShot(Option<Vec<u8>>);

impl NetworkPort for OneShot {
    fn receive(&mut self, buf: &mut [u8]) -> Option<(usize, SocketAddr)> {
        let data = self.0.take()?;
        let n = data.len().min(buf.len());
        buf[..n].copy_from_slice(&data[..n]);
        Some((n, SocketAddr::from((Ipv4Addr::LOCALHOST, 6454))))
    }
    fn send_to(&mut self, data: &[u8], _dest: SocketAddr) -> Result<(), NetworkError> {
        assert!(data.len() >= 10, "reply shorter than an Art-Net header");
        Ok(())
    }
    fn local_ip(&self) -> Ipv4Addr {
        Ipv4Addr::LOCALHOST
    }
}

struct Pixels;

impl PixelSink for Pixels {
    fn on_universe(&mut self, _universe: u16, payload: &[u8], length: usize) {
        assert!(length <= 512 && length <= payload.len());
    }
}

struct Silent;

impl EventSink for Silent {
    fn emit(&mut self, _event: &AppEvent) {}
}

fuzz_target!(|data: &[u8]| {
    let shared = PortShared::new();
    let mut node = ArtNetNode::new(
        OneShot(Some(data.to_vec())),
        FrameWriter::new(&shared),
        RdmForwarder::new(&shared),
        Pixels,
        NodeConfig::default(),
        [0; 6],
    );
    let before = node.stats();
    node.update(&mut Silent);

    if !data.starts_with(b"Art-Net\0") {
        assert_eq!(node.stats(), before);
    }
    let mut frame = DmxFrame::new();
    if shared.take_frame(&mut frame) {
        assert_eq!(frame.channels().len(), 512);
    }
});
