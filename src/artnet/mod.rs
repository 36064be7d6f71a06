//! Art-Net 4 node: datagram decoding, dispatch and ArtPollReply.

pub mod layout;
pub mod node;
pub mod packet;
pub mod poll_reply;
pub mod status;

pub use layout::ARTNET_PORT;
pub use node::{ArtNetNode, NodeStats, PacketOutcome};
pub use packet::{ArtPacket, DropReason};
pub use status::ArtNetStatus;
