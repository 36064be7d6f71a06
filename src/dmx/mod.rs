//! DMX512 output path: frame buffer, byte transport, per-port engine and
//! the hand-off shared with the network task.

pub mod engine;
pub mod frame;
pub mod shared;
pub mod transport;

pub use engine::{DmxPort, FrameTiming, PortDirection, PortError, PortState};
pub use frame::{DMX_CHANNELS, DMX_FRAME_LEN, DmxFrame};
pub use shared::{FrameWriter, PortShared, RdmForwarder, ResponderSettings};
pub use transport::{FrameTransport, LineDirection, TransportError};
