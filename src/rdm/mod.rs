//! Remote Device Management over the DMX512 line.

pub mod layout;
pub mod message;
pub mod responder;
pub mod uid;

pub use message::{RdmError, RdmHeader, RdmRequest, checksum, parse_request, validate_header};
pub use responder::{DeviceIdentity, RdmResponder, RdmResponse};
pub use uid::Uid;
