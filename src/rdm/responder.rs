//! RDM responder.
//!
//! Parses controller requests, answers from its [`DeviceIdentity`] and hands
//! the framed reply to a [`DmxPort`] for the line turnaround.
//!
//! ```text
//!   bytes ──▶ validate_header ──▶ DISCOVERY ─▶ unique branch / mute / un-mute
//!                              ├─▶ GET ───────▶ parameter table ─▶ ACK | NACK
//!                              └─▶ SET ───────▶ parameter table ─▶ ACK | NACK
//! ```
//!
//! GET and SET are answered only when addressed to our UID or to the
//! broadcast UID; broadcast requests still get a reply on this node.

use core::fmt::Write as _;

use log::{debug, info, warn};

use crate::app::ports::{RdmBytes, StoragePort};
use crate::dmx::{DmxPort, FrameTransport, PortError};

use super::layout::*;
use super::message::{
    RdmRequest, ResponseFields, encode_discovery_response, encode_response, parse_request,
};
use super::uid::Uid;

pub type Label = heapless::String<MAX_LABEL_LEN>;
type ParamData = heapless::Vec<u8, MAX_PARAMETER_DATA_LENGTH>;

const STORAGE_NAMESPACE: &str = "rdm";
const POWER_CYCLES_KEY: &str = "pwr_cycles";

/// PIDs beyond the E1.20 required set, reported by SUPPORTED_PARAMETERS.
const SUPPORTED_PIDS: [u16; 5] = [
    PID_DEVICE_MODEL_DESCRIPTION,
    PID_MANUFACTURER_LABEL,
    PID_DEVICE_LABEL,
    PID_DEVICE_POWER_CYCLES,
    PID_SUPPORTED_PARAMETERS,
];

/// Truncate to the 32-character RDM label limit on a char boundary.
pub fn label(s: &str) -> Label {
    let mut out = Label::new();
    for c in s.chars() {
        if out.push(c).is_err() {
            break;
        }
    }
    out
}

/// What this device says about itself over RDM.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceIdentity {
    pub uid: Uid,
    pub manufacturer: Label,
    pub model: Label,
    pub label: Label,
    pub dmx_start_address: u16,
    pub identify: bool,
    pub power_cycles: u32,
    pub personality: u8,
}

impl DeviceIdentity {
    pub fn new(uid: Uid) -> Self {
        Self {
            uid,
            manufacturer: label("ACME"),
            model: label("ESP32-DMX"),
            label: label("DMX Node"),
            dmx_start_address: 1,
            identify: false,
            power_cycles: 0,
            personality: 1,
        }
    }

    /// Build the identity for this boot: load the persisted power-cycle
    /// counter, count this boot and write it back.
    pub fn boot<S: StoragePort>(uid: Uid, storage: &mut S) -> Self {
        let mut identity = Self::new(uid);
        let mut buf = [0u8; 4];
        let previous = match storage.read(STORAGE_NAMESPACE, POWER_CYCLES_KEY, &mut buf) {
            Ok(4) => u32::from_le_bytes(buf),
            _ => 0,
        };
        identity.power_cycles = previous.wrapping_add(1);
        if let Err(e) = storage.write(
            STORAGE_NAMESPACE,
            POWER_CYCLES_KEY,
            &identity.power_cycles.to_le_bytes(),
        ) {
            warn!("DeviceIdentity: power-cycle counter not persisted ({})", e);
        }
        info!(
            "DeviceIdentity: uid={} power_cycles={}",
            identity.uid, identity.power_cycles
        );
        identity
    }

    fn device_info(&self) -> [u8; DEVICE_INFO_SIZE] {
        let mut d = [0u8; DEVICE_INFO_SIZE];
        d[0..2].copy_from_slice(&RDM_PROTOCOL_VERSION.to_be_bytes());
        d[2..4].copy_from_slice(&DEVICE_MODEL_ID.to_be_bytes());
        d[4..6].copy_from_slice(&PRODUCT_CATEGORY.to_be_bytes());
        d[6..10].copy_from_slice(&SOFTWARE_VERSION_ID.to_be_bytes());
        d[10..12].copy_from_slice(&DMX_FOOTPRINT.to_be_bytes());
        // current personality, personality count
        d[12] = self.personality;
        d[13] = 1;
        d[14..16].copy_from_slice(&self.dmx_start_address.to_be_bytes());
        // sub-device count and sensor count stay zero
        d
    }
}

/// A framed reply ready for the line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RdmResponse {
    pub bytes: RdmBytes,
    /// Discovery unique-branch replies go out without break/MAB.
    pub with_break: bool,
    pub command_class: u8,
    pub pid: u16,
    pub nack: bool,
}

pub struct RdmResponder {
    identity: DeviceIdentity,
    discovery_enabled: bool,
    muted: bool,
    transaction: u8,
    handled: u32,
}

impl RdmResponder {
    pub fn new(identity: DeviceIdentity) -> Self {
        Self {
            identity,
            discovery_enabled: true,
            muted: false,
            transaction: 0,
            handled: 0,
        }
    }

    pub fn uid(&self) -> Uid {
        self.identity.uid
    }

    pub fn identity(&self) -> &DeviceIdentity {
        &self.identity
    }

    pub fn is_muted(&self) -> bool {
        self.muted
    }

    pub fn handled(&self) -> u32 {
        self.handled
    }

    pub fn set_device_info(&mut self, manufacturer: &str, model: &str, device_label: &str) {
        self.identity.manufacturer = label(manufacturer);
        self.identity.model = label(model);
        self.identity.label = label(device_label);
    }

    /// Values outside 1..=512 are ignored.
    pub fn set_dmx_start_address(&mut self, address: u16) -> bool {
        if (1..=512).contains(&address) {
            self.identity.dmx_start_address = address;
            true
        } else {
            false
        }
    }

    pub fn enable_discovery(&mut self, enable: bool) {
        self.discovery_enabled = enable;
    }

    fn addressed_to_us(&self, dest: Uid) -> bool {
        dest == self.identity.uid || dest.is_broadcast()
    }

    /// Decode one request and build the reply, if any. Malformed input,
    /// foreign destinations and unknown command classes yield `None`.
    pub fn handle_command(&mut self, bytes: &[u8]) -> Option<RdmResponse> {
        let req = match parse_request(bytes) {
            Ok(r) => r,
            Err(e) => {
                debug!("RdmResponder: dropped request ({})", e);
                return None;
            }
        };
        let h = req.header;
        if !self.addressed_to_us(h.destination) {
            return None;
        }

        let response = match h.command_class {
            DISCOVERY_COMMAND if self.discovery_enabled => self.handle_discovery(&req),
            GET_COMMAND => Some(self.handle_get(&req)),
            SET_COMMAND => Some(self.handle_set(&req)),
            _ => None,
        };
        if response.is_some() {
            self.handled = self.handled.wrapping_add(1);
        }
        response
    }

    /// Handle `bytes` and put the reply on `port`'s line.
    pub fn respond<T: FrameTransport>(
        &mut self,
        bytes: &[u8],
        port: &mut DmxPort<T>,
    ) -> Result<Option<RdmResponse>, PortError> {
        let Some(response) = self.handle_command(bytes) else {
            return Ok(None);
        };
        port.send_rdm(&response.bytes, response.with_break)?;
        Ok(Some(response))
    }

    // ── Discovery ─────────────────────────────────────────────

    fn handle_discovery(&mut self, req: &RdmRequest<'_>) -> Option<RdmResponse> {
        match req.header.pid {
            PID_DISC_UNIQUE_BRANCH => {
                if self.muted || req.data.len() < 12 {
                    return None;
                }
                let lower = Uid::new(req.data[0..6].try_into().ok()?);
                let upper = Uid::new(req.data[6..12].try_into().ok()?);
                if self.identity.uid < lower || self.identity.uid > upper {
                    return None;
                }
                let mut bytes = RdmBytes::new();
                let _ = bytes.extend_from_slice(&encode_discovery_response(self.identity.uid));
                Some(RdmResponse {
                    bytes,
                    with_break: false,
                    command_class: DISCOVERY_COMMAND_RESPONSE,
                    pid: PID_DISC_UNIQUE_BRANCH,
                    nack: false,
                })
            }
            PID_DISC_MUTE | PID_DISC_UN_MUTE => {
                self.muted = req.header.pid == PID_DISC_MUTE;
                debug!("RdmResponder: muted={}", self.muted);
                // Control field: no sub-devices, no proxy, no boot-loader.
                Some(self.frame(req, RESPONSE_TYPE_ACK, DISCOVERY_COMMAND_RESPONSE, &[0, 0]))
            }
            _ => None,
        }
    }

    // ── GET ───────────────────────────────────────────────────

    fn handle_get(&mut self, req: &RdmRequest<'_>) -> RdmResponse {
        if req.header.sub_device != ROOT_DEVICE {
            return self.nack(req, GET_COMMAND_RESPONSE, NR_SUB_DEVICE_OUT_OF_RANGE);
        }
        match self.get_parameter(req.header.pid) {
            Ok(data) => self.frame(req, RESPONSE_TYPE_ACK, GET_COMMAND_RESPONSE, &data),
            Err(reason) => self.nack(req, GET_COMMAND_RESPONSE, reason),
        }
    }

    fn get_parameter(&self, pid: u16) -> Result<ParamData, u16> {
        let id = &self.identity;
        let mut data = ParamData::new();
        match pid {
            PID_DEVICE_INFO => {
                let _ = data.extend_from_slice(&id.device_info());
            }
            PID_DMX_START_ADDRESS => {
                let _ = data.extend_from_slice(&id.dmx_start_address.to_be_bytes());
            }
            PID_IDENTIFY_DEVICE => {
                let _ = data.push(u8::from(id.identify));
            }
            PID_DEVICE_MODEL_DESCRIPTION => {
                let _ = data.extend_from_slice(id.model.as_bytes());
            }
            PID_MANUFACTURER_LABEL => {
                let _ = data.extend_from_slice(id.manufacturer.as_bytes());
            }
            PID_DEVICE_LABEL => {
                let _ = data.extend_from_slice(id.label.as_bytes());
            }
            PID_SOFTWARE_VERSION_LABEL => {
                let mut text = Label::new();
                let _ = write!(text, "artnode {}", env!("CARGO_PKG_VERSION"));
                let _ = data.extend_from_slice(text.as_bytes());
            }
            PID_DEVICE_POWER_CYCLES => {
                let _ = data.extend_from_slice(&id.power_cycles.to_be_bytes());
            }
            PID_SUPPORTED_PARAMETERS => {
                for pid in SUPPORTED_PIDS {
                    let _ = data.extend_from_slice(&pid.to_be_bytes());
                }
            }
            _ => return Err(NR_UNKNOWN_PID),
        }
        Ok(data)
    }

    // ── SET ───────────────────────────────────────────────────

    fn handle_set(&mut self, req: &RdmRequest<'_>) -> RdmResponse {
        let sub = req.header.sub_device;
        if sub != ROOT_DEVICE && sub != ALL_SUB_DEVICES {
            return self.nack(req, SET_COMMAND_RESPONSE, NR_SUB_DEVICE_OUT_OF_RANGE);
        }
        match self.set_parameter(req.header.pid, req.data) {
            Ok(()) => self.frame(req, RESPONSE_TYPE_ACK, SET_COMMAND_RESPONSE, &[]),
            Err(reason) => self.nack(req, SET_COMMAND_RESPONSE, reason),
        }
    }

    fn set_parameter(&mut self, pid: u16, data: &[u8]) -> Result<(), u16> {
        match pid {
            PID_DMX_START_ADDRESS => {
                let bytes: [u8; 2] = data.try_into().map_err(|_| NR_FORMAT_ERROR)?;
                let address = u16::from_be_bytes(bytes);
                if self.set_dmx_start_address(address) {
                    info!("RdmResponder: start address -> {}", address);
                    Ok(())
                } else {
                    Err(NR_DATA_OUT_OF_RANGE)
                }
            }
            PID_IDENTIFY_DEVICE => {
                self.identity.identify = match data.first() {
                    Some(&v) => v != 0,
                    None => !self.identity.identify,
                };
                info!("RdmResponder: identify={}", self.identity.identify);
                Ok(())
            }
            PID_DEVICE_LABEL => {
                if data.len() > MAX_LABEL_LEN {
                    return Err(NR_FORMAT_ERROR);
                }
                let text = core::str::from_utf8(data).map_err(|_| NR_FORMAT_ERROR)?;
                self.identity.label = label(text);
                Ok(())
            }
            PID_DEVICE_INFO
            | PID_DEVICE_MODEL_DESCRIPTION
            | PID_MANUFACTURER_LABEL
            | PID_SOFTWARE_VERSION_LABEL
            | PID_DEVICE_POWER_CYCLES
            | PID_SUPPORTED_PARAMETERS => Err(NR_UNSUPPORTED_COMMAND_CLASS),
            _ => Err(NR_UNKNOWN_PID),
        }
    }

    // ── Framing ───────────────────────────────────────────────

    fn frame(
        &mut self,
        req: &RdmRequest<'_>,
        response_type: u8,
        command_class: u8,
        data: &[u8],
    ) -> RdmResponse {
        let fields = ResponseFields {
            source: self.identity.uid,
            transaction: self.transaction,
            response_type,
            command_class,
        };
        self.transaction = self.transaction.wrapping_add(1);
        RdmResponse {
            bytes: encode_response(&req.header, fields, data),
            with_break: true,
            command_class,
            pid: req.header.pid,
            nack: response_type == RESPONSE_TYPE_NACK_REASON,
        }
    }

    fn nack(&mut self, req: &RdmRequest<'_>, command_class: u8, reason: u16) -> RdmResponse {
        debug!(
            "RdmResponder: NACK pid={:#06x} reason={:#06x}",
            req.header.pid, reason
        );
        self.frame(
            req,
            RESPONSE_TYPE_NACK_REASON,
            command_class,
            &reason.to_be_bytes(),
        )
    }
}
