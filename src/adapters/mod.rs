//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter      | Implements         | Connects to                 |
//! |--------------|--------------------|-----------------------------|
//! | `udp`        | NetworkPort        | lwIP / host UDP socket      |
//! | `pixel_sink` | PixelSink          | RGB frame for the LED strip |
//! | `log_sink`   | EventSink          | Serial log output           |
//! | `nvs`        | ConfigPort         | NVS / in-memory store       |
//! |              | StoragePort        |                             |
//! | `time`       | DelayNs            | ESP32 system timer          |
//! | `device_id`  | n/a                | eFuse MAC → UID, hostname   |

pub mod device_id;
pub mod log_sink;
pub mod nvs;
pub mod pixel_sink;
pub mod time;
pub mod udp;
