//! ArtNode firmware main entry point.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  UdpNetwork     PixelBuffer    LogEventSink   NvsAdapter       │
//! │  (NetworkPort)  (PixelSink)    (EventSink)    (Config+NVS)     │
//! │  UartTransport  MonotonicClock                                 │
//! │  (FrameTransport) (DelayNs)                                    │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌──────────────────────────┐      ┌────────────────────────┐  │
//! │  │ NetworkContext (core 0)  │ ───▶ │ OutputContext (core 1) │  │
//! │  │ ArtNetNode               │ ◀─── │ DmxPort · RdmResponder │  │
//! │  └──────────────────────────┘      └────────────────────────┘  │
//! └────────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

use core::net::Ipv4Addr;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use esp_idf_hal::gpio::{AnyOutputPin, PinDriver};
use esp_idf_hal::peripherals::Peripherals;
use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::nvs::EspDefaultNvsPartition;
use esp_idf_svc::wifi::{AuthMethod, BlockingWifi, ClientConfiguration, Configuration, EspWifi};
use log::{info, warn};

use artnode::adapters::device_id;
use artnode::adapters::log_sink::LogEventSink;
use artnode::adapters::nvs::NvsAdapter;
use artnode::adapters::pixel_sink::PixelBuffer;
use artnode::adapters::time::MonotonicClock;
use artnode::adapters::udp::UdpNetwork;
use artnode::app::context::NodeContext;
use artnode::app::events::AppEvent;
use artnode::app::ports::{ConfigPort, EventSink};
use artnode::artnet::ARTNET_PORT;
use artnode::config::NodeConfig;
use artnode::drivers::uart_dmx::UartTransport;
use artnode::pins;
use artnode::rdm::DeviceIdentity;

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("╔══════════════════════════════════════╗");
    info!("║  ArtNode v{}                         ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    let peripherals = Peripherals::take()?;
    let sysloop = EspSystemEventLoop::take()?;
    let nvs_partition = EspDefaultNvsPartition::take()?;

    // ── 2. Load config from NVS (or defaults) ─────────────────
    let mut nvs = NvsAdapter::new().map_err(|e| anyhow!("NVS init failed: {e}"))?;
    let config = match nvs.load() {
        Ok(cfg) => {
            info!("Config loaded from NVS");
            cfg
        }
        Err(e) => {
            warn!("NVS config load failed ({}), using defaults", e);
            NodeConfig::default()
        }
    };

    // ── 3. Identity ───────────────────────────────────────────
    let mac = device_id::read_mac();
    let uid = device_id::uid(&mac);
    let hostname = device_id::hostname(&mac);
    let identity = DeviceIdentity::boot(uid, &mut nvs);
    info!("Device {} (UID {})", hostname, uid);

    // ── 4. Station bring-up ───────────────────────────────────
    let mut wifi = BlockingWifi::wrap(
        EspWifi::new(peripherals.modem, sysloop.clone(), Some(nvs_partition))?,
        sysloop,
    )?;
    let local_ip = match nvs.wifi_credentials() {
        Some((ssid, pass)) => {
            wifi.set_configuration(&Configuration::Client(ClientConfiguration {
                ssid: ssid.as_str().try_into().map_err(|_| anyhow!("SSID too long"))?,
                password: pass.as_str().try_into().map_err(|_| anyhow!("password too long"))?,
                auth_method: if pass.is_empty() {
                    AuthMethod::None
                } else {
                    AuthMethod::WPA2Personal
                },
                ..Default::default()
            }))?;
            wifi.wifi_mut().sta_netif_mut().set_hostname(&hostname)?;
            wifi.start()?;
            wifi.connect().context("Wi-Fi connect")?;
            wifi.wait_netif_up()?;
            let ip = wifi.wifi().sta_netif().get_ip_info()?.ip;
            info!("Wi-Fi: connected to '{}' as {}", ssid, ip);
            ip
        }
        None => {
            warn!("No Wi-Fi credentials provisioned; listening on all interfaces");
            Ipv4Addr::UNSPECIFIED
        }
    };

    // ── 5. Adapters ───────────────────────────────────────────
    let network = UdpNetwork::bind(ARTNET_PORT, local_ip)
        .map_err(|e| anyhow!("Art-Net socket: {e}"))?;
    let pixels = PixelBuffer::new(config.pixel_count, config.pixel_brightness);
    // SAFETY: the direction GPIO is claimed by nothing else on this board.
    let dir = PinDriver::output(unsafe { AnyOutputPin::new(pins::DMX_DIR_GPIO) })?;
    let transport = UartTransport::new(pins::DMX_PORT, dir, MonotonicClock::new())
        .map_err(|e| anyhow!("DMX UART: {e}"))?;

    // ── 6. Contexts ───────────────────────────────────────────
    let node = NodeContext::new(&config, transport, identity, network, pixels, mac)?;
    let mut events = LogEventSink::new();
    events.emit(&AppEvent::Started {
        uid,
        port_address: config.address.port_address(),
    });

    let interval = Duration::from_micros(u64::from(config.refresh_interval_us));
    let (_output, network) = node.spawn_output(interval, LogEventSink::new())?;

    // Keep the station alive for the lifetime of the receive loop.
    let _wifi = wifi;
    network.run(nvs, events)
}
