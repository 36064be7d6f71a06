//! UDP adapter for the Art-Net node.
//!
//! `std::net::UdpSocket` runs on both ESP-IDF (lwIP) and the host, so there
//! is no platform split here. The socket is non-blocking: [`NetworkPort::receive`]
//! returns `None` the moment nothing is queued.

use core::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::io::ErrorKind;
use std::net::UdpSocket;

use log::{info, warn};

use crate::app::ports::{NetworkError, NetworkPort};

pub struct UdpNetwork {
    socket: UdpSocket,
    local_ip: Ipv4Addr,
}

impl UdpNetwork {
    /// Bind `0.0.0.0:port` with broadcast enabled.
    ///
    /// `local_ip` is what ArtPollReply advertises; pass the station address
    /// once DHCP has finished.
    pub fn bind(port: u16, local_ip: Ipv4Addr) -> Result<Self, NetworkError> {
        let socket = UdpSocket::bind(SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, port))
            .map_err(|e| {
                warn!("UdpNetwork: bind :{} failed: {}", port, e);
                NetworkError::BindFailed
            })?;
        socket
            .set_nonblocking(true)
            .and_then(|()| socket.set_broadcast(true))
            .map_err(|_| NetworkError::BindFailed)?;
        info!("UdpNetwork: listening on :{} as {}", port, local_ip);
        Ok(Self { socket, local_ip })
    }

    /// Port actually bound (useful when binding port 0 in tests).
    pub fn local_port(&self) -> Option<u16> {
        self.socket.local_addr().ok().map(|a| a.port())
    }

    /// DHCP renewals can move the station address.
    pub fn set_local_ip(&mut self, ip: Ipv4Addr) {
        self.local_ip = ip;
    }
}

impl NetworkPort for UdpNetwork {
    fn receive(&mut self, buf: &mut [u8]) -> Option<(usize, SocketAddr)> {
        match self.socket.recv_from(buf) {
            Ok(received) => Some(received),
            Err(e) if e.kind() == ErrorKind::WouldBlock => None,
            Err(e) => {
                warn!("UdpNetwork: recv failed: {}", e);
                None
            }
        }
    }

    fn send_to(&mut self, data: &[u8], dest: SocketAddr) -> Result<(), NetworkError> {
        self.socket
            .send_to(data, dest)
            .map(|_| ())
            .map_err(|_| NetworkError::SendFailed)
    }

    fn local_ip(&self) -> Ipv4Addr {
        self.local_ip
    }
}
