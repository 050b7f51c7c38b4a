//! Datagram sending

use std::net::{SocketAddr, UdpSocket};

use crate::config::NetworkConfig;
use crate::constants::MAX_PACKET_SIZE;
use crate::error::NetworkError;
use crate::network::udp::{create_socket, resolve};

/// Transport stage of the pipeline: one datagram per call, best effort
pub trait Transport {
    fn send(&mut self, datagram: &[u8]) -> Result<usize, NetworkError>;
}

/// Sender statistics
#[derive(Debug, Clone, Default)]
pub struct SenderStats {
    pub packets_sent: u64,
    pub bytes_sent: u64,
    pub send_errors: u64,
}

/// Connected UDP sender
pub struct UdpSender {
    socket: UdpSocket,
    target: SocketAddr,
    stats: SenderStats,
}

impl UdpSender {
    /// Resolve the configured collector and connect a socket to it
    pub fn connect(config: &NetworkConfig) -> Result<Self, NetworkError> {
        let target = resolve(&config.server_addr)?;
        Self::connect_to(target, config.send_buffer_size)
    }

    pub fn connect_to(target: SocketAddr, send_buffer_size: Option<usize>) -> Result<Self, NetworkError> {
        let socket = create_socket(target, send_buffer_size)?;
        tracing::info!("Sending to {}", target);

        Ok(Self {
            socket,
            target,
            stats: SenderStats::default(),
        })
    }

    pub fn target(&self) -> SocketAddr {
        self.target
    }

    pub fn stats(&self) -> &SenderStats {
        &self.stats
    }
}

impl Transport for UdpSender {
    fn send(&mut self, datagram: &[u8]) -> Result<usize, NetworkError> {
        if datagram.len() > MAX_PACKET_SIZE {
            self.stats.send_errors += 1;
            return Err(NetworkError::PacketTooLarge(datagram.len()));
        }

        match self.socket.send(datagram) {
            Ok(n) => {
                self.stats.packets_sent += 1;
                self.stats.bytes_sent += n as u64;
                Ok(n)
            }
            Err(e) => {
                self.stats.send_errors += 1;
                Err(NetworkError::SendFailed(e.to_string()))
            }
        }
    }
}
