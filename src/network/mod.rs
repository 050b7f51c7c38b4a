//! Network subsystem for UDP audio transport

pub mod udp;
pub mod sender;
pub mod receiver;

pub use udp::{bind_socket, create_socket, resolve};
pub use sender::{SenderStats, Transport, UdpSender};
pub use receiver::{Observation, PacketReceiver, StreamMonitor};
