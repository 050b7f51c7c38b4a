//! UDP socket setup

use socket2::{Domain, Protocol, SockAddr, Socket, Type};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr, ToSocketAddrs, UdpSocket};

use crate::error::NetworkError;

/// Resolve `host:port` to the first address it names
pub fn resolve(addr: &str) -> Result<SocketAddr, NetworkError> {
    addr.to_socket_addrs()
        .map_err(|e| NetworkError::ResolveFailed(format!("{}: {}", addr, e)))?
        .next()
        .ok_or_else(|| NetworkError::ResolveFailed(addr.to_string()))
}

/// Create a UDP socket connected to `target`, bound to an ephemeral port
/// of the same address family
pub fn create_socket(
    target: SocketAddr,
    send_buffer_size: Option<usize>,
) -> Result<UdpSocket, NetworkError> {
    let socket = Socket::new(Domain::for_address(target), Type::DGRAM, Some(Protocol::UDP))
        .map_err(|e| NetworkError::BindFailed(e.to_string()))?;

    if let Some(size) = send_buffer_size {
        socket
            .set_send_buffer_size(size)
            .map_err(|e| NetworkError::BindFailed(format!("SO_SNDBUF {}: {}", size, e)))?;
    }

    let local: IpAddr = match target {
        SocketAddr::V4(_) => Ipv4Addr::UNSPECIFIED.into(),
        SocketAddr::V6(_) => Ipv6Addr::UNSPECIFIED.into(),
    };
    socket
        .bind(&SockAddr::from(SocketAddr::new(local, 0)))
        .map_err(|e| NetworkError::BindFailed(e.to_string()))?;

    socket
        .connect(&SockAddr::from(target))
        .map_err(|e| NetworkError::ConnectionFailed(format!("{}: {}", target, e)))?;

    Ok(socket.into())
}

/// Bind a receiving UDP socket on `addr`
pub fn bind_socket(addr: SocketAddr, recv_buffer_size: Option<usize>) -> Result<UdpSocket, NetworkError> {
    let socket = Socket::new(Domain::for_address(addr), Type::DGRAM, Some(Protocol::UDP))
        .map_err(|e| NetworkError::BindFailed(e.to_string()))?;

    socket
        .set_reuse_address(true)
        .map_err(|e| NetworkError::BindFailed(e.to_string()))?;

    if let Some(size) = recv_buffer_size {
        socket
            .set_recv_buffer_size(size)
            .map_err(|e| NetworkError::BindFailed(format!("SO_RCVBUF {}: {}", size, e)))?;
    }

    socket
        .bind(&SockAddr::from(addr))
        .map_err(|e| NetworkError::BindFailed(format!("{}: {}", addr, e)))?;

    Ok(socket.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve() {
        let addr = resolve("127.0.0.1:8081").unwrap();
        assert_eq!(addr.port(), 8081);
        assert!(resolve("not an address").is_err());
    }

    #[test]
    fn test_connected_socket_reaches_listener() {
        let listener = bind_socket("127.0.0.1:0".parse().unwrap(), None).unwrap();
        let target = listener.local_addr().unwrap();

        let socket = create_socket(target, Some(64 * 1024)).unwrap();
        assert_eq!(socket.peer_addr().unwrap(), target);
        socket.send(b"ping").unwrap();

        let mut buf = [0u8; 16];
        let (n, _) = listener.recv_from(&mut buf).unwrap();
        assert_eq!(&buf[..n], b"ping");
    }
}
