//! Collector-side packet intake and per-stream loss tracking
//!
//! This is a diagnostic receiver: it decodes datagrams and reports what
//! arrived. It does not buffer or play audio.

use std::collections::HashMap;
use std::net::{SocketAddr, UdpSocket};

use crate::error::{NetworkError, ProtocolError};
use crate::protocol::Packet;

/// Classification of one packet against its stream's history
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Observation {
    /// First packet seen for this stream id
    NewStream,
    /// Exactly the expected frame number
    InOrder,
    /// Frames were skipped before this one
    Gap { missing: u32 },
    /// Older than the expected frame: reordered or duplicated
    Late { behind: u32 },
}

/// Running totals for one stream
#[derive(Debug, Clone, Default)]
pub struct StreamStats {
    pub received: u64,
    pub lost: u64,
    pub late: u64,
    pub bytes: u64,
    pub sample_rate: u32,
    pub last_timestamp_us: u64,
    next_expected: u32,
}

impl StreamStats {
    pub fn loss_rate(&self) -> f32 {
        if self.received + self.lost == 0 {
            0.0
        } else {
            self.lost as f32 / (self.received + self.lost) as f32
        }
    }
}

/// Tracks frame numbering of every stream id seen
#[derive(Debug, Default)]
pub struct StreamMonitor {
    streams: HashMap<u32, StreamStats>,
}

impl StreamMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `packet` and classify it
    pub fn observe(&mut self, packet: &Packet) -> Observation {
        let frame = packet.frame_number;
        let mut is_new = false;
        let stats = self.streams.entry(packet.stream_id).or_insert_with(|| {
            is_new = true;
            StreamStats {
                next_expected: frame,
                ..StreamStats::default()
            }
        });

        stats.received += 1;
        stats.bytes += packet.frame.len() as u64;
        stats.sample_rate = packet.sample_rate;

        let ahead = frame.wrapping_sub(stats.next_expected);
        let observation = if is_new {
            Observation::NewStream
        } else if ahead == 0 {
            Observation::InOrder
        } else if ahead < u32::MAX / 2 {
            stats.lost += ahead as u64;
            Observation::Gap { missing: ahead }
        } else {
            // A late arrival fills a hole counted as lost earlier
            stats.late += 1;
            stats.lost = stats.lost.saturating_sub(1);
            return Observation::Late {
                behind: stats.next_expected.wrapping_sub(frame),
            };
        };

        stats.next_expected = frame.wrapping_add(1);
        stats.last_timestamp_us = packet.timestamp_us;
        observation
    }

    pub fn stream(&self, stream_id: u32) -> Option<&StreamStats> {
        self.streams.get(&stream_id)
    }

    /// All streams, ordered by id
    pub fn streams(&self) -> Vec<(u32, &StreamStats)> {
        let mut streams: Vec<_> = self.streams.iter().map(|(id, s)| (*id, s)).collect();
        streams.sort_by_key(|(id, _)| *id);
        streams
    }
}

/// Receiver statistics
#[derive(Debug, Clone, Default)]
pub struct ReceiverStats {
    pub packets_received: u64,
    pub bytes_received: u64,
    pub invalid_packets: u64,
}

/// Bound UDP socket decoding incoming datagrams
pub struct PacketReceiver {
    socket: UdpSocket,
    signature: u32,
    buffer: Vec<u8>,
    stats: ReceiverStats,
}

impl PacketReceiver {
    pub fn new(socket: UdpSocket, signature: u32) -> Self {
        Self {
            socket,
            signature,
            buffer: vec![0u8; 65536],
            stats: ReceiverStats::default(),
        }
    }

    pub fn local_addr(&self) -> Result<SocketAddr, NetworkError> {
        self.socket
            .local_addr()
            .map_err(NetworkError::ReceiveFailed)
    }

    /// Block for one datagram and decode it.
    ///
    /// The outer error is a socket failure; the inner one a malformed packet.
    pub fn recv(&mut self) -> Result<(SocketAddr, Result<Packet, ProtocolError>), NetworkError> {
        let (len, from) = self
            .socket
            .recv_from(&mut self.buffer)
            .map_err(NetworkError::ReceiveFailed)?;

        self.stats.packets_received += 1;
        self.stats.bytes_received += len as u64;

        let decoded = Packet::decode_with_signature(&self.buffer[..len], self.signature);
        if decoded.is_err() {
            self.stats.invalid_packets += 1;
        }
        Ok((from, decoded))
    }

    pub fn stats(&self) -> &ReceiverStats {
        &self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::udp::bind_socket;
    use crate::protocol::SIGNATURE;
    use bytes::Bytes;

    fn packet(stream_id: u32, frame_number: u32) -> Packet {
        Packet::audio(stream_id, frame_number, 0, 48000, Bytes::from_static(&[0; 10]))
    }

    #[test]
    fn test_in_order_stream() {
        let mut monitor = StreamMonitor::new();
        assert_eq!(monitor.observe(&packet(1, 0)), Observation::NewStream);
        assert_eq!(monitor.observe(&packet(1, 1)), Observation::InOrder);
        assert_eq!(monitor.observe(&packet(1, 2)), Observation::InOrder);

        let stats = monitor.stream(1).unwrap();
        assert_eq!(stats.received, 3);
        assert_eq!(stats.lost, 0);
        assert_eq!(stats.bytes, 30);
    }

    #[test]
    fn test_gap_and_late() {
        let mut monitor = StreamMonitor::new();
        monitor.observe(&packet(1, 0));
        assert_eq!(monitor.observe(&packet(1, 3)), Observation::Gap { missing: 2 });
        assert_eq!(monitor.stream(1).unwrap().lost, 2);

        assert_eq!(monitor.observe(&packet(1, 2)), Observation::Late { behind: 2 });
        assert_eq!(monitor.stream(1).unwrap().lost, 1);
        assert_eq!(monitor.stream(1).unwrap().late, 1);

        assert_eq!(monitor.observe(&packet(1, 4)), Observation::InOrder);
    }

    #[test]
    fn test_streams_are_independent() {
        let mut monitor = StreamMonitor::new();
        monitor.observe(&packet(7, 0));
        assert_eq!(monitor.observe(&packet(9, 5)), Observation::NewStream);
        assert_eq!(monitor.observe(&packet(7, 1)), Observation::InOrder);
        assert_eq!(monitor.observe(&packet(9, 6)), Observation::InOrder);

        let ids: Vec<u32> = monitor.streams().iter().map(|(id, _)| *id).collect();
        assert_eq!(ids, vec![7, 9]);
    }

    #[test]
    fn test_wraparound_is_in_order() {
        let mut monitor = StreamMonitor::new();
        monitor.observe(&packet(1, u32::MAX));
        assert_eq!(monitor.observe(&packet(1, 0)), Observation::InOrder);
    }

    #[test]
    fn test_receiver_counts_invalid() {
        let socket = bind_socket("127.0.0.1:0".parse().unwrap(), None).unwrap();
        let addr = socket.local_addr().unwrap();
        let mut receiver = PacketReceiver::new(socket, SIGNATURE);

        let client = std::net::UdpSocket::bind("127.0.0.1:0").unwrap();
        client.send_to(&packet(3, 0).encode(), addr).unwrap();
        client.send_to(b"junk", addr).unwrap();

        let (_, first) = receiver.recv().unwrap();
        assert_eq!(first.unwrap().stream_id, 3);

        let (_, second) = receiver.recv().unwrap();
        assert!(matches!(second, Err(ProtocolError::Truncated { len: 4, .. })));

        assert_eq!(receiver.stats().packets_received, 2);
        assert_eq!(receiver.stats().invalid_packets, 1);
    }

    #[test]
    fn test_recv_timeout_is_distinguishable() {
        let socket = bind_socket("127.0.0.1:0".parse().unwrap(), None).unwrap();
        socket
            .set_read_timeout(Some(std::time::Duration::from_millis(20)))
            .unwrap();
        let mut receiver = PacketReceiver::new(socket, SIGNATURE);

        let err = receiver.recv().unwrap_err();
        assert!(err.is_timeout());
        assert_eq!(receiver.stats().packets_received, 0);

        let refused = NetworkError::ReceiveFailed(std::io::ErrorKind::ConnectionRefused.into());
        assert!(!refused.is_timeout());
    }
}
