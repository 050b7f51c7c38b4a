//! Per-stream packet sequencing
//!
//! A sequencer hands out frame numbers densely: a number is consumed only
//! when a packet is built, so a chunk that never makes it through the
//! encoder leaves no hole. A datagram that fails to send after being built
//! still owns its number.

use bytes::Bytes;
use chrono::Utc;

use crate::protocol::packet::{MessageType, Packet};

/// Current wall-clock time in microseconds since the Unix epoch
pub fn now_micros() -> u64 {
    u64::try_from(Utc::now().timestamp_micros()).unwrap_or(0)
}

/// Builds successive packets for one logical stream
#[derive(Debug)]
pub struct Sequencer {
    stream_id: u32,
    sample_rate: u32,
    signature: u32,
    next_frame: u32,
}

impl Sequencer {
    pub fn new(stream_id: u32, sample_rate: u32, signature: u32) -> Self {
        Self {
            stream_id,
            sample_rate,
            signature,
            next_frame: 0,
        }
    }

    /// Wrap `frame` in the next packet, stamped with the current time
    pub fn next_packet(&mut self, frame: Bytes) -> Packet {
        self.next_packet_at(frame, now_micros())
    }

    /// Wrap `frame` in the next packet with an explicit timestamp
    pub fn next_packet_at(&mut self, frame: Bytes, timestamp_us: u64) -> Packet {
        let frame_number = self.next_frame;
        self.next_frame = self.next_frame.wrapping_add(1);

        Packet {
            signature: self.signature,
            message_type: MessageType::Audio,
            stream_id: self.stream_id,
            frame_number,
            timestamp_us,
            sample_rate: self.sample_rate,
            frame,
        }
    }

    pub fn stream_id(&self) -> u32 {
        self.stream_id
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Frame number the next packet will carry
    pub fn next_frame_number(&self) -> u32 {
        self.next_frame
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::SIGNATURE;

    #[test]
    fn test_frame_numbers_start_at_zero_and_increase() {
        let mut seq = Sequencer::new(3, 48000, SIGNATURE);
        let numbers: Vec<u32> = (0..5)
            .map(|_| seq.next_packet(Bytes::from_static(b"x")).frame_number)
            .collect();
        assert_eq!(numbers, vec![0, 1, 2, 3, 4]);
        assert_eq!(seq.next_frame_number(), 5);
    }

    #[test]
    fn test_packet_fields() {
        let mut seq = Sequencer::new(11, 16000, 0xABCD_0123);
        let packet = seq.next_packet_at(Bytes::from_static(&[1, 2, 3]), 99);

        assert_eq!(packet.stream_id, 11);
        assert_eq!(packet.sample_rate, 16000);
        assert_eq!(packet.signature, 0xABCD_0123);
        assert_eq!(packet.message_type, MessageType::Audio);
        assert_eq!(packet.timestamp_us, 99);
        assert_eq!(packet.frame_length(), 3);
    }

    #[test]
    fn test_timestamp_is_microseconds() {
        let before = now_micros();
        let mut seq = Sequencer::new(1, 48000, SIGNATURE);
        let packet = seq.next_packet(Bytes::new());
        let after = now_micros();

        assert!(packet.timestamp_us >= before && packet.timestamp_us <= after);
        // Anything after 2001 in microseconds is above 1e15
        assert!(packet.timestamp_us > 1_000_000_000_000_000);
    }

    #[test]
    fn test_frame_number_wraps() {
        let mut seq = Sequencer::new(1, 48000, SIGNATURE);
        seq.next_frame = u32::MAX;
        assert_eq!(seq.next_packet(Bytes::new()).frame_number, u32::MAX);
        assert_eq!(seq.next_packet(Bytes::new()).frame_number, 0);
    }
}
