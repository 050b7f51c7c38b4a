//! Audio packet wire format
//!
//! Every datagram carries exactly one packet. All header fields are
//! big-endian and laid out back to back:
//!
//! ```text
//! 0       4  5       9       13              21      25      29
//! ├───────┼──┼───────┼───────┼───────────────┼───────┼───────┼──────────
//! │ sig   │ty│stream │ frame │ timestamp (µs)│ rate  │ len   │ payload…
//! └───────┴──┴───────┴───────┴───────────────┴───────┴───────┴──────────
//! ```
//!
//! The timestamp is microseconds since the Unix epoch (UTC).

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::ProtocolError;

/// Protocol magic carried in every packet
pub const SIGNATURE: u32 = 0x4C2A_E6CC;

/// Size of the fixed header in bytes
pub const HEADER_LEN: usize = 4 + 1 + 4 + 4 + 8 + 4 + 4;

/// Packet kind discriminator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum MessageType {
    /// Opus-compressed audio frame
    Audio = 0x00,
}

impl TryFrom<u8> for MessageType {
    type Error = ProtocolError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0x00 => Ok(MessageType::Audio),
            other => Err(ProtocolError::UnknownMessageType(other)),
        }
    }
}

impl From<MessageType> for u8 {
    fn from(ty: MessageType) -> Self {
        ty as u8
    }
}

/// One framed unit of audio on the wire.
///
/// The frame length field is not stored: it is always the length of
/// `frame`, written on encode and checked on decode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    pub signature: u32,
    pub message_type: MessageType,
    pub stream_id: u32,
    pub frame_number: u32,
    /// Microseconds since the Unix epoch
    pub timestamp_us: u64,
    pub sample_rate: u32,
    pub frame: Bytes,
}

impl Packet {
    /// Build an audio packet carrying the default signature
    pub fn audio(
        stream_id: u32,
        frame_number: u32,
        timestamp_us: u64,
        sample_rate: u32,
        frame: Bytes,
    ) -> Self {
        Self {
            signature: SIGNATURE,
            message_type: MessageType::Audio,
            stream_id,
            frame_number,
            timestamp_us,
            sample_rate,
            frame,
        }
    }

    /// Length of the payload as written in the header
    pub fn frame_length(&self) -> u32 {
        self.frame.len() as u32
    }

    /// Total serialized size
    pub fn encoded_len(&self) -> usize {
        HEADER_LEN + self.frame.len()
    }

    /// Serialize into a fresh buffer
    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(self.encoded_len());
        self.encode_into(&mut buf);
        buf.freeze()
    }

    /// Append the serialized packet to `buf`
    pub fn encode_into(&self, buf: &mut BytesMut) {
        debug_assert!(self.frame.len() <= u32::MAX as usize);

        buf.reserve(self.encoded_len());
        buf.put_u32(self.signature);
        buf.put_u8(self.message_type.into());
        buf.put_u32(self.stream_id);
        buf.put_u32(self.frame_number);
        buf.put_u64(self.timestamp_us);
        buf.put_u32(self.sample_rate);
        buf.put_u32(self.frame_length());
        buf.put_slice(&self.frame);
    }

    /// Decode one datagram, expecting the default signature
    pub fn decode(data: &[u8]) -> Result<Self, ProtocolError> {
        Self::decode_with_signature(data, SIGNATURE)
    }

    /// Decode one datagram, expecting `signature`.
    ///
    /// Bytes past the declared payload are ignored.
    pub fn decode_with_signature(data: &[u8], signature: u32) -> Result<Self, ProtocolError> {
        if data.len() < HEADER_LEN {
            return Err(ProtocolError::Truncated {
                len: data.len(),
                needed: HEADER_LEN,
            });
        }

        let mut buf = data;
        let found = buf.get_u32();
        if found != signature {
            return Err(ProtocolError::BadSignature(found));
        }

        let message_type = MessageType::try_from(buf.get_u8())?;
        let stream_id = buf.get_u32();
        let frame_number = buf.get_u32();
        let timestamp_us = buf.get_u64();
        let sample_rate = buf.get_u32();
        let frame_length = buf.get_u32();

        let declared = frame_length as usize;
        if buf.remaining() < declared {
            return Err(ProtocolError::PayloadTruncated {
                declared: frame_length,
                available: buf.remaining(),
            });
        }

        Ok(Self {
            signature: found,
            message_type,
            stream_id,
            frame_number,
            timestamp_us,
            sample_rate,
            frame: Bytes::copy_from_slice(&buf[..declared]),
        })
    }
}
