//! Error types for the audio streamer

use thiserror::Error;

/// Main error type for the application
#[derive(Error, Debug)]
pub enum Error {
    #[error("Audio error: {0}")]
    Audio(#[from] AudioError),

    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),

    #[error("Network error: {0}")]
    Network(#[from] NetworkError),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Audio subsystem errors
#[derive(Error, Debug)]
pub enum AudioError {
    #[error("Device not found: {0}")]
    DeviceNotFound(String),

    #[error("Failed to open stream: {0}")]
    StreamError(String),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("Capture timed out after {0} ms")]
    CaptureTimeout(u64),

    #[error("WAV error: {0}")]
    Wav(String),

    #[error("cpal error: {0}")]
    CpalError(String),
}

impl From<hound::Error> for AudioError {
    fn from(e: hound::Error) -> Self {
        AudioError::Wav(e.to_string())
    }
}

/// Codec errors
#[derive(Error, Debug)]
pub enum CodecError {
    #[error("Encoder initialization failed: {0}")]
    EncoderInit(String),

    #[error("Decoder initialization failed: {0}")]
    DecoderInit(String),

    #[error("Encoding failed: {0}")]
    EncodingFailed(String),

    #[error("Decoding failed: {0}")]
    DecodingFailed(String),

    #[error("Invalid frame size: {0}")]
    InvalidFrameSize(usize),
}

/// Network errors
#[derive(Error, Debug)]
pub enum NetworkError {
    #[error("Address resolution failed for {0}")]
    ResolveFailed(String),

    #[error("Socket bind failed: {0}")]
    BindFailed(String),

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Send failed: {0}")]
    SendFailed(String),

    #[error("Receive failed: {0}")]
    ReceiveFailed(#[source] std::io::Error),

    #[error("Packet too large: {0} bytes")]
    PacketTooLarge(usize),
}

impl NetworkError {
    /// A read that expired on the socket timeout rather than failing
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            NetworkError::ReceiveFailed(e)
                if matches!(e.kind(), std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut)
        )
    }
}

/// Wire format errors raised while decoding a datagram
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("Datagram too short for header: {len} < {needed} bytes")]
    Truncated { len: usize, needed: usize },

    #[error("Frame payload truncated: declared {declared} bytes, {available} available")]
    PayloadTruncated { declared: u32, available: usize },

    #[error("Bad signature: {0:#010x}")]
    BadSignature(u32),

    #[error("Unknown message type: {0:#04x}")]
    UnknownMessageType(u8),
}

/// Result type alias for the application
pub type Result<T> = std::result::Result<T, Error>;
