//! # UDP Audio Streamer
//!
//! Streams mono audio, captured live or read from a WAV file, to a remote
//! collector as Opus frames inside a small framed UDP protocol.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────────┐
//! │                               SENDER                                  │
//! │  ┌───────────────────┐        ┌───────────────────┐                   │
//! │  │  WAV file (hound) │   or   │ Microphone (cpal) │                   │
//! │  │  WavFileSource    │        │ LiveSource        │                   │
//! │  └─────────┬─────────┘        └─────────┬─────────┘                   │
//! │            └──────────────┬─────────────┘                             │
//! │                           ▼  ChunkSource: fixed-size i16 chunks       │
//! │                 ┌───────────────────┐                                 │
//! │                 │ Opus (Compressor) │  ≤ max_frame_bytes per frame    │
//! │                 └─────────┬─────────┘                                 │
//! │                           ▼                                           │
//! │                 ┌───────────────────┐                                 │
//! │                 │    Sequencer      │  frame number + timestamp       │
//! │                 └─────────┬─────────┘                                 │
//! │                           ▼                                           │
//! │                 ┌───────────────────┐                                 │
//! │                 │  Packet::encode   │  29-byte header + payload       │
//! │                 └─────────┬─────────┘                                 │
//! │                           ▼                                           │
//! │                 ┌───────────────────┐                                 │
//! │                 │ UdpSender         │  one datagram per packet        │
//! │                 └─────────┬─────────┘                                 │
//! └───────────────────────────┼──────────────────────────────────────────┘
//!                             │ UDP
//!                             ▼
//!                 ┌───────────────────────┐
//!                 │ Collector (any impl)  │  demux by StreamID
//!                 └───────────────────────┘
//! ```
//!
//! Every stage runs on one thread in lock-step: the next chunk is not
//! fetched until the current one has been sent or dropped.

pub mod audio;
pub mod codec;
pub mod config;
pub mod error;
pub mod network;
pub mod pipeline;
pub mod protocol;

pub use error::{Error, Result};

/// Application-wide constants
pub mod constants {
    /// Default collector endpoint
    pub const DEFAULT_SERVER_ADDR: &str = "localhost:8081";

    /// Default sample rate for live capture
    pub const DEFAULT_SAMPLE_RATE: u32 = 48000;

    /// Channel count; the whole pipeline is mono
    pub const CHANNELS: u16 = 1;

    /// Default samples per chunk (20 ms at 48 kHz)
    pub const DEFAULT_FRAME_SIZE: usize = 960;

    /// Default live session length in seconds
    pub const DEFAULT_SESSION_SECS: u64 = 600;

    /// Default Opus bitrate in bits per second
    pub const DEFAULT_BITRATE: u32 = 64_000;

    /// Output buffer capacity for one compressed frame
    pub const MAX_FRAME_BYTES: usize = 1024;

    /// Maximum packet size for UDP
    pub const MAX_PACKET_SIZE: usize = 1472; // MTU - IP/UDP headers
}
