//! Opus codec wrapper
//!
//! Mono Opus encoding behind the `Compressor` stage trait, plus a decoder
//! for verifying received payloads.

pub mod encoder;
pub mod decoder;

pub use encoder::{Compressor, EncoderStats, OpusEncoder};
pub use decoder::OpusDecoder;
