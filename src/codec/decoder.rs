//! Opus decoder wrapper
//!
//! Used by the receiver probe to check that payloads decode.

use opus::{Channels, Decoder};
use crate::error::CodecError;

/// Longest Opus frame (120 ms) at 48 kHz, mono
const MAX_DECODED_SAMPLES: usize = 48000 * 120 / 1000;

/// Mono Opus decoder
pub struct OpusDecoder {
    decoder: Decoder,
    sample_rate: u32,
    /// Decoding buffer (reused to avoid allocations)
    decode_buffer: Vec<i16>,
    frames_decoded: u64,
}

impl OpusDecoder {
    pub fn new(sample_rate: u32) -> Result<Self, CodecError> {
        let decoder = Decoder::new(sample_rate, Channels::Mono)
            .map_err(|e| CodecError::DecoderInit(e.to_string()))?;

        Ok(Self {
            decoder,
            sample_rate,
            decode_buffer: vec![0i16; MAX_DECODED_SAMPLES],
            frames_decoded: 0,
        })
    }

    /// Decode one frame, returning its samples
    pub fn decode(&mut self, data: &[u8]) -> Result<&[i16], CodecError> {
        let samples = self.decoder
            .decode(data, &mut self.decode_buffer, false)
            .map_err(|e| CodecError::DecodingFailed(e.to_string()))?;

        self.frames_decoded += 1;
        Ok(&self.decode_buffer[..samples])
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn frames_decoded(&self) -> u64 {
        self.frames_decoded
    }
}
