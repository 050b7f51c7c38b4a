//! Opus encoder wrapper
//!
//! Encodes mono 16-bit chunks into a fixed-capacity output buffer, so no
//! compressed frame is ever larger than the configured ceiling.

use bytes::Bytes;
use opus::{Application, Channels, Encoder};

use crate::config::{validate_opus_format, OpusApplication, OpusConfig};
use crate::error::CodecError;

/// Compression stage of the pipeline
pub trait Compressor {
    /// Compress one PCM chunk into a single frame
    fn compress(&mut self, pcm: &[i16]) -> Result<Bytes, CodecError>;

    /// Upper bound on the size of any frame returned by `compress`
    fn max_frame_bytes(&self) -> usize;
}

/// Mono Opus encoder
pub struct OpusEncoder {
    encoder: Encoder,
    sample_rate: u32,
    /// Output buffer; its length is the frame size ceiling
    encode_buffer: Vec<u8>,
    frames_encoded: u64,
    bytes_produced: u64,
    failures: u64,
}

impl OpusEncoder {
    /// Create a mono encoder for `sample_rate`
    pub fn new(sample_rate: u32, config: &OpusConfig) -> Result<Self, CodecError> {
        let application = match config.application {
            OpusApplication::Voip => Application::Voip,
            OpusApplication::Audio => Application::Audio,
            OpusApplication::LowDelay => Application::LowDelay,
        };

        let mut encoder = Encoder::new(sample_rate, Channels::Mono, application)
            .map_err(|e| CodecError::EncoderInit(format!("{} Hz: {}", sample_rate, e)))?;

        Self::configure_encoder(&mut encoder, config)?;

        Ok(Self {
            encoder,
            sample_rate,
            encode_buffer: vec![0u8; config.max_frame_bytes],
            frames_encoded: 0,
            bytes_produced: 0,
            failures: 0,
        })
    }

    fn configure_encoder(encoder: &mut Encoder, config: &OpusConfig) -> Result<(), CodecError> {
        encoder.set_bitrate(opus::Bitrate::Bits(config.bitrate as i32))
            .map_err(|e| CodecError::EncoderInit(format!("Failed to set bitrate: {}", e)))?;

        encoder.set_vbr(config.vbr)
            .map_err(|e| CodecError::EncoderInit(format!("Failed to set VBR: {}", e)))?;

        encoder.set_inband_fec(config.fec)
            .map_err(|e| CodecError::EncoderInit(format!("Failed to set FEC: {}", e)))?;

        if config.fec {
            encoder.set_packet_loss_perc(config.packet_loss_perc as i32)
                .map_err(|e| CodecError::EncoderInit(format!("Failed to set packet loss: {}", e)))?;
        }

        Ok(())
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Get statistics
    pub fn stats(&self) -> EncoderStats {
        EncoderStats {
            frames_encoded: self.frames_encoded,
            bytes_produced: self.bytes_produced,
            failures: self.failures,
            average_frame_size: if self.frames_encoded > 0 {
                self.bytes_produced as f32 / self.frames_encoded as f32
            } else {
                0.0
            },
        }
    }
}

impl Compressor for OpusEncoder {
    fn compress(&mut self, pcm: &[i16]) -> Result<Bytes, CodecError> {
        if validate_opus_format(self.sample_rate, pcm.len()).is_err() {
            self.failures += 1;
            return Err(CodecError::InvalidFrameSize(pcm.len()));
        }

        let size = match self.encoder.encode(pcm, &mut self.encode_buffer) {
            Ok(size) => size,
            Err(e) => {
                self.failures += 1;
                return Err(CodecError::EncodingFailed(e.to_string()));
            }
        };

        self.frames_encoded += 1;
        self.bytes_produced += size as u64;

        Ok(Bytes::copy_from_slice(&self.encode_buffer[..size]))
    }

    fn max_frame_bytes(&self) -> usize {
        self.encode_buffer.len()
    }
}

/// Encoder statistics
#[derive(Debug, Clone)]
pub struct EncoderStats {
    pub frames_encoded: u64,
    pub bytes_produced: u64,
    pub failures: u64,
    pub average_frame_size: f32,
}
