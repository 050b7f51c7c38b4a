//! Chunk sources feeding the pipeline

use crate::error::AudioError;

/// A producer of fixed-size mono PCM chunks.
///
/// Each call yields one chunk of 16-bit samples, `Ok(None)` once the source
/// is exhausted, or an error that ends the run.
pub trait ChunkSource {
    /// Sample rate of the produced PCM in Hz
    fn sample_rate(&self) -> u32;

    /// Produce the next chunk
    fn next_chunk(&mut self) -> Result<Option<Vec<i16>>, AudioError>;
}
