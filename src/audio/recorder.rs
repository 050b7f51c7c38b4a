//! Raw PCM recording to WAV
//!
//! Wraps a chunk source and writes every chunk it yields, before
//! compression, to a mono 16-bit WAV file.

use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use crate::audio::source::ChunkSource;
use crate::constants::CHANNELS;
use crate::error::AudioError;

/// Chunk source tee that records raw PCM to disk
pub struct RecordingSource<S> {
    inner: S,
    writer: Option<hound::WavWriter<BufWriter<File>>>,
    path: PathBuf,
    samples_written: u64,
}

impl<S: ChunkSource> RecordingSource<S> {
    /// Create `path` and start recording everything `inner` produces
    pub fn create(inner: S, path: impl AsRef<Path>) -> Result<Self, AudioError> {
        let path = path.as_ref().to_path_buf();
        let spec = hound::WavSpec {
            channels: CHANNELS,
            sample_rate: inner.sample_rate(),
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let writer = hound::WavWriter::create(&path, spec)
            .map_err(|e| AudioError::Wav(format!("{}: {}", path.display(), e)))?;

        tracing::info!("Recording raw PCM to {}", path.display());

        Ok(Self {
            inner,
            writer: Some(writer),
            path,
            samples_written: 0,
        })
    }

    pub fn samples_written(&self) -> u64 {
        self.samples_written
    }

    /// Finalize the WAV header and return the wrapped source
    pub fn finish(mut self) -> Result<S, AudioError> {
        if let Some(writer) = self.writer.take() {
            writer.finalize()?;
            tracing::info!(
                "Wrote {} samples to {}",
                self.samples_written,
                self.path.display()
            );
        }
        Ok(self.inner)
    }
}

impl<S: ChunkSource> ChunkSource for RecordingSource<S> {
    fn sample_rate(&self) -> u32 {
        self.inner.sample_rate()
    }

    fn next_chunk(&mut self) -> Result<Option<Vec<i16>>, AudioError> {
        let chunk = self.inner.next_chunk()?;

        if let (Some(chunk), Some(writer)) = (&chunk, self.writer.as_mut()) {
            for &s in chunk {
                writer.write_sample(s)?;
            }
            self.samples_written += chunk.len() as u64;
        }

        Ok(chunk)
    }
}
