//! WAV-file chunk source
//!
//! The whole file is decoded into memory when the source is opened, then
//! sliced lazily with a fixed stride. The last chunk may be short; it is
//! passed through without padding.

use std::path::Path;

use crate::audio::sample::{narrow_f32, narrow_i32};
use crate::audio::source::ChunkSource;
use crate::constants::CHANNELS;
use crate::error::AudioError;

enum Pcm {
    Int(Vec<i32>),
    Float(Vec<f32>),
}

impl Pcm {
    fn len(&self) -> usize {
        match self {
            Pcm::Int(s) => s.len(),
            Pcm::Float(s) => s.len(),
        }
    }

    fn narrow(&self, start: usize, end: usize) -> Vec<i16> {
        match self {
            Pcm::Int(s) => narrow_i32(&s[start..end]),
            Pcm::Float(s) => narrow_f32(&s[start..end]),
        }
    }
}

/// Chunk source over a fully decoded mono WAV file
pub struct WavFileSource {
    pcm: Pcm,
    sample_rate: u32,
    frame_size: usize,
    position: usize,
}

impl WavFileSource {
    /// Decode `path` and prepare to slice it into `frame_size` chunks
    pub fn open(path: impl AsRef<Path>, frame_size: usize) -> Result<Self, AudioError> {
        let path = path.as_ref();
        let reader = hound::WavReader::open(path)
            .map_err(|e| AudioError::Wav(format!("{}: {}", path.display(), e)))?;
        let spec = reader.spec();

        if spec.channels != CHANNELS {
            return Err(AudioError::UnsupportedFormat(format!(
                "{}: {} channels, only mono is supported",
                path.display(),
                spec.channels
            )));
        }

        let pcm = match spec.sample_format {
            hound::SampleFormat::Int => Pcm::Int(
                reader
                    .into_samples::<i32>()
                    .collect::<Result<Vec<_>, _>>()?,
            ),
            hound::SampleFormat::Float => Pcm::Float(
                reader
                    .into_samples::<f32>()
                    .collect::<Result<Vec<_>, _>>()?,
            ),
        };

        tracing::info!(
            "Loaded {}: {} samples at {} Hz, {} bit {:?}",
            path.display(),
            pcm.len(),
            spec.sample_rate,
            spec.bits_per_sample,
            spec.sample_format
        );

        Self::with_pcm(pcm, spec.sample_rate, frame_size)
    }

    /// Build a source over integer samples already in memory
    pub fn from_samples(
        samples: Vec<i32>,
        sample_rate: u32,
        frame_size: usize,
    ) -> Result<Self, AudioError> {
        Self::with_pcm(Pcm::Int(samples), sample_rate, frame_size)
    }

    fn with_pcm(pcm: Pcm, sample_rate: u32, frame_size: usize) -> Result<Self, AudioError> {
        if frame_size == 0 {
            return Err(AudioError::UnsupportedFormat("frame size must be non-zero".into()));
        }
        Ok(Self {
            pcm,
            sample_rate,
            frame_size,
            position: 0,
        })
    }

    /// Total samples in the file
    pub fn total_samples(&self) -> usize {
        self.pcm.len()
    }

    /// Number of chunks the source yields in total
    pub fn chunk_count(&self) -> usize {
        self.pcm.len().div_ceil(self.frame_size)
    }

    /// Rewind to the first chunk
    pub fn restart(&mut self) {
        self.position = 0;
    }
}

impl ChunkSource for WavFileSource {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn next_chunk(&mut self) -> Result<Option<Vec<i16>>, AudioError> {
        let total = self.pcm.len();
        if self.position >= total {
            return Ok(None);
        }

        let end = (self.position + self.frame_size).min(total);
        let chunk = self.pcm.narrow(self.position, end);
        self.position = end;
        Ok(Some(chunk))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drain(source: &mut WavFileSource) -> Vec<Vec<i16>> {
        let mut chunks = Vec::new();
        while let Some(chunk) = source.next_chunk().unwrap() {
            chunks.push(chunk);
        }
        chunks
    }

    #[test]
    fn test_chunking_with_tail() {
        let samples: Vec<i32> = (0..2500).map(|i| (i % 2000) - 1000).collect();
        let mut source = WavFileSource::from_samples(samples.clone(), 48000, 960).unwrap();
        assert_eq!(source.chunk_count(), 3);

        let chunks = drain(&mut source);
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].len(), 960);
        assert_eq!(chunks[1].len(), 960);
        assert_eq!(chunks[2].len(), 2500 % 960);

        let joined: Vec<i32> = chunks.concat().into_iter().map(i32::from).collect();
        assert_eq!(joined, samples);
    }

    #[test]
    fn test_chunking_exact_multiple() {
        let samples = vec![7i32; 960 * 4];
        let mut source = WavFileSource::from_samples(samples, 48000, 960).unwrap();
        let chunks = drain(&mut source);
        assert_eq!(chunks.len(), 4);
        assert!(chunks.iter().all(|c| c.len() == 960));
    }

    #[test]
    fn test_chunk_count_matches_ceil() {
        for (total, frame) in [(0usize, 960usize), (1, 960), (959, 960), (961, 960), (10, 3)] {
            let mut source =
                WavFileSource::from_samples(vec![1; total], 8000, frame).unwrap();
            let chunks = drain(&mut source);
            assert_eq!(chunks.len(), total.div_ceil(frame));
            if let Some(last) = chunks.last() {
                let expected = if total % frame == 0 { frame } else { total % frame };
                assert_eq!(last.len(), expected);
            }
        }
    }

    #[test]
    fn test_restart() {
        let mut source = WavFileSource::from_samples(vec![1; 100], 8000, 40).unwrap();
        assert_eq!(drain(&mut source).len(), 3);
        assert!(source.next_chunk().unwrap().is_none());
        source.restart();
        assert_eq!(drain(&mut source).len(), 3);
    }

    #[test]
    fn test_zero_frame_size_rejected() {
        assert!(WavFileSource::from_samples(vec![1; 10], 8000, 0).is_err());
    }

    #[test]
    fn test_open_wav_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tone.wav");
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 16000,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(&path, spec).unwrap();
        for i in 0..700i16 {
            writer.write_sample(i - 350).unwrap();
        }
        writer.finalize().unwrap();

        let mut source = WavFileSource::open(&path, 320).unwrap();
        assert_eq!(source.sample_rate(), 16000);
        assert_eq!(source.total_samples(), 700);

        let chunks = drain(&mut source);
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0][0], -350);
        assert_eq!(chunks[2].len(), 60);
    }

    #[test]
    fn test_open_rejects_stereo() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stereo.wav");
        let spec = hound::WavSpec {
            channels: 2,
            sample_rate: 48000,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(&path, spec).unwrap();
        writer.write_sample(0i16).unwrap();
        writer.write_sample(0i16).unwrap();
        writer.finalize().unwrap();

        assert!(matches!(
            WavFileSource::open(&path, 960),
            Err(AudioError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_open_missing_and_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        assert!(WavFileSource::open(dir.path().join("nope.wav"), 960).is_err());

        let path = dir.path().join("garbage.wav");
        std::fs::write(&path, b"definitely not a RIFF file").unwrap();
        assert!(matches!(
            WavFileSource::open(&path, 960),
            Err(AudioError::Wav(_))
        ));
    }
}
