//! Sample-format narrowing to 16-bit signed PCM

use cpal::Sample;

/// Narrow integer PCM by truncating cast, keeping the low 16 bits
pub fn narrow_i32(samples: &[i32]) -> Vec<i16> {
    samples.iter().map(|&s| s as i16).collect()
}

/// Convert float PCM in [-1.0, 1.0] to i16, clamping out-of-range values
pub fn narrow_f32(samples: &[f32]) -> Vec<i16> {
    samples
        .iter()
        .map(|&s| s.clamp(-1.0, 1.0).to_sample::<i16>())
        .collect()
}
