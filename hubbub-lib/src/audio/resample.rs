//! Sample-rate conversion to the canonical mixer rate.
//!
//! Sinc resampling over fixed input chunks; the final short chunk is
//! zero-padded, so converted clips come back slightly long (trailing
//! silence plus filter delay). Notification clips do not need sample-exact
//! duration, and the padding keeps every real sample in the output.

use std::fmt::{Display, Formatter};

use rubato::{
    Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction,
};

use crate::constants::CANONICAL_SAMPLE_RATE;

/// Input frames fed to the resampler per process call.
const RESAMPLER_CHUNK: usize = 1024;

/// Clips with fewer native samples than this are degenerate: shorter than
/// the sinc filter can meaningfully operate on, and inaudible anyway.
const MIN_INPUT_SAMPLES: usize = 128;

/// Why a clip could not be resampled. Callers drop the clip on any of
/// these; none of them is surfaced past `submit`.
#[derive(Debug)]
pub enum ResampleError {
    Degenerate { samples: usize },
    Resampler(String),
}

impl Display for ResampleError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Degenerate { samples } => {
                write!(f, "clip too short to resample ({} samples)", samples)
            }
            Self::Resampler(err) => write!(f, "resampler rejected clip: {}", err),
        }
    }
}

impl std::error::Error for ResampleError {}

/// Convert a mono clip from `sample_rate` to the canonical rate.
///
/// Clips already at the canonical rate pass through untouched, however
/// short they are.
pub fn to_canonical_rate(samples: Vec<i16>, sample_rate: u32) -> Result<Vec<i16>, ResampleError> {
    if sample_rate == CANONICAL_SAMPLE_RATE {
        return Ok(samples);
    }
    if samples.len() < MIN_INPUT_SAMPLES {
        return Err(ResampleError::Degenerate {
            samples: samples.len(),
        });
    }

    let ratio = CANONICAL_SAMPLE_RATE as f64 / sample_rate as f64;
    let params = SincInterpolationParameters {
        sinc_len: 256,
        f_cutoff: 0.95,
        interpolation: SincInterpolationType::Linear,
        oversampling_factor: 256,
        window: WindowFunction::BlackmanHarris2,
    };
    let mut resampler = SincFixedIn::<f32>::new(ratio, 2.0, params, RESAMPLER_CHUNK, 1)
        .map_err(|err| ResampleError::Resampler(err.to_string()))?;

    let mut output = Vec::with_capacity((samples.len() as f64 * ratio) as usize + RESAMPLER_CHUNK);
    for chunk in samples.chunks(RESAMPLER_CHUNK) {
        let mut frame: Vec<f32> = chunk.iter().map(|s| *s as f32 / 32768.0).collect();
        frame.resize(RESAMPLER_CHUNK, 0.0);
        let resampled = resampler
            .process(&[frame], None)
            .map_err(|err| ResampleError::Resampler(err.to_string()))?;
        if let Some(channel) = resampled.into_iter().next() {
            output.extend(channel.into_iter().map(|s| {
                (s * 32768.0).clamp(i16::MIN as f32, i16::MAX as f32) as i16
            }));
        }
    }
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_rate_input_passes_through() {
        let samples = vec![1, 2, 3];
        let out = to_canonical_rate(samples.clone(), CANONICAL_SAMPLE_RATE).unwrap();
        assert_eq!(out, samples);
    }

    #[test]
    fn short_foreign_rate_clip_is_degenerate() {
        let err = to_canonical_rate(vec![0; 64], 48000).unwrap_err();
        assert!(matches!(err, ResampleError::Degenerate { samples: 64 }));
    }

    #[test]
    fn downsampling_halves_the_length_roughly() {
        let samples = vec![8000; 3200];
        let out = to_canonical_rate(samples, 32000).unwrap();
        // 3200 in-samples pad to four 1024-frame chunks, each yielding about
        // 512 out-frames.
        assert!(out.len() >= 1900, "unexpectedly short: {}", out.len());
        assert!(out.len() <= 2200, "unexpectedly long: {}", out.len());
    }

    #[test]
    fn dc_level_survives_conversion() {
        let samples = vec![8000; 3200];
        let out = to_canonical_rate(samples, 32000).unwrap();
        // Interior of the clip, clear of filter warm-up and tail padding.
        for sample in &out[600..1200] {
            assert!(
                (*sample - 8000).abs() < 500,
                "sample {} strayed from the input level",
                sample
            );
        }
    }

    #[test]
    fn full_scale_input_clamps_instead_of_wrapping() {
        let samples = vec![i16::MAX; 2048];
        let out = to_canonical_rate(samples, 44100).unwrap();
        assert!(out.len() > 600);
        // Interior of a max-amplitude plateau: filter overshoot must clamp
        // at full scale, never wrap to a negative spike.
        for sample in &out[300..600] {
            assert!(
                (30000..=32767).contains(sample),
                "sample {} wrapped or collapsed",
                sample
            );
        }
    }
}
