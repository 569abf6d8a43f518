//! WAV payload decoding.
//!
//! Clips arrive as complete WAV files in memory. Only the format the mixer
//! can ingest is accepted: single channel, 16-bit integer PCM. Anything
//! else is a format error for the submitter to log.

use std::io::Cursor;

use hound::{SampleFormat, WavReader};

use crate::error::MixerError;

/// Samples pulled out of a WAV payload, at the payload's native rate.
#[derive(Debug)]
pub struct DecodedClip {
    pub sample_rate: u32,
    pub samples: Vec<i16>,
}

/// Parse a WAV payload into raw samples.
pub fn decode_wav(bytes: &[u8]) -> Result<DecodedClip, MixerError> {
    let reader = WavReader::new(Cursor::new(bytes))?;
    let spec = reader.spec();
    if spec.channels != 1 {
        return Err(MixerError::Format(format!(
            "expected mono audio, got {} channels",
            spec.channels
        )));
    }
    if spec.sample_format != SampleFormat::Int || spec.bits_per_sample != 16 {
        let format = match spec.sample_format {
            SampleFormat::Int => "integer",
            SampleFormat::Float => "float",
        };
        return Err(MixerError::Format(format!(
            "expected 16-bit PCM samples, got {}-bit {}",
            spec.bits_per_sample, format
        )));
    }
    let samples = reader
        .into_samples::<i16>()
        .collect::<Result<Vec<i16>, _>>()?;
    Ok(DecodedClip {
        sample_rate: spec.sample_rate,
        samples,
    })
}
