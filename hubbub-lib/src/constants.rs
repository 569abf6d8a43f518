//! Shared constants for the mixing engine.

/// Canonical sample rate of the mixed output stream (Hz).
///
/// Every buffer entering the stream table has been resampled to this rate;
/// the output device is opened at it.
pub const CANONICAL_SAMPLE_RATE: u32 = 16000;

/// Samples per frame handed to the output device per pull.
pub const FRAME_SAMPLES: usize = 1024;

/// Playback volume a fresh engine starts with, in percent.
pub const DEFAULT_VOLUME_PERCENT: u8 = 50;
