//! Clip ingestion: WAV decoding and conversion to the canonical rate.

pub mod decode;
pub mod resample;
