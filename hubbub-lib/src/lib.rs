//! # Hubbub Library
//!
//! Core of the hubbub chat client: a real-time notification mixer (WAV
//! decode, resampling to a canonical rate, per-owner mixing, output device
//! session management) plus the wire protocol and roster model.

pub mod audio;
pub mod chat;
pub mod constants;
pub mod error;
pub mod mixer;
