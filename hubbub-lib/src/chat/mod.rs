//! Chat model: wire messages and the live user roster.

pub mod protocol;
pub mod roster;
