use std::fmt::{Display, Formatter};

/// Error type for clip submission and engine control.
#[derive(Debug)]
pub enum MixerError {
    Format(String),
    InvalidArgument(String),
    Device(String),
}

impl Display for MixerError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Format(err) => write!(f, "unsupported clip format: {}", err),
            Self::InvalidArgument(err) => write!(f, "invalid argument: {}", err),
            Self::Device(err) => write!(f, "audio device error: {}", err),
        }
    }
}

impl std::error::Error for MixerError {}

impl From<hound::Error> for MixerError {
    fn from(value: hound::Error) -> Self {
        Self::Format(value.to_string())
    }
}
