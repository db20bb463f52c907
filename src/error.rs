use std::{io, path::PathBuf};

use thiserror::Error;

pub type StrobeResult<T> = Result<T, StrobeError>;

#[derive(Error, Debug)]
pub enum StrobeError {
    /// Rejected before anything touches the display
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Source file could not be read
    #[error("cannot read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Display interface unreachable or command rejected
    #[error("display error: {0}")]
    Device(String),
}

impl StrobeError {
    pub fn config(msg: impl Into<String>) -> Self {
        StrobeError::Configuration(msg.into())
    }

    pub fn device(msg: impl Into<String>) -> Self {
        StrobeError::Device(msg.into())
    }

    pub fn is_configuration(&self) -> bool {
        matches!(self, StrobeError::Configuration(_))
    }

    pub fn is_device(&self) -> bool {
        matches!(self, StrobeError::Device(_))
    }
}
