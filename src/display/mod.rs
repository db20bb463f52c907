use std::fmt::{self, Display};

use async_trait::async_trait;

use crate::error::{StrobeError, StrobeResult};

pub mod xrandr;

pub use xrandr::XrandrDisplay;

/// Name of a physical output as the backend knows it, e.g. `eDP-1`
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct OutputId(String);

impl OutputId {
    pub fn new(name: impl Into<String>) -> Self {
        OutputId(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for OutputId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Brightness level in [0, 1]
#[derive(Clone, Copy, Debug, PartialEq, PartialOrd)]
pub struct Brightness(f64);

impl Brightness {
    pub const FULL: Brightness = Brightness(1.0);

    pub fn new(value: f64) -> StrobeResult<Self> {
        if !(0.0..=1.0).contains(&value) {
            return Err(StrobeError::config(format!(
                "brightness {} outside [0, 1]",
                value
            )));
        }
        Ok(Brightness(value))
    }

    pub fn value(&self) -> f64 {
        self.0
    }
}

impl Display for Brightness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The two capabilities the transmitter needs from a display backend.
///
/// Implementations are the sole writer of the output's brightness while a
/// transmission runs; nothing else may change it concurrently.
#[async_trait]
pub trait DisplayController: Send + Sync {
    /// Output that will carry the signal, fails when none is active
    async fn identify_active_output(&self) -> StrobeResult<OutputId>;

    async fn set_brightness(&self, output: &OutputId, level: Brightness) -> StrobeResult<()>;
}
