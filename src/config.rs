use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::display::Brightness;
use crate::error::{StrobeError, StrobeResult};
use crate::protocol::{CrcVariant, PayloadCapacity};

pub const DEFAULT_OFF_LEVEL: f64 = 0.5;
pub const DEFAULT_PAYLOAD_CAPACITY: usize = 255;
pub const DEFAULT_SYMBOL_DURATION_MS: u64 = 33;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    // brightness used for bit 0, the closer to 1 the stealthier
    pub off_level: f64,
    // payload bits per frame
    pub payload_capacity: usize,
    pub symbol_duration_ms: u64,
    pub crc: CrcVariant,
    // fixed output name, skips primary output lookup
    pub output: Option<String>,
}

impl Config {
    pub fn new() -> Self {
        Config {
            off_level: DEFAULT_OFF_LEVEL,
            payload_capacity: DEFAULT_PAYLOAD_CAPACITY,
            symbol_duration_ms: DEFAULT_SYMBOL_DURATION_MS,
            crc: CrcVariant::default(),
            output: None,
        }
    }

    /// Load a JSON config, missing keys keep their defaults
    pub fn from_file(path: impl AsRef<Path>) -> StrobeResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|err| {
            StrobeError::config(format!("cannot read config {}: {}", path.display(), err))
        })?;
        Config::from_json(&text)
    }

    pub fn from_json(text: &str) -> StrobeResult<Self> {
        serde_json::from_str(text)
            .map_err(|err| StrobeError::config(format!("invalid config: {}", err)))
    }

    pub fn validate(&self) -> StrobeResult<()> {
        PayloadCapacity::new(self.payload_capacity)?;
        self.off_level()?;
        if self.symbol_duration_ms == 0 {
            return Err(StrobeError::config("symbol duration must be at least 1 ms"));
        }
        if let Some(output) = &self.output {
            if output.trim().is_empty() {
                return Err(StrobeError::config("output name is empty"));
            }
        }
        Ok(())
    }

    pub fn symbol_duration(&self) -> Duration {
        Duration::from_millis(self.symbol_duration_ms)
    }

    pub fn on_level(&self) -> Brightness {
        Brightness::FULL
    }

    pub fn off_level(&self) -> StrobeResult<Brightness> {
        // open interval, 0 blanks the screen and 1 carries no signal
        if !(self.off_level > 0.0 && self.off_level < 1.0) {
            return Err(StrobeError::config(format!(
                "brightness {} out of range, valid range: (0, 1)",
                self.off_level
            )));
        }
        Brightness::new(self.off_level)
    }
}

impl Default for Config {
    fn default() -> Self {
        Config::new()
    }
}
