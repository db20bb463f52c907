//! Optical covert channel transmitter.
//!
//! A file is expanded into bits, packed into CRC-protected frames and sent
//! out as on-off keyed brightness changes of a display output.

pub mod bitstream;
pub mod config;
pub mod display;
pub mod error;
pub mod modulator;
pub mod protocol;
pub mod runtime;

pub use config::Config;
pub use display::{Brightness, DisplayController, OutputId, XrandrDisplay};
pub use error::{StrobeError, StrobeResult};
pub use modulator::{Modulator, ModulatorState, SymbolStats};
pub use protocol::{Bit, Frame, FrameEncoder, FrameSet};
pub use runtime::{load_frames, TransmissionReport, Transmitter};
