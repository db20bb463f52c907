use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use log::{debug, error, info, warn};
use serde::Serialize;
use tokio::time::Instant;

use crate::bitstream::read_file_bits;
use crate::config::Config;
use crate::display::{DisplayController, OutputId};
use crate::error::StrobeResult;
use crate::modulator::{Modulator, SymbolStats};
use crate::protocol::{FrameEncoder, FrameSet};

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TransmissionReport {
    pub output: Option<String>,
    pub frames: usize,
    pub payload_bits: usize,
    pub symbols: usize,
    pub overruns: usize,
    pub symbol_duration_ms: u64,
    pub mean_command_latency_ms: f64,
    pub max_command_latency_ms: f64,
    pub elapsed_ms: u64,
}

impl TransmissionReport {
    fn new(
        cfg: &Config,
        frames: &FrameSet,
        output: Option<&OutputId>,
        stats: &SymbolStats,
        elapsed: Duration,
    ) -> Self {
        TransmissionReport {
            output: output.map(|o| o.to_string()),
            frames: frames.len(),
            payload_bits: frames.payload_len_bits(),
            symbols: stats.symbols,
            overruns: stats.overruns,
            symbol_duration_ms: cfg.symbol_duration_ms,
            mean_command_latency_ms: as_ms(stats.mean_latency()),
            max_command_latency_ms: as_ms(stats.max_latency),
            elapsed_ms: elapsed.as_millis() as u64,
        }
    }
}

fn as_ms(duration: Duration) -> f64 {
    duration.as_secs_f64() * 1000.0
}

/// Air time of `frames` when no command overruns its symbol
pub fn estimated_air_time(cfg: &Config, frames: &FrameSet) -> Duration {
    cfg.symbol_duration() * frames.wire_len_bits() as u32
}

/// Read a file and pack it into frames, nothing touches the display
pub async fn load_frames(cfg: &Config, path: impl AsRef<Path>) -> StrobeResult<FrameSet> {
    let encoder = FrameEncoder::from_config(cfg)?;
    let bits = read_file_bits(path).await?;
    encoder.encode(&bits[..])
}

/// Drives a whole file through framing and modulation on one output
pub struct Transmitter<D: DisplayController> {
    cfg: Arc<Config>,
    display: D,
}

impl<D: DisplayController> Transmitter<D> {
    pub fn new(cfg: Arc<Config>, display: D) -> StrobeResult<Self> {
        cfg.validate()?;
        Ok(Transmitter { cfg, display })
    }

    pub fn config(&self) -> &Config {
        &self.cfg
    }

    pub fn display(&self) -> &D {
        &self.display
    }

    pub async fn transmit_file(&self, path: impl AsRef<Path>) -> StrobeResult<TransmissionReport> {
        let frames = load_frames(&self.cfg, path).await?;
        self.transmit(&frames).await
    }

    pub async fn transmit(&self, frames: &FrameSet) -> StrobeResult<TransmissionReport> {
        if frames.is_empty() {
            warn!("Nothing to transmit, display left untouched");
            return Ok(TransmissionReport::new(
                &self.cfg,
                frames,
                None,
                &SymbolStats::default(),
                Duration::ZERO,
            ));
        }

        let output = self.resolve_output().await?;
        let mut modulator = Modulator::from_config(&self.display, output, &self.cfg)?;

        info!(
            "Starting transmission on {}: {} frames, {} symbols, about {:.1} seconds",
            modulator.output(),
            frames.len(),
            frames.wire_len_bits(),
            estimated_air_time(&self.cfg, frames).as_secs_f64()
        );
        let start = Instant::now();
        for (index, frame) in frames.iter().enumerate() {
            debug!(
                "Frame {}/{}: {} payload bits",
                index + 1,
                frames.len(),
                frame.payload().len()
            );
            if let Err(err) = modulator.emit(frame.encode()).await {
                error!("Transmission aborted in frame {}: {}", index + 1, err);
                // receiver sees a short stream either way, only try to leave the screen at full
                if let Err(restore_err) = modulator.restore().await {
                    warn!("Restoring {} failed: {}", modulator.output(), restore_err);
                }
                return Err(err);
            }
        }
        modulator.restore().await?;
        let elapsed = start.elapsed();

        info!("Transmission finished!");
        info!("Total transmission time: {:.3} seconds", elapsed.as_secs_f64());
        if modulator.stats().overruns > 0 {
            warn!(
                "{} of {} symbols overran {:?}, worst command took {:?}",
                modulator.stats().overruns,
                modulator.stats().symbols,
                self.cfg.symbol_duration(),
                modulator.stats().max_latency
            );
        }
        Ok(TransmissionReport::new(
            &self.cfg,
            frames,
            Some(modulator.output()),
            modulator.stats(),
            elapsed,
        ))
    }

    async fn resolve_output(&self) -> StrobeResult<OutputId> {
        match &self.cfg.output {
            Some(name) => Ok(OutputId::new(name.trim())),
            None => self.display.identify_active_output().await,
        }
    }
}

#[cfg(test)]
mod test {
    use std::path::PathBuf;
    use std::sync::Arc;
    use std::time::Duration;

    use crate::config::Config;
    use crate::display::fake::FakeDisplay;
    use crate::error::StrobeError;
    use crate::protocol::FrameMatchResult;

    use super::{estimated_air_time, load_frames, Transmitter};

    fn temp_input(name: &str, content: &[u8]) -> PathBuf {
        let path = std::env::temp_dir().join(format!(
            "strobe-{}-{}.bin",
            name,
            std::process::id()
        ));
        std::fs::write(&path, content).unwrap();
        path
    }

    fn config(capacity: usize) -> Arc<Config> {
        let mut cfg = Config::default();
        cfg.payload_capacity = capacity;
        Arc::new(cfg)
    }

    #[tokio::test(start_paused = true)]
    async fn transmit_file_test() {
        let path = temp_input("transmit", &[0x41]);
        let transmitter = Transmitter::new(config(4), FakeDisplay::new()).unwrap();
        let report = transmitter.transmit_file(&path).await.unwrap();
        std::fs::remove_file(&path).unwrap();

        // two frames of 8 + 8 + 4 + 16 bits
        assert_eq!(report.frames, 2);
        assert_eq!(report.payload_bits, 8);
        assert_eq!(report.symbols, 72);
        assert_eq!(report.overruns, 0);
        assert_eq!(report.elapsed_ms, 72 * 33);
        assert_eq!(report.output.as_deref(), Some("FAKE-1"));

        let levels = transmitter.display().levels();
        assert_eq!(levels.len(), 73);
        assert_eq!(levels[..8], [0.5, 1.0, 0.5, 1.0, 0.5, 1.0, 0.5, 1.0]);
        assert_eq!(*levels.last().unwrap(), 1.0);
    }

    #[tokio::test(start_paused = true)]
    async fn fixed_output_skips_identification_test() {
        let mut cfg = Config::default();
        cfg.output = Some(String::from("HDMI-2"));
        let transmitter = Transmitter::new(Arc::new(cfg), FakeDisplay::without_output()).unwrap();
        let frames = crate::protocol::build_frames(
            &crate::bitstream::bytes_to_bits(b"x"),
            255,
            Default::default(),
        )
        .unwrap();
        transmitter.transmit(&frames).await.unwrap();
        let commands = transmitter.display().commands();
        assert!(commands.iter().all(|c| c.output.as_str() == "HDMI-2"));
    }

    #[tokio::test(start_paused = true)]
    async fn no_active_output_test() {
        let path = temp_input("no-output", b"data");
        let transmitter = Transmitter::new(config(255), FakeDisplay::without_output()).unwrap();
        let err = transmitter.transmit_file(&path).await.unwrap_err();
        std::fs::remove_file(&path).unwrap();
        assert!(err.is_device());
        assert!(transmitter.display().commands().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn device_error_aborts_transmission_test() {
        let path = temp_input("device-error", b"data");
        let transmitter =
            Transmitter::new(config(255), FakeDisplay::new().fail_after(5)).unwrap();
        let err = transmitter.transmit_file(&path).await.unwrap_err();
        std::fs::remove_file(&path).unwrap();
        assert!(err.is_device());
        // nothing after the failing symbol is accepted, the restore attempt included
        assert_eq!(transmitter.display().commands().len(), 5);
    }

    #[test]
    fn invalid_config_rejected_before_transmission_test() {
        let err = Transmitter::new(config(0), FakeDisplay::new()).err().unwrap();
        assert!(err.is_configuration());
        let err = Transmitter::new(config(256), FakeDisplay::new()).err().unwrap();
        assert!(err.is_configuration());
    }

    #[tokio::test(start_paused = true)]
    async fn missing_file_is_io_error_test() {
        let transmitter = Transmitter::new(config(255), FakeDisplay::new()).unwrap();
        let err = transmitter
            .transmit_file("/nonexistent/strobe/secret.bin")
            .await
            .unwrap_err();
        assert!(matches!(err, StrobeError::Io { .. }));
        assert!(transmitter.display().commands().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn empty_file_leaves_display_untouched_test() {
        let path = temp_input("empty", b"");
        let transmitter = Transmitter::new(config(255), FakeDisplay::new()).unwrap();
        let report = transmitter.transmit_file(&path).await.unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(report.frames, 0);
        assert_eq!(report.symbols, 0);
        assert!(transmitter.display().commands().is_empty());
    }

    #[tokio::test]
    async fn load_frames_test() {
        let path = temp_input("load", b"covert");
        let cfg = config(20);
        let frames = load_frames(&cfg, &path).await.unwrap();
        std::fs::remove_file(&path).unwrap();
        // 48 bits in chunks of 20
        assert_eq!(frames.len(), 3);
        assert!(frames.iter().all(|f| f.check() == FrameMatchResult::Complete));
        assert_eq!(
            estimated_air_time(&cfg, &frames),
            Duration::from_millis(33) * (48 + 3 * 32)
        );
    }

    #[test]
    fn report_serializes_test() {
        let cfg = Config::default();
        let report = super::TransmissionReport::new(
            &cfg,
            &Default::default(),
            None,
            &Default::default(),
            Duration::from_millis(1500),
        );
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["frames"], 0);
        assert_eq!(json["elapsed_ms"], 1500);
        assert_eq!(json["symbol_duration_ms"], 33);
        assert!(json["output"].is_null());
    }
}
