use std::time::Duration;

use log::{debug, trace};
use tokio::time::{sleep_until, Instant};

use crate::config::Config;
use crate::display::{Brightness, DisplayController, OutputId};
use crate::error::StrobeResult;
use crate::protocol::Bit;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ModulatorState {
    Idle,
    // index of the symbol in the whole transmission
    Emitting(usize),
    Restored,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SymbolStats {
    pub symbols: usize,
    // commands that alone took longer than a symbol
    pub overruns: usize,
    pub total_latency: Duration,
    pub max_latency: Duration,
}

impl SymbolStats {
    fn record(&mut self, latency: Duration, symbol_duration: Duration) {
        self.symbols += 1;
        self.total_latency += latency;
        self.max_latency = self.max_latency.max(latency);
        if latency > symbol_duration {
            self.overruns += 1;
        }
    }

    pub fn mean_latency(&self) -> Duration {
        if self.symbols == 0 {
            return Duration::ZERO;
        }
        self.total_latency / self.symbols as u32
    }
}

/// On-off keying over a display's brightness.
///
/// Every bit holds the output at `on_level` (1) or `off_level` (0) for one
/// symbol duration. The deadline of a symbol is anchored at the moment its
/// command was issued, so a slow command pushes the following symbols back
/// instead of shortening or dropping them.
pub struct Modulator<'a, D: DisplayController + ?Sized> {
    display: &'a D,
    output: OutputId,
    symbol_duration: Duration,
    on_level: Brightness,
    off_level: Brightness,
    state: ModulatorState,
    stats: SymbolStats,
}

impl<'a, D: DisplayController + ?Sized> Modulator<'a, D> {
    pub fn new(
        display: &'a D,
        output: OutputId,
        symbol_duration: Duration,
        on_level: Brightness,
        off_level: Brightness,
    ) -> Self {
        Modulator {
            display,
            output,
            symbol_duration,
            on_level,
            off_level,
            state: ModulatorState::Idle,
            stats: SymbolStats::default(),
        }
    }

    pub fn from_config(display: &'a D, output: OutputId, cfg: &Config) -> StrobeResult<Self> {
        Ok(Modulator::new(
            display,
            output,
            cfg.symbol_duration(),
            cfg.on_level(),
            cfg.off_level()?,
        ))
    }

    pub fn state(&self) -> ModulatorState {
        self.state
    }

    pub fn stats(&self) -> &SymbolStats {
        &self.stats
    }

    pub fn output(&self) -> &OutputId {
        &self.output
    }

    pub fn level_for(&self, bit: Bit) -> Brightness {
        match bit {
            Bit::ONE => self.on_level,
            Bit::ZERO => self.off_level,
        }
    }

    /// Emit one frame's wire bits; display errors abort at the failing symbol
    pub async fn emit(&mut self, bits: &[Bit]) -> StrobeResult<()> {
        for bit in bits {
            self.emit_symbol(*bit).await?;
        }
        Ok(())
    }

    async fn emit_symbol(&mut self, bit: Bit) -> StrobeResult<()> {
        let index = self.stats.symbols;
        self.state = ModulatorState::Emitting(index);

        let start = Instant::now();
        let level = self.level_for(bit);
        self.display.set_brightness(&self.output, level).await?;
        let latency = start.elapsed();
        self.stats.record(latency, self.symbol_duration);

        let deadline = start + self.symbol_duration;
        if Instant::now() < deadline {
            trace!("symbol {} bit {} level {} latency {:?}", index, bit, level, latency);
            sleep_until(deadline).await;
        } else {
            debug!(
                "symbol {} overrun, command took {:?} of {:?}",
                index, latency, self.symbol_duration
            );
        }
        Ok(())
    }

    /// Back to full brightness once the whole transmission is out, not paced
    pub async fn restore(&mut self) -> StrobeResult<()> {
        self.display.set_brightness(&self.output, self.on_level).await?;
        self.state = ModulatorState::Restored;
        debug!("Output {} restored to {}", &self.output, self.on_level);
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use std::time::Duration;

    use tokio::time::Instant;

    use crate::config::Config;
    use crate::display::fake::FakeDisplay;
    use crate::display::{Brightness, DisplayController, OutputId};
    use crate::protocol::{Bit, BitVec};

    use super::{Modulator, ModulatorState};

    const SYMBOL: Duration = Duration::from_millis(33);

    fn modulator<'a>(display: &'a FakeDisplay) -> Modulator<'a, FakeDisplay> {
        Modulator::new(
            display,
            OutputId::new("FAKE-1"),
            SYMBOL,
            Brightness::FULL,
            Brightness::new(0.5).unwrap(),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn emit_one_zero_one_test() {
        let display = FakeDisplay::new();
        let mut modulator = modulator(&display);
        assert_eq!(modulator.state(), ModulatorState::Idle);

        let begin = Instant::now();
        modulator.emit(&[Bit::ONE, Bit::ZERO, Bit::ONE]).await.unwrap();
        assert_eq!(modulator.state(), ModulatorState::Emitting(2));
        assert_eq!(begin.elapsed(), SYMBOL * 3);

        modulator.restore().await.unwrap();
        assert_eq!(modulator.state(), ModulatorState::Restored);
        // restoration is not paced
        assert_eq!(begin.elapsed(), SYMBOL * 3);

        assert_eq!(display.levels(), vec![1.0, 0.5, 1.0, 1.0]);
        let commands = display.commands();
        for (i, command) in commands.iter().enumerate() {
            assert_eq!(command.at - begin, SYMBOL * i as u32);
            assert_eq!(command.output.as_str(), "FAKE-1");
        }
        assert_eq!(modulator.stats().symbols, 3);
        assert_eq!(modulator.stats().overruns, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn latency_is_compensated_test() {
        let display = FakeDisplay::new().with_latency(Duration::from_millis(10));
        let mut modulator = modulator(&display);
        let begin = Instant::now();
        modulator.emit(&BitVec::parse("0110").0).await.unwrap();
        assert_eq!(begin.elapsed(), SYMBOL * 4);

        let starts: Vec<Duration> = display.commands().iter().map(|c| c.at - begin).collect();
        assert_eq!(starts, vec![SYMBOL * 0, SYMBOL, SYMBOL * 2, SYMBOL * 3]);
        assert_eq!(modulator.stats().max_latency, Duration::from_millis(10));
        assert_eq!(modulator.stats().mean_latency(), Duration::from_millis(10));
        assert_eq!(modulator.stats().overruns, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_command_drifts_without_skipping_test() {
        let slow = Duration::from_millis(50);
        let display = FakeDisplay::new().with_latency(slow);
        let mut modulator = modulator(&display);
        let begin = Instant::now();
        modulator.emit(&[Bit::ONE, Bit::ZERO, Bit::ONE]).await.unwrap();

        // no extra sleep once the command alone exceeds the symbol
        assert_eq!(begin.elapsed(), slow * 3);
        assert_eq!(display.commands().len(), 3);
        let starts: Vec<Duration> = display.commands().iter().map(|c| c.at - begin).collect();
        assert_eq!(starts, vec![Duration::ZERO, slow, slow * 2]);
        assert_eq!(modulator.stats().overruns, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn restore_once_after_all_frames_test() {
        let display = FakeDisplay::new();
        let mut modulator = modulator(&display);
        modulator.emit(&BitVec::parse("10").0).await.unwrap();
        modulator.emit(&BitVec::parse("00").0).await.unwrap();
        assert_eq!(modulator.state(), ModulatorState::Emitting(3));
        modulator.restore().await.unwrap();

        // last bit was 0, the final command still brings the output back to full
        assert_eq!(display.levels(), vec![1.0, 0.5, 0.5, 0.5, 1.0]);
    }

    #[tokio::test(start_paused = true)]
    async fn device_error_stops_emission_test() {
        let display = FakeDisplay::new().fail_after(1);
        let mut modulator = modulator(&display);
        let err = modulator
            .emit(&[Bit::ONE, Bit::ZERO, Bit::ONE])
            .await
            .unwrap_err();
        assert!(err.is_device());
        assert_eq!(display.commands().len(), 1);
        assert_eq!(modulator.state(), ModulatorState::Emitting(1));
        assert_eq!(modulator.stats().symbols, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn from_config_test() {
        let display = FakeDisplay::new();
        let output = display.identify_active_output().await.unwrap();
        let mut cfg = Config::default();
        cfg.off_level = 0.9;
        cfg.symbol_duration_ms = 20;
        let modulator = Modulator::from_config(&display, output, &cfg).unwrap();
        assert_eq!(modulator.level_for(Bit::ZERO).value(), 0.9);
        assert_eq!(modulator.level_for(Bit::ONE).value(), 1.0);

        cfg.off_level = 1.0;
        let output = OutputId::new("FAKE-1");
        assert!(Modulator::from_config(&display, output, &cfg)
            .err()
            .unwrap()
            .is_configuration());
    }
}
