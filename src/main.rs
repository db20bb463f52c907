use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Instant;

use anyhow::Context;
use clap::Parser;
use log::{error, info};

use strobe_link::protocol::{CrcVariant, FrameMatchResult};
use strobe_link::runtime::estimated_air_time;
use strobe_link::{load_frames, Config, Transmitter, XrandrDisplay};

/// Leak a file through screen brightness, one on-off keyed bit per symbol
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// File to transmit
    #[arg(short, long)]
    filename: PathBuf,

    /// Brightness used for bit 0, in (0, 1) [default: 0.5]
    #[arg(short, long)]
    brightness: Option<f64>,

    /// Payload bits per frame, in (0, 255] [default: 255]
    #[arg(short, long = "data-len", alias = "data_len")]
    data_len: Option<usize>,

    /// Symbol duration in milliseconds [default: 33]
    #[arg(short, long = "symbol-ms")]
    symbol_ms: Option<u64>,

    /// Output to drive instead of the primary one
    #[arg(short, long)]
    output: Option<String>,

    /// Frame checksum: kermit (reflected CCITT) or xmodem
    #[arg(long)]
    crc: Option<CrcVariant>,

    /// JSON config file, flags given here take precedence
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Build and check the frames without touching the display
    #[arg(long)]
    dry_run: bool,

    /// Write the framed bitstream, packed MSB first, to this file
    #[arg(long)]
    dump: Option<PathBuf>,

    /// Print the transmission report as JSON on stdout
    #[arg(long)]
    report_json: bool,
}

fn build_config(args: &Args) -> anyhow::Result<Config> {
    let mut cfg = match &args.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };
    if let Some(brightness) = args.brightness {
        cfg.off_level = brightness;
    }
    if let Some(data_len) = args.data_len {
        cfg.payload_capacity = data_len;
    }
    if let Some(symbol_ms) = args.symbol_ms {
        cfg.symbol_duration_ms = symbol_ms;
    }
    if let Some(crc) = args.crc {
        cfg.crc = crc;
    }
    if args.output.is_some() {
        cfg.output = args.output.clone();
    }
    cfg.validate()?;
    Ok(cfg)
}

async fn run(args: Args) -> anyhow::Result<()> {
    let started = Instant::now();
    let cfg = Arc::new(build_config(&args)?);
    let transmitter = Transmitter::new(cfg, XrandrDisplay::new())?;

    let frames = load_frames(transmitter.config(), &args.filename)
        .await
        .with_context(|| format!("preparing {}", args.filename.display()))?;

    if let Some(dump) = &args.dump {
        let packed = frames.pack();
        tokio::fs::write(dump, &packed[..])
            .await
            .with_context(|| format!("writing dump {}", dump.display()))?;
        info!("Wrote {} bytes of framed bitstream to {}", packed.len(), dump.display());
    }

    if args.dry_run {
        let broken = frames
            .iter()
            .filter(|frame| frame.check() != FrameMatchResult::Complete)
            .count();
        if broken > 0 {
            return Err(anyhow::anyhow!("{} frames failed self check", broken));
        }
        info!(
            "Dry run: {} frames, {} symbols, estimated air time {:.1} seconds",
            frames.len(),
            frames.wire_len_bits(),
            estimated_air_time(transmitter.config(), &frames).as_secs_f64()
        );
        return Ok(());
    }

    let report = transmitter
        .transmit(&frames)
        .await
        .context("transmission failed")?;
    if args.report_json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    }

    info!("Execution finished!");
    info!(
        "Total execution time: {:.3} seconds",
        started.elapsed().as_secs_f64()
    );
    Ok(())
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(err) => {
            error!("Cannot start runtime: {}", err);
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run(args)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("Execution failed! {:#}", err);
            ExitCode::FAILURE
        }
    }
}
