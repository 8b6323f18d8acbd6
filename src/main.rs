use ayycore::gameboy::GameBoy;
use ayycore::lr35902::{T_CYCLES_PER_FRAME, T_CYCLES_PER_SECOND};
use clap::{Parser, ValueEnum};
use log::{debug, info, LevelFilter};
use snafu::{ResultExt, Whatever};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(version, about = "Runs a DMG cartridge headless for a fixed number of cycles")]
struct Args {
    /// Cartridge image
    rom: PathBuf,

    /// 256-byte DMG boot ROM. Without it the CPU starts at $0100
    #[arg(short, long)]
    bootrom: Option<PathBuf>,

    /// T-cycles to run, defaults to 60 frames
    #[arg(short, long, default_value_t = 60 * T_CYCLES_PER_FRAME)]
    cycles: usize,

    #[arg(short, long, value_enum, default_value_t = LogLevel::Info)]
    log_level: LogLevel,

    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Where to dump cartridge RAM after the run
    #[arg(short, long)]
    save_ram: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> LevelFilter {
        match level {
            LogLevel::Off => LevelFilter::Off,
            LogLevel::Error => LevelFilter::Error,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Trace => LevelFilter::Trace,
        }
    }
}

fn setup_logger(level: LevelFilter, log_file: Option<&PathBuf>) -> Result<(), Whatever> {
    let mut dispatch = fern::Dispatch::new()
        .format(|out, message, record| out.finish(format_args!("[{}] [{}] {}", record.level(), record.target(), message)))
        .level(level)
        .chain(std::io::stderr());

    if let Some(path) = log_file {
        let file = fern::log_file(path).with_whatever_context(|_| format!("Failed to open log file {}", path.display()))?;
        dispatch = dispatch.chain(file);
    }

    dispatch.apply().whatever_context("Failed to install logger")
}

#[snafu::report]
fn main() -> Result<(), Whatever> {
    let args = Args::parse();
    setup_logger(args.log_level.into(), args.log_file.as_ref())?;

    let rom = std::fs::read(&args.rom).with_whatever_context(|_| format!("Failed to read ROM {}", args.rom.display()))?;
    let mut gb = match &args.bootrom {
        Some(path) => {
            let bootrom = std::fs::read(path).with_whatever_context(|_| format!("Failed to read boot ROM {}", path.display()))?;
            GameBoy::with_bootrom(bootrom, rom)
        }
        None => GameBoy::new(rom),
    }
    .whatever_context("Failed to load cartridge")?;

    let elapsed = gb
        .run_for(args.cycles, |cycles, event| debug!("I/O event at cycle {}: {:?}", cycles, event))
        .whatever_context("CPU fault")?;

    info!(
        "Ran {} cycles ({} frames, {:.2}s of emulated time)",
        elapsed,
        elapsed / T_CYCLES_PER_FRAME,
        elapsed as f64 / T_CYCLES_PER_SECOND as f64
    );
    info!("{}", gb.cpu());

    if let Some(path) = &args.save_ram {
        if gb.ram().is_empty() {
            info!("Cartridge has no RAM, not writing {}", path.display());
        } else {
            std::fs::write(path, gb.ram()).with_whatever_context(|_| format!("Failed to write save RAM {}", path.display()))?;
            info!("Wrote {} bytes of save RAM to {}", gb.ram().len(), path.display());
        }
    }

    Ok(())
}
