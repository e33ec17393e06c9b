//! cyclenes CLI: load an iNES image, run it headless for a number of frames,
//! and optionally disassemble the reset routine or save the last frame.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, ValueEnum};
use tracing::{Level, info};

use cyclenes::bus::CpuBus;
use cyclenes::cpu::{RESET_VECTOR, disassemble_bus};
use cyclenes::{Cartridge, Console};

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => Level::ERROR,
            LogLevel::Warn => Level::WARN,
            LogLevel::Info => Level::INFO,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Trace => Level::TRACE,
        }
    }
}

/// Cycle-stepped NES core, headless runner
#[derive(Parser, Debug)]
#[command(name = "cyclenes", version, about, long_about = None)]
struct Args {
    /// Path to the iNES ROM file
    #[arg(short, long)]
    rom: PathBuf,

    /// Number of frames to run
    #[arg(short, long, default_value_t = 60)]
    frames: u64,

    /// Log verbosity
    #[arg(short, long, value_enum, default_value_t = LogLevel::Warn)]
    log_level: LogLevel,

    /// Disassemble this many instructions from the reset vector before running
    #[arg(short, long)]
    disassemble: Option<usize>,

    /// Write the last frame as PNG (needs the `screenshot` feature)
    #[arg(short, long)]
    screenshot: Option<PathBuf>,
}

fn main() -> ExitCode {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_max_level(Level::from(args.log_level))
        .with_target(false)
        .init();

    let cartridge = match Cartridge::from_ines_file(&args.rom) {
        Ok(cart) => cart,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::FAILURE;
        }
    };

    println!("Loaded {}:", args.rom.display());
    println!("  Mapper:    {}", cartridge.mapper_id());
    println!("  Mirroring: {:?}", cartridge.mirroring());
    println!("  Battery:   {}", cartridge.battery_backed());

    let mut console = Console::with_cartridge(cartridge);

    if let Some(count) = args.disassemble {
        let bus = console.bus();
        let start = u16::from_le_bytes([bus.peek(RESET_VECTOR), bus.peek(RESET_VECTOR + 1)]);
        println!("\nReset routine:");
        for line in disassemble_bus(bus, start, count) {
            println!("  {line}");
        }
    }

    info!(frames = args.frames, "running");
    for _ in 0..args.frames {
        console.run_frame();
    }

    let cpu = console.cpu();
    let state = cpu.state();
    println!("\nCompleted {} frames.", args.frames);
    println!(
        "  PC: ${:04X}  A: ${:02X}  X: ${:02X}  Y: ${:02X}  SP: ${:02X}  P: ${:02X}",
        state.pc(),
        state.a(),
        state.x(),
        state.y(),
        state.sp(),
        state.status()
    );
    println!("  CPU cycles: {}", cpu.cycles());
    if cpu.is_jammed() {
        println!("  CPU is jammed");
    }

    if let Some(path) = args.screenshot {
        return save_screenshot(console.frame(), &path);
    }
    ExitCode::SUCCESS
}

#[cfg(feature = "screenshot")]
fn save_screenshot(frame: &[u8], path: &std::path::Path) -> ExitCode {
    match cyclenes::ppu::palette::save_png(frame, path) {
        Ok(()) => {
            println!("Saved frame to {}", path.display());
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: failed to write {}: {e}", path.display());
            ExitCode::FAILURE
        }
    }
}

#[cfg(not(feature = "screenshot"))]
fn save_screenshot(_frame: &[u8], path: &std::path::Path) -> ExitCode {
    eprintln!(
        "error: cannot write {}: built without the `screenshot` feature",
        path.display()
    );
    ExitCode::FAILURE
}
