//! velokeys - velocity-sensitive keybed to MIDI, from the command line
//!
//! Manages the config file and runs the interpretation engine against a
//! simulated keybed, printing the MIDI byte stream a real controller
//! would put on the wire.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use velokeys_core::{
    note_name, CaptureTransport, Config, Engine, KeyPhase, SimMatrix, KEY_COUNT,
};

#[derive(Parser)]
#[command(name = "velokeys")]
#[command(author, version, about = "Velocity-sensitive keybed to MIDI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file path (default: ~/.config/velokeys/config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// MIDI channel (1-16)
    #[arg(long)]
    channel: Option<u8>,

    /// MIDI note of the lowest key
    #[arg(long)]
    pitch_offset: Option<i16>,

    /// Semitone transpose
    #[arg(long)]
    transpose: Option<i16>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a default configuration file
    Init,
    /// Show the configuration file path
    ConfigPath,
    /// Run gestures through the engine and print the MIDI stream
    Simulate {
        /// Gestures as KEY[:TRAVEL[:HOLD]], e.g. "0:3:5" for key 0,
        /// 3 half-press cycles, held 5 cycles
        #[arg(required = true)]
        gestures: Vec<String>,
    },
}

fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Init => {
            let path = Config::create_default_config_file()?;
            println!("Created default config at: {}", path.display());
            Ok(())
        }
        Commands::ConfigPath => {
            let path = Config::config_path()?;
            println!("{}", path.display());
            Ok(())
        }
        Commands::Simulate { ref gestures } => {
            let config = load_config(&cli)?;
            let gestures = gestures
                .iter()
                .map(|g| parse_gesture(g))
                .collect::<Result<Vec<_>>>()?;
            simulate(&config, &gestures)
        }
    }
}

fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::load_from(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => Config::load_or_default(),
    };

    if let Some(channel) = cli.channel {
        config.shaping.channel = channel.clamp(1, 16);
    }
    if let Some(pitch_offset) = cli.pitch_offset {
        config.shaping.pitch_offset = pitch_offset;
    }
    if let Some(transpose) = cli.transpose {
        config.shaping.transpose = transpose;
    }
    Ok(config)
}

/// One simulated keystroke: travel cycles half-pressed, hold cycles at
/// the bottom, then release.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Gesture {
    key: u8,
    travel: u8,
    hold: u8,
}

fn parse_gesture(spec: &str) -> Result<Gesture> {
    let mut parts = spec.split(':');
    let key: u8 = parts
        .next()
        .unwrap_or_default()
        .parse()
        .with_context(|| format!("bad gesture {:?}: expected KEY[:TRAVEL[:HOLD]]", spec))?;
    if usize::from(key) >= KEY_COUNT {
        bail!("bad gesture {:?}: key must be 0..{}", spec, KEY_COUNT - 1);
    }
    let travel: u8 = match parts.next() {
        Some(t) => t
            .parse()
            .with_context(|| format!("bad gesture {:?}: travel is not a number", spec))?,
        None => 0,
    };
    let hold: u8 = match parts.next() {
        Some(h) => h
            .parse()
            .with_context(|| format!("bad gesture {:?}: hold is not a number", spec))?,
        None => 1,
    };
    if parts.next().is_some() {
        bail!("bad gesture {:?}: too many fields", spec);
    }
    Ok(Gesture { key, travel, hold })
}

fn simulate(config: &Config, gestures: &[Gesture]) -> Result<()> {
    let mut engine = Engine::from_config(config);
    let mut matrix = SimMatrix::new(config.to_geometry());
    let mut transport = CaptureTransport::new();
    let mut cycle = 0usize;

    for gesture in gestures {
        log::debug!("gesture: {:?}", gesture);

        for _ in 0..gesture.travel {
            matrix.set_phase(gesture.key, KeyPhase::HalfPressed);
            engine.cycle(&mut matrix, &mut transport)?;
            drain(&mut transport, &mut cycle);
        }
        matrix.set_phase(gesture.key, KeyPhase::FullPressed);
        for _ in 0..gesture.hold.max(1) {
            engine.cycle(&mut matrix, &mut transport)?;
            drain(&mut transport, &mut cycle);
        }
        matrix.set_phase(gesture.key, KeyPhase::Released);
        engine.cycle(&mut matrix, &mut transport)?;
        drain(&mut transport, &mut cycle);
    }

    Ok(())
}

/// Print the bytes captured during the last cycle, one message per line.
fn drain(transport: &mut CaptureTransport, cycle: &mut usize) {
    let bytes = transport.take();
    for message in bytes.chunks_exact(3) {
        println!(
            "cycle {:4}  {:02X} {:02X} {:02X}  {:>4} {}",
            *cycle,
            message[0],
            message[1],
            message[2],
            describe_status(message[0]),
            note_name(message[1])
        );
    }
    *cycle += 1;
}

fn describe_status(status: u8) -> &'static str {
    match status & 0xF0 {
        0x90 => "on",
        0x80 => "off",
        _ => "?",
    }
}
