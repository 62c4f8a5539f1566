// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//
use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use beetbox::audio::cpal::Device;
use beetbox::config::EngineConfig;
use beetbox::controller::{keyboard, Controller};
use beetbox::{audio, kit, Engine};
use clap::{crate_version, Parser, Subcommand};
use duration_string::DurationString;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// How long sounding voices may ring after a timed run ends.
const RING_OUT: Duration = Duration::from_millis(500);

#[derive(Parser)]
#[clap(
    author = "Michael Wilson",
    version = crate_version!(),
    about = "A sampler pad, step sequencer and keyboard engine."
)]
struct Cli {
    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Lists the available audio input and output devices.
    Devices {},
    /// Runs the engine, reading commands from stdin.
    Run {
        /// The path to the engine config.
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Loads the built-in drum kit into the instrument rows.
        #[arg(long, conflicts_with = "piano")]
        kit: bool,
        /// Loads one octave of tones into the first twelve slots.
        #[arg(long)]
        piano: bool,
    },
    /// Plays a pattern with the built-in drum kit for a fixed time.
    Sequence {
        /// The path to the engine config.
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// The tempo. Clamped into the configured range.
        #[arg(short, long)]
        bpm: Option<f64>,
        /// A pattern row in the form <ROW>=<STEP>,<STEP>,...
        /// For example, 0=0,4,8,12.
        #[arg(short, long = "row")]
        rows: Vec<String>,
        /// How long to play, e.g. 8s.
        #[arg(short, long, default_value = "8s")]
        duration: String,
    },
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Devices {} => {
            let devices = audio::list_devices()?;

            if devices.is_empty() {
                println!("No devices found.");
                return Ok(());
            }

            println!("Devices:");
            for device in devices {
                println!("- {}", device);
            }
        }
        Commands::Run { config, kit, piano } => {
            let config = load_config(config)?;
            let tick = config.control().tick()?;
            let (mut engine, ports) = Engine::new(&config);

            if kit {
                load_drum_kit(&mut engine, &config)?;
            }
            if piano {
                for (slot, buffer) in kit::piano(config.audio().sample_rate()) {
                    engine.load_slot(slot, buffer)?;
                }
            }

            let device = Device::start(config.audio(), ports)?;
            if !device.capture_enabled() {
                warn!("Recording is disabled, pads will only play loaded slots");
            }
            info!(device = %device, "Audio running");

            let mut controller = Controller::new(Arc::new(keyboard::Driver::new()));
            controller.run(&mut engine, tick)?;
        }
        Commands::Sequence {
            config,
            bpm,
            rows,
            duration,
        } => {
            let config = load_config(config)?;
            let tick = config.control().tick()?;
            let duration: Duration = DurationString::from_string(duration)?.into();
            let (mut engine, ports) = Engine::new(&config);

            load_drum_kit(&mut engine, &config)?;
            for row in &rows {
                let (row, steps) = parse_row(row)?;
                for step in steps {
                    engine.set_step(row, step, true)?;
                }
            }
            if let Some(bpm) = bpm {
                engine.set_bpm(bpm);
            }

            let _device = Device::start(config.audio(), ports)?;
            let origin = Instant::now();
            engine.start(origin.elapsed());
            while origin.elapsed() < duration {
                engine.poll(origin.elapsed());
                let wait = engine
                    .time_until_next(origin.elapsed())
                    .map_or(tick, |due| due.min(tick));
                spin_sleep::sleep(wait);
            }
            engine.stop();
            spin_sleep::sleep(RING_OUT);
            engine.shutdown();
        }
    };

    Ok(())
}

fn load_config(path: Option<PathBuf>) -> Result<EngineConfig, Box<dyn Error>> {
    match path {
        Some(path) => Ok(EngineConfig::load(&path)?),
        None => Ok(EngineConfig::default()),
    }
}

fn load_drum_kit(engine: &mut Engine, config: &EngineConfig) -> Result<(), Box<dyn Error>> {
    let mut rng = rand::thread_rng();
    let instruments = config.sequencer().instruments();
    for (slot, buffer) in kit::drum_kit(&instruments, config.audio().sample_rate(), &mut rng) {
        engine.load_slot(slot, buffer)?;
    }
    Ok(())
}

/// Parses a row in the form <ROW>=<STEP>,<STEP>,...
fn parse_row(spec: &str) -> Result<(usize, Vec<usize>), Box<dyn Error>> {
    let (row, steps) = spec
        .split_once('=')
        .ok_or_else(|| format!("row {} should look like <ROW>=<STEP>,<STEP>", spec))?;
    let row = row.trim().parse::<usize>()?;
    let steps = steps
        .split(',')
        .map(str::trim)
        .filter(|step| !step.is_empty())
        .map(str::parse::<usize>)
        .collect::<Result<Vec<usize>, _>>()?;
    Ok((row, steps))
}

#[cfg(test)]
mod test {
    use super::parse_row;

    #[test]
    fn test_parse_row() {
        assert_eq!(parse_row("0=0,4,8,12").unwrap(), (0, vec![0, 4, 8, 12]));
        assert_eq!(parse_row(" 2 = 1, 3,").unwrap(), (2, vec![1, 3]));
        assert_eq!(parse_row("3=").unwrap(), (3, vec![]));
        assert!(parse_row("0:1").is_err());
        assert!(parse_row("x=1").is_err());
        assert!(parse_row("1=a").is_err());
    }
}
