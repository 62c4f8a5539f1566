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
use std::io;
use std::str::FromStr;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender, TryRecvError};
use tracing::{error, info, span, warn, Level};

use crate::engine::Engine;
use crate::samples::SlotId;
use crate::session::{GestureOutcome, SlotStatus};

pub mod keyboard;

/// Commands that drive the engine, standing in for pad, key and transport widgets.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Presses a pad.
    Press(SlotId),
    /// Releases a pad.
    Release(SlotId),
    /// Presses a pad's delete control.
    Delete(SlotId),
    /// Presses a key.
    Key(SlotId),
    /// Releases a key.
    KeyUp(SlotId),
    /// Starts the pattern.
    Start,
    /// Stops the pattern.
    Stop,
    /// Sets the tempo.
    SetBpm(f64),
    /// Raises the tempo by one increment.
    BpmUp,
    /// Lowers the tempo by one increment.
    BpmDown,
    /// Flips a pattern cell.
    Toggle { row: usize, column: usize },
    /// Clears the pattern.
    Clear,
    /// Reports engine state.
    Status,
    /// Shuts down.
    Quit,
}

/// Why a command line could not be parsed.
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum CommandError {
    #[error("empty command")]
    Empty,
    #[error("unknown command {0}")]
    Unknown(String),
    #[error("{command} needs a {argument}")]
    MissingArgument {
        command: &'static str,
        argument: &'static str,
    },
    #[error("invalid {argument} {value:?} for {command}")]
    InvalidArgument {
        command: &'static str,
        argument: &'static str,
        value: String,
    },
}

fn argument<T: FromStr>(
    words: &mut std::str::SplitWhitespace<'_>,
    command: &'static str,
    argument: &'static str,
) -> Result<T, CommandError> {
    let value = words
        .next()
        .ok_or(CommandError::MissingArgument { command, argument })?;
    value.parse().map_err(|_| CommandError::InvalidArgument {
        command,
        argument,
        value: value.to_string(),
    })
}

impl FromStr for Command {
    type Err = CommandError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut words = s.split_whitespace();
        let Some(verb) = words.next() else {
            return Err(CommandError::Empty);
        };
        let slot = |words: &mut std::str::SplitWhitespace<'_>, command| {
            argument::<u16>(words, command, "slot").map(SlotId)
        };

        let command = match verb.to_ascii_lowercase().as_str() {
            "press" => Command::Press(slot(&mut words, "press")?),
            "release" => Command::Release(slot(&mut words, "release")?),
            "delete" => Command::Delete(slot(&mut words, "delete")?),
            "key" => Command::Key(slot(&mut words, "key")?),
            "keyup" => Command::KeyUp(slot(&mut words, "keyup")?),
            "start" | "play" => Command::Start,
            "stop" => Command::Stop,
            "bpm" => Command::SetBpm(argument(&mut words, "bpm", "tempo")?),
            "bpm+" => Command::BpmUp,
            "bpm-" => Command::BpmDown,
            "toggle" => Command::Toggle {
                row: argument(&mut words, "toggle", "row")?,
                column: argument(&mut words, "toggle", "column")?,
            },
            "clear" => Command::Clear,
            "status" => Command::Status,
            "quit" | "exit" => Command::Quit,
            other => return Err(CommandError::Unknown(other.to_string())),
        };
        Ok(command)
    }
}

/// Whether the control loop should keep going.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// Applies a command to the engine. Rejected gestures are logged and the
/// engine keeps running.
pub fn dispatch(engine: &mut Engine, command: &Command, now: Duration) -> Flow {
    let gesture = match *command {
        Command::Press(slot) => Some((slot, engine.pad_pressed(slot))),
        Command::Release(slot) => Some((slot, engine.pad_released(slot))),
        Command::Delete(slot) => Some((slot, engine.pad_delete_pressed(slot))),
        Command::Key(slot) => Some((slot, engine.key_pressed(slot))),
        Command::KeyUp(slot) => Some((slot, engine.key_released(slot))),
        Command::Start => {
            engine.start(now);
            None
        }
        Command::Stop => {
            engine.stop();
            None
        }
        Command::SetBpm(bpm) => {
            let bpm = engine.set_bpm(bpm);
            info!(bpm, "Tempo set");
            None
        }
        Command::BpmUp => {
            let bpm = engine.adjust_bpm(1);
            info!(bpm, "Tempo raised");
            None
        }
        Command::BpmDown => {
            let bpm = engine.adjust_bpm(-1);
            info!(bpm, "Tempo lowered");
            None
        }
        Command::Toggle { row, column } => {
            if let Err(e) = engine.toggle_step(row, column) {
                warn!(error = %e, "Toggle rejected");
            }
            None
        }
        Command::Clear => {
            engine.clear_pattern();
            None
        }
        Command::Status => {
            report_status(engine);
            None
        }
        Command::Quit => return Flow::Quit,
    };

    if let Some((slot, result)) = gesture {
        match result {
            Ok(GestureOutcome::Ignored) => {}
            Ok(outcome) => info!(slot = %slot, ?outcome, "Gesture handled"),
            Err(e) => warn!(slot = %slot, error = %e, "Gesture rejected"),
        }
    }
    Flow::Continue
}

fn report_status(engine: &Engine) {
    info!(
        running = engine.is_running(),
        bpm = engine.bpm(),
        step = engine.current_step(),
        voices = engine.active_voice_count(),
        capturing = engine.is_capturing(),
        "Status"
    );
    for slot in (0..engine.slot_count()).map(|s| SlotId(s as u16)) {
        if let Ok(status) = engine.slot_status(slot) {
            if status != SlotStatus::Empty {
                info!(slot = %slot, %status, "Slot");
            }
        }
    }
    for (row, name) in engine.instruments().iter().enumerate() {
        if let Some(cells) = engine.pattern().row(row) {
            let cells: String = cells.iter().map(|&on| if on { 'x' } else { '.' }).collect();
            info!(row, instrument = name.as_str(), pattern = cells.as_str(), "Row");
        }
    }
}

/// Produces commands for the control loop.
pub trait Driver: Send + Sync + 'static {
    fn monitor_events(&self, events_tx: Sender<Command>) -> JoinHandle<Result<(), io::Error>>;
}

/// Runs the control loop: drains commands and polls the clock every tick.
pub struct Controller {
    events_rx: Receiver<Command>,
    handle: Option<JoinHandle<Result<(), io::Error>>>,
}

impl Controller {
    /// Creates a controller and starts its driver.
    pub fn new(driver: Arc<dyn Driver>) -> Controller {
        let (events_tx, events_rx) = crossbeam_channel::unbounded();
        let handle = driver.monitor_events(events_tx);
        Controller {
            events_rx,
            handle: Some(handle),
        }
    }

    /// Runs until a quit command arrives or the driver goes away.
    pub fn run(&mut self, engine: &mut Engine, tick: Duration) -> Result<(), Box<dyn Error>> {
        let span = span!(Level::INFO, "controller");
        let _enter = span.enter();

        let origin = Instant::now();
        info!(tick = ?tick, "Controller started.");

        loop {
            let now = origin.elapsed();
            match self.step(engine, now) {
                Flow::Continue => {}
                Flow::Quit => break,
            }

            // Wake early when a step is due before the next tick.
            let wait = engine
                .time_until_next(origin.elapsed())
                .map_or(tick, |due| due.min(tick));
            spin_sleep::sleep(wait);
        }

        info!("Controller closing.");
        engine.shutdown();
        if let Some(handle) = self.handle.take() {
            // The stdin driver may be blocked on a read; only reap it if done.
            if handle.is_finished() {
                match handle.join() {
                    Ok(Err(e)) => error!("Error from event driver: {}", e),
                    Err(_) => error!("Event driver panicked"),
                    Ok(Ok(())) => {}
                }
            }
        }
        Ok(())
    }

    /// Handles pending commands, then fires due steps.
    fn step(&mut self, engine: &mut Engine, now: Duration) -> Flow {
        loop {
            match self.events_rx.try_recv() {
                Ok(command) => {
                    if dispatch(engine, &command, now) == Flow::Quit {
                        return Flow::Quit;
                    }
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    info!("Event driver closed.");
                    return Flow::Quit;
                }
            }
        }
        engine.poll(now);
        Flow::Continue
    }
}
