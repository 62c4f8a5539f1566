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
use std::io;
use std::thread::{self, JoinHandle};

use crossbeam_channel::Sender;
use tracing::{info, span, warn, Level};

use super::Command;

const PROMPT: &str =
    "Command (press|release|delete|key|keyup N, start, stop, bpm N, bpm+, bpm-, toggle R C, clear, status, quit): ";

/// A driver that reads line commands from stdin.
pub struct Driver {}

impl Driver {
    pub fn new() -> Driver {
        Driver {}
    }

    /// Reads and forwards one command. Returns false at end of input.
    fn monitor_io<R, W>(
        events_tx: &Sender<Command>,
        mut reader: R,
        mut writer: W,
    ) -> Result<bool, io::Error>
    where
        R: io::BufRead,
        W: io::Write,
    {
        write!(writer, "{}", PROMPT)?;
        writer.flush()?;
        let mut input: String = String::default();
        if reader.read_line(&mut input)? == 0 {
            return Ok(false);
        }
        if input.trim().is_empty() {
            return Ok(true);
        }

        match input.parse::<Command>() {
            Ok(command) => events_tx
                .send(command)
                .map_err(|e| io::Error::new(io::ErrorKind::BrokenPipe, e))?,
            Err(e) => warn!(input = input.trim(), error = %e, "Unrecognized input"),
        }
        Ok(true)
    }
}

impl Default for Driver {
    fn default() -> Self {
        Driver::new()
    }
}

impl super::Driver for Driver {
    fn monitor_events(&self, events_tx: Sender<Command>) -> JoinHandle<Result<(), io::Error>> {
        thread::spawn(move || {
            let span = span!(Level::INFO, "keyboard driver");
            let _enter = span.enter();

            info!("Keyboard driver started.");

            while Self::monitor_io(&events_tx, io::stdin().lock(), io::stdout())? {}
            info!("Keyboard input closed.");
            Ok(())
        })
    }
}

#[cfg(test)]
mod test {
    use std::io::{self, BufReader};

    use crate::controller::Command;
    use crate::samples::SlotId;

    use super::Driver;

    fn get_command(line: &str) -> Result<(bool, Option<Command>), io::Error> {
        let (sender, receiver) = crossbeam_channel::unbounded::<Command>();

        let reader = BufReader::new(line.as_bytes());
        let mut written: Vec<u8> = Vec::new();
        let more = Driver::monitor_io(&sender, reader, &mut written)?;
        assert!(String::from_utf8_lossy(&written).starts_with("Command"));

        // Force the sender to close.
        drop(sender);
        Ok((more, receiver.try_recv().ok()))
    }

    #[test]
    fn test_keyboard_commands() -> Result<(), io::Error> {
        assert_eq!((true, Some(Command::Press(SlotId(3)))), get_command("press 3\n")?);
        assert_eq!((true, Some(Command::Start)), get_command("start\n")?);
        assert_eq!((true, Some(Command::SetBpm(96.0))), get_command("bpm 96")?);
        assert_eq!((true, None), get_command("unrecognized\n")?);
        assert_eq!((true, None), get_command("\n")?);
        assert_eq!((false, None), get_command("")?);
        Ok(())
    }
}
