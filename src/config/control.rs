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
use std::{error::Error, time::Duration};

use duration_string::DurationString;
use serde::Deserialize;

const DEFAULT_TICK: Duration = Duration::from_millis(5);

/// A YAML representation of the control loop configuration.
#[derive(Deserialize, Clone, Debug, Default)]
pub struct Control {
    /// How often the control loop polls the clock and drains commands, e.g. "5ms".
    tick: Option<String>,
}

impl Control {
    /// Returns the control loop tick (default: 5ms).
    pub fn tick(&self) -> Result<Duration, Box<dyn Error>> {
        match &self.tick {
            Some(tick) => Ok(DurationString::from_string(tick.clone())?.into()),
            None => Ok(DEFAULT_TICK),
        }
    }
}
