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

//! Step sequencing.
//!
//! A [`PatternMatrix`] holds which instrument rows play on which steps, and a
//! [`PatternClock`] decides when steps fire. The clock never reads the wall
//! clock itself: callers supply the current time on every poll, which keeps it
//! deterministic under test.

mod clock;
mod pattern;

pub use clock::{PatternClock, MAX_STEP_INTERVAL, MIN_STEP_INTERVAL};
pub use pattern::PatternMatrix;
