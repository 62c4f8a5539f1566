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
use std::time::Duration;

use tracing::{debug, info};

/// Shortest step the clock will run. Faster tempos are held at this interval.
pub const MIN_STEP_INTERVAL: Duration = Duration::from_millis(1);

/// Longest step the clock will run.
pub const MAX_STEP_INTERVAL: Duration = Duration::from_secs(3600);

/// Fires pattern steps on a drift-free schedule.
///
/// Each deadline is the previous deadline plus one interval, never "now plus
/// one interval", so late polls do not push the schedule back. A poll that
/// arrives several intervals late fires every missed step in order.
#[derive(Clone, Debug)]
pub struct PatternClock {
    step_count: usize,
    steps_per_beat: u32,
    bpm: f64,
    min_bpm: f64,
    max_bpm: f64,
    interval: Duration,
    step: usize,
    next_deadline: Duration,
    running: bool,
}

impl PatternClock {
    /// Creates a stopped clock. The tempo is clamped into `min_bpm..=max_bpm`.
    pub fn new(
        step_count: usize,
        steps_per_beat: u32,
        bpm: f64,
        min_bpm: f64,
        max_bpm: f64,
    ) -> PatternClock {
        let steps_per_beat = steps_per_beat.max(1);
        let bpm = bpm.clamp(min_bpm, max_bpm);
        PatternClock {
            step_count: step_count.max(1),
            steps_per_beat,
            bpm,
            min_bpm,
            max_bpm,
            interval: step_interval(bpm, steps_per_beat),
            step: 0,
            next_deadline: Duration::ZERO,
            running: false,
        }
    }

    /// Starts from step zero. The first step fires one interval after `now`.
    pub fn start(&mut self, now: Duration) {
        self.step = 0;
        self.next_deadline = now + self.interval;
        self.running = true;
        info!(bpm = self.bpm, interval = ?self.interval, "Clock started");
    }

    /// Stops the clock. Nothing fires until it is started again.
    pub fn stop(&mut self) {
        if self.running {
            info!(step = self.step, "Clock stopped");
        }
        self.running = false;
    }

    /// Returns true while the clock is running.
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Returns the columns that fire at or before `now`, in order.
    pub fn poll(&mut self, now: Duration) -> Vec<usize> {
        let mut fired = Vec::new();
        if !self.running {
            return fired;
        }

        while now >= self.next_deadline {
            fired.push(self.step);
            self.step = (self.step + 1) % self.step_count;
            self.next_deadline += self.interval;
        }

        if fired.len() > 1 {
            debug!(missed = fired.len() - 1, "Clock caught up on late steps");
        }
        fired
    }

    /// Returns the column that fires next.
    pub fn current_step(&self) -> usize {
        self.step
    }

    /// Returns the number of steps before the pattern wraps.
    pub fn step_count(&self) -> usize {
        self.step_count
    }

    /// Returns the tempo.
    pub fn bpm(&self) -> f64 {
        self.bpm
    }

    /// Returns the time between steps.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Returns the time left until the next step, or None while stopped.
    pub fn time_until_next(&self, now: Duration) -> Option<Duration> {
        self.running.then(|| self.next_deadline.saturating_sub(now))
    }

    /// Sets the tempo, clamped into range, and returns the tempo in effect.
    ///
    /// The pending deadline is kept. Only later steps use the new interval.
    pub fn set_bpm(&mut self, bpm: f64) -> f64 {
        if bpm.is_nan() {
            return self.bpm;
        }
        let bpm = bpm.clamp(self.min_bpm, self.max_bpm);
        if bpm != self.bpm {
            self.bpm = bpm;
            self.interval = step_interval(bpm, self.steps_per_beat);
            info!(bpm, interval = ?self.interval, "Tempo changed");
        }
        self.bpm
    }

    /// Nudges the tempo by `delta`, clamped into range.
    pub fn adjust_bpm(&mut self, delta: f64) -> f64 {
        self.set_bpm(self.bpm + delta)
    }
}

/// Returns the time between steps, bounded so that `poll` always advances.
fn step_interval(bpm: f64, steps_per_beat: u32) -> Duration {
    let secs = 60.0 / (bpm * steps_per_beat.max(1) as f64);
    Duration::try_from_secs_f64(secs)
        .unwrap_or(MAX_STEP_INTERVAL)
        .clamp(MIN_STEP_INTERVAL, MAX_STEP_INTERVAL)
}
