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
use crate::error::EngineError;

/// Rows by steps grid of booleans.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PatternMatrix {
    rows: usize,
    steps: usize,
    cells: Vec<bool>,
}

impl PatternMatrix {
    /// Creates an empty pattern.
    pub fn new(rows: usize, steps: usize) -> PatternMatrix {
        PatternMatrix {
            rows,
            steps,
            cells: vec![false; rows * steps],
        }
    }

    /// Gets the number of rows.
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Gets the number of steps per row.
    pub fn steps(&self) -> usize {
        self.steps
    }

    fn index(&self, row: usize, column: usize) -> Result<usize, EngineError> {
        if row >= self.rows || column >= self.steps {
            return Err(EngineError::InvalidStep {
                row,
                column,
                rows: self.rows,
                steps: self.steps,
            });
        }
        Ok(row * self.steps + column)
    }

    /// Flips a cell and returns its new value.
    pub fn toggle(&mut self, row: usize, column: usize) -> Result<bool, EngineError> {
        let index = self.index(row, column)?;
        self.cells[index] = !self.cells[index];
        Ok(self.cells[index])
    }

    /// Sets a cell.
    pub fn set(&mut self, row: usize, column: usize, active: bool) -> Result<(), EngineError> {
        let index = self.index(row, column)?;
        self.cells[index] = active;
        Ok(())
    }

    /// Returns whether a cell is set.
    pub fn is_active(&self, row: usize, column: usize) -> Result<bool, EngineError> {
        Ok(self.cells[self.index(row, column)?])
    }

    /// Returns the rows set in a column. An out of range column has none.
    pub fn active_rows(&self, column: usize) -> impl Iterator<Item = usize> + '_ {
        let rows = if column < self.steps { self.rows } else { 0 };
        (0..rows).filter(move |row| self.cells[row * self.steps + column])
    }

    /// Returns one row of the pattern.
    pub fn row(&self, row: usize) -> Option<&[bool]> {
        (row < self.rows).then(|| &self.cells[row * self.steps..(row + 1) * self.steps])
    }

    /// Clears every cell.
    pub fn clear(&mut self) {
        self.cells.fill(false);
    }
}
