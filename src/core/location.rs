//! Grid cell identifiers

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Identifier for one grid cell
///
/// Locations are the key type everywhere: grid storage, control claims,
/// wait-queue entries. They are plain values and never mutated. The
/// canonical textual form is `"<row>x<col>"`, e.g. `0x0`, `2x4`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct Location {
    row: u32,
    col: u32,
}

impl Location {
    pub fn new(row: u32, col: u32) -> Self {
        Location { row, col }
    }

    pub fn row(&self) -> u32 {
        self.row
    }

    pub fn col(&self) -> u32 {
        self.col
    }

    /// Is this location inside a rows x cols grid?
    pub fn in_bounds(&self, rows: u32, cols: u32) -> bool {
        self.row < rows && self.col < cols
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.row, self.col)
    }
}

impl FromStr for Location {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let (row, col) = s
            .split_once('x')
            .ok_or_else(|| format!("invalid location '{s}' (expected <row>x<col>)"))?;
        let row = row
            .parse::<u32>()
            .map_err(|_| format!("invalid row in location '{s}'"))?;
        let col = col
            .parse::<u32>()
            .map_err(|_| format!("invalid column in location '{s}'"))?;
        Ok(Location::new(row, col))
    }
}
