//! Board layout loader and generator
//!
//! Layout file format: a header line `<rows> <cols>`, then one line per row
//! with `cols` whitespace-separated tokens. A `.` token is an empty cell;
//! any other token is a symbol's display form. The symbol catalog is the
//! distinct symbols in order of first appearance; all cards start face-down.
//!
//! ```text
//! 2 3
//! A B A
//! B . C
//! ```

use crate::board::BoardSetup;
use crate::core::{Card, Location, SymbolId};
use crate::{FlipError, Result};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha12Rng;
use rustc_hash::FxHashMap;
use std::path::Path;

/// Loader for board layout files
pub struct LayoutLoader;

impl LayoutLoader {
    /// Load a layout from a file
    pub fn load_from_file(path: &Path) -> Result<BoardSetup> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parse a layout from its text content
    pub fn parse(content: &str) -> Result<BoardSetup> {
        let mut lines = content
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty() && !l.starts_with('#'));

        let header = lines
            .next()
            .ok_or_else(|| FlipError::InvalidLayout("empty layout".to_string()))?;
        let (rows, cols) = Self::parse_header(header)?;

        let mut grid = FxHashMap::default();
        let mut symbols: Vec<String> = Vec::new();

        for row in 0..rows {
            let line = lines.next().ok_or_else(|| {
                FlipError::InvalidLayout(format!("expected {rows} rows, found {row}"))
            })?;
            let tokens: Vec<&str> = line.split_whitespace().collect();
            if tokens.len() != cols as usize {
                return Err(FlipError::InvalidLayout(format!(
                    "row {row} has {} cells, expected {cols}",
                    tokens.len()
                )));
            }
            for (col, token) in tokens.iter().enumerate() {
                if *token == "." {
                    continue;
                }
                let id = match symbols.iter().position(|s| s == token) {
                    Some(idx) => SymbolId::new(idx as u32),
                    None => {
                        symbols.push(token.to_string());
                        SymbolId::new((symbols.len() - 1) as u32)
                    }
                };
                grid.insert(Location::new(row, col as u32), Card::new(id));
            }
        }

        if let Some(extra) = lines.next() {
            return Err(FlipError::InvalidLayout(format!(
                "trailing content after row {rows}: {extra:?}"
            )));
        }

        Ok(BoardSetup {
            rows,
            cols,
            grid,
            symbols,
        })
    }

    fn parse_header(header: &str) -> Result<(u32, u32)> {
        let mut parts = header.split_whitespace();
        let rows = parts
            .next()
            .and_then(|s| s.parse::<u32>().ok())
            .ok_or_else(|| {
                FlipError::InvalidLayout(format!("bad header {header:?} (expected <rows> <cols>)"))
            })?;
        let cols = parts
            .next()
            .and_then(|s| s.parse::<u32>().ok())
            .ok_or_else(|| {
                FlipError::InvalidLayout(format!("bad header {header:?} (expected <rows> <cols>)"))
            })?;
        if parts.next().is_some() {
            return Err(FlipError::InvalidLayout(format!(
                "bad header {header:?} (expected exactly two fields)"
            )));
        }
        if rows == 0 || cols == 0 {
            return Err(FlipError::InvalidLayout(format!(
                "grid dimensions must be positive, got {rows}x{cols}"
            )));
        }
        Ok((rows, cols))
    }
}

/// Generate a full board of shuffled symbol pairs.
///
/// `rows * cols` must be even so every card has a partner. Symbols are dealt
/// out in pairs round-robin from the catalog, then shuffled with a seeded
/// ChaCha12 for reproducible boards.
pub fn generate(rows: u32, cols: u32, symbols: &[&str], seed: u64) -> Result<BoardSetup> {
    if rows == 0 || cols == 0 {
        return Err(FlipError::InvalidLayout(format!(
            "grid dimensions must be positive, got {rows}x{cols}"
        )));
    }
    if symbols.is_empty() {
        return Err(FlipError::InvalidLayout(
            "symbol catalog is empty".to_string(),
        ));
    }
    let cells = (rows as usize) * (cols as usize);
    if cells % 2 != 0 {
        return Err(FlipError::InvalidLayout(format!(
            "{rows}x{cols} board has an odd number of cells"
        )));
    }

    let mut deck: Vec<SymbolId> = (0..cells / 2)
        .flat_map(|i| {
            let id = SymbolId::new((i % symbols.len()) as u32);
            [id, id]
        })
        .collect();
    let mut rng = ChaCha12Rng::seed_from_u64(seed);
    deck.shuffle(&mut rng);

    let mut grid = FxHashMap::default();
    for (idx, symbol) in deck.into_iter().enumerate() {
        let loc = Location::new((idx as u32) / cols, (idx as u32) % cols);
        grid.insert(loc, Card::new(symbol));
    }

    Ok(BoardSetup {
        rows,
        cols,
        grid,
        symbols: symbols.iter().map(|s| s.to_string()).collect(),
    })
}
