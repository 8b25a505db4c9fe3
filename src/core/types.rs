//! Strongly-typed wrappers for board concepts
//!
//! Newtypes to prevent type confusion: a symbol index is not a bare integer
//! and an actor token is not a bare String.

use crate::{FlipError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Index into the board's symbol catalog
///
/// Assigned to a card at creation and never changed afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SymbolId(u32);

impl SymbolId {
    pub fn new(id: u32) -> Self {
        SymbolId(id)
    }

    pub fn as_u32(&self) -> u32 {
        self.0
    }

    pub fn as_usize(&self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for SymbolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Validated actor identifier
///
/// Actor tokens must be non-empty and match `[A-Za-z0-9_]+`. Anything an
/// external caller hands us goes through [`PlayerId::new`] before it touches
/// board state.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlayerId(String);

impl PlayerId {
    pub fn new(s: impl Into<String>) -> Result<Self> {
        let s = s.into();
        if s.is_empty() || !s.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(FlipError::InvalidIdentifier(s));
        }
        Ok(PlayerId(s))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
