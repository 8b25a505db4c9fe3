//! Card cells

use crate::core::SymbolId;
use serde::{Deserialize, Serialize};

/// A single two-state cell of the board
///
/// A card carries an immutable symbol identity and a face-up flag. Cards are
/// created face-down when the board is built and are removed from the grid
/// permanently once matched; removal is the grid's concern, not the card's.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Card {
    symbol: SymbolId,
    face_up: bool,
}

impl Card {
    pub fn new(symbol: SymbolId) -> Self {
        Card {
            symbol,
            face_up: false,
        }
    }

    pub fn symbol(&self) -> SymbolId {
        self.symbol
    }

    pub fn is_face_up(&self) -> bool {
        self.face_up
    }

    /// Turn the card face-up. Idempotent.
    pub fn flip_up(&mut self) {
        self.face_up = true;
    }

    /// Turn the card face-down. Idempotent.
    pub fn flip_down(&mut self) {
        self.face_up = false;
    }
}
