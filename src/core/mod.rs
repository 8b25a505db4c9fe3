//! Core value types: locations, symbols, cards, players

pub mod types;
pub mod location;
pub mod card;
pub mod player;

pub use types::{PlayerId, SymbolId};
pub use location::Location;
pub use card::Card;
pub use player::Player;
