//! flipgrid - concurrency core for a shared card-matching board
//!
//! An in-memory grid of two-sided cards that many independent players flip
//! concurrently. The crate provides the per-card control state machine, the
//! arbitration queue that lets blocked players race for a just-released card,
//! the deferred flip-down bookkeeping, and the change-notification mechanism
//! used by passive observers.

pub mod core;
pub mod board;
pub mod loader;
pub mod sim;
pub mod error;

pub use error::{FlipError, Result};
