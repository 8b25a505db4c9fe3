//! Error types for flipgrid
//!
//! Everything except `InvalidLayout` and the plumbing variants is an
//! expected, recoverable outcome of contention between players; a failed
//! call never leaves the board inconsistent.

use crate::core::Location;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FlipError {
    #[error("invalid actor identifier: {0:?}")]
    InvalidIdentifier(String),

    #[error("no card at {0}")]
    EmptyLocation(Location),

    #[error("card at {0} is under another player's control")]
    LocationUnderControl(Location),

    #[error("card at {0} is no longer available")]
    LocationUnavailable(Location),

    #[error("already controlling {0}")]
    AlreadyControlled(Location),

    #[error("cannot control {0}: already controlling two cards")]
    ControlLimitExceeded(Location),

    #[error("not controlling {0}")]
    NotControlling(Location),

    #[error("already waiting on {0}")]
    AlreadyWaiting(Location),

    #[error("{0} was not previously seen")]
    NotSeen(Location),

    #[error("invalid board layout: {0}")]
    InvalidLayout(String),

    #[error("completion channel closed before resolution")]
    Disconnected,

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("task join error: {0}")]
    JoinError(#[from] tokio::task::JoinError),
}

pub type Result<T> = std::result::Result<T, FlipError>;
