//! The board: grid ownership, the flip state machine, arbitration and
//! change notification

pub mod handle;
pub mod state;
pub mod wait_queue;

pub use handle::Board;
pub use state::BoardSetup;
pub use wait_queue::{WaitOutcome, WaitQueue};
