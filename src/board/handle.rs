//! Shared async board handle
//!
//! `Board` wraps the single-owner [`BoardState`] in an `Arc<Mutex<_>>` so
//! many tasks can issue `flip`/`look`/`watch` concurrently while every state
//! mutation stays serialized. Blocked flips await their wait-queue completion
//! outside the lock, so a parked player never stalls the board.

use crate::board::state::{BoardState, FlipStep};
use crate::board::wait_queue::WaitOutcome;
use crate::board::BoardSetup;
use crate::core::{Location, PlayerId};
use crate::{FlipError, Result};
use std::sync::Arc;
use tokio::sync::Mutex;

pub struct Board {
    state: Arc<Mutex<BoardState>>,
}

impl Board {
    /// Build a board from a fully-assembled setup.
    ///
    /// Fails with `InvalidLayout` on degenerate dimensions, out-of-bounds
    /// locations, dangling symbol ids or empty catalog entries.
    pub fn new(setup: BoardSetup) -> Result<Self> {
        Ok(Board {
            state: Arc::new(Mutex::new(BoardState::new(setup)?)),
        })
    }

    /// Get a clone of the board handle (shares the underlying state).
    pub fn clone_handle(&self) -> Self {
        Board {
            state: Arc::clone(&self.state),
        }
    }

    /// Flip the card at `loc` on behalf of `actor`.
    ///
    /// This is the central operation: it runs the actor's deferred cleanup,
    /// evaluates the per-location state machine, and either resolves
    /// immediately or parks the caller until the contested card is released.
    /// A woken caller re-runs the whole evaluation against fresh state - being
    /// woken is not a grant, and racing losers park again or fail depending
    /// on what they find.
    pub async fn flip(&self, actor: &str, loc: Location) -> Result<()> {
        let actor = PlayerId::new(actor)?;
        loop {
            let rx = {
                let mut state = self.state.lock().await;
                let step = state.flip_step(&actor, loc);
                // Queue sweep + watcher fan-out happen on success and
                // failure alike.
                state.settle();
                match step {
                    Ok(FlipStep::Done) => return Ok(()),
                    Ok(FlipStep::Wait(rx)) => rx,
                    Err(e) => return Err(e),
                }
            };
            match rx.await {
                Ok(WaitOutcome::Granted) => continue,
                Ok(WaitOutcome::Denied) => return Err(FlipError::LocationUnavailable(loc)),
                Err(_) => return Err(FlipError::Disconnected),
            }
        }
    }

    /// Render the board from `actor`'s point of view.
    ///
    /// Registers the actor if unknown; otherwise a pure read. Never suspends
    /// and never fires watchers.
    pub async fn look(&self, actor: &str) -> Result<String> {
        let actor = PlayerId::new(actor)?;
        let mut state = self.state.lock().await;
        state.player_mut(&actor);
        Ok(state.render_for(&actor))
    }

    /// Await the next board change, then render for `actor`.
    ///
    /// One-shot: the watcher is consumed when it fires; call again to keep
    /// watching. All watchers registered before a change are notified by it.
    pub async fn watch(&self, actor: &str) -> Result<String> {
        let actor = PlayerId::new(actor)?;
        let rx = {
            let mut state = self.state.lock().await;
            state.player_mut(&actor);
            state.register_watcher(actor)
        };
        rx.await.map_err(|_| FlipError::Disconnected)
    }

    /// Number of cards still on the grid.
    pub async fn remaining_cards(&self) -> usize {
        self.state.lock().await.remaining_cards()
    }

    pub async fn dimensions(&self) -> (u32, u32) {
        let state = self.state.lock().await;
        (state.rows(), state.cols())
    }

    /// Is `actor` currently parked on `loc`?
    pub async fn is_waiting(&self, actor: &str, loc: Location) -> Result<bool> {
        let actor = PlayerId::new(actor)?;
        Ok(self.state.lock().await.is_waiting(&actor, loc))
    }
}
