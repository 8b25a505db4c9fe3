//! Arbitration queue for contested locations
//!
//! Players that find a card under someone else's control park here. Each
//! entry owns the sender half of a oneshot completion; the blocked caller
//! awaits the receiver half outside the board lock. Releasing a location
//! wakes every waiter at once - waking is not granting, the woken callers
//! race to re-acquire through the normal flip path.

use crate::core::{Location, PlayerId};
use crate::{FlipError, Result};
use rustc_hash::FxHashMap;
use tokio::sync::oneshot;

/// How a wait ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    /// The location became contestable; re-attempt the flip.
    Granted,
    /// The location stopped being contestable (e.g. matched away).
    Denied,
}

#[derive(Debug)]
struct Waiter {
    actor: PlayerId,
    tx: oneshot::Sender<WaitOutcome>,
}

/// Pending completions keyed by location
///
/// Invariant: no two entries share the same (actor, location) pair.
#[derive(Debug, Default)]
pub struct WaitQueue {
    entries: FxHashMap<Location, Vec<Waiter>>,
}

impl WaitQueue {
    pub fn new() -> Self {
        WaitQueue {
            entries: FxHashMap::default(),
        }
    }

    /// Park an actor on a location.
    ///
    /// Returns the awaitable half of the completion. Fails with
    /// `AlreadyWaiting` if the actor is already parked on this location.
    pub fn enqueue(&mut self, actor: PlayerId, loc: Location) -> Result<oneshot::Receiver<WaitOutcome>> {
        if self.contains(&actor, loc) {
            return Err(FlipError::AlreadyWaiting(loc));
        }
        let (tx, rx) = oneshot::channel();
        self.entries.entry(loc).or_default().push(Waiter { actor, tx });
        Ok(rx)
    }

    /// Wake every waiter for a location with `Granted`.
    ///
    /// Returns the number of waiters woken. Fulfillment order among them is
    /// unspecified; callers must not assume a winner.
    pub fn release_all(&mut self, loc: Location) -> usize {
        self.resolve_all(loc, WaitOutcome::Granted)
    }

    /// Remove and deny the single entry for (actor, loc). No-op if absent.
    pub fn deny_one(&mut self, actor: &PlayerId, loc: Location) -> bool {
        let Some(waiters) = self.entries.get_mut(&loc) else {
            return false;
        };
        let Some(pos) = waiters.iter().position(|w| w.actor == *actor) else {
            return false;
        };
        let waiter = waiters.remove(pos);
        if waiters.is_empty() {
            self.entries.remove(&loc);
        }
        // The receiver may already be gone; that's the caller's loss.
        let _ = waiter.tx.send(WaitOutcome::Denied);
        true
    }

    /// Remove and deny every waiter for a location (it ceased to exist).
    pub fn deny_all(&mut self, loc: Location) -> usize {
        self.resolve_all(loc, WaitOutcome::Denied)
    }

    fn resolve_all(&mut self, loc: Location, outcome: WaitOutcome) -> usize {
        let Some(waiters) = self.entries.remove(&loc) else {
            return 0;
        };
        let count = waiters.len();
        for waiter in waiters {
            let _ = waiter.tx.send(outcome);
        }
        count
    }

    pub fn contains(&self, actor: &PlayerId, loc: Location) -> bool {
        self.entries
            .get(&loc)
            .is_some_and(|ws| ws.iter().any(|w| w.actor == *actor))
    }

    /// Locations that currently have at least one waiter.
    pub fn waiting_locations(&self) -> Vec<Location> {
        self.entries.keys().copied().collect()
    }

    /// Defensive copy of every (actor, location) pair in the queue.
    pub fn snapshot(&self) -> Vec<(PlayerId, Location)> {
        self.entries
            .iter()
            .flat_map(|(loc, ws)| ws.iter().map(|w| (w.actor.clone(), *loc)))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
