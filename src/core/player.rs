//! Per-actor state

use crate::core::{Location, PlayerId};
use crate::{FlipError, Result};
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// One player's bookkeeping
///
/// A player controls at most two locations at a time (the current turn's
/// cards) and remembers the locations it has touched but no longer controls
/// (`previously_seen`), which drive the deferred flip-down at the start of
/// its next turn. Players are created lazily the first time an unknown actor
/// token reaches the board and persist for the life of the board.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,

    /// Controlled locations in acquisition order, at most two.
    controlled: SmallVec<[Location; 2]>,

    /// Face-up locations this player walked away from, pending flip-down.
    previously_seen: FxHashSet<Location>,
}

/// Hard cap on simultaneously controlled cards.
pub const CONTROL_LIMIT: usize = 2;

impl Player {
    pub fn new(id: PlayerId) -> Self {
        Player {
            id,
            controlled: SmallVec::new(),
            previously_seen: FxHashSet::default(),
        }
    }

    /// Claim a location.
    pub fn take_control(&mut self, loc: Location) -> Result<()> {
        if self.controlled.contains(&loc) {
            return Err(FlipError::AlreadyControlled(loc));
        }
        if self.controlled.len() >= CONTROL_LIMIT {
            return Err(FlipError::ControlLimitExceeded(loc));
        }
        self.controlled.push(loc);
        Ok(())
    }

    /// Drop a claim.
    pub fn give_up_control(&mut self, loc: Location) -> Result<()> {
        let pos = self
            .controlled
            .iter()
            .position(|l| *l == loc)
            .ok_or(FlipError::NotControlling(loc))?;
        self.controlled.remove(pos);
        Ok(())
    }

    /// Drop every claim at once, returning the released locations in
    /// acquisition order.
    pub fn drop_all_control(&mut self) -> SmallVec<[Location; 2]> {
        std::mem::take(&mut self.controlled)
    }

    pub fn has_control(&self, loc: Location) -> bool {
        self.controlled.contains(&loc)
    }

    /// Snapshot of controlled locations, in acquisition order.
    pub fn controlled(&self) -> SmallVec<[Location; 2]> {
        self.controlled.clone()
    }

    pub fn controlled_count(&self) -> usize {
        self.controlled.len()
    }

    /// Remember locations for the next cleanup pass. Duplicates are ignored.
    pub fn mark_seen(&mut self, locs: impl IntoIterator<Item = Location>) {
        self.previously_seen.extend(locs);
    }

    pub fn clear_seen(&mut self, loc: Location) -> Result<()> {
        if !self.previously_seen.remove(&loc) {
            return Err(FlipError::NotSeen(loc));
        }
        Ok(())
    }

    pub fn clear_all_seen(&mut self) {
        self.previously_seen.clear();
    }

    pub fn has_seen(&self, loc: Location) -> bool {
        self.previously_seen.contains(&loc)
    }

    /// Snapshot of the previously-seen set.
    pub fn seen(&self) -> Vec<Location> {
        self.previously_seen.iter().copied().collect()
    }
}
