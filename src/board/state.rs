//! Board state and the flip state machine
//!
//! `BoardState` is the single logical owner of all mutable board data: the
//! grid, the player registry, the wait queue and the registered watchers.
//! Every mutation goes through its methods while the owning `Board`
//! (handle.rs) holds the lock, so no partial mutation is ever visible to
//! another caller. The only suspension point is the wait-queue completion
//! returned through [`FlipStep::Wait`]; everything else runs to completion
//! under the lock.
//!
//! Per-location states: `Empty` (no card), `FaceDown`, `FaceUpUncontrolled`,
//! `FaceUpControlled(actor)`. `Empty` is terminal - a matched pair is deleted
//! from the grid when its owner starts the next turn.

use crate::board::wait_queue::{WaitOutcome, WaitQueue};
use crate::core::player::CONTROL_LIMIT;
use crate::core::{Card, Location, Player, PlayerId, SymbolId};
use crate::{FlipError, Result};
use rustc_hash::{FxHashMap, FxHashSet};
use tokio::sync::oneshot;

/// Everything needed to construct a board
///
/// Produced by the layout loader (or by hand in tests) and consumed by
/// [`crate::board::Board::new`]. The symbol catalog is ordered: a card's
/// [`SymbolId`] indexes it.
#[derive(Debug, Clone)]
pub struct BoardSetup {
    pub rows: u32,
    pub cols: u32,
    pub grid: FxHashMap<Location, Card>,
    pub symbols: Vec<String>,
}

/// Outcome of one pass through the flip state machine.
pub(crate) enum FlipStep {
    /// The flip resolved; the call returns.
    Done,
    /// The caller must park on this completion and re-run from the top
    /// once granted.
    Wait(oneshot::Receiver<WaitOutcome>),
}

pub(crate) struct BoardState {
    rows: u32,
    cols: u32,
    /// Display form per SymbolId, index = id.
    symbols: Vec<String>,
    /// Entries are removed permanently when a matched pair is swept.
    grid: FxHashMap<Location, Card>,
    players: FxHashMap<PlayerId, Player>,
    queue: WaitQueue,
    /// One-shot observers, consumed on the next settle.
    watchers: Vec<(PlayerId, oneshot::Sender<String>)>,
}

impl BoardState {
    pub(crate) fn new(setup: BoardSetup) -> Result<Self> {
        let BoardSetup {
            rows,
            cols,
            grid,
            symbols,
        } = setup;

        if rows == 0 || cols == 0 {
            return Err(FlipError::InvalidLayout(format!(
                "grid dimensions must be positive, got {rows}x{cols}"
            )));
        }
        if let Some(idx) = symbols.iter().position(String::is_empty) {
            return Err(FlipError::InvalidLayout(format!(
                "symbol catalog entry {idx} is empty"
            )));
        }
        for (loc, card) in &grid {
            if !loc.in_bounds(rows, cols) {
                return Err(FlipError::InvalidLayout(format!(
                    "location {loc} outside {rows}x{cols} grid"
                )));
            }
            if card.symbol().as_usize() >= symbols.len() {
                return Err(FlipError::InvalidLayout(format!(
                    "card at {loc} references unknown symbol {}",
                    card.symbol()
                )));
            }
        }

        Ok(BoardState {
            rows,
            cols,
            symbols,
            grid,
            players: FxHashMap::default(),
            queue: WaitQueue::new(),
            watchers: Vec::new(),
        })
    }

    pub(crate) fn rows(&self) -> u32 {
        self.rows
    }

    pub(crate) fn cols(&self) -> u32 {
        self.cols
    }

    pub(crate) fn remaining_cards(&self) -> usize {
        self.grid.len()
    }

    pub(crate) fn is_waiting(&self, actor: &PlayerId, loc: Location) -> bool {
        self.queue.contains(actor, loc)
    }

    /// Look up the player record for an actor, creating it on first contact.
    pub(crate) fn player_mut(&mut self, actor: &PlayerId) -> &mut Player {
        self.players
            .entry(actor.clone())
            .or_insert_with(|| Player::new(actor.clone()))
    }

    fn is_controlled(&self, loc: Location) -> bool {
        self.players.values().any(|p| p.has_control(loc))
    }

    /// One pass of the flip state machine for `actor` targeting `loc`.
    ///
    /// Runs the matched-pair sweep and the deferred cleanup first, then
    /// branches on how many cards the actor holds. The caller must invoke
    /// [`settle`](Self::settle) afterwards whatever the outcome.
    pub(crate) fn flip_step(&mut self, actor: &PlayerId, loc: Location) -> Result<FlipStep> {
        self.sweep_matched_pair(actor);
        self.cleanup_seen(actor);

        let held = self.player_mut(actor).controlled();
        match held.len() {
            0 => self.first_card(actor, loc),
            // The sweep just guaranteed at most one held card.
            _ => self.second_card(actor, held[0], loc),
        }
    }

    /// Delete last turn's matched pair, if the actor is still holding one.
    ///
    /// Two held cards are necessarily a matched pair (a non-match releases
    /// the first card in the same call). The locations leave the grid for
    /// good, and anyone queued on them is denied.
    fn sweep_matched_pair(&mut self, actor: &PlayerId) {
        if self.player_mut(actor).controlled_count() < CONTROL_LIMIT {
            return;
        }
        for loc in self.player_mut(actor).drop_all_control() {
            self.grid.remove(&loc);
            self.queue.deny_all(loc);
        }
    }

    /// Deferred flip-down of the actor's previously-seen cards.
    ///
    /// Cards currently controlled by someone are left alone: whoever grabbed
    /// a card face-up records it in their own seen-set when they let go, so
    /// its flip-down becomes their bookkeeping. The set is cleared either
    /// way.
    fn cleanup_seen(&mut self, actor: &PlayerId) {
        for loc in self.player_mut(actor).seen() {
            if self.is_controlled(loc) {
                continue;
            }
            if let Some(card) = self.grid.get_mut(&loc) {
                card.flip_down();
            }
        }
        self.player_mut(actor).clear_all_seen();
    }

    /// First card of a turn: the actor holds nothing.
    fn first_card(&mut self, actor: &PlayerId, loc: Location) -> Result<FlipStep> {
        if !self.grid.contains_key(&loc) {
            return Err(FlipError::EmptyLocation(loc));
        }
        // A controlled card is always face-up, and with zero held cards the
        // controller is always someone else: park and race on release.
        if self.is_controlled(loc) {
            let rx = self.queue.enqueue(actor.clone(), loc)?;
            return Ok(FlipStep::Wait(rx));
        }
        if let Some(card) = self.grid.get_mut(&loc) {
            card.flip_up();
        }
        self.player_mut(actor).take_control(loc)?;
        Ok(FlipStep::Done)
    }

    /// Second card of a turn: the actor holds `first`.
    ///
    /// This branch never waits. Blocking while holding a card would let two
    /// actors each hold the card the other wants.
    fn second_card(
        &mut self,
        actor: &PlayerId,
        first: Location,
        target: Location,
    ) -> Result<FlipStep> {
        let Some(target_symbol) = self.grid.get(&target).map(Card::symbol) else {
            // The first card stays face-up, merely uncontrolled.
            self.player_mut(actor).give_up_control(first)?;
            return Err(FlipError::EmptyLocation(target));
        };

        if self.is_controlled(target) {
            let player = self.player_mut(actor);
            player.give_up_control(first)?;
            player.mark_seen([first, target]);
            return Err(FlipError::LocationUnderControl(target));
        }

        let first_symbol = self
            .grid
            .get(&first)
            .map(Card::symbol)
            .ok_or(FlipError::EmptyLocation(first))?;

        if let Some(card) = self.grid.get_mut(&target) {
            card.flip_up();
        }

        let player = self.player_mut(actor);
        if target_symbol == first_symbol {
            // Match: hold both until the next-turn sweep deletes them.
            player.take_control(target)?;
        } else {
            // No match: a completed flip, not an error. Both cards stay
            // face-up awaiting this actor's next-turn cleanup.
            player.mark_seen([first, target]);
            player.give_up_control(first)?;
        }
        Ok(FlipStep::Done)
    }

    /// Post-mutation bookkeeping, run after every flip pass.
    ///
    /// Wakes every waiter whose location became contestable, denies waiters
    /// on locations that ceased to exist, then fires and consumes all
    /// registered watchers.
    pub(crate) fn settle(&mut self) {
        for loc in self.queue.waiting_locations() {
            if !self.grid.contains_key(&loc) {
                self.queue.deny_all(loc);
            } else if !self.is_controlled(loc) {
                self.queue.release_all(loc);
            }
        }
        self.notify_watchers();
        #[cfg(debug_assertions)]
        self.assert_invariants();
    }

    pub(crate) fn register_watcher(&mut self, actor: PlayerId) -> oneshot::Receiver<String> {
        let (tx, rx) = oneshot::channel();
        self.watchers.push((actor, tx));
        rx
    }

    fn notify_watchers(&mut self) {
        if self.watchers.is_empty() {
            return;
        }
        let watchers = std::mem::take(&mut self.watchers);
        for (actor, tx) in watchers {
            let rendering = self.render_for(&actor);
            // A watcher that stopped listening is not our problem.
            let _ = tx.send(rendering);
        }
    }

    /// Textual snapshot from one actor's point of view.
    ///
    /// One header line `"<rows> <cols>"`, then one line per cell in
    /// row-major order: `none`, `down`, `my <symbol>` or `up <symbol>`.
    pub(crate) fn render_for(&self, actor: &PlayerId) -> String {
        let mine: FxHashSet<Location> = self
            .players
            .get(actor)
            .map(|p| p.controlled().into_iter().collect())
            .unwrap_or_default();

        let mut out = format!("{} {}\n", self.rows, self.cols);
        for row in 0..self.rows {
            for col in 0..self.cols {
                let loc = Location::new(row, col);
                match self.grid.get(&loc) {
                    None => out.push_str("none"),
                    Some(card) if !card.is_face_up() => out.push_str("down"),
                    Some(card) => {
                        let owner = if mine.contains(&loc) { "my" } else { "up" };
                        let symbol = self.symbol_name(card.symbol());
                        out.push_str(&format!("{owner} {symbol}"));
                    }
                }
                out.push('\n');
            }
        }
        out
    }

    fn symbol_name(&self, id: SymbolId) -> &str {
        self.symbols
            .get(id.as_usize())
            .map(String::as_str)
            .unwrap_or("?")
    }

    /// Consolidated invariant check, asserted in debug builds after every
    /// mutation pass.
    pub(crate) fn check_invariants(&self) -> std::result::Result<(), String> {
        if self.rows == 0 || self.cols == 0 {
            return Err(format!("degenerate dimensions {}x{}", self.rows, self.cols));
        }
        for (loc, card) in &self.grid {
            if !loc.in_bounds(self.rows, self.cols) {
                return Err(format!("grid location {loc} out of bounds"));
            }
            if card.symbol().as_usize() >= self.symbols.len() {
                return Err(format!(
                    "card at {loc} references unknown symbol {}",
                    card.symbol()
                ));
            }
        }

        let mut claimed: FxHashMap<Location, &PlayerId> = FxHashMap::default();
        for player in self.players.values() {
            let held = player.controlled();
            if held.len() > CONTROL_LIMIT {
                return Err(format!("{} controls {} cards", player.id, held.len()));
            }
            for loc in held {
                match self.grid.get(&loc) {
                    Some(card) if card.is_face_up() => {}
                    Some(_) => {
                        return Err(format!("{} controls face-down card at {loc}", player.id))
                    }
                    None => return Err(format!("{} controls empty location {loc}", player.id)),
                }
                if let Some(other) = claimed.insert(loc, &player.id) {
                    return Err(format!(
                        "{loc} controlled by both {other} and {}",
                        player.id
                    ));
                }
            }
        }

        let mut queued = FxHashSet::default();
        for (actor, loc) in self.queue.snapshot() {
            if !queued.insert((actor.clone(), loc)) {
                return Err(format!("duplicate wait entry for {actor} on {loc}"));
            }
        }
        Ok(())
    }

    #[cfg(debug_assertions)]
    fn assert_invariants(&self) {
        if let Err(msg) = self.check_invariants() {
            panic!("board invariant violated: {msg}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pid(name: &str) -> PlayerId {
        PlayerId::new(name).unwrap()
    }

    /// 1x4 board: A A B B, all face-down.
    fn small_setup() -> BoardSetup {
        let mut grid = FxHashMap::default();
        grid.insert(Location::new(0, 0), Card::new(SymbolId::new(0)));
        grid.insert(Location::new(0, 1), Card::new(SymbolId::new(0)));
        grid.insert(Location::new(0, 2), Card::new(SymbolId::new(1)));
        grid.insert(Location::new(0, 3), Card::new(SymbolId::new(1)));
        BoardSetup {
            rows: 1,
            cols: 4,
            grid,
            symbols: vec!["A".to_string(), "B".to_string()],
        }
    }

    #[test]
    fn test_construction_validation() {
        let mut setup = small_setup();
        setup.rows = 0;
        assert!(matches!(
            BoardState::new(setup),
            Err(FlipError::InvalidLayout(_))
        ));

        let mut setup = small_setup();
        setup.grid.insert(Location::new(5, 5), Card::new(SymbolId::new(0)));
        assert!(matches!(
            BoardState::new(setup),
            Err(FlipError::InvalidLayout(_))
        ));

        let mut setup = small_setup();
        setup.grid.insert(Location::new(0, 0), Card::new(SymbolId::new(9)));
        assert!(matches!(
            BoardState::new(setup),
            Err(FlipError::InvalidLayout(_))
        ));

        let mut setup = small_setup();
        setup.symbols[1] = String::new();
        assert!(matches!(
            BoardState::new(setup),
            Err(FlipError::InvalidLayout(_))
        ));

        assert!(BoardState::new(small_setup()).is_ok());
    }

    #[test]
    fn test_first_card_takes_control() {
        let mut state = BoardState::new(small_setup()).unwrap();
        let p1 = pid("p1");
        let loc = Location::new(0, 0);

        assert!(matches!(
            state.flip_step(&p1, loc),
            Ok(FlipStep::Done)
        ));
        state.settle();
        assert!(state.player_mut(&p1).has_control(loc));
        assert!(state.grid.get(&loc).unwrap().is_face_up());
    }

    #[test]
    fn test_first_card_empty_location() {
        let mut state = BoardState::new(small_setup()).unwrap();
        state.grid.remove(&Location::new(0, 0));
        assert!(matches!(
            state.flip_step(&pid("p1"), Location::new(0, 0)),
            Err(FlipError::EmptyLocation(_))
        ));
        state.settle();
    }

    #[test]
    fn test_contested_first_card_parks() {
        let mut state = BoardState::new(small_setup()).unwrap();
        let loc = Location::new(0, 0);

        assert!(matches!(state.flip_step(&pid("p1"), loc), Ok(FlipStep::Done)));
        state.settle();
        assert!(matches!(
            state.flip_step(&pid("p2"), loc),
            Ok(FlipStep::Wait(_))
        ));
        state.settle();
        assert!(state.is_waiting(&pid("p2"), loc));
    }

    #[test]
    fn test_no_match_releases_first_and_defers_flip_down() {
        let mut state = BoardState::new(small_setup()).unwrap();
        let p1 = pid("p1");
        let a = Location::new(0, 0); // A
        let b = Location::new(0, 2); // B

        assert!(matches!(state.flip_step(&p1, a), Ok(FlipStep::Done)));
        state.settle();
        assert!(matches!(state.flip_step(&p1, b), Ok(FlipStep::Done)));
        state.settle();

        // Controls neither; both still face-up; both remembered.
        assert_eq!(state.player_mut(&p1).controlled_count(), 0);
        assert!(state.grid.get(&a).unwrap().is_face_up());
        assert!(state.grid.get(&b).unwrap().is_face_up());
        assert!(state.player_mut(&p1).has_seen(a));
        assert!(state.player_mut(&p1).has_seen(b));

        // Next turn's cleanup flips them back down.
        let c = Location::new(0, 1);
        assert!(matches!(state.flip_step(&p1, c), Ok(FlipStep::Done)));
        state.settle();
        assert!(!state.grid.get(&a).unwrap().is_face_up());
        assert!(!state.grid.get(&b).unwrap().is_face_up());
        assert!(!state.player_mut(&p1).has_seen(a));
    }

    #[test]
    fn test_match_held_then_swept_next_turn() {
        let mut state = BoardState::new(small_setup()).unwrap();
        let p1 = pid("p1");
        let a = Location::new(0, 0);
        let b = Location::new(0, 1);

        assert!(matches!(state.flip_step(&p1, a), Ok(FlipStep::Done)));
        state.settle();
        assert!(matches!(state.flip_step(&p1, b), Ok(FlipStep::Done)));
        state.settle();
        // Matched pair stays visible and controlled.
        assert_eq!(state.player_mut(&p1).controlled_count(), 2);
        assert_eq!(state.remaining_cards(), 4);

        // Next first-card flip sweeps the pair away.
        let c = Location::new(0, 2);
        assert!(matches!(state.flip_step(&p1, c), Ok(FlipStep::Done)));
        state.settle();
        assert_eq!(state.remaining_cards(), 3);
        assert!(!state.grid.contains_key(&a));
        assert!(!state.grid.contains_key(&b));
        let expected: smallvec::SmallVec<[Location; 2]> = smallvec::smallvec![c];
        assert_eq!(state.player_mut(&p1).controlled(), expected);
    }

    #[test]
    fn test_second_card_on_controlled_target_never_waits() {
        let mut state = BoardState::new(small_setup()).unwrap();
        let p1 = pid("p1");
        let p2 = pid("p2");
        let a = Location::new(0, 0);
        let b = Location::new(0, 2);

        assert!(matches!(state.flip_step(&p2, b), Ok(FlipStep::Done)));
        state.settle();
        assert!(matches!(state.flip_step(&p1, a), Ok(FlipStep::Done)));
        state.settle();

        assert!(matches!(
            state.flip_step(&p1, b),
            Err(FlipError::LocationUnderControl(_))
        ));
        state.settle();
        // p1 relinquished its first card; a stays face-up, uncontrolled.
        assert_eq!(state.player_mut(&p1).controlled_count(), 0);
        assert!(state.grid.get(&a).unwrap().is_face_up());
        assert!(state.player_mut(&p1).has_seen(a));
        assert!(state.player_mut(&p1).has_seen(b));
        assert!(state.queue.is_empty());
    }

    #[test]
    fn test_second_card_empty_target_relinquishes() {
        let mut state = BoardState::new(small_setup()).unwrap();
        let p1 = pid("p1");
        let a = Location::new(0, 0);
        let gone = Location::new(0, 3);

        assert!(matches!(state.flip_step(&p1, a), Ok(FlipStep::Done)));
        state.settle();
        state.grid.remove(&gone);

        assert!(matches!(
            state.flip_step(&p1, gone),
            Err(FlipError::EmptyLocation(_))
        ));
        state.settle();
        assert_eq!(state.player_mut(&p1).controlled_count(), 0);
        assert!(state.grid.get(&a).unwrap().is_face_up());
        // Empty-target failure does not record anything as seen.
        assert!(!state.player_mut(&p1).has_seen(a));
    }

    #[test]
    fn test_cleanup_leaves_cards_controlled_by_others_alone() {
        let mut state = BoardState::new(small_setup()).unwrap();
        let p1 = pid("p1");
        let p2 = pid("p2");
        let a = Location::new(0, 0); // A
        let b = Location::new(0, 2); // B

        // p1 walks away from a non-match; a and b stay face-up.
        assert!(matches!(state.flip_step(&p1, a), Ok(FlipStep::Done)));
        state.settle();
        assert!(matches!(state.flip_step(&p1, b), Ok(FlipStep::Done)));
        state.settle();

        // p2 grabs b while it is face-up.
        assert!(matches!(state.flip_step(&p2, b), Ok(FlipStep::Done)));
        state.settle();

        // p1's next turn flips a down but leaves b to p2.
        assert!(matches!(
            state.flip_step(&p1, Location::new(0, 1)),
            Ok(FlipStep::Done)
        ));
        state.settle();
        assert!(!state.grid.get(&a).unwrap().is_face_up());
        assert!(state.grid.get(&b).unwrap().is_face_up());
        assert!(state.player_mut(&p2).has_control(b));
    }

    #[test]
    fn test_render_perspectives() {
        let mut state = BoardState::new(small_setup()).unwrap();
        let p1 = pid("p1");
        assert!(matches!(
            state.flip_step(&p1, Location::new(0, 0)),
            Ok(FlipStep::Done)
        ));
        state.settle();

        assert_eq!(state.render_for(&p1), "1 4\nmy A\ndown\ndown\ndown\n");
        assert_eq!(state.render_for(&pid("p2")), "1 4\nup A\ndown\ndown\ndown\n");
    }

    #[test]
    fn test_invariant_check_catches_corruption() {
        let mut state = BoardState::new(small_setup()).unwrap();
        let p1 = pid("p1");
        let loc = Location::new(0, 0);
        assert!(matches!(state.flip_step(&p1, loc), Ok(FlipStep::Done)));
        assert!(state.check_invariants().is_ok());

        // Force a controlled-but-face-down card.
        if let Some(card) = state.grid.get_mut(&loc) {
            card.flip_down();
        }
        assert!(state.check_invariants().is_err());
    }
}
