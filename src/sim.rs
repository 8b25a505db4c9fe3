//! Simulation driver: concurrent bot players over one board
//!
//! Spawns one task per simulated player plus a passive observer that
//! re-registers `watch` in a loop. Players pick random locations and flip
//! until the board is cleared or their flip budget runs out. Per-call
//! timeouts live here, not in the board core.

use crate::board::Board;
use crate::core::Location;
use crate::{FlipError, Result};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha12Rng;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::timeout;

/// Verbosity level for simulation output
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
pub enum Verbosity {
    /// Silent - no output during the run
    Silent = 0,
    /// Minimal - only the final summary
    Minimal = 1,
    /// Normal - matches and player completions (default)
    #[default]
    Normal = 2,
    /// Verbose - every flip outcome and observer update
    Verbose = 3,
}

/// Simulation parameters
#[derive(Debug, Clone)]
pub struct SimConfig {
    /// Number of simulated players (ids `p1`, `p2`, ...)
    pub players: usize,
    /// Seed for the per-player RNGs
    pub seed: u64,
    /// Flip budget per player
    pub max_flips: usize,
    /// Per-call timeout; a blocked flip abandoned at this point counts as a
    /// timeout in the stats
    pub timeout: Duration,
    pub verbosity: Verbosity,
}

impl Default for SimConfig {
    fn default() -> Self {
        SimConfig {
            players: 2,
            seed: 0,
            max_flips: 500,
            timeout: Duration::from_millis(500),
            verbosity: Verbosity::default(),
        }
    }
}

/// Per-player tallies
#[derive(Debug, Clone, Default, Serialize)]
pub struct PlayerStats {
    pub id: String,
    /// Flip calls issued
    pub flips: usize,
    /// Completed turns that matched a pair
    pub matches: usize,
    /// Completed turns that did not match
    pub misses: usize,
    /// First flips that targeted an empty location
    pub empty: usize,
    /// Second flips denied because the target was controlled
    pub contested: usize,
    /// Waits that ended with the card vanishing
    pub lost_waits: usize,
    /// Flips rejected because a stale wait entry was still queued
    pub already_waiting: usize,
    /// Flips abandoned at the driver timeout
    pub timeouts: usize,
}

/// Result of a finished simulation
#[derive(Debug, Clone, Serialize)]
pub struct SimReport {
    pub players: Vec<PlayerStats>,
    pub remaining_cards: usize,
    pub board_cleared: bool,
    pub observer_updates: usize,
}

impl SimReport {
    pub fn total_matches(&self) -> usize {
        self.players.iter().map(|p| p.matches).sum()
    }
}

/// Run a full simulation against `board`.
pub async fn run(board: &Board, config: SimConfig) -> Result<SimReport> {
    let verbosity = config.verbosity;

    let observer = tokio::spawn(run_observer(
        board.clone_handle(),
        config.timeout,
        verbosity,
    ));

    let mut tasks = Vec::new();
    for n in 1..=config.players {
        let id = format!("p{n}");
        let rng = ChaCha12Rng::seed_from_u64(config.seed.wrapping_add(n as u64));
        tasks.push(tokio::spawn(run_player(
            board.clone_handle(),
            id,
            rng,
            config.clone(),
        )));
    }

    let mut players = Vec::new();
    for task in tasks {
        players.push(task.await?);
    }
    let observer_updates = observer.await?;

    let remaining_cards = board.remaining_cards().await;
    let report = SimReport {
        players,
        remaining_cards,
        board_cleared: remaining_cards == 0,
        observer_updates,
    };
    if verbosity >= Verbosity::Minimal {
        println!(
            "simulation finished: {} matches, {} cards left, {} observer updates",
            report.total_matches(),
            report.remaining_cards,
            report.observer_updates
        );
    }
    Ok(report)
}

async fn run_player(
    board: Board,
    id: String,
    mut rng: ChaCha12Rng,
    config: SimConfig,
) -> PlayerStats {
    let (rows, cols) = board.dimensions().await;
    let mut stats = PlayerStats {
        id: id.clone(),
        ..PlayerStats::default()
    };
    // Location of a held matched pair, if the last turn ended in one.
    let mut holding: Option<Location> = None;

    while stats.flips < config.max_flips && board.remaining_cards().await > 0 {
        // First card of a turn; this is the only call that may block.
        // It also sweeps away any pair matched last turn.
        holding = None;
        let first = random_location(&mut rng, rows, cols);
        stats.flips += 1;
        match timeout(config.timeout, board.flip(&id, first)).await {
            Err(_) => {
                stats.timeouts += 1;
                continue;
            }
            Ok(Err(e)) => {
                tally_error(&mut stats, &e);
                log_flip(config.verbosity, &id, first, &format!("failed: {e}"));
                continue;
            }
            Ok(Ok(())) => log_flip(config.verbosity, &id, first, "up"),
        }

        let mut second = random_location(&mut rng, rows, cols);
        while second == first {
            second = random_location(&mut rng, rows, cols);
        }
        stats.flips += 1;
        match timeout(config.timeout, board.flip(&id, second)).await {
            Err(_) => stats.timeouts += 1,
            Ok(Err(e)) => {
                tally_error(&mut stats, &e);
                log_flip(config.verbosity, &id, second, &format!("failed: {e}"));
            }
            Ok(Ok(())) => {
                // Still holding both cards means they matched.
                let matched = match board.look(&id).await {
                    Ok(view) => view.lines().filter(|l| l.starts_with("my ")).count() == 2,
                    Err(_) => false,
                };
                if matched {
                    stats.matches += 1;
                    holding = Some(first);
                    if config.verbosity >= Verbosity::Normal {
                        println!("[{id}] matched {first} and {second}");
                    }
                } else {
                    stats.misses += 1;
                    log_flip(config.verbosity, &id, second, "no match");
                }
            }
        }
    }

    // Flipping a held matched location sweeps the pair off the grid and then
    // fails with EmptyLocation, taking no new control. Without this a pair
    // matched on the final turn would sit on the board forever.
    if let Some(loc) = holding {
        let _ = timeout(config.timeout, board.flip(&id, loc)).await;
    }

    if config.verbosity >= Verbosity::Normal {
        println!(
            "[{id}] done: {} matches, {} misses in {} flips",
            stats.matches, stats.misses, stats.flips
        );
    }
    stats
}

/// Re-register `watch` until the board goes quiet for a full timeout window.
async fn run_observer(board: Board, window: Duration, verbosity: Verbosity) -> usize {
    let mut updates = 0;
    loop {
        match timeout(window, board.watch("observer")).await {
            Ok(Ok(view)) => {
                updates += 1;
                if verbosity >= Verbosity::Verbose {
                    println!("[observer] update {updates}:\n{view}");
                }
            }
            Ok(Err(_)) | Err(_) => return updates,
        }
    }
}

fn random_location(rng: &mut ChaCha12Rng, rows: u32, cols: u32) -> Location {
    Location::new(rng.gen_range(0..rows), rng.gen_range(0..cols))
}

fn tally_error(stats: &mut PlayerStats, err: &FlipError) {
    match err {
        FlipError::EmptyLocation(_) => stats.empty += 1,
        FlipError::LocationUnderControl(_) => stats.contested += 1,
        FlipError::LocationUnavailable(_) => stats.lost_waits += 1,
        FlipError::AlreadyWaiting(_) => stats.already_waiting += 1,
        _ => {}
    }
}

fn log_flip(verbosity: Verbosity, id: &str, loc: Location, outcome: &str) {
    if verbosity >= Verbosity::Verbose {
        println!("[{id}] flip {loc}: {outcome}");
    }
}
