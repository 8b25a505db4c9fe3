//! flipgrid - Main Binary
//!
//! Drives a shared card-matching board with simulated concurrent players.

use clap::{Parser, Subcommand};
use flipgrid::{
    board::Board,
    loader::{generate, LayoutLoader},
    sim::{self, SimConfig, Verbosity},
    Result,
};
use std::path::PathBuf;
use std::time::Duration;

/// Verbosity level for output (custom parser supporting both names and numbers)
#[derive(Debug, Clone, Copy)]
struct VerbosityArg(Verbosity);

impl std::str::FromStr for VerbosityArg {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "silent" | "0" => Ok(VerbosityArg(Verbosity::Silent)),
            "minimal" | "1" => Ok(VerbosityArg(Verbosity::Minimal)),
            "normal" | "2" => Ok(VerbosityArg(Verbosity::Normal)),
            "verbose" | "3" => Ok(VerbosityArg(Verbosity::Verbose)),
            _ => Err(format!(
                "invalid verbosity level '{s}' (expected: silent/0, minimal/1, normal/2, verbose/3)"
            )),
        }
    }
}

impl From<VerbosityArg> for Verbosity {
    fn from(arg: VerbosityArg) -> Self {
        arg.0
    }
}

#[derive(Parser)]
#[command(name = "flipgrid")]
#[command(about = "flipgrid - concurrent card-matching board", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a simulation with concurrent bot players
    Play {
        /// Board layout file (default: generate a random paired board)
        #[arg(long, value_name = "LAYOUT_FILE")]
        board: Option<PathBuf>,

        /// Rows for a generated board
        #[arg(long, default_value_t = 4)]
        rows: u32,

        /// Columns for a generated board
        #[arg(long, default_value_t = 4)]
        cols: u32,

        /// Comma-separated symbol catalog for a generated board
        #[arg(long, default_value = "A,B,C,D,E,F,G,H")]
        symbols: String,

        /// Number of simulated players
        #[arg(long, default_value_t = 2)]
        players: usize,

        /// Set random seed for deterministic runs
        #[arg(long, default_value_t = 0)]
        seed: u64,

        /// Flip budget per player
        #[arg(long, default_value_t = 500)]
        max_flips: usize,

        /// Per-call timeout in milliseconds
        #[arg(long, default_value_t = 500)]
        timeout_ms: u64,

        /// Verbosity level (0=silent, 1=minimal, 2=normal, 3=verbose)
        #[arg(long, default_value = "normal", short = 'v')]
        verbosity: VerbosityArg,

        /// Print the final report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Load a layout file and print a fresh observer's view
    Show {
        /// Board layout file
        #[arg(value_name = "LAYOUT_FILE")]
        board: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Play {
            board,
            rows,
            cols,
            symbols,
            players,
            seed,
            max_flips,
            timeout_ms,
            verbosity,
            json,
        } => {
            let setup = match board {
                Some(path) => LayoutLoader::load_from_file(&path)?,
                None => {
                    let catalog: Vec<&str> =
                        symbols.split(',').map(str::trim).filter(|s| !s.is_empty()).collect();
                    generate(rows, cols, &catalog, seed)?
                }
            };
            let board = Board::new(setup)?;

            let config = SimConfig {
                players,
                seed,
                max_flips,
                timeout: Duration::from_millis(timeout_ms),
                verbosity: verbosity.into(),
            };
            let report = sim::run(&board, config).await?;

            if json {
                match serde_json::to_string_pretty(&report) {
                    Ok(text) => println!("{text}"),
                    Err(e) => eprintln!("failed to serialize report: {e}"),
                }
            } else {
                for player in &report.players {
                    println!(
                        "{}: {} flips, {} matches, {} misses, {} timeouts",
                        player.id, player.flips, player.matches, player.misses, player.timeouts
                    );
                }
                println!(
                    "remaining cards: {} (cleared: {})",
                    report.remaining_cards, report.board_cleared
                );
            }
            Ok(())
        }

        Commands::Show { board } => {
            let setup = LayoutLoader::load_from_file(&board)?;
            let board = Board::new(setup)?;
            print!("{}", board.look("viewer").await?);
            Ok(())
        }
    }
}
