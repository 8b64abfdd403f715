//! Headless match runner for AI testing and balance work.
//!
//! This crate drives the battle core without a renderer:
//!
//! - **Scenarios**: RON files describing the board, teams, catalogs and rules
//! - **Matches**: computer-vs-computer play on an authoritative board, with a
//!   JSON summary and a replayable battle log
//! - **Batches**: many seeds in parallel for win-rate checks
//! - **Replays**: verify that a saved log reproduces its final board
//!
//! # Example
//!
//! ```bash
//! # Play one match and print the board every round
//! cargo run -p tactics_headless -- run --scenario scenarios/skirmish.ron --watch
//!
//! # 200 seeds in parallel
//! cargo run -p tactics_headless -- batch --scenario scenarios/zone_race.ron --count 200
//!
//! # Check a saved log
//! cargo run -p tactics_headless -- verify-replay --file match.log
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod ascii;
pub mod batch;
pub mod roster;
pub mod runner;
pub mod scenario;

pub use ascii::{render_ascii, render_team_line, AsciiConfig};
pub use batch::{run_batch, verify_determinism, BatchConfig, BatchResults, BatchSummary};
pub use roster::{Roster, UnitRecord, UnitStats};
pub use runner::{run_match, MatchOutcome, MatchResult, MatchRunner, MatchSummary};
pub use scenario::{Scenario, ScenarioError};
