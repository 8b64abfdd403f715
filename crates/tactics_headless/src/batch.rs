//! Batch match runner for balance testing.
//!
//! Runs many seeds of one scenario in parallel using rayon and aggregates
//! win counts and match lengths.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Instant;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::runner::{MatchOutcome, MatchRunner, MatchSummary};
use crate::scenario::Scenario;

/// Configuration for a batch run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Scenario name, for the report.
    pub scenario: String,
    /// Number of matches to run.
    pub game_count: u32,
    /// Maximum parallel matches (0 = use rayon default).
    pub parallel_games: u32,
    /// Output directory for results.
    pub output_dir: PathBuf,
    /// Starting seed; match `i` uses `seed_start + i`.
    pub seed_start: u64,
    /// Round limit override.
    pub max_rounds: Option<u32>,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            scenario: "Skirmish".to_string(),
            game_count: 100,
            parallel_games: 0,
            output_dir: PathBuf::from("results"),
            seed_start: 0,
            max_rounds: None,
        }
    }
}

impl BatchConfig {
    /// Create config for a specific scenario.
    #[must_use]
    pub fn new(scenario: &str, game_count: u32) -> Self {
        Self {
            scenario: scenario.to_string(),
            game_count,
            ..Default::default()
        }
    }

    /// Set output directory.
    #[must_use]
    pub fn with_output(mut self, dir: PathBuf) -> Self {
        self.output_dir = dir;
        self
    }

    /// Set seed start.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed_start = seed;
        self
    }

    /// Set the round limit override.
    #[must_use]
    pub fn with_max_rounds(mut self, max_rounds: u32) -> Self {
        self.max_rounds = Some(max_rounds);
        self
    }

    /// Set parallelism.
    #[must_use]
    pub fn with_parallelism(mut self, parallel_games: u32) -> Self {
        self.parallel_games = parallel_games;
        self
    }
}

/// Summary statistics across many matches.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary {
    /// Matches played.
    pub total_games: u32,
    /// Wins by team name.
    pub wins_by_team: BTreeMap<String, u32>,
    /// Win rates by team name.
    pub win_rates: BTreeMap<String, f64>,
    /// Matches stopped by the round limit.
    pub round_limit_draws: u32,
    /// Matches where nobody survived.
    pub annihilations: u32,
    /// Average match length in rounds.
    pub avg_rounds: f64,
    /// Shortest match.
    pub min_rounds: u32,
    /// Longest match.
    pub max_rounds: u32,
}

impl BatchSummary {
    /// Calculate the summary from individual matches.
    #[must_use]
    pub fn from_games(games: &[MatchSummary]) -> Self {
        if games.is_empty() {
            return Self::default();
        }

        let mut summary = Self {
            total_games: u32::try_from(games.len()).unwrap_or(u32::MAX),
            min_rounds: u32::MAX,
            ..Default::default()
        };

        let mut round_sum = 0_u64;
        for game in games {
            round_sum += u64::from(game.rounds);
            summary.min_rounds = summary.min_rounds.min(game.rounds);
            summary.max_rounds = summary.max_rounds.max(game.rounds);

            match (game.outcome, &game.winner_name) {
                (MatchOutcome::Victory(_), Some(name)) => {
                    *summary.wins_by_team.entry(name.clone()).or_default() += 1;
                }
                (MatchOutcome::Victory(team), None) => {
                    *summary.wins_by_team.entry(format!("team {team}")).or_default() += 1;
                }
                (MatchOutcome::RoundLimit, _) => summary.round_limit_draws += 1,
                (MatchOutcome::Annihilation, _) => summary.annihilations += 1,
            }
        }

        summary.avg_rounds = round_sum as f64 / games.len() as f64;
        for (team, wins) in &summary.wins_by_team {
            summary
                .win_rates
                .insert(team.clone(), f64::from(*wins) / f64::from(summary.total_games));
        }

        summary
    }

    /// Draws of either kind.
    #[must_use]
    pub fn draws(&self) -> u32 {
        self.round_limit_draws + self.annihilations
    }

    /// Whether no team's win rate strays further than `threshold` from an
    /// even share.
    #[must_use]
    pub fn is_balanced(&self, threshold: f64, team_count: usize) -> bool {
        let fair = 1.0 / team_count.max(1) as f64;
        self.win_rates.values().all(|rate| (rate - fair).abs() <= threshold)
    }
}

/// Results from a batch run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchResults {
    /// Configuration used.
    pub config: BatchConfig,
    /// Individual match summaries, in seed order.
    pub games: Vec<MatchSummary>,
    /// Aggregate summary.
    pub summary: BatchSummary,
    /// Total runtime.
    pub duration_seconds: f64,
    /// Errors encountered.
    pub errors: Vec<BatchError>,
}

impl BatchResults {
    /// Save results to a JSON file.
    pub fn save(&self, path: &Path) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(path, json)
    }

    /// Load results from a JSON file.
    pub fn load(path: &Path) -> std::io::Result<Self> {
        let json = std::fs::read_to_string(path)?;
        serde_json::from_str(&json).map_err(std::io::Error::other)
    }
}

/// Error during a batch run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchError {
    /// Match index.
    pub game_index: u32,
    /// Seed used.
    pub seed: u64,
    /// Error message.
    pub message: String,
}

fn run_single_game(scenario: &Scenario, seed: u64, config: &BatchConfig) -> Result<MatchSummary, String> {
    let mut runner = MatchRunner::new(scenario, seed).map_err(|e| e.to_string())?;
    if let Some(max_rounds) = config.max_rounds {
        runner = runner.with_max_rounds(max_rounds);
    }
    Ok(runner.run().summary)
}

fn play_all(scenario: &Scenario, config: &BatchConfig) -> Vec<Result<MatchSummary, BatchError>> {
    (0..config.game_count)
        .into_par_iter()
        .map(|i| {
            let seed = config.seed_start.wrapping_add(u64::from(i));
            run_single_game(scenario, seed, config).map_err(|message| {
                warn!(game = i, seed, %message, "Match failed");
                BatchError {
                    game_index: i,
                    seed,
                    message,
                }
            })
        })
        .collect()
}

/// Run a batch of matches.
#[must_use]
pub fn run_batch(scenario: &Scenario, config: BatchConfig) -> BatchResults {
    let start = Instant::now();
    info!(
        games = config.game_count,
        scenario = %scenario.name,
        seed_start = config.seed_start,
        "Starting batch run"
    );

    let results = if config.parallel_games > 0 {
        match rayon::ThreadPoolBuilder::new()
            .num_threads(config.parallel_games as usize)
            .build()
        {
            Ok(pool) => pool.install(|| play_all(scenario, &config)),
            Err(e) => {
                warn!(error = %e, "Thread pool unavailable, using the global pool");
                play_all(scenario, &config)
            }
        }
    } else {
        play_all(scenario, &config)
    };

    let (games, errors): (Vec<_>, Vec<_>) = results.into_iter().partition(Result::is_ok);
    let games: Vec<MatchSummary> = games.into_iter().filter_map(Result::ok).collect();
    let errors: Vec<BatchError> = errors.into_iter().filter_map(Result::err).collect();

    let summary = BatchSummary::from_games(&games);
    let duration_seconds = start.elapsed().as_secs_f64();
    debug!(wins = ?summary.wins_by_team, draws = summary.draws(), "Batch tallied");
    info!(
        "Batch complete: {} matches in {:.2}s ({} errors)",
        games.len(),
        duration_seconds,
        errors.len()
    );

    BatchResults {
        config,
        games,
        summary,
        duration_seconds,
        errors,
    }
}

/// Run the same seed `runs` times and check every match ends identically.
#[must_use]
pub fn verify_determinism(scenario: &Scenario, seed: u64, runs: u32) -> bool {
    let config = BatchConfig::default();
    let results: Vec<Result<MatchSummary, String>> = (0..runs.max(1))
        .map(|_| run_single_game(scenario, seed, &config))
        .collect();

    let Some(Ok(first)) = results.first() else {
        return false;
    };
    results.iter().all(|r| r.as_ref().is_ok_and(|s| s == first))
}
