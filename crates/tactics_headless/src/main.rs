//! Headless tactics match runner.
//!
//! Runs computer-vs-computer matches from RON scenarios. Reports go to
//! stdout, logs to stderr.
//!
//! # Usage
//!
//! ```bash
//! # One match, JSON summary on stdout
//! cargo run -p tactics_headless -- run --scenario scenarios/skirmish.ron --seed 7
//!
//! # Watch the board round by round and keep the log
//! cargo run -p tactics_headless -- run --watch --log match.log
//!
//! # Balance batch
//! cargo run -p tactics_headless -- batch --count 500 --output results/
//!
//! # Check scenario files
//! cargo run -p tactics_headless -- validate scenarios/*.ron
//!
//! # Re-play a log and compare hashes
//! cargo run -p tactics_headless -- verify-replay --file match.log
//! ```

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tactics_core::replay::BattleLog;
use tactics_headless::{
    ascii::colors,
    batch::{run_batch, verify_determinism, BatchConfig},
    render_ascii, render_team_line, AsciiConfig, MatchRunner, Scenario,
};

#[derive(Parser)]
#[command(name = "tactics_headless")]
#[command(about = "Headless grid tactics runner for AI testing and balance work")]
#[command(version)]
struct Cli {
    /// Enable verbose logging to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Play a single match
    Run {
        /// Scenario file (built-in skirmish if omitted)
        #[arg(short, long)]
        scenario: Option<PathBuf>,

        /// Match seed
        #[arg(long, default_value = "0")]
        seed: u64,

        /// Round limit override
        #[arg(long)]
        max_rounds: Option<u32>,

        /// Print the board after every round
        #[arg(short, long)]
        watch: bool,

        /// Disable colored board output
        #[arg(long)]
        no_color: bool,

        /// Save the battle log here
        #[arg(short, long)]
        log: Option<PathBuf>,
    },

    /// Run a batch of matches for balance testing
    Batch {
        /// Scenario file (built-in skirmish if omitted)
        #[arg(short, long)]
        scenario: Option<PathBuf>,

        /// Number of matches to run
        #[arg(short, long, default_value = "100")]
        count: u32,

        /// Maximum parallel matches (0 = auto)
        #[arg(short, long, default_value = "0")]
        parallel: u32,

        /// Output directory for results
        #[arg(short, long, default_value = "results")]
        output: PathBuf,

        /// Starting seed
        #[arg(long, default_value = "0")]
        seed: u64,

        /// Round limit override
        #[arg(long)]
        max_rounds: Option<u32>,

        /// Also re-run one seed several times and compare outcomes
        #[arg(long)]
        verify: bool,
    },

    /// Check that scenario files load and build a playable board
    Validate {
        /// Scenario files
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Re-play a battle log and compare its final hash
    VerifyReplay {
        /// Battle log file
        #[arg(short, long)]
        file: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();

    let log_level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(true),
        )
        .with(tracing_subscriber::filter::LevelFilter::from_level(
            log_level,
        ))
        .init();

    match cli.command {
        Commands::Run {
            scenario,
            seed,
            max_rounds,
            watch,
            no_color,
            log,
        } => cmd_run(scenario.as_deref(), seed, max_rounds, watch, no_color, log.as_deref()),
        Commands::Batch {
            scenario,
            count,
            parallel,
            output,
            seed,
            max_rounds,
            verify,
        } => cmd_batch(scenario.as_deref(), count, parallel, output, seed, max_rounds, verify),
        Commands::Validate { files } => cmd_validate(&files),
        Commands::VerifyReplay { file } => cmd_verify_replay(&file),
    }
}

fn load_scenario(path: Option<&Path>) -> Scenario {
    let Some(path) = path else {
        return Scenario::skirmish();
    };
    match Scenario::load(path) {
        Ok(scenario) => scenario,
        Err(e) => {
            eprintln!("FATAL: {}: {e}", path.display());
            std::process::exit(1);
        }
    }
}

/// Play one match
fn cmd_run(
    scenario: Option<&Path>,
    seed: u64,
    max_rounds: Option<u32>,
    watch: bool,
    no_color: bool,
    log: Option<&Path>,
) {
    let scenario = load_scenario(scenario);
    let ascii = AsciiConfig {
        use_color: !no_color,
        ..AsciiConfig::default()
    };

    let mut runner = match MatchRunner::new(&scenario, seed) {
        Ok(runner) => runner,
        Err(e) => {
            eprintln!("FATAL: {e}");
            std::process::exit(1);
        }
    };
    if let Some(max_rounds) = max_rounds {
        runner = runner.with_max_rounds(max_rounds);
    }

    let names: Vec<String> = scenario.teams.iter().map(|t| t.name.clone()).collect();
    if watch {
        eprintln!("{}", render_ascii(runner.board(), runner.roster(), &ascii));
    }
    let result = runner.run_with(|r| {
        if watch {
            eprintln!(
                "{}── after round {} ──{}  {}",
                if ascii.use_color { colors::BOLD } else { "" },
                r.round().saturating_sub(1),
                if ascii.use_color { colors::RESET } else { "" },
                render_team_line(r.board(), &names, &ascii)
            );
            eprintln!("{}", render_ascii(r.board(), r.roster(), &ascii));
        }
    });

    if let Some(path) = log {
        if let Err(e) = result.log.save(path) {
            eprintln!("FATAL: Failed to save battle log: {e}");
            std::process::exit(1);
        }
        tracing::info!(path = %path.display(), turns = result.log.turn_count(), "Battle log saved");
    }

    match result.summary.to_json() {
        Ok(json) => println!("{json}"),
        Err(e) => {
            eprintln!("FATAL: Failed to serialize summary: {e}");
            std::process::exit(1);
        }
    }
}

/// Run batch of matches
fn cmd_batch(
    scenario: Option<&Path>,
    count: u32,
    parallel: u32,
    output: PathBuf,
    seed: u64,
    max_rounds: Option<u32>,
    verify: bool,
) {
    let scenario = load_scenario(scenario);
    let cpus = std::thread::available_parallelism().map_or(1, std::num::NonZeroUsize::get);
    tracing::info!(
        scenario = %scenario.name,
        count,
        parallel,
        seed,
        output = %output.display(),
        cpus_available = cpus,
        max_rounds = ?max_rounds,
        "Batch configuration"
    );

    if let Err(e) = std::fs::create_dir_all(&output) {
        tracing::error!(error = %e, path = %output.display(), "Failed to create output directory");
        eprintln!("FATAL: Cannot create output directory '{}': {e}", output.display());
        std::process::exit(1);
    }

    let mut config = BatchConfig::new(&scenario.name, count)
        .with_output(output.clone())
        .with_seed(seed)
        .with_parallelism(parallel);
    if let Some(max_rounds) = max_rounds {
        config = config.with_max_rounds(max_rounds);
    }

    let results = run_batch(&scenario, config);
    let results_path = output.join("batch_results.json");
    if let Err(e) = results.save(&results_path) {
        eprintln!("FATAL: Failed to save results: {e}");
        std::process::exit(1);
    }

    eprintln!("\n{}", "=".repeat(50));
    eprintln!("BATCH COMPLETE");
    eprintln!("{}", "=".repeat(50));
    eprintln!("Matches played: {}", results.games.len());
    if !results.errors.is_empty() {
        eprintln!("Matches FAILED: {}", results.errors.len());
    }
    eprintln!("Duration: {:.1}s", results.duration_seconds);
    eprintln!(
        "Rounds: avg {:.1}, min {}, max {}",
        results.summary.avg_rounds, results.summary.min_rounds, results.summary.max_rounds
    );
    eprintln!("\nWin Rates:");
    for (team, rate) in &results.summary.win_rates {
        eprintln!("  {team}: {:.1}%", rate * 100.0);
    }
    eprintln!(
        "  draws: {} (round limit {}, annihilation {})",
        results.summary.draws(),
        results.summary.round_limit_draws,
        results.summary.annihilations
    );

    if !results.errors.is_empty() {
        eprintln!("\nFAILURES:");
        for error in results.errors.iter().take(10) {
            eprintln!("  Match {} (seed {}): {}", error.game_index, error.seed, error.message);
        }
        if results.errors.len() > 10 {
            eprintln!("  ... and {} more failures", results.errors.len() - 10);
        }
    }
    eprintln!("\nResults saved to: {}", results_path.display());

    if verify {
        if verify_determinism(&scenario, seed, 3) {
            eprintln!("{}PASS{}: seed {seed} is deterministic", colors::GREEN, colors::RESET);
        } else {
            eprintln!("{}FAIL{}: seed {seed} diverged between runs", colors::RED, colors::RESET);
            std::process::exit(1);
        }
    }
}

/// Validate scenario files
fn cmd_validate(files: &[PathBuf]) {
    let mut failed = 0_usize;
    for path in files {
        match Scenario::load(path).and_then(|s| s.validate().map(|()| s)) {
            Ok(scenario) => eprintln!(
                "{}PASS{} {} ({}, {} teams)",
                colors::GREEN,
                colors::RESET,
                path.display(),
                scenario.name,
                scenario.team_count()
            ),
            Err(e) => {
                failed += 1;
                eprintln!("{}FAIL{} {}: {e}", colors::RED, colors::RESET, path.display());
            }
        }
    }

    if failed > 0 {
        eprintln!("{failed} of {} scenario(s) invalid", files.len());
        std::process::exit(1);
    }
}

/// Re-play a battle log
fn cmd_verify_replay(file: &Path) {
    let log = match BattleLog::load(file) {
        Ok(log) => log,
        Err(e) => {
            eprintln!("FATAL: Failed to load battle log: {e}");
            std::process::exit(1);
        }
    };

    tracing::info!(
        scenario = %log.scenario_id,
        seed = log.seed,
        turns = log.turn_count(),
        rounds = log.final_round,
        "Verifying replay"
    );

    match log.replay() {
        Ok(board) => {
            eprintln!(
                "{}PASS{}: {} turns reproduce hash {:#018x} ({} entities left)",
                colors::GREEN,
                colors::RESET,
                log.turn_count(),
                log.final_hash,
                board.entities().len()
            );
        }
        Err(e) => {
            eprintln!("{}FAIL{}: {e}", colors::RED, colors::RESET);
            std::process::exit(1);
        }
    }
}
