//! Headless Geometry Defense runner.
//!
//! Runs engine sessions without graphics, driven by a scripted player.
//! Designed for CI verification, balance probing, and exercising the
//! save/resume path end to end.
//!
//! # Usage
//!
//! ```bash
//! # Play level 1 as the default user, committing the result to profiles.json
//! cargo run -p td_headless -- run --level 1
//!
//! # Resume the saved game for a user
//! cargo run -p td_headless -- run --user student --resume
//!
//! # Save out after two cleared waves and write the checkpoint to a file
//! cargo run -p td_headless -- run --wave-cap 2 --save-file wave2.save
//!
//! # Verify determinism of a scripted run
//! cargo run -p td_headless -- verify --level 2 --runs 5
//! ```
//!
//! Logs go to stderr; summaries are printed when a session stops.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use td_core::checkpoint::Checkpoint;
use td_core::grid::GridConfig;
use td_core::level::LevelSpec;
use td_core::session::{Mode, Session, SessionOutcome};
use td_headless::autoplay::{run_session, AutoPlayer, AutoPolicy, FIXED_DT};
use td_headless::level_file::load_level;
use td_headless::profile::{unix_timestamp, ProfileStore};

#[derive(Parser)]
#[command(name = "td_headless")]
#[command(about = "Headless Geometry Defense runner for scripted play and CI")]
#[command(version)]
struct Cli {
    /// Enable verbose logging to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Play one session with the scripted player
    Run {
        /// Built-in level id to play
        #[arg(short, long, default_value = "1")]
        level: u32,

        /// RON level file to play instead of a built-in
        #[arg(long)]
        level_file: Option<PathBuf>,

        /// Game mode: campaign or endless
        #[arg(short, long, default_value = "campaign")]
        mode: String,

        /// Profile to commit the outcome to
        #[arg(short, long, default_value = "student")]
        user: String,

        /// Profile store path
        #[arg(long, default_value = "profiles.json")]
        profile_file: PathBuf,

        /// Resume the user's saved game instead of starting fresh
        #[arg(long)]
        resume: bool,

        /// Resume from a checkpoint file written by --save-file
        #[arg(long, conflicts_with = "resume")]
        resume_file: Option<PathBuf>,

        /// Also write a saved checkpoint to this file
        #[arg(long)]
        save_file: Option<PathBuf>,

        /// Waves to keep playing past the campaign (0 declines endless)
        #[arg(long, default_value = "0")]
        endless_waves: u32,

        /// Save-and-exit once this many waves are cleared
        #[arg(long)]
        wave_cap: Option<u32>,

        /// Never build towers (every wave leaks)
        #[arg(long)]
        pacifist: bool,

        /// Maximum session duration in minutes of game time
        #[arg(long, default_value = "30")]
        max_minutes: u32,
    },

    /// Verify determinism by running the same script multiple times
    Verify {
        /// Built-in level id to play
        #[arg(short, long, default_value = "1")]
        level: u32,

        /// Number of verification runs
        #[arg(short, long, default_value = "5")]
        runs: u32,

        /// Frames to simulate per run
        #[arg(short, long, default_value = "3600")]
        ticks: u64,
    },

    /// List the built-in levels
    Levels,
}

fn main() {
    let cli = Cli::parse();

    // Initialize logging to stderr (stdout stays clean for summaries)
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
        Some(Commands::Run {
            level,
            level_file,
            mode,
            user,
            profile_file,
            resume,
            resume_file,
            save_file,
            endless_waves,
            wave_cap,
            pacifist,
            max_minutes,
        }) => {
            cmd_run(RunArgs {
                level,
                level_file,
                mode,
                user,
                profile_file,
                resume,
                resume_file,
                save_file,
                endless_waves,
                wave_cap,
                pacifist,
                max_minutes,
            });
        }
        Some(Commands::Verify { level, runs, ticks }) => {
            cmd_verify(level, runs, ticks);
        }
        Some(Commands::Levels) | None => {
            cmd_levels();
        }
    }
}

struct RunArgs {
    level: u32,
    level_file: Option<PathBuf>,
    mode: String,
    user: String,
    profile_file: PathBuf,
    resume: bool,
    resume_file: Option<PathBuf>,
    save_file: Option<PathBuf>,
    endless_waves: u32,
    wave_cap: Option<u32>,
    pacifist: bool,
    max_minutes: u32,
}

/// Play one session and commit the outcome to the profile store.
fn cmd_run(args: RunArgs) {
    let mut store = match ProfileStore::load(&args.profile_file) {
        Ok(store) => store,
        Err(e) => {
            eprintln!("Failed to load profile store: {}", e);
            std::process::exit(1);
        }
    };

    // Resolve the checkpoint to resume from, if any.
    let checkpoint: Option<Checkpoint> = if args.resume {
        let Some(saved) = store
            .profile(&args.user)
            .and_then(|p| p.saved_game.clone())
        else {
            eprintln!("No saved game for user '{}'", args.user);
            std::process::exit(1);
        };
        Some(saved)
    } else if let Some(path) = &args.resume_file {
        match Checkpoint::load(path) {
            Ok(checkpoint) => Some(checkpoint),
            Err(e) => {
                eprintln!("Failed to load save file: {}", e);
                std::process::exit(1);
            }
        }
    } else {
        None
    };

    // Resolve the level: an explicit file wins, then the checkpoint's
    // level, then the --level id.
    let level = if let Some(path) = &args.level_file {
        match load_level(path) {
            Ok(level) => level,
            Err(e) => {
                eprintln!("Failed to load level: {}", e);
                std::process::exit(1);
            }
        }
    } else {
        let id = checkpoint.as_ref().map_or(args.level, |c| c.level_id);
        match LevelSpec::builtin_by_id(id) {
            Some(level) => level,
            None => {
                eprintln!("Unknown level id {}", id);
                std::process::exit(1);
            }
        }
    };

    let mode = checkpoint.as_ref().map_or_else(
        || match args.mode.as_str() {
            "endless" => Mode::Endless,
            _ => Mode::Campaign,
        },
        |c| c.mode,
    );

    // Starting fresh invalidates any old save, like picking a new level
    // from the menu.
    if checkpoint.is_none() {
        store.profile_mut(&args.user).clear_saved_game();
    }

    let session = match Session::new(level.clone(), mode, checkpoint) {
        Ok(session) => session,
        Err(e) => {
            eprintln!("Failed to start session: {}", e);
            std::process::exit(1);
        }
    };

    let policy = if args.pacifist {
        AutoPolicy {
            endless_waves: args.endless_waves,
            wave_cap: args.wave_cap,
            ..AutoPolicy::pacifist()
        }
    } else {
        AutoPolicy {
            endless_waves: args.endless_waves,
            wave_cap: args.wave_cap,
            ..AutoPolicy::default()
        }
    };
    let player = AutoPlayer::new(&level, &GridConfig::default(), policy);

    tracing::info!(
        level = level.id,
        name = %level.name,
        mode = ?mode,
        user = %args.user,
        "starting session"
    );

    let max_ticks = u64::from(args.max_minutes) * 60 * 60;
    let outcome = run_session(session, player, max_ticks);

    match outcome {
        SessionOutcome::Saved { checkpoint } => {
            if let Some(path) = &args.save_file {
                if let Err(e) = checkpoint.save(path) {
                    eprintln!("Failed to write save file: {}", e);
                    std::process::exit(1);
                }
            }

            let wave = checkpoint.current_wave_number;
            let cleared = checkpoint.waves_cleared;
            store.profile_mut(&args.user).save_game(checkpoint);
            commit(&store, &args.profile_file);

            eprintln!("\n{}", "=".repeat(50));
            eprintln!("SESSION SAVED");
            eprintln!("{}", "=".repeat(50));
            eprintln!("User: {}", args.user);
            eprintln!("Level: {} ({})", level.id, level.name);
            eprintln!("Next wave: {} ({} cleared)", wave, cleared);
        }
        SessionOutcome::Ended(report) => {
            let profile = store.profile_mut(&args.user);
            profile.record_run(unix_timestamp(), &report);
            if report.campaign_completed || report.lost {
                profile.clear_saved_game();
            }
            let best = profile
                .best_score_by_level
                .get(&report.level_id)
                .copied()
                .unwrap_or(0);
            commit(&store, &args.profile_file);

            let status = if report.won {
                "VICTORY"
            } else if report.lost {
                "DEFEAT"
            } else {
                "ENDED"
            };

            eprintln!("\n{}", "=".repeat(50));
            eprintln!("SESSION {}", status);
            eprintln!("{}", "=".repeat(50));
            eprintln!("User: {}", args.user);
            eprintln!("Level: {} ({})", level.id, level.name);
            eprintln!("Score: {} (best {})", report.score, best);
            eprintln!("Kills: {}", report.kills);
            eprintln!("Exit reason: {:?}", report.exit_reason);
        }
    }
}

fn commit(store: &ProfileStore, path: &std::path::Path) {
    if let Err(e) = store.save(path) {
        eprintln!("Failed to save profile store: {}", e);
        std::process::exit(1);
    }
}

/// Verify determinism of the scripted player.
fn cmd_verify(level_id: u32, runs: u32, ticks: u64) {
    let Some(level) = LevelSpec::builtin_by_id(level_id) else {
        eprintln!("Unknown level id {}", level_id);
        std::process::exit(1);
    };

    tracing::info!(level = level_id, runs, ticks, "verifying determinism");

    let mut hashes = Vec::new();
    for _ in 0..runs {
        let mut session = match Session::new(level.clone(), Mode::Campaign, None) {
            Ok(session) => session,
            Err(e) => {
                eprintln!("Failed to start session: {}", e);
                std::process::exit(1);
            }
        };
        let mut player = AutoPlayer::new(&level, &GridConfig::default(), AutoPolicy::default());

        for _ in 0..ticks {
            player.act(&mut session);
            session.update(FIXED_DT);
        }
        hashes.push(session.state_hash());
    }

    if hashes.windows(2).all(|w| w[0] == w[1]) {
        eprintln!("PASS: All {} runs produced identical results", runs);
        eprintln!("  State hash: {:016x}", hashes[0]);
    } else {
        eprintln!("FAIL: Non-determinism detected!");
        for (i, hash) in hashes.iter().enumerate() {
            eprintln!("  Run {}: {:016x}", i + 1, hash);
        }
        std::process::exit(1);
    }
}

/// List the built-in levels.
fn cmd_levels() {
    println!("Built-in levels:");
    for level in LevelSpec::builtin() {
        println!(
            "  {}  {}  ({} campaign waves, {} waypoints)",
            level.id,
            level.name,
            level.campaign_waves,
            level.path_grid.len()
        );
    }
}
