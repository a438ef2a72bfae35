use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;

use hoops_career::Store;
use hoops_career::config::{self, EngineConfig};
use hoops_career::error::QueryError;
use hoops_career::logging;
use hoops_career::synthetic;

/// Exit status when a similarity space could not be built.
const EXIT_SPACE_UNAVAILABLE: u8 = 3;

#[derive(Debug, Parser)]
#[command(name = "career_query", about = "Query derived career views as JSON")]
struct Cli {
    #[arg(long, env = "HOOPS_SEASONS_PATH")]
    seasons: Option<PathBuf>,
    #[arg(long, env = "HOOPS_BIO_PATH")]
    bio: Option<PathBuf>,
    #[arg(long)]
    season: Option<i32>,
    /// Query a generated roster built from this seed instead of the season table.
    #[arg(long)]
    demo_seed: Option<u64>,
    #[arg(long, default_value_t = false)]
    compact: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Every player with a season on record.
    Players {
        /// Only players with at least this many qualifying seasons.
        #[arg(long, default_value_t = 0)]
        min_seasons: usize,
    },
    Profile { player_id: i64 },
    Trajectory { player_id: i64 },
    Comps {
        player_id: i64,
        #[arg(short, long)]
        k: Option<usize>,
    },
    CompsCounting {
        player_id: i64,
        #[arg(short, long)]
        k: Option<usize>,
    },
    Geometry {
        player_id: i64,
        #[arg(short, long)]
        k: Option<usize>,
    },
    Label { player_id: i64 },
    Labels,
    Projection { player_id: i64 },
    Forecast { player_id: i64 },
    Radar {
        player_id: i64,
        #[arg(short, long)]
        k: Option<usize>,
    },
}

fn main() -> ExitCode {
    config::load_dotenv();
    logging::init_logging();
    let cli = Cli::parse();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err:#}");
            match err.downcast_ref::<QueryError>() {
                Some(q) if q.is_retriable() => ExitCode::from(EXIT_SPACE_UNAVAILABLE),
                _ => ExitCode::FAILURE,
            }
        }
    }
}

fn load_store(cli: &Cli) -> Result<Store> {
    let mut cfg = EngineConfig::from_env();
    if let Some(path) = &cli.seasons {
        cfg.seasons_path = path.clone();
    }
    if let Some(path) = &cli.bio {
        cfg.bio_path = path.clone();
    }
    if let Some(season) = cli.season {
        cfg.current_season = season;
    }
    if let Some(seed) = cli.demo_seed {
        let roster = synthetic::generate(400, cfg.current_season, seed);
        return Ok(Store::from_raw(roster.seasons, &roster.bio, cfg.current_season)
            .with_default_k(cfg.default_k));
    }
    Store::load(&cfg).with_context(|| format!("loading {}", cfg.seasons_path.display()))
}

fn run(cli: &Cli) -> Result<()> {
    let store = load_store(cli)?;
    let k = |k: Option<usize>| k.unwrap_or(store.default_k());

    match &cli.command {
        Command::Players { min_seasons } => {
            let players = store
                .players()
                .iter()
                .filter(|p| p.qualifying_seasons >= *min_seasons)
                .collect::<Vec<_>>();
            emit(cli, &players)
        }
        Command::Profile { player_id } => emit(cli, &store.profile(*player_id)),
        Command::Trajectory { player_id } => emit(cli, &store.trajectory(*player_id)),
        Command::Comps { player_id, k: kk } => emit(cli, &store.comps(*player_id, k(*kk))?),
        Command::CompsCounting { player_id, k: kk } => {
            emit(cli, &store.comps_counting(*player_id, k(*kk))?)
        }
        Command::Geometry { player_id, k: kk } => {
            emit(cli, &store.counting_geometry(*player_id, k(*kk))?)
        }
        Command::Label { player_id } => emit(cli, &store.label(*player_id)),
        Command::Labels => emit(cli, store.label_summary()),
        Command::Projection { player_id } => emit(cli, &store.projection(*player_id)),
        Command::Forecast { player_id } => emit(cli, &store.forecast(*player_id).as_deref()),
        Command::Radar { player_id, k: kk } => emit(cli, &store.radar(*player_id, k(*kk))?),
    }
}

fn emit<T: Serialize + ?Sized>(cli: &Cli, value: &T) -> Result<()> {
    let text = if cli.compact {
        serde_json::to_string(value)?
    } else {
        serde_json::to_string_pretty(value)?
    };
    println!("{text}");
    Ok(())
}
