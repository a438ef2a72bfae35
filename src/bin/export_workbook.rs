use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;

use hoops_career::Store;
use hoops_career::config::{self, EngineConfig};
use hoops_career::export;
use hoops_career::logging;
use hoops_career::synthetic;

#[derive(Debug, Parser)]
#[command(name = "export_workbook", about = "Write derived career views to an xlsx workbook")]
struct Args {
    #[arg(short, long, default_value = "hoops_career.xlsx")]
    out: PathBuf,
    #[arg(long)]
    seasons: Option<PathBuf>,
    #[arg(long)]
    bio: Option<PathBuf>,
    #[arg(long)]
    season: Option<i32>,
    /// Skip players with fewer qualifying seasons.
    #[arg(long, default_value_t = 1)]
    min_seasons: usize,
    #[arg(long)]
    demo_seed: Option<u64>,
}

fn main() -> Result<()> {
    config::load_dotenv();
    logging::init_logging();
    let args = Args::parse();

    let mut cfg = EngineConfig::from_env();
    if let Some(path) = args.seasons {
        cfg.seasons_path = path;
    }
    if let Some(path) = args.bio {
        cfg.bio_path = path;
    }
    if let Some(season) = args.season {
        cfg.current_season = season;
    }

    let store = match args.demo_seed {
        Some(seed) => {
            let roster = synthetic::generate(400, cfg.current_season, seed);
            Store::from_raw(roster.seasons, &roster.bio, cfg.current_season)
        }
        None => Store::load(&cfg)?,
    };

    let report = export::export_workbook(&store, &args.out, args.min_seasons)?;

    println!("Workbook export complete");
    println!("File: {}", args.out.display());
    println!("Current season: {}", store.current_season());
    println!("Players: {}", report.players);
    println!("Labels: {}", report.labels);
    println!("Trajectory rows: {}", report.trajectory_rows);
    println!("Projection rows: {}", report.projection_rows);
    println!("Forecast rows: {}", report.forecast_rows);
    Ok(())
}
