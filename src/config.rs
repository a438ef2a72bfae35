use std::path::PathBuf;

use chrono::{Datelike, Local, NaiveDate};
use tracing::warn;

pub const DEFAULT_SEASONS_PATH: &str = "data/clean/player_seasons.parquet";
pub const DEFAULT_BIO_PATH: &str = "data/clean/player_bio.csv";
pub const DEFAULT_K: usize = 3;

/// Month the regular season opens; seasons are labelled by the year they start.
const SEASON_START_MONTH: u32 = 10;

#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    pub seasons_path: PathBuf,
    pub bio_path: PathBuf,
    pub current_season: i32,
    pub default_k: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            seasons_path: PathBuf::from(DEFAULT_SEASONS_PATH),
            bio_path: PathBuf::from(DEFAULT_BIO_PATH),
            current_season: current_season_for(Local::now().date_naive()),
            default_k: DEFAULT_K,
        }
    }
}

impl EngineConfig {
    /// Reads `HOOPS_*` variables; call [`load_dotenv`] first to pick up files.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let path = |key: &str, fallback: PathBuf| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .map(PathBuf::from)
                .unwrap_or(fallback)
        };
        Self {
            seasons_path: path("HOOPS_SEASONS_PATH", defaults.seasons_path),
            bio_path: path("HOOPS_BIO_PATH", defaults.bio_path),
            current_season: parsed(&lookup, "HOOPS_CURRENT_SEASON", defaults.current_season),
            default_k: parsed(&lookup, "HOOPS_DEFAULT_K", defaults.default_k),
        }
    }
}

fn parsed<F, T>(lookup: &F, key: &str, fallback: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr + std::fmt::Display + Copy,
{
    let Some(raw) = lookup(key) else {
        return fallback;
    };
    match raw.trim().parse::<T>() {
        Ok(v) => v,
        Err(_) => {
            warn!(key, value = %raw, fallback = %fallback, "ignoring invalid setting");
            fallback
        }
    }
}

/// Season label for a calendar date: October onward belongs to that year's
/// season, earlier months to the previous one.
pub fn current_season_for(date: NaiveDate) -> i32 {
    if date.month() >= SEASON_START_MONTH {
        date.year()
    } else {
        date.year() - 1
    }
}

/// `.env.local` first so it overrides `.env`; dotenvy never replaces a set variable.
pub fn load_dotenv() {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn season_rolls_over_in_october() {
        let d = |y, m, day| NaiveDate::from_ymd_opt(y, m, day).unwrap();
        assert_eq!(current_season_for(d(2025, 9, 30)), 2024);
        assert_eq!(current_season_for(d(2025, 10, 1)), 2025);
        assert_eq!(current_season_for(d(2026, 1, 15)), 2025);
    }

    #[test]
    fn env_values_override_and_bad_numbers_fall_back() {
        let vars: HashMap<&str, &str> = [
            ("HOOPS_SEASONS_PATH", "fixtures/seasons.csv"),
            ("HOOPS_CURRENT_SEASON", "2025"),
            ("HOOPS_DEFAULT_K", "many"),
        ]
        .into_iter()
        .collect();
        let cfg = EngineConfig::from_lookup(|k| vars.get(k).map(|v| v.to_string()));
        assert_eq!(cfg.seasons_path, PathBuf::from("fixtures/seasons.csv"));
        assert_eq!(cfg.bio_path, PathBuf::from(DEFAULT_BIO_PATH));
        assert_eq!(cfg.current_season, 2025);
        assert_eq!(cfg.default_k, DEFAULT_K);
    }
}
