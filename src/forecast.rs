use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use serde::Serialize;

use crate::features::SeasonRow;

const RECENT_SEASONS: usize = 3;
const DEFAULT_VOLATILITY: f64 = 0.08;
const BAND_MIN: f64 = 0.08;
const BAND_MAX: f64 = 0.20;
const SECOND_YEAR_WIDEN: f64 = 1.35;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastPoint {
    pub season: i32,
    pub median: f64,
    pub p25: f64,
    pub p75: f64,
}

/// Step age curve peaking in the mid twenties.
pub fn age_adjustment(age: f64) -> f64 {
    if age < 23.0 {
        0.05
    } else if age < 27.0 {
        0.02
    } else if age < 30.0 {
        -0.01
    } else if age < 33.0 {
        -0.04
    } else {
        -0.08
    }
}

fn population_std(values: &[f64]) -> f64 {
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    (values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n).sqrt()
}

/// Last two values with gaps filled from the neighbouring season.
fn last_two(values: &[Option<f64>]) -> Vec<f64> {
    let tail = &values[values.len().saturating_sub(2)..];
    match *tail {
        [Some(v)] => vec![v],
        [Some(a), Some(b)] => vec![a, b],
        [Some(a), None] => vec![a, a],
        [None, Some(b)] => vec![b, b],
        _ => Vec::new(),
    }
}

/// Value-score forecast for `current_season` and the season after. `None`
/// unless the player has a row in `current_season` and a qualifying season
/// with a defined value score among the last three.
pub fn forecast(history: &[SeasonRow], current_season: i32) -> Option<Vec<ForecastPoint>> {
    if !history.iter().any(|r| r.season() == current_season) {
        return None;
    }
    let qualifying = history
        .iter()
        .filter(|r| r.is_qualifying(current_season))
        .collect::<Vec<_>>();
    let last = qualifying.last()?;

    let recent = &qualifying[qualifying.len().saturating_sub(RECENT_SEASONS)..];
    let recent_values = recent.iter().filter_map(|r| r.value_score).collect::<Vec<_>>();
    if recent_values.is_empty() {
        return None;
    }

    let scores = qualifying.iter().map(|r| r.value_score).collect::<Vec<_>>();
    let (base, trend) = match last_two(&scores)[..] {
        [only] => (only, 0.0),
        [prev, latest] => (0.6 * latest + 0.4 * prev, latest - prev),
        _ => return None,
    };
    if !base.is_finite() {
        return None;
    }

    let (adj_next, adj_after) = match last.raw.age {
        Some(age) => (age_adjustment(age + 1.0), age_adjustment(age + 2.0)),
        None => (0.0, 0.0),
    };
    let volatility = if recent_values.len() > 1 {
        population_std(&recent_values)
    } else {
        DEFAULT_VOLATILITY
    };
    let band = (0.6 * volatility + 0.08).clamp(BAND_MIN, BAND_MAX);

    let horizon = [
        (current_season, adj_next, 1.0),
        (current_season + 1, adj_after, SECOND_YEAR_WIDEN),
    ];
    Some(
        horizon
            .iter()
            .enumerate()
            .map(|(idx, &(season, age_adj, widen))| {
                let median = base + age_adj + trend * 0.5 * idx as f64;
                let half = band * widen;
                ForecastPoint {
                    season,
                    median,
                    p25: median - half / 2.0,
                    p75: median + half / 2.0,
                }
            })
            .collect(),
    )
}

pub type SharedForecast = Option<Arc<Vec<ForecastPoint>>>;

/// Per-player forecast memo. Entries are never invalidated: the season
/// table does not change after load.
#[derive(Debug, Default)]
pub struct ForecastMemo {
    entries: Mutex<HashMap<i64, SharedForecast>>,
}

impl ForecastMemo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|m| m.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the memoized entry or computes one. The lock is released while
    /// computing; when two callers race, the first stored value wins.
    pub fn get_or_compute<F>(&self, player_id: i64, compute: F) -> SharedForecast
    where
        F: FnOnce() -> Option<Vec<ForecastPoint>>,
    {
        if let Ok(map) = self.entries.lock()
            && let Some(hit) = map.get(&player_id)
        {
            return hit.clone();
        }
        let fresh = compute().map(Arc::new);
        match self.entries.lock() {
            Ok(mut map) => map.entry(player_id).or_insert(fresh).clone(),
            Err(_) => fresh,
        }
    }
}
