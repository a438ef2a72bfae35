use serde::Serialize;

use crate::features::SeasonRow;

pub const PROJECTION_YEARS: i32 = 5;

const GP_DECAY: f64 = 0.07;
const MPG_DECAY: f64 = 0.08;
const GP_FLOOR: f64 = 10.0;
const MPG_FLOOR: f64 = 5.0;

/// Linear per-year change applied to per-game rates and true shooting.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecayRates {
    pub pts: f64,
    pub ast: f64,
    pub reb: f64,
    pub fg3: f64,
    pub stl: f64,
    pub blk: f64,
    pub tov: f64,
    pub ts: f64,
}

pub const DECAY: DecayRates = DecayRates {
    pts: -0.5,
    ast: -0.2,
    reb: -0.3,
    fg3: -0.1,
    stl: -0.05,
    blk: -0.05,
    tov: -0.05,
    ts: -0.005,
};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectionPoint {
    pub season: i32,
    pub age: Option<f64>,
    pub gp_pred: Option<f64>,
    pub mpg_pred: Option<f64>,
    pub pts_per_game_pred: Option<f64>,
    pub ast_per_game_pred: Option<f64>,
    pub reb_per_game_pred: Option<f64>,
    pub fg3_per_game_pred: Option<f64>,
    pub fg_pct_pred: Option<f64>,
    pub ft_pct_pred: Option<f64>,
    pub stl_per_game_pred: Option<f64>,
    pub blk_per_game_pred: Option<f64>,
    pub tov_per_game_pred: Option<f64>,
    pub ts_pct_pred: Option<f64>,
}

fn linear(base: Option<f64>, per_year: f64, years: f64) -> Option<f64> {
    base.map(|b| (b + per_year * years).max(0.0))
}

fn shrink(base: Option<f64>, rate: f64, years: f64, floor: f64) -> Option<f64> {
    base.map(|b| (b * (1.0 - rate * years)).max(floor))
}

/// Five seasons forward from the latest season before `current_season`.
/// Empty unless the player appeared in the immediately preceding season.
pub fn project(history: &[SeasonRow], current_season: i32) -> Vec<ProjectionPoint> {
    let prior = history
        .iter()
        .filter(|r| r.season() < current_season)
        .collect::<Vec<_>>();
    let played_last_season = prior
        .iter()
        .any(|r| r.season() == current_season - 1 && r.played());
    if !played_last_season {
        return Vec::new();
    }
    let Some(base) = prior.iter().max_by_key(|r| r.season()) else {
        return Vec::new();
    };

    (1..=PROJECTION_YEARS)
        .map(|i| {
            let years = f64::from(i);
            ProjectionPoint {
                season: base.season() + i,
                age: base.raw.age.map(|a| a + years),
                gp_pred: shrink(base.raw.gp, GP_DECAY, years, GP_FLOOR),
                mpg_pred: shrink(base.mpg, MPG_DECAY, years, MPG_FLOOR),
                pts_per_game_pred: linear(base.pts_per_game, DECAY.pts, years),
                ast_per_game_pred: linear(base.ast_per_game, DECAY.ast, years),
                reb_per_game_pred: linear(base.reb_per_game, DECAY.reb, years),
                fg3_per_game_pred: linear(base.fg3_per_game, DECAY.fg3, years),
                fg_pct_pred: base.fg_pct,
                ft_pct_pred: base.ft_pct,
                stl_per_game_pred: linear(base.stl_per_game, DECAY.stl, years),
                blk_per_game_pred: linear(base.blk_per_game, DECAY.blk, years),
                tov_per_game_pred: linear(base.tov_per_game, DECAY.tov, years),
                ts_pct_pred: linear(base.ts_pct, DECAY.ts, years),
            }
        })
        .collect()
}
