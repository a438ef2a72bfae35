use std::collections::HashMap;

use serde::Serialize;

use crate::dataset::RawSeason;

const FULL_SEASON_GAMES: f64 = 82.0;
const FULL_GAME_MINUTES: f64 = 36.0;
const PER_POSSESSIONS_MINUTES: f64 = 75.0;

/// Rate stats that are z-scored within their season.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ZStat {
    Pts,
    Ast,
    Reb,
    Stl,
    Blk,
    Ts,
    Tov,
}

pub const Z_STATS: [ZStat; 7] = [
    ZStat::Pts,
    ZStat::Ast,
    ZStat::Reb,
    ZStat::Stl,
    ZStat::Blk,
    ZStat::Ts,
    ZStat::Tov,
];

impl ZStat {
    fn slot(self) -> usize {
        self as usize
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct SeasonZ {
    pub pts: f64,
    pub ast: f64,
    pub reb: f64,
    pub stl: f64,
    pub blk: f64,
    pub ts: f64,
    pub tov: f64,
}

impl SeasonZ {
    fn set(&mut self, stat: ZStat, value: f64) {
        match stat {
            ZStat::Pts => self.pts = value,
            ZStat::Ast => self.ast = value,
            ZStat::Reb => self.reb = value,
            ZStat::Stl => self.stl = value,
            ZStat::Blk => self.blk = value,
            ZStat::Ts => self.ts = value,
            ZStat::Tov => self.tov = value,
        }
    }
}

/// A season row plus every derived field. Built once by [`derive_table`] and
/// never mutated afterwards.
#[derive(Debug, Clone, Serialize)]
pub struct SeasonRow {
    #[serde(flatten)]
    pub raw: RawSeason,
    pub mpg: Option<f64>,
    pub pts_per_game: Option<f64>,
    pub ast_per_game: Option<f64>,
    pub reb_per_game: Option<f64>,
    pub fg3_per_game: Option<f64>,
    pub stl_per_game: Option<f64>,
    pub blk_per_game: Option<f64>,
    pub tov_per_game: Option<f64>,
    pub fg_pct: Option<f64>,
    pub ft_pct: Option<f64>,
    pub ts_pct: Option<f64>,
    pub efg_pct: Option<f64>,
    pub pts_per75: Option<f64>,
    pub ast_per75: Option<f64>,
    pub reb_per75: Option<f64>,
    pub z: SeasonZ,
    pub impact_score: f64,
    pub availability: Option<f64>,
    pub off_load: f64,
    pub value_score: Option<f64>,
}

impl SeasonRow {
    fn with_rates(raw: RawSeason) -> Self {
        let gp = raw.gp;
        let shot_denom = match (raw.fga, raw.fta) {
            (Some(fga), Some(fta)) => Some(2.0 * (fga + 0.44 * fta)),
            _ => None,
        };
        let efg_num = match (raw.fgm, raw.fg3m) {
            (Some(fgm), Some(fg3m)) => Some(fgm + 0.5 * fg3m),
            _ => None,
        };
        Self {
            mpg: ratio(raw.min, gp),
            pts_per_game: ratio(raw.pts, gp),
            ast_per_game: ratio(raw.ast, gp),
            reb_per_game: ratio(raw.reb, gp),
            fg3_per_game: ratio(raw.fg3m, gp),
            stl_per_game: ratio(raw.stl, gp),
            blk_per_game: ratio(raw.blk, gp),
            tov_per_game: ratio(raw.tov, gp),
            fg_pct: ratio(raw.fgm, raw.fga),
            ft_pct: ratio(raw.ftm, raw.fta),
            ts_pct: ratio(raw.pts, shot_denom),
            efg_pct: ratio(efg_num, raw.fga),
            pts_per75: ratio(raw.pts, raw.min).map(|v| v * PER_POSSESSIONS_MINUTES),
            ast_per75: ratio(raw.ast, raw.min).map(|v| v * PER_POSSESSIONS_MINUTES),
            reb_per75: ratio(raw.reb, raw.min).map(|v| v * PER_POSSESSIONS_MINUTES),
            z: SeasonZ::default(),
            impact_score: 0.0,
            availability: None,
            off_load: 0.0,
            value_score: None,
            raw,
        }
    }

    fn apply_composites(&mut self, norms: &SeasonNorms) {
        for stat in Z_STATS {
            let z = norms.z(self.raw.season, stat, self.rate(stat));
            self.z.set(stat, z);
        }
        let z = self.z;
        self.impact_score = (z.pts + z.ast + z.reb + z.stl + z.blk + z.ts - z.tov) / 6.0;

        let gp_share = self.raw.gp.map(|gp| (gp / FULL_SEASON_GAMES).clamp(0.0, 1.0));
        let mpg_share = self.mpg.map(|mpg| (mpg / FULL_GAME_MINUTES).clamp(0.0, 1.0));
        self.availability = match (gp_share, mpg_share) {
            (Some(g), Some(m)) => Some(0.6 * g + 0.4 * m),
            _ => None,
        };
        self.off_load = (z.pts + z.ast) / 2.0;
        self.value_score = self
            .availability
            .map(|avail| 0.5 * self.impact_score + 0.25 * avail + 0.15 * self.off_load);
    }

    pub fn player_id(&self) -> i64 {
        self.raw.player_id
    }

    pub fn season(&self) -> i32 {
        self.raw.season
    }

    pub fn games(&self) -> f64 {
        self.raw.gp.unwrap_or(0.0)
    }

    pub fn played(&self) -> bool {
        self.games() > 0.0
    }

    /// Played at least one game in a season strictly before the operating year.
    pub fn is_qualifying(&self, current_season: i32) -> bool {
        self.played() && self.raw.season < current_season
    }

    pub fn rate(&self, stat: ZStat) -> Option<f64> {
        match stat {
            ZStat::Pts => self.pts_per_game,
            ZStat::Ast => self.ast_per_game,
            ZStat::Reb => self.reb_per_game,
            ZStat::Stl => self.stl_per_game,
            ZStat::Blk => self.blk_per_game,
            ZStat::Ts => self.ts_pct,
            ZStat::Tov => self.tov_per_game,
        }
    }

    pub fn stl_blk_per_game(&self) -> Option<f64> {
        Some(self.stl_per_game? + self.blk_per_game?)
    }
}

/// Division that yields `None` for a missing operand, a zero denominator or a
/// non-finite result.
pub fn ratio(num: Option<f64>, den: Option<f64>) -> Option<f64> {
    let (num, den) = (num?, den?);
    if den == 0.0 {
        return None;
    }
    let v = num / den;
    v.is_finite().then_some(v)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Moments {
    pub mean: f64,
    pub std: f64,
}

impl Moments {
    /// Mean and sample standard deviation; `None` below two observations.
    pub fn of(values: &[f64]) -> Option<Self> {
        if values.len() < 2 {
            return None;
        }
        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
        Some(Self {
            mean,
            std: var.sqrt(),
        })
    }
}

/// Per-(season, stat) mean and standard deviation, computed once per table.
#[derive(Debug, Clone, Default)]
pub struct SeasonNorms {
    by_season: HashMap<i32, [Option<Moments>; 7]>,
}

impl SeasonNorms {
    pub fn from_rows(rows: &[SeasonRow]) -> Self {
        let mut samples: HashMap<i32, [Vec<f64>; 7]> = HashMap::new();
        for row in rows {
            let slots = samples.entry(row.season()).or_default();
            for stat in Z_STATS {
                if let Some(v) = row.rate(stat) {
                    slots[stat.slot()].push(v);
                }
            }
        }
        let by_season = samples
            .into_iter()
            .map(|(season, slots)| (season, slots.map(|values| Moments::of(&values))))
            .collect();
        Self { by_season }
    }

    pub fn moments(&self, season: i32, stat: ZStat) -> Option<Moments> {
        self.by_season.get(&season)?[stat.slot()]
    }

    /// Zero whenever the value is missing or the season has no spread.
    pub fn z(&self, season: i32, stat: ZStat, value: Option<f64>) -> f64 {
        let (Some(value), Some(m)) = (value, self.moments(season, stat)) else {
            return 0.0;
        };
        if !m.std.is_finite() || m.std == 0.0 {
            return 0.0;
        }
        (value - m.mean) / m.std
    }
}

/// Derives every per-game, shooting, z-score and composite field. The output
/// is sorted by (player_id, season), so each player's history is contiguous.
pub fn derive_table(raw: Vec<RawSeason>) -> Vec<SeasonRow> {
    let mut rows = raw.into_iter().map(SeasonRow::with_rates).collect::<Vec<_>>();
    let norms = SeasonNorms::from_rows(&rows);
    for row in &mut rows {
        row.apply_composites(&norms);
    }
    rows.sort_by_key(|r| (r.player_id(), r.season()));
    rows
}
