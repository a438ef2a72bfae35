use std::collections::HashMap;

use ndarray::{Array1, Array2, ArrayView1, Axis};
use once_cell::sync::OnceCell;
use serde::Serialize;
use tracing::{info, warn};

use crate::error::{QueryError, SpaceError};
use crate::features::SeasonRow;

/// Games-played floor used when picking each player's peak season.
pub const PEAK_MIN_GAMES: f64 = 20.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Feature {
    PtsPer75,
    AstPer75,
    RebPer75,
    TsPct,
    Mpg,
    Fg3PerGame,
    PtsPerGame,
    RebPerGame,
    AstPerGame,
    StlPerGame,
    BlkPerGame,
    TovPerGame,
}

impl Feature {
    pub fn name(self) -> &'static str {
        match self {
            Feature::PtsPer75 => "pts_per75",
            Feature::AstPer75 => "ast_per75",
            Feature::RebPer75 => "reb_per75",
            Feature::TsPct => "ts_pct",
            Feature::Mpg => "mpg",
            Feature::Fg3PerGame => "fg3_per_game",
            Feature::PtsPerGame => "pts_per_game",
            Feature::RebPerGame => "reb_per_game",
            Feature::AstPerGame => "ast_per_game",
            Feature::StlPerGame => "stl_per_game",
            Feature::BlkPerGame => "blk_per_game",
            Feature::TovPerGame => "tov_per_game",
        }
    }

    pub fn value(self, row: &SeasonRow) -> Option<f64> {
        match self {
            Feature::PtsPer75 => row.pts_per75,
            Feature::AstPer75 => row.ast_per75,
            Feature::RebPer75 => row.reb_per75,
            Feature::TsPct => row.ts_pct,
            Feature::Mpg => row.mpg,
            Feature::Fg3PerGame => row.fg3_per_game,
            Feature::PtsPerGame => row.pts_per_game,
            Feature::RebPerGame => row.reb_per_game,
            Feature::AstPerGame => row.ast_per_game,
            Feature::StlPerGame => row.stl_per_game,
            Feature::BlkPerGame => row.blk_per_game,
            Feature::TovPerGame => row.tov_per_game,
        }
    }
}

pub const STABILITY_FEATURES: [Feature; 5] = [
    Feature::PtsPer75,
    Feature::AstPer75,
    Feature::RebPer75,
    Feature::TsPct,
    Feature::Mpg,
];

/// Eight counting axes, in the order the geometry view reports them.
pub const COUNTING_FEATURES: [Feature; 8] = [
    Feature::TsPct,
    Feature::Fg3PerGame,
    Feature::PtsPerGame,
    Feature::RebPerGame,
    Feature::AstPerGame,
    Feature::StlPerGame,
    Feature::BlkPerGame,
    Feature::TovPerGame,
];

pub const GEOMETRY_AXES: [&str; 8] = [
    "efficiency",
    "threes",
    "points",
    "rebounds",
    "assists",
    "steals",
    "blocks",
    "turnovers",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SpaceKind {
    /// Latest complete season per player.
    #[serde(rename = "stability")]
    StabilityLatest,
    /// Every complete season; consulted only when the latest space is down.
    StabilityLegacy,
    CountingGeometry,
}

impl SpaceKind {
    pub fn name(self) -> &'static str {
        match self {
            SpaceKind::StabilityLatest => "stability",
            SpaceKind::StabilityLegacy => "stability_legacy",
            SpaceKind::CountingGeometry => "counting_geometry",
        }
    }

    pub fn features(self) -> &'static [Feature] {
        match self {
            SpaceKind::StabilityLatest | SpaceKind::StabilityLegacy => &STABILITY_FEATURES,
            SpaceKind::CountingGeometry => &COUNTING_FEATURES,
        }
    }

    /// Rows the scaler is fitted on. The latest-season space is scaled by the
    /// all-seasons population so both stability spaces share one yardstick.
    pub fn scaling(self, current_season: i32) -> SamplingRule {
        match self {
            SpaceKind::StabilityLatest => SamplingRule::AllComplete,
            other => other.sampling(current_season),
        }
    }

    pub fn sampling(self, current_season: i32) -> SamplingRule {
        match self {
            SpaceKind::StabilityLatest => SamplingRule::LatestComplete,
            SpaceKind::StabilityLegacy => SamplingRule::AllComplete,
            SpaceKind::CountingGeometry => SamplingRule::PeakMinutes {
                before_season: current_season,
                min_games: PEAK_MIN_GAMES,
            },
        }
    }
}

/// Which of a player's rows enter a space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SamplingRule {
    /// Most recent season whose features are all defined.
    LatestComplete,
    /// Every season whose features are all defined.
    AllComplete,
    /// Highest minutes-per-game season before `before_season` with games
    /// played, preferring seasons with at least `min_games`. Missing feature
    /// values are filled with zero.
    PeakMinutes { before_season: i32, min_games: f64 },
}

impl SamplingRule {
    /// Picks rows from one player's season-sorted history.
    fn select<'a>(&self, history: &[&'a SeasonRow], features: &[Feature]) -> Vec<&'a SeasonRow> {
        let complete = |r: &SeasonRow| features.iter().all(|f| f.value(r).is_some());
        match *self {
            SamplingRule::LatestComplete => history
                .iter()
                .rev()
                .find(|r| complete(**r))
                .copied()
                .into_iter()
                .collect(),
            SamplingRule::AllComplete => history.iter().filter(|r| complete(**r)).copied().collect(),
            SamplingRule::PeakMinutes {
                before_season,
                min_games,
            } => {
                let eligible = history
                    .iter()
                    .filter(|r| r.is_qualifying(before_season))
                    .copied()
                    .collect::<Vec<_>>();
                let sized = eligible
                    .iter()
                    .filter(|r| r.games() >= min_games)
                    .copied()
                    .collect::<Vec<_>>();
                let pool = if sized.is_empty() { eligible } else { sized };
                peak_by_minutes(&pool).into_iter().collect()
            }
        }
    }

    fn fills_missing(&self) -> bool {
        matches!(self, SamplingRule::PeakMinutes { .. })
    }
}

/// Earliest season among those tied for the highest minutes per game.
fn peak_by_minutes<'a>(pool: &[&'a SeasonRow]) -> Option<&'a SeasonRow> {
    let mut best: Option<&'a SeasonRow> = None;
    for row in pool {
        let mpg = row.mpg.unwrap_or(0.0);
        match best {
            Some(b) if b.mpg.unwrap_or(0.0) >= mpg => {}
            _ => best = Some(*row),
        }
    }
    best
}

/// Per-column mean and population standard deviation; constant columns keep
/// a scale of one.
#[derive(Debug, Clone, PartialEq)]
pub struct StandardScaler {
    pub mean: Array1<f64>,
    pub scale: Array1<f64>,
}

impl StandardScaler {
    pub fn fit(x: &Array2<f64>) -> Self {
        let n = x.nrows().max(1) as f64;
        let mean = x.sum_axis(Axis(0)) / n;
        let scale = x
            .axis_iter(Axis(1))
            .zip(mean.iter())
            .map(|(col, m)| {
                let var = col.iter().map(|v| (v - m).powi(2)).sum::<f64>() / n;
                let std = var.sqrt();
                if std > 0.0 && std.is_finite() { std } else { 1.0 }
            })
            .collect::<Array1<f64>>();
        Self { mean, scale }
    }

    pub fn transform(&self, x: &Array2<f64>) -> Array2<f64> {
        (x - &self.mean) / &self.scale
    }

    pub fn transform_row(&self, row: ArrayView1<f64>) -> Array1<f64> {
        (&row - &self.mean) / &self.scale
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    pub row: usize,
    pub distance: f64,
}

/// Exhaustive Euclidean search; populations are a few thousand rows.
#[derive(Debug, Clone)]
pub struct NeighborIndex {
    points: Array2<f64>,
}

impl NeighborIndex {
    pub fn new(points: Array2<f64>) -> Self {
        Self { points }
    }

    pub fn len(&self) -> usize {
        self.points.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.points.nrows() == 0
    }

    pub fn point(&self, row: usize) -> ArrayView1<'_, f64> {
        self.points.row(row)
    }

    /// The `n` closest rows ordered by (distance, row index).
    pub fn kneighbors(&self, query: ArrayView1<f64>, n: usize) -> Vec<Neighbor> {
        let mut all = self
            .points
            .outer_iter()
            .enumerate()
            .map(|(row, p)| {
                let distance = p
                    .iter()
                    .zip(query.iter())
                    .map(|(a, b)| (a - b).powi(2))
                    .sum::<f64>()
                    .sqrt();
                Neighbor { row, distance }
            })
            .collect::<Vec<_>>();
        all.sort_by(|a, b| a.distance.total_cmp(&b.distance).then(a.row.cmp(&b.row)));
        all.truncate(n);
        all
    }
}

/// A fitted scaler plus neighbour index over one row per sampled season.
#[derive(Debug, Clone)]
pub struct SimilaritySpace {
    kind: SpaceKind,
    fills_missing: bool,
    scaler: StandardScaler,
    index: NeighborIndex,
    player_ids: Vec<i64>,
    seasons: Vec<i32>,
    rows_by_player: HashMap<i64, Vec<usize>>,
}

/// Applies `rule` to every player; `rows` must be grouped by player and
/// sorted by season within a player.
fn sample<'a>(rows: &'a [SeasonRow], rule: SamplingRule, features: &[Feature]) -> Vec<&'a SeasonRow> {
    let mut sampled = Vec::new();
    for history in rows.chunk_by(|a, b| a.player_id() == b.player_id()) {
        let history = history.iter().collect::<Vec<_>>();
        sampled.extend(rule.select(&history, features));
    }
    sampled
}

fn feature_matrix(kind: SpaceKind, sampled: &[&SeasonRow], fill: bool) -> Result<Array2<f64>, SpaceError> {
    let features = kind.features();
    let mut raw = Array2::<f64>::zeros((sampled.len(), features.len()));
    for (i, row) in sampled.iter().enumerate() {
        for (j, feature) in features.iter().enumerate() {
            let value = match feature.value(row) {
                Some(v) => v,
                None if fill => 0.0,
                None => f64::NAN,
            };
            if !value.is_finite() {
                return Err(SpaceError::NonFinite {
                    space: kind.name(),
                    player_id: row.player_id(),
                    feature: feature.name(),
                });
            }
            raw[[i, j]] = value;
        }
    }
    Ok(raw)
}

impl SimilaritySpace {
    /// `rows` must be grouped by player and sorted by season within a player.
    pub fn build(kind: SpaceKind, rows: &[SeasonRow], current_season: i32) -> Result<Self, SpaceError> {
        let features = kind.features();
        let rule = kind.sampling(current_season);

        let sampled = sample(rows, rule, features);
        if sampled.is_empty() {
            return Err(SpaceError::EmptyPopulation { space: kind.name() });
        }
        let raw = feature_matrix(kind, &sampled, rule.fills_missing())?;

        let fit_rule = kind.scaling(current_season);
        let scaler = if fit_rule == rule {
            StandardScaler::fit(&raw)
        } else {
            let population = sample(rows, fit_rule, features);
            StandardScaler::fit(&feature_matrix(kind, &population, fit_rule.fills_missing())?)
        };
        let index = NeighborIndex::new(scaler.transform(&raw));
        let player_ids = sampled.iter().map(|r| r.player_id()).collect::<Vec<_>>();
        let seasons = sampled.iter().map(|r| r.season()).collect::<Vec<_>>();
        let mut rows_by_player: HashMap<i64, Vec<usize>> = HashMap::new();
        for (idx, pid) in player_ids.iter().enumerate() {
            rows_by_player.entry(*pid).or_default().push(idx);
        }

        info!(
            space = kind.name(),
            rows = sampled.len(),
            players = rows_by_player.len(),
            features = features.len(),
            "similarity space built"
        );
        Ok(Self {
            kind,
            fills_missing: rule.fills_missing(),
            scaler,
            index,
            player_ids,
            seasons,
            rows_by_player,
        })
    }

    pub fn kind(&self) -> SpaceKind {
        self.kind
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn scaler(&self) -> &StandardScaler {
        &self.scaler
    }

    /// The row used when this player is the query: its latest sampled season.
    pub fn query_row(&self, player_id: i64) -> Option<usize> {
        self.rows_by_player.get(&player_id)?.last().copied()
    }

    pub fn player_at(&self, row: usize) -> i64 {
        self.player_ids[row]
    }

    pub fn season_at(&self, row: usize) -> i32 {
        self.seasons[row]
    }

    /// Standardized feature vector of an indexed row.
    pub fn point(&self, row: usize) -> ArrayView1<'_, f64> {
        self.index.point(row)
    }

    /// Places any season in this space with the fitted scaler. Missing
    /// features are zero-filled only where the space's sampling fills them.
    pub fn standardize(&self, row: &SeasonRow) -> Option<Array1<f64>> {
        let raw = self
            .kind
            .features()
            .iter()
            .map(|f| match f.value(row) {
                Some(v) => Some(v),
                None if self.fills_missing => Some(0.0),
                None => None,
            })
            .collect::<Option<Array1<f64>>>()?;
        Some(self.scaler.transform_row(raw.view()))
    }

    pub fn neighbors_near(&self, query: ArrayView1<f64>, n: usize) -> Vec<Neighbor> {
        self.index.kneighbors(query, n.min(self.len()))
    }

    /// Logistic squash of the standardized vector, one value per axis in (0, 1).
    pub fn geometry(&self, row: usize) -> Vec<f64> {
        self.index
            .point(row)
            .iter()
            .map(|z| 1.0 / (1.0 + (-z).exp()))
            .collect()
    }
}

/// Build state of one lazily fitted space.
#[derive(Debug, Clone, Copy)]
pub enum SpaceState<'a> {
    NotBuilt,
    Ready(&'a SimilaritySpace),
    Failed(&'a SpaceError),
}

impl<'a> SpaceState<'a> {
    pub fn ready(self) -> Option<&'a SimilaritySpace> {
        match self {
            SpaceState::Ready(space) => Some(space),
            _ => None,
        }
    }

    pub fn into_result(self, kind: SpaceKind) -> Result<&'a SimilaritySpace, QueryError> {
        match self {
            SpaceState::Ready(space) => Ok(space),
            SpaceState::Failed(err) => Err(QueryError::unavailable(kind.name(), err)),
            SpaceState::NotBuilt => Err(QueryError::SpaceUnavailable {
                space: kind.name(),
                reason: "not built".to_string(),
            }),
        }
    }
}

/// A space that is fitted at most once. A failed build is remembered and
/// returned to every later caller; it is never retried within the process.
#[derive(Debug)]
pub struct LazySpace {
    kind: SpaceKind,
    cell: OnceCell<Result<SimilaritySpace, SpaceError>>,
}

impl LazySpace {
    pub fn new(kind: SpaceKind) -> Self {
        Self {
            kind,
            cell: OnceCell::new(),
        }
    }

    pub fn kind(&self) -> SpaceKind {
        self.kind
    }

    pub fn state(&self) -> SpaceState<'_> {
        match self.cell.get() {
            None => SpaceState::NotBuilt,
            Some(Ok(space)) => SpaceState::Ready(space),
            Some(Err(err)) => SpaceState::Failed(err),
        }
    }

    pub fn get_or_build(&self, rows: &[SeasonRow], current_season: i32) -> SpaceState<'_> {
        let kind = self.kind;
        self.cell.get_or_init(|| {
            let built = SimilaritySpace::build(kind, rows, current_season);
            if let Err(err) = &built {
                warn!(space = kind.name(), error = %err, "similarity space build failed");
            }
            built
        });
        self.state()
    }
}
