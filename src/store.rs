use std::collections::HashMap;
use std::ops::Range;
use std::sync::Arc;

use anyhow::Result;
use once_cell::sync::OnceCell;
use rayon::prelude::*;
use tracing::info;

use crate::archetype::{self, Label, LabelSummary};
use crate::comps::{self, Comp, CompSet, GeometryResponse, RadarResponse};
use crate::config::EngineConfig;
use crate::dataset::{self, BioRow, RawSeason};
use crate::error::QueryError;
use crate::features::{self, SeasonRow};
use crate::forecast::{self, ForecastMemo, ForecastPoint};
use crate::profiles::{PlayerProfile, Roster};
use crate::projection::{self, ProjectionPoint};
use crate::similarity::{LazySpace, SpaceKind, SpaceState};
use crate::trajectory::{self, TrajectoryPoint};

/// The derived season table, its player index, the similarity spaces and the
/// two memo tables. Everything except the lazy spaces and memos is fixed at
/// construction.
pub struct Store {
    current_season: i32,
    default_k: usize,
    rows: Vec<SeasonRow>,
    spans: HashMap<i64, Range<usize>>,
    roster: Roster,
    latest: LazySpace,
    legacy: LazySpace,
    counting: LazySpace,
    label_summary: OnceCell<LabelSummary>,
    forecasts: ForecastMemo,
}

impl Store {
    pub fn load(config: &EngineConfig) -> Result<Self> {
        let raw = dataset::load_season_table(&config.seasons_path)?;
        let bio = dataset::load_bio_table(&config.bio_path);
        Ok(Self::from_raw(raw, &bio, config.current_season).with_default_k(config.default_k))
    }

    pub fn from_raw(raw: Vec<RawSeason>, bio: &[BioRow], current_season: i32) -> Self {
        let rows = features::derive_table(raw);
        let mut spans: HashMap<i64, Range<usize>> = HashMap::new();
        for (idx, row) in rows.iter().enumerate() {
            spans
                .entry(row.player_id())
                .and_modify(|span| span.end = idx + 1)
                .or_insert(idx..idx + 1);
        }
        let roster = Roster::build(&rows, bio, current_season);
        info!(
            rows = rows.len(),
            players = roster.len(),
            current_season,
            "season table derived"
        );

        let store = Self {
            current_season,
            default_k: crate::config::DEFAULT_K,
            rows,
            spans,
            roster,
            latest: LazySpace::new(SpaceKind::StabilityLatest),
            legacy: LazySpace::new(SpaceKind::StabilityLegacy),
            counting: LazySpace::new(SpaceKind::CountingGeometry),
            label_summary: OnceCell::new(),
            forecasts: ForecastMemo::new(),
        };
        // The default comps space is fitted up front; the others on first use.
        store.latest.get_or_build(&store.rows, current_season);
        store
    }

    pub fn with_default_k(mut self, k: usize) -> Self {
        self.default_k = k;
        self
    }

    pub fn current_season(&self) -> i32 {
        self.current_season
    }

    pub fn default_k(&self) -> usize {
        self.default_k
    }

    pub fn rows(&self) -> &[SeasonRow] {
        &self.rows
    }

    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    /// All season rows for one player, ascending by season.
    pub fn history(&self, player_id: i64) -> &[SeasonRow] {
        self.spans
            .get(&player_id)
            .map(|span| &self.rows[span.clone()])
            .unwrap_or(&[])
    }

    pub fn latest_qualifying(&self, player_id: i64) -> Option<&SeasonRow> {
        self.history(player_id)
            .iter()
            .rev()
            .find(|r| r.is_qualifying(self.current_season))
    }

    /// Build state of a space without triggering a build.
    pub fn space_state(&self, kind: SpaceKind) -> SpaceState<'_> {
        self.space(kind).state()
    }

    fn space(&self, kind: SpaceKind) -> &LazySpace {
        match kind {
            SpaceKind::StabilityLatest => &self.latest,
            SpaceKind::StabilityLegacy => &self.legacy,
            SpaceKind::CountingGeometry => &self.counting,
        }
    }

    fn ensure(&self, kind: SpaceKind) -> SpaceState<'_> {
        self.space(kind).get_or_build(&self.rows, self.current_season)
    }

    pub fn players(&self) -> &[PlayerProfile] {
        self.roster.profiles()
    }

    pub fn profile(&self, player_id: i64) -> Option<&PlayerProfile> {
        self.roster.get(player_id)
    }

    pub fn trajectory(&self, player_id: i64) -> Vec<TrajectoryPoint> {
        trajectory::trajectory(self.history(player_id), self.current_season)
    }

    pub fn comps(&self, player_id: i64, k: usize) -> Result<CompSet, QueryError> {
        let primary = self.ensure(SpaceKind::StabilityLatest);
        let fallback = match primary {
            SpaceState::Ready(_) => SpaceState::NotBuilt,
            _ => self.ensure(SpaceKind::StabilityLegacy),
        };
        comps::stability_comps(primary, fallback, &self.roster, player_id, k)
    }

    pub fn comps_counting(&self, player_id: i64, k: usize) -> Result<Vec<Comp>, QueryError> {
        let space = self
            .ensure(SpaceKind::CountingGeometry)
            .into_result(SpaceKind::CountingGeometry)?;
        Ok(comps::counting_comps(
            space,
            &self.roster,
            player_id,
            self.latest_qualifying(player_id),
            k,
        ))
    }

    pub fn counting_geometry(&self, player_id: i64, k: usize) -> Result<GeometryResponse, QueryError> {
        let space = self
            .ensure(SpaceKind::CountingGeometry)
            .into_result(SpaceKind::CountingGeometry)?;
        Ok(comps::counting_geometry(
            space,
            &self.roster,
            player_id,
            self.latest_qualifying(player_id),
            k,
        ))
    }

    pub fn label(&self, player_id: i64) -> Label {
        archetype::label_history(self.history(player_id), self.current_season)
    }

    /// Computed on first call and cached for the life of the store.
    pub fn label_summary(&self) -> &LabelSummary {
        self.label_summary.get_or_init(|| {
            let labels = self
                .roster
                .profiles()
                .par_iter()
                .filter(|p| p.qualifying_seasons > 0)
                .map(|p| self.label(p.player_id).label)
                .collect::<Vec<_>>();
            let summary = archetype::summarize(labels.iter().map(String::as_str));
            info!(players = summary.total_players, labels = summary.labels.len(), "label summary cached");
            summary
        })
    }

    pub fn projection(&self, player_id: i64) -> Vec<ProjectionPoint> {
        projection::project(self.history(player_id), self.current_season)
    }

    pub fn forecast(&self, player_id: i64) -> Option<Arc<Vec<ForecastPoint>>> {
        self.forecasts.get_or_compute(player_id, || {
            forecast::forecast(self.history(player_id), self.current_season)
        })
    }

    pub fn radar(&self, player_id: i64, k: usize) -> Result<RadarResponse, QueryError> {
        let set = self.comps(player_id, k)?;
        let ids = std::iter::once(player_id)
            .chain(set.comps.iter().map(|c| c.player_id))
            .collect::<Vec<_>>();
        Ok(comps::radar(&self.roster, &ids, |pid| self.latest_qualifying(pid)))
    }
}
