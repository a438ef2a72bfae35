use std::collections::HashSet;

use ndarray::Array1;
use serde::Serialize;

use crate::error::QueryError;
use crate::features::SeasonRow;
use crate::profiles::Roster;
use crate::similarity::{SimilaritySpace, SpaceKind, SpaceState};

/// Candidates need this many qualifying seasons to be offered as comps.
pub const SHALLOW_CAREER_FLOOR: usize = 3;
pub const STABILITY_OVERFETCH: usize = 20;
pub const COUNTING_OVERFETCH: usize = 50;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Comp {
    pub player_id: i64,
    pub name: String,
    pub distance: f64,
    pub similarity_rank: usize,
}

/// Comps plus the space that produced them. The latest-season and legacy
/// stability spaces sample differently, so their distances are not on the
/// same footing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompSet {
    pub space: SpaceKind,
    pub comps: Vec<Comp>,
}

/// Where a comps search starts from.
#[derive(Debug, Clone, Copy)]
pub enum QueryPoint<'a> {
    /// The player's own row in the space.
    Sampled,
    /// A season outside the space's sample, placed with the space's scaler.
    Season(&'a SeasonRow),
}

fn query_vector(space: &SimilaritySpace, player_id: i64, from: QueryPoint<'_>) -> Option<Array1<f64>> {
    match from {
        QueryPoint::Sampled => space
            .query_row(player_id)
            .map(|row| space.point(row).to_owned()),
        QueryPoint::Season(row) => space.standardize(row),
    }
}

/// Up to `k` nearest players, excluding the query player and shallow careers.
/// A player sampled at several seasons counts once, at its closest season.
pub fn nearest_comps(
    space: &SimilaritySpace,
    roster: &Roster,
    player_id: i64,
    from: QueryPoint<'_>,
    k: usize,
    overfetch: usize,
) -> Vec<Comp> {
    if k == 0 || space.is_empty() {
        return Vec::new();
    }
    let Some(query) = query_vector(space, player_id, from) else {
        return Vec::new();
    };

    let mut seen = HashSet::new();
    let mut out = Vec::with_capacity(k.min(space.len()));
    for neighbor in space.neighbors_near(query.view(), k.saturating_add(overfetch)) {
        let pid = space.player_at(neighbor.row);
        if pid == player_id || roster.qualifying_seasons(pid) < SHALLOW_CAREER_FLOOR {
            continue;
        }
        if !seen.insert(pid) {
            continue;
        }
        out.push(Comp {
            player_id: pid,
            name: roster.name_of(pid).to_string(),
            distance: neighbor.distance,
            similarity_rank: out.len() + 1,
        });
        if out.len() >= k {
            break;
        }
    }
    out
}

/// Counting comps searched from the player's latest qualifying season, which
/// need not be the peak season the player occupies in the space.
pub fn counting_comps(
    space: &SimilaritySpace,
    roster: &Roster,
    player_id: i64,
    latest: Option<&SeasonRow>,
    k: usize,
) -> Vec<Comp> {
    match latest {
        Some(row) => nearest_comps(
            space,
            roster,
            player_id,
            QueryPoint::Season(row),
            k,
            COUNTING_OVERFETCH,
        ),
        None => Vec::new(),
    }
}

/// Comps from the latest-season space, or from the legacy space when the
/// latest one is unavailable. Errors only when neither space is usable.
pub fn stability_comps(
    primary: SpaceState<'_>,
    fallback: SpaceState<'_>,
    roster: &Roster,
    player_id: i64,
    k: usize,
) -> Result<CompSet, QueryError> {
    let (space, kind) = match fallback.ready() {
        Some(legacy) if primary.ready().is_none() => (legacy, SpaceKind::StabilityLegacy),
        _ => (
            primary.into_result(SpaceKind::StabilityLatest)?,
            SpaceKind::StabilityLatest,
        ),
    };
    Ok(CompSet {
        space: kind,
        comps: nearest_comps(space, roster, player_id, QueryPoint::Sampled, k, STABILITY_OVERFETCH),
    })
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeometrySeries {
    pub player_id: i64,
    pub name: String,
    /// Peak season the axes were taken from.
    pub season: i32,
    pub efficiency: f64,
    pub threes: f64,
    pub points: f64,
    pub rebounds: f64,
    pub assists: f64,
    pub steals: f64,
    pub blocks: f64,
    pub turnovers: f64,
    pub distance: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct GeometryResponse {
    pub series: Vec<GeometrySeries>,
}

fn geometry_series(
    space: &SimilaritySpace,
    roster: &Roster,
    player_id: i64,
    distance: Option<f64>,
) -> Option<GeometrySeries> {
    let row = space.query_row(player_id)?;
    let g = space.geometry(row);
    let [efficiency, threes, points, rebounds, assists, steals, blocks, turnovers] =
        <[f64; 8]>::try_from(g).ok()?;
    Some(GeometrySeries {
        player_id,
        name: roster.name_of(player_id).to_string(),
        season: space.season_at(row),
        efficiency,
        threes,
        points,
        rebounds,
        assists,
        steals,
        blocks,
        turnovers,
        distance,
    })
}

/// The player's eight-axis peak-season profile followed by its counting comps.
pub fn counting_geometry(
    space: &SimilaritySpace,
    roster: &Roster,
    player_id: i64,
    latest: Option<&SeasonRow>,
    k: usize,
) -> GeometryResponse {
    let Some(selected) = geometry_series(space, roster, player_id, None) else {
        return GeometryResponse::default();
    };
    let comps = counting_comps(space, roster, player_id, latest, k);
    let mut series = Vec::with_capacity(comps.len() + 1);
    series.push(selected);
    series.extend(
        comps
            .iter()
            .filter_map(|c| geometry_series(space, roster, c.player_id, Some(c.distance))),
    );
    GeometryResponse { series }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RadarSeries {
    pub player_id: i64,
    pub name: String,
    pub pts_per_game: Option<f64>,
    pub ast_per_game: Option<f64>,
    pub reb_per_game: Option<f64>,
    pub fg3_per_game: Option<f64>,
    pub ts_pct: Option<f64>,
    pub availability: Option<f64>,
    pub value_score: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct RadarResponse {
    pub series: Vec<RadarSeries>,
}

impl RadarSeries {
    pub fn from_row(row: &SeasonRow, name: &str) -> Self {
        Self {
            player_id: row.player_id(),
            name: name.to_string(),
            pts_per_game: row.pts_per_game,
            ast_per_game: row.ast_per_game,
            reb_per_game: row.reb_per_game,
            fg3_per_game: row.fg3_per_game,
            ts_pct: row.ts_pct,
            availability: row.availability,
            value_score: row.value_score,
        }
    }
}

/// Latest qualifying snapshot for each id; ids without one are skipped.
pub fn radar<'a, F>(roster: &Roster, ids: &[i64], latest_qualifying: F) -> RadarResponse
where
    F: Fn(i64) -> Option<&'a SeasonRow>,
{
    let series = ids
        .iter()
        .filter_map(|pid| {
            latest_qualifying(*pid).map(|row| RadarSeries::from_row(row, roster.name_of(*pid)))
        })
        .collect();
    RadarResponse { series }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::RawSeason;
    use crate::error::SpaceError;
    use crate::features::derive_table;
    use crate::similarity::LazySpace;

    fn season(player_id: i64, season: i32, pts: f64) -> RawSeason {
        RawSeason {
            player_id,
            season,
            player_name: format!("P{player_id}"),
            gp: Some(60.0),
            min: Some(60.0 * 28.0),
            fgm: Some(pts * 24.0),
            fga: Some(pts * 51.0),
            fg3m: Some(60.0),
            ftm: Some(pts * 9.0),
            fta: Some(pts * 12.0),
            reb: Some(240.0),
            ast: Some(180.0),
            stl: Some(60.0),
            blk: Some(30.0),
            tov: Some(120.0),
            pts: Some(pts * 60.0),
            ..Default::default()
        }
    }

    fn league() -> Vec<SeasonRow> {
        let mut raw = Vec::new();
        for pid in 1..=6 {
            for year in 2018..=2021 {
                raw.push(season(pid, year, 8.0 + pid as f64 * 2.0 + (year - 2018) as f64));
            }
        }
        // Two seasons only: below the floor.
        raw.push(season(7, 2020, 14.0));
        raw.push(season(7, 2021, 15.0));
        derive_table(raw)
    }

    fn latest(rows: &[SeasonRow], player_id: i64) -> Option<&SeasonRow> {
        rows.iter()
            .rev()
            .find(|r| r.player_id() == player_id && r.is_qualifying(2025))
    }

    /// Fixed shot volume, so true shooting moves linearly with points.
    fn line(player_id: i64, season_year: i32, mpg: f64, pts: f64) -> RawSeason {
        RawSeason {
            min: Some(60.0 * mpg),
            fgm: Some(500.0),
            fga: Some(1000.0),
            ftm: Some(200.0),
            fta: Some(250.0),
            ..season(player_id, season_year, pts)
        }
    }

    #[test]
    fn comps_exclude_self_and_shallow_careers() {
        let rows = league();
        let roster = Roster::build(&rows, &[], 2025);
        let space = SimilaritySpace::build(SpaceKind::StabilityLatest, &rows, 2025).unwrap();
        let comps = nearest_comps(&space, &roster, 3, QueryPoint::Sampled, 10, STABILITY_OVERFETCH);
        assert_eq!(comps.len(), 5);
        assert!(comps.iter().all(|c| c.player_id != 3 && c.player_id != 7));
        for (i, pair) in comps.windows(2).enumerate() {
            assert!(pair[0].distance <= pair[1].distance);
            assert_eq!(pair[0].similarity_rank, i + 1);
        }
        assert!(nearest_comps(&space, &roster, 3, QueryPoint::Sampled, 0, STABILITY_OVERFETCH).is_empty());
        assert!(nearest_comps(&space, &roster, 999, QueryPoint::Sampled, 3, STABILITY_OVERFETCH).is_empty());
    }

    #[test]
    fn legacy_space_dedups_players() {
        let rows = league();
        let roster = Roster::build(&rows, &[], 2025);
        let space = SimilaritySpace::build(SpaceKind::StabilityLegacy, &rows, 2025).unwrap();
        let comps = nearest_comps(&space, &roster, 1, QueryPoint::Sampled, 4, STABILITY_OVERFETCH);
        let mut ids = comps.iter().map(|c| c.player_id).collect::<Vec<_>>();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), comps.len());
    }

    #[test]
    fn stability_falls_back_and_reports_space() {
        let rows = league();
        let roster = Roster::build(&rows, &[], 2025);
        let legacy = LazySpace::new(SpaceKind::StabilityLegacy);
        legacy.get_or_build(&rows, 2025);
        let err = SpaceError::EmptyPopulation { space: "stability" };

        let set = stability_comps(SpaceState::Failed(&err), legacy.state(), &roster, 2, 3).unwrap();
        assert_eq!(set.space, SpaceKind::StabilityLegacy);
        assert_eq!(set.comps.len(), 3);

        let down = stability_comps(SpaceState::Failed(&err), SpaceState::Failed(&err), &roster, 2, 3)
            .unwrap_err();
        assert!(down.is_retriable());
    }

    #[test]
    fn geometry_leads_with_selected_player() {
        let rows = league();
        let roster = Roster::build(&rows, &[], 2025);
        let space = SimilaritySpace::build(SpaceKind::CountingGeometry, &rows, 2025).unwrap();
        let geo = counting_geometry(&space, &roster, 4, latest(&rows, 4), 2);
        assert_eq!(geo.series.len(), 3);
        assert_eq!(geo.series[0].player_id, 4);
        assert_eq!(geo.series[0].distance, None);
        assert!(geo.series[1..].iter().all(|s| s.distance.is_some()));
        assert!(counting_geometry(&space, &roster, 999, None, 2).series.is_empty());
    }

    #[test]
    fn oversized_k_is_capped_by_the_population() {
        let rows = league();
        let roster = Roster::build(&rows, &[], 2025);
        let space = SimilaritySpace::build(SpaceKind::StabilityLatest, &rows, 2025).unwrap();
        let comps = nearest_comps(&space, &roster, 3, QueryPoint::Sampled, usize::MAX, STABILITY_OVERFETCH);
        assert!(comps.len() < space.len());
        assert_eq!(comps.len(), 5);

        let counting = SimilaritySpace::build(SpaceKind::CountingGeometry, &rows, 2025).unwrap();
        let comps = counting_comps(&counting, &roster, 3, latest(&rows, 3), usize::MAX);
        assert_eq!(comps.len(), 5);
    }

    #[test]
    fn counting_comps_search_from_the_latest_season() {
        // Only scoring varies, so distance grows with the points gap.
        let rows = derive_table(vec![
            line(1, 2020, 36.0, 25.0),
            line(1, 2021, 20.0, 18.0),
            line(1, 2023, 30.0, 12.0),
            line(2, 2019, 36.0, 25.0),
            line(2, 2020, 25.0, 20.0),
            line(2, 2021, 22.0, 19.0),
            line(3, 2021, 34.0, 12.0),
            line(3, 2022, 20.0, 10.0),
            line(3, 2023, 18.0, 9.0),
            line(4, 2019, 33.0, 17.0),
            line(4, 2020, 20.0, 15.0),
            line(4, 2021, 18.0, 14.0),
        ]);
        let roster = Roster::build(&rows, &[], 2025);
        let space = SimilaritySpace::build(SpaceKind::CountingGeometry, &rows, 2025).unwrap();

        // Player 1 sits in the space at its 2020 peak, level with player 2.
        assert_eq!(space.season_at(space.query_row(1).unwrap()), 2020);

        let comps = counting_comps(&space, &roster, 1, latest(&rows, 1), 3);
        let ids = comps.iter().map(|c| c.player_id).collect::<Vec<_>>();
        assert_eq!(ids, vec![3, 4, 2]);
        assert!(comps[0].distance < 1e-9);
        assert!(comps[2].distance > 0.0);

        let geo = counting_geometry(&space, &roster, 1, latest(&rows, 1), 3);
        assert_eq!(geo.series[0].season, 2020);
        assert_eq!(geo.series[1].player_id, 3);

        assert!(counting_comps(&space, &roster, 1, None, 3).is_empty());
    }
}
