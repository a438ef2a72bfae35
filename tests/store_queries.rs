use std::collections::HashSet;

use hoops_career::Store;
use hoops_career::archetype::UNKNOWN_LABEL;
use hoops_career::comps::SHALLOW_CAREER_FLOOR;
use hoops_career::dataset::RawSeason;
use hoops_career::similarity::{SpaceKind, SpaceState};
use hoops_career::synthetic;

const SEASON: i32 = 2025;

fn demo_store() -> Store {
    let roster = synthetic::generate(300, SEASON, 7);
    Store::from_raw(roster.seasons, &roster.bio, SEASON)
}

fn veterans(store: &Store) -> Vec<i64> {
    store
        .players()
        .iter()
        .filter(|p| p.qualifying_seasons >= SHALLOW_CAREER_FLOOR)
        .map(|p| p.player_id)
        .take(40)
        .collect()
}

#[test]
fn stability_comps_exclude_self_and_shallow_careers() {
    let store = demo_store();
    assert!(matches!(
        store.space_state(SpaceKind::StabilityLatest),
        SpaceState::Ready(_)
    ));

    for pid in veterans(&store) {
        let set = store.comps(pid, 3).expect("latest space is ready");
        assert_eq!(set.space, SpaceKind::StabilityLatest);
        assert!(set.comps.len() <= 3);

        let ids = set.comps.iter().map(|c| c.player_id).collect::<HashSet<_>>();
        assert_eq!(ids.len(), set.comps.len(), "duplicate comp for {pid}");
        assert!(!ids.contains(&pid));
        for (idx, comp) in set.comps.iter().enumerate() {
            assert_eq!(comp.similarity_rank, idx + 1);
            assert!(store.roster().qualifying_seasons(comp.player_id) >= SHALLOW_CAREER_FLOOR);
        }
        assert!(set.comps.windows(2).all(|w| w[0].distance <= w[1].distance));
    }
}

#[test]
fn repeated_queries_agree() {
    let store = demo_store();
    let pid = veterans(&store)[0];

    assert_eq!(store.comps(pid, 4), store.comps(pid, 4));
    assert_eq!(store.comps_counting(pid, 4), store.comps_counting(pid, 4));
    assert_eq!(store.label(pid), store.label(pid));
    assert_eq!(store.projection(pid), store.projection(pid));
    assert_eq!(store.forecast(pid), store.forecast(pid));
}

#[test]
fn counting_space_builds_on_first_use() {
    let store = demo_store();
    assert!(matches!(
        store.space_state(SpaceKind::CountingGeometry),
        SpaceState::NotBuilt
    ));

    let pid = veterans(&store)[0];
    let comps = store.comps_counting(pid, 3).expect("counting comps");
    assert!(comps.len() <= 3);
    assert!(comps.iter().all(|c| c.player_id != pid));
    assert!(matches!(
        store.space_state(SpaceKind::CountingGeometry),
        SpaceState::Ready(_)
    ));

    let geometry = store.counting_geometry(pid, 3).expect("geometry");
    assert_eq!(geometry.series.len(), comps.len() + 1);
    let selected = &geometry.series[0];
    assert_eq!(selected.player_id, pid);
    assert_eq!(selected.distance, None);
    assert!(selected.season < SEASON);
    for series in &geometry.series {
        for axis in [
            series.efficiency,
            series.threes,
            series.points,
            series.rebounds,
            series.assists,
            series.steals,
            series.blocks,
            series.turnovers,
        ] {
            assert!((0.0..=1.0).contains(&axis));
        }
    }
    assert!(geometry.series[1..].iter().all(|s| s.distance.is_some()));
}

#[test]
fn radar_leads_with_the_selected_player() {
    let store = demo_store();
    let pid = veterans(&store)[1];
    let comps = store.comps(pid, 3).expect("comps");
    let radar = store.radar(pid, 3).expect("radar");
    assert_eq!(radar.series[0].player_id, pid);
    assert_eq!(radar.series.len(), comps.comps.len() + 1);
}

fn rookie_class(season: i32) -> Vec<RawSeason> {
    (1..=6)
        .map(|pid| RawSeason {
            player_id: pid,
            season,
            player_name: format!("Rookie {pid}"),
            age: Some(20.0),
            gp: Some(12.0),
            min: Some(12.0 * 20.0 + pid as f64 * 10.0),
            fgm: Some(40.0 + pid as f64),
            fga: Some(90.0),
            fg3m: Some(6.0),
            fg3a: Some(20.0),
            ftm: Some(15.0),
            fta: Some(20.0),
            reb: Some(30.0 + pid as f64),
            ast: Some(20.0),
            stl: Some(6.0),
            blk: Some(2.0),
            tov: Some(10.0),
            pts: Some(101.0 + 2.0 * pid as f64),
            ..Default::default()
        })
        .collect()
}

#[test]
fn unavailable_counting_space_is_a_retriable_error() {
    // Only in-progress seasons: nobody has a peak season to sample.
    let store = Store::from_raw(rookie_class(SEASON), &[], SEASON);

    let err = store.comps_counting(1, 3).expect_err("no counting population");
    assert!(err.is_retriable());
    assert!(err.to_string().contains("counting_geometry"));
    assert!(matches!(
        store.space_state(SpaceKind::CountingGeometry),
        SpaceState::Failed(_)
    ));
    // The failure is cached: the second call reports the same error.
    assert_eq!(store.counting_geometry(1, 3).expect_err("still down"), err);

    // Everything outside the counting space keeps answering.
    assert!(store.comps(1, 3).is_ok());
    assert_eq!(store.label(1).label, UNKNOWN_LABEL);
    assert!(store.trajectory(1).is_empty());
    assert_eq!(store.profile(1).map(|p| p.qualifying_seasons), Some(0));
}

#[test]
fn unknown_player_gets_empty_views() {
    let store = demo_store();
    let ghost = 9_999_999;

    assert!(store.profile(ghost).is_none());
    assert!(store.trajectory(ghost).is_empty());
    assert!(store.projection(ghost).is_empty());
    assert!(store.forecast(ghost).is_none());
    assert_eq!(store.label(ghost).label, UNKNOWN_LABEL);
    assert_eq!(store.label(ghost).rationale, None);
    assert!(store.comps(ghost, 3).expect("comps").comps.is_empty());
    assert!(store.comps_counting(ghost, 3).expect("counting").is_empty());
    assert!(store.counting_geometry(ghost, 3).expect("geometry").series.is_empty());
    assert!(store.radar(ghost, 3).expect("radar").series.is_empty());
}

#[test]
fn zero_k_returns_no_comps() {
    let store = demo_store();
    let pid = veterans(&store)[0];
    assert!(store.comps(pid, 0).expect("comps").comps.is_empty());
}

#[test]
fn huge_k_returns_every_eligible_comp_without_panicking() {
    let store = demo_store();
    let pid = veterans(&store)[0];
    let eligible = store
        .players()
        .iter()
        .filter(|p| p.player_id != pid && p.qualifying_seasons >= SHALLOW_CAREER_FLOOR)
        .count();

    let counting = store.comps_counting(pid, usize::MAX).expect("counting comps");
    assert!(counting.len() > 3 && counting.len() <= eligible);
    assert!(counting.iter().enumerate().all(|(i, c)| c.similarity_rank == i + 1));

    let stability = store.comps(pid, usize::MAX).expect("stability comps");
    assert!(stability.comps.len() <= eligible);
    assert!(store.radar(pid, usize::MAX).is_ok());
}
