use hoops_career::Store;
use hoops_career::dataset::{BioRow, RawSeason};
use hoops_career::synthetic;

const SEASON: i32 = 2025;

fn demo_store() -> Store {
    let roster = synthetic::generate(250, SEASON, 11);
    Store::from_raw(roster.seasons, &roster.bio, SEASON)
}

fn wing(player_id: i64, season: i32, gp: f64, pts: f64) -> RawSeason {
    RawSeason {
        player_id,
        season,
        player_name: "Steady Wing".to_string(),
        position: Some("F".to_string()),
        age: Some(29.0 + f64::from(season - 2024)),
        gp: Some(gp),
        min: Some(gp * 34.0),
        fgm: Some(pts * 0.4),
        fga: Some(pts * 0.8),
        fg3m: Some(gp * 2.0),
        fg3a: Some(gp * 5.5),
        ftm: Some(pts * 0.15),
        fta: Some(pts * 0.18),
        reb: Some(gp * 5.0),
        ast: Some(gp * 3.0),
        stl: Some(gp),
        blk: Some(gp * 0.5),
        tov: Some(gp * 2.0),
        pts: Some(pts),
        ..Default::default()
    }
}

#[test]
fn trajectory_rates_multiply_back_to_totals() {
    let store = demo_store();
    let mut checked = 0;
    for profile in store.players().iter().filter(|p| p.qualifying_seasons >= 2).take(25) {
        let points = store.trajectory(profile.player_id);
        assert!(points.windows(2).all(|w| w[0].season < w[1].season));
        assert!(points.iter().all(|p| p.season < SEASON));

        for point in &points {
            let raw = store
                .history(profile.player_id)
                .iter()
                .find(|r| r.season() == point.season)
                .expect("trajectory season has a row");
            if let (Some(rate), Some(gp), Some(total)) = (point.pts_per_game, point.gp, raw.raw.pts) {
                assert!((rate * gp - total).abs() < 1e-6);
                checked += 1;
            }
            if let Some(tags) = &point.annotation {
                assert!(tags.split(' ').count() <= 2, "too many tags: {tags}");
            }
        }
    }
    assert!(checked > 0);
}

#[test]
fn label_summary_counts_every_qualified_player_once() {
    let store = demo_store();
    let summary = store.label_summary();

    let qualified = store
        .players()
        .iter()
        .filter(|p| p.qualifying_seasons > 0)
        .count();
    assert_eq!(summary.total_players, qualified);
    assert_eq!(
        summary.labels.iter().map(|l| l.count).sum::<usize>(),
        summary.total_players
    );
    assert!(summary.labels.windows(2).all(|w| {
        w[0].count > w[1].count || (w[0].count == w[1].count && w[0].label < w[1].label)
    }));

    // Cached: the same summary is handed back.
    assert!(std::ptr::eq(summary, store.label_summary()));
}

#[test]
fn projection_through_the_store() {
    let store = Store::from_raw(vec![wing(1, 2024, 70.0, 1500.0)], &[], SEASON);
    let proj = store.projection(1);

    assert_eq!(proj.len(), 5);
    assert_eq!(proj.first().map(|p| p.season), Some(2025));
    assert_eq!(proj.last().map(|p| p.season), Some(2029));
    let first = proj[0].pts_per_game_pred.expect("pts");
    let last = proj[4].pts_per_game_pred.expect("pts");
    assert!((first - 20.93).abs() < 0.01);
    assert!((last - 18.93).abs() < 0.01);
    assert!(proj.windows(2).all(|w| w[0].gp_pred >= w[1].gp_pred));
}

#[test]
fn forecast_bands_are_ordered_and_memoized() {
    let store = demo_store();
    let mut produced = 0;
    for profile in store.players() {
        let Some(points) = store.forecast(profile.player_id) else {
            continue;
        };
        produced += 1;
        assert_eq!(points.len(), 2);
        assert_eq!(points[0].season, SEASON);
        assert_eq!(points[1].season, SEASON + 1);
        for p in points.iter() {
            assert!(p.p25 <= p.median && p.median <= p.p75);
        }
        let width = |i: usize| points[i].p75 - points[i].p25;
        assert!(width(1) >= width(0));

        let again = store.forecast(profile.player_id).expect("memoized");
        assert!(std::sync::Arc::ptr_eq(&points, &again));
    }
    assert!(produced > 0);
}

#[test]
fn forecast_needs_a_current_season_row() {
    let retired = Store::from_raw(
        vec![wing(1, 2022, 70.0, 1500.0), wing(1, 2023, 68.0, 1400.0)],
        &[],
        SEASON,
    );
    assert!(retired.forecast(1).is_none());

    let active = Store::from_raw(
        vec![
            wing(1, 2023, 70.0, 1500.0),
            wing(1, 2024, 68.0, 1400.0),
            wing(1, 2025, 10.0, 200.0),
        ],
        &[],
        SEASON,
    );
    let points = active.forecast(1).expect("active player forecast");
    assert_eq!(points.len(), 2);
}

#[test]
fn profile_lists_played_seasons() {
    let bio = [BioRow {
        player_id: 1,
        position: Some("Small Forward".to_string()),
        height: Some("6-8".to_string()),
        weight: Some(225.0),
    }];
    let store = Store::from_raw(
        vec![
            wing(1, 2021, 70.0, 1500.0),
            wing(1, 2022, 0.0, 0.0),
            wing(1, 2023, 60.0, 1200.0),
            wing(1, 2025, 5.0, 80.0),
        ],
        &bio,
        SEASON,
    );
    let profile = store.profile(1).expect("profile");
    assert_eq!(profile.name, "Steady Wing");
    assert_eq!(profile.position.as_deref(), Some("Small Forward"));
    assert_eq!(profile.from_year, 2021);
    assert_eq!(profile.to_year, 2025);
    assert_eq!(profile.seasons_played, vec![2021, 2023, 2025]);
    assert_eq!(profile.qualifying_seasons, 2);

    // Seasons without games still appear in the trajectory.
    let seasons = store.trajectory(1).iter().map(|p| p.season).collect::<Vec<_>>();
    assert_eq!(seasons, vec![2021, 2022, 2023]);
}
