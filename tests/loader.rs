use std::fs;
use std::path::PathBuf;

use hoops_career::Store;
use hoops_career::config::EngineConfig;
use hoops_career::dataset::{load_bio_table, load_season_table};
use hoops_career::error::LoadError;

const HEADER: &str = "player_id,player_name,season_id,team_abbreviation,position,player_age,gp,min,fgm,fga,fg3m,fg3a,ftm,fta,oreb,dreb,reb,ast,stl,blk,tov,pf,pts";

fn season_line(pid: i64, name: &str, season_id: &str, team: &str, gp: u32, pts: u32) -> String {
    format!(
        "{pid},{name},{season_id},{team},G,25,{gp},{min},{fgm},{fga},{fg3m},{fg3a},{ftm},{fta},20,80,100,150,40,10,60,90,{pts}",
        min = gp * 30,
        fgm = pts * 2 / 5,
        fga = pts * 4 / 5,
        fg3m = gp,
        fg3a = gp * 3,
        ftm = pts / 10,
        fta = pts / 8,
    )
}

fn write_csv(dir: &tempfile::TempDir, name: &str, lines: &[String]) -> PathBuf {
    let path = dir.path().join(name);
    let mut body = lines.join("\n");
    body.push('\n');
    fs::write(&path, body).expect("write fixture");
    path
}

#[test]
fn season_id_is_accepted_and_stints_are_merged() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = write_csv(
        &dir,
        "seasons.csv",
        &[
            HEADER.to_string(),
            season_line(1, "Ada Guard", "2021-22", "SAC", 30, 400),
            season_line(1, "Ada Guard", "2021-22", "BOS", 40, 600),
            season_line(1, "Ada Guard", "2022-23", "BOS", 70, 1400),
            season_line(2, "Bo Wing", "2022-23", "NYK", 60, 900),
        ],
    );

    let rows = load_season_table(&path).expect("load");
    assert_eq!(rows.len(), 3);
    let merged = rows
        .iter()
        .find(|r| r.player_id == 1 && r.season == 2021)
        .expect("merged 2021 row");
    assert_eq!(merged.gp, Some(70.0));
    assert_eq!(merged.pts, Some(1000.0));
    assert_eq!(merged.team.as_deref(), Some("BOS,SAC"));
}

#[test]
fn missing_columns_are_named() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = write_csv(
        &dir,
        "thin.csv",
        &["player_id,player_name,season,gp".to_string(), "1,Ada,2020,50".to_string()],
    );

    let err = load_season_table(&path).expect_err("thin table must fail");
    match err.downcast_ref::<LoadError>() {
        Some(LoadError::MissingColumns { missing, .. }) => {
            assert!(missing.contains(&"pts".to_string()));
            assert!(missing.contains(&"player_age".to_string()));
            assert!(!missing.contains(&"season".to_string()));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn unknown_extension_is_rejected() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("seasons.json");
    fs::write(&path, "[]").expect("write");
    let err = load_season_table(&path).expect_err("json is not a table format");
    assert!(matches!(
        err.downcast_ref::<LoadError>(),
        Some(LoadError::UnsupportedFormat { .. })
    ));
}

#[test]
fn bio_table_degrades_to_empty() {
    let dir = tempfile::tempdir().expect("tempdir");
    assert!(load_bio_table(&dir.path().join("absent.csv")).is_empty());

    let bad = write_csv(&dir, "bad_bio.csv", &["name,height".to_string(), "Ada,6-2".to_string()]);
    assert!(load_bio_table(&bad).is_empty());
}

#[test]
fn store_load_prefers_bio_position() {
    let dir = tempfile::tempdir().expect("tempdir");
    let seasons = write_csv(
        &dir,
        "seasons.csv",
        &[
            HEADER.to_string(),
            season_line(1, "Ada Guard", "2022-23", "BOS", 70, 1400),
            season_line(2, "Bo Wing", "2022-23", "NYK", 60, 900),
        ],
    );
    let bio = write_csv(
        &dir,
        "bio.csv",
        &[
            "player_id,primary_position,height,weight".to_string(),
            "1,Point Guard,6-2,190".to_string(),
        ],
    );

    let config = EngineConfig {
        seasons_path: seasons,
        bio_path: bio,
        current_season: 2024,
        default_k: 5,
    };
    let store = Store::load(&config).expect("store");
    assert_eq!(store.default_k(), 5);

    let ada = store.profile(1).expect("ada");
    assert_eq!(ada.position.as_deref(), Some("Point Guard"));
    assert_eq!(ada.height.as_deref(), Some("6-2"));
    assert_eq!(ada.weight, Some(190.0));

    let bo = store.profile(2).expect("bo");
    assert_eq!(bo.position.as_deref(), Some("G"));
    assert_eq!(bo.height, None);
}

#[test]
fn fractional_ids_are_rejected_not_truncated() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = write_csv(
        &dir,
        "seasons.csv",
        &[
            HEADER.to_string(),
            season_line(1, "Ada Guard", "2022-23", "BOS", 70, 1400),
            season_line(9, "Cy Center", "2022-23", "NYK", 60, 900).replacen("9,", "9.5,", 1),
        ],
    );

    let err = load_season_table(&path).expect_err("9.5 is not a player id");
    match err.downcast_ref::<LoadError>() {
        Some(LoadError::FractionalId {
            table,
            line,
            column,
            value,
            ..
        }) => {
            assert_eq!(*table, "season");
            assert_eq!(*line, 3);
            assert_eq!(*column, "player_id");
            assert_eq!(*value, 9.5);
        }
        other => panic!("unexpected error: {other:?}"),
    }

    // Whole numbers written with a decimal point are still ids.
    let whole = write_csv(
        &dir,
        "whole.csv",
        &[
            HEADER.to_string(),
            season_line(4, "Di Forward", "2022-23", "LAL", 50, 700).replacen("4,", "4.0,", 1),
        ],
    );
    let rows = load_season_table(&whole).expect("4.0 is a whole id");
    assert_eq!(rows[0].player_id, 4);

    let bio = write_csv(
        &dir,
        "bio.csv",
        &[
            "player_id,primary_position".to_string(),
            "1,Point Guard".to_string(),
            "2.25,Center".to_string(),
        ],
    );
    assert!(load_bio_table(&bio).is_empty());
}
