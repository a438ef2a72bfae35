use std::path::Path;

use anyhow::{Context, Result};
use rayon::prelude::*;
use rust_xlsxwriter::{Workbook, Worksheet};

use crate::profiles::PlayerProfile;
use crate::store::Store;

pub struct ExportReport {
    pub players: usize,
    pub labels: usize,
    pub trajectory_rows: usize,
    pub projection_rows: usize,
    pub forecast_rows: usize,
}

/// Writes the Players, Labels, Trajectories, Projections and Forecasts
/// sheets for every player with at least `min_seasons` qualifying seasons.
pub fn export_workbook(store: &Store, path: &Path, min_seasons: usize) -> Result<ExportReport> {
    let selected = store
        .players()
        .iter()
        .filter(|p| p.qualifying_seasons >= min_seasons)
        .collect::<Vec<_>>();

    let mut players_rows = vec![header(&[
        "player_id", "name", "position", "height", "weight", "from_year", "to_year",
        "season_count", "qualifying_seasons",
    ])];
    players_rows.extend(selected.iter().map(|p| player_row(p)));

    let mut label_rows = vec![header(&["player_id", "name", "label", "rationale"])];
    label_rows.extend(
        selected
            .par_iter()
            .map(|p| {
                let label = store.label(p.player_id);
                vec![
                    p.player_id.to_string(),
                    p.name.clone(),
                    label.label,
                    label.rationale.unwrap_or_default(),
                ]
            })
            .collect::<Vec<_>>(),
    );

    let mut trajectory_rows = vec![header(&[
        "player_id", "name", "season", "age", "gp", "mpg", "pts_per_game", "ast_per_game",
        "reb_per_game", "fg3_per_game", "ts_pct", "value_score", "annotation", "efficiency_note",
    ])];
    trajectory_rows.extend(
        selected
            .par_iter()
            .flat_map_iter(|p| {
                store.trajectory(p.player_id).into_iter().map(move |t| {
                    vec![
                        p.player_id.to_string(),
                        p.name.clone(),
                        t.season.to_string(),
                        fixed(t.age, 0),
                        fixed(t.gp, 0),
                        fixed(t.mpg, 1),
                        fixed(t.pts_per_game, 1),
                        fixed(t.ast_per_game, 1),
                        fixed(t.reb_per_game, 1),
                        fixed(t.fg3_per_game, 1),
                        fixed(t.ts_pct, 3),
                        fixed(t.value_score, 3),
                        t.annotation.unwrap_or_default(),
                        t.efficiency_note.unwrap_or_default().to_string(),
                    ]
                })
            })
            .collect::<Vec<_>>(),
    );

    let mut projection_rows = vec![header(&[
        "player_id", "name", "season", "age", "gp_pred", "mpg_pred", "pts_per_game_pred",
        "ast_per_game_pred", "reb_per_game_pred", "fg3_per_game_pred", "ts_pct_pred",
    ])];
    projection_rows.extend(
        selected
            .par_iter()
            .flat_map_iter(|p| {
                store.projection(p.player_id).into_iter().map(move |pp| {
                    vec![
                        p.player_id.to_string(),
                        p.name.clone(),
                        pp.season.to_string(),
                        fixed(pp.age, 0),
                        fixed(pp.gp_pred, 0),
                        fixed(pp.mpg_pred, 1),
                        fixed(pp.pts_per_game_pred, 1),
                        fixed(pp.ast_per_game_pred, 1),
                        fixed(pp.reb_per_game_pred, 1),
                        fixed(pp.fg3_per_game_pred, 1),
                        fixed(pp.ts_pct_pred, 3),
                    ]
                })
            })
            .collect::<Vec<_>>(),
    );

    let mut forecast_rows = vec![header(&["player_id", "name", "season", "p25", "median", "p75"])];
    for p in &selected {
        let Some(points) = store.forecast(p.player_id) else {
            continue;
        };
        forecast_rows.extend(points.iter().map(|f| {
            vec![
                p.player_id.to_string(),
                p.name.clone(),
                f.season.to_string(),
                format!("{:.3}", f.p25),
                format!("{:.3}", f.median),
                format!("{:.3}", f.p75),
            ]
        }));
    }

    let mut workbook = Workbook::new();
    for (name, rows) in [
        ("Players", &players_rows),
        ("Labels", &label_rows),
        ("Trajectories", &trajectory_rows),
        ("Projections", &projection_rows),
        ("Forecasts", &forecast_rows),
    ] {
        let sheet = workbook.add_worksheet();
        sheet.set_name(name)?;
        write_rows(sheet, rows)?;
    }
    workbook
        .save(path)
        .with_context(|| format!("failed writing workbook to {}", path.display()))?;

    Ok(ExportReport {
        players: players_rows.len().saturating_sub(1),
        labels: label_rows.len().saturating_sub(1),
        trajectory_rows: trajectory_rows.len().saturating_sub(1),
        projection_rows: projection_rows.len().saturating_sub(1),
        forecast_rows: forecast_rows.len().saturating_sub(1),
    })
}

fn header(cols: &[&str]) -> Vec<String> {
    cols.iter().map(|c| c.to_string()).collect()
}

fn player_row(p: &PlayerProfile) -> Vec<String> {
    vec![
        p.player_id.to_string(),
        p.name.clone(),
        p.position.clone().unwrap_or_default(),
        p.height.clone().unwrap_or_default(),
        fixed(p.weight, 0),
        p.from_year.to_string(),
        p.to_year.to_string(),
        p.season_count.to_string(),
        p.qualifying_seasons.to_string(),
    ]
}

fn fixed(value: Option<f64>, decimals: usize) -> String {
    value
        .map(|v| format!("{v:.decimals$}"))
        .unwrap_or_default()
}

fn write_rows(worksheet: &mut Worksheet, rows: &[Vec<String>]) -> Result<()> {
    for (row_idx, row) in rows.iter().enumerate() {
        for (col_idx, value) in row.iter().enumerate() {
            worksheet
                .write_string(row_idx as u32, col_idx as u16, value)
                .with_context(|| format!("write cell ({row_idx},{col_idx})"))?;
        }
    }
    Ok(())
}
