use serde::Serialize;

use crate::features::SeasonRow;

const MAX_TAGS: usize = 2;
const EFFICIENCY_NOTE_Z: f64 = 1.2;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrajectoryPoint {
    pub season: i32,
    pub age: Option<f64>,
    pub gp: Option<f64>,
    pub mpg: Option<f64>,
    pub pts_per_game: Option<f64>,
    pub ast_per_game: Option<f64>,
    pub reb_per_game: Option<f64>,
    pub fg3_per_game: Option<f64>,
    pub fg_pct: Option<f64>,
    pub ft_pct: Option<f64>,
    pub stl_per_game: Option<f64>,
    pub blk_per_game: Option<f64>,
    pub tov_per_game: Option<f64>,
    pub ts_pct: Option<f64>,
    pub value_score: Option<f64>,
    pub annotation: Option<String>,
    pub efficiency_note: Option<&'static str>,
}

/// Short flags for one season, at most two, space separated.
pub fn annotate(row: &SeasonRow) -> Option<String> {
    let or0 = |v: Option<f64>| v.unwrap_or(0.0);
    let gp = row.games();
    let mpg = or0(row.mpg);
    let pts = or0(row.pts_per_game);
    let ts = or0(row.ts_pct);
    let fg3 = or0(row.fg3_per_game);
    let ast = or0(row.ast_per_game);
    let reb = or0(row.reb_per_game);
    let blk = or0(row.blk_per_game);
    let stl_blk = or0(row.stl_per_game) + blk;
    let val = or0(row.value_score);
    let age = or0(row.raw.age);

    let mut tags: Vec<String> = Vec::new();
    if gp < 40.0 {
        tags.push("LowGP".into());
    }
    if mpg < 18.0 {
        tags.push("LowMP".into());
    }
    if pts > 20.0 {
        tags.push(truncated(format!("{pts:.1}PPG"), 6));
    }
    if ts > 0.62 {
        tags.push("TS62+".into());
    } else if ts < 0.52 {
        tags.push("TS<52".into());
    }
    if fg3 > 2.5 {
        tags.push(truncated(format!("3PM{fg3:.1}"), 7));
    }
    if ast > 7.0 {
        tags.push("AST7+".into());
    }
    if reb > 10.0 {
        tags.push("REB10+".into());
    }
    if stl_blk > 2.0 {
        tags.push("DEF2+".into());
    }
    if blk > 1.5 {
        tags.push("BLK1.5".into());
    }
    if val > 1.0 {
        tags.push("VAL1.0".into());
    }
    if age > 30.0 && val < 0.2 {
        tags.push("DECLINE".into());
    }

    if tags.is_empty() {
        return None;
    }
    tags.truncate(MAX_TAGS);
    Some(tags.join(" "))
}

fn truncated(mut s: String, max_chars: usize) -> String {
    if let Some((idx, _)) = s.char_indices().nth(max_chars) {
        s.truncate(idx);
    }
    s
}

/// Seasons more than 1.2 population standard deviations from the player's
/// own true-shooting mean get a note.
fn efficiency_notes(rows: &[&SeasonRow]) -> Vec<Option<&'static str>> {
    let values = rows.iter().filter_map(|r| r.ts_pct).collect::<Vec<_>>();
    let stats = (!values.is_empty()).then(|| {
        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        let std = (values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n).sqrt();
        (mean, std)
    });
    rows.iter()
        .map(|r| {
            let (mean, std) = stats?;
            let ts = r.ts_pct?;
            if std <= 0.0 {
                return None;
            }
            let z = (ts - mean) / std;
            if z > EFFICIENCY_NOTE_Z {
                Some("Elite efficiency year")
            } else if z < -EFFICIENCY_NOTE_Z {
                Some("Rough efficiency year")
            } else {
                None
            }
        })
        .collect()
}

/// Every season before `current_season`, ascending, including seasons
/// without games.
pub fn trajectory(history: &[SeasonRow], current_season: i32) -> Vec<TrajectoryPoint> {
    let mut rows = history
        .iter()
        .filter(|r| r.season() < current_season)
        .collect::<Vec<_>>();
    rows.sort_by_key(|r| r.season());
    let notes = efficiency_notes(&rows);

    rows.iter()
        .zip(notes)
        .map(|(r, efficiency_note)| TrajectoryPoint {
            season: r.season(),
            age: r.raw.age,
            gp: r.raw.gp,
            mpg: r.mpg,
            pts_per_game: r.pts_per_game,
            ast_per_game: r.ast_per_game,
            reb_per_game: r.reb_per_game,
            fg3_per_game: r.fg3_per_game,
            fg_pct: r.fg_pct,
            ft_pct: r.ft_pct,
            stl_per_game: r.stl_per_game,
            blk_per_game: r.blk_per_game,
            tov_per_game: r.tov_per_game,
            ts_pct: r.ts_pct,
            value_score: r.value_score,
            annotation: annotate(r),
            efficiency_note,
        })
        .collect()
}
