use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use parquet::file::reader::{FileReader, SerializedFileReader};
use parquet::record::Field;
use serde::Serialize;
use tracing::{info, warn};

use crate::error::LoadError;

/// Columns every season table must carry. `season` may be substituted by
/// `season_id` ("2019-20" style), which is checked separately.
pub const REQUIRED_SEASON_COLUMNS: [&str; 19] = [
    "player_id",
    "player_age",
    "gp",
    "min",
    "fgm",
    "fga",
    "fg3m",
    "fg3a",
    "ftm",
    "fta",
    "oreb",
    "dreb",
    "reb",
    "ast",
    "stl",
    "blk",
    "tov",
    "pts",
    "player_name",
];

/// One player's aggregated box score for one season, as read from the source table.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RawSeason {
    pub player_id: i64,
    pub season: i32,
    pub player_name: String,
    pub position: Option<String>,
    pub team: Option<String>,
    #[serde(rename = "player_age")]
    pub age: Option<f64>,
    pub gp: Option<f64>,
    pub min: Option<f64>,
    pub fgm: Option<f64>,
    pub fga: Option<f64>,
    pub fg3m: Option<f64>,
    pub fg3a: Option<f64>,
    pub ftm: Option<f64>,
    pub fta: Option<f64>,
    pub oreb: Option<f64>,
    pub dreb: Option<f64>,
    pub reb: Option<f64>,
    pub ast: Option<f64>,
    pub stl: Option<f64>,
    pub blk: Option<f64>,
    pub tov: Option<f64>,
    pub pf: Option<f64>,
    pub pts: Option<f64>,
}

impl RawSeason {
    fn counting(&self) -> [Option<f64>; 17] {
        [
            self.gp, self.min, self.fgm, self.fga, self.fg3m, self.fg3a, self.ftm, self.fta,
            self.oreb, self.dreb, self.reb, self.ast, self.stl, self.blk, self.tov, self.pf,
            self.pts,
        ]
    }

    fn counting_mut(&mut self) -> [&mut Option<f64>; 17] {
        [
            &mut self.gp,
            &mut self.min,
            &mut self.fgm,
            &mut self.fga,
            &mut self.fg3m,
            &mut self.fg3a,
            &mut self.ftm,
            &mut self.fta,
            &mut self.oreb,
            &mut self.dreb,
            &mut self.reb,
            &mut self.ast,
            &mut self.stl,
            &mut self.blk,
            &mut self.tov,
            &mut self.pf,
            &mut self.pts,
        ]
    }
}

/// Optional enrichment keyed by player id.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BioRow {
    pub player_id: i64,
    pub position: Option<String>,
    pub height: Option<String>,
    pub weight: Option<f64>,
}

pub fn load_season_table(path: &Path) -> Result<Vec<RawSeason>> {
    let table = read_table(path)?;
    let mut missing = table.missing(&REQUIRED_SEASON_COLUMNS);
    if !table.has("season") && !table.has("season_id") {
        missing.push("season".to_string());
    }
    if !missing.is_empty() {
        return Err(LoadError::MissingColumns {
            table: "season",
            path: path.display().to_string(),
            missing,
        }
        .into());
    }

    let mut stints = Vec::with_capacity(table.rows.len());
    let mut skipped = 0usize;
    for record in table.records() {
        let parsed = season_from_record(&record)
            .map_err(|bad| bad.into_error("season", path, record.line))?;
        match parsed {
            Some(row) => stints.push(row),
            None => {
                skipped += 1;
                warn!(line = record.line, "skipping season row without player_id/season");
            }
        }
    }

    let rows = merge_stints(stints);
    if rows.is_empty() {
        return Err(LoadError::Empty {
            path: path.display().to_string(),
        }
        .into());
    }
    info!(
        path = %path.display(),
        rows = rows.len(),
        skipped,
        "loaded season table"
    );
    Ok(rows)
}

/// Reads the bio table. Absence or any defect degrades to an empty table so
/// positions fall back to the season table.
pub fn load_bio_table(path: &Path) -> Vec<BioRow> {
    if !path.exists() {
        info!(path = %path.display(), "no bio table; using season-table positions");
        return Vec::new();
    }
    match read_bio(path) {
        Ok(rows) => {
            info!(path = %path.display(), rows = rows.len(), "loaded bio table");
            rows
        }
        Err(err) => {
            warn!(path = %path.display(), error = %format!("{err:#}"), "ignoring unusable bio table");
            Vec::new()
        }
    }
}

fn read_bio(path: &Path) -> Result<Vec<BioRow>> {
    let table = read_table(path)?;
    let missing = table.missing(&["player_id"]);
    if !missing.is_empty() {
        return Err(LoadError::MissingColumns {
            table: "bio",
            path: path.display().to_string(),
            missing,
        }
        .into());
    }
    let position_col = if table.has("primary_position") {
        "primary_position"
    } else {
        "position"
    };

    let mut out = Vec::new();
    for record in table.records() {
        let player_id = record
            .id("player_id")
            .map_err(|bad| bad.into_error("bio", path, record.line))?;
        let Some(player_id) = player_id else {
            continue;
        };
        out.push(BioRow {
            player_id,
            position: record.text(position_col),
            height: record.text("height"),
            weight: record.num("weight"),
        });
    }
    Ok(out)
}

/// Collapses per-team stints into one row per (player_id, season): counting
/// stats summed, age averaged, team abbreviations joined.
pub fn merge_stints(stints: Vec<RawSeason>) -> Vec<RawSeason> {
    let mut grouped: BTreeMap<(i64, i32), Vec<RawSeason>> = BTreeMap::new();
    for stint in stints {
        grouped
            .entry((stint.player_id, stint.season))
            .or_default()
            .push(stint);
    }
    grouped.into_values().filter_map(combine_stints).collect()
}

fn combine_stints(group: Vec<RawSeason>) -> Option<RawSeason> {
    let mut ages = Vec::new();
    let mut teams = BTreeSet::new();
    let mut iter = group.into_iter();
    let mut out = iter.next()?;
    ages.extend(out.age);
    teams.extend(out.team.clone());

    for stint in iter {
        for (slot, value) in out.counting_mut().into_iter().zip(stint.counting()) {
            *slot = add_opt(*slot, value);
        }
        ages.extend(stint.age);
        teams.extend(stint.team);
        if out.player_name.trim().is_empty() {
            out.player_name = stint.player_name;
        }
        if out.position.is_none() {
            out.position = stint.position;
        }
    }

    out.age = if ages.is_empty() {
        None
    } else {
        Some(ages.iter().sum::<f64>() / ages.len() as f64)
    };
    out.team = if teams.is_empty() {
        None
    } else {
        Some(teams.into_iter().collect::<Vec<_>>().join(","))
    };
    Some(out)
}

fn add_opt(a: Option<f64>, b: Option<f64>) -> Option<f64> {
    match (a, b) {
        (Some(x), Some(y)) => Some(x + y),
        (x, None) => x,
        (None, y) => y,
    }
}

/// `Ok(None)` when the row has no player id or season.
fn season_from_record(record: &Record<'_>) -> std::result::Result<Option<RawSeason>, BadId> {
    let Some(player_id) = record.id("player_id")? else {
        return Ok(None);
    };
    let season = match record.id("season")? {
        Some(year) => i32::try_from(year).map_err(|_| BadId {
            column: "season",
            value: year as f64,
        })?,
        None => {
            let Some(year) = record
                .text("season_id")
                .and_then(|raw| raw.get(..4)?.parse::<i32>().ok())
            else {
                return Ok(None);
            };
            year
        }
    };

    Ok(Some(RawSeason {
        player_id,
        season,
        player_name: record.text("player_name").unwrap_or_default(),
        position: record.text("position"),
        team: record.text("team_abbreviation"),
        age: record.num("player_age"),
        gp: record.num("gp"),
        min: record.num("min"),
        fgm: record.num("fgm"),
        fga: record.num("fga"),
        fg3m: record.num("fg3m"),
        fg3a: record.num("fg3a"),
        ftm: record.num("ftm"),
        fta: record.num("fta"),
        oreb: record.num("oreb"),
        dreb: record.num("dreb"),
        reb: record.num("reb"),
        ast: record.num("ast"),
        stl: record.num("stl"),
        blk: record.num("blk"),
        tov: record.num("tov"),
        pf: record.num("pf"),
        pts: record.num("pts"),
    }))
}

/// An id cell holding a number that is not a whole integer.
#[derive(Debug, Clone, Copy, PartialEq)]
struct BadId {
    column: &'static str,
    value: f64,
}

impl BadId {
    fn into_error(self, table: &'static str, path: &Path, line: usize) -> LoadError {
        LoadError::FractionalId {
            table,
            path: path.display().to_string(),
            line,
            column: self.column,
            value: self.value,
        }
    }
}

/// Largest magnitude an f64 carries without losing integer precision.
const MAX_EXACT_ID: f64 = 9_007_199_254_740_992.0;

#[derive(Debug, Clone, PartialEq)]
enum Cell {
    Null,
    Num(f64),
    Text(String),
}

impl Cell {
    fn num(&self) -> Option<f64> {
        match self {
            Cell::Num(v) if v.is_finite() => Some(*v),
            Cell::Text(s) => s.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
            _ => None,
        }
    }

    fn text(&self) -> Option<String> {
        match self {
            Cell::Text(s) => {
                let t = s.trim();
                if t.is_empty() || matches!(t, "nan" | "NaN" | "None" | "null") {
                    None
                } else {
                    Some(t.to_string())
                }
            }
            Cell::Num(v) if v.is_finite() => Some(if v.fract() == 0.0 {
                format!("{}", *v as i64)
            } else {
                v.to_string()
            }),
            _ => None,
        }
    }
}

struct Table {
    columns: HashMap<String, usize>,
    rows: Vec<Vec<Cell>>,
}

struct Record<'a> {
    columns: &'a HashMap<String, usize>,
    cells: &'a [Cell],
    line: usize,
}

impl Table {
    fn new(names: &[String]) -> Self {
        let mut columns = HashMap::with_capacity(names.len());
        for (idx, name) in names.iter().enumerate() {
            columns.entry(name.clone()).or_insert(idx);
        }
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    fn has(&self, name: &str) -> bool {
        self.columns.contains_key(name)
    }

    fn missing(&self, required: &[&str]) -> Vec<String> {
        required
            .iter()
            .filter(|name| !self.has(name))
            .map(|name| name.to_string())
            .collect()
    }

    fn records(&self) -> impl Iterator<Item = Record<'_>> + '_ {
        self.rows.iter().enumerate().map(|(idx, cells)| Record {
            columns: &self.columns,
            cells,
            line: idx + 2,
        })
    }
}

impl Record<'_> {
    fn cell(&self, name: &str) -> Option<&Cell> {
        self.columns.get(name).and_then(|idx| self.cells.get(*idx))
    }

    fn num(&self, name: &str) -> Option<f64> {
        self.cell(name).and_then(Cell::num)
    }

    fn text(&self, name: &str) -> Option<String> {
        self.cell(name).and_then(Cell::text)
    }

    /// Whole-number id; a fractional or out-of-range value is an error rather
    /// than a silently truncated id.
    fn id(&self, name: &'static str) -> std::result::Result<Option<i64>, BadId> {
        match self.num(name) {
            None => Ok(None),
            Some(v) if v.fract() == 0.0 && v.abs() < MAX_EXACT_ID => Ok(Some(v as i64)),
            Some(value) => Err(BadId {
                column: name,
                value,
            }),
        }
    }
}

fn read_table(path: &Path) -> Result<Table> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "parquet" => read_parquet(path),
        "csv" => read_csv(path),
        _ => Err(LoadError::UnsupportedFormat {
            path: path.display().to_string(),
        }
        .into()),
    }
}

fn read_parquet(path: &Path) -> Result<Table> {
    let file = fs::File::open(path).with_context(|| format!("open {}", path.display()))?;
    let reader = SerializedFileReader::new(file)
        .with_context(|| format!("open parquet reader {}", path.display()))?;
    let names = reader
        .metadata()
        .file_metadata()
        .schema()
        .get_fields()
        .iter()
        .map(|f| f.name().trim().to_ascii_lowercase())
        .collect::<Vec<_>>();
    let mut table = Table::new(&names);

    let iter = reader
        .get_row_iter(None)
        .with_context(|| format!("iterate rows {}", path.display()))?;
    for (idx, row) in iter.enumerate() {
        let row = match row {
            Ok(row) => row,
            Err(err) => {
                warn!(line = idx + 1, error = %err, "skipping unreadable parquet row");
                continue;
            }
        };
        let mut cells = vec![Cell::Null; names.len()];
        for (name, field) in row.get_column_iter() {
            if let Some(&col) = table.columns.get(&name.trim().to_ascii_lowercase()) {
                cells[col] = cell_from_field(field);
            }
        }
        table.rows.push(cells);
    }
    Ok(table)
}

fn cell_from_field(field: &Field) -> Cell {
    match field {
        Field::Bool(v) => Cell::Num(if *v { 1.0 } else { 0.0 }),
        Field::Byte(v) => Cell::Num(*v as f64),
        Field::Short(v) => Cell::Num(*v as f64),
        Field::Int(v) => Cell::Num(*v as f64),
        Field::Long(v) => Cell::Num(*v as f64),
        Field::UByte(v) => Cell::Num(*v as f64),
        Field::UShort(v) => Cell::Num(*v as f64),
        Field::UInt(v) => Cell::Num(*v as f64),
        Field::ULong(v) => Cell::Num(*v as f64),
        Field::Float(v) => Cell::Num(*v as f64),
        Field::Double(v) => Cell::Num(*v),
        Field::Str(s) => Cell::Text(s.clone()),
        _ => Cell::Null,
    }
}

fn read_csv(path: &Path) -> Result<Table> {
    let mut rdr = csv::ReaderBuilder::new()
        .delimiter(b',')
        .flexible(true)
        .has_headers(true)
        .from_path(path)
        .with_context(|| format!("open {}", path.display()))?;
    let names = rdr
        .headers()
        .with_context(|| format!("read header {}", path.display()))?
        .iter()
        .map(|h| h.trim().to_ascii_lowercase())
        .collect::<Vec<_>>();
    let mut table = Table::new(&names);

    for (idx, result) in rdr.records().enumerate() {
        let record = match result {
            Ok(record) => record,
            Err(err) => {
                warn!(line = idx + 2, error = %err, "skipping malformed csv record");
                continue;
            }
        };
        if record.iter().all(|f| f.trim().is_empty()) {
            continue;
        }
        let cells = (0..names.len())
            .map(|col| record.get(col).map(cell_from_text).unwrap_or(Cell::Null))
            .collect();
        table.rows.push(cells);
    }
    Ok(table)
}

fn cell_from_text(raw: &str) -> Cell {
    let t = raw.trim();
    if t.is_empty() {
        return Cell::Null;
    }
    match t.parse::<f64>() {
        Ok(v) => Cell::Num(v),
        Err(_) => Cell::Text(t.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stint(team: &str, gp: f64, pts: f64, age: f64) -> RawSeason {
        RawSeason {
            player_id: 7,
            season: 2010,
            player_name: "Traded Guy".to_string(),
            team: Some(team.to_string()),
            age: Some(age),
            gp: Some(gp),
            pts: Some(pts),
            ..Default::default()
        }
    }

    #[test]
    fn stints_merge_into_one_season() {
        let merged = merge_stints(vec![
            stint("SAC", 30.0, 300.0, 24.0),
            stint("BOS", 40.0, 500.0, 25.0),
        ]);
        assert_eq!(merged.len(), 1);
        let row = &merged[0];
        assert_eq!(row.gp, Some(70.0));
        assert_eq!(row.pts, Some(800.0));
        assert_eq!(row.age, Some(24.5));
        assert_eq!(row.team.as_deref(), Some("BOS,SAC"));
        assert_eq!(row.min, None);
    }

    #[test]
    fn text_cells_reject_placeholder_values() {
        assert_eq!(Cell::Text("nan".into()).text(), None);
        assert_eq!(Cell::Text(" G-F ".into()).text().as_deref(), Some("G-F"));
        assert_eq!(Cell::Num(203.0).text().as_deref(), Some("203"));
        assert_eq!(cell_from_text("12.5"), Cell::Num(12.5));
        assert_eq!(cell_from_text(""), Cell::Null);
    }

    #[test]
    fn ids_must_be_whole_numbers() {
        let columns = HashMap::from([("player_id".to_string(), 0), ("season".to_string(), 1)]);
        let cells = [Cell::Num(203.0), Cell::Text("2019.5".into())];
        let record = Record {
            columns: &columns,
            cells: &cells,
            line: 2,
        };
        assert_eq!(record.id("player_id"), Ok(Some(203)));
        assert_eq!(
            record.id("season"),
            Err(BadId {
                column: "season",
                value: 2019.5
            })
        );
        assert_eq!(record.id("absent"), Ok(None));
        assert!(season_from_record(&record).is_err());

        let huge = [Cell::Num(1e300), Cell::Null];
        let record = Record {
            columns: &columns,
            cells: &huge,
            line: 3,
        };
        assert!(record.id("player_id").is_err());
    }
}
