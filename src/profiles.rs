use std::collections::{BTreeMap, HashMap};

use serde::Serialize;

use crate::dataset::BioRow;
use crate::features::SeasonRow;

pub const UNKNOWN_NAME: &str = "Unknown";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlayerProfile {
    pub player_id: i64,
    pub name: String,
    pub position: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
    pub from_year: i32,
    pub to_year: i32,
    /// Seasons with at least one game played, any year.
    pub season_count: usize,
    pub seasons_played: Vec<i32>,
    /// Seasons with games played strictly before the operating year.
    pub qualifying_seasons: usize,
}

/// One profile per player id, in ascending id order.
#[derive(Debug, Clone, Default)]
pub struct Roster {
    profiles: Vec<PlayerProfile>,
    by_id: HashMap<i64, usize>,
}

impl Roster {
    pub fn build(rows: &[SeasonRow], bio: &[BioRow], current_season: i32) -> Self {
        let bio_by_id: HashMap<i64, &BioRow> = bio.iter().map(|b| (b.player_id, b)).collect();

        let mut grouped: BTreeMap<i64, Vec<&SeasonRow>> = BTreeMap::new();
        for row in rows {
            grouped.entry(row.player_id()).or_default().push(row);
        }

        let profiles = grouped
            .into_iter()
            .filter_map(|(player_id, history)| {
                build_profile(player_id, &history, bio_by_id.get(&player_id).copied(), current_season)
            })
            .collect::<Vec<_>>();
        let by_id = profiles
            .iter()
            .enumerate()
            .map(|(idx, p)| (p.player_id, idx))
            .collect();
        Self { profiles, by_id }
    }

    pub fn profiles(&self) -> &[PlayerProfile] {
        &self.profiles
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    pub fn get(&self, player_id: i64) -> Option<&PlayerProfile> {
        self.by_id.get(&player_id).map(|idx| &self.profiles[*idx])
    }

    pub fn name_of(&self, player_id: i64) -> &str {
        self.get(player_id)
            .map(|p| p.name.as_str())
            .unwrap_or(UNKNOWN_NAME)
    }

    pub fn qualifying_seasons(&self, player_id: i64) -> usize {
        self.get(player_id).map(|p| p.qualifying_seasons).unwrap_or(0)
    }

    /// Case-insensitive substring search over names, used by the browser and CLI.
    pub fn search(&self, needle: &str) -> Vec<&PlayerProfile> {
        let needle = needle.trim().to_lowercase();
        if needle.is_empty() {
            return self.profiles.iter().collect();
        }
        self.profiles
            .iter()
            .filter(|p| p.name.to_lowercase().contains(&needle))
            .collect()
    }
}

fn build_profile(
    player_id: i64,
    history: &[&SeasonRow],
    bio: Option<&BioRow>,
    current_season: i32,
) -> Option<PlayerProfile> {
    let from_year = history.iter().map(|r| r.season()).min()?;
    let to_year = history.iter().map(|r| r.season()).max()?;

    let mut seasons_played = history
        .iter()
        .filter(|r| r.played())
        .map(|r| r.season())
        .collect::<Vec<_>>();
    seasons_played.sort_unstable();
    seasons_played.dedup();
    let qualifying_seasons = seasons_played
        .iter()
        .filter(|s| **s < current_season)
        .count();

    // Latest non-empty name wins; careers occasionally carry renamed entries.
    let name = history
        .iter()
        .rev()
        .map(|r| r.raw.player_name.trim())
        .find(|n| !n.is_empty())
        .unwrap_or(UNKNOWN_NAME)
        .to_string();
    let source_position = history.iter().rev().find_map(|r| r.raw.position.clone());
    let position = bio
        .and_then(|b| b.position.clone())
        .or(source_position);

    Some(PlayerProfile {
        player_id,
        name,
        position,
        height: bio.and_then(|b| b.height.clone()),
        weight: bio.and_then(|b| b.weight),
        from_year,
        to_year,
        season_count: seasons_played.len(),
        seasons_played,
        qualifying_seasons,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::RawSeason;
    use crate::features::derive_table;

    fn season(player_id: i64, season: i32, gp: f64, position: Option<&str>) -> RawSeason {
        RawSeason {
            player_id,
            season,
            player_name: "Pat Guard".to_string(),
            position: position.map(str::to_string),
            gp: Some(gp),
            min: Some(gp * 20.0),
            ..Default::default()
        }
    }

    #[test]
    fn profile_counts_played_and_qualifying_seasons() {
        let rows = derive_table(vec![
            season(5, 2021, 40.0, Some("Guard")),
            season(5, 2022, 0.0, None),
            season(5, 2023, 12.0, None),
            season(5, 2025, 3.0, None),
        ]);
        let roster = Roster::build(&rows, &[], 2025);
        let p = roster.get(5).unwrap();
        assert_eq!((p.from_year, p.to_year), (2021, 2025));
        assert_eq!(p.seasons_played, vec![2021, 2023, 2025]);
        assert_eq!(p.season_count, 3);
        assert_eq!(p.qualifying_seasons, 2);
        assert_eq!(p.position.as_deref(), Some("Guard"));
    }

    #[test]
    fn bio_position_wins_and_missing_player_is_unknown() {
        let rows = derive_table(vec![season(9, 2020, 50.0, Some("F"))]);
        let bio = vec![BioRow {
            player_id: 9,
            position: Some("Center".to_string()),
            height: Some("7-0".to_string()),
            weight: Some(250.0),
        }];
        let roster = Roster::build(&rows, &bio, 2025);
        let p = roster.get(9).unwrap();
        assert_eq!(p.position.as_deref(), Some("Center"));
        assert_eq!(p.height.as_deref(), Some("7-0"));
        assert_eq!(roster.name_of(404), UNKNOWN_NAME);
        assert_eq!(roster.qualifying_seasons(404), 0);
    }
}
