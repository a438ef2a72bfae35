use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::dataset::{BioRow, RawSeason};

const FIRST_NAMES: [&str; 16] = [
    "Andre", "Marcus", "Tyrese", "Jalen", "Luka", "Devin", "Nikola", "Trae", "Kawhi", "Darius",
    "Bam", "Zion", "Jaylen", "Rudy", "Klay", "Scottie",
];
const LAST_NAMES: [&str; 16] = [
    "Walker", "Brooks", "Harper", "Mitchell", "Okafor", "Vance", "Ellis", "Barnes", "Hayes",
    "Porter", "Grant", "Sims", "Coleman", "Reyes", "Fletcher", "Dunn",
];

#[derive(Debug, Clone, Copy)]
enum Role {
    Guard,
    Wing,
    Big,
}

impl Role {
    fn label(self) -> &'static str {
        match self {
            Role::Guard => "Guard",
            Role::Wing => "Forward",
            Role::Big => "Center",
        }
    }

    /// Per-36 baselines: assists, rebounds, threes attempted, steals, blocks.
    fn per36(self) -> [f64; 5] {
        match self {
            Role::Guard => [6.5, 4.0, 6.5, 1.4, 0.3],
            Role::Wing => [3.0, 6.5, 5.0, 1.2, 0.7],
            Role::Big => [2.0, 11.0, 1.2, 0.8, 1.9],
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SyntheticRoster {
    pub seasons: Vec<RawSeason>,
    pub bio: Vec<BioRow>,
}

/// Deterministic careers for demos and benchmarks: the same seed always
/// yields the same roster.
pub fn generate(players: usize, current_season: i32, seed: u64) -> SyntheticRoster {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut roster = SyntheticRoster::default();

    for idx in 0..players {
        let player_id = 1_000 + idx as i64;
        let name = format!(
            "{} {}",
            FIRST_NAMES[rng.gen_range(0..FIRST_NAMES.len())],
            LAST_NAMES[rng.gen_range(0..LAST_NAMES.len())]
        );
        let role = match rng.gen_range(0..3) {
            0 => Role::Guard,
            1 => Role::Wing,
            _ => Role::Big,
        };
        let talent: f64 = rng.gen_range(0.2..1.6);
        let durability: f64 = rng.gen_range(0.3..1.0);
        let debut = rng.gen_range(current_season - 16..current_season);
        let last = (debut + rng.gen_range(0..16)).min(current_season);
        let debut_age: f64 = rng.gen_range(19.0..24.0);

        for season in debut..=last {
            let age = debut_age + f64::from(season - debut);
            let in_progress = season == current_season;
            roster.seasons.push(season_line(
                &mut rng,
                SeasonInputs {
                    player_id,
                    season,
                    name: &name,
                    role,
                    talent,
                    durability,
                    age,
                    in_progress,
                },
            ));
        }

        roster.bio.push(BioRow {
            player_id,
            position: Some(role.label().to_string()),
            height: Some(match role {
                Role::Guard => "6-3",
                Role::Wing => "6-7",
                Role::Big => "6-11",
            }
            .to_string()),
            weight: Some(match role {
                Role::Guard => 195.0,
                Role::Wing => 220.0,
                Role::Big => 250.0,
            }),
        });
    }
    roster
}

struct SeasonInputs<'a> {
    player_id: i64,
    season: i32,
    name: &'a str,
    role: Role,
    talent: f64,
    durability: f64,
    age: f64,
    in_progress: bool,
}

fn season_line(rng: &mut StdRng, p: SeasonInputs<'_>) -> RawSeason {
    // Gentle aging curve peaking at 27.
    let form = (1.0 - 0.012 * (p.age - 27.0).powi(2)).clamp(0.35, 1.0);
    let level = p.talent * form;

    let gp = if p.in_progress {
        rng.gen_range(1.0_f64..20.0).round()
    } else if rng.gen_bool(0.15 * (1.0 - p.durability) + 0.03) {
        rng.gen_range(5.0_f64..35.0).round()
    } else {
        (82.0 * p.durability * rng.gen_range(0.85..1.0)).round().max(10.0)
    };
    let mpg = (8.0 + 22.0 * level + rng.gen_range(-3.0..3.0)).clamp(5.0, 38.0);
    let minutes = (gp * mpg).round();
    let scale = minutes / 36.0;
    let noise = |rng: &mut StdRng| rng.gen_range(0.85..1.15);

    let [ast36, reb36, fg3a36, stl36, blk36] = p.role.per36();
    let fga = (scale * (9.0 + 9.0 * level) * noise(rng)).round();
    let fg3a = (scale * fg3a36 * noise(rng)).round().min(fga);
    let fg3_pct = rng.gen_range(0.30..0.42);
    let two_pct = rng.gen_range(0.45..0.58);
    let fg3m = (fg3a * fg3_pct).round();
    let fgm = (fg3m + (fga - fg3a) * two_pct).round();
    let fta = (scale * (2.0 + 4.0 * level) * noise(rng)).round();
    let ftm = (fta * rng.gen_range(0.65..0.9)).round();
    let pts = 2.0 * fgm + fg3m + ftm;
    let reb = (scale * reb36 * noise(rng)).round();
    let oreb = (reb * 0.25).round();

    RawSeason {
        player_id: p.player_id,
        season: p.season,
        player_name: p.name.to_string(),
        position: Some(p.role.label().to_string()),
        team: None,
        age: Some(p.age.floor()),
        gp: Some(gp),
        min: Some(minutes),
        fgm: Some(fgm),
        fga: Some(fga),
        fg3m: Some(fg3m),
        fg3a: Some(fg3a),
        ftm: Some(ftm),
        fta: Some(fta),
        oreb: Some(oreb),
        dreb: Some(reb - oreb),
        reb: Some(reb),
        ast: Some((scale * ast36 * (0.6 + 0.5 * level) * noise(rng)).round()),
        stl: Some((scale * stl36 * noise(rng)).round()),
        blk: Some((scale * blk36 * noise(rng)).round()),
        tov: Some((scale * (1.2 + 1.2 * level) * noise(rng)).round()),
        pf: Some((scale * 2.5).round()),
        pts: Some(pts),
    }
}
