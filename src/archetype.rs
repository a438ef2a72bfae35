use std::collections::BTreeMap;

use serde::Serialize;

use crate::features::SeasonRow;

pub const DEFAULT_LABEL: &str = "Depth piece";
pub const UNKNOWN_LABEL: &str = "Unknown";
pub const METHOD: &str = "heuristic";

/// Career maximum and mean over the seasons where a stat is defined; both
/// are zero when it never is.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Span {
    pub peak: f64,
    pub mean: f64,
}

impl Span {
    pub fn of(values: impl IntoIterator<Item = Option<f64>>) -> Self {
        let mut peak = f64::NEG_INFINITY;
        let mut sum = 0.0;
        let mut n = 0usize;
        for v in values.into_iter().flatten() {
            peak = peak.max(v);
            sum += v;
            n += 1;
        }
        if n == 0 {
            return Self::default();
        }
        Self {
            peak,
            mean: sum / n as f64,
        }
    }
}

/// Inputs to the archetype rules, taken from a player's qualifying seasons.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CareerSummary {
    pub seasons: usize,
    pub latest_gp: f64,
    pub value: Span,
    pub impact: Span,
    pub off_load: Span,
    pub pts_per75: Span,
    pub ts: Span,
    pub pts: Span,
    pub ast: Span,
    pub reb: Span,
    pub fg3: Span,
    pub stl: Span,
    pub blk: Span,
    pub stl_blk: Span,
    pub mpg: Span,
    pub availability: Span,
}

impl CareerSummary {
    /// `seasons` must be in ascending season order. `None` for an empty slice.
    pub fn from_seasons(seasons: &[&SeasonRow]) -> Option<Self> {
        let latest = seasons.last()?;
        let span = |f: fn(&SeasonRow) -> Option<f64>| Span::of(seasons.iter().map(|r| f(r)));
        Some(Self {
            seasons: seasons.len(),
            latest_gp: latest.games(),
            value: span(|r| r.value_score),
            impact: span(|r| Some(r.impact_score)),
            off_load: span(|r| Some(r.off_load)),
            pts_per75: span(|r| r.pts_per75),
            ts: span(|r| r.ts_pct),
            pts: span(|r| r.pts_per_game),
            ast: span(|r| r.ast_per_game),
            reb: span(|r| r.reb_per_game),
            fg3: span(|r| r.fg3_per_game),
            stl: span(|r| r.stl_per_game),
            blk: span(|r| r.blk_per_game),
            stl_blk: span(SeasonRow::stl_blk_per_game),
            mpg: span(|r| r.mpg),
            availability: span(|r| r.availability),
        })
    }

    fn is_star(&self) -> bool {
        self.value.peak > 0.9 && self.availability.mean > 0.55
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RationaleKind {
    Prospect,
    Availability,
    Profile,
}

impl RationaleKind {
    pub fn render(self, s: &CareerSummary) -> String {
        match self {
            RationaleKind::Prospect => {
                format!("{} seasons played; latest GP={:.0}", s.seasons, s.latest_gp)
            }
            RationaleKind::Availability => format!(
                "avg availability={:.2}; peak value={:.2}",
                s.availability.mean, s.value.peak
            ),
            RationaleKind::Profile => format!(
                "peak mpg={:.1}, pts/g={:.1}, ast/g={:.1}, reb/g={:.1}, 3pm/g={:.1}, ts%={:.3}, \
                 stl+blk={:.1}, peak value={:.2}, avg availability={:.2}",
                s.mpg.peak,
                s.pts.peak,
                s.ast.peak,
                s.reb.peak,
                s.fg3.peak,
                s.ts.peak,
                s.stl_blk.peak,
                s.value.peak,
                s.availability.mean,
            ),
        }
    }
}

pub struct ArchetypeRule {
    pub label: &'static str,
    pub rationale: RationaleKind,
    pub applies: fn(&CareerSummary) -> bool,
}

impl std::fmt::Debug for ArchetypeRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArchetypeRule")
            .field("label", &self.label)
            .field("rationale", &self.rationale)
            .finish()
    }
}

/// Evaluated top to bottom; the first rule that applies names the player.
pub static ARCHETYPE_RULES: [ArchetypeRule; 16] = [
    ArchetypeRule {
        label: "Developing prospect",
        rationale: RationaleKind::Prospect,
        applies: |s| s.seasons <= 2 && s.latest_gp < 30.0,
    },
    ArchetypeRule {
        label: "Injury-limited talent",
        rationale: RationaleKind::Availability,
        applies: |s| s.availability.mean < 0.35 && (s.value.peak > 0.6 || s.off_load.peak > 0.35),
    },
    ArchetypeRule {
        label: "Franchise cornerstone",
        rationale: RationaleKind::Profile,
        applies: |s| s.value.peak > 1.2 && s.availability.mean > 0.65 && s.seasons >= 8,
    },
    ArchetypeRule {
        label: "All-star playmaker",
        rationale: RationaleKind::Profile,
        applies: |s| s.is_star() && s.ast.peak >= 7.5,
    },
    ArchetypeRule {
        label: "All-star scorer",
        rationale: RationaleKind::Profile,
        applies: |s| s.is_star() && s.pts.peak >= 24.0 && s.ts.peak >= 0.56,
    },
    ArchetypeRule {
        label: "Impact star",
        rationale: RationaleKind::Profile,
        applies: |s| s.is_star(),
    },
    ArchetypeRule {
        label: "3-and-D wing",
        rationale: RationaleKind::Profile,
        applies: |s| s.fg3.peak >= 1.8 && s.stl_blk.peak >= 2.0 && s.pts.peak < 18.0,
    },
    ArchetypeRule {
        label: "Rim-protecting anchor",
        rationale: RationaleKind::Profile,
        applies: |s| s.blk.peak >= 2.0 && s.reb.peak >= 8.0,
    },
    ArchetypeRule {
        label: "Glass-cleaning rebounder",
        rationale: RationaleKind::Profile,
        applies: |s| s.reb.peak >= 11.0,
    },
    ArchetypeRule {
        label: "Stretch big",
        rationale: RationaleKind::Profile,
        applies: |s| s.fg3.peak >= 1.6 && s.reb.peak >= 6.5 && s.blk.peak < 1.8,
    },
    ArchetypeRule {
        label: "3-point specialist",
        rationale: RationaleKind::Profile,
        applies: |s| s.fg3.peak >= 2.8 && s.pts.peak < 18.0,
    },
    ArchetypeRule {
        label: "Defensive stopper",
        rationale: RationaleKind::Profile,
        applies: |s| s.stl.peak >= 1.7 && s.pts.peak < 16.0,
    },
    ArchetypeRule {
        label: "Scoring spark plug",
        rationale: RationaleKind::Profile,
        applies: |s| s.off_load.peak > 0.4 && s.availability.mean > 0.4 && s.pts.peak > 12.0,
    },
    ArchetypeRule {
        label: "Volume scorer",
        rationale: RationaleKind::Profile,
        applies: |s| s.pts_per75.peak > 18.0 && s.ts.peak < 0.54,
    },
    ArchetypeRule {
        label: "High-value starter",
        rationale: RationaleKind::Profile,
        applies: |s| s.value.peak > 0.6 && s.availability.mean > 0.55,
    },
    ArchetypeRule {
        label: "Reliable role player",
        rationale: RationaleKind::Profile,
        applies: |s| s.value.peak > 0.3 && s.availability.mean > 0.45,
    },
];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Label {
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rationale: Option<String>,
    pub method: &'static str,
}

impl Label {
    pub fn unknown() -> Self {
        Self {
            label: UNKNOWN_LABEL.to_string(),
            rationale: None,
            method: METHOD,
        }
    }
}

pub fn classify(summary: &CareerSummary) -> Label {
    let (label, kind) = ARCHETYPE_RULES
        .iter()
        .find(|rule| (rule.applies)(summary))
        .map(|rule| (rule.label, rule.rationale))
        .unwrap_or((DEFAULT_LABEL, RationaleKind::Profile));
    Label {
        label: label.to_string(),
        rationale: Some(kind.render(summary)),
        method: METHOD,
    }
}

/// Label for a season-sorted history; only qualifying seasons are read.
pub fn label_history(history: &[SeasonRow], current_season: i32) -> Label {
    let qualifying = history
        .iter()
        .filter(|r| r.is_qualifying(current_season))
        .collect::<Vec<_>>();
    match CareerSummary::from_seasons(&qualifying) {
        Some(summary) => classify(&summary),
        None => Label::unknown(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LabelCount {
    pub label: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct LabelSummary {
    pub total_players: usize,
    pub labels: Vec<LabelCount>,
}

/// Counts by label, most common first; ties ordered by label.
pub fn summarize<'a>(labels: impl IntoIterator<Item = &'a str>) -> LabelSummary {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for label in labels {
        *counts.entry(label).or_default() += 1;
    }
    let total_players = counts.values().sum();
    let mut labels = counts
        .into_iter()
        .map(|(label, count)| LabelCount {
            label: label.to_string(),
            count,
        })
        .collect::<Vec<_>>();
    labels.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.label.cmp(&b.label)));
    LabelSummary {
        total_players,
        labels,
    }
}
