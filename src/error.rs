use thiserror::Error;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("{table} table {path} is missing required columns: {}", missing.join(", "))]
    MissingColumns {
        table: &'static str,
        path: String,
        missing: Vec<String>,
    },

    #[error("unsupported table format for {path} (expected .parquet or .csv)")]
    UnsupportedFormat { path: String },

    #[error("season table {path} has no usable rows")]
    Empty { path: String },

    #[error("{table} table {path} line {line}: {column} {value} is not a whole-number id")]
    FractionalId {
        table: &'static str,
        path: String,
        line: usize,
        column: &'static str,
        value: f64,
    },
}

/// Why a similarity space could not be fitted. Stored once per space and
/// handed back on every later query instead of re-running the build.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SpaceError {
    #[error("no players qualify for the {space} space")]
    EmptyPopulation { space: &'static str },

    #[error("non-finite {feature} for player {player_id} in the {space} space")]
    NonFinite {
        space: &'static str,
        player_id: i64,
        feature: &'static str,
    },
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum QueryError {
    #[error("{space} similarity space unavailable: {reason}")]
    SpaceUnavailable { space: &'static str, reason: String },
}

impl QueryError {
    pub fn unavailable(space: &'static str, cause: &SpaceError) -> Self {
        QueryError::SpaceUnavailable {
            space,
            reason: cause.to_string(),
        }
    }

    /// Every query error is an infrastructure condition; callers may retry
    /// after a restart with corrected source data.
    pub fn is_retriable(&self) -> bool {
        matches!(self, QueryError::SpaceUnavailable { .. })
    }
}
