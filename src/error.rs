use std::path::PathBuf;

use crate::types::SolveStatus;

/// Errors that abort an analysis.
///
/// Per-iteration solver failures are not represented here: they are
/// recorded in the iteration log and the workflow moves on to the next
/// preference set.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Returned when the analysis configuration is missing or malformed.
    #[error("configuration error: {0}")]
    Config(String),

    /// Returned when a criterion sense is neither `min` nor `max`.
    #[error("invalid criterion sense '{0}': expected 'min' or 'max'")]
    InvalidSense(String),

    /// Returned when a criterion refers to a variable the model does not define.
    #[error("criterion '{criterion}' refers to unknown model variable '{var_name}'")]
    UnknownVariable {
        /// The criterion name.
        criterion: String,
        /// The missing variable name.
        var_name: String,
    },

    /// Returned when the substantive model cannot be found.
    #[error("substantive model artefact not found: {}", .0.display())]
    MissingModel(PathBuf),

    /// Returned when two criteria share a name.
    #[error("duplicate criterion name '{0}'")]
    DuplicateCriterion(String),

    /// Returned when the utopia of a criterion is set twice.
    #[error("utopia of criterion '{0}' is already set")]
    UtopiaAlreadySet(String),

    /// Returned when utopia and nadir are too close to define an achievement scale.
    #[error(
        "criterion '{criterion}': utopia ({utopia}) and nadir ({nadir}) are too close to define an achievement scale"
    )]
    RangeCollapse {
        /// The criterion name.
        criterion: String,
        /// The utopia value.
        utopia: f64,
        /// The nadir value.
        nadir: f64,
    },

    /// Returned when an aspiration/reservation pair is inconsistent with U/N.
    #[error("inconsistent preference for criterion '{criterion}': {reason}")]
    InconsistentPreference {
        /// The criterion name.
        criterion: String,
        /// What is wrong with the preference.
        reason: String,
    },

    /// Returned when a loaded payoff table contradicts the criterion sense.
    #[error("inconsistent payoff table for criterion '{criterion}': {reason}")]
    InconsistentPayoff {
        /// The criterion name.
        criterion: String,
        /// What is wrong with the stored values.
        reason: String,
    },

    /// Returned when the payoff file cannot be parsed.
    #[error("payoff file, line {line}: {reason}")]
    PayoffParse {
        /// 1-based line number.
        line: usize,
        /// The parse failure.
        reason: String,
    },

    /// Returned when the user preference file cannot be parsed.
    #[error("preference file, line {line}: {reason}")]
    PreferenceParse {
        /// 1-based line number.
        line: usize,
        /// The parse failure.
        reason: String,
    },

    /// Returned when a selfish optimization of the payoff stage fails.
    #[error("selfish optimization of criterion '{criterion}' failed: {status}")]
    PayoffSolve {
        /// The criterion being optimized.
        criterion: String,
        /// The solver status.
        status: SolveStatus,
    },

    /// Returned when no corner iteration produced a solution.
    #[error("every corner optimization failed; the substantive model cannot be analysed")]
    AllCornersFailed,

    /// Returned when (de)serialization of a document fails.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Returned when a file operation fails.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = core::result::Result<T, Error>;

impl From<toml::de::Error> for Error {
    fn from(e: toml::de::Error) -> Self {
        Error::Config(e.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}
