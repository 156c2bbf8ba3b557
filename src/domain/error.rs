//! Domain error types.
//!
//! Only startup and loading failures are errors. Conditions that arise while
//! the decision loop is running (missing quotes, indicators still warming up,
//! an empty portfolio) are recovered locally and surface as
//! [`SkipReason`](crate::domain::policy::SkipReason) values instead.

use crate::domain::universe::UniverseError;

/// Top-level error type for volshield.
#[derive(Debug, thiserror::Error)]
pub enum VolshieldError {
    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("invalid universe: {0}")]
    Universe(#[from] UniverseError),

    #[error("data error: {reason}")]
    Data { reason: String },

    #[error("no data for {code}")]
    NoData { code: String },

    #[error("execution failed for {code}: {reason}")]
    Execution { code: String, reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl VolshieldError {
    pub(crate) fn invalid(section: &str, key: &str, reason: impl Into<String>) -> Self {
        VolshieldError::ConfigInvalid {
            section: section.to_string(),
            key: key.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn missing(section: &str, key: &str) -> Self {
        VolshieldError::ConfigMissing {
            section: section.to_string(),
            key: key.to_string(),
        }
    }
}

impl From<&VolshieldError> for std::process::ExitCode {
    fn from(err: &VolshieldError) -> Self {
        let code: u8 = match err {
            VolshieldError::Io(_) => 1,
            VolshieldError::ConfigParse { .. }
            | VolshieldError::ConfigMissing { .. }
            | VolshieldError::ConfigInvalid { .. }
            | VolshieldError::Universe(_) => 2,
            VolshieldError::Data { .. }
            | VolshieldError::NoData { .. }
            | VolshieldError::Execution { .. } => 3,
        };
        std::process::ExitCode::from(code)
    }
}
