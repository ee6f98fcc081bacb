//! Domain error types.

use std::fmt;

/// Pipeline stage a failure is attributed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Load,
    Screen,
    Weight,
    Track,
    Convert,
    Rebase,
    Analytics,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Load => "load",
            Stage::Screen => "screen",
            Stage::Weight => "weight",
            Stage::Track => "track",
            Stage::Convert => "convert",
            Stage::Rebase => "rebase",
            Stage::Analytics => "analytics",
        };
        f.write_str(name)
    }
}

/// Top-level error type for idxtrack.
#[derive(Debug, thiserror::Error)]
pub enum IdxtrackError {
    #[error("data unavailable: {what}")]
    DataUnavailable { what: String },

    #[error("configuration error: {reason}")]
    Configuration { reason: String },

    #[error("insufficient data in {stage} stage: {reason}")]
    InsufficientData { stage: Stage, reason: String },

    #[error("invalid data in {what}: {reason}")]
    InvalidData { what: String, reason: String },

    #[error("data source error: {reason}")]
    Source { reason: String },

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

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl IdxtrackError {
    pub fn insufficient(stage: Stage, reason: impl Into<String>) -> Self {
        IdxtrackError::InsufficientData {
            stage,
            reason: reason.into(),
        }
    }

    pub fn unavailable(what: impl Into<String>) -> Self {
        IdxtrackError::DataUnavailable { what: what.into() }
    }
}

/// A pipeline failure tagged with the stage that produced it.
#[derive(Debug, thiserror::Error)]
#[error("{stage} stage failed: {source}")]
pub struct StageFailure {
    pub stage: Stage,
    #[source]
    pub source: IdxtrackError,
}

impl StageFailure {
    pub fn new(stage: Stage, source: IdxtrackError) -> Self {
        Self { stage, source }
    }
}

impl From<&IdxtrackError> for std::process::ExitCode {
    fn from(err: &IdxtrackError) -> Self {
        let code: u8 = match err {
            IdxtrackError::Io(_) => 1,
            IdxtrackError::ConfigParse { .. }
            | IdxtrackError::ConfigMissing { .. }
            | IdxtrackError::ConfigInvalid { .. }
            | IdxtrackError::Configuration { .. } => 2,
            IdxtrackError::DataUnavailable { .. }
            | IdxtrackError::InvalidData { .. }
            | IdxtrackError::Source { .. } => 3,
            IdxtrackError::InsufficientData { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}

impl From<&StageFailure> for std::process::ExitCode {
    fn from(err: &StageFailure) -> Self {
        (&err.source).into()
    }
}
