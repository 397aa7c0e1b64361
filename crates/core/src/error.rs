use std::path::PathBuf;

use thiserror::Error;

/// Pipeline-level failure taxonomy.
///
/// `SourceUnavailable` is recoverable and only ever reported alongside a
/// successful run; the other variants abort the run.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("source unavailable: {name}: {reason}")]
    SourceUnavailable { name: String, reason: String },

    #[error("all sources were empty or unavailable")]
    AllSourcesEmpty,

    #[error("failed to write {}: {reason}", path.display())]
    WriteFailure { path: PathBuf, reason: String },

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl PipelineError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::SourceUnavailable { .. } => "source_unavailable",
            Self::AllSourcesEmpty => "all_sources_empty",
            Self::WriteFailure { .. } => "write_failure",
            Self::Config(_) => "config",
        }
    }

    /// Whether the run can still produce a document after this error.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::SourceUnavailable { .. })
    }
}
