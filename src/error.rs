// SYNOID Chaos Error Taxonomy
// Copyright (c) 2026 Xing_The_Creator | SYNOID
//
// Fatal kinds abort a render. UnknownEffect is returned by the catalog but the
// pipeline recovers from it by skipping the step.

use std::path::PathBuf;
use thiserror::Error;

/// Diagnostic payload of a failed Media Transform Engine call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{} {}: {}", .operation, status_text(.status), .diagnostic)]
pub struct EngineFailure {
    /// Which engine operation failed (e.g. "transform", "concat_copy").
    pub operation: &'static str,
    /// Process exit status, `None` when the process could not be spawned or was killed.
    pub status: Option<i32>,
    /// Captured engine output (stderr tail).
    pub diagnostic: String,
}

impl EngineFailure {
    pub fn new(operation: &'static str, status: Option<i32>, diagnostic: impl Into<String>) -> Self {
        Self {
            operation,
            status,
            diagnostic: diagnostic.into(),
        }
    }
}

fn status_text(status: &Option<i32>) -> String {
    match status {
        Some(code) => format!("exited with status {}", code),
        None => "did not complete".to_string(),
    }
}

#[derive(Debug, Error)]
pub enum ChaosError {
    #[error("input not found: {0}")]
    InputNotFound(PathBuf),

    #[error("duration unavailable for {0}")]
    DurationUnavailable(PathBuf),

    #[error("media transform failed: {0}")]
    Transform(#[from] EngineFailure),

    #[error("unknown effect '{0}'")]
    UnknownEffect(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ChaosError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transform_error_carries_engine_diagnostic() {
        let failure = EngineFailure::new("transform", Some(1), "Invalid filter 'nope'");
        let err: ChaosError = failure.into();
        let msg = err.to_string();
        assert!(msg.contains("transform"));
        assert!(msg.contains("status 1"));
        assert!(msg.contains("Invalid filter 'nope'"));
    }

    #[test]
    fn spawn_failure_has_no_status() {
        let failure = EngineFailure::new("probe", None, "No such file or directory");
        assert_eq!(failure.to_string(), "probe did not complete: No such file or directory");
    }

    #[test]
    fn exit_status_is_rendered() {
        let failure = EngineFailure::new("concat_copy", Some(183), "Unsafe file name");
        assert_eq!(failure.to_string(), "concat_copy exited with status 183: Unsafe file name");
        let as_error: &dyn std::error::Error = &failure;
        assert!(as_error.source().is_none());
    }
}
