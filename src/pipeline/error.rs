//! Terminal pipeline errors.

use serde::Serialize;
use thiserror::Error;

use crate::backend::BackendError;

/// Why a run could not produce a native solve result.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PipelineError {
    /// The backend was unreachable or did not answer in time.
    #[error("network failure: {0}")]
    NetworkFailure(String),

    /// The backend answered, but not with a usable result.
    #[error("backend error: {0}")]
    BackendError(String),

    /// There was no text to submit.
    #[error("no input to submit")]
    NoInput,
}

/// Discriminant of [`PipelineError`], for observers that only need the kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineErrorKind {
    NetworkFailure,
    BackendError,
    NoInput,
}

impl PipelineError {
    pub fn kind(&self) -> PipelineErrorKind {
        match self {
            PipelineError::NetworkFailure(_) => PipelineErrorKind::NetworkFailure,
            PipelineError::BackendError(_) => PipelineErrorKind::BackendError,
            PipelineError::NoInput => PipelineErrorKind::NoInput,
        }
    }

    /// Human-readable message shown in the failure result.
    pub fn message(&self) -> String {
        self.to_string()
    }
}

impl From<BackendError> for PipelineError {
    fn from(e: BackendError) -> Self {
        if e.is_network() {
            PipelineError::NetworkFailure(e.to_string())
        } else {
            PipelineError::BackendError(e.to_string())
        }
    }
}
