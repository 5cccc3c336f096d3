//! The five named agent stages and their per-run status.

use std::fmt;

use serde::Serialize;

// ---------------------------------------------------------------------------
// StageName
// ---------------------------------------------------------------------------

/// Stages of the solve pipeline, in execution order.
///
/// ```text
/// parser ──▶ router ──▶ solver ──▶ verifier ──▶ explainer
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StageName {
    Parser,
    Router,
    Solver,
    Verifier,
    Explainer,
}

impl StageName {
    /// Every stage, in pipeline order.
    pub const ALL: [StageName; 5] = [
        StageName::Parser,
        StageName::Router,
        StageName::Solver,
        StageName::Verifier,
        StageName::Explainer,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StageName::Parser => "parser",
            StageName::Router => "router",
            StageName::Solver => "solver",
            StageName::Verifier => "verifier",
            StageName::Explainer => "explainer",
        }
    }

    /// Position of the stage in [`StageName::ALL`].
    pub fn index(&self) -> usize {
        *self as usize
    }

    /// Summary recorded when the backend gave no detail for this stage.
    pub fn generic_summary(&self) -> String {
        format!("{} completed", self.as_str())
    }
}

impl fmt::Display for StageName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// StageStatus
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StageStatus {
    #[default]
    Pending,
    Running,
    Completed,
    Errored,
}

impl StageStatus {
    /// Completed and Errored stages are never revisited within a run.
    ///
    /// ```
    /// use math_mentor::pipeline::StageStatus;
    ///
    /// assert!(!StageStatus::Pending.is_terminal());
    /// assert!(!StageStatus::Running.is_terminal());
    /// assert!(StageStatus::Completed.is_terminal());
    /// assert!(StageStatus::Errored.is_terminal());
    /// ```
    pub fn is_terminal(&self) -> bool {
        matches!(self, StageStatus::Completed | StageStatus::Errored)
    }

    pub fn label(&self) -> &'static str {
        match self {
            StageStatus::Pending => "Pending",
            StageStatus::Running => "Running",
            StageStatus::Completed => "Completed",
            StageStatus::Errored => "Errored",
        }
    }
}

// ---------------------------------------------------------------------------
// AgentStage
// ---------------------------------------------------------------------------

/// One stage as observed by the rendering layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgentStage {
    pub name: StageName,
    pub status: StageStatus,
    pub summary: Option<String>,
}

impl AgentStage {
    pub fn pending(name: StageName) -> Self {
        Self {
            name,
            status: StageStatus::Pending,
            summary: None,
        }
    }
}

/// All five stages, `Pending`.
pub fn pending_stages() -> Vec<AgentStage> {
    StageName::ALL.iter().copied().map(AgentStage::pending).collect()
}
