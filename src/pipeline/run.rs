//! One end-to-end pipeline run as an explicit state machine.
//!
//! ```text
//! start ──▶ Running ──advance()×10──▶ complete() ──▶ Completed
//!              │
//!              └──────── fail() ────────────────────▶ Errored
//! ```
//!
//! Each call to [`PipelineRun::advance`] performs exactly one stage
//! transition: it either starts the leftmost `Pending` stage or completes the
//! stage that is `Running`.  Because a stage is only started when none is
//! running, at most one stage is ever `Running`, everything to its left is
//! terminal and everything to its right is `Pending`.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::Serialize;

use crate::backend::AgentResultWire;
use crate::input::InputSample;

use super::error::PipelineError;
use super::result::{SolveResult, ERROR_STAGE_SUMMARY};
use super::stage::{pending_stages, AgentStage, StageName, StageStatus};

pub type RunId = u64;

// ---------------------------------------------------------------------------
// RunState / RunStatus
// ---------------------------------------------------------------------------

/// Lifecycle of a run, carrying its terminal payload.
#[derive(Debug, Clone, PartialEq)]
pub enum RunState {
    Running,
    Completed(SolveResult),
    Errored {
        error: PipelineError,
        result: SolveResult,
    },
}

/// Payload-free view of the pipeline as a whole, including "no run yet".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    #[default]
    Idle,
    Running,
    Completed,
    Errored,
}

impl RunStatus {
    /// `true` while a run is in flight; submission must be refused.
    pub fn is_busy(&self) -> bool {
        matches!(self, RunStatus::Running)
    }

    pub fn label(&self) -> &'static str {
        match self {
            RunStatus::Idle => "Idle",
            RunStatus::Running => "Running",
            RunStatus::Completed => "Completed",
            RunStatus::Errored => "Errored",
        }
    }
}

// ---------------------------------------------------------------------------
// StageTransition / StagePlan
// ---------------------------------------------------------------------------

/// A single stage transition performed by [`PipelineRun::advance`].
#[derive(Debug, Clone, PartialEq)]
pub enum StageTransition {
    Started {
        index: usize,
        stage: StageName,
    },
    Completed {
        index: usize,
        stage: StageName,
        summary: String,
    },
}

/// Summaries to record as each stage completes.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StagePlan {
    summaries: Vec<String>,
}

impl StagePlan {
    /// No per-stage detail: every stage gets its generic summary.
    pub fn generic() -> Self {
        Self::default()
    }

    /// Use the backend's agent results positionally; stage *i* gets
    /// `results[i]`.  Stages beyond the list fall back to the generic
    /// summary.
    pub fn from_agent_results(results: &[AgentResultWire]) -> Self {
        Self {
            summaries: results
                .iter()
                .take(StageName::ALL.len())
                .map(|r| r.result.clone())
                .collect(),
        }
    }

    pub fn summary_for(&self, stage: StageName) -> String {
        self.summaries
            .get(stage.index())
            .filter(|s| !s.trim().is_empty())
            .cloned()
            .unwrap_or_else(|| stage.generic_summary())
    }
}

// ---------------------------------------------------------------------------
// PipelineRun
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct PipelineRun {
    id: RunId,
    stages: Vec<AgentStage>,
    input: InputSample,
    requires_hitl: bool,
    state: RunState,
}

impl PipelineRun {
    /// Start a run: all five stages `Pending`, state `Running`.
    pub fn start(id: RunId, input: InputSample, requires_hitl: bool) -> Self {
        Self {
            id,
            stages: pending_stages(),
            input,
            requires_hitl,
            state: RunState::Running,
        }
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    pub fn id(&self) -> RunId {
        self.id
    }

    pub fn stages(&self) -> &[AgentStage] {
        &self.stages
    }

    pub fn input(&self) -> &InputSample {
        &self.input
    }

    pub fn requires_hitl(&self) -> bool {
        self.requires_hitl
    }

    pub fn state(&self) -> &RunState {
        &self.state
    }

    pub fn status(&self) -> RunStatus {
        match self.state {
            RunState::Running => RunStatus::Running,
            RunState::Completed(_) => RunStatus::Completed,
            RunState::Errored { .. } => RunStatus::Errored,
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self.state, RunState::Running)
    }

    /// The attached result: native on success, synthesized on failure.
    pub fn outcome(&self) -> Option<&SolveResult> {
        match &self.state {
            RunState::Running => None,
            RunState::Completed(result) | RunState::Errored { result, .. } => Some(result),
        }
    }

    pub fn failure(&self) -> Option<&PipelineError> {
        match &self.state {
            RunState::Errored { error, .. } => Some(error),
            _ => None,
        }
    }

    pub fn running_stage(&self) -> Option<&AgentStage> {
        self.stages
            .iter()
            .find(|s| s.status == StageStatus::Running)
    }

    pub fn all_stages_terminal(&self) -> bool {
        self.stages.iter().all(|s| s.status.is_terminal())
    }

    // -----------------------------------------------------------------------
    // Transitions
    // -----------------------------------------------------------------------

    /// Perform the next stage transition, or return `None` when every stage
    /// is terminal or the run is no longer `Running`.
    pub fn advance(&mut self, plan: &StagePlan) -> Option<StageTransition> {
        if !self.is_active() {
            return None;
        }

        if let Some(index) = self.position(StageStatus::Running) {
            let stage = &mut self.stages[index];
            let summary = plan.summary_for(stage.name);
            stage.status = StageStatus::Completed;
            stage.summary = Some(summary.clone());
            log::debug!("pipeline: run {} stage {} completed", self.id, stage.name);
            return Some(StageTransition::Completed {
                index,
                stage: stage.name,
                summary,
            });
        }

        let index = self.position(StageStatus::Pending)?;
        let stage = &mut self.stages[index];
        stage.status = StageStatus::Running;
        log::debug!("pipeline: run {} stage {} running", self.id, stage.name);
        Some(StageTransition::Started {
            index,
            stage: stage.name,
        })
    }

    /// Attach a native result.  Only valid once every stage is terminal;
    /// returns `false` (and changes nothing) otherwise.
    pub fn complete(&mut self, result: SolveResult) -> bool {
        if !self.is_active() || !self.all_stages_terminal() {
            log::warn!("pipeline: run {} cannot complete in its current state", self.id);
            return false;
        }
        self.state = RunState::Completed(result);
        true
    }

    /// Fail the run.  Every stage that is not yet terminal is marked
    /// `Completed` with [`ERROR_STAGE_SUMMARY`], so no stage is left
    /// dangling.  Returns the stage transitions performed.
    pub fn fail(&mut self, error: PipelineError, result: SolveResult) -> Vec<StageTransition> {
        if !self.is_active() {
            return Vec::new();
        }

        let mut transitions = Vec::new();
        for (index, stage) in self.stages.iter_mut().enumerate() {
            if stage.status.is_terminal() {
                continue;
            }
            stage.status = StageStatus::Completed;
            stage.summary = Some(ERROR_STAGE_SUMMARY.to_string());
            transitions.push(StageTransition::Completed {
                index,
                stage: stage.name,
                summary: ERROR_STAGE_SUMMARY.to_string(),
            });
        }

        self.state = RunState::Errored { error, result };
        transitions
    }

    fn position(&self, status: StageStatus) -> Option<usize> {
        self.stages.iter().position(|s| s.status == status)
    }
}

// ---------------------------------------------------------------------------
// SharedRun
// ---------------------------------------------------------------------------

/// Handle to a run shared between the session and the pipeline task.
///
/// Lock with [`lock_run`] for a short critical section; do **not** hold the
/// lock across `.await` points.
pub type SharedRun = Arc<Mutex<PipelineRun>>;

pub fn new_shared_run(run: PipelineRun) -> SharedRun {
    Arc::new(Mutex::new(run))
}

/// Lock a shared run, recovering the data if a previous holder panicked.
pub fn lock_run(run: &SharedRun) -> MutexGuard<'_, PipelineRun> {
    run.lock().unwrap_or_else(PoisonError::into_inner)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
