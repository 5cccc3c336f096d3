//! Session controller: one input sample, at most one pipeline run.
//!
//! The controller is the single owner of user-facing state.  Input operations
//! are forwarded to the [`InputSampleBuilder`]; [`SessionController::submit`]
//! snapshots the sample, gates it, and spawns the orchestrator on the tokio
//! runtime.  The spawned task and the controller share the run through a
//! [`SharedRun`].

use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::asr::AsrEvent;
use crate::config::AppConfig;
use crate::input::{AcquisitionError, InputMode, InputSample, InputSampleBuilder};
use crate::ocr::OcrEngine;
use crate::pipeline::{
    lock_run, new_shared_run, PipelineOrchestrator, PipelineRun, RunId, RunStatus, SharedRun,
};

// ---------------------------------------------------------------------------
// RunHandle
// ---------------------------------------------------------------------------

/// Returned by [`SessionController::submit`] for callers that want to await
/// the run.
pub struct RunHandle {
    id: RunId,
    run: SharedRun,
    task: JoinHandle<()>,
}

impl RunHandle {
    pub fn id(&self) -> RunId {
        self.id
    }

    /// Current state of the run.
    pub fn snapshot(&self) -> PipelineRun {
        lock_run(&self.run).clone()
    }

    /// Wait for the pipeline task to finish and return the terminal run.
    pub async fn wait(self) -> PipelineRun {
        if let Err(e) = self.task.await {
            log::error!("session: pipeline task for run {} ended abnormally: {e}", self.id);
        }
        lock_run(&self.run).clone()
    }
}

// ---------------------------------------------------------------------------
// SessionController
// ---------------------------------------------------------------------------

pub struct SessionController {
    input: InputSampleBuilder,
    orchestrator: Arc<PipelineOrchestrator>,
    run: Option<SharedRun>,
    next_run_id: RunId,
}

impl SessionController {
    pub fn new(config: &AppConfig, orchestrator: PipelineOrchestrator) -> Self {
        Self {
            input: InputSampleBuilder::from_config(config),
            orchestrator: Arc::new(orchestrator),
            run: None,
            next_run_id: 1,
        }
    }

    // -----------------------------------------------------------------------
    // Input
    // -----------------------------------------------------------------------

    pub fn input(&self) -> &InputSampleBuilder {
        &self.input
    }

    pub fn sample(&self) -> &InputSample {
        self.input.sample()
    }

    pub fn switch_mode(&mut self, mode: InputMode) {
        self.input.switch_mode(mode);
    }

    pub fn edit_text(&mut self, text: impl Into<String>) -> Result<(), AcquisitionError> {
        self.input.edit_text(text)
    }

    pub async fn extract_image(
        &mut self,
        ocr: &dyn OcrEngine,
        image: &[u8],
    ) -> Result<(), AcquisitionError> {
        self.input.extract_image(ocr, image).await
    }

    pub fn start_recording(&mut self) -> Result<(), AcquisitionError> {
        self.input.start_recording()
    }

    pub fn apply_asr_event(&mut self, event: &AsrEvent) -> Result<(), AcquisitionError> {
        self.input.apply_asr_event(event)
    }

    pub fn stop_recording(&mut self) {
        self.input.stop_recording();
    }

    // -----------------------------------------------------------------------
    // HITL
    // -----------------------------------------------------------------------

    /// Whether the current sample would be flagged for review on submit.
    pub fn requires_hitl(&self) -> bool {
        self.orchestrator.gate().evaluate(self.input.sample())
    }

    pub fn hitl_warning(&self) -> Option<String> {
        self.orchestrator.gate().warning(self.input.sample())
    }

    // -----------------------------------------------------------------------
    // Runs
    // -----------------------------------------------------------------------

    pub fn status(&self) -> RunStatus {
        self.run
            .as_ref()
            .map(|run| lock_run(run).status())
            .unwrap_or_default()
    }

    pub fn is_running(&self) -> bool {
        self.status().is_busy()
    }

    /// Snapshot of the current (or last) run.
    pub fn current_run(&self) -> Option<PipelineRun> {
        self.run.as_ref().map(|run| lock_run(run).clone())
    }

    pub fn can_submit(&self) -> bool {
        !self.input.sample().is_empty() && !self.is_running()
    }

    /// Submit the current sample.
    ///
    /// Returns `None` without side effects when the text is empty or a run is
    /// already in flight.  Must be called from within a tokio runtime.
    pub fn submit(&mut self) -> Option<RunHandle> {
        if self.input.sample().is_empty() {
            log::debug!("session: submit ignored, no input");
            return None;
        }
        if self.is_running() {
            log::debug!("session: submit ignored, run in progress");
            return None;
        }

        let id = self.next_run_id;
        self.next_run_id += 1;

        let sample = self.input.sample().clone();
        let requires_hitl = self.orchestrator.gate().evaluate(&sample);
        let run = new_shared_run(PipelineRun::start(id, sample, requires_hitl));
        self.run = Some(Arc::clone(&run));

        let task = {
            let orchestrator = Arc::clone(&self.orchestrator);
            let run = Arc::clone(&run);
            tokio::spawn(async move { orchestrator.drive(run).await })
        };

        Some(RunHandle { id, run, task })
    }

    /// Discard the sample and the run.  An in-flight run is abandoned: its
    /// task finishes on its own but is no longer visible to the session.
    pub fn reset(&mut self) {
        if let Some(run) = self.run.take() {
            let r = lock_run(&run);
            if r.is_active() {
                log::warn!("session: abandoning in-flight run {}", r.id());
            }
        }
        self.input.reset();
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
