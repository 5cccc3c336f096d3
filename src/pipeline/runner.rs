//! Pipeline orchestrator: one backend call, then a paced stage replay.
//!
//! [`PipelineOrchestrator`] drives a [`PipelineRun`] to a terminal state and
//! reports every transition as a [`PipelineEvent`] over an optional
//! `tokio::sync::mpsc` channel.
//!
//! # Pipeline flow
//!
//! ```text
//! drive(run)
//!   └─▶ backend.solve(request)                     [exactly once]
//!         ├─ Ok  → advance() ×10, pacing after each start
//!         │        └─▶ aggregate(response)          [Completed]
//!         └─ Err → fail(): all stages "Error occurred"
//!                  └─▶ failure_result(error)        [Errored]
//! ```
//!
//! The run lives behind a [`SharedRun`]; the lock is only taken for the
//! duration of a single transition and never across an `.await`.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;

use crate::backend::{SolveBackend, SolveRequest};
use crate::config::AppConfig;
use crate::hitl::HitlGate;
use crate::input::InputSample;

use super::error::PipelineError;
use super::result::{aggregate, failure_result, SolveResult};
use super::run::{
    lock_run, new_shared_run, PipelineRun, RunId, SharedRun, StagePlan, StageTransition,
};
use super::stage::StageName;

// ---------------------------------------------------------------------------
// PipelineEvent
// ---------------------------------------------------------------------------

/// Progress notifications delivered to observers (the rendering layer).
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineEvent {
    /// The request was dispatched to the backend.
    RunStarted { run_id: RunId, requires_hitl: bool },
    /// A stage became `Running`.
    StageStarted {
        run_id: RunId,
        index: usize,
        stage: StageName,
    },
    /// A stage became `Completed`.
    StageCompleted {
        run_id: RunId,
        index: usize,
        stage: StageName,
        summary: String,
    },
    /// The run finished with the backend's result.
    RunCompleted { run_id: RunId, result: SolveResult },
    /// The run failed; `result` is the synthesized failure payload.
    RunErrored {
        run_id: RunId,
        error: PipelineError,
        result: SolveResult,
    },
}

impl PipelineEvent {
    pub fn run_id(&self) -> RunId {
        match self {
            PipelineEvent::RunStarted { run_id, .. }
            | PipelineEvent::StageStarted { run_id, .. }
            | PipelineEvent::StageCompleted { run_id, .. }
            | PipelineEvent::RunCompleted { run_id, .. }
            | PipelineEvent::RunErrored { run_id, .. } => *run_id,
        }
    }

    fn from_transition(run_id: RunId, transition: StageTransition) -> Self {
        match transition {
            StageTransition::Started { index, stage } => PipelineEvent::StageStarted {
                run_id,
                index,
                stage,
            },
            StageTransition::Completed {
                index,
                stage,
                summary,
            } => PipelineEvent::StageCompleted {
                run_id,
                index,
                stage,
                summary,
            },
        }
    }
}

// ---------------------------------------------------------------------------
// PipelineOrchestrator
// ---------------------------------------------------------------------------

/// Drives pipeline runs against a [`SolveBackend`].
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use math_mentor::backend::HttpBackend;
/// use math_mentor::config::AppConfig;
/// use math_mentor::input::InputSample;
/// use math_mentor::pipeline::PipelineOrchestrator;
///
/// # async fn example() {
/// let config = AppConfig::default();
/// let backend = Arc::new(HttpBackend::from_config(&config.backend));
/// let orchestrator = PipelineOrchestrator::new(backend, &config);
///
/// let run = orchestrator.execute(1, InputSample::typed("2+2")).await.unwrap();
/// println!("{:?}", run.outcome());
/// # }
/// ```
pub struct PipelineOrchestrator {
    backend: Arc<dyn SolveBackend>,
    gate: HitlGate,
    stage_interval: Duration,
    events: Option<mpsc::Sender<PipelineEvent>>,
}

impl PipelineOrchestrator {
    /// Create an orchestrator using the pacing and HITL settings in `config`.
    pub fn new(backend: Arc<dyn SolveBackend>, config: &AppConfig) -> Self {
        Self {
            backend,
            gate: HitlGate::from_config(&config.hitl),
            stage_interval: config.pipeline.stage_interval(),
            events: None,
        }
    }

    /// Report progress on `events`.  Observers must keep draining the
    /// channel; a full channel pauses the run.
    pub fn with_events(mut self, events: mpsc::Sender<PipelineEvent>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn with_stage_interval(mut self, interval: Duration) -> Self {
        self.stage_interval = interval;
        self
    }

    pub fn gate(&self) -> &HitlGate {
        &self.gate
    }

    /// Run `input` through the pipeline and return the terminal run.
    ///
    /// Empty input is refused with [`PipelineError::NoInput`] before any run
    /// is created or the backend is contacted.
    pub async fn execute(&self, id: RunId, input: InputSample) -> Result<PipelineRun, PipelineError> {
        if input.is_empty() {
            return Err(PipelineError::NoInput);
        }
        let requires_hitl = self.gate.evaluate(&input);
        let run = new_shared_run(PipelineRun::start(id, input, requires_hitl));
        self.drive(Arc::clone(&run)).await;
        let snapshot = lock_run(&run).clone();
        Ok(snapshot)
    }

    /// Drive an already-started run to a terminal state.
    ///
    /// Does nothing if the run is not `Running`.
    pub async fn drive(&self, run: SharedRun) {
        let (run_id, request) = {
            let r = lock_run(&run);
            if !r.is_active() {
                return;
            }
            (r.id(), SolveRequest::from_sample(r.input(), r.requires_hitl()))
        };

        log::info!(
            "pipeline: run {run_id} started (mode={}, confidence={:.2}, hitl={})",
            request.input_mode,
            request.confidence,
            request.requires_hitl
        );
        self.emit(PipelineEvent::RunStarted {
            run_id,
            requires_hitl: request.requires_hitl,
        })
        .await;

        match self.backend.solve(&request).await {
            Ok(response) => {
                let plan = match response.agent_results.as_deref() {
                    Some(results) if !results.is_empty() => StagePlan::from_agent_results(results),
                    _ => StagePlan::generic(),
                };
                self.replay(&run, run_id, &plan).await;

                let result = aggregate(response, request.requires_hitl);
                let completed = lock_run(&run).complete(result.clone());
                if completed {
                    log::info!("pipeline: run {run_id} completed");
                    self.emit(PipelineEvent::RunCompleted { run_id, result }).await;
                }
            }
            Err(e) => {
                let error = PipelineError::from(e);
                log::error!("pipeline: run {run_id} failed: {error}");

                let result = failure_result(&error);
                let transitions = lock_run(&run).fail(error.clone(), result.clone());
                for transition in transitions {
                    self.emit(PipelineEvent::from_transition(run_id, transition))
                        .await;
                }
                self.emit(PipelineEvent::RunErrored {
                    run_id,
                    error,
                    result,
                })
                .await;
            }
        }
    }

    /// Advance the run one transition at a time, holding each stage in
    /// `Running` for the pacing interval.
    async fn replay(&self, run: &SharedRun, run_id: RunId, plan: &StagePlan) {
        loop {
            let transition = lock_run(run).advance(plan);
            let Some(transition) = transition else {
                break;
            };
            let started = matches!(transition, StageTransition::Started { .. });
            self.emit(PipelineEvent::from_transition(run_id, transition))
                .await;
            if started && !self.stage_interval.is_zero() {
                tokio::time::sleep(self.stage_interval).await;
            }
        }
    }

    async fn emit(&self, event: PipelineEvent) {
        if let Some(tx) = &self.events {
            let _ = tx.send(event).await;
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{sample_response, BackendError, MockBackend};
    use crate::input::InputMode;
    use crate::pipeline::result::VerificationStatus;
    use crate::pipeline::run::RunStatus;
    use crate::pipeline::stage::StageStatus;

    fn orchestrator(backend: Arc<MockBackend>) -> PipelineOrchestrator {
        PipelineOrchestrator::new(backend, &AppConfig::default())
            .with_stage_interval(Duration::ZERO)
    }

    fn drain(rx: &mut mpsc::Receiver<PipelineEvent>) -> Vec<PipelineEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    #[tokio::test]
    async fn text_question_completes_with_backend_result() {
        let backend = Arc::new(MockBackend::ok(sample_response()));
        let orc = orchestrator(Arc::clone(&backend));

        let run = orc.execute(1, InputSample::typed("2+2")).await.unwrap();

        assert_eq!(run.status(), RunStatus::Completed);
        assert!(!run.requires_hitl());
        let outcome = run.outcome().unwrap();
        assert_eq!(outcome.final_answer.expression, "4");
        assert!(!outcome.hitl_applied);
        assert_eq!(backend.calls(), 1);

        let request = backend.last_request().unwrap();
        assert_eq!(request.input_mode, InputMode::Text);
        assert_eq!(request.confidence, 1.0);
        assert!(!request.requires_hitl);
    }

    #[tokio::test]
    async fn stage_summaries_come_from_agent_results() {
        let backend = Arc::new(MockBackend::ok(sample_response()));
        let run = orchestrator(backend)
            .execute(1, InputSample::typed("2+2"))
            .await
            .unwrap();

        assert_eq!(
            run.stages()[2].summary.as_deref(),
            Some("Computed sum")
        );
        assert!(run
            .stages()
            .iter()
            .all(|s| s.status == StageStatus::Completed));
    }

    #[tokio::test]
    async fn response_without_agent_results_uses_generic_stages() {
        let mut response = sample_response();
        response.agent_results = None;
        let backend = Arc::new(MockBackend::ok(response));

        let run = orchestrator(backend)
            .execute(1, InputSample::typed("2+2"))
            .await
            .unwrap();

        assert_eq!(run.status(), RunStatus::Completed);
        assert_eq!(
            run.stages()[0].summary.as_deref(),
            Some("parser completed")
        );
    }

    #[tokio::test]
    async fn low_confidence_image_is_flagged_and_stamped() {
        let mut response = sample_response();
        response.hitl_applied = None;
        let backend = Arc::new(MockBackend::ok(response));

        let input = InputSample::acquired(InputMode::Image, "x^2 = 4", 0.60);
        let run = orchestrator(Arc::clone(&backend))
            .execute(7, input)
            .await
            .unwrap();

        assert!(run.requires_hitl());
        assert!(backend.last_request().unwrap().requires_hitl);
        assert!(run.outcome().unwrap().hitl_applied);
    }

    #[tokio::test]
    async fn network_failure_errors_the_run() {
        let backend = Arc::new(MockBackend::err(BackendError::Request(
            "connection refused".into(),
        )));

        let run = orchestrator(backend)
            .execute(1, InputSample::typed("2+2"))
            .await
            .unwrap();

        assert_eq!(run.status(), RunStatus::Errored);
        assert!(matches!(
            run.failure(),
            Some(PipelineError::NetworkFailure(_))
        ));
        let outcome = run.outcome().unwrap();
        assert_eq!(outcome.final_answer.confidence, 0.0);
        assert_eq!(outcome.verification.status, VerificationStatus::Failed);
        assert_eq!(outcome.verification.method, "error");
        assert!(!outcome.hitl_applied);
        assert!(run.all_stages_terminal());
    }

    #[tokio::test]
    async fn http_status_failure_is_a_backend_error() {
        let backend = Arc::new(MockBackend::err(BackendError::Status {
            status: 500,
            body: "boom".into(),
        }));

        let run = orchestrator(backend)
            .execute(1, InputSample::typed("2+2"))
            .await
            .unwrap();

        assert!(matches!(run.failure(), Some(PipelineError::BackendError(_))));
    }

    #[tokio::test]
    async fn empty_input_is_refused_without_calling_backend() {
        let backend = Arc::new(MockBackend::ok(sample_response()));
        let result = orchestrator(Arc::clone(&backend))
            .execute(1, InputSample::typed("   "))
            .await;

        assert_eq!(result.unwrap_err(), PipelineError::NoInput);
        assert_eq!(backend.calls(), 0);
    }

    #[tokio::test]
    async fn events_follow_strict_stage_order() {
        let (tx, mut rx) = mpsc::channel(64);
        let backend = Arc::new(MockBackend::ok(sample_response()));
        let orc = orchestrator(backend).with_events(tx);

        orc.execute(3, InputSample::typed("2+2")).await.unwrap();
        let events = drain(&mut rx);

        assert_eq!(events.len(), 12);
        assert!(matches!(events[0], PipelineEvent::RunStarted { run_id: 3, .. }));
        for (i, stage) in StageName::ALL.iter().enumerate() {
            assert!(matches!(
                &events[1 + 2 * i],
                PipelineEvent::StageStarted { index, stage: s, .. } if *index == i && s == stage
            ));
            assert!(matches!(
                &events[2 + 2 * i],
                PipelineEvent::StageCompleted { index, stage: s, .. } if *index == i && s == stage
            ));
        }
        assert!(matches!(events[11], PipelineEvent::RunCompleted { .. }));
        assert!(events.iter().all(|e| e.run_id() == 3));
    }

    #[tokio::test]
    async fn failure_events_complete_every_stage() {
        let (tx, mut rx) = mpsc::channel(64);
        let backend = Arc::new(MockBackend::err(BackendError::Timeout));
        let orc = orchestrator(backend).with_events(tx);

        orc.execute(1, InputSample::typed("2+2")).await.unwrap();
        let events = drain(&mut rx);

        let completed = events
            .iter()
            .filter(|e| {
                matches!(e, PipelineEvent::StageCompleted { summary, .. } if summary == "Error occurred")
            })
            .count();
        assert_eq!(completed, 5);
        assert!(!events
            .iter()
            .any(|e| matches!(e, PipelineEvent::StageStarted { .. })));
        assert!(matches!(
            events.last(),
            Some(PipelineEvent::RunErrored { .. })
        ));
    }

    #[tokio::test]
    async fn only_one_stage_running_while_paced() {
        let backend = Arc::new(MockBackend::ok(sample_response()));
        let orc = Arc::new(
            PipelineOrchestrator::new(backend, &AppConfig::default())
                .with_stage_interval(Duration::from_millis(5)),
        );
        let run = new_shared_run(PipelineRun::start(1, InputSample::typed("2+2"), false));

        let task = {
            let orc = Arc::clone(&orc);
            let run = Arc::clone(&run);
            tokio::spawn(async move { orc.drive(run).await })
        };

        while !task.is_finished() {
            {
                let r = lock_run(&run);
                let running = r
                    .stages()
                    .iter()
                    .filter(|s| s.status == StageStatus::Running)
                    .count();
                assert!(running <= 1);
            }
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
        task.await.unwrap();

        assert_eq!(lock_run(&run).status(), RunStatus::Completed);
    }

    #[tokio::test]
    async fn drive_ignores_terminal_runs() {
        let backend = Arc::new(MockBackend::ok(sample_response()));
        let orc = orchestrator(Arc::clone(&backend));
        let run = orc.execute(1, InputSample::typed("2+2")).await.unwrap();

        orc.drive(new_shared_run(run)).await;
        assert_eq!(backend.calls(), 1);
    }
}
