//! Five-stage solve pipeline.
//!
//! # Architecture
//!
//! ```text
//! InputSample ──submit──▶ PipelineOrchestrator::drive()   ← tokio task
//!                               │
//!                               ├─ SolveBackend::solve        (once)
//!                               ├─ PipelineRun::advance ×10    parser → router
//!                               │                              → solver → verifier
//!                               │                              → explainer
//!                               └─ aggregate / failure_result
//!
//! SharedRun (Arc<Mutex<PipelineRun>>) ←── read by the session / observers
//! PipelineEvent (mpsc)               ──▶ rendering layer
//! ```

pub mod error;
pub mod result;
pub mod run;
pub mod runner;
pub mod stage;

// ---------------------------------------------------------------------------
// Public re-exports
// ---------------------------------------------------------------------------

pub use error::{PipelineError, PipelineErrorKind};
pub use result::{
    aggregate, failure_result, AgentSummary, FinalAnswer, SolutionStep, SolveResult,
    Verification, VerificationStatus,
};
pub use run::{
    lock_run, new_shared_run, PipelineRun, RunId, RunState, RunStatus, SharedRun, StagePlan,
    StageTransition,
};
pub use runner::{PipelineEvent, PipelineOrchestrator};
pub use stage::{AgentStage, StageName, StageStatus};
