//! Result aggregation: one fully-populated [`SolveResult`] shape for both
//! native backend answers and synthesized failures.

use serde::Serialize;

use crate::backend::{SolveResponse, VerificationWire};

use super::error::PipelineError;
use super::stage::StageName;

// ---------------------------------------------------------------------------
// SolveResult
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FinalAnswer {
    /// Renderable (LaTeX) expression of the answer.
    pub expression: String,
    pub confidence: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SolutionStep {
    /// 1-based position in the solution.
    pub index: u32,
    pub description: String,
    pub expression: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum VerificationStatus {
    Verified,
    Failed,
    Unknown,
}

impl VerificationStatus {
    /// Map a backend status string.  Anything that is neither a clear pass
    /// nor a clear fail (`needs_review`, `casual_response`, …) is `Unknown`.
    pub fn from_wire(status: &str) -> Self {
        match status.trim().to_ascii_lowercase().as_str() {
            "verified" => VerificationStatus::Verified,
            "failed" | "error" | "incorrect" => VerificationStatus::Failed,
            _ => VerificationStatus::Unknown,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Verification {
    pub status: VerificationStatus,
    pub method: String,
}

/// Per-agent summary as reported by the backend.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentSummary {
    pub name: String,
    pub result: String,
    pub timestamp: Option<String>,
}

/// The solved (or failed) question, ready for rendering.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SolveResult {
    pub final_answer: FinalAnswer,
    pub steps: Vec<SolutionStep>,
    pub verification: Verification,
    pub agent_trace: Vec<String>,
    pub hitl_applied: bool,
    pub agent_results: Vec<AgentSummary>,
}

// ---------------------------------------------------------------------------
// Aggregation
// ---------------------------------------------------------------------------

/// Summary recorded on every stage of a failed run.
pub const ERROR_STAGE_SUMMARY: &str = "Error occurred";

/// Verification method recorded on synthesized failure results.
pub const ERROR_METHOD: &str = "error";

/// Normalize a backend response.
///
/// `requires_hitl` is the gate decision for the submitted sample; it is used
/// when the backend does not report `hitlApplied` itself.
pub fn aggregate(response: SolveResponse, requires_hitl: bool) -> SolveResult {
    let steps = response
        .steps
        .into_iter()
        .enumerate()
        .map(|(i, step)| {
            let index = if step.step == 0 { i as u32 + 1 } else { step.step };
            SolutionStep {
                index,
                description: step
                    .description
                    .filter(|d| !d.trim().is_empty())
                    .unwrap_or_else(|| format!("Step {index}")),
                expression: step.latex,
            }
        })
        .collect();

    let verification = match response.verification {
        Some(VerificationWire { status, method }) => Verification {
            status: VerificationStatus::from_wire(&status),
            method: method
                .filter(|m| !m.trim().is_empty())
                .unwrap_or_else(|| "unspecified".into()),
        },
        None => Verification {
            status: VerificationStatus::Unknown,
            method: "unspecified".into(),
        },
    };

    let agent_trace = if response.agent_trace.is_empty() {
        StageName::ALL.iter().map(|s| s.as_str().to_string()).collect()
    } else {
        response.agent_trace
    };

    let agent_results = response
        .agent_results
        .unwrap_or_default()
        .into_iter()
        .map(|a| AgentSummary {
            name: a.name,
            result: a.result,
            timestamp: a.timestamp,
        })
        .collect();

    SolveResult {
        final_answer: FinalAnswer {
            expression: response.final_answer.latex,
            confidence: response.final_answer.confidence.clamp(0.0, 1.0),
        },
        steps,
        verification,
        agent_trace,
        hitl_applied: response.hitl_applied.unwrap_or(requires_hitl),
        agent_results,
    }
}

/// The result attached to a run whose backend call failed.
pub fn failure_result(error: &PipelineError) -> SolveResult {
    SolveResult {
        final_answer: FinalAnswer {
            expression: r"\text{Error}".into(),
            confidence: 0.0,
        },
        steps: vec![SolutionStep {
            index: 1,
            description: format!("The question could not be solved: {}", error.message()),
            expression: String::new(),
        }],
        verification: Verification {
            status: VerificationStatus::Failed,
            method: ERROR_METHOD.into(),
        },
        agent_trace: Vec::new(),
        hitl_applied: false,
        agent_results: Vec::new(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{sample_response, StepWire};

    #[test]
    fn native_result_is_carried_over() {
        let result = aggregate(sample_response(), false);

        assert_eq!(result.final_answer.expression, "4");
        assert!((result.final_answer.confidence - 0.95).abs() < 1e-6);
        assert_eq!(result.steps[0].index, 1);
        assert_eq!(result.verification.status, VerificationStatus::Verified);
        assert_eq!(result.verification.method, "direct computation");
        assert_eq!(result.agent_trace.len(), 5);
        assert_eq!(result.agent_results.len(), 5);
    }

    #[test]
    fn hitl_flag_falls_back_to_gate_decision() {
        assert!(aggregate(sample_response(), true).hitl_applied);
        assert!(!aggregate(sample_response(), false).hitl_applied);
    }

    #[test]
    fn backend_hitl_flag_wins() {
        let mut response = sample_response();
        response.hitl_applied = Some(false);
        assert!(!aggregate(response, true).hitl_applied);
    }

    #[test]
    fn missing_step_numbers_and_descriptions_are_filled() {
        let mut response = sample_response();
        response.steps = vec![
            StepWire {
                step: 0,
                description: None,
                latex: "a".into(),
            },
            StepWire {
                step: 0,
                description: Some("  ".into()),
                latex: "b".into(),
            },
        ];

        let result = aggregate(response, false);
        assert_eq!(result.steps[0].index, 1);
        assert_eq!(result.steps[1].index, 2);
        assert_eq!(result.steps[1].description, "Step 2");
    }

    #[test]
    fn missing_verification_and_trace_are_filled() {
        let mut response = sample_response();
        response.verification = None;
        response.agent_trace.clear();

        let result = aggregate(response, false);
        assert_eq!(result.verification.status, VerificationStatus::Unknown);
        assert_eq!(result.verification.method, "unspecified");
        assert_eq!(
            result.agent_trace,
            ["parser", "router", "solver", "verifier", "explainer"]
        );
    }

    #[test]
    fn verification_status_mapping() {
        assert_eq!(VerificationStatus::from_wire("verified"), VerificationStatus::Verified);
        assert_eq!(VerificationStatus::from_wire("Verified "), VerificationStatus::Verified);
        assert_eq!(VerificationStatus::from_wire("failed"), VerificationStatus::Failed);
        assert_eq!(VerificationStatus::from_wire("needs_review"), VerificationStatus::Unknown);
        assert_eq!(
            VerificationStatus::from_wire("casual_response"),
            VerificationStatus::Unknown
        );
    }

    #[test]
    fn failure_result_shape() {
        let error = PipelineError::NetworkFailure("connection refused".into());
        let result = failure_result(&error);

        assert_eq!(result.final_answer.confidence, 0.0);
        assert_eq!(result.steps.len(), 1);
        assert_eq!(result.steps[0].index, 1);
        assert!(result.steps[0].description.contains("connection refused"));
        assert_eq!(result.verification.status, VerificationStatus::Failed);
        assert_eq!(result.verification.method, "error");
        assert!(!result.hitl_applied);
    }

    #[test]
    fn serializes_camel_case() {
        let json = serde_json::to_value(aggregate(sample_response(), true)).unwrap();
        assert_eq!(json["finalAnswer"]["expression"], "4");
        assert_eq!(json["hitlApplied"], true);
        assert_eq!(json["verification"]["status"], "verified");
    }
}
