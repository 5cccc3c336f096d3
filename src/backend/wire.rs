//! JSON wire types for the solve backend.
//!
//! Field names follow the backend's camelCase JSON.  Everything except
//! `finalAnswer` is optional on the way in; the result aggregator fills the
//! gaps.

use serde::{Deserialize, Serialize};

use crate::input::{InputMode, InputSample};

/// Body of `POST /api/solve`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SolveRequest {
    pub text: String,
    pub input_mode: InputMode,
    pub confidence: f32,
    #[serde(rename = "requiresHITL")]
    pub requires_hitl: bool,
}

impl SolveRequest {
    pub fn from_sample(sample: &InputSample, requires_hitl: bool) -> Self {
        Self {
            text: sample.text().trim().to_string(),
            input_mode: sample.mode(),
            confidence: sample.confidence(),
            requires_hitl,
        }
    }
}

/// Successful solve response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SolveResponse {
    pub final_answer: FinalAnswerWire,
    #[serde(default)]
    pub steps: Vec<StepWire>,
    #[serde(default)]
    pub verification: Option<VerificationWire>,
    #[serde(default)]
    pub agent_trace: Vec<String>,
    #[serde(default)]
    pub hitl_applied: Option<bool>,
    #[serde(default)]
    pub agent_results: Option<Vec<AgentResultWire>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalAnswerWire {
    pub latex: String,
    #[serde(default)]
    pub confidence: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepWire {
    /// 1-based step number; `0` when the backend omitted it.
    #[serde(default)]
    pub step: u32,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub latex: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationWire {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub method: Option<String>,
}

/// Per-agent summary, in pipeline order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentResultWire {
    pub name: String,
    pub result: String,
    #[serde(default)]
    pub timestamp: Option<String>,
}

/// Body of `GET /api/health`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    #[serde(default)]
    pub model: Option<String>,
}
