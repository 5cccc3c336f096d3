//! Remote solving backend.
//!
//! * [`SolveBackend`]: async trait implemented by every backend.
//! * [`HttpBackend`]: JSON-over-HTTP client for `POST /api/solve`.
//! * [`SolveRequest`] / [`SolveResponse`]: wire types.
//! * [`BackendError`]: transport, status and decoding failures.

pub mod client;
pub mod wire;

pub use client::{BackendError, HttpBackend, SolveBackend};
pub use wire::{
    AgentResultWire, FinalAnswerWire, HealthStatus, SolveRequest, SolveResponse, StepWire,
    VerificationWire,
};

#[cfg(test)]
pub use client::{sample_response, MockBackend};
