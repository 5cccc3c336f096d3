//! Confidence-gated solve pipeline for a math tutoring client.
//!
//! Input arrives as typed text, OCR output or a speech transcript
//! ([`input`]), is gated for human review ([`hitl`]), and is sent once to a
//! remote solver ([`backend`]) whose answer is replayed through five agent
//! stages ([`pipeline`]).  [`session`] ties these together for a single user.

pub mod asr;
pub mod backend;
pub mod config;
pub mod hitl;
pub mod input;
pub mod ocr;
pub mod pipeline;
pub mod session;
