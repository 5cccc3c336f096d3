//! OCR collaborator interface.
//!
//! The OCR engine itself lives outside this crate; only the contract the
//! input builder consumes is defined here.

pub mod engine;

pub use engine::{OcrEngine, OcrError, OcrOutput};

#[cfg(test)]
pub use engine::MockOcrEngine;
