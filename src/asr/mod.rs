//! Speech-recognition collaborator vocabulary.
//!
//! The recogniser itself is external.  This module defines the events it
//! delivers ([`AsrEvent`]), the failure reasons they map to
//! ([`RecognitionFailure`]), and [`VoiceSession`], which folds final results
//! into a transcript with a running mean confidence.

pub mod events;
pub mod session;

pub use events::{AsrAlternative, AsrEvent, AsrResult, RecognitionFailure};
pub use session::VoiceSession;
