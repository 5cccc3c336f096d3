//! Events delivered by a speech-recognition session.
//!
//! A recognition session emits a stream of [`AsrEvent`]s.  Each
//! `Results` event carries one or more [`AsrResult`]s, which are either
//! *interim* (provisional, may still change) or *final* (committed, usually
//! carrying a confidence).  A session ends with an `Error` event when the
//! recogniser gives up.

use thiserror::Error;

/// One recognition hypothesis.
#[derive(Debug, Clone, PartialEq)]
pub struct AsrAlternative {
    pub transcript: String,
    /// Recogniser confidence in `0.0..=1.0`, when the engine reports one.
    pub confidence: Option<f32>,
}

/// One recognition result; only the first alternative is used.
#[derive(Debug, Clone, PartialEq)]
pub struct AsrResult {
    pub is_final: bool,
    pub alternatives: Vec<AsrAlternative>,
}

impl AsrResult {
    pub fn interim(transcript: impl Into<String>) -> Self {
        Self {
            is_final: false,
            alternatives: vec![AsrAlternative {
                transcript: transcript.into(),
                confidence: None,
            }],
        }
    }

    pub fn final_result(transcript: impl Into<String>, confidence: Option<f32>) -> Self {
        Self {
            is_final: true,
            alternatives: vec![AsrAlternative {
                transcript: transcript.into(),
                confidence,
            }],
        }
    }

    /// The best alternative, if the recogniser produced any.
    pub fn best(&self) -> Option<&AsrAlternative> {
        self.alternatives.first()
    }
}

/// A unit of delivery from the recogniser.
#[derive(Debug, Clone, PartialEq)]
pub enum AsrEvent {
    /// New or updated results for the current session.
    Results(Vec<AsrResult>),
    /// The recogniser stopped with an error code (e.g. `"no-speech"`).
    Error(String),
}

// ---------------------------------------------------------------------------
// RecognitionFailure
// ---------------------------------------------------------------------------

/// Reasons a recording session can fail.  All are recoverable: the user can
/// start a new recording or switch input mode.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecognitionFailure {
    #[error("no speech was detected")]
    NoSpeech,

    #[error("no microphone was found")]
    NoDevice,

    #[error("microphone permission was denied")]
    PermissionDenied,

    #[error("speech recognition failed: {0}")]
    Other(String),
}

impl RecognitionFailure {
    /// Map a recogniser error code to a failure reason.
    ///
    /// ```
    /// use math_mentor::asr::RecognitionFailure;
    ///
    /// assert_eq!(RecognitionFailure::from_code("no-speech"), RecognitionFailure::NoSpeech);
    /// assert_eq!(RecognitionFailure::from_code("audio-capture"), RecognitionFailure::NoDevice);
    /// ```
    pub fn from_code(code: &str) -> Self {
        match code {
            "no-speech" => Self::NoSpeech,
            "audio-capture" => Self::NoDevice,
            "not-allowed" | "service-not-allowed" => Self::PermissionDenied,
            other => Self::Other(other.to_string()),
        }
    }
}
