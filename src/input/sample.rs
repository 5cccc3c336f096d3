//! The normalized input sample handed to the HITL gate and the pipeline.

use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// InputMode
// ---------------------------------------------------------------------------

/// How the question was acquired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputMode {
    /// Typed directly by the user.
    #[default]
    Text,
    /// Extracted from an uploaded image by OCR.
    Image,
    /// Transcribed from a voice recording by ASR.
    Voice,
}

impl InputMode {
    /// Wire name used in solve requests.
    pub fn as_str(&self) -> &'static str {
        match self {
            InputMode::Text => "text",
            InputMode::Image => "image",
            InputMode::Voice => "voice",
        }
    }

    /// The acquisition source this mode produces once text is available.
    pub fn source(&self) -> SampleSource {
        match self {
            InputMode::Text => SampleSource::UserTyped,
            InputMode::Image => SampleSource::Ocr,
            InputMode::Voice => SampleSource::Asr,
        }
    }
}

impl fmt::Display for InputMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// SampleSource
// ---------------------------------------------------------------------------

/// Where the sample's text came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SampleSource {
    UserTyped,
    Ocr,
    Asr,
}

// ---------------------------------------------------------------------------
// InputSample
// ---------------------------------------------------------------------------

/// A uniform `(text, confidence, source)` view over any acquisition mode.
///
/// Invariants, upheld by every constructor and by
/// [`InputSampleBuilder`](crate::input::InputSampleBuilder):
///
/// * `Text` mode always has confidence `1.0` and source `UserTyped`.
/// * `Image` mode has source `Ocr` once an extraction has succeeded.
/// * `Voice` mode has source `Asr` once a recording has started.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InputSample {
    pub(crate) text: String,
    pub(crate) mode: InputMode,
    pub(crate) confidence: f32,
    pub(crate) source: Option<SampleSource>,
}

impl InputSample {
    /// An empty sample for `mode`, as produced by a mode switch.
    pub fn empty(mode: InputMode) -> Self {
        Self {
            text: String::new(),
            mode,
            confidence: 1.0,
            source: match mode {
                InputMode::Text => Some(SampleSource::UserTyped),
                InputMode::Image | InputMode::Voice => None,
            },
        }
    }

    /// A typed sample.
    ///
    /// ```
    /// use math_mentor::input::{InputMode, InputSample};
    ///
    /// let sample = InputSample::typed("2+2");
    /// assert_eq!(sample.mode(), InputMode::Text);
    /// assert_eq!(sample.confidence(), 1.0);
    /// ```
    pub fn typed(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::empty(InputMode::Text)
        }
    }

    /// A sample whose text was already acquired through `mode`.
    ///
    /// `confidence` is clamped to `0.0..=1.0`; it is ignored for `Text`.
    pub fn acquired(mode: InputMode, text: impl Into<String>, confidence: f32) -> Self {
        let confidence = match mode {
            InputMode::Text => 1.0,
            InputMode::Image | InputMode::Voice => clamp_unit(confidence),
        };
        Self {
            text: text.into(),
            mode,
            confidence,
            source: Some(mode.source()),
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn mode(&self) -> InputMode {
        self.mode
    }

    pub fn confidence(&self) -> f32 {
        self.confidence
    }

    pub fn source(&self) -> Option<SampleSource> {
        self.source
    }

    /// `true` when there is nothing worth submitting.
    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty()
    }
}

impl Default for InputSample {
    fn default() -> Self {
        Self::empty(InputMode::Text)
    }
}

pub(crate) fn clamp_unit(value: f32) -> f32 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}
