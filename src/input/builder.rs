//! Turns typed text, OCR output and speech transcripts into an
//! [`InputSample`].
//!
//! # Acquisition flow
//!
//! ```text
//! Text   edit_text ─────────────────────────────▶ text, confidence 1.0
//!
//! Image  begin_extraction ─▶ extracting
//!        apply_ocr(Ok)    ─▶ trimmed text, confidence = ocr / 100, editable
//!        apply_ocr(Err)   ─▶ empty text, confidence 0, failure returned
//!
//! Voice  start_recording  ─▶ recording
//!        apply_asr_event  ─▶ finals appended, running mean confidence
//!        stop_recording   ─▶ sample finalized, editable
//! ```
//!
//! Acquisition failures never escape as anything but a returned
//! [`AcquisitionError`]; the sample itself always stays in a submittable or
//! clearly-empty state.

use thiserror::Error;

use crate::asr::{AsrEvent, RecognitionFailure, VoiceSession};
use crate::config::AppConfig;
use crate::ocr::{OcrEngine, OcrError, OcrOutput};

use super::sample::{InputMode, InputSample, SampleSource};

// ---------------------------------------------------------------------------
// AcquisitionError
// ---------------------------------------------------------------------------

/// Recoverable acquisition failures.  The user may retry or switch mode.
#[derive(Debug, Clone, Error)]
pub enum AcquisitionError {
    /// The operation belongs to a different input mode.
    #[error("operation requires {expected} mode, current mode is {actual}")]
    WrongMode {
        expected: InputMode,
        actual: InputMode,
    },

    /// An extraction or recording is still in progress.
    #[error("an acquisition is already in progress")]
    Busy,

    /// A collaborator result arrived with nothing pending to receive it.
    #[error("no acquisition is in progress")]
    NotPending,

    #[error(transparent)]
    Ocr(#[from] OcrError),

    #[error(transparent)]
    Recognition(#[from] RecognitionFailure),
}

// ---------------------------------------------------------------------------
// InputSampleBuilder
// ---------------------------------------------------------------------------

/// Owns the current [`InputSample`] and the transient acquisition state
/// (`extracting` flag, active recording).
#[derive(Debug, Clone)]
pub struct InputSampleBuilder {
    sample: InputSample,
    extracting: bool,
    recording: Option<VoiceSession>,
    interim: String,
    ocr_language: String,
    asr_default_confidence: f32,
}

impl InputSampleBuilder {
    /// Create a builder in Text mode using the acquisition settings from
    /// `config`.
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            sample: InputSample::default(),
            extracting: false,
            recording: None,
            interim: String::new(),
            ocr_language: config.ocr.language.clone(),
            asr_default_confidence: config.asr.default_confidence,
        }
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    pub fn sample(&self) -> &InputSample {
        &self.sample
    }

    pub fn mode(&self) -> InputMode {
        self.sample.mode
    }

    /// `true` while an OCR call is pending.
    pub fn is_extracting(&self) -> bool {
        self.extracting
    }

    /// `true` while a voice recording is active.
    pub fn is_recording(&self) -> bool {
        self.recording.is_some()
    }

    /// Provisional ASR text, for display only.
    pub fn interim(&self) -> &str {
        &self.interim
    }

    /// Whether the user may edit the text right now.
    pub fn is_editable(&self) -> bool {
        !self.extracting && self.recording.is_none()
    }

    // -----------------------------------------------------------------------
    // Mode and text
    // -----------------------------------------------------------------------

    /// Switch input mode, discarding all text and acquisition state.
    pub fn switch_mode(&mut self, mode: InputMode) {
        log::debug!("input: switching mode {} -> {}", self.sample.mode, mode);
        self.clear(mode);
    }

    /// Return to an empty Text-mode sample.
    pub fn reset(&mut self) {
        self.clear(InputMode::Text);
    }

    /// Replace the sample text with a manual edit.
    ///
    /// In Text mode this is every keystroke.  In Image and Voice mode it is a
    /// correction of acquired text; confidence keeps describing acquisition
    /// quality and is left unchanged.
    pub fn edit_text(&mut self, text: impl Into<String>) -> Result<(), AcquisitionError> {
        if !self.is_editable() {
            return Err(AcquisitionError::Busy);
        }
        self.sample.text = text.into();
        if self.sample.mode == InputMode::Text {
            self.sample.confidence = 1.0;
            self.sample.source = Some(SampleSource::UserTyped);
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Image
    // -----------------------------------------------------------------------

    /// Mark an OCR call as pending.  Text and confidence are untouched.
    pub fn begin_extraction(&mut self) -> Result<(), AcquisitionError> {
        self.require_mode(InputMode::Image)?;
        if self.extracting {
            return Err(AcquisitionError::Busy);
        }
        self.extracting = true;
        Ok(())
    }

    /// Apply the OCR collaborator's result to a pending extraction.
    ///
    /// A late or duplicate result is refused with
    /// [`AcquisitionError::NotPending`] and leaves the sample untouched.
    pub fn apply_ocr(
        &mut self,
        result: Result<OcrOutput, OcrError>,
    ) -> Result<(), AcquisitionError> {
        self.require_mode(InputMode::Image)?;
        if !self.extracting {
            log::debug!("input: ignoring OCR result, no extraction pending");
            return Err(AcquisitionError::NotPending);
        }
        self.extracting = false;

        match result {
            Ok(output) => {
                self.sample.text = output.text.trim().to_string();
                self.sample.confidence = output.normalized_confidence();
                self.sample.source = Some(SampleSource::Ocr);
                log::debug!(
                    "input: OCR extracted {} chars at confidence {:.2}",
                    self.sample.text.len(),
                    self.sample.confidence
                );
                Ok(())
            }
            Err(e) => {
                log::warn!("input: OCR failed: {e}");
                self.sample.text.clear();
                self.sample.confidence = 0.0;
                Err(e.into())
            }
        }
    }

    /// Run `ocr` over `image` and apply the result.
    pub async fn extract_image(
        &mut self,
        ocr: &dyn OcrEngine,
        image: &[u8],
    ) -> Result<(), AcquisitionError> {
        self.begin_extraction()?;
        let result = ocr.recognize(image, &self.ocr_language).await;
        self.apply_ocr(result)
    }

    // -----------------------------------------------------------------------
    // Voice
    // -----------------------------------------------------------------------

    /// Begin a new recording session.  Any previous transcript is discarded.
    pub fn start_recording(&mut self) -> Result<(), AcquisitionError> {
        self.require_mode(InputMode::Voice)?;
        if self.recording.is_some() {
            return Err(AcquisitionError::Busy);
        }
        self.sample.text.clear();
        self.sample.confidence = 1.0;
        self.sample.source = Some(SampleSource::Asr);
        self.interim.clear();
        self.recording = Some(VoiceSession::new(self.asr_default_confidence));
        log::debug!("input: recording started");
        Ok(())
    }

    /// Fold one recogniser event into the active recording.
    ///
    /// Events arriving after the recording stopped are ignored.  An error
    /// event ends the recording, keeps whatever was already finalized, and
    /// returns the mapped [`RecognitionFailure`].
    pub fn apply_asr_event(&mut self, event: &AsrEvent) -> Result<(), AcquisitionError> {
        let Some(session) = self.recording.as_mut() else {
            log::debug!("input: ignoring ASR event, not recording");
            return Ok(());
        };

        match event {
            AsrEvent::Results(results) => {
                session.apply(results);
                self.sample.text = session.transcript().to_string();
                if let Some(confidence) = session.confidence() {
                    self.sample.confidence = confidence;
                }
                self.interim = session.interim().to_string();
                Ok(())
            }
            AsrEvent::Error(code) => {
                let failure = RecognitionFailure::from_code(code);
                log::warn!("input: recognition ended: {failure}");
                self.stop_recording();
                Err(failure.into())
            }
        }
    }

    /// Stop recording and finalize the sample.  Editing is enabled again.
    ///
    /// A recording that produced no final result has confidence `0`, so
    /// anything typed in its place is still flagged for review.
    pub fn stop_recording(&mut self) {
        if let Some(session) = self.recording.take() {
            self.sample.text = session.transcript().trim().to_string();
            self.sample.confidence = session.confidence().unwrap_or(0.0);
            self.interim.clear();
            log::debug!(
                "input: recording stopped with {} final fragment(s)",
                session.final_count()
            );
        }
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    fn clear(&mut self, mode: InputMode) {
        self.sample = InputSample::empty(mode);
        self.extracting = false;
        self.recording = None;
        self.interim.clear();
    }

    fn require_mode(&self, expected: InputMode) -> Result<(), AcquisitionError> {
        if self.sample.mode != expected {
            return Err(AcquisitionError::WrongMode {
                expected,
                actual: self.sample.mode,
            });
        }
        Ok(())
    }
}

impl Default for InputSampleBuilder {
    fn default() -> Self {
        Self::from_config(&AppConfig::default())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
