//! Core OCR engine trait and output types.
//!
//! [`OcrEngine`] is the interface the input builder uses to turn an uploaded
//! image into text.  It is object-safe and `Send + Sync` so it can be held
//! behind an `Arc<dyn OcrEngine>`.
//!
//! [`MockOcrEngine`] (available under `#[cfg(test)]`) returns a pre-configured
//! response, which is enough to unit-test acquisition without a real engine.

use async_trait::async_trait;
use thiserror::Error;

// ---------------------------------------------------------------------------
// OcrError
// ---------------------------------------------------------------------------

/// Errors reported by an OCR engine.
#[derive(Debug, Clone, Error)]
pub enum OcrError {
    /// The image could not be decoded (unsupported format, truncated file).
    #[error("unsupported or corrupt image: {0}")]
    UnsupportedImage(String),

    /// The engine failed while recognising text.
    #[error("OCR engine failed: {0}")]
    Engine(String),
}

// ---------------------------------------------------------------------------
// OcrOutput
// ---------------------------------------------------------------------------

/// Raw engine output: recognised text and a confidence on the engine's
/// native `0..=100` scale.
#[derive(Debug, Clone, PartialEq)]
pub struct OcrOutput {
    pub text: String,
    pub confidence: f32,
}

impl OcrOutput {
    /// Confidence rescaled to `0.0..=1.0`.
    ///
    /// Out-of-range values are clamped; `NaN` maps to `0.0`.
    ///
    /// ```
    /// use math_mentor::ocr::OcrOutput;
    ///
    /// let out = OcrOutput { text: "x^2".into(), confidence: 60.0 };
    /// assert!((out.normalized_confidence() - 0.60).abs() < 1e-6);
    /// ```
    pub fn normalized_confidence(&self) -> f32 {
        if self.confidence.is_nan() {
            return 0.0;
        }
        (self.confidence / 100.0).clamp(0.0, 1.0)
    }
}

// ---------------------------------------------------------------------------
// OcrEngine trait
// ---------------------------------------------------------------------------

/// Object-safe, thread-safe interface for OCR engines.
///
/// # Arguments
/// * `image`    – raw image file bytes as selected by the user.
/// * `language` – engine language tag (e.g. `"eng"`).
#[async_trait]
pub trait OcrEngine: Send + Sync {
    async fn recognize(&self, image: &[u8], language: &str) -> Result<OcrOutput, OcrError>;
}

// ---------------------------------------------------------------------------
// MockOcrEngine  (test-only)
// ---------------------------------------------------------------------------

/// A test double that always returns the same response.
#[cfg(test)]
pub struct MockOcrEngine {
    response: Result<OcrOutput, OcrError>,
}

#[cfg(test)]
impl MockOcrEngine {
    /// Create a mock that always returns `text` with `confidence` (0..100).
    pub fn ok(text: impl Into<String>, confidence: f32) -> Self {
        Self {
            response: Ok(OcrOutput {
                text: text.into(),
                confidence,
            }),
        }
    }

    /// Create a mock that always returns `Err(error)`.
    pub fn err(error: OcrError) -> Self {
        Self {
            response: Err(error),
        }
    }
}

#[cfg(test)]
#[async_trait]
impl OcrEngine for MockOcrEngine {
    async fn recognize(&self, image: &[u8], _language: &str) -> Result<OcrOutput, OcrError> {
        if image.is_empty() {
            return Err(OcrError::UnsupportedImage("empty file".into()));
        }
        self.response.clone()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn output(confidence: f32) -> OcrOutput {
        OcrOutput {
            text: "x".into(),
            confidence,
        }
    }

    #[test]
    fn confidence_is_scaled_to_unit_range() {
        assert!((output(0.0).normalized_confidence() - 0.0).abs() < f32::EPSILON);
        assert!((output(75.0).normalized_confidence() - 0.75).abs() < 1e-6);
        assert!((output(100.0).normalized_confidence() - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn out_of_range_confidence_is_clamped() {
        assert_eq!(output(140.0).normalized_confidence(), 1.0);
        assert_eq!(output(-3.0).normalized_confidence(), 0.0);
        assert_eq!(output(f32::NAN).normalized_confidence(), 0.0);
    }

    #[tokio::test]
    async fn mock_returns_configured_output() {
        let engine = MockOcrEngine::ok("2x + 3 = 7", 91.0);
        let out = engine.recognize(b"png", "eng").await.unwrap();
        assert_eq!(out.text, "2x + 3 = 7");
        assert_eq!(out.confidence, 91.0);
    }

    #[tokio::test]
    async fn mock_rejects_empty_image() {
        let engine = MockOcrEngine::ok("ignored", 99.0);
        let err = engine.recognize(&[], "eng").await.unwrap_err();
        assert!(matches!(err, OcrError::UnsupportedImage(_)));
    }

    #[test]
    fn box_dyn_ocr_engine_compiles() {
        let _engine: Box<dyn OcrEngine> = Box::new(MockOcrEngine::err(OcrError::Engine(
            "offline".into(),
        )));
    }
}
