//! Human-in-the-loop review gate.
//!
//! Image and voice input below the confidence threshold is flagged for human
//! review.  The flag is advisory: it drives a warning and is forwarded to the
//! backend, but it never blocks submission.  Typed text is never flagged.

use crate::config::HitlConfig;
use crate::input::{InputMode, InputSample};

/// Confidence below which acquired input needs review.
pub const HITL_THRESHOLD: f32 = 0.75;

/// Pure gating policy using the default [`HITL_THRESHOLD`].
///
/// ```
/// use math_mentor::hitl::requires_hitl;
/// use math_mentor::input::InputMode;
///
/// assert!(requires_hitl(InputMode::Image, 0.60));
/// assert!(!requires_hitl(InputMode::Voice, 0.75));
/// assert!(!requires_hitl(InputMode::Text, 0.0));
/// ```
pub fn requires_hitl(mode: InputMode, confidence: f32) -> bool {
    HitlGate::default().requires_review(mode, confidence)
}

/// The gating policy with a configurable threshold.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HitlGate {
    threshold: f32,
}

impl HitlGate {
    pub fn new(threshold: f32) -> Self {
        Self { threshold }
    }

    pub fn from_config(config: &HitlConfig) -> Self {
        Self::new(config.threshold)
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    pub fn requires_review(&self, mode: InputMode, confidence: f32) -> bool {
        match mode {
            InputMode::Text => false,
            InputMode::Image | InputMode::Voice => confidence < self.threshold,
        }
    }

    pub fn evaluate(&self, sample: &InputSample) -> bool {
        self.requires_review(sample.mode(), sample.confidence())
    }

    /// Warning to show next to the input, if the sample needs review.
    pub fn warning(&self, sample: &InputSample) -> Option<String> {
        if !self.evaluate(sample) {
            return None;
        }
        let what = match sample.mode() {
            InputMode::Image => "extracted text",
            _ => "transcript",
        };
        Some(format!(
            "Low confidence ({:.0}%): please review the {what} before submitting",
            sample.confidence() * 100.0
        ))
    }
}

impl Default for HitlGate {
    fn default() -> Self {
        Self::new(HITL_THRESHOLD)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_is_never_gated() {
        for confidence in [0.0, 0.1, 0.5, 0.74, 0.75, 1.0] {
            assert!(!requires_hitl(InputMode::Text, confidence));
        }
    }

    #[test]
    fn acquired_input_below_threshold_is_gated() {
        for mode in [InputMode::Image, InputMode::Voice] {
            assert!(requires_hitl(mode, 0.0));
            assert!(requires_hitl(mode, 0.6));
            assert!(requires_hitl(mode, 0.749));
            assert!(!requires_hitl(mode, 0.75));
            assert!(!requires_hitl(mode, 0.9));
        }
    }

    #[test]
    fn low_confidence_image_gets_warning() {
        let gate = HitlGate::default();
        let sample = InputSample::acquired(InputMode::Image, "x^2", 0.60);

        let warning = gate.warning(&sample).expect("warning expected");
        assert!(warning.contains("60%"));
        assert!(warning.contains("extracted text"));
    }

    #[test]
    fn confident_voice_gets_no_warning() {
        let gate = HitlGate::default();
        let sample = InputSample::acquired(InputMode::Voice, "two plus two", 0.92);
        assert!(gate.warning(&sample).is_none());
    }

    #[test]
    fn configured_threshold_is_respected() {
        let gate = HitlGate::from_config(&HitlConfig { threshold: 0.9 });
        assert!(gate.requires_review(InputMode::Voice, 0.85));
        assert!(!gate.requires_review(InputMode::Text, 0.85));
        assert_eq!(gate.threshold(), 0.9);
    }
}
