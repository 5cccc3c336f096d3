//! Transcript accumulation for one recording session.

use super::events::AsrResult;

/// Accumulates final transcript fragments and their confidences for a single
/// recording.  Interim text is kept separately and never committed.
#[derive(Debug, Clone)]
pub struct VoiceSession {
    transcript: String,
    interim: String,
    confidences: Vec<f32>,
    finals: usize,
    default_confidence: f32,
}

impl VoiceSession {
    /// Start an empty session.  `default_confidence` stands in for a
    /// delivery whose final results carry no confidence value.
    pub fn new(default_confidence: f32) -> Self {
        Self {
            transcript: String::new(),
            interim: String::new(),
            confidences: Vec::new(),
            finals: 0,
            default_confidence,
        }
    }

    /// Fold one delivery of results into the session.
    ///
    /// Final results are appended (space separated) to the transcript.  The
    /// interim buffer is replaced by the interim results of this delivery.
    ///
    /// The confidence values carried by the delivery's final results join the
    /// running mean.  A delivery with final results but no values at all
    /// contributes `default_confidence` once.
    pub fn apply(&mut self, results: &[AsrResult]) {
        self.interim.clear();
        let mut batch_finals = 0;
        let mut batch_values = Vec::new();

        for result in results {
            let Some(best) = result.best() else {
                continue;
            };
            let fragment = best.transcript.trim();
            if fragment.is_empty() {
                continue;
            }

            if result.is_final {
                if !self.transcript.is_empty() {
                    self.transcript.push(' ');
                }
                self.transcript.push_str(fragment);
                batch_finals += 1;
                if let Some(confidence) = best.confidence.filter(|c| !c.is_nan()) {
                    batch_values.push(confidence.clamp(0.0, 1.0));
                }
            } else {
                if !self.interim.is_empty() {
                    self.interim.push(' ');
                }
                self.interim.push_str(fragment);
            }
        }

        if batch_finals == 0 {
            return;
        }
        self.finals += batch_finals;
        if batch_values.is_empty() {
            self.confidences.push(self.default_confidence);
        } else {
            self.confidences.extend(batch_values);
        }
    }

    /// Committed transcript so far.
    pub fn transcript(&self) -> &str {
        &self.transcript
    }

    /// Provisional text from the latest delivery.
    pub fn interim(&self) -> &str {
        &self.interim
    }

    /// Number of final fragments received.
    pub fn final_count(&self) -> usize {
        self.finals
    }

    /// Mean of the confidence values received so far, `None` before the
    /// first final result.
    pub fn confidence(&self) -> Option<f32> {
        if self.confidences.is_empty() {
            return None;
        }
        let sum: f32 = self.confidences.iter().sum();
        Some(sum / self.confidences.len() as f32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interim_results_are_never_committed() {
        let mut session = VoiceSession::new(0.75);
        session.apply(&[AsrResult::interim("integrate")]);

        assert_eq!(session.transcript(), "");
        assert_eq!(session.interim(), "integrate");
        assert_eq!(session.confidence(), None);
    }

    #[test]
    fn finals_are_space_joined_and_averaged() {
        let mut session = VoiceSession::new(0.75);
        session.apply(&[AsrResult::final_result("integrate x", Some(0.9))]);
        session.apply(&[
            AsrResult::final_result("from zero to one", Some(0.5)),
            AsrResult::interim("dx"),
        ]);

        assert_eq!(session.transcript(), "integrate x from zero to one");
        assert_eq!(session.interim(), "dx");
        assert_eq!(session.final_count(), 2);
        assert!((session.confidence().unwrap() - 0.7).abs() < 1e-6);
    }

    #[test]
    fn missing_confidence_uses_default() {
        let mut session = VoiceSession::new(0.75);
        session.apply(&[AsrResult::final_result("two plus two", None)]);
        assert!((session.confidence().unwrap() - 0.75).abs() < f32::EPSILON);

        session.apply(&[AsrResult::final_result("equals", Some(0.25))]);
        assert!((session.confidence().unwrap() - 0.5).abs() < 1e-6);
    }

    #[test]
    fn finals_without_values_are_skipped_in_a_mixed_delivery() {
        let mut session = VoiceSession::new(0.75);
        session.apply(&[
            AsrResult::final_result("x plus", Some(0.5)),
            AsrResult::final_result("one", None),
        ]);

        assert_eq!(session.transcript(), "x plus one");
        assert_eq!(session.final_count(), 2);
        assert!((session.confidence().unwrap() - 0.5).abs() < 1e-6);
    }

    #[test]
    fn delivery_without_values_counts_default_once() {
        let mut session = VoiceSession::new(0.75);
        session.apply(&[AsrResult::final_result("x", Some(0.9))]);
        session.apply(&[
            AsrResult::final_result("squared", None),
            AsrResult::final_result("plus one", None),
        ]);

        assert_eq!(session.final_count(), 3);
        assert!((session.confidence().unwrap() - 0.825).abs() < 1e-6);
    }

    #[test]
    fn interim_only_delivery_adds_no_confidence() {
        let mut session = VoiceSession::new(0.75);
        session.apply(&[AsrResult::final_result("x", Some(0.4))]);
        session.apply(&[AsrResult::interim("plus")]);
        assert!((session.confidence().unwrap() - 0.4).abs() < 1e-6);
    }

    #[test]
    fn interim_buffer_resets_each_delivery() {
        let mut session = VoiceSession::new(0.75);
        session.apply(&[AsrResult::interim("sine")]);
        session.apply(&[AsrResult::final_result("sine of x", Some(0.8))]);
        assert_eq!(session.interim(), "");
        assert_eq!(session.transcript(), "sine of x");
    }

    #[test]
    fn blank_fragments_are_skipped() {
        let mut session = VoiceSession::new(0.75);
        session.apply(&[AsrResult::final_result("   ", Some(0.1))]);
        assert_eq!(session.final_count(), 0);
        assert_eq!(session.transcript(), "");
    }
}
