//! Multi-question assessment progression.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::AssessmentError;
use crate::feedback::QuestionFeedback;
use crate::media::MediaArtifact;
use crate::session::state::{CaptureSession, CaptureStatus};

/// What the user asked to be assessed on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssessmentSetup {
    pub topic: String,
    pub difficulty: String,
    pub language: String,
}

/// Runtime state for a whole assessment: the question list, the active
/// question's capture session, and the accumulated feedback.
///
/// The feedback list is index-aligned with the questions; a question that
/// never completed leaves a `None` hole, which the aggregator treats as
/// zero-contribution.
pub struct AssessmentSession {
    setup: AssessmentSetup,
    questions: Vec<String>,
    current: usize,
    capture: CaptureSession,
    feedback: Vec<Option<QuestionFeedback>>,
    /// Recordings handed off on submission success, held until the
    /// whole-session durable upload at save time.
    archive: Vec<Option<MediaArtifact>>,
}

impl AssessmentSession {
    pub fn new(setup: AssessmentSetup, questions: Vec<String>) -> Self {
        let len = questions.len();
        Self {
            setup,
            questions,
            current: 0,
            capture: CaptureSession::new(),
            feedback: (0..len).map(|_| None).collect(),
            archive: (0..len).map(|_| None).collect(),
        }
    }

    pub fn setup(&self) -> &AssessmentSetup {
        &self.setup
    }

    pub fn questions(&self) -> &[String] {
        &self.questions
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn current_question(&self) -> &str {
        &self.questions[self.current]
    }

    pub fn capture(&self) -> &CaptureSession {
        &self.capture
    }

    pub fn capture_mut(&mut self) -> &mut CaptureSession {
        &mut self.capture
    }

    pub fn feedback(&self) -> &[Option<QuestionFeedback>] {
        &self.feedback
    }

    /// Feedback list in the raw JSON form the aggregator and the
    /// persistence record consume.
    pub fn feedback_values(&self) -> Vec<Option<Value>> {
        self.feedback
            .iter()
            .map(|f| f.as_ref().map(QuestionFeedback::to_value))
            .collect()
    }

    /// Records a completed submission for the current question and
    /// archives its recording for the durable upload at save time.
    pub fn record_success(&mut self, feedback: QuestionFeedback, recording: MediaArtifact) {
        self.feedback[self.current] = Some(feedback);
        self.archive[self.current] = Some(recording);
    }

    pub fn archive(&self) -> &[Option<MediaArtifact>] {
        &self.archive
    }

    /// Applies durable URLs from a whole-session upload to the feedback
    /// entries, dropping the archived recordings that made it.
    pub fn apply_durable_urls(&mut self, urls: &[Option<String>]) {
        for (index, url) in urls.iter().enumerate() {
            if let Some(url) = url {
                if let Some(entry) = self.feedback.get_mut(index).and_then(|f| f.as_mut()) {
                    entry.video_url = Some(url.clone());
                }
                self.archive[index] = None;
            }
        }
    }

    /// `done -> idle` on the next question; also legal from idle so an
    /// unanswered question can be left as a hole.
    ///
    /// Returns `false` when there is no next question.
    pub fn advance(&mut self) -> Result<bool, AssessmentError> {
        match self.capture.status() {
            CaptureStatus::Done | CaptureStatus::Idle => {}
            status => {
                return Err(AssessmentError::InvalidTransition(format!(
                    "cannot advance to the next question while {status}"
                )))
            }
        }
        if self.current + 1 >= self.questions.len() {
            return Ok(false);
        }
        self.current += 1;
        // A fresh capture session destroys anything the old one still held
        self.capture = CaptureSession::new();
        Ok(true)
    }

    pub fn on_last_question(&self) -> bool {
        self.current + 1 >= self.questions.len()
    }

    pub fn is_complete(&self) -> bool {
        self.on_last_question() && self.capture.status() == CaptureStatus::Done
    }

    pub fn answered_count(&self) -> usize {
        self.feedback.iter().filter(|f| f.is_some()).count()
    }

    /// Force-returns the whole assessment to its initial state. Any active
    /// recording must already be stopped by the capture owner.
    pub fn reset(&mut self) {
        self.current = 0;
        self.capture.force_reset();
        self.capture = CaptureSession::new();
        for slot in &mut self.feedback {
            *slot = None;
        }
        for slot in &mut self.archive {
            *slot = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::MediaKind;

    fn session() -> AssessmentSession {
        AssessmentSession::new(
            AssessmentSetup {
                topic: "databases".to_string(),
                difficulty: "medium".to_string(),
                language: "English".to_string(),
            },
            vec!["What is an index?".to_string(), "What is a join?".to_string()],
        )
    }

    fn answer(session: &mut AssessmentSession) {
        session.capture_mut().begin_recording().unwrap();
        session
            .capture_mut()
            .finish_recording(MediaArtifact::new(MediaKind::Audio, vec![1, 2]), 4)
            .unwrap();
        let epoch = session.capture_mut().begin_submission().unwrap();
        let recording = session.capture_mut().complete_submission(epoch).unwrap();
        session.record_success(QuestionFeedback::default(), recording);
    }

    #[test]
    fn advance_walks_the_question_list() {
        let mut s = session();
        answer(&mut s);
        assert!(s.advance().unwrap());
        assert_eq!(s.current_index(), 1);
        assert_eq!(s.capture().status(), CaptureStatus::Idle);

        answer(&mut s);
        assert!(!s.advance().unwrap());
        assert!(s.is_complete());
    }

    #[test]
    fn advance_from_idle_leaves_a_hole() {
        let mut s = session();
        assert!(s.advance().unwrap());
        answer(&mut s);

        let values = s.feedback_values();
        assert!(values[0].is_none());
        assert!(values[1].is_some());
        assert_eq!(s.answered_count(), 1);
    }

    #[test]
    fn advance_mid_review_is_rejected() {
        let mut s = session();
        s.capture_mut().begin_recording().unwrap();
        s.capture_mut()
            .finish_recording(MediaArtifact::new(MediaKind::Audio, vec![9]), 2)
            .unwrap();
        assert!(s.advance().is_err());
    }

    #[test]
    fn reset_clears_feedback_and_archive() {
        let mut s = session();
        answer(&mut s);
        assert_eq!(s.answered_count(), 1);

        s.reset();
        assert_eq!(s.current_index(), 0);
        assert_eq!(s.answered_count(), 0);
        assert!(s.archive().iter().all(|a| a.is_none()));
        assert_eq!(s.capture().status(), CaptureStatus::Idle);
    }

    #[test]
    fn durable_urls_replace_feedback_references() {
        let mut s = session();
        answer(&mut s);
        s.apply_durable_urls(&[Some("https://cdn.example/q0.mp3".to_string()), None]);

        assert_eq!(
            s.feedback()[0].as_ref().unwrap().video_url.as_deref(),
            Some("https://cdn.example/q0.mp3")
        );
        assert!(s.archive()[0].is_none());
    }
}
