// Shared fakes for pipeline integration tests.
//
// Each fake counts its calls so tests can verify which pipeline steps ran.
#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};

use viva::error::{ServiceError, ServiceKind};
use viva::feedback::AnswerAnalysis;
use viva::media::{MediaArtifact, MediaKind};
use viva::pipeline::{AnalysisService, ArtifactStore, SpeechService, StoredArtifact, Transcript};
use viva::session::{AssessmentSession, AssessmentSetup};

pub struct FakeStore {
    pub calls: AtomicUsize,
    fail_indices: HashSet<usize>,
    fail_first_calls: AtomicUsize,
}

impl FakeStore {
    pub fn ok() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            fail_indices: HashSet::new(),
            fail_first_calls: AtomicUsize::new(0),
        }
    }

    /// Fails every call for the given question indices.
    pub fn failing_for(indices: &[usize]) -> Self {
        Self {
            fail_indices: indices.iter().copied().collect(),
            ..Self::ok()
        }
    }

    /// Fails the first `n` calls, then succeeds.
    pub fn failing_first(n: usize) -> Self {
        Self {
            fail_first_calls: AtomicUsize::new(n),
            ..Self::ok()
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ArtifactStore for FakeStore {
    async fn store(
        &self,
        _artifact: &MediaArtifact,
        question_index: usize,
    ) -> Result<StoredArtifact, ServiceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_indices.contains(&question_index) {
            return Err(ServiceError::new(ServiceKind::Storage, "upload rejected"));
        }
        if self
            .fail_first_calls
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(ServiceError::new(ServiceKind::Storage, "upload rejected"));
        }
        Ok(StoredArtifact {
            url: format!("https://cdn.test/answers/q{question_index}.mp3"),
        })
    }
}

pub struct FakeSpeech {
    pub calls: AtomicUsize,
    fail_first_calls: AtomicUsize,
}

impl FakeSpeech {
    pub fn ok() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            fail_first_calls: AtomicUsize::new(0),
        }
    }

    pub fn failing_first(n: usize) -> Self {
        Self {
            fail_first_calls: AtomicUsize::new(n),
            ..Self::ok()
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SpeechService for FakeSpeech {
    async fn transcribe(
        &self,
        _artifact: &MediaArtifact,
        _question_index: usize,
    ) -> Result<Transcript, ServiceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self
            .fail_first_calls
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(ServiceError::new(
                ServiceKind::Speech,
                "transcription did not succeed",
            ));
        }
        Ok(Transcript {
            text: "I would reach for a hash map here".to_string(),
        })
    }
}

pub struct FakeAnalysis {
    pub calls: AtomicUsize,
    fail_first_calls: AtomicUsize,
}

impl FakeAnalysis {
    pub fn ok() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            fail_first_calls: AtomicUsize::new(0),
        }
    }

    pub fn failing_first(n: usize) -> Self {
        Self {
            fail_first_calls: AtomicUsize::new(n),
            ..Self::ok()
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AnalysisService for FakeAnalysis {
    async fn analyze(&self, _text: &str) -> Result<AnswerAnalysis, ServiceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self
            .fail_first_calls
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(ServiceError::new(ServiceKind::Analysis, "model unavailable"));
        }
        Ok(sample_analysis())
    }
}

/// Analysis payload with known dimension scores.
pub fn sample_analysis() -> AnswerAnalysis {
    let mut analysis = AnswerAnalysis::default();
    analysis.grammar.error_count = 2;
    analysis.pronunciation.error_count = 1;
    analysis.fluency.fluency_score = 80.0;
    analysis.correctness.score = 90.0;
    analysis.correctness.detailed_feedback = "Mostly on point".to_string();
    analysis.pause_count = 3;
    analysis
}

pub fn audio_artifact() -> MediaArtifact {
    MediaArtifact::new(MediaKind::Audio, vec![7; 64])
}

pub fn video_artifact() -> MediaArtifact {
    MediaArtifact::new(MediaKind::Video, vec![9; 64])
}

pub fn setup() -> AssessmentSetup {
    AssessmentSetup {
        topic: "data structures".to_string(),
        difficulty: "medium".to_string(),
        language: "English".to_string(),
    }
}

/// One-question session holding a finished recording, ready to submit.
pub fn session_with_recording(artifact: MediaArtifact) -> AssessmentSession {
    let mut session =
        AssessmentSession::new(setup(), vec!["Why use a hash map?".to_string()]);
    session.capture_mut().begin_recording().unwrap();
    session.capture_mut().finish_recording(artifact, 9).unwrap();
    session
}
