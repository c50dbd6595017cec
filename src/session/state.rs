//! Lifecycle of a single question's capture-through-submission.
//!
//! ```text
//! idle -> recording -> reviewing -> submitting -> done
//!              |            |            |
//!   (empty) -> idle  (retake) -> idle  (failure) -> reviewing
//! ```
//!
//! Transitions are only legal through the methods below; every illegal call
//! fails with [`AssessmentError::InvalidTransition`] and leaves the session
//! in its last stable state.

use crate::error::AssessmentError;
use crate::media::MediaArtifact;

/// Where one question currently is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureStatus {
    Idle,
    Recording,
    Reviewing,
    Submitting,
    Done,
}

impl Default for CaptureStatus {
    fn default() -> Self {
        CaptureStatus::Idle
    }
}

impl std::fmt::Display for CaptureStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            CaptureStatus::Idle => "idle",
            CaptureStatus::Recording => "recording",
            CaptureStatus::Reviewing => "reviewing",
            CaptureStatus::Submitting => "submitting",
            CaptureStatus::Done => "done",
        };
        f.write_str(name)
    }
}

/// Intermediate results retained across submission attempts so a retry does
/// not redo completed work.
#[derive(Debug, Default)]
pub struct PartialSubmission {
    /// Durable URL from a completed storage step.
    pub stored_url: Option<String>,
    /// Transcript from a completed transcription step.
    pub transcript: Option<String>,
    /// Extracted audio from a completed extraction step.
    pub audio: Option<MediaArtifact>,
}

impl PartialSubmission {
    fn clear(&mut self) {
        self.stored_url = None;
        self.transcript = None;
        self.audio = None;
    }
}

/// Runtime state for one question.
#[derive(Debug, Default)]
pub struct CaptureSession {
    status: CaptureStatus,
    pub elapsed_seconds: u32,
    artifact: Option<MediaArtifact>,
    partial: PartialSubmission,
    epoch: u64,
}

impl CaptureSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(&self) -> CaptureStatus {
        self.status
    }

    pub fn artifact(&self) -> Option<&MediaArtifact> {
        self.artifact.as_ref()
    }

    pub fn has_artifact(&self) -> bool {
        self.artifact.is_some()
    }

    pub fn partial(&self) -> &PartialSubmission {
        &self.partial
    }

    pub fn partial_mut(&mut self) -> &mut PartialSubmission {
        &mut self.partial
    }

    /// Identity of the currently held recording; bumped whenever the
    /// recording is discarded so late results can be detected.
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    fn invalid(&self, action: &str) -> AssessmentError {
        AssessmentError::InvalidTransition(format!("cannot {action} while {}", self.status))
    }

    /// `idle -> recording`, entered only after device capture has started.
    pub fn begin_recording(&mut self) -> Result<(), AssessmentError> {
        if self.status != CaptureStatus::Idle {
            return Err(self.invalid("start recording"));
        }
        self.status = CaptureStatus::Recording;
        self.elapsed_seconds = 0;
        Ok(())
    }

    /// `recording -> reviewing` with the finished artifact.
    ///
    /// A zero-byte artifact is fatal for the attempt: the session returns
    /// to idle and [`AssessmentError::EmptyRecording`] is raised.
    pub fn finish_recording(
        &mut self,
        artifact: MediaArtifact,
        elapsed_seconds: u32,
    ) -> Result<(), AssessmentError> {
        if self.status != CaptureStatus::Recording {
            return Err(self.invalid("finish recording"));
        }
        self.elapsed_seconds = elapsed_seconds;
        if artifact.is_empty() {
            self.status = CaptureStatus::Idle;
            return Err(AssessmentError::EmptyRecording);
        }
        self.artifact = Some(artifact);
        self.status = CaptureStatus::Reviewing;
        Ok(())
    }

    /// `recording -> idle` when capture is torn down without an artifact.
    pub fn cancel_recording(&mut self) {
        if self.status == CaptureStatus::Recording {
            self.status = CaptureStatus::Idle;
        }
    }

    /// `reviewing -> idle`, destroying the held recording.
    pub fn retake(&mut self) -> Result<(), AssessmentError> {
        if self.status != CaptureStatus::Reviewing {
            return Err(self.invalid("retake"));
        }
        self.discard_recording();
        self.status = CaptureStatus::Idle;
        Ok(())
    }

    /// `reviewing -> submitting`; requires a held artifact. Returns the
    /// epoch the submission is tied to.
    pub fn begin_submission(&mut self) -> Result<u64, AssessmentError> {
        if self.status != CaptureStatus::Reviewing {
            return Err(self.invalid("submit"));
        }
        if self.artifact.is_none() {
            return Err(AssessmentError::InvalidTransition(
                "no recording is held for submission".to_string(),
            ));
        }
        self.status = CaptureStatus::Submitting;
        Ok(self.epoch)
    }

    /// `submitting -> reviewing`, keeping the artifact and any partial
    /// results for the next attempt.
    pub fn fail_submission(&mut self) {
        if self.status == CaptureStatus::Submitting {
            self.status = CaptureStatus::Reviewing;
        }
    }

    /// `submitting -> done` for the submission identified by `epoch`.
    ///
    /// Clears the locally held recording (this is the only place it is
    /// cleared on the success path) and hands it back to the caller.
    /// A submission whose recording was discarded in the meantime fails
    /// with [`AssessmentError::Superseded`] and must be ignored.
    pub fn complete_submission(&mut self, epoch: u64) -> Result<MediaArtifact, AssessmentError> {
        if epoch != self.epoch {
            return Err(AssessmentError::Superseded);
        }
        if self.status != CaptureStatus::Submitting {
            return Err(self.invalid("complete submission"));
        }
        let recording = self
            .partial
            .audio
            .take()
            .or_else(|| self.artifact.take())
            .expect("submission began with an artifact held");
        self.artifact = None;
        self.partial.clear();
        self.status = CaptureStatus::Done;
        Ok(recording)
    }

    /// Force-returns the question to idle from any state, destroying the
    /// held recording and partial results.
    pub fn force_reset(&mut self) {
        self.discard_recording();
        self.elapsed_seconds = 0;
        self.status = CaptureStatus::Idle;
    }

    fn discard_recording(&mut self) {
        self.artifact = None;
        self.partial.clear();
        self.epoch += 1;
    }
}
