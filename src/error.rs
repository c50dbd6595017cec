//! Error types for the recording-to-feedback pipeline.
//!
//! Remote collaborators (storage, speech, analysis, persistence) all fail
//! with the same [`ServiceError`] shape so call sites never have to guess
//! whether a failure came back as a JSON body or raw text. Session-level
//! failures are covered by [`AssessmentError`].

use thiserror::Error;

/// Which remote collaborator produced a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceKind {
    Storage,
    Speech,
    Analysis,
    Questions,
    Persistence,
}

impl ServiceKind {
    pub fn name(&self) -> &'static str {
        match self {
            ServiceKind::Storage => "storage",
            ServiceKind::Speech => "speech",
            ServiceKind::Analysis => "analysis",
            ServiceKind::Questions => "questions",
            ServiceKind::Persistence => "persistence",
        }
    }
}

impl std::fmt::Display for ServiceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Uniform failure reported by every remote collaborator.
#[derive(Debug, Clone, Error)]
#[error("{kind} service: {message}")]
pub struct ServiceError {
    pub kind: ServiceKind,
    pub message: String,
}

impl ServiceError {
    pub fn new(kind: ServiceKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Failure summary for a whole-session artifact upload.
///
/// Successful uploads are not rolled back when a later artifact fails;
/// `urls` carries the durable URL of every artifact that did make it so
/// callers can still apply the successes.
#[derive(Debug)]
pub struct AggregateUploadError {
    /// Number of artifacts that were attempted.
    pub total: usize,
    /// Question index and reason for every artifact that failed.
    pub failures: Vec<(usize, ServiceError)>,
    /// Durable URL per input slot; `None` for holes and failures.
    pub urls: Vec<Option<String>>,
}

impl AggregateUploadError {
    pub fn failed_indices(&self) -> Vec<usize> {
        self.failures.iter().map(|(i, _)| *i).collect()
    }
}

impl std::fmt::Display for AggregateUploadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "upload failed for {} of {} recordings (questions {:?})",
            self.failures.len(),
            self.total,
            self.failed_indices()
        )
    }
}

impl std::error::Error for AggregateUploadError {}

/// Everything that can go wrong between pressing record and receiving
/// feedback for one question.
#[derive(Debug, Error)]
pub enum AssessmentError {
    /// Camera/microphone permissions denied or no capture device exists.
    #[error("could not access recording devices: {0}")]
    DeviceAccess(String),

    /// A recording was stopped before any data was captured.
    #[error("the recording contained no data, please record your answer again")]
    EmptyRecording,

    /// The recorded media could not be decoded for audio extraction.
    #[error("recorded media could not be decoded: {0}")]
    Decode(String),

    /// Step 1 of a submission failed; the recording is retained for retry.
    #[error("uploading the recording failed: {0}")]
    StorageUpload(ServiceError),

    /// Step 2 of a submission failed; the stored URL is retained.
    #[error("transcribing the recording failed: {0}")]
    Transcription(ServiceError),

    /// Step 3 of a submission failed; the transcript is retained.
    #[error("analyzing the answer failed: {0}")]
    Analysis(ServiceError),

    /// One or more artifacts failed during a whole-session upload.
    #[error(transparent)]
    AggregateUpload(AggregateUploadError),

    /// A second submission was attempted while one is still outstanding.
    #[error("a submission is already in flight for question {0}")]
    SubmissionInFlight(usize),

    /// The recording was retaken or discarded while its submission was in
    /// flight; the late result must be ignored.
    #[error("the recording was discarded before its submission finished")]
    Superseded,

    /// A session operation was attempted from the wrong state.
    #[error("invalid session transition: {0}")]
    InvalidTransition(String),
}
