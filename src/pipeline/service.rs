//! Contracts for the three remote collaborators the pipeline depends on.
//!
//! The orchestrator only sees these traits; production wires in the HTTP
//! clients and tests substitute canned implementations.

use async_trait::async_trait;

use crate::error::ServiceError;
use crate::feedback::AnswerAnalysis;
use crate::media::MediaArtifact;

/// Durable reference returned by the storage collaborator.
#[derive(Debug, Clone)]
pub struct StoredArtifact {
    pub url: String,
}

/// Transcription of one stored recording.
#[derive(Debug, Clone)]
pub struct Transcript {
    pub text: String,
}

/// Stores an artifact remotely and returns a durable URL.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    async fn store(
        &self,
        artifact: &MediaArtifact,
        question_index: usize,
    ) -> Result<StoredArtifact, ServiceError>;
}

/// Turns a recording into text.
#[async_trait]
pub trait SpeechService: Send + Sync {
    async fn transcribe(
        &self,
        artifact: &MediaArtifact,
        question_index: usize,
    ) -> Result<Transcript, ServiceError>;
}

/// Produces the multi-dimensional feedback for a transcript.
#[async_trait]
pub trait AnalysisService: Send + Sync {
    async fn analyze(&self, text: &str) -> Result<AnswerAnalysis, ServiceError>;
}
