//! Upload, transcription and analysis orchestration.

pub mod http;
pub mod orchestrator;
pub mod service;

pub use http::{HttpAnalysisService, HttpArtifactStore, HttpQuestionService, HttpSpeechService};
pub use orchestrator::UploadOrchestrator;
pub use service::{AnalysisService, ArtifactStore, SpeechService, StoredArtifact, Transcript};
