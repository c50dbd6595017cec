//! HTTP clients for the remote collaborators.
//!
//! Every client reports failures through the same [`ServiceError`] shape,
//! whether the collaborator answered with a JSON error body, raw text, or
//! did not answer at all.

use serde::Deserialize;
use serde_json::Value;

use crate::error::{ServiceError, ServiceKind};
use crate::media::MediaArtifact;
use crate::pipeline::service::{
    AnalysisService, ArtifactStore, SpeechService, StoredArtifact, Transcript,
};
use crate::session::AssessmentSetup;

use async_trait::async_trait;

/// Maps a transport-level failure to a readable message.
fn transport_error(kind: ServiceKind, e: reqwest::Error) -> ServiceError {
    let message = if e.is_connect() {
        format!(
            "could not connect to the {kind} service, check that it is running and the configured URL is correct"
        )
    } else if e.is_timeout() {
        format!("the {kind} service did not respond in time")
    } else {
        format!("{kind} request failed: {e}")
    };
    ServiceError::new(kind, message)
}

/// Extracts a human-readable failure message from a non-2xx response.
///
/// Collaborators are inconsistent: some answer with `{"error": ...}`, some
/// with `{"message": ...}`, some with plain text.
async fn failure_message(kind: ServiceKind, response: reqwest::Response) -> ServiceError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();

    let detail = serde_json::from_str::<Value>(&body)
        .ok()
        .and_then(|v| {
            v.get("error")
                .or_else(|| v.get("message"))
                .and_then(|m| m.as_str())
                .map(str::to_string)
        })
        .unwrap_or_else(|| {
            if body.trim().is_empty() {
                "no error details returned".to_string()
            } else {
                body.trim().to_string()
            }
        });

    let message = if status.is_server_error() {
        format!("the service reported an internal problem (status {status}): {detail}")
    } else {
        format!("request rejected (status {status}): {detail}")
    };
    ServiceError::new(kind, message)
}

fn upload_file_name(artifact: &MediaArtifact, question_index: usize) -> String {
    format!("question_{}.{}", question_index, artifact.kind().extension())
}

fn multipart_recording(
    kind: ServiceKind,
    artifact: &MediaArtifact,
    question_index: usize,
) -> Result<reqwest::multipart::Form, ServiceError> {
    let part = reqwest::multipart::Part::bytes(artifact.data().to_vec())
        .file_name(upload_file_name(artifact, question_index))
        .mime_str(artifact.kind().mime())
        .map_err(|e| ServiceError::new(kind, format!("failed to build upload body: {e}")))?;

    Ok(reqwest::multipart::Form::new()
        .part("file", part)
        .text("questionIndex", question_index.to_string()))
}

/// Storage collaborator client.
///
/// Uploads either directly (`POST /upload`) or through the presigned-URL
/// flow (`POST /upload/generate-presigned-url` then a `PUT` of the bytes),
/// selected by configuration.
pub struct HttpArtifactStore {
    client: reqwest::Client,
    base_url: String,
    presigned: bool,
}

#[derive(Debug, Deserialize)]
struct UrlResponse {
    url: String,
}

impl HttpArtifactStore {
    pub fn new(base_url: &str, presigned: bool) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            presigned,
        }
    }

    async fn store_direct(
        &self,
        artifact: &MediaArtifact,
        question_index: usize,
    ) -> Result<StoredArtifact, ServiceError> {
        let kind = ServiceKind::Storage;
        let url = format!("{}/upload", self.base_url);
        tracing::debug!("Uploading question {} recording to {}", question_index, url);

        let form = multipart_recording(kind, artifact, question_index)?;
        let response = self
            .client
            .post(&url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| transport_error(kind, e))?;

        if !response.status().is_success() {
            return Err(failure_message(kind, response).await);
        }

        let stored: UrlResponse = response
            .json()
            .await
            .map_err(|e| ServiceError::new(kind, format!("unexpected upload response: {e}")))?;
        Ok(StoredArtifact { url: stored.url })
    }

    async fn store_presigned(
        &self,
        artifact: &MediaArtifact,
    ) -> Result<StoredArtifact, ServiceError> {
        let kind = ServiceKind::Storage;
        let url = format!("{}/upload/generate-presigned-url", self.base_url);
        tracing::debug!("Requesting presigned upload URL from {}", url);

        let response = self
            .client
            .post(&url)
            .send()
            .await
            .map_err(|e| transport_error(kind, e))?;
        if !response.status().is_success() {
            return Err(failure_message(kind, response).await);
        }
        let presigned: UrlResponse = response
            .json()
            .await
            .map_err(|e| ServiceError::new(kind, format!("unexpected presigned-url response: {e}")))?;

        let put = self
            .client
            .put(&presigned.url)
            .header(reqwest::header::CONTENT_TYPE, "audio/mpeg")
            .body(artifact.data().to_vec())
            .send()
            .await
            .map_err(|e| transport_error(kind, e))?;
        if !put.status().is_success() {
            return Err(failure_message(kind, put).await);
        }

        // The durable object URL is the presigned URL minus its credentials
        let durable = presigned
            .url
            .split('?')
            .next()
            .unwrap_or(&presigned.url)
            .to_string();
        Ok(StoredArtifact { url: durable })
    }
}

#[async_trait]
impl ArtifactStore for HttpArtifactStore {
    async fn store(
        &self,
        artifact: &MediaArtifact,
        question_index: usize,
    ) -> Result<StoredArtifact, ServiceError> {
        if self.presigned {
            self.store_presigned(artifact).await
        } else {
            self.store_direct(artifact, question_index).await
        }
    }
}

/// Transcription collaborator client (`POST /process-audio`).
pub struct HttpSpeechService {
    client: reqwest::Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct ProcessAudioResponse {
    status: String,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

impl HttpSpeechService {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl SpeechService for HttpSpeechService {
    async fn transcribe(
        &self,
        artifact: &MediaArtifact,
        question_index: usize,
    ) -> Result<Transcript, ServiceError> {
        let kind = ServiceKind::Speech;
        let url = format!("{}/process-audio", self.base_url);
        tracing::debug!("Transcribing question {} recording via {}", question_index, url);

        let form = multipart_recording(kind, artifact, question_index)?;
        let response = self
            .client
            .post(&url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| transport_error(kind, e))?;

        if !response.status().is_success() {
            return Err(failure_message(kind, response).await);
        }

        let processed: ProcessAudioResponse = response
            .json()
            .await
            .map_err(|e| ServiceError::new(kind, format!("unexpected transcription response: {e}")))?;

        if processed.status != "success" {
            let message = processed
                .message
                .unwrap_or_else(|| "transcription did not succeed".to_string());
            return Err(ServiceError::new(kind, message));
        }

        match processed.text {
            Some(text) if !text.trim().is_empty() => Ok(Transcript {
                text: text.trim().to_string(),
            }),
            _ => Err(ServiceError::new(
                kind,
                "transcription returned no text, the recording may be silent",
            )),
        }
    }
}

/// Analysis collaborator client (`POST /analyze-text`).
pub struct HttpAnalysisService {
    client: reqwest::Client,
    base_url: String,
}

impl HttpAnalysisService {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl AnalysisService for HttpAnalysisService {
    async fn analyze(&self, text: &str) -> Result<crate::feedback::AnswerAnalysis, ServiceError> {
        let kind = ServiceKind::Analysis;
        let url = format!("{}/analyze-text", self.base_url);
        tracing::debug!("Analyzing transcript ({} characters) via {}", text.len(), url);

        let response = self
            .client
            .post(&url)
            .json(&serde_json::json!({ "text": text }))
            .send()
            .await
            .map_err(|e| transport_error(kind, e))?;

        if !response.status().is_success() {
            return Err(failure_message(kind, response).await);
        }

        response
            .json()
            .await
            .map_err(|e| ServiceError::new(kind, format!("unexpected analysis response: {e}")))
    }
}

/// Question-generation collaborator client (`POST /generate-questions`).
pub struct HttpQuestionService {
    client: reqwest::Client,
    base_url: String,
}

impl HttpQuestionService {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Fetches the interview questions for an assessment setup.
    ///
    /// Accepts both `{"questions": [...]}` and a bare array response.
    pub async fn generate(&self, setup: &AssessmentSetup) -> Result<Vec<String>, ServiceError> {
        let kind = ServiceKind::Questions;
        let url = format!("{}/generate-questions", self.base_url);
        tracing::info!(
            "Fetching questions for topic '{}' ({}, {})",
            setup.topic,
            setup.difficulty,
            setup.language
        );

        let response = self
            .client
            .post(&url)
            .json(setup)
            .send()
            .await
            .map_err(|e| transport_error(kind, e))?;

        if !response.status().is_success() {
            return Err(failure_message(kind, response).await);
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| ServiceError::new(kind, format!("unexpected questions response: {e}")))?;

        let questions: Vec<String> = match body.get("questions") {
            Some(list) => serde_json::from_value(list.clone()),
            None => serde_json::from_value(body),
        }
        .map_err(|e| ServiceError::new(kind, format!("unexpected questions response: {e}")))?;

        if questions.is_empty() {
            return Err(ServiceError::new(kind, "no questions were generated"));
        }
        Ok(questions)
    }
}
