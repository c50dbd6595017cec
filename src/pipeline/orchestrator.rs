//! Sequencing of store, transcribe and analyze for recorded answers.

use std::collections::HashSet;
use std::sync::Mutex;

use crate::error::{AggregateUploadError, AssessmentError};
use crate::feedback::QuestionFeedback;
use crate::media::{AudioExtractor, MediaArtifact, MediaBackend, MediaKind};
use crate::pipeline::service::{AnalysisService, ArtifactStore, SpeechService};
use crate::session::AssessmentSession;

/// Runs one question's recording through the upload pipeline.
///
/// Each step is gated on the previous one succeeding. Results already
/// obtained (extracted audio, stored URL, transcript) survive a failing
/// step on the session so a retry picks up where the last attempt stopped,
/// and the recording itself is only cleared once every step has succeeded.
pub struct UploadOrchestrator<'a> {
    store: &'a dyn ArtifactStore,
    speech: &'a dyn SpeechService,
    analysis: &'a dyn AnalysisService,
    extractor: AudioExtractor<'a>,
    in_flight: Mutex<HashSet<usize>>,
}

impl<'a> UploadOrchestrator<'a> {
    pub fn new(
        store: &'a dyn ArtifactStore,
        speech: &'a dyn SpeechService,
        analysis: &'a dyn AnalysisService,
        backend: &'a dyn MediaBackend,
    ) -> Self {
        Self {
            store,
            speech,
            analysis,
            extractor: AudioExtractor::new(backend),
            in_flight: Mutex::new(HashSet::new()),
        }
    }

    /// Submits the current question's recording.
    ///
    /// On success the assembled feedback is appended to the session's
    /// feedback list and also returned. On failure the session drops back
    /// to reviewing with the recording and partial results preserved.
    ///
    /// A second call for a question whose submission is still outstanding
    /// is rejected with [`AssessmentError::SubmissionInFlight`].
    pub async fn submit(
        &self,
        session: &mut AssessmentSession,
        question_index: usize,
    ) -> Result<QuestionFeedback, AssessmentError> {
        if question_index != session.current_index() {
            return Err(AssessmentError::InvalidTransition(format!(
                "question {} is not the active question",
                question_index
            )));
        }

        if !self.in_flight.lock().unwrap().insert(question_index) {
            return Err(AssessmentError::SubmissionInFlight(question_index));
        }
        let result = self.submit_inner(session, question_index).await;
        self.in_flight.lock().unwrap().remove(&question_index);
        result
    }

    async fn submit_inner(
        &self,
        session: &mut AssessmentSession,
        question_index: usize,
    ) -> Result<QuestionFeedback, AssessmentError> {
        let capture = session.capture_mut();
        let epoch = capture.begin_submission()?;

        // Extract the audio track when the recording is a video container.
        // The extracted audio is kept on the session so a retry after a
        // later failure does not replay the media again.
        if capture.partial().audio.is_none() {
            let is_video = capture
                .artifact()
                .map(|a| a.kind() == MediaKind::Video)
                .unwrap_or(false);
            if is_video {
                let source = capture
                    .artifact()
                    .expect("submission began with an artifact held");
                match self.extractor.extract(source).await {
                    Ok(audio) => capture.partial_mut().audio = Some(audio),
                    Err(e) => {
                        capture.fail_submission();
                        return Err(e);
                    }
                }
            }
        }

        // Step 1: store the recording remotely
        let stored_url = match capture.partial().stored_url.clone() {
            Some(url) => {
                tracing::debug!("Reusing stored URL from a previous attempt");
                url
            }
            None => {
                let upload = capture
                    .partial()
                    .audio
                    .as_ref()
                    .or(capture.artifact())
                    .expect("submission began with an artifact held");
                match self.store.store(upload, question_index).await {
                    Ok(stored) => {
                        capture.partial_mut().stored_url = Some(stored.url.clone());
                        stored.url
                    }
                    Err(e) => {
                        tracing::warn!("Storage upload failed for question {}: {}", question_index, e);
                        capture.fail_submission();
                        return Err(AssessmentError::StorageUpload(e));
                    }
                }
            }
        };

        // Step 2: transcribe the stored recording
        let transcript = match capture.partial().transcript.clone() {
            Some(text) => text,
            None => {
                let audio = capture
                    .partial()
                    .audio
                    .as_ref()
                    .or(capture.artifact())
                    .expect("submission began with an artifact held");
                match self.speech.transcribe(audio, question_index).await {
                    Ok(transcript) => {
                        capture.partial_mut().transcript = Some(transcript.text.clone());
                        transcript.text
                    }
                    Err(e) => {
                        // The stored URL stays recorded on the session
                        tracing::warn!("Transcription failed for question {}: {}", question_index, e);
                        capture.fail_submission();
                        return Err(AssessmentError::Transcription(e));
                    }
                }
            }
        };

        // Step 3: analyze the transcript
        let analysis = match self.analysis.analyze(&transcript).await {
            Ok(analysis) => analysis,
            Err(e) => {
                // The transcript stays recorded on the session
                tracing::warn!("Analysis failed for question {}: {}", question_index, e);
                capture.fail_submission();
                return Err(AssessmentError::Analysis(e));
            }
        };

        let feedback = QuestionFeedback {
            transcribed_text: transcript,
            analysis,
            video_url: Some(stored_url),
        };

        let recording = capture.complete_submission(epoch)?;
        session.record_success(feedback.clone(), recording);
        tracing::info!("Question {} submitted successfully", question_index);
        Ok(feedback)
    }

    /// Uploads a whole session's recordings in question order.
    ///
    /// Recordings are processed strictly sequentially; `progress` receives
    /// `completed / total` after each recording's storage step completes.
    /// A failed recording does not stop the ones after it. When any failed,
    /// the returned [`AggregateUploadError`] lists every failed index and
    /// still carries the URLs of the recordings that made it.
    pub async fn upload_all(
        &self,
        recordings: &[Option<MediaArtifact>],
        progress: &mut dyn FnMut(f64),
    ) -> Result<Vec<Option<String>>, AggregateUploadError> {
        let total = recordings.iter().filter(|r| r.is_some()).count();
        let mut urls: Vec<Option<String>> = vec![None; recordings.len()];
        let mut failures = Vec::new();
        let mut completed = 0usize;

        for (index, slot) in recordings.iter().enumerate() {
            let Some(artifact) = slot else {
                continue;
            };
            match self.store.store(artifact, index).await {
                Ok(stored) => {
                    completed += 1;
                    urls[index] = Some(stored.url);
                    progress(completed as f64 / total as f64);
                }
                Err(e) => {
                    tracing::warn!("Session upload failed for question {}: {}", index, e);
                    failures.push((index, e));
                }
            }
        }

        if failures.is_empty() {
            Ok(urls)
        } else {
            Err(AggregateUploadError {
                total,
                failures,
                urls,
            })
        }
    }
}
