// Integration tests for the upload orchestrator: step gating, partial
// result retention, and whole-session uploads.

mod common;

use common::*;
use viva::error::AssessmentError;
use viva::media::{AudioPacket, DecodedAudio, FakeBackend, MediaKind};
use viva::pipeline::UploadOrchestrator;
use viva::session::CaptureStatus;

#[tokio::test]
async fn storage_failure_stops_the_pipeline_before_transcription() {
    let backend = FakeBackend::new();
    let store = FakeStore::failing_for(&[0]);
    let speech = FakeSpeech::ok();
    let analysis = FakeAnalysis::ok();
    let orchestrator = UploadOrchestrator::new(&store, &speech, &analysis, &backend);

    let mut session = session_with_recording(audio_artifact());
    let err = orchestrator.submit(&mut session, 0).await.unwrap_err();

    assert!(matches!(err, AssessmentError::StorageUpload(_)));
    assert_eq!(store.call_count(), 1);
    assert_eq!(speech.call_count(), 0, "transcription must not be attempted");
    assert_eq!(analysis.call_count(), 0, "analysis must not be attempted");

    // The recording stays on the session for a retry
    assert_eq!(session.capture().status(), CaptureStatus::Reviewing);
    assert!(session.capture().has_artifact());
    assert!(session.feedback()[0].is_none());
}

#[tokio::test]
async fn transcription_failure_keeps_the_stored_url_for_retry() {
    let backend = FakeBackend::new();
    let store = FakeStore::ok();
    let speech = FakeSpeech::failing_first(1);
    let analysis = FakeAnalysis::ok();
    let orchestrator = UploadOrchestrator::new(&store, &speech, &analysis, &backend);

    let mut session = session_with_recording(audio_artifact());
    let err = orchestrator.submit(&mut session, 0).await.unwrap_err();
    assert!(matches!(err, AssessmentError::Transcription(_)));

    // Step 1's result is recorded on the session for inspection
    assert!(session.capture().partial().stored_url.is_some());
    assert_eq!(session.capture().status(), CaptureStatus::Reviewing);

    // The retry does not redo the storage step
    orchestrator.submit(&mut session, 0).await.unwrap();
    assert_eq!(store.call_count(), 1);
    assert_eq!(speech.call_count(), 2);
    assert_eq!(session.capture().status(), CaptureStatus::Done);
}

#[tokio::test]
async fn analysis_failure_keeps_the_transcript_for_retry() {
    let backend = FakeBackend::new();
    let store = FakeStore::ok();
    let speech = FakeSpeech::ok();
    let analysis = FakeAnalysis::failing_first(1);
    let orchestrator = UploadOrchestrator::new(&store, &speech, &analysis, &backend);

    let mut session = session_with_recording(audio_artifact());
    let err = orchestrator.submit(&mut session, 0).await.unwrap_err();
    assert!(matches!(err, AssessmentError::Analysis(_)));
    assert_eq!(
        session.capture().partial().transcript.as_deref(),
        Some("I would reach for a hash map here")
    );

    // The retry reuses both the stored URL and the transcript
    orchestrator.submit(&mut session, 0).await.unwrap();
    assert_eq!(store.call_count(), 1);
    assert_eq!(speech.call_count(), 1);
    assert_eq!(analysis.call_count(), 2);
}

#[tokio::test]
async fn success_assembles_feedback_and_clears_the_recording() {
    let backend = FakeBackend::new();
    let store = FakeStore::ok();
    let speech = FakeSpeech::ok();
    let analysis = FakeAnalysis::ok();
    let orchestrator = UploadOrchestrator::new(&store, &speech, &analysis, &backend);

    let mut session = session_with_recording(audio_artifact());
    let feedback = orchestrator.submit(&mut session, 0).await.unwrap();

    assert_eq!(feedback.transcribed_text, "I would reach for a hash map here");
    assert_eq!(feedback.analysis.grammar.error_count, 2);
    assert_eq!(
        feedback.video_url.as_deref(),
        Some("https://cdn.test/answers/q0.mp3")
    );

    // Cleared only now, and appended to the in-memory feedback list
    assert!(!session.capture().has_artifact());
    assert!(session.capture().partial().stored_url.is_none());
    assert!(session.feedback()[0].is_some());
    assert!(session.archive()[0].is_some());
    assert_eq!(session.capture().status(), CaptureStatus::Done);
}

#[tokio::test(start_paused = true)]
async fn video_recordings_are_extracted_before_upload() {
    let backend = FakeBackend::new().with_decoded(DecodedAudio {
        sample_rate: 16000,
        channels: 1,
        packets: vec![AudioPacket {
            offset: std::time::Duration::ZERO,
            samples: vec![5i16; 1600],
        }],
    });
    let store = FakeStore::ok();
    let speech = FakeSpeech::ok();
    let analysis = FakeAnalysis::ok();
    let orchestrator = UploadOrchestrator::new(&store, &speech, &analysis, &backend);

    let mut session = session_with_recording(video_artifact());
    let feedback = orchestrator.submit(&mut session, 0).await.unwrap();

    assert!(feedback.video_url.is_some());
    // The archived recording is the extracted audio, not the video
    let archived = session.archive()[0].as_ref().unwrap();
    assert_eq!(archived.kind(), MediaKind::Audio);
}

#[tokio::test(start_paused = true)]
async fn extraction_results_survive_a_failed_storage_step() {
    let backend = FakeBackend::new().with_decoded(DecodedAudio {
        sample_rate: 16000,
        channels: 1,
        packets: vec![AudioPacket {
            offset: std::time::Duration::ZERO,
            samples: vec![5i16; 160],
        }],
    });
    let store = FakeStore::failing_first(1);
    let speech = FakeSpeech::ok();
    let analysis = FakeAnalysis::ok();
    let orchestrator = UploadOrchestrator::new(&store, &speech, &analysis, &backend);

    let mut session = session_with_recording(video_artifact());
    let err = orchestrator.submit(&mut session, 0).await.unwrap_err();
    assert!(matches!(err, AssessmentError::StorageUpload(_)));

    // The extracted audio is retained; the retry skips re-extraction and
    // succeeds without replaying the media
    assert!(session.capture().partial().audio.is_some());
    orchestrator.submit(&mut session, 0).await.unwrap();
    assert_eq!(session.capture().status(), CaptureStatus::Done);
}

#[tokio::test]
async fn undecodable_video_fails_with_a_decode_error() {
    let backend = FakeBackend::new().failing_decode("truncated container");
    let store = FakeStore::ok();
    let speech = FakeSpeech::ok();
    let analysis = FakeAnalysis::ok();
    let orchestrator = UploadOrchestrator::new(&store, &speech, &analysis, &backend);

    let mut session = session_with_recording(video_artifact());
    let err = orchestrator.submit(&mut session, 0).await.unwrap_err();
    assert!(matches!(err, AssessmentError::Decode(_)));
    assert_eq!(store.call_count(), 0);
    assert_eq!(session.capture().status(), CaptureStatus::Reviewing);
}

#[tokio::test]
async fn session_upload_collects_failures_and_keeps_going() {
    let backend = FakeBackend::new();
    let store = FakeStore::failing_for(&[1]);
    let speech = FakeSpeech::ok();
    let analysis = FakeAnalysis::ok();
    let orchestrator = UploadOrchestrator::new(&store, &speech, &analysis, &backend);

    let recordings = vec![
        Some(audio_artifact()),
        Some(audio_artifact()),
        Some(audio_artifact()),
    ];

    let mut progress_reports = Vec::new();
    let mut on_progress = |fraction: f64| progress_reports.push(fraction);

    let err = orchestrator
        .upload_all(&recordings, &mut on_progress)
        .await
        .unwrap_err();

    // Progress after the artifacts whose storage step completed
    assert_eq!(progress_reports, vec![1.0 / 3.0, 2.0 / 3.0]);
    assert_eq!(err.total, 3);
    assert_eq!(err.failed_indices(), vec![1]);
    assert!(err.urls[0].is_some());
    assert!(err.urls[1].is_none());
    assert!(err.urls[2].is_some());
    assert_eq!(store.call_count(), 3, "a failure must not stop later uploads");
}

#[tokio::test]
async fn session_upload_skips_holes() {
    let backend = FakeBackend::new();
    let store = FakeStore::ok();
    let speech = FakeSpeech::ok();
    let analysis = FakeAnalysis::ok();
    let orchestrator = UploadOrchestrator::new(&store, &speech, &analysis, &backend);

    let recordings = vec![Some(audio_artifact()), None, Some(audio_artifact())];

    let mut progress_reports = Vec::new();
    let mut on_progress = |fraction: f64| progress_reports.push(fraction);

    let urls = orchestrator
        .upload_all(&recordings, &mut on_progress)
        .await
        .unwrap();

    assert_eq!(progress_reports, vec![0.5, 1.0]);
    assert!(urls[0].is_some());
    assert!(urls[1].is_none());
    assert!(urls[2].is_some());
    assert_eq!(store.call_count(), 2);
}
