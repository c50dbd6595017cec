// End-to-end session lifecycle tests across capture, the state machine
// and the orchestrator, all on the fake backend.

mod common;

use std::sync::atomic::AtomicBool;
use std::time::Duration;

use common::*;
use viva::error::AssessmentError;
use viva::media::{FakeBackend, MediaArtifact, MediaCapture, MediaKind, NullPreview,
    StreamConstraints};
use viva::pipeline::UploadOrchestrator;
use viva::session::{AssessmentSession, CaptureStatus};

fn canned_recording() -> MediaArtifact {
    MediaArtifact::new(MediaKind::Audio, vec![1; 96])
}

#[tokio::test]
async fn a_question_walks_idle_recording_reviewing_done() {
    let backend = FakeBackend::new().with_recording(canned_recording());
    let store = FakeStore::ok();
    let speech = FakeSpeech::ok();
    let analysis = FakeAnalysis::ok();
    let orchestrator = UploadOrchestrator::new(&store, &speech, &analysis, &backend);

    let mut session = AssessmentSession::new(setup(), vec!["Describe a B-tree.".to_string()]);
    let mut capture = MediaCapture::new(&backend, Duration::from_secs(120));

    // idle -> recording, only after capture actually started
    capture.start(&StreamConstraints::default()).unwrap();
    session.capture_mut().begin_recording().unwrap();
    assert_eq!(session.capture().status(), CaptureStatus::Recording);

    // recording -> reviewing with a non-empty artifact
    let stop = AtomicBool::new(true);
    let (artifact, elapsed) = capture.run(&mut NullPreview, &stop).await.unwrap();
    session
        .capture_mut()
        .finish_recording(artifact, elapsed.as_secs() as u32)
        .unwrap();
    assert_eq!(session.capture().status(), CaptureStatus::Reviewing);

    // reviewing -> submitting -> done
    orchestrator.submit(&mut session, 0).await.unwrap();
    assert_eq!(session.capture().status(), CaptureStatus::Done);
    assert!(session.is_complete());
}

#[tokio::test]
async fn empty_capture_raises_empty_recording_and_returns_to_idle() {
    // A fake with no queued recordings finalizes into zero bytes
    let backend = FakeBackend::new();
    let mut session = AssessmentSession::new(setup(), vec!["q".to_string()]);
    let mut capture = MediaCapture::new(&backend, Duration::from_secs(120));

    capture.start(&StreamConstraints::default()).unwrap();
    session.capture_mut().begin_recording().unwrap();

    let stop = AtomicBool::new(true);
    let (artifact, elapsed) = capture.run(&mut NullPreview, &stop).await.unwrap();
    let err = session
        .capture_mut()
        .finish_recording(artifact, elapsed.as_secs() as u32)
        .unwrap_err();

    assert!(matches!(err, AssessmentError::EmptyRecording));
    assert_eq!(session.capture().status(), CaptureStatus::Idle);
    assert_eq!(backend.open_streams(), 0);
}

#[tokio::test]
async fn retake_returns_to_idle_and_a_new_recording_succeeds() {
    let backend = FakeBackend::new()
        .with_recording(canned_recording())
        .with_recording(MediaArtifact::new(MediaKind::Audio, vec![2; 48]));
    let mut session = AssessmentSession::new(setup(), vec!["q".to_string()]);
    let mut capture = MediaCapture::new(&backend, Duration::from_secs(120));

    capture.start(&StreamConstraints::default()).unwrap();
    session.capture_mut().begin_recording().unwrap();
    let stop = AtomicBool::new(true);
    let (artifact, _) = capture.run(&mut NullPreview, &stop).await.unwrap();
    session.capture_mut().finish_recording(artifact, 5).unwrap();

    session.capture_mut().retake().unwrap();
    assert_eq!(session.capture().status(), CaptureStatus::Idle);
    assert!(!session.capture().has_artifact());

    // The second take records the next canned artifact
    capture.start(&StreamConstraints::default()).unwrap();
    session.capture_mut().begin_recording().unwrap();
    let (artifact, _) = capture.run(&mut NullPreview, &stop).await.unwrap();
    session.capture_mut().finish_recording(artifact, 3).unwrap();
    assert_eq!(session.capture().artifact().unwrap().size(), 48);
}

#[tokio::test]
async fn failed_submission_leaves_the_session_resubmittable() {
    let backend = FakeBackend::new();
    let store = FakeStore::failing_first(1);
    let speech = FakeSpeech::ok();
    let analysis = FakeAnalysis::ok();
    let orchestrator = UploadOrchestrator::new(&store, &speech, &analysis, &backend);

    let mut session = session_with_recording(audio_artifact());
    assert!(orchestrator.submit(&mut session, 0).await.is_err());
    assert_eq!(session.capture().status(), CaptureStatus::Reviewing);

    orchestrator.submit(&mut session, 0).await.unwrap();
    assert_eq!(session.capture().status(), CaptureStatus::Done);
}

#[tokio::test]
async fn reset_stops_capture_and_clears_every_question() {
    let backend = FakeBackend::new().with_recording(canned_recording());
    let mut session =
        AssessmentSession::new(setup(), vec!["q1".to_string(), "q2".to_string()]);
    let mut capture = MediaCapture::new(&backend, Duration::from_secs(120));

    capture.start(&StreamConstraints::default()).unwrap();
    session.capture_mut().begin_recording().unwrap();
    assert_eq!(backend.open_streams(), 1);

    // Restarting the assessment stops the live recording first, then
    // force-returns everything to idle
    capture.abort();
    session.reset();

    assert_eq!(backend.open_streams(), 0);
    assert_eq!(session.capture().status(), CaptureStatus::Idle);
    assert_eq!(session.current_index(), 0);
    assert_eq!(session.answered_count(), 0);
}

#[tokio::test]
async fn feedback_list_aligns_with_question_indices() {
    let backend = FakeBackend::new();
    let store = FakeStore::ok();
    let speech = FakeSpeech::ok();
    let analysis = FakeAnalysis::ok();
    let orchestrator = UploadOrchestrator::new(&store, &speech, &analysis, &backend);

    let mut session = AssessmentSession::new(
        setup(),
        vec!["q1".to_string(), "q2".to_string(), "q3".to_string()],
    );

    // Skip question 0, answer question 1, stop before question 2
    session.advance().unwrap();
    session.capture_mut().begin_recording().unwrap();
    session
        .capture_mut()
        .finish_recording(audio_artifact(), 7)
        .unwrap();
    orchestrator.submit(&mut session, 1).await.unwrap();

    let values = session.feedback_values();
    assert!(values[0].is_none());
    assert!(values[1].is_some());
    assert!(values[2].is_none());

    // Holes contribute nothing to the aggregate
    let report = viva::feedback::aggregate(&values);
    assert_eq!(report.grammar, 80.0);
    assert_eq!(report.overall_score, 86);
}
