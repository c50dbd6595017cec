//! The interactive assessment flow: question by question, record an
//! answer, review it, submit it through the upload pipeline.

use console::style;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::config::VivaConfig;
use crate::error::AssessmentError;
use crate::media::{DeviceBackend, LevelMeter, MediaCapture, StreamConstraints};
use crate::pipeline::{
    HttpAnalysisService, HttpArtifactStore, HttpQuestionService, HttpSpeechService,
    UploadOrchestrator,
};
use crate::session::{
    AssessmentSession, AssessmentSetup, CaptureStatus, FeedbackSnapshot, SnapshotStore,
    FEEDBACK_KEY, SETUP_KEY,
};

/// How one question's interaction ended.
enum QuestionOutcome {
    Answered,
    Skipped,
    FinishEarly,
}

/// Runs a full assessment session.
pub async fn handle_assess(
    topic: Option<String>,
    difficulty: Option<String>,
    language: Option<String>,
) -> anyhow::Result<()> {
    tracing::info!("=== viva assessment started ===");

    let config = match VivaConfig::load() {
        Ok(config) => config,
        Err(err) => {
            tracing::error!("Failed to load configuration: {err}");
            eprintln!(
                "Configuration error: {err}\n\nCheck your ~/.config/viva/viva.toml file and try again."
            );
            return Err(anyhow::anyhow!("Configuration error: {err}"));
        }
    };

    let setup = AssessmentSetup {
        topic: topic.unwrap_or_else(|| config.assessment.topic.clone()),
        difficulty: difficulty.unwrap_or_else(|| config.assessment.difficulty.clone()),
        language: language.unwrap_or_else(|| config.assessment.language.clone()),
    };

    cliclack::intro(style(" viva ").on_white().black())?;
    cliclack::log::info(format!(
        "Topic: {}  ·  Difficulty: {}  ·  Language: {}",
        setup.topic, setup.difficulty, setup.language
    ))?;

    // Hand the setup off for the report view before anything can fail
    let snapshots = SnapshotStore::open_default()?;
    snapshots.put(SETUP_KEY, &setup)?;

    let spinner = cliclack::spinner();
    spinner.start("Generating interview questions...");
    let questions = match HttpQuestionService::new(&config.services.questions_url)
        .generate(&setup)
        .await
    {
        Ok(questions) => {
            spinner.stop(format!("{} questions ready", questions.len()));
            questions
        }
        Err(e) => {
            spinner.error("Could not generate questions");
            cliclack::outro_cancel(e.to_string())?;
            return Err(anyhow::anyhow!(e));
        }
    };

    let mut session = AssessmentSession::new(setup.clone(), questions);

    let backend = DeviceBackend::new();
    let mut capture = MediaCapture::new(
        &backend,
        Duration::from_secs(config.recording.max_seconds),
    );
    let constraints = StreamConstraints {
        audio: true,
        video: true,
        device: config.audio.device.clone(),
        sample_rate: config.audio.sample_rate,
    };

    let store = HttpArtifactStore::new(
        &config.services.storage_url,
        config.services.presigned_upload,
    );
    let speech = HttpSpeechService::new(&config.services.speech_url);
    let analysis = HttpAnalysisService::new(&config.services.analysis_url);
    let orchestrator = UploadOrchestrator::new(&store, &speech, &analysis, &backend);

    // Ctrl-C stops an active recording instead of killing the process
    let interrupted = Arc::new(AtomicBool::new(false));
    {
        let interrupted = Arc::clone(&interrupted);
        let _ = ctrlc::set_handler(move || {
            interrupted.store(true, Ordering::Relaxed);
        });
    }

    loop {
        let index = session.current_index();
        cliclack::note(
            format!("Question {}/{}", index + 1, session.questions().len()),
            session.current_question(),
        )?;

        let outcome = run_question(
            &mut session,
            &mut capture,
            &orchestrator,
            &constraints,
            index,
            &interrupted,
        )
        .await?;

        match outcome {
            QuestionOutcome::FinishEarly => break,
            QuestionOutcome::Answered | QuestionOutcome::Skipped => {
                if !session.advance()? {
                    break;
                }
            }
        }

        if interrupted.load(Ordering::Relaxed) {
            cliclack::log::warning("Assessment interrupted")?;
            break;
        }
    }

    // Make sure no device tracks outlive the question loop
    capture.abort();
    session.capture_mut().cancel_recording();

    if session.answered_count() == 0 {
        cliclack::outro_cancel("No questions were answered.")?;
        return Ok(());
    }

    upload_session_recordings(&orchestrator, &mut session).await?;

    let snapshot = FeedbackSnapshot {
        questions: session.questions().to_vec(),
        feedback: session.feedback_values(),
        setup,
    };
    snapshots.put(FEEDBACK_KEY, &snapshot)?;

    let view_now = cliclack::confirm("View your feedback report now?")
        .initial_value(true)
        .interact()?;
    cliclack::outro(format!(
        "Assessment finished: {}/{} questions answered.",
        session.answered_count(),
        session.questions().len()
    ))?;

    if view_now {
        crate::commands::feedback::handle_feedback().await?;
    } else {
        println!("Run 'viva feedback' to view and save your report.");
    }

    tracing::info!("=== viva assessment finished ===");
    Ok(())
}

/// Drives one question through its capture lifecycle until it is answered,
/// skipped, or the user ends the assessment.
async fn run_question(
    session: &mut AssessmentSession,
    capture: &mut MediaCapture<'_>,
    orchestrator: &UploadOrchestrator<'_>,
    constraints: &StreamConstraints,
    index: usize,
    interrupted: &Arc<AtomicBool>,
) -> anyhow::Result<QuestionOutcome> {
    loop {
        if interrupted.load(Ordering::Relaxed) {
            return Ok(QuestionOutcome::FinishEarly);
        }

        match session.capture().status() {
            CaptureStatus::Idle => {
                let action = cliclack::select("Ready?")
                    .item("record", "Record your answer", "")
                    .item("skip", "Skip this question", "leaves it unanswered")
                    .item("finish", "Finish the assessment", "")
                    .interact()?;

                match action {
                    "record" => {
                        if let Err(e) = capture.start(constraints) {
                            // Device errors are terminal for this attempt;
                            // the user decides whether to try again
                            tracing::error!("Failed to start recording: {e}");
                            cliclack::log::error(format!("{e}"))?;
                            continue;
                        }
                        session.capture_mut().begin_recording()?;
                        record_answer(session, capture, interrupted).await?;
                    }
                    "skip" => return Ok(QuestionOutcome::Skipped),
                    _ => return Ok(QuestionOutcome::FinishEarly),
                }
            }
            CaptureStatus::Reviewing => {
                let size = session
                    .capture()
                    .artifact()
                    .map(|a| a.size())
                    .unwrap_or(0);
                let action = cliclack::select(format!(
                    "Recorded {}s ({} KiB). What next?",
                    session.capture().elapsed_seconds,
                    size / 1024
                ))
                .item("submit", "Submit this answer", "")
                .item("retake", "Retake", "discards this recording")
                .item("finish", "Finish the assessment", "")
                .interact()?;

                match action {
                    "submit" => {
                        let spinner = cliclack::spinner();
                        spinner.start("Uploading and analyzing your answer...");
                        match orchestrator.submit(session, index).await {
                            Ok(feedback) => {
                                spinner.stop("Answer analyzed");
                                let preview: String =
                                    feedback.transcribed_text.chars().take(120).collect();
                                cliclack::log::info(format!("You said: \u{201c}{preview}\u{201d}"))?;
                            }
                            Err(
                                e @ (AssessmentError::StorageUpload(_)
                                | AssessmentError::Transcription(_)
                                | AssessmentError::Analysis(_)
                                | AssessmentError::Decode(_)),
                            ) => {
                                // Session is back in reviewing with the
                                // recording preserved; offer retry/retake
                                spinner.error("Submission failed");
                                cliclack::log::error(format!("{e}"))?;
                            }
                            Err(e) => return Err(e.into()),
                        }
                    }
                    "retake" => {
                        session.capture_mut().retake()?;
                    }
                    _ => return Ok(QuestionOutcome::FinishEarly),
                }
            }
            CaptureStatus::Done => return Ok(QuestionOutcome::Answered),
            status => {
                // Recording/submitting are driven inline above and should
                // never be observed here
                return Err(anyhow::anyhow!("unexpected session state: {status}"));
            }
        }
    }
}

/// Runs an active recording until Enter, Ctrl-C or the time limit.
async fn record_answer(
    session: &mut AssessmentSession,
    capture: &mut MediaCapture<'_>,
    interrupted: &Arc<AtomicBool>,
) -> anyhow::Result<()> {
    let stop = Arc::new(AtomicBool::new(false));

    // Enter stops the recording
    let listener = {
        let stop = Arc::clone(&stop);
        tokio::task::spawn_blocking(move || {
            let mut line = String::new();
            let _ = std::io::stdin().read_line(&mut line);
            stop.store(true, Ordering::Relaxed);
        })
    };

    // So does Ctrl-C
    let watcher = {
        let stop = Arc::clone(&stop);
        let interrupted = Arc::clone(interrupted);
        tokio::spawn(async move {
            while !interrupted.load(Ordering::Relaxed) {
                tokio::time::sleep(Duration::from_millis(100)).await;
            }
            stop.store(true, Ordering::Relaxed);
        })
    };

    let mut meter = LevelMeter::new();
    let (artifact, elapsed) = capture.run(&mut meter, &stop).await?;
    watcher.abort();

    // The listener owns stdin until it sees a newline; wait for it so the
    // next prompt does not lose its first line of input
    if !listener.is_finished() {
        eprintln!(
            "{}",
            style("Recording stopped. Press Enter to continue.").dim()
        );
        let _ = listener.await;
    } else {
        let _ = listener.await;
    }

    match session
        .capture_mut()
        .finish_recording(artifact, elapsed.as_secs() as u32)
    {
        Ok(()) => Ok(()),
        Err(AssessmentError::EmptyRecording) => {
            cliclack::log::error(
                "The recording contained no data. Check your microphone and record again.",
            )?;
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

/// Re-uploads the session's recordings for durable URLs before saving.
async fn upload_session_recordings(
    orchestrator: &UploadOrchestrator<'_>,
    session: &mut AssessmentSession,
) -> anyhow::Result<()> {
    let total = session.archive().iter().filter(|a| a.is_some()).count();
    if total == 0 {
        return Ok(());
    }

    let bar = cliclack::progress_bar(total as u64);
    bar.start("Uploading recordings for your report...");
    let mut on_progress = |fraction: f64| {
        bar.inc(1);
        tracing::debug!("Session upload progress: {:.0}%", fraction * 100.0);
    };

    let urls = orchestrator
        .upload_all(session.archive(), &mut on_progress)
        .await;
    match urls {
        Ok(urls) => {
            bar.stop("Recordings uploaded");
            session.apply_durable_urls(&urls);
        }
        Err(e) => {
            bar.stop("Some recordings could not be uploaded");
            session.apply_durable_urls(&e.urls);
            cliclack::log::warning(format!(
                "{e}. Their feedback is kept, but the recordings will not be replayable."
            ))?;
        }
    }
    Ok(())
}
