//! Run a pre-recorded answer file through the full feedback pipeline.

use console::style;
use std::path::PathBuf;

use crate::config::VivaConfig;
use crate::media::{DeviceBackend, MediaArtifact, MediaKind};
use crate::pipeline::{
    HttpAnalysisService, HttpArtifactStore, HttpSpeechService, UploadOrchestrator,
};
use crate::session::{AssessmentSession, AssessmentSetup};

/// Analyzes an existing recording as the answer to one question.
///
/// Video containers go through real-time audio extraction first, so a long
/// video takes as long to extract as it does to play.
pub async fn handle_analyze(file: PathBuf, question: Option<String>) -> anyhow::Result<()> {
    tracing::info!("=== viva analyze: {} ===", file.display());

    let config = VivaConfig::load()?;

    let kind = MediaKind::from_path(&file).ok_or_else(|| {
        anyhow::anyhow!(
            "Unsupported file type: {}. Supported: webm, mp4, mov, mkv, wav, mp3, ogg, m4a, flac.",
            file.display()
        )
    })?;
    let data = std::fs::read(&file)
        .map_err(|e| anyhow::anyhow!("Failed to read {}: {e}", file.display()))?;
    let artifact = MediaArtifact::new(kind, data);

    if artifact.is_empty() {
        return Err(anyhow::anyhow!("{} is empty", file.display()));
    }

    if kind == MediaKind::Video {
        println!(
            "{}",
            style("Video input: audio will be extracted by playing the file through, which takes as long as the video runs.")
                .dim()
        );
    }

    let question_text = question.unwrap_or_else(|| {
        file.file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "Recorded answer".to_string())
    });

    let setup = AssessmentSetup {
        topic: config.assessment.topic.clone(),
        difficulty: config.assessment.difficulty.clone(),
        language: config.assessment.language.clone(),
    };
    let mut session = AssessmentSession::new(setup, vec![question_text]);

    // Walk the capture lifecycle with the file standing in for a live
    // recording
    let elapsed = 0;
    session.capture_mut().begin_recording()?;
    session.capture_mut().finish_recording(artifact, elapsed)?;

    let backend = DeviceBackend::new();
    let store = HttpArtifactStore::new(
        &config.services.storage_url,
        config.services.presigned_upload,
    );
    let speech = HttpSpeechService::new(&config.services.speech_url);
    let analysis = HttpAnalysisService::new(&config.services.analysis_url);
    let orchestrator = UploadOrchestrator::new(&store, &speech, &analysis, &backend);

    let feedback = orchestrator.submit(&mut session, 0).await?;

    println!();
    println!("{}", style("Transcript").bold());
    println!("  {}", feedback.transcribed_text);
    println!();
    println!("{}", style("Feedback").bold());
    println!(
        "  Grammar: {} errors · Pronunciation: {} errors",
        feedback.analysis.grammar.error_count, feedback.analysis.pronunciation.error_count
    );
    println!(
        "  Fluency: {:.0}% ({} filler words) · Correctness: {:.0}%",
        feedback.analysis.fluency.fluency_score,
        feedback.analysis.fluency.filler_word_count,
        feedback.analysis.correctness.score
    );
    println!(
        "  Vocabulary: {:.0}% · Pauses: {}",
        feedback.analysis.vocabulary.vocabulary_score, feedback.analysis.pause_count
    );
    if !feedback.analysis.correctness.detailed_feedback.is_empty() {
        println!();
        println!("  {}", feedback.analysis.correctness.detailed_feedback);
    }
    if let Some(url) = &feedback.video_url {
        println!();
        println!("  Stored at: {url}");
    }

    Ok(())
}
