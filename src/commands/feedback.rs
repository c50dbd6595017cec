//! Report entry: consume the last session's snapshot, aggregate it and
//! save the assessment record.

use console::style;

use crate::config::VivaConfig;
use crate::feedback::OverallReport;
use crate::report::{AssessmentClient, AssessmentRecord, ReportHistory};
use crate::session::{AssessmentSetup, FeedbackSnapshot, SnapshotStore, FEEDBACK_KEY, SETUP_KEY};

/// Shows the report for the most recently finished session and offers to
/// save it.
///
/// The snapshot handoff is read-once: viewing the report consumes it.
pub async fn handle_feedback() -> anyhow::Result<()> {
    tracing::info!("=== viva feedback ===");

    let snapshots = SnapshotStore::open_default()?;
    let Some(snapshot) = snapshots.take::<FeedbackSnapshot>(FEEDBACK_KEY)? else {
        println!("No finished assessment found. Run 'viva assess' first.");
        return Ok(());
    };
    // The setup handoff is consumed together with the feedback
    let _ = snapshots.take::<AssessmentSetup>(SETUP_KEY)?;

    let mut record =
        AssessmentRecord::new(snapshot.questions, snapshot.feedback, snapshot.setup);
    let report = record.finalize();
    render_report(&record, &report);

    let config = VivaConfig::load()?;
    if !cliclack::confirm("Save this report?")
        .initial_value(true)
        .interact()?
    {
        println!("Report discarded.");
        return Ok(());
    }

    record.saved_at = Some(chrono::Utc::now());

    let remote_id = if config.user.email.is_empty() {
        println!(
            "{}",
            style("No user email configured; saving locally only. Set [user].email in 'viva config' to sync reports.")
                .yellow()
        );
        None
    } else {
        let client = AssessmentClient::new(&config.services.assessments_url, &config.user.email);
        match client.save(&record).await {
            Ok(id) => Some(id),
            Err(e) => {
                tracing::warn!("Remote save failed: {e}");
                println!(
                    "{}",
                    style(format!("Could not save remotely ({e}); keeping a local copy.")).yellow()
                );
                None
            }
        }
    };

    let mut history = ReportHistory::open_default()?;
    let local_id = history.record(remote_id.as_deref(), &record)?;
    println!(
        "Report saved{} (local #{local_id}).",
        remote_id
            .map(|id| format!(" as {id}"))
            .unwrap_or_default()
    );
    Ok(())
}

/// Prints an assessment record's overall report and per-question details.
pub fn render_report(record: &AssessmentRecord, report: &OverallReport) {
    println!();
    println!(
        "  {}  {}",
        style("Overall score").bold(),
        style(format!("{}%", report.overall_score)).bold().green()
    );
    println!();
    println!("  Grammar        {:>5.1}%", report.grammar);
    println!("  Pronunciation  {:>5.1}%", report.pronunciation);
    println!("  Fluency        {:>5.1}%", report.fluency);
    println!("  Correctness    {:>5.1}%", report.correctness);
    println!();
    println!(
        "  {} of {} questions answered · {} filler words · {} pauses",
        record.statistics.answered_questions,
        record.questions.len(),
        record.statistics.total_filler_words,
        record.statistics.total_pauses,
    );

    for warning in &report.warnings {
        println!(
            "  {}",
            style(format!(
                "Warning: feedback for question {} was unreadable and was excluded ({})",
                warning.question_index + 1,
                warning.detail
            ))
            .yellow()
        );
    }

    println!();
    for (index, question) in record.questions.iter().enumerate() {
        let entry = record.feedback.get(index).and_then(|f| f.as_ref());
        match entry {
            Some(value) => {
                let transcript = value
                    .get("transcribedText")
                    .and_then(|t| t.as_str())
                    .unwrap_or("(no transcript)");
                let preview: String = transcript.chars().take(100).collect();
                println!("  {}. {}", index + 1, style(question).bold());
                println!("     \u{201c}{preview}\u{201d}");
            }
            None => {
                println!(
                    "  {}. {} {}",
                    index + 1,
                    style(question).bold(),
                    style("(unanswered)").dim()
                );
            }
        }
    }
    println!();
}
