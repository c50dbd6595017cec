//! Browse, inspect and delete saved assessment reports.

use console::style;

use crate::commands::feedback::render_report;
use crate::config::VivaConfig;
use crate::report::{AssessmentClient, AssessmentRecord, ReportHistory};

/// Lists locally cached reports, newest first.
pub async fn handle_reports() -> anyhow::Result<()> {
    let mut history = ReportHistory::open_default()?;
    let entries = history.entries()?;

    if entries.is_empty() {
        println!("No saved reports yet. Finish an assessment with 'viva assess' to create one.");
        return Ok(());
    }

    println!();
    println!(
        "  {:<6} {:<12} {:<24} {:>6} {:>10}",
        style("id").bold(),
        style("date").bold(),
        style("topic").bold(),
        style("score").bold(),
        style("questions").bold()
    );
    for entry in &entries {
        println!(
            "  {:<6} {:<12} {:<24} {:>5}% {:>10}",
            entry.id,
            entry.created_at.format("%Y-%m-%d"),
            truncate(&entry.topic, 24),
            entry.overall_score,
            entry.question_count
        );
    }
    println!();
    println!("Show one with 'viva report <id>'.");
    Ok(())
}

/// Shows one report in full, re-parsed and re-aggregated from its stored
/// form.
///
/// Numeric ids resolve against the local cache; other ids are fetched from
/// the persistence service.
pub async fn handle_report(id: String) -> anyhow::Result<()> {
    let data = match id.parse::<i64>() {
        Ok(local_id) => {
            let mut history = ReportHistory::open_default()?;
            match history.get(local_id)? {
                Some(entry) => entry.data,
                None => {
                    return Err(anyhow::anyhow!(
                        "No local report #{local_id}. Run 'viva reports' to list them."
                    ))
                }
            }
        }
        Err(_) => {
            let config = VivaConfig::load()?;
            if config.user.email.is_empty() {
                return Err(anyhow::anyhow!(
                    "No user email configured; cannot fetch remote reports. Set [user].email in 'viva config'."
                ));
            }
            let client =
                AssessmentClient::new(&config.services.assessments_url, &config.user.email);
            client.fetch(&id).await.map_err(anyhow::Error::from)?.data
        }
    };

    let mut record = AssessmentRecord::from_json(&data)
        .map_err(|e| anyhow::anyhow!("Stored report could not be parsed: {e}"))?;
    // Scores are always recomputed from the stored feedback, never trusted
    let report = record.finalize();
    render_report(&record, &report);
    Ok(())
}

/// Deletes a remotely stored report and drops its local cache row.
pub async fn handle_delete(id: String) -> anyhow::Result<()> {
    let config = VivaConfig::load()?;
    if config.user.email.is_empty() {
        return Err(anyhow::anyhow!(
            "No user email configured; cannot delete remote reports."
        ));
    }

    let confirmed = cliclack::confirm(format!("Delete assessment {id}? This cannot be undone."))
        .initial_value(false)
        .interact()?;
    if !confirmed {
        println!("Nothing deleted.");
        return Ok(());
    }

    let client = AssessmentClient::new(&config.services.assessments_url, &config.user.email);
    client.delete(&id).await.map_err(anyhow::Error::from)?;

    let mut history = ReportHistory::open_default()?;
    history.forget_remote(&id)?;

    println!("Assessment {id} deleted.");
    Ok(())
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        let cut: String = text.chars().take(max.saturating_sub(1)).collect();
        format!("{cut}\u{2026}")
    }
}
