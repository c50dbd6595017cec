//! The persisted unit of one finished assessment.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::feedback::{aggregate, statistics, AssessmentStatistics, OverallReport};
use crate::session::AssessmentSetup;

/// Serialized form of one assessment, as handed to the persistence
/// collaborator and re-parsed for the report view.
///
/// `overall_score` and `statistics` are always recomputed from the
/// feedback list at save time; values carried in a parsed record are never
/// trusted as-is.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssessmentRecord {
    pub questions: Vec<String>,
    pub feedback: Vec<Option<Value>>,
    pub setup: AssessmentSetup,
    #[serde(default)]
    pub overall_score: u32,
    #[serde(default)]
    pub statistics: AssessmentStatistics,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub saved_at: Option<DateTime<Utc>>,
}

impl AssessmentRecord {
    /// Builds a record from a finished session's state and computes its
    /// derived fields.
    pub fn new(questions: Vec<String>, feedback: Vec<Option<Value>>, setup: AssessmentSetup) -> Self {
        let mut record = Self {
            questions,
            feedback,
            setup,
            overall_score: 0,
            statistics: AssessmentStatistics::default(),
            saved_at: None,
        };
        record.finalize();
        record
    }

    /// Recomputes the derived fields from the feedback list and returns
    /// the full overall report.
    ///
    /// Feedback entries beyond the question count cannot belong to any
    /// question and are dropped.
    pub fn finalize(&mut self) -> OverallReport {
        if self.feedback.len() > self.questions.len() {
            tracing::warn!(
                "Dropping {} feedback entries with no matching question",
                self.feedback.len() - self.questions.len()
            );
            self.feedback.truncate(self.questions.len());
        }

        let report = aggregate(&self.feedback);
        self.overall_score = report.overall_score;
        self.statistics = statistics(&self.feedback);
        report
    }

    /// Re-parses a record from its stored serialized form.
    pub fn from_json(data: &str) -> anyhow::Result<Self> {
        let record: AssessmentRecord = serde_json::from_str(data)?;
        Ok(record)
    }

    pub fn to_json(&self) -> anyhow::Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn setup() -> AssessmentSetup {
        AssessmentSetup {
            topic: "networking".to_string(),
            difficulty: "hard".to_string(),
            language: "English".to_string(),
        }
    }

    #[test]
    fn derived_fields_are_computed_on_construction() {
        let feedback = vec![Some(json!({
            "transcribedText": "TCP is reliable",
            "grammar": { "error_count": 0 },
            "pronunciation": { "error_count": 0 },
            "fluency": { "fluency_score": 100.0 },
            "correctness": { "score": 100.0, "detailed_feedback": "" },
        }))];
        let record = AssessmentRecord::new(vec!["Explain TCP.".to_string()], feedback, setup());
        assert_eq!(record.overall_score, 100);
        assert_eq!(record.statistics.answered_questions, 1);
    }

    #[test]
    fn finalize_overrides_hand_edited_scores() {
        let mut record = AssessmentRecord::new(vec!["q".to_string()], vec![None], setup());
        record.overall_score = 95;
        record.finalize();
        assert_eq!(record.overall_score, 0);
    }

    #[test]
    fn excess_feedback_entries_are_dropped() {
        let mut record = AssessmentRecord::new(vec!["q".to_string()], vec![None], setup());
        record.feedback.push(Some(json!({})));
        record.feedback.push(Some(json!({})));
        record.finalize();
        assert_eq!(record.feedback.len(), record.questions.len());
    }

    #[test]
    fn records_round_trip_through_json() {
        let record = AssessmentRecord::new(vec!["q".to_string()], vec![None], setup());
        let json = record.to_json().unwrap();
        let parsed = AssessmentRecord::from_json(&json).unwrap();
        assert_eq!(parsed.questions, record.questions);
        assert_eq!(parsed.overall_score, record.overall_score);
    }
}
