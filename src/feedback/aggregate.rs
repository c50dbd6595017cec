//! Pure aggregation of per-question feedback into one overall report.
//!
//! No I/O happens here. The input is the raw feedback list as stored on an
//! assessment record: one slot per question, `None` where a question never
//! completed. Entries that fail to parse are excluded from both the sum and
//! the divisor and surfaced as warnings instead of skewing the averages.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::feedback::model::QuestionFeedback;

/// Relative weight of each scored dimension in the composite score.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DimensionWeights {
    pub grammar: f64,
    pub pronunciation: f64,
    pub fluency: f64,
    pub correctness: f64,
}

impl Default for DimensionWeights {
    fn default() -> Self {
        Self {
            grammar: 0.25,
            pronunciation: 0.25,
            fluency: 0.25,
            correctness: 0.25,
        }
    }
}

/// A non-fatal problem found while aggregating.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedbackWarning {
    pub question_index: usize,
    pub detail: String,
}

/// Derived overall view of an assessment. Recomputed on demand, never
/// persisted on its own.
#[derive(Debug, Clone, PartialEq)]
pub struct OverallReport {
    /// Average grammar score, 0-100.
    pub grammar: f64,
    /// Average pronunciation score, 0-100.
    pub pronunciation: f64,
    /// Average fluency score, 0-100.
    pub fluency: f64,
    /// Average answer-correctness score, 0-100.
    pub correctness: f64,
    /// Weighted composite, rounded to the nearest integer.
    pub overall_score: u32,
    pub warnings: Vec<FeedbackWarning>,
}

/// Headline counters stored alongside the overall score.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssessmentStatistics {
    pub answered_questions: usize,
    pub total_filler_words: u64,
    pub total_pauses: u64,
    pub advanced_word_count: u64,
}

fn grammar_score(error_count: u32) -> f64 {
    (100.0 - error_count as f64 * 10.0).max(0.0)
}

fn pronunciation_score(error_count: u32) -> f64 {
    (100.0 - error_count as f64 * 5.0).max(0.0)
}

fn clamp_score(score: f64) -> f64 {
    score.clamp(0.0, 100.0)
}

/// Parses the entries that are present, recording a warning per entry that
/// is not valid structured feedback.
fn parse_entries(feedback: &[Option<Value>]) -> (Vec<QuestionFeedback>, Vec<FeedbackWarning>) {
    let mut parsed = Vec::new();
    let mut warnings = Vec::new();

    for (index, slot) in feedback.iter().enumerate() {
        let Some(value) = slot else {
            continue;
        };
        match serde_json::from_value::<QuestionFeedback>(value.clone()) {
            Ok(entry) => parsed.push(entry),
            Err(e) => warnings.push(FeedbackWarning {
                question_index: index,
                detail: format!("feedback entry is not valid structured data: {e}"),
            }),
        }
    }

    (parsed, warnings)
}

/// Aggregates a feedback list with the default equal weights.
pub fn aggregate(feedback: &[Option<Value>]) -> OverallReport {
    aggregate_with_weights(feedback, &DimensionWeights::default())
}

/// Aggregates a feedback list into one overall report.
///
/// Never fails: an empty or entirely-malformed list degrades to all-zero
/// averages plus warnings.
pub fn aggregate_with_weights(
    feedback: &[Option<Value>],
    weights: &DimensionWeights,
) -> OverallReport {
    let (entries, warnings) = parse_entries(feedback);

    let count = entries.len().max(1) as f64;
    let mut grammar = 0.0;
    let mut pronunciation = 0.0;
    let mut fluency = 0.0;
    let mut correctness = 0.0;

    for entry in &entries {
        grammar += clamp_score(grammar_score(entry.analysis.grammar.error_count));
        pronunciation += clamp_score(pronunciation_score(entry.analysis.pronunciation.error_count));
        fluency += clamp_score(entry.analysis.fluency.fluency_score);
        correctness += clamp_score(entry.analysis.correctness.score);
    }

    let grammar = grammar / count;
    let pronunciation = pronunciation / count;
    let fluency = fluency / count;
    let correctness = correctness / count;

    let composite = weights.grammar * grammar
        + weights.pronunciation * pronunciation
        + weights.fluency * fluency
        + weights.correctness * correctness;
    let overall_score = clamp_score(composite).round() as u32;

    OverallReport {
        grammar,
        pronunciation,
        fluency,
        correctness,
        overall_score,
        warnings,
    }
}

/// Computes the headline counters for an assessment record.
pub fn statistics(feedback: &[Option<Value>]) -> AssessmentStatistics {
    let (entries, _) = parse_entries(feedback);

    AssessmentStatistics {
        answered_questions: entries.len(),
        total_filler_words: entries
            .iter()
            .map(|e| e.analysis.fluency.filler_word_count as u64)
            .sum(),
        total_pauses: entries.iter().map(|e| e.analysis.pause_count as u64).sum(),
        advanced_word_count: entries
            .iter()
            .map(|e| e.analysis.vocabulary.unique_advanced_words.len() as u64)
            .sum(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn entry(
        grammar_errors: u32,
        pronunciation_errors: u32,
        fluency_score: f64,
        correctness_score: f64,
    ) -> Value {
        json!({
            "transcribedText": "sample answer",
            "grammar": { "error_count": grammar_errors, "errors": [] },
            "pronunciation": { "error_count": pronunciation_errors, "errors": [] },
            "fluency": { "fluency_score": fluency_score, "filler_word_count": 2,
                         "filler_words": [{ "word": "um", "context": "well um yes" }] },
            "vocabulary": { "vocabulary_score": 70.0, "unique_advanced_words": ["articulate"] },
            "correctness": { "score": correctness_score, "detailed_feedback": "solid" },
            "pause_count": 3,
            "videoUrl": "https://cdn.example/q0.mp3"
        })
    }

    #[test]
    fn grammar_score_is_linear_and_clamped() {
        assert_eq!(grammar_score(0), 100.0);
        assert_eq!(grammar_score(2), 80.0);
        assert_eq!(grammar_score(10), 0.0);
        // 15 errors would be -50 unclamped
        assert_eq!(grammar_score(15), 0.0);
    }

    #[test]
    fn pronunciation_score_is_linear_and_clamped() {
        assert_eq!(pronunciation_score(0), 100.0);
        assert_eq!(pronunciation_score(1), 95.0);
        assert_eq!(pronunciation_score(20), 0.0);
        assert_eq!(pronunciation_score(40), 0.0);
    }

    #[test]
    fn empty_input_yields_zeroes_without_error() {
        let report = aggregate(&[]);
        assert_eq!(report.grammar, 0.0);
        assert_eq!(report.pronunciation, 0.0);
        assert_eq!(report.fluency, 0.0);
        assert_eq!(report.correctness, 0.0);
        assert_eq!(report.overall_score, 0);
        assert!(report.warnings.is_empty());
    }

    #[test]
    fn single_entry_composite_rounds_to_nearest() {
        let report = aggregate(&[Some(entry(2, 1, 80.0, 90.0))]);
        assert_eq!(report.grammar, 80.0);
        assert_eq!(report.pronunciation, 95.0);
        assert_eq!(report.fluency, 80.0);
        assert_eq!(report.correctness, 90.0);
        // round(0.25 * (80 + 95 + 80 + 90)) = round(86.25)
        assert_eq!(report.overall_score, 86);
    }

    #[test]
    fn holes_are_skipped_not_counted() {
        let report = aggregate(&[None, Some(entry(0, 0, 100.0, 100.0)), None]);
        assert_eq!(report.overall_score, 100);
        assert!(report.warnings.is_empty());
    }

    #[test]
    fn malformed_entry_is_excluded_and_warned() {
        let valid_alone = aggregate(&[Some(entry(2, 1, 80.0, 90.0))]);
        let mixed = aggregate(&[Some(entry(2, 1, 80.0, 90.0)), Some(json!("not feedback"))]);

        assert_eq!(mixed.grammar, valid_alone.grammar);
        assert_eq!(mixed.overall_score, valid_alone.overall_score);
        assert_eq!(mixed.warnings.len(), 1);
        assert_eq!(mixed.warnings[0].question_index, 1);
    }

    #[test]
    fn out_of_range_dimension_scores_are_clamped() {
        let report = aggregate(&[Some(entry(0, 0, 250.0, -10.0))]);
        assert_eq!(report.fluency, 100.0);
        assert_eq!(report.correctness, 0.0);
    }

    #[test]
    fn custom_weights_shift_the_composite() {
        let weights = DimensionWeights {
            grammar: 1.0,
            pronunciation: 0.0,
            fluency: 0.0,
            correctness: 0.0,
        };
        let report = aggregate_with_weights(&[Some(entry(3, 9, 10.0, 10.0))], &weights);
        assert_eq!(report.overall_score, 70);
    }

    #[test]
    fn averages_cover_multiple_entries() {
        let report = aggregate(&[
            Some(entry(0, 0, 100.0, 100.0)),
            Some(entry(10, 20, 0.0, 0.0)),
        ]);
        assert_eq!(report.grammar, 50.0);
        assert_eq!(report.pronunciation, 50.0);
        assert_eq!(report.fluency, 50.0);
        assert_eq!(report.correctness, 50.0);
        assert_eq!(report.overall_score, 50);
    }

    #[test]
    fn statistics_count_answers_and_fillers() {
        let stats = statistics(&[
            Some(entry(0, 0, 90.0, 90.0)),
            None,
            Some(entry(1, 1, 80.0, 80.0)),
            Some(json!(42)),
        ]);
        assert_eq!(stats.answered_questions, 2);
        assert_eq!(stats.total_filler_words, 4);
        assert_eq!(stats.total_pauses, 6);
        assert_eq!(stats.advanced_word_count, 2);
    }
}
