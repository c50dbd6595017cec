//! Feedback payload shapes shared with the analysis collaborator.
//!
//! Field names mirror the analysis service wire format; every dimension
//! defaults to its zero value so a partial payload still deserializes.

use serde::{Deserialize, Serialize};

/// Grammar dimension: error count plus suggested corrections.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GrammarFeedback {
    #[serde(default)]
    pub error_count: u32,
    #[serde(default)]
    pub errors: Vec<GrammarIssue>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GrammarIssue {
    #[serde(default)]
    pub word: String,
    #[serde(default)]
    pub suggestion: String,
    #[serde(default)]
    pub explanation: String,
}

/// Pronunciation dimension: error count plus phonetic hints.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PronunciationFeedback {
    #[serde(default)]
    pub error_count: u32,
    #[serde(default)]
    pub errors: Vec<PronunciationIssue>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PronunciationIssue {
    #[serde(default)]
    pub word: String,
    #[serde(default)]
    pub phonetic: String,
    #[serde(default)]
    pub explanation: String,
}

/// Fluency dimension: a 0-100 score plus detected filler words.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FluencyFeedback {
    #[serde(default)]
    pub fluency_score: f64,
    #[serde(default)]
    pub filler_word_count: u32,
    #[serde(default)]
    pub filler_words: Vec<FillerWord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feedback: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FillerWord {
    #[serde(default)]
    pub word: String,
    #[serde(default)]
    pub context: String,
}

/// Vocabulary dimension: a 0-100 score plus notable word choices.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VocabularyFeedback {
    #[serde(default)]
    pub vocabulary_score: f64,
    #[serde(default)]
    pub unique_advanced_words: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feedback: Option<String>,
}

/// Answer-correctness dimension: a 0-100 score plus prose feedback.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CorrectnessFeedback {
    #[serde(default)]
    pub score: f64,
    #[serde(default)]
    pub detailed_feedback: String,
}

/// Full analysis of one transcribed answer, as returned by the analysis
/// collaborator.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnswerAnalysis {
    #[serde(default)]
    pub grammar: GrammarFeedback,
    #[serde(default)]
    pub pronunciation: PronunciationFeedback,
    #[serde(default)]
    pub fluency: FluencyFeedback,
    #[serde(default)]
    pub vocabulary: VocabularyFeedback,
    #[serde(default)]
    pub correctness: CorrectnessFeedback,
    #[serde(default)]
    pub pause_count: u32,
}

/// The result of one question's full pipeline run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QuestionFeedback {
    #[serde(rename = "transcribedText", default)]
    pub transcribed_text: String,
    #[serde(flatten)]
    pub analysis: AnswerAnalysis,
    #[serde(rename = "videoUrl", default, skip_serializing_if = "Option::is_none")]
    pub video_url: Option<String>,
}

impl QuestionFeedback {
    /// Serializes into the raw JSON form stored on an assessment record.
    pub fn to_value(&self) -> serde_json::Value {
        serde_json::to_value(self).expect("feedback serialization is infallible")
    }
}
