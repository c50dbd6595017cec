//! Per-question feedback records and the overall-report aggregation.

pub mod aggregate;
pub mod model;

pub use aggregate::{
    aggregate, aggregate_with_weights, statistics, AssessmentStatistics, DimensionWeights,
    FeedbackWarning, OverallReport,
};
pub use model::{AnswerAnalysis, QuestionFeedback};
