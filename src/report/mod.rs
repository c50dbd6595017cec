//! Assessment records, remote persistence and the local report history.

pub mod client;
pub mod history;
pub mod record;

pub use client::{AssessmentClient, StoredAssessment};
pub use history::{HistoryEntry, ReportHistory};
pub use record::AssessmentRecord;
