//! Per-question and whole-assessment session state.

pub mod assessment;
pub mod snapshot;
pub mod state;

pub use assessment::{AssessmentSession, AssessmentSetup};
pub use snapshot::{FeedbackSnapshot, SnapshotStore, FEEDBACK_KEY, SETUP_KEY};
pub use state::{CaptureSession, CaptureStatus, PartialSubmission};
