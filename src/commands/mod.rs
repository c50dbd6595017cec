//! Application command handlers for viva.
//!
//! Each submodule handles one subcommand:
//! - `assess`: run a full interview assessment (record, submit, report)
//! - `feedback`: view and save the report for the last finished session
//! - `analyze`: run a pre-recorded answer file through the pipeline
//! - `reports`: list, show and delete saved assessment reports
//! - `config`: open the configuration file in the user's preferred editor
//! - `list_devices`: list available audio input devices
//! - `logs`: display recent log entries

pub mod analyze;
pub mod assess;
pub mod config;
pub mod feedback;
pub mod list_devices;
pub mod logs;
pub mod reports;

pub use analyze::handle_analyze;
pub use assess::handle_assess;
pub use config::handle_config;
pub use feedback::handle_feedback;
pub use list_devices::handle_list_devices;
pub use logs::handle_logs;
pub use reports::{handle_delete, handle_report, handle_reports};
