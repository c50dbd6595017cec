//! Application orchestration and command routing.
//!
//! Handles command-line argument parsing and delegates to appropriate
//! command handlers.

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use std::io;
use std::path::PathBuf;
use std::process;

use crate::commands;
use crate::config;
use crate::logging;

/// Spoken interview practice with transcription and language feedback
#[derive(Parser)]
#[command(name = "viva")]
#[command(version)]
#[command(about = "Record spoken answers to interview questions and get multi-dimensional language feedback")]
#[command(
    long_about = "viva runs mock interview assessments from the terminal: it generates questions,\nrecords your spoken answers, uploads and transcribes them, and aggregates\ngrammar, pronunciation, fluency and correctness feedback into one report.\n\nDEFAULT COMMAND:\n    If no command is specified, 'assess' is used by default.\n\nEXAMPLES:\n    # Run a full assessment with your configured defaults\n    $ viva\n\n    # Run an assessment on a specific topic\n    $ viva assess --topic \"distributed systems\" --difficulty hard\n\n    # Analyze a pre-recorded answer\n    $ viva analyze answer.webm\n\n    # View and save the report for the last finished session\n    $ viva feedback\n\n    # Browse saved reports\n    $ viva reports\n    $ viva report 3"
)]
#[command(
    after_help = "CONFIGURATION:\n    Config file:        ~/.config/viva/viva.toml\n    Logs:               ~/.local/state/viva/viva.log.*"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a full interview assessment (default)
    ///
    /// Generates questions, records an answer per question, uploads and
    /// analyzes each recording, then aggregates the feedback into an
    /// overall report.
    #[command(visible_alias = "a")]
    Assess {
        /// Topic to be assessed on
        #[arg(short, long)]
        topic: Option<String>,

        /// Question difficulty (easy, medium, hard)
        #[arg(short, long)]
        difficulty: Option<String>,

        /// Language the answers will be spoken in
        #[arg(short, long)]
        language: Option<String>,
    },

    /// View and save the report for the last finished session
    ///
    /// Reads the session handoff written by 'assess', aggregates the
    /// per-question feedback and offers to save the assessment record.
    #[command(visible_alias = "f")]
    Feedback,

    /// Analyze a pre-recorded answer file
    ///
    /// Runs an existing recording through the upload, transcription and
    /// analysis pipeline. Video files have their audio track extracted
    /// first by playing the file through in real time.
    ///
    /// Examples:
    ///   viva analyze answer.webm
    ///   viva analyze answer.wav --question "Tell me about yourself"
    Analyze {
        /// Path to the recorded answer (video or audio)
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// The question the recording answers
        #[arg(short, long)]
        question: Option<String>,
    },

    /// List saved assessment reports
    #[command(visible_alias = "r")]
    Reports,

    /// Show one saved report in full
    ///
    /// Numeric ids come from 'viva reports'; other ids are fetched from
    /// the persistence service.
    Report {
        /// Report id
        #[arg(value_name = "ID")]
        id: String,
    },

    /// Delete a saved assessment
    Delete {
        /// Remote assessment id
        #[arg(value_name = "ID")]
        id: String,
    },

    /// Open configuration file in your preferred editor
    ///
    /// Edit audio settings, service URLs, user identity and assessment
    /// defaults. Uses $EDITOR or falls back to nano/vim.
    #[command(visible_alias = "c")]
    Config,

    /// List available audio input devices
    ///
    /// Shows device indexes, names, and configurations to help configure
    /// the correct input device in viva.toml.
    #[command(name = "list-devices")]
    ListDevices,

    /// Show recent log entries from the application
    ///
    /// Display the last 50 lines of the most recent log file.
    /// Useful for troubleshooting issues.
    Logs,

    /// Generate shell completion script
    ///
    /// Examples:
    ///   viva completions bash > viva.bash
    ///   viva completions zsh > _viva
    ///   viva completions fish > viva.fish
    Completions {
        /// The shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Runs the main application based on command-line arguments.
///
/// # Errors
/// - If logging initialization fails
/// - If command execution fails
pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Handle commands that don't need logging or config setup
    match &cli.command {
        Some(Commands::Completions { shell }) => {
            generate(*shell, &mut Cli::command(), "viva", &mut io::stdout());
            return Ok(());
        }
        Some(Commands::ListDevices) => {
            return match commands::handle_list_devices() {
                Ok(()) => Ok(()),
                Err(e) => {
                    eprintln!("Error: {e}");
                    process::exit(1);
                }
            };
        }
        Some(Commands::Logs) => {
            return match commands::handle_logs() {
                Ok(()) => Ok(()),
                Err(e) => {
                    eprintln!("Error: {e}");
                    process::exit(1);
                }
            };
        }
        _ => {}
    }

    logging::init_logging()?;

    if config::ensure_config_exists()? {
        println!("Wrote default configuration to ~/.config/viva/viva.toml");
    }

    match cli.command {
        None => {
            commands::handle_assess(None, None, None).await?;
        }
        Some(Commands::Assess {
            topic,
            difficulty,
            language,
        }) => {
            commands::handle_assess(topic, difficulty, language).await?;
        }
        Some(Commands::Feedback) => {
            commands::handle_feedback().await?;
        }
        Some(Commands::Analyze { file, question }) => {
            commands::handle_analyze(file, question).await?;
        }
        Some(Commands::Reports) => {
            commands::handle_reports().await?;
        }
        Some(Commands::Report { id }) => {
            commands::handle_report(id).await?;
        }
        Some(Commands::Delete { id }) => {
            commands::handle_delete(id).await?;
        }
        Some(Commands::Config) => {
            commands::handle_config()?;
        }
        Some(Commands::Completions { .. }) | Some(Commands::ListDevices) | Some(Commands::Logs) => {
            unreachable!("These commands are handled earlier")
        }
    }

    Ok(())
}
