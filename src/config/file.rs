//! Configuration file management for viva.
//!
//! Configuration is stored as TOML in the user's config directory and
//! covers the capture device, the recording window, the collaborator
//! service URLs and the user identity.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// Audio capture configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioConfig {
    /// Audio device to use. Options:
    /// - "default" for the system default device
    /// - numeric index (0, 1, 2, etc.) from `viva list-devices`
    /// - device name from `viva list-devices`
    #[serde(default = "default_device")]
    pub device: String,
    /// Recording sample rate in Hz (16000 recommended for speech recognition)
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,
}

fn default_device() -> String {
    "default".to_string()
}

fn default_sample_rate() -> u32 {
    16000
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            device: default_device(),
            sample_rate: default_sample_rate(),
        }
    }
}

/// Recording window configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordingConfig {
    /// Maximum answer length in seconds; recording stops automatically
    /// when reached
    #[serde(default = "default_max_seconds")]
    pub max_seconds: u64,
}

fn default_max_seconds() -> u64 {
    120
}

impl Default for RecordingConfig {
    fn default() -> Self {
        Self {
            max_seconds: default_max_seconds(),
        }
    }
}

/// Base URLs of the remote collaborators.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServicesConfig {
    /// Storage upload service
    #[serde(default = "default_storage_url")]
    pub storage_url: String,
    /// Speech-to-text service
    #[serde(default = "default_speech_url")]
    pub speech_url: String,
    /// Text analysis service
    #[serde(default = "default_speech_url")]
    pub analysis_url: String,
    /// Question generation service
    #[serde(default = "default_speech_url")]
    pub questions_url: String,
    /// Assessment persistence service
    #[serde(default = "default_storage_url")]
    pub assessments_url: String,
    /// Upload through presigned URLs instead of the direct endpoint
    #[serde(default)]
    pub presigned_upload: bool,
}

fn default_storage_url() -> String {
    "http://localhost:5000".to_string()
}

fn default_speech_url() -> String {
    "http://localhost:8000".to_string()
}

impl Default for ServicesConfig {
    fn default() -> Self {
        Self {
            storage_url: default_storage_url(),
            speech_url: default_speech_url(),
            analysis_url: default_speech_url(),
            questions_url: default_speech_url(),
            assessments_url: default_storage_url(),
            presigned_upload: false,
        }
    }
}

/// Identity the persistence collaborator keys records by.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserConfig {
    /// Email sent as the user identity when saving and fetching reports
    #[serde(default)]
    pub email: String,
}

/// Defaults offered when starting a new assessment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssessmentDefaults {
    #[serde(default = "default_topic")]
    pub topic: String,
    #[serde(default = "default_difficulty")]
    pub difficulty: String,
    #[serde(default = "default_language")]
    pub language: String,
}

fn default_topic() -> String {
    "software engineering".to_string()
}

fn default_difficulty() -> String {
    "medium".to_string()
}

fn default_language() -> String {
    "English".to_string()
}

impl Default for AssessmentDefaults {
    fn default() -> Self {
        Self {
            topic: default_topic(),
            difficulty: default_difficulty(),
            language: default_language(),
        }
    }
}

/// Complete application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VivaConfig {
    #[serde(default)]
    pub audio: AudioConfig,
    #[serde(default)]
    pub recording: RecordingConfig,
    #[serde(default)]
    pub services: ServicesConfig,
    #[serde(default)]
    pub user: UserConfig,
    #[serde(default)]
    pub assessment: AssessmentDefaults,
}

impl VivaConfig {
    /// Loads configuration from the user's config directory.
    ///
    /// # Errors
    /// - If the config directory cannot be determined
    /// - If the config file cannot be read
    /// - If the TOML is malformed
    pub fn load() -> anyhow::Result<Self> {
        let config_path = get_config_path()?;
        let config_content = fs::read_to_string(&config_path)?;
        let config: VivaConfig = toml::from_str(&config_content)?;
        Ok(config)
    }

    /// Saves configuration to the user's config directory.
    ///
    /// # Errors
    /// - If the config directory cannot be determined or created
    /// - If the file cannot be written
    pub fn save(&self) -> anyhow::Result<()> {
        let config_path = get_config_path()?;
        let config_content = toml::to_string_pretty(self)?;
        fs::write(&config_path, config_content)?;
        tracing::info!("Configuration saved");
        Ok(())
    }
}

/// Writes a default config file if none exists yet.
///
/// Returns `true` when a new file was created.
pub fn ensure_config_exists() -> anyhow::Result<bool> {
    let config_path = get_config_path()?;
    if config_path.exists() {
        return Ok(false);
    }
    VivaConfig::default().save()?;
    tracing::info!("Default configuration written to {}", config_path.display());
    Ok(true)
}

/// Retrieves the path to the config file, creating its directory.
pub fn get_config_path() -> anyhow::Result<PathBuf> {
    let home =
        dirs::home_dir().ok_or_else(|| anyhow::anyhow!("Could not determine home directory"))?;
    let config_path = home.join(".config").join("viva").join("viva.toml");
    fs::create_dir_all(config_path.parent().unwrap())?;
    Ok(config_path)
}
