use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::client::TranscriptFormat;
use crate::discover::OperatingPoint;
use crate::error::{Result, ScribeError};
use crate::language::{Language, LanguageResolver};

/// Environment variable that overrides `service.auth_token`
pub const API_KEY_ENV: &str = "SPEECHMATICS_API_KEY";

fn default_request_timeout_secs() -> u64 {
    300
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub service: ServiceConfig,
    pub storage: StorageConfig,
    pub transcription: TranscriptionSettings,
    pub batch: BatchConfig,
    pub languages: LanguagesConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Base URL of the batch transcription API
    pub url: String,
    /// Bearer token for the API
    #[serde(default)]
    pub auth_token: String,
    /// Seconds between job status polls
    pub poll_interval_secs: u64,
    /// Upper bound on waiting for one job; 0 waits forever
    pub completion_timeout_secs: u64,
    /// Timeout for status, transcript and listing requests
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Timeout for a media upload; 0 means no limit
    #[serde(default)]
    pub upload_timeout_secs: u64,
    /// Format requested when fetching transcripts
    pub transcript_format: TranscriptFormat,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Root folder holding the monitoring periods
    pub root: PathBuf,
    /// Monitoring period folder, e.g. "Period (2025 H1)"
    pub monitoring_period: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptionSettings {
    pub operating_point: OperatingPoint,
    /// File extensions treated as media, without the dot
    pub media_extensions: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Maximum items in flight within one group
    pub max_workers: usize,
    /// Pause between consecutive groups
    pub inter_group_delay_secs: u64,
    /// Stop sending new items in a group once the API rejects the credentials
    pub abort_on_auth_failure: bool,
    pub groups: Vec<GroupConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupConfig {
    pub name: String,
    pub channels: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LanguagesConfig {
    /// Language used for channels missing from the table
    pub default: Language,
    /// Channel folder name to language code
    pub table: BTreeMap<String, Language>,
}

impl Default for Config {
    fn default() -> Self {
        let table = [
            ("Channel 5", "en"),
            ("Channel 8", "cmn"),
            ("Channel U", "cmn"),
            ("Suria", "ms"),
            ("Vasantham", "ta"),
        ]
        .into_iter()
        .map(|(channel, code)| (channel.to_string(), Language::from(code)))
        .collect();

        Self {
            service: ServiceConfig {
                url: "https://asr.api.speechmatics.com/v2".to_string(),
                auth_token: String::new(),
                poll_interval_secs: 10,
                completion_timeout_secs: 2 * 60 * 60,
                request_timeout_secs: default_request_timeout_secs(),
                upload_timeout_secs: 0,
                transcript_format: TranscriptFormat::Srt,
            },
            storage: StorageConfig {
                root: PathBuf::from("."),
                monitoring_period: "Period (2025 H1)".to_string(),
            },
            transcription: TranscriptionSettings {
                operating_point: OperatingPoint::Enhanced,
                media_extensions: vec!["mp4".to_string()],
            },
            batch: BatchConfig {
                max_workers: 8,
                inter_group_delay_secs: 30,
                abort_on_auth_failure: true,
                groups: vec![
                    GroupConfig {
                        name: "Batch 1".to_string(),
                        channels: vec!["Channel 5".to_string(), "Channel 8".to_string()],
                    },
                    GroupConfig {
                        name: "Batch 2".to_string(),
                        channels: vec![
                            "Channel U".to_string(),
                            "Suria".to_string(),
                            "Vasantham".to_string(),
                        ],
                    },
                ],
            },
            languages: LanguagesConfig {
                default: Language::Auto,
                table,
            },
        }
    }
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ScribeError::Config(format!("Failed to read config file: {}", e)))?;

        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Replace the configured token with `token` when it is non-empty.
    pub fn apply_api_key(&mut self, token: Option<String>) {
        if let Some(token) = token.filter(|t| !t.trim().is_empty()) {
            self.service.auth_token = token.trim().to_string();
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.batch.max_workers == 0 {
            return Err(ScribeError::Config("batch.max_workers must be at least 1".to_string()));
        }
        if self.transcription.media_extensions.is_empty() {
            return Err(ScribeError::Config(
                "transcription.media_extensions must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Fail unless a credential for the remote service is present.
    pub fn require_auth_token(&self) -> Result<()> {
        if self.service.auth_token.trim().is_empty() {
            return Err(ScribeError::Config(format!(
                "No API key configured. Set service.auth_token or {}",
                API_KEY_ENV
            )));
        }
        Ok(())
    }

    pub fn language_resolver(&self) -> LanguageResolver {
        LanguageResolver::new(self.languages.table.clone(), self.languages.default.clone())
    }

    pub fn inter_group_delay(&self) -> Duration {
        Duration::from_secs(self.batch.inter_group_delay_secs)
    }

    pub fn completion_timeout(&self) -> Option<Duration> {
        match self.service.completion_timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }
}
