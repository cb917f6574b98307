// Remote transcription service boundary
//
// The orchestrator only sees the TranscriptionClient trait. The Speechmatics
// batch API is the production implementation; tests substitute fakes.

pub mod speechmatics;
#[cfg(test)]
pub mod fake;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

pub use speechmatics::SpeechmaticsClient;

use crate::discover::TranscriptionConfig;
use crate::error::Result;

/// Identifier the service issues for a submitted job
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(String);

impl JobId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Transcript output formats offered by the service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TranscriptFormat {
    Srt,
    Txt,
    JsonV2,
}

impl TranscriptFormat {
    pub fn as_query(&self) -> &'static str {
        match self {
            Self::Srt => "srt",
            Self::Txt => "txt",
            Self::JsonV2 => "json-v2",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.to_lowercase().as_str() {
            "srt" => Some(Self::Srt),
            "txt" => Some(Self::Txt),
            "json-v2" | "json" => Some(Self::JsonV2),
            _ => None,
        }
    }
}

/// Entry of the service's job listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobSummary {
    pub id: String,
    #[serde(default)]
    pub data_name: String,
    #[serde(default)]
    pub created_at: String,
}

/// Operations the batch pipeline needs from a transcription service
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TranscriptionClient: Send + Sync {
    /// Upload a media file and start a job
    async fn submit(&self, media_path: &Path, config: &TranscriptionConfig) -> Result<JobId>;

    /// Wait until the job is terminal and return its transcript
    async fn await_completion(&self, job: &JobId, format: TranscriptFormat) -> Result<String>;

    /// Fetch the transcript of a job that already finished
    async fn fetch_result(&self, job: &JobId, format: TranscriptFormat) -> Result<String>;

    /// List jobs known to the service
    async fn list_jobs(&self) -> Result<Vec<JobSummary>>;
}
