// Speechmatics batch API (v2) implementation

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Body, Client, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde_json::json;
use std::path::Path;
use std::time::Duration;
use tokio::fs::File;
use tokio_util::codec::{BytesCodec, FramedRead};
use tracing::{debug, info};

use crate::config::ServiceConfig;
use crate::discover::TranscriptionConfig;
use crate::error::{Result, ScribeError};
use super::{JobId, JobSummary, TranscriptFormat, TranscriptionClient};

#[derive(Debug, Clone, Deserialize)]
struct SubmitResponse {
    id: String,
}

#[derive(Debug, Clone, Deserialize)]
struct JobStatusResponse {
    job: JobDetails,
}

#[derive(Debug, Clone, Deserialize)]
struct JobDetails {
    status: JobStatus,
    #[serde(default)]
    errors: Vec<JobError>,
}

#[derive(Debug, Clone, Deserialize)]
struct JobError {
    message: String,
}

#[derive(Debug, Clone, Deserialize)]
struct JobListResponse {
    jobs: Vec<JobSummary>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct ApiErrorBody {
    detail: Option<String>,
    error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Running,
    Done,
    Rejected,
    Deleted,
    Expired,
    #[serde(other)]
    Unknown,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Running | Self::Unknown)
    }
}

/// Client for the Speechmatics batch transcription service
pub struct SpeechmaticsClient {
    client: Client,
    base_url: String,
    auth_token: String,
    poll_interval: Duration,
    request_timeout: Duration,
    upload_timeout: Option<Duration>,
}

impl SpeechmaticsClient {
    pub fn new(config: &ServiceConfig) -> Result<Self> {
        // No client-wide timeout: uploads of long recordings get their own bound
        let client = Client::builder()
            .user_agent(concat!("scribe-batch/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
            auth_token: config.auth_token.clone(),
            poll_interval: Duration::from_secs(config.poll_interval_secs.max(1)),
            request_timeout: Duration::from_secs(config.request_timeout_secs.max(1)),
            upload_timeout: match config.upload_timeout_secs {
                0 => None,
                secs => Some(Duration::from_secs(secs)),
            },
        })
    }

    /// Authenticated GET bounded by the request timeout.
    fn get(&self, url: &str) -> RequestBuilder {
        self.client
            .get(url)
            .bearer_auth(&self.auth_token)
            .timeout(self.request_timeout)
    }

    fn jobs_url(&self) -> String {
        format!("{}/jobs", self.base_url)
    }

    fn job_url(&self, job: &JobId) -> String {
        format!("{}/jobs/{}", self.base_url, job)
    }

    async fn job_status(&self, job: &JobId) -> Result<JobDetails> {
        let response = self.get(&self.job_url(job))
            .send()
            .await
            .map_err(|e| ScribeError::Transport(format!("Status request failed: {}", e)))?;

        let response = check_status(response, &format!("job {}", job)).await?;
        let status: JobStatusResponse = response.json().await
            .map_err(|e| ScribeError::Transport(format!("Failed to parse job status: {}", e)))?;
        Ok(status.job)
    }
}

/// Build the job config document the service expects.
pub fn job_config(config: &TranscriptionConfig) -> serde_json::Value {
    json!({
        "type": "transcription",
        "transcription_config": {
            "operating_point": config.operating_point,
            "language": config.language,
        }
    })
}

/// Multipart part that streams `media_path` from disk instead of buffering it.
pub async fn media_part(media_path: &Path) -> Result<Part> {
    let file = File::open(media_path).await?;
    let length = file.metadata().await?.len();
    let file_name = media_path
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_else(|| "media".to_string());

    let body = Body::wrap_stream(FramedRead::new(file, BytesCodec::new()));
    Ok(Part::stream_with_length(body, length).file_name(file_name))
}

/// Map a non-success HTTP status to the error taxonomy.
pub fn classify_status(status: StatusCode, body: &str, subject: &str) -> ScribeError {
    match status {
        StatusCode::UNAUTHORIZED => ScribeError::Auth,
        StatusCode::BAD_REQUEST => {
            let parsed: ApiErrorBody = serde_json::from_str(body).unwrap_or_default();
            let message = parsed.detail
                .or(parsed.error)
                .unwrap_or_else(|| "Unknown error".to_string());
            ScribeError::Validation(message)
        }
        StatusCode::NOT_FOUND => ScribeError::NotFound(subject.to_string()),
        other => ScribeError::Transport(format!("HTTP {} for {}: {}", other, subject, body.trim())),
    }
}

async fn check_status(response: Response, subject: &str) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    debug!("Service returned {} for {}: {}", status, subject, body);
    Err(classify_status(status, &body, subject))
}

#[async_trait]
impl TranscriptionClient for SpeechmaticsClient {
    async fn submit(&self, media_path: &Path, config: &TranscriptionConfig) -> Result<JobId> {
        let form = Form::new()
            .text("config", job_config(config).to_string())
            .part("data_file", media_part(media_path).await?);

        let mut request = self.client
            .post(self.jobs_url())
            .bearer_auth(&self.auth_token)
            .multipart(form);
        if let Some(limit) = self.upload_timeout {
            request = request.timeout(limit);
        }

        let response = request
            .send()
            .await
            .map_err(|e| ScribeError::Transport(format!("Upload failed: {}", e)))?;

        let response = check_status(response, &media_path.display().to_string()).await?;
        let submitted: SubmitResponse = response.json().await
            .map_err(|e| ScribeError::Transport(format!("Failed to parse submit response: {}", e)))?;

        Ok(JobId::new(submitted.id))
    }

    async fn await_completion(&self, job: &JobId, format: TranscriptFormat) -> Result<String> {
        loop {
            let details = self.job_status(job).await?;
            match details.status {
                JobStatus::Done => return self.fetch_result(job, format).await,
                status if status.is_terminal() => {
                    let reason = details.errors
                        .into_iter()
                        .map(|e| e.message)
                        .collect::<Vec<_>>()
                        .join("; ");
                    return Err(ScribeError::Validation(format!(
                        "Job {} ended as {:?}{}",
                        job,
                        status,
                        if reason.is_empty() { String::new() } else { format!(": {}", reason) }
                    )));
                }
                _ => {
                    debug!("Job {} still running, next check in {:?}", job, self.poll_interval);
                    tokio::time::sleep(self.poll_interval).await;
                }
            }
        }
    }

    async fn fetch_result(&self, job: &JobId, format: TranscriptFormat) -> Result<String> {
        let url = format!("{}/transcript", self.job_url(job));
        let response = self.get(&url)
            .query(&[("format", format.as_query())])
            .send()
            .await
            .map_err(|e| ScribeError::Transport(format!("Transcript request failed: {}", e)))?;

        let response = check_status(response, &format!("job {}", job)).await?;
        let transcript = response.text().await
            .map_err(|e| ScribeError::Transport(format!("Failed to read transcript: {}", e)))?;

        info!("Retrieved {} transcript for job {}", format.as_query(), job);
        Ok(transcript)
    }

    async fn list_jobs(&self) -> Result<Vec<JobSummary>> {
        let response = self.get(&self.jobs_url())
            .send()
            .await
            .map_err(|e| ScribeError::Transport(format!("Job listing failed: {}", e)))?;

        let response = check_status(response, "job listing").await?;
        let listing: JobListResponse = response.json().await
            .map_err(|e| ScribeError::Transport(format!("Failed to parse job listing: {}", e)))?;
        Ok(listing.jobs)
    }
}
