// In-memory TranscriptionClient used by the pipeline tests

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::discover::TranscriptionConfig;
use crate::error::{Result, ScribeError};
use super::{JobId, JobSummary, TranscriptFormat, TranscriptionClient};

/// What the fake does for a given media file name
#[derive(Debug, Clone, Copy)]
pub enum Behavior {
    Succeed,
    RejectSubmit(Failure),
    FailWait(Failure),
    Hang,
    PanicOnSubmit,
}

#[derive(Debug, Clone, Copy)]
pub enum Failure {
    Auth,
    Validation,
    NotFound,
    Transport,
}

impl Failure {
    fn into_error(self, subject: &str) -> ScribeError {
        match self {
            Self::Auth => ScribeError::Auth,
            Self::Validation => ScribeError::Validation(format!("{} is not a media file", subject)),
            Self::NotFound => ScribeError::NotFound(subject.to_string()),
            Self::Transport => ScribeError::Transport(format!("HTTP 502 for {}", subject)),
        }
    }
}

/// Timestamped call log entry
#[derive(Debug, Clone)]
pub struct Call {
    pub file_name: String,
    pub submitted_at: Instant,
    pub finished_at: Option<Instant>,
}

pub struct FakeClient {
    behaviors: HashMap<String, Behavior>,
    latency: Duration,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    submits: AtomicUsize,
    calls: Mutex<Vec<Call>>,
}

impl FakeClient {
    pub fn new(latency: Duration) -> Self {
        Self {
            behaviors: HashMap::new(),
            latency,
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            submits: AtomicUsize::new(0),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with(mut self, file_name: &str, behavior: Behavior) -> Self {
        self.behaviors.insert(file_name.to_string(), behavior);
        self
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn submits(&self) -> usize {
        self.submits.load(Ordering::SeqCst)
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    fn behavior(&self, file_name: &str) -> Behavior {
        self.behaviors.get(file_name).copied().unwrap_or(Behavior::Succeed)
    }

    fn enter(&self) {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
    }

    fn leave(&self, job: &JobId) {
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        let mut calls = self.calls.lock().unwrap();
        if let Some(call) = calls.iter_mut().find(|c| c.file_name == job.as_str()) {
            call.finished_at = Some(Instant::now());
        }
    }
}

#[async_trait]
impl TranscriptionClient for FakeClient {
    async fn submit(&self, media_path: &Path, config: &TranscriptionConfig) -> Result<JobId> {
        let file_name = media_path.file_name().unwrap().to_string_lossy().to_string();
        self.submits.fetch_add(1, Ordering::SeqCst);
        self.enter();
        self.calls.lock().unwrap().push(Call {
            file_name: file_name.clone(),
            submitted_at: Instant::now(),
            finished_at: None,
        });
        tokio::time::sleep(self.latency).await;

        let job = JobId::new(file_name.clone());
        match self.behavior(&file_name) {
            Behavior::RejectSubmit(failure) => {
                self.leave(&job);
                return Err(failure.into_error(&file_name));
            }
            Behavior::PanicOnSubmit => {
                self.leave(&job);
                panic!("client blew up submitting {}", file_name);
            }
            _ => {}
        }
        assert!(!config.language.as_str().is_empty());
        Ok(job)
    }

    async fn await_completion(&self, job: &JobId, format: TranscriptFormat) -> Result<String> {
        tokio::time::sleep(self.latency).await;
        let outcome = match self.behavior(job.as_str()) {
            Behavior::FailWait(failure) => Err(failure.into_error(job.as_str())),
            Behavior::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Err(ScribeError::Transport("hung".to_string()))
            }
            _ => Ok(format!("1\n00:00:00,000 --> 00:00:01,000\n{} ({})\n", job, format.as_query())),
        };
        self.leave(job);
        outcome
    }

    async fn fetch_result(&self, job: &JobId, format: TranscriptFormat) -> Result<String> {
        Ok(format!("{} ({})", job, format.as_query()))
    }

    async fn list_jobs(&self) -> Result<Vec<JobSummary>> {
        Ok(Vec::new())
    }
}
