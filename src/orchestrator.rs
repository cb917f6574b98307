use indicatif::{ProgressBar, ProgressStyle};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::fs;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{info, warn};

use crate::client::{JobId, TranscriptFormat, TranscriptionClient};
use crate::config::Config;
use crate::discover::WorkItem;
use crate::error::{FailureKind, Result, ScribeError};

/// Result of processing one work item
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutcomeResult {
    Success { job_id: JobId, transcript_path: PathBuf },
    Failure { kind: FailureKind, message: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    pub item: WorkItem,
    pub result: OutcomeResult,
}

impl Outcome {
    fn success(item: WorkItem, job_id: JobId, transcript_path: PathBuf) -> Self {
        Self {
            item,
            result: OutcomeResult::Success { job_id, transcript_path },
        }
    }

    fn failure(item: WorkItem, kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            item,
            result: OutcomeResult::Failure {
                kind,
                message: message.into(),
            },
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.result, OutcomeResult::Success { .. })
    }

    pub fn failure_kind(&self) -> Option<FailureKind> {
        match &self.result {
            OutcomeResult::Failure { kind, .. } => Some(*kind),
            OutcomeResult::Success { .. } => None,
        }
    }
}

/// All outcomes of one orchestrator run, in discovery order
#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    pub outcomes: Vec<Outcome>,
}

impl BatchReport {
    pub fn total(&self) -> usize {
        self.outcomes.len()
    }

    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.total() - self.succeeded()
    }

    pub fn failures_by_kind(&self) -> HashMap<FailureKind, usize> {
        let mut counts = HashMap::new();
        for kind in self.outcomes.iter().filter_map(Outcome::failure_kind) {
            *counts.entry(kind).or_insert(0) += 1;
        }
        counts
    }
}

#[derive(Debug, Clone)]
pub struct OrchestratorOptions {
    pub max_workers: usize,
    pub format: TranscriptFormat,
    /// Upper bound on waiting for one job, `None` waits indefinitely
    pub completion_timeout: Option<Duration>,
    pub abort_on_auth_failure: bool,
    pub show_progress: bool,
}

impl Default for OrchestratorOptions {
    fn default() -> Self {
        Self {
            max_workers: 8,
            format: TranscriptFormat::Srt,
            completion_timeout: None,
            abort_on_auth_failure: true,
            show_progress: false,
        }
    }
}

impl OrchestratorOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_workers: config.batch.max_workers,
            format: config.service.transcript_format,
            completion_timeout: config.completion_timeout(),
            abort_on_auth_failure: config.batch.abort_on_auth_failure,
            show_progress: false,
        }
    }
}

/// Runs submit, wait and save for a list of work items on a bounded pool.
pub struct BatchOrchestrator {
    client: Arc<dyn TranscriptionClient>,
    options: OrchestratorOptions,
}

impl BatchOrchestrator {
    pub fn new(client: Arc<dyn TranscriptionClient>, options: OrchestratorOptions) -> Self {
        Self { client, options }
    }

    /// Process every item and return one outcome per item.
    ///
    /// Failures are classified and recorded; they never cancel other items.
    /// Returns only after every spawned task has finished.
    pub async fn run(&self, items: Vec<WorkItem>) -> BatchReport {
        let total = items.len();
        if total == 0 {
            return BatchReport::default();
        }

        let semaphore = Arc::new(Semaphore::new(self.options.max_workers.max(1)));
        let auth_failed = Arc::new(AtomicBool::new(false));
        let progress = self.progress_bar(total);

        let mut pending: HashMap<usize, WorkItem> = HashMap::with_capacity(total);
        let mut tasks = JoinSet::new();

        for (index, item) in items.into_iter().enumerate() {
            pending.insert(index, item.clone());

            let client = Arc::clone(&self.client);
            let semaphore = Arc::clone(&semaphore);
            let auth_failed = Arc::clone(&auth_failed);
            let format = self.options.format;
            let timeout = self.options.completion_timeout;
            let abort_on_auth = self.options.abort_on_auth_failure;

            tasks.spawn(async move {
                let _permit = match semaphore.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => {
                        return (index, Outcome::failure(item, FailureKind::Unclassified, "Worker pool closed"));
                    }
                };

                if abort_on_auth && auth_failed.load(Ordering::SeqCst) {
                    let outcome = Outcome::failure(
                        item,
                        FailureKind::Auth,
                        "Skipped after an earlier authentication failure",
                    );
                    return (index, outcome);
                }

                let result = process_item(client.as_ref(), &item, format, timeout).await;
                let outcome = match result {
                    Ok((job_id, transcript_path)) => Outcome::success(item, job_id, transcript_path),
                    Err(e) => {
                        if e.kind() == FailureKind::Auth {
                            auth_failed.store(true, Ordering::SeqCst);
                        }
                        Outcome::failure(item, e.kind(), e.to_string())
                    }
                };
                (index, outcome)
            });
        }

        let mut slots: Vec<Option<Outcome>> = (0..total).map(|_| None).collect();

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, outcome)) => {
                    pending.remove(&index);
                    log_outcome(&outcome);
                    progress.inc(1);
                    slots[index] = Some(outcome);
                }
                Err(e) => warn!("Worker task ended abnormally: {}", e),
            }
        }

        // Items whose task panicked
        for (index, item) in pending {
            let outcome = Outcome::failure(item, FailureKind::Unclassified, "Worker task panicked");
            log_outcome(&outcome);
            progress.inc(1);
            slots[index] = Some(outcome);
        }

        progress.finish_and_clear();

        BatchReport {
            outcomes: slots.into_iter().flatten().collect(),
        }
    }

    fn progress_bar(&self, total: usize) -> ProgressBar {
        if !self.options.show_progress {
            return ProgressBar::hidden();
        }
        let pb = ProgressBar::new(total as u64);
        let style = ProgressStyle::with_template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} files")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-");
        pb.set_style(style);
        pb
    }
}

async fn process_item(
    client: &dyn TranscriptionClient,
    item: &WorkItem,
    format: TranscriptFormat,
    timeout: Option<Duration>,
) -> Result<(JobId, PathBuf)> {
    let media = item.file_path.display();
    info!("Processing file: {} with language {}", media, item.config.language);

    let job = client.submit(&item.file_path, &item.config).await?;
    info!("Job {} submitted for {}, waiting for transcription...", job, media);

    let wait = client.await_completion(&job, format);
    let transcript = match timeout {
        Some(limit) => tokio::time::timeout(limit, wait).await.map_err(|_| {
            ScribeError::Timeout(format!("job {} did not finish within {:?}", job, limit))
        })??,
        None => wait.await?,
    };
    info!("Transcript retrieved for {}", media);

    let transcript_path = item.transcript_path();
    fs::write(&transcript_path, transcript).await?;
    info!("Transcript saved to {}", transcript_path.display());

    Ok((job, transcript_path))
}

fn log_outcome(outcome: &Outcome) {
    match &outcome.result {
        OutcomeResult::Success { .. } => {}
        OutcomeResult::Failure { kind: FailureKind::Auth, message } => {
            warn!("Invalid API key - check the configured token ({}): {}", outcome.item.file_path.display(), message)
        }
        OutcomeResult::Failure { kind, message } => {
            warn!("Error processing {} [{}]: {}", outcome.item.file_path.display(), kind, message)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::fake::{Behavior, Failure, FakeClient};
    use crate::client::MockTranscriptionClient;
    use crate::discover::{OperatingPoint, TranscriptionConfig};
    use crate::language::Language;
    use std::path::Path;
    use tempfile::TempDir;

    fn items(dir: &Path, names: &[&str]) -> Vec<WorkItem> {
        names
            .iter()
            .map(|name| {
                let file_path = dir.join(name);
                std::fs::write(&file_path, b"media").unwrap();
                WorkItem {
                    file_path,
                    config: TranscriptionConfig::new(OperatingPoint::Enhanced, Language::from("en")),
                }
            })
            .collect()
    }

    fn options(max_workers: usize) -> OrchestratorOptions {
        OrchestratorOptions {
            max_workers,
            ..OrchestratorOptions::default()
        }
    }

    #[tokio::test]
    async fn test_every_item_gets_a_transcript() {
        let temp = TempDir::new().unwrap();
        let names: Vec<String> = (0..10).map(|i| format!("clip{}.mp4", i)).collect();
        let names: Vec<&str> = names.iter().map(String::as_str).collect();
        let work = items(temp.path(), &names);

        let client = Arc::new(FakeClient::new(Duration::from_millis(5)));
        let report = BatchOrchestrator::new(client, options(8)).run(work.clone()).await;

        assert_eq!(report.total(), work.len());
        assert_eq!(report.succeeded(), 10);
        for (outcome, item) in report.outcomes.iter().zip(&work) {
            assert_eq!(&outcome.item, item);
            let written = std::fs::read_to_string(item.transcript_path()).unwrap();
            assert!(written.contains("(srt)"));
        }
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let client = Arc::new(FakeClient::new(Duration::ZERO));
        let report = BatchOrchestrator::new(client.clone(), options(8)).run(Vec::new()).await;
        assert_eq!(report.total(), 0);
        assert_eq!(client.submits(), 0);
    }

    #[tokio::test]
    async fn test_concurrency_is_bounded() {
        let temp = TempDir::new().unwrap();
        let names: Vec<String> = (0..24).map(|i| format!("show{}.mp4", i)).collect();
        let names: Vec<&str> = names.iter().map(String::as_str).collect();
        let work = items(temp.path(), &names);

        let client = Arc::new(FakeClient::new(Duration::from_millis(10)));
        let report = BatchOrchestrator::new(client.clone(), options(8)).run(work).await;

        assert_eq!(report.succeeded(), 24);
        assert!(client.max_in_flight() <= 8, "saw {} in flight", client.max_in_flight());
        assert!(client.max_in_flight() > 1);
    }

    #[tokio::test]
    async fn test_failures_are_isolated_and_classified() {
        let temp = TempDir::new().unwrap();
        let work = items(
            temp.path(),
            &["ok1.mp4", "auth.mp4", "bad.mp4", "gone.mp4", "flaky.mp4", "locked.mp4", "ok2.mp4"],
        );
        // A directory where the transcript should go makes the write fail
        std::fs::create_dir(temp.path().join("locked.txt")).unwrap();

        let client = FakeClient::new(Duration::from_millis(2))
            .with("auth.mp4", Behavior::RejectSubmit(Failure::Auth))
            .with("bad.mp4", Behavior::RejectSubmit(Failure::Validation))
            .with("gone.mp4", Behavior::FailWait(Failure::NotFound))
            .with("flaky.mp4", Behavior::FailWait(Failure::Transport));
        let opts = OrchestratorOptions {
            abort_on_auth_failure: false,
            ..options(3)
        };

        let report = BatchOrchestrator::new(Arc::new(client), opts).run(work).await;

        let kinds: Vec<Option<FailureKind>> = report.outcomes.iter().map(Outcome::failure_kind).collect();
        assert_eq!(
            kinds,
            vec![
                None,
                Some(FailureKind::Auth),
                Some(FailureKind::Validation),
                Some(FailureKind::NotFound),
                Some(FailureKind::Transport),
                Some(FailureKind::Unclassified),
                None,
            ]
        );
        assert_eq!(report.succeeded(), 2);
        assert_eq!(report.failed(), 5);
        assert_eq!(report.failures_by_kind().get(&FailureKind::Auth), Some(&1));
        assert!(temp.path().join("ok2.txt").exists());
    }

    #[tokio::test]
    async fn test_panicking_worker_is_recorded_as_failure() {
        let temp = TempDir::new().unwrap();
        let work = items(temp.path(), &["before.mp4", "boom.mp4", "after.mp4"]);
        let client = FakeClient::new(Duration::from_millis(2)).with("boom.mp4", Behavior::PanicOnSubmit);

        let report = BatchOrchestrator::new(Arc::new(client), options(8)).run(work.clone()).await;

        assert_eq!(report.total(), 3);
        assert_eq!(report.outcomes[1].item, work[1]);
        assert_eq!(report.outcomes[1].failure_kind(), Some(FailureKind::Unclassified));
        assert!(report.outcomes[0].is_success());
        assert!(report.outcomes[2].is_success());
        assert!(temp.path().join("after.txt").exists());
    }

    #[tokio::test]
    async fn test_auth_failure_skips_unstarted_items() {
        let temp = TempDir::new().unwrap();
        let work = items(temp.path(), &["first.mp4", "second.mp4", "third.mp4"]);
        let client = Arc::new(
            FakeClient::new(Duration::from_millis(2)).with("first.mp4", Behavior::RejectSubmit(Failure::Auth)),
        );

        let report = BatchOrchestrator::new(client.clone(), options(1)).run(work).await;

        assert_eq!(report.total(), 3);
        assert!(report.outcomes.iter().all(|o| o.failure_kind() == Some(FailureKind::Auth)));
        assert_eq!(client.submits(), 1);
    }

    #[tokio::test]
    async fn test_completion_timeout_is_a_transport_failure() {
        let temp = TempDir::new().unwrap();
        let work = items(temp.path(), &["stuck.mp4", "fine.mp4"]);
        let client = FakeClient::new(Duration::from_millis(1)).with("stuck.mp4", Behavior::Hang);
        let opts = OrchestratorOptions {
            completion_timeout: Some(Duration::from_millis(50)),
            ..options(8)
        };

        let report = BatchOrchestrator::new(Arc::new(client), opts).run(work).await;

        assert_eq!(report.outcomes[0].failure_kind(), Some(FailureKind::Transport));
        assert!(report.outcomes[1].is_success());
    }

    #[tokio::test]
    async fn test_not_found_after_submit_leaves_siblings_alone() {
        let temp = TempDir::new().unwrap();
        let work = items(temp.path(), &["a.mp4", "b.mp4", "c.mp4"]);

        let mut mock = MockTranscriptionClient::new();
        mock.expect_submit()
            .times(3)
            .returning(|path, _| Ok(JobId::new(path.file_stem().unwrap().to_string_lossy())));
        mock.expect_await_completion().times(3).returning(|job, _| {
            if job.as_str() == "b" {
                Err(ScribeError::NotFound(format!("job {}", job)))
            } else {
                Ok(format!("transcript of {}", job))
            }
        });

        let report = BatchOrchestrator::new(Arc::new(mock), options(8)).run(work).await;

        assert_eq!(report.total(), 3);
        assert!(report.outcomes[0].is_success());
        assert_eq!(report.outcomes[1].failure_kind(), Some(FailureKind::NotFound));
        assert!(report.outcomes[2].is_success());
        assert_eq!(
            std::fs::read_to_string(temp.path().join("c.txt")).unwrap(),
            "transcript of c"
        );
        assert!(!temp.path().join("b.txt").exists());
    }
}
