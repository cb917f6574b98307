//! scribe-batch - Batch transcription of recorded broadcasts
//!
//! Entry point: loads configuration, sets up logging and dispatches the
//! requested command against the transcription service.

use anyhow::Result;
use chrono::Local;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn, Level};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::{non_blocking, rolling};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use scribe_batch::cli::{Args, Commands};
use scribe_batch::client::{JobId, SpeechmaticsClient, TranscriptFormat, TranscriptionClient};
use scribe_batch::config::{Config, API_KEY_ENV};
use scribe_batch::discover::{TranscriptionConfig, WorkItemDiscoverer};
use scribe_batch::error::ScribeError;
use scribe_batch::language::Language;
use scribe_batch::orchestrator::{BatchOrchestrator, OrchestratorOptions};
use scribe_batch::plan::{previous_day, BatchPlan};
use scribe_batch::sequencer::BatchSequencer;

/// Exit status when the run finished but some files failed
const EXIT_PARTIAL_FAILURE: i32 = 2;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let guard = setup_logging(args.verbose)?;

    // Load configuration
    let mut config = match &args.config {
        Some(config_path) => Config::from_file(config_path)?,
        None => {
            if std::path::Path::new("config.toml").exists() {
                info!("Found config.toml in current directory, loading...");
                Config::from_file("config.toml")?
            } else {
                Config::default()
            }
        }
    };
    config.apply_api_key(std::env::var(API_KEY_ENV).ok());
    config.validate()?;
    config.require_auth_token()?;

    let client: Arc<dyn TranscriptionClient> = Arc::new(SpeechmaticsClient::new(&config.service)?);

    match args.command {
        Commands::Run { date } => {
            let date = date.unwrap_or_else(|| previous_day(Local::now().date_naive()));
            info!("Transcribing recordings of {}", date);

            let plan = BatchPlan::for_date(&config.storage, &config.batch.groups, date);
            let discoverer = WorkItemDiscoverer::new(
                config.language_resolver(),
                TranscriptionConfig::new(config.transcription.operating_point, Language::Auto),
                config.transcription.media_extensions.clone(),
            );
            let options = OrchestratorOptions {
                show_progress: true,
                ..OrchestratorOptions::from_config(&config)
            };
            let orchestrator = BatchOrchestrator::new(client, options);
            let sequencer = BatchSequencer::new(discoverer, orchestrator, config.inter_group_delay());

            let report = sequencer.execute(&plan).await;

            println!("\n{:<20} {:>8} {:>10} {:>8}", "Group", "Files", "Succeeded", "Failed");
            println!("{}", "-".repeat(50));
            for group in &report.groups {
                println!(
                    "{:<20} {:>8} {:>10} {:>8}",
                    group.name,
                    group.report.total(),
                    group.report.succeeded(),
                    group.report.failed()
                );
            }

            if report.failed() > 0 {
                warn!("{} of {} files failed", report.failed(), report.total());
                drop(guard);
                std::process::exit(EXIT_PARTIAL_FAILURE);
            }
        }
        Commands::Jobs => {
            let jobs = client.list_jobs().await?;
            if jobs.is_empty() {
                println!("No jobs found.");
            }
            for job in jobs {
                println!("Job ID: {}, Data file name: {}, created at: {}", job.id, job.data_name, job.created_at);
            }
        }
        Commands::Fetch { job_id, output, format } => {
            let format = TranscriptFormat::parse(&format).ok_or_else(|| {
                ScribeError::Config(format!("Invalid transcript format '{}'. Valid formats: srt, txt, json-v2", format))
            })?;
            let output = output.unwrap_or_else(|| PathBuf::from(format!("{}.txt", job_id)));
            let job = JobId::new(job_id);

            match client.fetch_result(&job, format).await {
                Ok(transcript) => {
                    println!("Transcript retrieved successfully!");
                    tokio::fs::write(&output, transcript).await?;
                    println!("Transcript saved to {}", output.display());
                }
                Err(ScribeError::NotFound(_)) => println!("Job {} not found!", job),
                Err(ScribeError::Auth) => println!("Invalid API key!"),
                Err(e) => return Err(e.into()),
            }
        }
    }

    info!("scribe-batch completed");
    Ok(())
}

/// Setup logging to both console and file
fn setup_logging(verbose: bool) -> Result<WorkerGuard> {
    let log_dir = std::env::current_dir()?.join(".scribe").join("log");
    std::fs::create_dir_all(&log_dir)?;

    // Daily rotation; the guard flushes on drop
    let file_appender = rolling::daily(&log_dir, "scribe-batch.log");
    let (non_blocking_file, guard) = non_blocking(file_appender);

    let log_level = if verbose { Level::DEBUG } else { Level::INFO };

    let console_layer = fmt::layer()
        .with_target(false)
        .with_thread_ids(true);

    let file_layer = fmt::layer()
        .with_writer(non_blocking_file)
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .with_ansi(false);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(log_level.into()))
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    info!("Logging initialized - console: {}, file: {}",
          log_level, log_dir.join("scribe-batch.log").display());

    Ok(guard)
}
