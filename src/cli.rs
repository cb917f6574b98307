use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Configuration file path
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Transcribe one day's recordings for every configured group
    Run {
        /// Recording date (YYYY-MM-DD), defaults to yesterday
        #[arg(short, long)]
        date: Option<NaiveDate>,
    },

    /// List jobs known to the transcription service
    Jobs,

    /// Download the transcript of a finished job
    Fetch {
        /// Job identifier
        job_id: String,

        /// Output file, defaults to <JOB_ID>.txt
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Transcript format (srt, txt, json-v2)
        #[arg(short, long, default_value = "srt")]
        format: String,
    },
}
