//! scribe-batch - Batch transcription of recorded broadcasts
//!
//! Discovers the previous day's recordings per channel, submits them to a
//! remote speech-to-text service with the channel's language, and saves the
//! returned subtitles next to each video.

pub mod cli;
pub mod client;
pub mod config;
pub mod discover;
pub mod error;
pub mod language;
pub mod orchestrator;
pub mod plan;
pub mod sequencer;
