use std::fmt;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScribeError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid API key")]
    Auth,

    #[error("Request rejected: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Timed out: {0}")]
    Timeout(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl ScribeError {
    /// Classify this error for per-item outcome reporting.
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::Auth => FailureKind::Auth,
            Self::Validation(_) => FailureKind::Validation,
            Self::NotFound(_) => FailureKind::NotFound,
            Self::Transport(_) | Self::Timeout(_) | Self::Http(_) => FailureKind::Transport,
            Self::Io(_) | Self::Toml(_) | Self::Config(_) => FailureKind::Unclassified,
        }
    }
}

/// Failure taxonomy attached to a failed work item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    Auth,
    Validation,
    NotFound,
    Transport,
    Unclassified,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Auth => "auth",
            Self::Validation => "validation",
            Self::NotFound => "not-found",
            Self::Transport => "transport",
            Self::Unclassified => "unclassified",
        };
        f.write_str(name)
    }
}

pub type Result<T> = std::result::Result<T, ScribeError>;
