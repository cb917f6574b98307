use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::language::{Language, LanguageResolver};

/// Accuracy/speed trade-off of the remote model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperatingPoint {
    Standard,
    Enhanced,
}

/// Settings sent along with a single media file.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TranscriptionConfig {
    pub operating_point: OperatingPoint,
    pub language: Language,
}

impl TranscriptionConfig {
    pub fn new(operating_point: OperatingPoint, language: Language) -> Self {
        Self { operating_point, language }
    }

    /// A new value with the language replaced.
    pub fn with_language(&self, language: Language) -> Self {
        Self {
            operating_point: self.operating_point,
            language,
        }
    }
}

/// One media file paired with the settings it is transcribed with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkItem {
    pub file_path: PathBuf,
    pub config: TranscriptionConfig,
}

impl WorkItem {
    pub fn transcript_path(&self) -> PathBuf {
        transcript_path(&self.file_path)
    }
}

/// Location of the transcript written for a media file: same path, `.txt` extension.
pub fn transcript_path(media_path: &Path) -> PathBuf {
    media_path.with_extension("txt")
}

/// Finds media files under channel directories and assigns their settings.
#[derive(Debug, Clone)]
pub struct WorkItemDiscoverer {
    resolver: LanguageResolver,
    base: TranscriptionConfig,
    extensions: Vec<String>,
}

impl WorkItemDiscoverer {
    pub fn new(resolver: LanguageResolver, base: TranscriptionConfig, extensions: Vec<String>) -> Self {
        let extensions = extensions
            .into_iter()
            .map(|ext| ext.trim_start_matches('.').to_lowercase())
            .collect();

        Self {
            resolver,
            base,
            extensions,
        }
    }

    pub fn discover<P: AsRef<Path>>(&self, directories: &[P]) -> Vec<WorkItem> {
        let mut items = Vec::new();

        for directory in directories {
            let directory = directory.as_ref();
            if !directory.is_dir() {
                warn!("Skipping missing directory: {}", directory.display());
                continue;
            }

            let config = self.base.with_language(self.resolver.resolve(directory));
            let before = items.len();

            for entry in WalkDir::new(directory)
                .sort_by_file_name()
                .into_iter()
                .filter_map(|e| e.map_err(|err| debug!("Walk error: {}", err)).ok())
            {
                if entry.file_type().is_file() && self.is_media(entry.path()) {
                    items.push(WorkItem {
                        file_path: entry.path().to_path_buf(),
                        config: config.clone(),
                    });
                }
            }

            info!(
                "Found {} media files in {} (language: {})",
                items.len() - before,
                directory.display(),
                config.language
            );
        }

        items
    }

    fn is_media(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| self.extensions.contains(&ext.to_lowercase()))
            .unwrap_or(false)
    }
}
