use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

const AUTO: &str = "auto";

/// Spoken language requested from the transcription service.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Language {
    /// An explicit language code such as `en` or `cmn`
    Code(String),
    /// Let the service detect the language
    Auto,
}

impl Language {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Code(code) => code,
            Self::Auto => AUTO,
        }
    }
}

impl From<&str> for Language {
    fn from(value: &str) -> Self {
        let value = value.trim();
        if value.is_empty() || value.eq_ignore_ascii_case(AUTO) {
            Self::Auto
        } else {
            Self::Code(value.to_string())
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Language {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Language {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Language::from(raw.as_str()))
    }
}

/// Maps a dated channel directory to the language spoken on that channel.
#[derive(Debug, Clone)]
pub struct LanguageResolver {
    table: BTreeMap<String, Language>,
    default: Language,
}

impl LanguageResolver {
    pub fn new(table: BTreeMap<String, Language>, default: Language) -> Self {
        Self { table, default }
    }

    /// Resolve the language for a `{channel}/{day} {month}` directory.
    ///
    /// The channel is the folder one level above the leaf. Unknown channels,
    /// and paths too short to have one, fall back to the default.
    pub fn resolve(&self, directory: &Path) -> Language {
        directory
            .parent()
            .and_then(|parent| parent.file_name())
            .and_then(|name| name.to_str())
            .and_then(|channel| self.table.get(channel))
            .cloned()
            .unwrap_or_else(|| self.default.clone())
    }
}
