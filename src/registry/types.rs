//! Record types persisted in the project registry file.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A project directory known to the registry.
///
/// Serialized with camelCase keys (`lastAccessed`, `autoSpawn`) so the file
/// stays readable by other tooling that shares it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisteredProject {
    /// Lookup key, unique under case-insensitive comparison.
    pub name: String,
    /// Directory the agent is launched in.
    pub path: PathBuf,
    /// Bumped on every successful spawn and explicit touch.
    pub last_accessed: DateTime<Utc>,
    /// Eligible for externally-triggered auto-start.
    #[serde(default)]
    pub auto_spawn: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<ProjectMetadata>,
}

/// Free-form descriptive data. Never interpreted by the registry.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
}

/// Optional fields for `register`.
///
/// `None` means "leave the stored value alone"; `Some(false)` or an empty
/// tag list are real values and overwrite.
#[derive(Clone, Debug, Default)]
pub struct RegisterOptions {
    pub auto_spawn: Option<bool>,
    pub description: Option<String>,
    pub tags: Option<Vec<String>>,
}

impl RegisteredProject {
    /// Case-insensitive name comparison used for every registry lookup.
    pub fn matches(&self, name: &str) -> bool {
        names_match(&self.name, name)
    }

    /// Merge supplied options into this record, overwriting only the
    /// fields that are present.
    pub(crate) fn apply_options(&mut self, options: RegisterOptions) {
        if let Some(auto_spawn) = options.auto_spawn {
            self.auto_spawn = auto_spawn;
        }
        if let Some(description) = options.description {
            self.metadata.get_or_insert_with(Default::default).description = Some(description);
        }
        if let Some(tags) = options.tags {
            self.metadata.get_or_insert_with(Default::default).tags = Some(tags);
        }
    }
}

pub(crate) fn names_match(a: &str, b: &str) -> bool {
    a.to_lowercase() == b.to_lowercase()
}
