//! Caller properties and the configuration object threaded through a pipeline

use serde::{Deserialize, Deserializer};
use std::collections::BTreeMap;
use std::path::Path;

use crate::artifact::{Artifact, ArtifactAccessor, ArtifactKind};
use crate::error::InjectError;

/// Key of the one caller option the plugin recognizes
pub const APS_ENVIRONMENT: &str = "aps-environment";

/// Options supplied by the app's plugin configuration
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct PluginProps {
    /// APNs environment written to the entitlements (`development` when absent)
    ///
    /// Not validated: non-string scalars are kept verbatim in their text form.
    #[serde(rename = "aps-environment", default, deserialize_with = "verbatim_string")]
    pub aps_environment: Option<String>,
    /// Anything else the caller passed; kept but not interpreted
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_yaml::Value>,
}

fn verbatim_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_yaml::Value>::deserialize(deserializer)?;
    Ok(value.and_then(|value| match value {
        serde_yaml::Value::Null => None,
        serde_yaml::Value::String(s) => Some(s),
        serde_yaml::Value::Bool(b) => Some(b.to_string()),
        serde_yaml::Value::Number(n) => Some(n.to_string()),
        other => serde_yaml::to_string(&other)
            .ok()
            .map(|s| s.trim_end().to_string()),
    }))
}

impl PluginProps {
    /// Load properties from a YAML (or JSON) file
    pub fn load(path: &Path) -> Result<Self, InjectError> {
        let content = std::fs::read_to_string(path).map_err(|e| InjectError::ConfigError {
            message: format!("Failed to read props file '{}': {}", path.display(), e),
        })?;

        serde_yaml::from_str(&content).map_err(|e| InjectError::ConfigError {
            message: format!("Failed to parse props file '{}': {}", path.display(), e),
        })
    }

    /// Parse properties handed over inline as JSON
    pub fn from_json(json: &str) -> Result<Self, InjectError> {
        serde_json::from_str(json).map_err(|e| InjectError::ConfigError {
            message: format!("Failed to parse props: {}", e),
        })
    }

    /// Build properties with only the APNs environment set
    pub fn with_aps_environment(value: impl Into<String>) -> Self {
        Self {
            aps_environment: Some(value.into()),
            extra: BTreeMap::new(),
        }
    }
}

/// A fail-open path that was taken while mutating an artifact
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub stage: String,
    pub artifact: ArtifactKind,
    pub message: String,
}

/// Outcome of ensuring one fragment or set of entries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditOutcome {
    /// Text fragment spliced in at its anchor
    Inserted,
    /// This many tree entries or attributes were added
    Appended(usize),
    /// Property overwritten with a different value
    Assigned,
    /// Marker already present, artifact left unchanged
    AlreadyPresent,
    /// Anchor not found, artifact left unchanged
    AnchorNotFound,
}

impl EditOutcome {
    pub fn changed(self) -> bool {
        match self {
            EditOutcome::Inserted | EditOutcome::Assigned => true,
            EditOutcome::Appended(n) => n > 0,
            EditOutcome::AlreadyPresent | EditOutcome::AnchorNotFound => false,
        }
    }
}

/// One edit performed (or skipped) by a stage
#[derive(Debug, Clone, PartialEq)]
pub struct EditRecord {
    pub stage: String,
    pub artifact: ArtifactKind,
    /// What was ensured, e.g. a marker or collection name
    pub target: String,
    pub outcome: EditOutcome,
}

/// Entry in the run-once history
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginHistoryItem {
    pub name: String,
    pub version: String,
}

/// The unit threaded through the pipeline for one build invocation
#[derive(Debug, Clone, Default)]
pub struct ModConfig {
    artifacts: BTreeMap<ArtifactKind, Artifact>,
    plugin_history: BTreeMap<String, PluginHistoryItem>,
    records: Vec<EditRecord>,
    diagnostics: Vec<Diagnostic>,
}

impl ModConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style artifact loading, mostly for hosts and tests
    pub fn with_artifact(mut self, kind: ArtifactKind, artifact: Artifact) -> Self {
        self.artifacts.insert(kind, artifact);
        self
    }

    pub fn text(&self, kind: ArtifactKind) -> Option<&str> {
        self.artifact(kind).and_then(Artifact::as_text)
    }

    pub fn tree(&self, kind: ArtifactKind) -> Option<&serde_json::Value> {
        self.artifact(kind).and_then(Artifact::as_tree)
    }

    pub fn plugin_history(&self) -> &BTreeMap<String, PluginHistoryItem> {
        &self.plugin_history
    }

    pub(crate) fn record_plugin(&mut self, name: &str, version: &str) {
        self.plugin_history.insert(
            name.to_string(),
            PluginHistoryItem {
                name: name.to_string(),
                version: version.to_string(),
            },
        );
    }

    pub fn records(&self) -> &[EditRecord] {
        &self.records
    }

    pub fn record(&mut self, record: EditRecord) {
        self.records.push(record);
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn diagnose(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }
}

impl ArtifactAccessor for ModConfig {
    fn artifact(&self, kind: ArtifactKind) -> Option<&Artifact> {
        self.artifacts.get(&kind)
    }

    fn take_artifact(&mut self, kind: ArtifactKind) -> Option<Artifact> {
        self.artifacts.remove(&kind)
    }

    fn set_artifact(&mut self, kind: ArtifactKind, artifact: Artifact) {
        self.artifacts.insert(kind, artifact);
    }
}
