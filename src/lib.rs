//! Native project mutators for the Pushy SDK
//!
//! This library injects the Pushy SDK's integration points into a generated
//! native mobile project. Every edit is anchored, minimal and idempotent:
//! re-running the pipeline on its own output changes nothing.
//!
//! Artifacts are handed over by the host already loaded into a [`ModConfig`],
//! text files as strings and structured files (manifest, entitlements, build
//! properties) as xml2js-shaped JSON trees.
//!
//! # Usage
//!
//! ```no_run
//! use pushy_native_mods::{with_pushy, Artifact, ArtifactKind, ModConfig, PipelineReport, PluginProps};
//! use serde_json::json;
//!
//! let config = ModConfig::new()
//!     .with_artifact(ArtifactKind::AndroidManifest, Artifact::Tree(json!({ "manifest": { "application": [{}] } })))
//!     .with_artifact(ArtifactKind::AppBuildGradle, Artifact::Text("dependencies {\n}\n".into()))
//!     .with_artifact(ArtifactKind::AppDelegate, Artifact::Text(String::new()))
//!     .with_artifact(ArtifactKind::Entitlements, Artifact::Tree(json!({})))
//!     .with_artifact(ArtifactKind::BuildProperties, Artifact::Tree(json!({})));
//!
//! let props = PluginProps::with_aps_environment("production");
//! let config = with_pushy(config, &props).unwrap();
//! PipelineReport::from_config(&config).print();
//! ```

pub mod artifact;
pub mod config;
pub mod error;
pub mod fragments;
pub mod host;
pub mod matcher;
pub mod mutator;
pub mod pipeline;
pub mod plugin;
pub mod property;
pub mod report;
pub mod tree;

// Re-export main types at crate root
pub use artifact::{Artifact, ArtifactAccessor, ArtifactKind};
pub use config::{Diagnostic, EditOutcome, EditRecord, ModConfig, PluginProps};
pub use error::{InjectError, Result};
pub use matcher::Anchor;
pub use mutator::{ensure_fragment, FragmentEdit};
pub use pipeline::{Pipeline, Stage};
pub use plugin::{pushy_pipeline, with_pushy};
pub use property::merge_property;
pub use report::PipelineReport;
pub use tree::{ensure_attribute_set, ensure_tree_entries, Granularity};
