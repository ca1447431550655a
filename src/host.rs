//! Host-side helpers a build pipeline provides to plugins
//!
//! These stand in for what the surrounding build tool offers: scoped access to
//! one artifact at a time, permission declaration without duplicates, and a
//! run-once guard keyed by plugin name.

use serde_json::{json, Value};
use tracing::{debug, info};

use crate::artifact::{Artifact, ArtifactAccessor, ArtifactKind};
use crate::config::{EditOutcome, ModConfig, PluginProps};
use crate::error::{InjectError, Result};
use crate::tree::{ensure_tree_entries, identity_contains, Granularity, ATTRIBUTES};

/// Attribute naming a permission, receiver or service
pub const ANDROID_NAME: &str = "android:name";

/// Hand the text of `kind` to `f` and store what it returns
pub fn with_text_artifact<F>(mut config: ModConfig, kind: ArtifactKind, f: F) -> Result<ModConfig>
where
    F: FnOnce(String, &mut ModConfig) -> Result<String>,
{
    let text = match config.take_artifact(kind) {
        Some(Artifact::Text(text)) => text,
        Some(Artifact::Tree(_)) => {
            return Err(InjectError::WrongRepresentation {
                kind,
                expected: "text",
            })
        }
        None => return Err(InjectError::MissingArtifact { kind }),
    };

    let text = f(text, &mut config)?;
    config.set_artifact(kind, Artifact::Text(text));
    Ok(config)
}

/// Hand the tree of `kind` to `f` for in-place mutation
pub fn with_tree_artifact<F>(mut config: ModConfig, kind: ArtifactKind, f: F) -> Result<ModConfig>
where
    F: FnOnce(&mut Value, &mut ModConfig) -> Result<()>,
{
    let mut tree = match config.take_artifact(kind) {
        Some(Artifact::Tree(tree)) => tree,
        Some(Artifact::Text(_)) => {
            return Err(InjectError::WrongRepresentation {
                kind,
                expected: "tree",
            })
        }
        None => return Err(InjectError::MissingArtifact { kind }),
    };

    f(&mut tree, &mut config)?;
    config.set_artifact(kind, Artifact::Tree(tree));
    Ok(config)
}

/// Merge permission names into `<uses-permission>` without duplicates
///
/// The final set only depends on the union of all names ever declared, not on
/// call order. Returns how many were added.
pub fn declare_permissions(manifest: &mut Value, names: &[&str]) -> Result<usize> {
    let mut entries: Vec<Value> = Vec::with_capacity(names.len());
    for name in names {
        let entry = json!({ ATTRIBUTES: { ANDROID_NAME: name } });
        if !entries.contains(&entry) {
            entries.push(entry);
        }
    }

    // Entry granularity compares names only, the prefix is irrelevant.
    let outcome = ensure_tree_entries(
        manifest,
        &["manifest", "uses-permission"],
        &entries,
        Granularity::Entry,
        &identity_contains(ANDROID_NAME, ""),
    )?;

    let added = match outcome {
        EditOutcome::Appended(n) => n,
        _ => 0,
    };
    debug!(requested = names.len(), added, "permissions declared");
    Ok(added)
}

/// Permission names currently declared in `manifest`
pub fn declared_permissions(manifest: &Value) -> Vec<&str> {
    manifest["manifest"]["uses-permission"]
        .as_array()
        .map(|entries| {
            entries
                .iter()
                .filter_map(|e| e[ATTRIBUTES][ANDROID_NAME].as_str())
                .collect()
        })
        .unwrap_or_default()
}

/// Wrap `plugin` so it runs at most once per configuration
///
/// The first call records `name`/`version` in the plugin history and runs the
/// plugin; later calls on a configuration that already carries `name` return
/// it untouched.
pub fn create_run_once_plugin<F>(
    name: &str,
    version: &str,
    plugin: F,
) -> impl Fn(ModConfig, &PluginProps) -> Result<ModConfig>
where
    F: Fn(ModConfig, &PluginProps) -> Result<ModConfig>,
{
    let name = name.to_string();
    let version = version.to_string();

    move |mut config: ModConfig, props: &PluginProps| {
        if config.plugin_history().contains_key(&name) {
            info!(plugin = %name, "plugin already applied, skipping");
            return Ok(config);
        }

        config.record_plugin(&name, &version);
        plugin(config, props)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::cell::Cell;
    use std::collections::BTreeSet;

    fn manifest() -> Value {
        json!({ "manifest": { "application": [{}] } })
    }

    fn permission_set(manifest: &Value) -> BTreeSet<String> {
        declared_permissions(manifest)
            .into_iter()
            .map(str::to_string)
            .collect()
    }

    #[test]
    fn test_declare_permissions_dedups() {
        let mut tree = manifest();

        let added = declare_permissions(&mut tree, &["P1", "P2", "P1"]).unwrap();
        let again = declare_permissions(&mut tree, &["P2"]).unwrap();

        assert_eq!(added, 2);
        assert_eq!(again, 0);
        assert_eq!(declared_permissions(&tree), vec!["P1", "P2"]);
    }

    #[test]
    fn test_permission_order_independence() {
        let mut split = manifest();
        declare_permissions(&mut split, &["P1", "P2"]).unwrap();
        declare_permissions(&mut split, &["P2", "P3"]).unwrap();

        let mut reversed = manifest();
        declare_permissions(&mut reversed, &["P2", "P3"]).unwrap();
        declare_permissions(&mut reversed, &["P1", "P2"]).unwrap();

        let mut once = manifest();
        declare_permissions(&mut once, &["P1", "P2", "P3"]).unwrap();

        assert_eq!(permission_set(&split), permission_set(&once));
        assert_eq!(permission_set(&reversed), permission_set(&once));
        assert_eq!(declared_permissions(&split).len(), 3);
    }

    #[test]
    fn test_permissions_keep_existing_entries() {
        let mut tree = json!({
            "manifest": {
                "uses-permission": [
                    { "$": { "android:name": "android.permission.CAMERA" } },
                    { "$": { "android:name": "android.permission.INTERNET", "tools:node": "merge" } }
                ]
            }
        });

        let added = declare_permissions(
            &mut tree,
            &["android.permission.INTERNET", "android.permission.WAKE_LOCK"],
        )
        .unwrap();

        assert_eq!(added, 1);
        assert_eq!(tree["manifest"]["uses-permission"][1]["$"]["tools:node"], "merge");
    }

    #[test]
    fn test_with_text_artifact_round_trip() {
        let config = ModConfig::new()
            .with_artifact(ArtifactKind::AppDelegate, Artifact::Text("@end\n".to_string()));

        let config = with_text_artifact(config, ArtifactKind::AppDelegate, |text, _| {
            Ok(format!("// header\n{}", text))
        })
        .unwrap();

        assert_eq!(config.text(ArtifactKind::AppDelegate), Some("// header\n@end\n"));
    }

    #[test]
    fn test_accessor_errors() {
        let missing = with_text_artifact(ModConfig::new(), ArtifactKind::AppDelegate, |t, _| Ok(t));
        assert!(matches!(missing, Err(InjectError::MissingArtifact { .. })));

        let config = ModConfig::new()
            .with_artifact(ArtifactKind::Entitlements, Artifact::Text(String::new()));
        let wrong = with_tree_artifact(config, ArtifactKind::Entitlements, |_, _| Ok(()));
        assert!(matches!(
            wrong,
            Err(InjectError::WrongRepresentation { expected: "tree", .. })
        ));
    }

    #[test]
    fn test_run_once() {
        let calls = Cell::new(0);
        let plugin = create_run_once_plugin("pushy", "1.0.0", |config, _props| {
            calls.set(calls.get() + 1);
            Ok(config)
        });
        let props = PluginProps::default();

        let config = plugin(ModConfig::new(), &props).unwrap();
        let config = plugin(config, &props).unwrap();

        assert_eq!(calls.get(), 1);
        assert_eq!(config.plugin_history()["pushy"].version, "1.0.0");
    }
}
