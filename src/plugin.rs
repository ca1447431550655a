//! The Pushy plugin: its stages and their fixed order
//!
//! Stages run in this order:
//!
//! 1. `build-properties` adds the `MqttCocoaAsyncSocket` extra pod with
//!    modular headers, before anything references the SDK's iOS module.
//! 2. `android-manifest` declares permissions, the `tools` namespace, and the
//!    SDK's receivers and services.
//! 3. `app-build-gradle` adds the SDK dependency to the app's `dependencies`
//!    block.
//! 4. `ios-app-delegate` imports `PushyModule.h` and forwards
//!    `didFinishLaunchingWithOptions` to it.
//! 5. `ios-entitlements` sets `aps-environment` from the caller's props.
//!
//! Every stage is idempotent, so running the pipeline on its own output is a
//! no-op. [`with_pushy`] additionally refuses to run twice on one config.

use serde_json::{json, Value};
use tracing::debug;

use crate::artifact::ArtifactKind;
use crate::config::{Diagnostic, EditOutcome, EditRecord, ModConfig, PluginProps, APS_ENVIRONMENT};
use crate::error::{InjectError, Result};
use crate::fragments::{
    extra_pods, receivers, services, DEFAULT_APS_ENVIRONMENT, DEPENDENCY_BLOCK, LAUNCH_CALL,
    LAUNCH_DECLARATION, LAUNCH_MARKER, MODULAR_HEADERS, MODULE_IMPORT, MODULE_IMPORT_MARKER,
    MQTT_POD, PERMISSIONS, SDK_DEPENDENCY, SDK_DEPENDENCY_MARKER, SDK_NAMESPACE, TOOLS_NAMESPACE,
};
use crate::host::{
    create_run_once_plugin, declare_permissions, with_text_artifact, with_tree_artifact,
    ANDROID_NAME,
};
use crate::matcher::Anchor;
use crate::mutator::ensure_fragment;
use crate::pipeline::Pipeline;
use crate::property::merge_property;
use crate::tree::{
    ensure_attribute_set, ensure_entry_fields, ensure_tree_entries, identity_contains,
    identity_equals, Granularity, ATTRIBUTES,
};

pub const PLUGIN_NAME: &str = "pushy-native-mods";
pub const PLUGIN_VERSION: &str = env!("CARGO_PKG_VERSION");

pub const BUILD_PROPERTIES: &str = "build-properties";
pub const ANDROID_MANIFEST: &str = "android-manifest";
pub const APP_BUILD_GRADLE: &str = "app-build-gradle";
pub const IOS_APP_DELEGATE: &str = "ios-app-delegate";
pub const IOS_ENTITLEMENTS: &str = "ios-entitlements";

/// Apply the whole plugin to `config`, at most once per config
pub fn with_pushy(config: ModConfig, props: &PluginProps) -> Result<ModConfig> {
    let plugin = create_run_once_plugin(PLUGIN_NAME, PLUGIN_VERSION, |config, props| {
        for key in props.extra.keys() {
            debug!(option = %key, "ignoring unrecognized plugin option");
        }
        pushy_pipeline(props).run(config)
    });
    plugin(config, props)
}

/// The plugin's stages in their fixed order
pub fn pushy_pipeline(props: &PluginProps) -> Pipeline {
    let aps_environment = props.aps_environment.clone();

    Pipeline::new()
        .stage(BUILD_PROPERTIES, with_build_properties)
        .stage(ANDROID_MANIFEST, with_android_manifest)
        .stage(APP_BUILD_GRADLE, with_app_build_gradle)
        .stage(IOS_APP_DELEGATE, with_app_delegate)
        .stage(IOS_ENTITLEMENTS, move |config| {
            with_entitlements(config, aps_environment.as_deref())
        })
}

fn note(config: &mut ModConfig, stage: &str, artifact: ArtifactKind, target: &str, outcome: EditOutcome) {
    if outcome == EditOutcome::AnchorNotFound {
        config.diagnose(Diagnostic {
            stage: stage.to_string(),
            artifact,
            message: format!("anchor for '{}' not found, fragment not injected", target),
        });
    }
    config.record(EditRecord {
        stage: stage.to_string(),
        artifact,
        target: target.to_string(),
        outcome,
    });
}

fn counted(added: usize) -> EditOutcome {
    if added > 0 {
        EditOutcome::Appended(added)
    } else {
        EditOutcome::AlreadyPresent
    }
}

/// Ensure the MQTT pod is built with modular headers
pub fn with_build_properties(config: ModConfig) -> Result<ModConfig> {
    with_tree_artifact(config, ArtifactKind::BuildProperties, |tree, config| {
        tree.as_object_mut()
            .ok_or_else(|| InjectError::malformed(&["ios"], "build properties are not a mapping"))?
            .entry("ios")
            .or_insert_with(|| json!({}));

        let outcome = ensure_tree_entries(
            tree,
            &["ios", "extraPods"],
            &extra_pods(),
            Granularity::Collection,
            &identity_equals("name", MQTT_POD),
        )?;
        note(config, BUILD_PROPERTIES, ArtifactKind::BuildProperties, "ios.extraPods", outcome);

        // A pod declared by someone else still needs the flag.
        let written = ensure_entry_fields(
            tree,
            &["ios", "extraPods"],
            &identity_equals("name", MQTT_POD),
            &[(MODULAR_HEADERS, Value::Bool(true))],
        )?;
        note(config, BUILD_PROPERTIES, ArtifactKind::BuildProperties, MODULAR_HEADERS, counted(written));
        Ok(())
    })
}

/// Ensure permissions, receivers and services in the Android manifest
pub fn with_android_manifest(config: ModConfig) -> Result<ModConfig> {
    with_tree_artifact(config, ArtifactKind::AndroidManifest, |manifest, config| {
        let kind = ArtifactKind::AndroidManifest;

        let added = declare_permissions(manifest, PERMISSIONS)?;
        note(config, ANDROID_MANIFEST, kind, "uses-permission", counted(added));

        let added = ensure_attribute_set(manifest, &["manifest", ATTRIBUTES], &[TOOLS_NAMESPACE])?;
        note(config, ANDROID_MANIFEST, kind, TOOLS_NAMESPACE.0, counted(added));

        let sdk = identity_contains(ANDROID_NAME, SDK_NAMESPACE);
        let collections: [(&str, Vec<Value>); 2] = [("receiver", receivers()), ("service", services())];
        for (collection, entries) in collections {
            let outcome = ensure_tree_entries(
                manifest,
                &["manifest", "application", collection],
                &entries,
                Granularity::Collection,
                &sdk,
            )?;
            note(config, ANDROID_MANIFEST, kind, collection, outcome);
        }
        Ok(())
    })
}

/// Ensure the SDK dependency in the app build script
pub fn with_app_build_gradle(config: ModConfig) -> Result<ModConfig> {
    let anchor = Anchor::block_opener(DEPENDENCY_BLOCK)?;
    with_text_artifact(config, ArtifactKind::AppBuildGradle, |text, config| {
        let edit = ensure_fragment(text, SDK_DEPENDENCY_MARKER, &anchor, SDK_DEPENDENCY);
        note(config, APP_BUILD_GRADLE, ArtifactKind::AppBuildGradle, SDK_DEPENDENCY_MARKER, edit.outcome);
        Ok(edit.text)
    })
}

/// Ensure the module import and launch forwarding in `AppDelegate.mm`
pub fn with_app_delegate(config: ModConfig) -> Result<ModConfig> {
    let launch = Anchor::declaration_block(LAUNCH_DECLARATION)?;
    with_text_artifact(config, ArtifactKind::AppDelegate, |text, config| {
        let kind = ArtifactKind::AppDelegate;

        let edit = ensure_fragment(text, MODULE_IMPORT_MARKER, &Anchor::top(), MODULE_IMPORT);
        note(config, IOS_APP_DELEGATE, kind, MODULE_IMPORT_MARKER, edit.outcome);

        let edit = ensure_fragment(edit.text, LAUNCH_MARKER, &launch, LAUNCH_CALL);
        note(config, IOS_APP_DELEGATE, kind, LAUNCH_MARKER, edit.outcome);

        Ok(edit.text)
    })
}

/// Set `aps-environment`, falling back to `development`
pub fn with_entitlements(config: ModConfig, aps_environment: Option<&str>) -> Result<ModConfig> {
    with_tree_artifact(config, ArtifactKind::Entitlements, |tree, config| {
        let entitlements = tree
            .as_object_mut()
            .ok_or_else(|| InjectError::malformed(&[APS_ENVIRONMENT], "entitlements are not a mapping"))?;

        let previous = entitlements.get(APS_ENVIRONMENT).cloned();
        merge_property(entitlements, APS_ENVIRONMENT, aps_environment, DEFAULT_APS_ENVIRONMENT);

        let outcome = if entitlements.get(APS_ENVIRONMENT) == previous.as_ref() {
            EditOutcome::AlreadyPresent
        } else {
            EditOutcome::Assigned
        };
        note(config, IOS_ENTITLEMENTS, ArtifactKind::Entitlements, APS_ENVIRONMENT, outcome);
        Ok(())
    })
}
