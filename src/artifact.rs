//! Native project artifacts and access to them
//!
//! An artifact is one generated native file. Depending on its kind it is held
//! either as raw text or as a parsed tree of mapping/array nodes.

use std::fmt;

use serde_json::Value;

/// The native files a mutator can target
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ArtifactKind {
    /// `AndroidManifest.xml`, held as an xml2js-shaped tree
    AndroidManifest,
    /// `android/app/build.gradle`
    AppBuildGradle,
    /// `ios/<App>/AppDelegate.mm`
    AppDelegate,
    /// `ios/<App>/<App>.entitlements`, held as a flat mapping
    Entitlements,
    /// Properties consumed by the build-properties collaborator
    BuildProperties,
}

impl ArtifactKind {
    /// Representation this kind is held in
    pub fn is_tree(self) -> bool {
        matches!(
            self,
            ArtifactKind::AndroidManifest | ArtifactKind::Entitlements | ArtifactKind::BuildProperties
        )
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ArtifactKind::AndroidManifest => "android-manifest",
            ArtifactKind::AppBuildGradle => "app-build-gradle",
            ArtifactKind::AppDelegate => "app-delegate",
            ArtifactKind::Entitlements => "entitlements",
            ArtifactKind::BuildProperties => "build-properties",
        };
        f.write_str(name)
    }
}

/// Current content of one artifact
#[derive(Debug, Clone, PartialEq)]
pub enum Artifact {
    Text(String),
    Tree(Value),
}

impl Artifact {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Artifact::Text(text) => Some(text),
            Artifact::Tree(_) => None,
        }
    }

    pub fn as_tree(&self) -> Option<&Value> {
        match self {
            Artifact::Tree(tree) => Some(tree),
            Artifact::Text(_) => None,
        }
    }
}

/// Read/write access to the artifacts of one native project
pub trait ArtifactAccessor {
    /// Borrow the current content of `kind`, if loaded
    fn artifact(&self, kind: ArtifactKind) -> Option<&Artifact>;

    /// Remove `kind` so a stage can own it for the duration of one edit
    fn take_artifact(&mut self, kind: ArtifactKind) -> Option<Artifact>;

    /// Store the (possibly mutated) content of `kind`
    fn set_artifact(&mut self, kind: ArtifactKind, artifact: Artifact);
}
