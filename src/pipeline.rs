//! Pipeline composition
//!
//! A pipeline is an ordered list of named stages. Running it folds one
//! [`ModConfig`] through every stage in insertion order: each stage owns the
//! configuration for its duration and hands back the updated value.
//!
//! There is no rollback. When a stage fails the fold stops and the error is
//! returned wrapped in [`InjectError::StageFailed`]; edits made by earlier
//! stages are not undone. Suppressing a second run of the same pipeline is the
//! host's job (see [`crate::host::create_run_once_plugin`]).

use std::fmt;

use tracing::{debug, info, info_span};

use crate::config::ModConfig;
use crate::error::{InjectError, Result};

/// A transform from one configuration state to the next
pub type ModFn = Box<dyn Fn(ModConfig) -> Result<ModConfig>>;

/// One named step of a pipeline
pub struct Stage {
    name: String,
    apply: ModFn,
}

impl Stage {
    pub fn new(name: impl Into<String>, apply: impl Fn(ModConfig) -> Result<ModConfig> + 'static) -> Self {
        Self {
            name: name.into(),
            apply: Box::new(apply),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Debug for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Stage").field("name", &self.name).finish()
    }
}

/// An ordered composition of stages
#[derive(Debug, Default)]
pub struct Pipeline {
    stages: Vec<Stage>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a stage; stages run in the order they were added
    pub fn stage(
        mut self,
        name: impl Into<String>,
        apply: impl Fn(ModConfig) -> Result<ModConfig> + 'static,
    ) -> Self {
        self.stages.push(Stage::new(name, apply));
        self
    }

    pub fn stage_names(&self) -> Vec<&str> {
        self.stages.iter().map(Stage::name).collect()
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Thread `config` through every stage in order
    pub fn run(&self, config: ModConfig) -> Result<ModConfig> {
        info!(stages = self.stages.len(), "running pipeline");

        let mut config = config;
        for stage in &self.stages {
            let span = info_span!("stage", name = %stage.name);
            let _guard = span.enter();

            debug!("applying stage");
            config = (stage.apply)(config).map_err(|e| InjectError::StageFailed {
                stage: stage.name.clone(),
                source: Box::new(e),
            })?;
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifact::{Artifact, ArtifactAccessor, ArtifactKind};
    use std::cell::RefCell;
    use std::rc::Rc;

    fn append(line: &'static str) -> impl Fn(ModConfig) -> Result<ModConfig> {
        move |mut config: ModConfig| {
            let text = config
                .text(ArtifactKind::AppBuildGradle)
                .unwrap_or_default()
                .to_string();
            config.set_artifact(ArtifactKind::AppBuildGradle, Artifact::Text(text + line));
            Ok(config)
        }
    }

    #[test]
    fn test_stages_run_in_order() {
        let pipeline = Pipeline::new()
            .stage("first", append("a"))
            .stage("second", append("b"))
            .stage("third", append("c"));

        let config = pipeline.run(ModConfig::new()).unwrap();

        assert_eq!(pipeline.stage_names(), vec!["first", "second", "third"]);
        assert_eq!(config.text(ArtifactKind::AppBuildGradle), Some("abc"));
    }

    #[test]
    fn test_empty_pipeline_is_identity() {
        let pipeline = Pipeline::new();
        assert!(pipeline.is_empty());

        let config = ModConfig::new()
            .with_artifact(ArtifactKind::AppDelegate, Artifact::Text("@end".to_string()));
        let config = pipeline.run(config).unwrap();
        assert_eq!(config.text(ArtifactKind::AppDelegate), Some("@end"));
    }

    #[test]
    fn test_failure_stops_fold() {
        let ran = Rc::new(RefCell::new(Vec::new()));
        let log = |name: &'static str| {
            let ran = Rc::clone(&ran);
            move |config: ModConfig| {
                ran.borrow_mut().push(name);
                Ok(config)
            }
        };

        let pipeline = Pipeline::new()
            .stage("before", log("before"))
            .stage("broken", |_config: ModConfig| {
                Err(InjectError::MissingArtifact {
                    kind: ArtifactKind::AndroidManifest,
                })
            })
            .stage("after", log("after"));

        let result = pipeline.run(ModConfig::new());

        match result {
            Err(InjectError::StageFailed { stage, source }) => {
                assert_eq!(stage, "broken");
                assert!(matches!(*source, InjectError::MissingArtifact { .. }));
            }
            other => panic!("expected stage failure, got {:?}", other.map(|_| ())),
        }
        assert_eq!(*ran.borrow(), vec!["before"]);
    }
}
