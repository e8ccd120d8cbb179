//! Storage locations of the artifacts a task consumes and produces.

use crate::core::run_graph::model::TaskDecl;
use crate::core::run_graph::presentation::NodePhase;
use pipegraph_types::RunMetadata;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

/// Annotation prefix used by the pipeline compiler.
pub const DEFAULT_ANNOTATION_PREFIX: &str = "tekton.dev";
/// Token in output artifact keys standing for the run id.
pub const PIPELINERUN_PLACEHOLDER: &str = "$PIPELINERUN";

#[derive(Debug, Clone, Deserialize)]
struct InputArtifactDescriptor {
    name: String,
    parent_task: String,
}

#[derive(Debug, Clone, Deserialize)]
struct OutputArtifactDescriptor {
    name: String,
    #[serde(default)]
    key: Option<String>,
}

/// Endpoint, bucket and scheme shared by every artifact of a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StorageTemplate {
    pub endpoint: String,
    pub bucket: String,
    pub scheme: String,
}

/// Resolved location of one artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArtifactLocation {
    pub name: String,
    pub endpoint: String,
    pub bucket: String,
    pub scheme: String,
    pub key: String,
}

impl ArtifactLocation {
    fn from_template(template: &StorageTemplate, name: &str, key: String) -> Self {
        Self {
            name: name.to_string(),
            endpoint: template.endpoint.clone(),
            bucket: template.bucket.clone(),
            scheme: template.scheme.clone(),
            key,
        }
    }

    /// Object URL on the artifact endpoint.
    pub fn url(&self) -> String {
        format!("{}{}/{}/{}", self.scheme, self.endpoint, self.bucket, self.key)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ArtifactLocations {
    pub inputs: Vec<ArtifactLocation>,
    pub outputs: Vec<ArtifactLocation>,
}

/// Resolves artifact locations from the run's annotations.
#[derive(Debug, Clone, Default)]
pub struct ArtifactResolver {
    run_name: String,
    template: StorageTemplate,
    inputs: BTreeMap<String, Vec<InputArtifactDescriptor>>,
    outputs: BTreeMap<String, Vec<OutputArtifactDescriptor>>,
    cache_enabled: HashSet<String>,
}

impl ArtifactResolver {
    pub fn new(metadata: &RunMetadata, tasks: &[TaskDecl], annotation_prefix: &str) -> Self {
        let annotation = |suffix: &str| {
            metadata
                .annotations
                .get(&format!("{}/{}", annotation_prefix, suffix))
                .cloned()
        };

        Self {
            run_name: metadata.name.clone(),
            template: StorageTemplate {
                endpoint: annotation("artifact_endpoint").unwrap_or_default(),
                bucket: annotation("artifact_bucket").unwrap_or_default(),
                scheme: annotation("artifact_endpoint_scheme").unwrap_or_default(),
            },
            inputs: parse_descriptor_map(annotation("input_artifacts"), "input_artifacts"),
            outputs: parse_descriptor_map(annotation("output_artifacts"), "output_artifacts"),
            cache_enabled: tasks
                .iter()
                .filter(|task| task.cache_enabled)
                .map(|task| task.name.clone())
                .collect(),
        }
    }

    pub fn template(&self) -> &StorageTemplate {
        &self.template
    }

    /// Input and output locations of `task_name` given its computed status.
    ///
    /// When the producing task is cache-enabled and `cached_run_id` is given,
    /// keys point into the cached run instead of the current one.
    pub fn resolve(
        &self,
        task_name: &str,
        status: &str,
        cached_run_id: Option<&str>,
    ) -> ArtifactLocations {
        let inputs = self
            .inputs
            .get(task_name)
            .map(|descriptors| {
                descriptors
                    .iter()
                    .map(|input| {
                        let run_id = self.run_id_for(&input.parent_task, cached_run_id);
                        let key = format!(
                            "artifacts/{}/{}/{}.tgz",
                            run_id, input.parent_task, input.name
                        );
                        ArtifactLocation::from_template(&self.template, &input.name, key)
                    })
                    .collect()
            })
            .unwrap_or_default();

        ArtifactLocations {
            inputs,
            outputs: self.outputs(task_name, status, cached_run_id),
        }
    }

    /// Output locations of a node announced by identity only, without cache override.
    pub fn resolve_outputs_for_announced_node(
        &self,
        task_name: &str,
        status: &str,
    ) -> Vec<ArtifactLocation> {
        self.outputs(task_name, status, None)
    }

    fn outputs(
        &self,
        task_name: &str,
        status: &str,
        cached_run_id: Option<&str>,
    ) -> Vec<ArtifactLocation> {
        if NodePhase::from_reason(status) != NodePhase::Succeeded {
            return Vec::new();
        }
        let Some(descriptors) = self.outputs.get(task_name) else {
            return Vec::new();
        };
        let run_id = self.run_id_for(task_name, cached_run_id);
        descriptors
            .iter()
            .filter_map(|output| {
                // runs compiled before keys were recorded carry no key
                let key = output.key.as_deref()?;
                Some(ArtifactLocation::from_template(
                    &self.template,
                    &output.name,
                    key.replace(PIPELINERUN_PLACEHOLDER, run_id),
                ))
            })
            .collect()
    }

    fn run_id_for<'a>(&'a self, producer: &str, cached_run_id: Option<&'a str>) -> &'a str {
        match cached_run_id {
            Some(cached) if self.cache_enabled.contains(producer) => cached,
            _ => &self.run_name,
        }
    }
}

fn parse_descriptor_map<T>(raw: Option<String>, annotation: &str) -> BTreeMap<String, Vec<T>>
where
    T: for<'de> Deserialize<'de>,
{
    let Some(raw) = raw else {
        return BTreeMap::new();
    };
    match serde_json::from_str(&raw) {
        Ok(map) => map,
        Err(err) => {
            tracing::warn!(annotation = %annotation, "ignoring malformed artifact annotation: {}", err);
            BTreeMap::new()
        }
    }
}
