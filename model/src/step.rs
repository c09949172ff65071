use crate::constants::{API_VERSION, TEST_STEP_KIND};
use crate::Command;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The `TestStep` document overrides the behavior of the step whose directory it is found in. It is
/// written alongside the objects the step applies and removed from them when the step is loaded.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestStep {
    #[serde(default)]
    pub api_version: String,

    #[serde(default)]
    pub kind: String,

    /// If `metadata.name` is set, it becomes the name of the step.
    #[serde(default)]
    pub metadata: ObjectMeta,

    /// The position of the step in its test. This is overwritten with the step's index on load.
    #[serde(default)]
    pub index: usize,

    /// Additional files, directories or URLs containing objects to apply.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub apply: Vec<String>,

    /// Additional files, directories or URLs containing objects to assert.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub assert: Vec<String>,

    /// Additional files, directories or URLs containing objects that must not be found.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub error: Vec<String>,

    /// Objects to delete, and wait for the deletion of, before the step begins.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub delete: Vec<ObjectReference>,

    /// Commands to run before the step's objects are applied.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub commands: Vec<Command>,

    /// Shorthand for namespaced `kubectl` commands, e.g. `apply -f config.yaml`. These run after
    /// `commands`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub kubectl: Vec<String>,
}

impl TestStep {
    pub fn new() -> Self {
        Self {
            api_version: API_VERSION.to_string(),
            kind: TEST_STEP_KIND.to_string(),
            ..Default::default()
        }
    }

    /// The name given in `metadata.name`, if it is set and not empty.
    pub fn name(&self) -> Option<&str> {
        self.metadata.name.as_deref().filter(|name| !name.is_empty())
    }

    /// All of the fixture commands in the order they should be run: `commands` followed by the
    /// `kubectl` shorthands.
    pub fn all_commands(&self) -> Vec<Command> {
        self.commands
            .iter()
            .cloned()
            .chain(self.kubectl.iter().map(|args| Command {
                command: format!("kubectl {}", args),
                namespaced: true,
                ..Default::default()
            }))
            .collect()
    }
}

/// A reference to one or more objects that should be deleted before a step runs. If `name` is empty
/// the reference is a query matching every object of `kind` in `namespace` that carries `labels`.
#[derive(Debug, Default, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectReference {
    #[serde(default)]
    pub api_version: String,

    #[serde(default)]
    pub kind: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub namespace: String,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
}

impl ObjectReference {
    /// The labels of the reference in the form of a Kubernetes label selector, e.g. `a=b,c=d`.
    /// Returns `None` if there are no labels.
    pub fn label_selector(&self) -> Option<String> {
        if self.labels.is_empty() {
            return None;
        }
        Some(
            self.labels
                .iter()
                .map(|(key, value)| format!("{}={}", key, value))
                .collect::<Vec<_>>()
                .join(","),
        )
    }
}
