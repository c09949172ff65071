use crate::constants::{
    API_VERSION, COLLECTOR_COMMAND, COLLECTOR_EVENTS, COLLECTOR_POD, DEFAULT_SELECTOR_TAIL,
    TEST_ASSERT_KIND,
};
use crate::Command;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// The `TestAssert` document tunes the assertion phase of the step whose assert file it is found
/// in.
#[derive(Debug, Default, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestAssert {
    #[serde(default)]
    pub api_version: String,

    #[serde(default)]
    pub kind: String,

    /// The number of seconds to wait for the assertions to be satisfied. Zero means the step's own
    /// timeout is used.
    #[serde(default)]
    pub timeout: u64,

    /// Diagnostics collected, in order, when the step fails.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub collectors: Vec<TestCollector>,
}

impl TestAssert {
    pub fn new(timeout: u64) -> Self {
        Self {
            api_version: API_VERSION.to_string(),
            kind: TEST_ASSERT_KIND.to_string(),
            timeout,
            collectors: Vec::new(),
        }
    }
}

/// A diagnostic that is gathered after a step fails. The `type` selects what is collected:
/// - `pod`: the logs of the pod named `pod`, or of the pods matching `selector`.
/// - `events`: the events of the namespace, optionally only those involving `pod`.
/// - `command`: the output of an arbitrary `command`.
///
/// If `type` is empty, a collector with a `command` is a `command` collector and any other is a
/// `pod` collector.
#[derive(Debug, Default, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestCollector {
    #[serde(rename = "type", default, skip_serializing_if = "String::is_empty")]
    pub collector_type: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub pod: String,

    /// Defaults to the test namespace.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub namespace: String,

    /// If empty, the logs of all containers are collected.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub container: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub selector: String,

    /// Number of log lines to collect. Zero means all lines, or the last ten lines when the pods
    /// are selected by label. Negative values mean all lines.
    #[serde(default)]
    pub tail: i64,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub command: String,
}

impl TestCollector {
    /// The collector type after resolving an empty `type`.
    pub fn resolved_type(&self) -> &str {
        match self.collector_type.as_str() {
            "" if !self.command.is_empty() => COLLECTOR_COMMAND,
            "" => COLLECTOR_POD,
            other => other,
        }
    }

    /// Builds the command that gathers this collector's diagnostic. Returns `None` if the collector
    /// is malformed, e.g. a `pod` collector with neither `pod` nor `selector`.
    pub fn command(&self) -> Option<Command> {
        let command = match self.resolved_type() {
            COLLECTOR_POD => self.pod_command()?,
            COLLECTOR_EVENTS => self.events_command(),
            COLLECTOR_COMMAND if !self.command.is_empty() => self.command.clone(),
            _ => return None,
        };
        Some(Command {
            command,
            ignore_failure: true,
            ..Default::default()
        })
    }

    fn namespace_arg(&self) -> &str {
        if self.namespace.is_empty() {
            "$NAMESPACE"
        } else {
            &self.namespace
        }
    }

    fn pod_command(&self) -> Option<String> {
        if self.pod.is_empty() && self.selector.is_empty() {
            return None;
        }
        let mut command = String::from("kubectl logs --prefix");
        if !self.pod.is_empty() {
            command.push_str(&format!(" {}", self.pod));
        }
        if !self.selector.is_empty() {
            command.push_str(&format!(" -l {}", self.selector));
        }
        command.push_str(&format!(" -n {}", self.namespace_arg()));
        if self.container.is_empty() {
            command.push_str(" --all-containers");
        } else {
            command.push_str(&format!(" -c {}", self.container));
        }
        let tail = match self.tail {
            0 if !self.selector.is_empty() => DEFAULT_SELECTOR_TAIL,
            0 => -1,
            tail => tail,
        };
        command.push_str(&format!(" --tail={}", tail));
        Some(command)
    }

    fn events_command(&self) -> String {
        let mut command = String::from("kubectl get events");
        if !self.pod.is_empty() {
            command.push_str(&format!(
                " --field-selector involvedObject.name={}",
                self.pod
            ));
        }
        command.push_str(&format!(" -n {}", self.namespace_arg()));
        command
    }
}

impl Display for TestCollector {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.resolved_type() {
            COLLECTOR_POD if !self.pod.is_empty() => write!(f, "pod: {}", self.pod),
            COLLECTOR_POD => write!(f, "pods with label: {}", self.selector),
            COLLECTOR_EVENTS if !self.pod.is_empty() => write!(f, "events for pod: {}", self.pod),
            COLLECTOR_EVENTS => write!(f, "events in namespace: {}", self.namespace_arg()),
            COLLECTOR_COMMAND => write!(f, "command: {}", self.command),
            other => write!(f, "unknown collector type: {}", other),
        }
    }
}
