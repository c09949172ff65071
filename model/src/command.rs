use serde::{Deserialize, Serialize};

/// A command that is run as part of a test step, either as a fixture before the step's objects are
/// applied or as a diagnostic collector after the step has failed.
///
/// Exactly one of `command` and `script` must be set. A `command` is split into arguments and run
/// directly, so shell syntax such as pipes is not available. A `script` is handed to `sh -c`.
#[derive(Debug, Default, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Command {
    /// The command and its arguments. Environment variables such as `$NAMESPACE` are expanded.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub command: String,

    /// A shell script run with `sh -c`.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub script: String,

    /// If `true`, `--namespace <test namespace>` is appended to the command's arguments.
    #[serde(default)]
    pub namespaced: bool,

    /// If `true`, a failing exit status does not fail the step.
    #[serde(default)]
    pub ignore_failure: bool,

    /// Requests that the command keep running in the background. Test steps do not allow this and
    /// run such commands in the foreground.
    #[serde(default)]
    pub background: bool,

    /// Timeout in seconds for this command. Zero means the step's timeout is used.
    #[serde(default)]
    pub timeout: u64,

    /// If `true`, the output of the command is not logged.
    #[serde(default)]
    pub skip_log_output: bool,
}

impl Command {
    /// Create a `Command` that runs `command` with no other options set.
    pub fn new<S>(command: S) -> Self
    where
        S: Into<String>,
    {
        Self {
            command: command.into(),
            ..Default::default()
        }
    }

    /// The text used to identify this command in log messages and errors.
    pub fn text(&self) -> &str {
        if self.command.is_empty() {
            &self.script
        } else {
            &self.command
        }
    }
}
