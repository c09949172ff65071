use crate::subset::SubsetError;
use snafu::Snafu;
use std::path::PathBuf;
use std::process::ExitStatus;

pub type Result<T> = std::result::Result<T, Error>;

/// The error type for loading and running a `Step`.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum Error {
    #[snafu(display("Unable to {}: {}", action, source))]
    Client {
        action: String,
        source: crate::clients::Error,
    },

    #[snafu(display("Invalid command {:?}: {}", command, reason))]
    CommandInvalid { command: String, reason: String },

    #[snafu(display("Command {:?} failed with {}", command, status))]
    CommandFailed { command: String, status: ExitStatus },

    #[snafu(display("Unable to run command {:?}: {}", command, source))]
    CommandSpawn {
        command: String,
        source: std::io::Error,
    },

    #[snafu(display("command {:?} exceeded {} sec timeout", command, seconds))]
    CommandTimeout { command: String, seconds: u64 },

    #[snafu(display("failed to load {} object from {}: {}", kind, path, source))]
    ConfigDecode {
        kind: String,
        path: String,
        source: serde_json::Error,
    },

    #[snafu(display(
        "Timed out after {} sec waiting for the deletion of {}",
        seconds,
        remaining.join(", ")
    ))]
    DeletionTimeout {
        seconds: u64,
        remaining: Vec<String>,
    },

    #[snafu(display("{}", diff))]
    Diff { diff: String },

    #[snafu(display("Unable to render diff of {}: {}", resource, source))]
    DiffRender {
        resource: String,
        source: serde_yaml::Error,
    },

    #[snafu(display("failed to find YAML files in {}: {}", path.display(), source))]
    DirectoryRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[snafu(display("more than 1 TestStep not allowed in step {:?}", step))]
    DuplicateStepConfig { step: String },

    #[snafu(display("Unable to fetch {}: {}", url, source))]
    Fetch { url: String, source: reqwest::Error },

    #[snafu(display("resource matched of kind: {}", gvk))]
    ForbiddenMatch { gvk: String },

    #[snafu(display("loading {}: {}", path.display(), source))]
    Load {
        path: PathBuf,
        #[snafu(source(from(Error, Box::new)))]
        source: Box<Error>,
    },

    #[snafu(display("resource {}: {}", resource, source))]
    Mismatch {
        resource: String,
        source: SubsetError,
    },

    #[snafu(display("Unable to decode object from {}: {}", path, source))]
    ObjectDecode {
        path: String,
        source: serde_json::Error,
    },

    #[snafu(display("no resources matched of kind: {}", gvk))]
    NoMatch { gvk: String },

    #[snafu(display("Unable to read file '{}': {}", path.display(), source))]
    ReadFile {
        path: PathBuf,
        source: std::io::Error,
    },

    #[snafu(display("Could not serialize {}: {}", what, source))]
    Serialize {
        what: String,
        source: serde_json::Error,
    },

    #[snafu(display("step {:?} {} path {}: {}", step, what, path, source))]
    StepPath {
        step: String,
        what: String,
        path: String,
        #[snafu(source(from(Error, Box::new)))]
        source: Box<Error>,
    },

    #[snafu(display("Timed out after {} sec applying {}", seconds, resource))]
    Timeout {
        resource: String,
        seconds: u64,
        source: tokio::time::error::Elapsed,
    },

    #[snafu(display(
        "failed to load {} object from {}: it contains an object of type {}",
        kind,
        path,
        found
    ))]
    TypeMismatch {
        kind: String,
        path: String,
        found: String,
    },

    #[snafu(display("document in {} is missing apiVersion or kind", path))]
    TypeMeta { path: String },

    #[snafu(display("Unable to decode YAML from {}: {}", path, source))]
    YamlDecode {
        path: String,
        source: serde_yaml::Error,
    },
}
