use crate::clients::{HttpStatusCode, StatusCode};
use snafu::Snafu;

/// The `Result` type returned by `clients`.
pub type Result<T> = std::result::Result<T, Error>;

/// The public error type returned by `clients`.
#[derive(Debug, Snafu)]
pub struct Error(InnerError);

/// The private error type returned by `clients`.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(super)))]
pub(crate) enum InnerError {
    #[snafu(display("Error initializing the Kubernetes client: {}", source))]
    Initialization { source: kube::Error },

    #[snafu(display("Unable to read kubeconfig: {}", source))]
    KubeconfigRead {
        source: kube::config::KubeconfigError,
    },

    #[snafu(display("Unable to create client from kubeconfig: {}", source))]
    KubeconfigClient {
        source: kube::config::KubeconfigError,
    },

    #[snafu(display("Unable to {} {}: {}", method, what, source))]
    KubeApiCall {
        method: String,
        what: String,
        source: kube::Error,
    },

    #[snafu(display("Retrieving API resource for {} failed: {}", what, source))]
    Discovery { what: String, source: kube::Error },

    #[snafu(display("Unable to {} {}: the object has no name", method, what))]
    MissingName { method: String, what: String },

    #[snafu(display("{} not found", what))]
    NotFound { what: String },

    #[snafu(display("{} was modified concurrently", what))]
    Conflict { what: String },

    #[snafu(display("{}", message))]
    Unavailable { message: String },
}

impl Error {
    /// An error that reports `what` as missing from the cluster. This is the error a [`Client`]
    /// that is not backed by the kube API should return for objects that do not exist.
    ///
    /// [`Client`]: crate::clients::Client
    pub fn not_found<S>(what: S) -> Self
    where
        S: Into<String>,
    {
        Error(InnerError::NotFound { what: what.into() })
    }

    /// An error that reports a conflicting concurrent modification of `what`. Writes that fail with
    /// it are retried.
    pub fn conflict<S>(what: S) -> Self
    where
        S: Into<String>,
    {
        Error(InnerError::Conflict { what: what.into() })
    }

    /// Any other failure of a [`Client`] or [`Discovery`] that is not backed by the kube API.
    ///
    /// [`Client`]: crate::clients::Client
    /// [`Discovery`]: crate::clients::Discovery
    pub fn unavailable<S>(message: S) -> Self
    where
        S: Into<String>,
    {
        Error(InnerError::Unavailable {
            message: message.into(),
        })
    }
}

impl HttpStatusCode for InnerError {
    fn status_code(&self) -> Option<StatusCode> {
        match self {
            InnerError::KubeApiCall { source, .. } | InnerError::Discovery { source, .. } => {
                source.status_code()
            }
            InnerError::NotFound { .. } => Some(StatusCode::NOT_FOUND),
            InnerError::Conflict { .. } => Some(StatusCode::CONFLICT),
            InnerError::Initialization { .. }
            | InnerError::KubeconfigRead { .. }
            | InnerError::KubeconfigClient { .. }
            | InnerError::MissingName { .. }
            | InnerError::Unavailable { .. } => None,
        }
    }
}

impl HttpStatusCode for Error {
    fn status_code(&self) -> Option<StatusCode> {
        self.0.status_code()
    }
}
