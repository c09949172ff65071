mod error;
mod http_status_code;
mod kube_client;

use crate::object::ObjectIdentity;
use async_trait::async_trait;
pub use error::{Error, Result};
pub use http_status_code::{AllowNotFound, HttpStatusCode, StatusCode};
pub use kube::api::{DynamicObject, GroupVersionKind};
pub use kube::discovery::Scope;
pub use kube_client::KubeClient;

/// The `Client` is the interface a [`Step`] uses to read and write objects in the cluster. The
/// purpose of the interface is to allow injection of a fake object store for development and
/// testing without the presence of a k8s cluster. In practice you will use [`KubeClient`].
///
/// Every function that addresses a missing object must return an error for which
/// [`HttpStatusCode::is_not_found`] is `true`.
///
/// [`Step`]: crate::Step
#[async_trait]
pub trait Client: Send + Sync {
    /// Get the object of kind `gvk` named `name`. `namespace` is empty for cluster-scoped kinds.
    async fn get(
        &self,
        gvk: &GroupVersionKind,
        namespace: &str,
        name: &str,
    ) -> Result<DynamicObject>;

    /// List the objects of kind `gvk`. An empty `namespace` lists across all namespaces. If given,
    /// `label_selector` is a Kubernetes label selector such as `app=nginx,tier=web`.
    async fn list(
        &self,
        gvk: &GroupVersionKind,
        namespace: &str,
        label_selector: Option<&str>,
    ) -> Result<Vec<DynamicObject>>;

    /// Create `object`. It must not exist yet.
    async fn create(&self, object: &DynamicObject) -> Result<DynamicObject>;

    /// Merge `object` into the existing object of the same identity.
    async fn update(&self, object: &DynamicObject) -> Result<DynamicObject>;

    /// Request the deletion of `object`. Deletion may complete after this returns.
    async fn delete(&self, object: &DynamicObject) -> Result<()>;
}

/// Resolves whether a kind of object lives in a namespace or in the cluster scope.
#[async_trait]
pub trait Discovery: Send + Sync {
    async fn scope(&self, gvk: &GroupVersionKind) -> Result<Scope>;

    /// Forget any cached discovery information, e.g. after custom resource definitions have been
    /// added to the cluster.
    async fn reset(&self) {}
}

/// Resolves the namespace of `object` using `discovery`. A cluster-scoped object gets no namespace.
/// A namespaced object keeps its own namespace if it has one and is otherwise placed into
/// `namespace`. Returns the name and the resolved namespace of the object.
pub async fn namespaced<D, O>(
    discovery: &D,
    object: &mut O,
    namespace: &str,
) -> Result<(String, String)>
where
    D: Discovery + ?Sized,
    O: ObjectIdentity + Send,
{
    let scope = discovery.scope(&object.gvk()).await?;
    if matches!(scope, Scope::Cluster) {
        return Ok((object.object_name().to_string(), String::new()));
    }
    if object.object_namespace().is_empty() {
        object.set_object_namespace(namespace);
    }
    Ok((
        object.object_name().to_string(),
        object.object_namespace().to_string(),
    ))
}
