use super::error::{self, Result};
use super::{Client, Discovery, DynamicObject, GroupVersionKind, Scope};
use crate::object::{gvk_string, ObjectIdentity};
use async_trait::async_trait;
use kube::api::{DeleteParams, ListParams, Patch, PatchParams, PostParams};
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::core::TypeMeta;
use kube::discovery::{ApiCapabilities, ApiResource};
use kube::{Api, Config};
use log::{debug, trace};
use snafu::ResultExt;
use std::collections::HashMap;
use std::path::Path;
use tokio::sync::Mutex;

/// The [`Client`] and [`Discovery`] implementation backed by the Kubernetes API. Objects are
/// accessed as `DynamicObject`s; the API resource of each kind is discovered once and cached until
/// [`Discovery::reset`] is called.
pub struct KubeClient {
    k8s_client: kube::Client,
    api_resources: Mutex<HashMap<String, (ApiResource, ApiCapabilities)>>,
}

impl KubeClient {
    /// Create a `KubeClient` using the default `kube::Client`, i.e. from `$KUBECONFIG`, the default
    /// kubeconfig location, or the in-cluster environment.
    pub async fn new() -> Result<Self> {
        let k8s_client = kube::Client::try_default()
            .await
            .context(error::InitializationSnafu)?;
        Ok(Self::new_from_k8s_client(k8s_client))
    }

    /// Create a `KubeClient` from the path to a kubeconfig file.
    pub async fn new_from_kubeconfig_path(kubeconfig_path: &Path) -> Result<Self> {
        let kubeconfig =
            Kubeconfig::read_from(kubeconfig_path).context(error::KubeconfigReadSnafu)?;
        let config = Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
            .await
            .context(error::KubeconfigClientSnafu)?;
        let k8s_client = kube::Client::try_from(config).context(error::InitializationSnafu)?;
        Ok(Self::new_from_k8s_client(k8s_client))
    }

    pub fn new_from_k8s_client(k8s_client: kube::Client) -> Self {
        Self {
            k8s_client,
            api_resources: Mutex::new(HashMap::new()),
        }
    }

    async fn api_resource(
        &self,
        gvk: &GroupVersionKind,
    ) -> Result<(ApiResource, ApiCapabilities)> {
        let key = gvk_string(gvk);
        let mut api_resources = self.api_resources.lock().await;
        if let Some(found) = api_resources.get(&key) {
            return Ok(found.clone());
        }
        trace!("discovering API resource for {}", key);
        let found = kube::discovery::pinned_kind(&self.k8s_client, gvk)
            .await
            .context(error::DiscoverySnafu { what: key.clone() })?;
        api_resources.insert(key, found.clone());
        Ok(found)
    }

    /// Creates the `Api` used to address objects of kind `gvk` in `namespace`. Cluster-scoped kinds
    /// and empty namespaces use an `Api` that is not bound to a namespace.
    async fn api(&self, gvk: &GroupVersionKind, namespace: &str) -> Result<Api<DynamicObject>> {
        let (api_resource, capabilities) = self.api_resource(gvk).await?;
        Ok(match capabilities.scope {
            Scope::Namespaced if !namespace.is_empty() => {
                Api::namespaced_with(self.k8s_client.clone(), namespace, &api_resource)
            }
            _ => Api::all_with(self.k8s_client.clone(), &api_resource),
        })
    }

    async fn object_api(&self, object: &DynamicObject) -> Result<Api<DynamicObject>> {
        self.api(&object.gvk(), object.object_namespace()).await
    }
}

fn required_name<'a>(object: &'a DynamicObject, method: &str) -> Result<&'a str> {
    let name = object.object_name();
    if name.is_empty() {
        return Err(error::InnerError::MissingName {
            method: method.to_string(),
            what: object.resource_id(),
        }
        .into());
    }
    Ok(name)
}

#[async_trait]
impl Client for KubeClient {
    async fn get(
        &self,
        gvk: &GroupVersionKind,
        namespace: &str,
        name: &str,
    ) -> Result<DynamicObject> {
        Ok(self
            .api(gvk, namespace)
            .await?
            .get(name)
            .await
            .context(error::KubeApiCallSnafu {
                method: "get",
                what: format!("{}:{}/{}", gvk.kind, namespace, name),
            })?)
    }

    async fn list(
        &self,
        gvk: &GroupVersionKind,
        namespace: &str,
        label_selector: Option<&str>,
    ) -> Result<Vec<DynamicObject>> {
        let mut list_params = ListParams::default();
        if let Some(label_selector) = label_selector {
            list_params = list_params.labels(label_selector);
        }
        Ok(self
            .api(gvk, namespace)
            .await?
            .list(&list_params)
            .await
            .context(error::KubeApiCallSnafu {
                method: "list",
                what: gvk_string(gvk),
            })?
            .items
            .into_iter()
            .map(|mut item| {
                // Items of a list response do not repeat the kind of the list.
                item.types.get_or_insert_with(|| TypeMeta {
                    api_version: if gvk.group.is_empty() {
                        gvk.version.clone()
                    } else {
                        format!("{}/{}", gvk.group, gvk.version)
                    },
                    kind: gvk.kind.clone(),
                });
                item
            })
            .collect())
    }

    async fn create(&self, object: &DynamicObject) -> Result<DynamicObject> {
        Ok(self
            .object_api(object)
            .await?
            .create(&PostParams::default(), object)
            .await
            .context(error::KubeApiCallSnafu {
                method: "create",
                what: object.resource_id(),
            })?)
    }

    async fn update(&self, object: &DynamicObject) -> Result<DynamicObject> {
        let name = required_name(object, "update")?;
        Ok(self
            .object_api(object)
            .await?
            .patch(name, &PatchParams::default(), &Patch::Merge(object))
            .await
            .context(error::KubeApiCallSnafu {
                method: "update",
                what: object.resource_id(),
            })?)
    }

    async fn delete(&self, object: &DynamicObject) -> Result<()> {
        let name = required_name(object, "delete")?;
        self.object_api(object)
            .await?
            .delete(name, &DeleteParams::background())
            .await
            .context(error::KubeApiCallSnafu {
                method: "delete",
                what: object.resource_id(),
            })?;
        Ok(())
    }
}

#[async_trait]
impl Discovery for KubeClient {
    async fn scope(&self, gvk: &GroupVersionKind) -> Result<Scope> {
        let (_, capabilities) = self.api_resource(gvk).await?;
        Ok(capabilities.scope)
    }

    async fn reset(&self) {
        debug!("clearing the API resource cache");
        self.api_resources.lock().await.clear();
    }
}
