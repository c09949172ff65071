use kube::core::{DynamicObject, GroupVersionKind, ObjectMeta, TypeMeta};
use serde_json::Value;

/// The identity of an object that is otherwise treated as an opaque tree of data: its kind and the
/// name and namespace it is addressed by.
pub trait ObjectIdentity {
    fn api_version(&self) -> &str;

    fn kind(&self) -> &str;

    /// The object's name, or `""` if it has none.
    fn object_name(&self) -> &str;

    /// The object's namespace, or `""` if it has none.
    fn object_namespace(&self) -> &str;

    fn set_object_namespace(&mut self, namespace: &str);

    /// The group, version and kind parsed from `apiVersion` and `kind`.
    fn gvk(&self) -> GroupVersionKind {
        let (group, version) = match self.api_version().split_once('/') {
            Some((group, version)) => (group, version),
            None => ("", self.api_version()),
        };
        GroupVersionKind::gvk(group, version, self.kind())
    }

    /// A short string identifying the object in log messages, e.g. `Pod:default/web`.
    fn resource_id(&self) -> String {
        format!(
            "{}:{}/{}",
            self.kind(),
            self.object_namespace(),
            self.object_name()
        )
    }
}

impl ObjectIdentity for DynamicObject {
    fn api_version(&self) -> &str {
        self.types
            .as_ref()
            .map(|types| types.api_version.as_str())
            .unwrap_or_default()
    }

    fn kind(&self) -> &str {
        self.types
            .as_ref()
            .map(|types| types.kind.as_str())
            .unwrap_or_default()
    }

    fn object_name(&self) -> &str {
        self.metadata.name.as_deref().unwrap_or_default()
    }

    fn object_namespace(&self) -> &str {
        self.metadata.namespace.as_deref().unwrap_or_default()
    }

    fn set_object_namespace(&mut self, namespace: &str) {
        self.metadata.namespace = Some(namespace.to_string()).filter(|ns| !ns.is_empty());
    }
}

/// An object as it was written in a YAML document. `object` is the decoded form used to address
/// the object in the cluster. `tree` is the document itself: decoding into `object` drops metadata
/// fields it does not know and fills in defaults for required ones that are missing, so an expected
/// object is compared using `tree`.
#[derive(Clone, Debug)]
pub struct Document {
    pub object: DynamicObject,
    pub tree: Value,
}

impl ObjectIdentity for Document {
    fn api_version(&self) -> &str {
        self.object.api_version()
    }

    fn kind(&self) -> &str {
        self.object.kind()
    }

    fn object_name(&self) -> &str {
        self.object.object_name()
    }

    fn object_namespace(&self) -> &str {
        self.object.object_namespace()
    }

    fn set_object_namespace(&mut self, namespace: &str) {
        self.object.set_object_namespace(namespace);
        if let Some(metadata) = self
            .tree
            .get_mut("metadata")
            .and_then(Value::as_object_mut)
        {
            if namespace.is_empty() {
                metadata.remove("namespace");
            } else {
                metadata.insert("namespace".to_string(), Value::from(namespace));
            }
        }
    }
}

/// Formats `gvk` the way Kubernetes does in error messages, e.g. `apps/v1, Kind=Deployment` or
/// `/v1, Kind=Pod`.
pub fn gvk_string(gvk: &GroupVersionKind) -> String {
    format!("{}/{}, Kind={}", gvk.group, gvk.version, gvk.kind)
}

/// Creates an object that carries nothing but its identity. Empty `name` and `namespace` are left
/// unset.
pub fn new_resource(api_version: &str, kind: &str, name: &str, namespace: &str) -> DynamicObject {
    let non_empty = |s: &str| Some(s.to_string()).filter(|s| !s.is_empty());
    DynamicObject {
        types: Some(TypeMeta {
            api_version: api_version.to_string(),
            kind: kind.to_string(),
        }),
        metadata: ObjectMeta {
            name: non_empty(name),
            namespace: non_empty(namespace),
            ..ObjectMeta::default()
        },
        data: Value::Object(Default::default()),
    }
}
