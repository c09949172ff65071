/*!

An in-memory stand-in for a cluster so that a [`Step`] can be run without k8s. [`MockCluster`]
implements both [`Client`] and [`Discovery`]. It can be told to keep deleted objects around for a
while, the way objects with finalizers linger in a real cluster, and to fail writes with conflicts.

[`Step`]: kstep::Step

!*/

#![allow(dead_code)]

use async_trait::async_trait;
use kstep::clients::{DynamicObject, Error, GroupVersionKind, Result, Scope};
use kstep::{new_resource, Client, Discovery, Logger, ObjectIdentity, Step};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub const NAMESPACE: &str = "kstep-1";

/// Objects are stored by kind, namespace and name.
type Key = (String, String, String);

fn kind_key(gvk: &GroupVersionKind) -> String {
    format!("{}/{}", gvk.group, gvk.kind)
}

fn key(gvk: &GroupVersionKind, namespace: &str, name: &str) -> Key {
    (kind_key(gvk), namespace.to_string(), name.to_string())
}

fn object_key(object: &DynamicObject) -> Key {
    key(
        &object.gvk(),
        object.object_namespace(),
        object.object_name(),
    )
}

pub struct MockCluster {
    objects: Mutex<BTreeMap<Key, DynamicObject>>,
    scopes: HashMap<String, Scope>,
    /// Deleted objects and the number of gets they survive.
    deleting: Mutex<HashMap<Key, usize>>,
    linger: AtomicUsize,
    unavailable_while_deleting: AtomicBool,
    conflicts: AtomicUsize,
    gets: AtomicUsize,
    resets: AtomicUsize,
}

impl MockCluster {
    pub fn new() -> Self {
        let scopes = [
            ("/Pod", Scope::Namespaced),
            ("/ConfigMap", Scope::Namespaced),
            ("apps/Deployment", Scope::Namespaced),
            ("/Namespace", Scope::Cluster),
        ]
        .into_iter()
        .map(|(kind, scope)| (kind.to_string(), scope))
        .collect();
        Self {
            objects: Default::default(),
            scopes,
            deleting: Default::default(),
            linger: AtomicUsize::new(0),
            unavailable_while_deleting: AtomicBool::new(false),
            conflicts: AtomicUsize::new(0),
            gets: AtomicUsize::new(0),
            resets: AtomicUsize::new(0),
        }
    }

    /// Deleted objects can still be fetched `gets` times before they are gone.
    pub fn linger(&self, gets: usize) {
        self.linger.store(gets, Ordering::SeqCst);
    }

    /// Gets of deleted objects that are still lingering fail as if the API server were down.
    pub fn unavailable_while_deleting(&self) {
        self.unavailable_while_deleting.store(true, Ordering::SeqCst);
    }

    /// The next `count` creates or updates fail with a conflict.
    pub fn conflicts(&self, count: usize) {
        self.conflicts.store(count, Ordering::SeqCst);
    }

    pub fn gets(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }

    pub fn resets(&self) -> usize {
        self.resets.load(Ordering::SeqCst)
    }

    /// Adds an object to the store from YAML.
    pub fn insert(&self, yaml: &str) {
        let object: DynamicObject = serde_yaml::from_str(yaml).unwrap();
        self.objects
            .lock()
            .unwrap()
            .insert(object_key(&object), object);
    }

    pub fn object(&self, api_version: &str, kind: &str, name: &str) -> Option<DynamicObject> {
        let resource = new_resource(api_version, kind, name, "");
        let namespace = if matches!(self.scope_of(&resource.gvk()), Some(Scope::Namespaced)) {
            NAMESPACE
        } else {
            ""
        };
        self.objects
            .lock()
            .unwrap()
            .get(&key(&resource.gvk(), namespace, name))
            .cloned()
    }

    /// Sets `status.phase` of the pod `name`, the way the kubelet would.
    pub fn set_pod_phase(&self, name: &str, phase: &str) {
        let resource = new_resource("v1", "Pod", name, NAMESPACE);
        let mut objects = self.objects.lock().unwrap();
        let pod = objects.get_mut(&object_key(&resource)).unwrap();
        pod.data["status"] = serde_json::json!({ "phase": phase });
    }

    fn scope_of(&self, gvk: &GroupVersionKind) -> Option<Scope> {
        self.scopes.get(&kind_key(gvk)).cloned()
    }

    fn take_conflict(&self, object: &DynamicObject) -> Result<()> {
        let conflicts = self.conflicts.load(Ordering::SeqCst);
        if conflicts > 0 {
            self.conflicts.store(conflicts - 1, Ordering::SeqCst);
            return Err(Error::conflict(object.resource_id()));
        }
        Ok(())
    }
}

fn matches_selector(object: &DynamicObject, label_selector: Option<&str>) -> bool {
    let selector = match label_selector {
        Some(selector) => selector,
        None => return true,
    };
    let labels = object.metadata.labels.clone().unwrap_or_default();
    selector.split(',').all(|requirement| {
        let (key, value) = requirement.split_once('=').unwrap();
        labels.get(key).map(String::as_str) == Some(value)
    })
}

/// JSON merge patch.
fn merge(target: &mut Value, patch: &Value) {
    match (target, patch) {
        (Value::Object(target), Value::Object(patch)) => {
            for (key, value) in patch {
                if value.is_null() {
                    target.remove(key);
                } else {
                    merge(target.entry(key.clone()).or_insert(Value::Null), value);
                }
            }
        }
        (target, patch) => *target = patch.clone(),
    }
}

#[async_trait]
impl Client for MockCluster {
    async fn get(
        &self,
        gvk: &GroupVersionKind,
        namespace: &str,
        name: &str,
    ) -> Result<DynamicObject> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        let key = key(gvk, namespace, name);
        let mut objects = self.objects.lock().unwrap();
        let mut deleting = self.deleting.lock().unwrap();
        if let Some(remaining) = deleting.get_mut(&key) {
            if self.unavailable_while_deleting.load(Ordering::SeqCst) {
                return Err(Error::unavailable(
                    "the server is currently unable to handle the request",
                ));
            }
            if *remaining == 0 {
                deleting.remove(&key);
                objects.remove(&key);
            } else {
                *remaining -= 1;
            }
        }
        objects
            .get(&key)
            .cloned()
            .ok_or_else(|| Error::not_found(format!("{}:{}/{}", gvk.kind, namespace, name)))
    }

    async fn list(
        &self,
        gvk: &GroupVersionKind,
        namespace: &str,
        label_selector: Option<&str>,
    ) -> Result<Vec<DynamicObject>> {
        let kind = kind_key(gvk);
        Ok(self
            .objects
            .lock()
            .unwrap()
            .iter()
            .filter(|((object_kind, object_namespace, _), object)| {
                *object_kind == kind
                    && (namespace.is_empty() || object_namespace == namespace)
                    && matches_selector(object, label_selector)
            })
            .map(|(_, object)| object.clone())
            .collect())
    }

    async fn create(&self, object: &DynamicObject) -> Result<DynamicObject> {
        self.take_conflict(object)?;
        let key = object_key(object);
        let mut objects = self.objects.lock().unwrap();
        if objects.contains_key(&key) {
            return Err(Error::unavailable(format!(
                "{} already exists",
                object.resource_id()
            )));
        }
        objects.insert(key, object.clone());
        Ok(object.clone())
    }

    async fn update(&self, object: &DynamicObject) -> Result<DynamicObject> {
        self.take_conflict(object)?;
        let mut objects = self.objects.lock().unwrap();
        let existing = objects
            .get_mut(&object_key(object))
            .ok_or_else(|| Error::not_found(object.resource_id()))?;
        let mut merged = serde_json::to_value(&*existing).unwrap();
        merge(&mut merged, &serde_json::to_value(object).unwrap());
        *existing = serde_json::from_value(merged).unwrap();
        Ok(existing.clone())
    }

    async fn delete(&self, object: &DynamicObject) -> Result<()> {
        let key = object_key(object);
        let mut objects = self.objects.lock().unwrap();
        if !objects.contains_key(&key) {
            return Err(Error::not_found(object.resource_id()));
        }
        let linger = self.linger.load(Ordering::SeqCst);
        if linger == 0 {
            objects.remove(&key);
        } else {
            self.deleting
                .lock()
                .unwrap()
                .entry(key)
                .or_insert(linger);
        }
        Ok(())
    }
}

#[async_trait]
impl Discovery for MockCluster {
    async fn scope(&self, gvk: &GroupVersionKind) -> Result<Scope> {
        self.scope_of(gvk)
            .ok_or_else(|| Error::unavailable(format!("unknown kind {}", gvk.kind)))
    }

    async fn reset(&self) {
        self.resets.fetch_add(1, Ordering::SeqCst);
    }
}

/// A [`Logger`] that keeps every message.
#[derive(Default)]
pub struct RecordingLogger {
    lines: Mutex<Vec<String>>,
    flushes: AtomicUsize,
}

impl RecordingLogger {
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().unwrap().clone()
    }

    pub fn contains(&self, line: &str) -> bool {
        self.lines().iter().any(|logged| logged == line)
    }

    pub fn flushes(&self) -> usize {
        self.flushes.load(Ordering::SeqCst)
    }
}

impl Logger for RecordingLogger {
    fn log(&self, message: &str) {
        self.lines.lock().unwrap().push(message.to_string());
    }

    fn flush(&self) {
        self.flushes.fetch_add(1, Ordering::SeqCst);
    }
}

pub type MockStep = Step<MockCluster, MockCluster>;

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Creates a step that runs against `cluster` and logs to `logger`.
pub fn new_step(
    index: usize,
    dir: &Path,
    timeout: u64,
    cluster: &Arc<MockCluster>,
    logger: &Arc<RecordingLogger>,
) -> MockStep {
    Step::new(
        index,
        dir,
        timeout,
        Arc::clone(cluster),
        Arc::clone(cluster),
        Arc::clone(logger) as Arc<dyn Logger>,
    )
}

/// Writes a file to the step directory `dir`, creating parent directories as needed.
pub fn write(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(&path, contents).unwrap();
    path
}
