/*!

Applying, cleaning and deleting the objects of a step against the mock cluster.

!*/

mod mock;

use kstep::Error;
use mock::{new_step, write, MockCluster, RecordingLogger, NAMESPACE};
use std::sync::Arc;
use std::time::Duration;
use tempfile::tempdir;
use tokio::time::Instant;

const SETTINGS: &str = r#"
apiVersion: v1
kind: ConfigMap
metadata:
  name: settings
data:
  color: blue
"#;

fn old_pod(name: &str, app: &str) -> String {
    format!(
        "apiVersion: v1\nkind: Pod\nmetadata:\n  name: {}\n  namespace: {}\n  labels:\n    app: {}\n",
        name, NAMESPACE, app
    )
}

const CLEANUP: &str = r#"
apiVersion: kuttl.dev/v1beta1
kind: TestStep
delete:
  - apiVersion: v1
    kind: Pod
    labels:
      app: old
  - apiVersion: v1
    kind: ConfigMap
    name: settings
"#;

fn cluster_with_old_objects() -> Arc<MockCluster> {
    let cluster = Arc::new(MockCluster::new());
    cluster.insert(&old_pod("old-1", "old"));
    cluster.insert(&old_pod("old-2", "old"));
    cluster.insert(&old_pod("keep", "new"));
    cluster.insert(&format!(
        "apiVersion: v1\nkind: ConfigMap\nmetadata:\n  name: settings\n  namespace: {}\n",
        NAMESPACE
    ));
    cluster
}

#[tokio::test]
async fn apply_creates_then_updates() {
    mock::init_logger();
    let dir = tempdir().unwrap();
    let cluster = Arc::new(MockCluster::new());
    let logger = Arc::new(RecordingLogger::default());
    let mut step = new_step(0, dir.path(), 30, &cluster, &logger);
    step.load_yaml(&write(dir.path(), "00-settings.yaml", SETTINGS))
        .await
        .unwrap();

    assert!(step.create(NAMESPACE).await.is_empty());
    assert!(logger.contains("ConfigMap:kstep-1/settings created"));
    let created = cluster.object("v1", "ConfigMap", "settings").unwrap();
    assert_eq!(created.data["data"]["color"], "blue");
    // The loaded object itself is not modified by applying it.
    assert_eq!(step.apply[0].metadata.namespace, None);

    step.apply[0].data["data"]["color"] = "green".into();
    assert!(step.create(NAMESPACE).await.is_empty());
    assert!(logger.contains("ConfigMap:kstep-1/settings updated"));
    let updated = cluster.object("v1", "ConfigMap", "settings").unwrap();
    assert_eq!(updated.data["data"]["color"], "green");
    assert_eq!(cluster.resets(), 2);
}

#[tokio::test]
async fn apply_continues_past_errors() {
    let dir = tempdir().unwrap();
    let cluster = Arc::new(MockCluster::new());
    let logger = Arc::new(RecordingLogger::default());
    let mut step = new_step(0, dir.path(), 30, &cluster, &logger);
    let unknown = "apiVersion: v1\nkind: Secret\nmetadata:\n  name: token\n";
    step.load_yaml(&write(
        dir.path(),
        "00-install.yaml",
        &format!("{}---{}", unknown, SETTINGS),
    ))
    .await
    .unwrap();

    let errors = step.create(NAMESPACE).await;
    assert_eq!(errors.len(), 1);
    assert!(matches!(errors[0], Error::Client { .. }));
    assert!(cluster.object("v1", "ConfigMap", "settings").is_some());
}

#[tokio::test(start_paused = true)]
async fn conflicting_writes_are_retried() {
    let dir = tempdir().unwrap();
    let cluster = Arc::new(MockCluster::new());
    let logger = Arc::new(RecordingLogger::default());
    let mut step = new_step(0, dir.path(), 30, &cluster, &logger);
    step.load_yaml(&write(dir.path(), "00-settings.yaml", SETTINGS))
        .await
        .unwrap();

    cluster.conflicts(2);
    let start = Instant::now();
    assert!(step.create(NAMESPACE).await.is_empty());
    let elapsed = start.elapsed();
    assert!(elapsed >= Duration::from_millis(1000) && elapsed < Duration::from_millis(1500));
    assert!(logger.contains("ConfigMap:kstep-1/settings created"));

    cluster.conflicts(3);
    let errors = step.create(NAMESPACE).await;
    assert_eq!(errors.len(), 1);
    assert_eq!(
        errors[0].to_string(),
        "Unable to create or update ConfigMap:kstep-1/settings: ConfigMap:kstep-1/settings was modified concurrently"
    );
}

#[tokio::test]
async fn clean_ignores_missing_objects() {
    let dir = tempdir().unwrap();
    let cluster = Arc::new(MockCluster::new());
    let logger = Arc::new(RecordingLogger::default());
    let mut step = new_step(0, dir.path(), 30, &cluster, &logger);
    step.load_yaml(&write(
        dir.path(),
        "00-install.yaml",
        &format!("{}---\n{}", SETTINGS, old_pod("web", "web")),
    ))
    .await
    .unwrap();
    cluster.insert(&old_pod("web", "web"));

    step.clean(NAMESPACE).await.unwrap();
    assert!(cluster.object("v1", "Pod", "web").is_none());
}

#[tokio::test(start_paused = true)]
async fn delete_existing_waits_until_objects_are_gone() {
    let dir = tempdir().unwrap();
    let cluster = cluster_with_old_objects();
    cluster.linger(2);
    let logger = Arc::new(RecordingLogger::default());
    let mut step = new_step(0, dir.path(), 5, &cluster, &logger);
    step.load_yaml(&write(dir.path(), "00-cleanup.yaml", CLEANUP))
        .await
        .unwrap();

    let start = Instant::now();
    step.delete_existing(NAMESPACE).await.unwrap();
    let elapsed = start.elapsed();
    assert!(elapsed >= Duration::from_millis(200) && elapsed < Duration::from_millis(300));
    assert!(cluster.object("v1", "Pod", "old-1").is_none());
    assert!(cluster.object("v1", "Pod", "old-2").is_none());
    assert!(cluster.object("v1", "ConfigMap", "settings").is_none());
    assert!(cluster.object("v1", "Pod", "keep").is_some());
}

#[tokio::test(start_paused = true)]
async fn delete_existing_times_out() {
    let dir = tempdir().unwrap();
    let cluster = cluster_with_old_objects();
    cluster.linger(1000);
    let logger = Arc::new(RecordingLogger::default());
    let mut step = new_step(0, dir.path(), 1, &cluster, &logger);
    step.load_yaml(&write(dir.path(), "00-cleanup.yaml", CLEANUP))
        .await
        .unwrap();

    let err = step.delete_existing(NAMESPACE).await.unwrap_err();
    assert!(matches!(err, Error::DeletionTimeout { seconds: 1, .. }));
    let message = err.to_string();
    assert!(message.contains("Pod:kstep-1/old-1"), "{}", message);
    assert!(message.contains("ConfigMap:kstep-1/settings"), "{}", message);
    assert!(!message.contains("keep"), "{}", message);
}

#[tokio::test(start_paused = true)]
async fn delete_existing_stops_at_a_failing_get() {
    let dir = tempdir().unwrap();
    let cluster = cluster_with_old_objects();
    cluster.linger(1000);
    cluster.unavailable_while_deleting();
    let logger = Arc::new(RecordingLogger::default());
    let mut step = new_step(0, dir.path(), 5, &cluster, &logger);
    step.load_yaml(&write(dir.path(), "00-cleanup.yaml", CLEANUP))
        .await
        .unwrap();

    let start = Instant::now();
    let err = step.delete_existing(NAMESPACE).await.unwrap_err();
    assert_eq!(start.elapsed(), Duration::ZERO);
    assert!(matches!(err, Error::Client { .. }), "{}", err);
    assert!(err.to_string().starts_with("Unable to get Pod:kstep-1/old-1"), "{}", err);
}

#[tokio::test(start_paused = true)]
async fn delete_existing_deletes_cluster_scoped_objects_by_name() {
    let dir = tempdir().unwrap();
    let cluster = Arc::new(MockCluster::new());
    cluster.insert("apiVersion: v1\nkind: Namespace\nmetadata:\n  name: scratch\n");
    cluster.linger(1);
    let logger = Arc::new(RecordingLogger::default());
    let mut step = new_step(0, dir.path(), 5, &cluster, &logger);
    step.load_yaml(&write(
        dir.path(),
        "00-cleanup.yaml",
        "apiVersion: kuttl.dev/v1beta1\nkind: TestStep\ndelete:\n  - apiVersion: v1\n    kind: Namespace\n    name: scratch\n",
    ))
    .await
    .unwrap();

    step.delete_existing(NAMESPACE).await.unwrap();
    assert!(cluster.object("v1", "Namespace", "scratch").is_none());
}

#[tokio::test]
async fn delete_existing_without_test_step_does_nothing() {
    let dir = tempdir().unwrap();
    let cluster = cluster_with_old_objects();
    let logger = Arc::new(RecordingLogger::default());
    let step = new_step(0, dir.path(), 5, &cluster, &logger);

    step.delete_existing(NAMESPACE).await.unwrap();
    assert_eq!(cluster.gets(), 0);
    assert!(cluster.object("v1", "Pod", "old-1").is_some());
}
