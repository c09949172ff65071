use super::Step;
use crate::clients::{self, AllowNotFound, Client, Discovery, HttpStatusCode, StatusCode};
use crate::error::{self, Error, Result};
use crate::object::{gvk_string, new_resource, ObjectIdentity};
use kube::core::DynamicObject;
use log::{debug, trace};
use snafu::ResultExt;
use std::time::Duration;
use tokio::time::Instant;

/// Interval at which deleted objects are checked for whether they are gone.
const DELETE_POLL_INTERVAL: Duration = Duration::from_millis(100);

impl<C, D> Step<C, D>
where
    C: Client,
    D: Discovery,
{
    /// Deletes the objects that the step applies. Objects that do not exist are ignored. Stops at
    /// the first error.
    pub async fn clean(&self, namespace: &str) -> Result<()> {
        for object in &self.apply {
            let mut object = object.clone();
            self.resolve(&mut object, namespace).await?;
            self.client
                .delete(&object)
                .await
                .allow_not_found(|_| ())
                .context(error::ClientSnafu {
                    action: format!("delete {}", object.resource_id()),
                })?;
        }
        Ok(())
    }

    /// Deletes the objects referenced by the `delete` list of the `TestStep` and waits until they
    /// are gone. References without a name delete every object of their kind that carries their
    /// labels. Waits at most [`Step::get_timeout`] seconds.
    pub async fn delete_existing(&self, namespace: &str) -> Result<()> {
        let step = match &self.step {
            Some(step) => step,
            None => return Ok(()),
        };

        let mut targets = Vec::new();
        for reference in &step.delete {
            let mut object = new_resource(
                &reference.api_version,
                &reference.kind,
                &reference.name,
                "",
            );
            let object_namespace = if reference.namespace.is_empty() {
                namespace
            } else {
                reference.namespace.as_str()
            };
            let (_, object_namespace) = self.resolve(&mut object, object_namespace).await?;

            if !reference.name.is_empty() {
                targets.push(object);
                continue;
            }
            let gvk = object.gvk();
            let selector = reference.label_selector();
            let matched = self
                .client
                .list(&gvk, &object_namespace, selector.as_deref())
                .await
                .context(error::ClientSnafu {
                    action: format!("list matching resources of kind {}", gvk_string(&gvk)),
                })?;
            targets.extend(matched);
        }

        for target in &targets {
            debug!("deleting {}", target.resource_id());
            self.client
                .delete(target)
                .await
                .allow_not_found(|_| ())
                .context(error::ClientSnafu {
                    action: format!("delete {}", target.resource_id()),
                })?;
        }

        self.wait_for_deletion(&targets).await
    }

    /// Polls until a get of each of `targets` is not found. The first check is immediate.
    async fn wait_for_deletion(&self, targets: &[DynamicObject]) -> Result<()> {
        let seconds = self.get_timeout();
        let deadline = Instant::now() + Duration::from_secs(seconds);
        loop {
            let remaining = self.remaining(targets).await?;
            if remaining.is_empty() {
                return Ok(());
            }
            if Instant::now() >= deadline {
                return error::DeletionTimeoutSnafu { seconds, remaining }.fail();
            }
            trace!("waiting for the deletion of {}", remaining.join(", "));
            tokio::time::sleep(DELETE_POLL_INTERVAL).await;
        }
    }

    /// The resource ids of the `targets` that can still be found.
    async fn remaining(&self, targets: &[DynamicObject]) -> Result<Vec<String>> {
        let mut remaining = Vec::new();
        for target in targets {
            let found = self
                .client
                .get(
                    &target.gvk(),
                    target.object_namespace(),
                    target.object_name(),
                )
                .await
                .allow_not_found(|_| ())
                .context(error::ClientSnafu {
                    action: format!("get {}", target.resource_id()),
                })?;
            if found.is_some() {
                remaining.push(target.resource_id());
            }
        }
        Ok(remaining)
    }

    /// Creates or updates every object the step applies. Each object has `timeout` seconds to be
    /// applied, if `timeout` is not zero. Errors do not stop the remaining objects from being
    /// applied; all of them are returned.
    pub async fn create(&self, namespace: &str) -> Vec<Error> {
        // Custom resource definitions may have been installed since the last step.
        self.discovery.reset().await;

        let mut errors = Vec::new();
        for object in &self.apply {
            let mut object = object.clone();
            if let Err(e) = self.resolve(&mut object, namespace).await {
                errors.push(e);
                continue;
            }
            let result = if self.timeout > 0 {
                tokio::time::timeout(
                    Duration::from_secs(self.timeout),
                    self.create_or_update(&object),
                )
                .await
                .context(error::TimeoutSnafu {
                    resource: object.resource_id(),
                    seconds: self.timeout,
                })
                .and_then(|result| result)
            } else {
                self.create_or_update(&object).await
            };
            match result {
                Ok(updated) => {
                    let action = if updated { "updated" } else { "created" };
                    self.logger
                        .log(&format!("{} {}", object.resource_id(), action));
                }
                Err(e) => errors.push(e),
            }
        }
        errors
    }

    /// Updates `object` if it exists and creates it otherwise. Returns `true` if the object was
    /// updated. Writes that conflict with a concurrent modification are retried.
    async fn create_or_update(&self, object: &DynamicObject) -> Result<bool> {
        const MAX_RETRIES: u32 = 3;
        const BACKOFF_MS: u64 = 500;

        let mut attempt = 1;
        loop {
            match self.try_create_or_update(object).await {
                Err(e) if e.is_status_code(StatusCode::CONFLICT) && attempt < MAX_RETRIES => {
                    debug!("retrying write of {}: {}", object.resource_id(), e);
                    attempt += 1;
                    tokio::time::sleep(Duration::from_millis(BACKOFF_MS)).await;
                }
                result => {
                    return result.context(error::ClientSnafu {
                        action: format!("create or update {}", object.resource_id()),
                    })
                }
            }
        }
    }

    async fn try_create_or_update(&self, object: &DynamicObject) -> clients::Result<bool> {
        // Objects without a name may use `generateName` and can only be created.
        if object.object_name().is_empty() {
            self.client.create(object).await?;
            return Ok(false);
        }
        let existing = self
            .client
            .get(
                &object.gvk(),
                object.object_namespace(),
                object.object_name(),
            )
            .await
            .allow_not_found(|_| ())?;
        match existing {
            Some(_) => {
                self.client.update(object).await?;
                Ok(true)
            }
            None => {
                self.client.create(object).await?;
                Ok(false)
            }
        }
    }

    /// Places `object` into `namespace` unless it is cluster-scoped or has a namespace of its own.
    /// Returns the name and namespace of the object.
    pub(super) async fn resolve<O>(
        &self,
        object: &mut O,
        namespace: &str,
    ) -> Result<(String, String)>
    where
        O: ObjectIdentity + Send,
    {
        clients::namespaced(self.discovery.as_ref(), object, namespace)
            .await
            .context(error::ClientSnafu {
                action: format!("resolve the scope of {}", gvk_string(&object.gvk())),
            })
    }
}
