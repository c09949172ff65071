use super::Step;
use crate::clients::{AllowNotFound, Client, Discovery};
use crate::diff::pretty_diff;
use crate::error::{self, Error, Result};
use crate::object::{gvk_string, Document, ObjectIdentity};
use crate::subset::is_subset;
use kube::core::DynamicObject;
use serde_json::Value;
use snafu::ResultExt;

impl<C, D> Step<C, D>
where
    C: Client,
    D: Discovery,
{
    /// Checks that an object matching `expected` exists. A named object is fetched directly, an
    /// unnamed one is matched against every object of its kind in the namespace. An object matches
    /// if every field of `expected` is present in it with the same value.
    ///
    /// Returns no errors as soon as one candidate matches. Otherwise returns a diff and a mismatch
    /// error for every candidate.
    pub async fn check_resource(&self, expected: &Document, namespace: &str) -> Vec<Error> {
        let mut expected = expected.clone();
        let (name, namespace) = match self.resolve(&mut expected, namespace).await {
            Ok(resolved) => resolved,
            Err(e) => return vec![e],
        };
        let gvk = expected.gvk();

        let mut errors = Vec::new();
        let actuals = if !name.is_empty() {
            match self.client.get(&gvk, &namespace, &name).await {
                Ok(actual) => vec![actual],
                Err(e) => {
                    return vec![Error::Client {
                        action: format!("get {}", expected.resource_id()),
                        source: e,
                    }]
                }
            }
        } else {
            let listed = self.client.list(&gvk, &namespace, None).await;
            let actuals = listed.as_ref().map(Vec::len).unwrap_or_default();
            if actuals == 0 {
                errors.push(Error::NoMatch {
                    gvk: gvk_string(&gvk),
                });
            }
            match listed {
                Ok(actuals) => actuals,
                Err(e) => {
                    errors.push(Error::Client {
                        action: format!("list resources of kind {}", gvk_string(&gvk)),
                        source: e,
                    });
                    return errors;
                }
            }
        };

        let expected_value = &expected.tree;
        for actual in &actuals {
            let actual_value = match to_value(actual) {
                Ok(value) => value,
                Err(e) => {
                    errors.push(e);
                    continue;
                }
            };
            let mismatch = match is_subset(expected_value, &actual_value) {
                Ok(()) => return Vec::new(),
                Err(mismatch) => mismatch,
            };
            let diff = pretty_diff(
                expected_value,
                &actual_value,
                &expected.resource_id(),
                &actual.resource_id(),
            );
            errors.push(match diff {
                Ok(diff) => Error::Diff { diff },
                Err(source) => Error::DiffRender {
                    resource: actual.resource_id(),
                    source,
                },
            });
            errors.push(Error::Mismatch {
                resource: expected.resource_id(),
                source: mismatch,
            });
        }
        errors
    }

    /// Checks that no object matching `expected` exists. Objects that do not match, or do not exist,
    /// are fine.
    pub async fn check_resource_absent(
        &self,
        expected: &Document,
        namespace: &str,
    ) -> Result<()> {
        let mut expected = expected.clone();
        let (name, namespace) = self.resolve(&mut expected, namespace).await?;
        let gvk = expected.gvk();

        let actuals = if !name.is_empty() {
            let actual = self
                .client
                .get(&gvk, &namespace, &name)
                .await
                .allow_not_found(|_| ())
                .context(error::ClientSnafu {
                    action: format!("get {}", expected.resource_id()),
                })?;
            match actual {
                Some(actual) => vec![actual],
                None => return Ok(()),
            }
        } else {
            self.client
                .list(&gvk, &namespace, None)
                .await
                .context(error::ClientSnafu {
                    action: format!("list resources of kind {}", gvk_string(&gvk)),
                })?
        };

        for actual in &actuals {
            if is_subset(&expected.tree, &to_value(actual)?).is_ok() {
                return error::ForbiddenMatchSnafu {
                    gvk: gvk_string(&gvk),
                }
                .fail();
            }
        }
        Ok(())
    }

    /// Checks every assert and every error object of the step and returns all of the failures.
    pub async fn check(&self, namespace: &str) -> Vec<Error> {
        let mut errors = Vec::new();
        for expected in &self.asserts {
            errors.extend(self.check_resource(expected, namespace).await);
        }
        for expected in &self.errors {
            if let Err(e) = self.check_resource_absent(expected, namespace).await {
                errors.push(e);
            }
        }
        errors
    }
}

fn to_value(object: &DynamicObject) -> Result<Value> {
    serde_json::to_value(object).context(error::SerializeSnafu {
        what: object.resource_id(),
    })
}
