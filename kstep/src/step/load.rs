use super::Step;
use crate::classify::{classify, Bucket};
use crate::error::{self, Result};
use crate::object::{gvk_string, Document, ObjectIdentity};
use crate::{env, loader};
use kstep_model::constants::{API_VERSION, TEST_ASSERT_KIND, TEST_STEP_KIND};
use log::debug;
use serde::de::DeserializeOwned;
use snafu::{ensure, ResultExt};
use std::path::Path;

impl<C, D> Step<C, D> {
    /// Loads the objects of one file of the step directory. The name of the file decides what the
    /// objects are used for:
    /// - `assert.yaml` holds objects that must exist and may hold a `TestAssert`.
    /// - `errors.yaml` holds objects that must not exist.
    /// - Any other file holds objects to apply and may hold a `TestStep`. The first such file names
    ///   the step.
    ///
    /// File names may carry a numeric prefix such as `00-`. When this file holds the `TestStep`, the
    /// files, directories and URLs it refers to are loaded too.
    pub async fn load_yaml(&mut self, file: &Path) -> Result<()> {
        let documents = loader::load_file(file)
            .await
            .context(error::LoadSnafu { path: file })?;
        let origin = file.display().to_string();
        let file_name = file
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();

        let mut found_step = false;
        match classify(&file_name) {
            Bucket::Assert => {
                for document in documents {
                    if document.kind() == TEST_ASSERT_KIND {
                        self.assert = Some(decode_config(&document, TEST_ASSERT_KIND, &origin)?);
                    } else {
                        self.asserts.push(document);
                    }
                }
            }
            Bucket::Errors => self.errors.extend(documents),
            Bucket::Apply { name } => {
                if self.name.is_empty() {
                    self.name = name;
                }
                for document in documents {
                    if document.kind() != TEST_STEP_KIND {
                        self.apply.push(document.object);
                        continue;
                    }
                    ensure!(
                        self.step.is_none(),
                        error::DuplicateStepConfigSnafu { step: &self.name }
                    );
                    let mut step: kstep_model::TestStep =
                        decode_config(&document, TEST_STEP_KIND, &origin)?;
                    step.index = self.index;
                    if let Some(name) = step.name() {
                        self.name = name.to_string();
                    }
                    self.step = Some(step);
                    found_step = true;
                }
            }
        }

        if found_step {
            self.load_step_paths().await?;
        }
        Ok(())
    }

    /// Loads the objects that the `TestStep` refers to by path.
    async fn load_step_paths(&mut self) -> Result<()> {
        let (apply, assert, error) = match &self.step {
            Some(step) => (step.apply.clone(), step.assert.clone(), step.error.clone()),
            None => return Ok(()),
        };
        for path in apply {
            let documents = self.objects_from_step_path(&path, "apply").await?;
            self.apply
                .extend(documents.into_iter().map(|document| document.object));
        }
        for path in assert {
            let objects = self.objects_from_step_path(&path, "assert").await?;
            self.asserts.extend(objects);
        }
        for path in error {
            let objects = self.objects_from_step_path(&path, "error").await?;
            self.errors.extend(objects);
        }
        Ok(())
    }

    async fn objects_from_step_path(&self, path: &str, what: &str) -> Result<Vec<Document>> {
        let path = env::expand(path);
        debug!("step {} loading {} path '{}'", self, what, path);
        loader::objects_from_path(&path, &self.dir)
            .await
            .context(error::StepPathSnafu {
                step: &self.name,
                what,
                path: &path,
            })
    }
}

/// Decodes a `TestStep` or `TestAssert` document. Documents of the same kind with another
/// `apiVersion` are not configuration and cannot be used as one.
fn decode_config<T>(document: &Document, kind: &str, origin: &str) -> Result<T>
where
    T: DeserializeOwned,
{
    ensure!(
        document.api_version() == API_VERSION,
        error::TypeMismatchSnafu {
            kind,
            path: origin,
            found: gvk_string(&document.gvk()),
        }
    );
    serde_json::from_value(document.tree.clone())
        .context(error::ConfigDecodeSnafu { kind, path: origin })
}
