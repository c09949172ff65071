/*!

`kstep` runs the steps of declarative Kubernetes tests. A step is a directory of YAML files: objects
to apply, objects that must eventually be observed in the cluster (`assert.yaml`) and objects that
must never be observed (`errors.yaml`). Running a [`Step`] applies its objects and then polls the
cluster until the asserts hold, an error object shows up, or the step times out.

The cluster is accessed through the [`Client`] and [`Discovery`] traits. [`KubeClient`] implements
both for a real cluster; tests may substitute an in-memory store.

```no_run
# use kstep::{KubeClient, Step, StepLogger};
# use std::path::Path;
# use std::sync::Arc;
# async fn doc() -> Result<(), Box<dyn std::error::Error>> {
let client = Arc::new(KubeClient::new().await?);
let logger = Arc::new(StepLogger::new("my-test"));
let mut step = Step::new(0, "tests/my-test", 30, client.clone(), client, logger);
step.load_yaml(Path::new("tests/my-test/00-install.yaml")).await?;
step.load_yaml(Path::new("tests/my-test/00-assert.yaml")).await?;
for error in step.run("kstep-test").await {
    eprintln!("{}", error);
}
# Ok(())
# }
```

!*/

#![deny(
    clippy::expect_used,
    clippy::get_unwrap,
    clippy::panic,
    clippy::panic_in_result_fn,
    clippy::panicking_unwrap,
    clippy::unwrap_in_result,
    clippy::unwrap_used
)]

pub mod classify;
pub mod clients;
pub mod command;
mod diff;
pub mod env;
mod error;
pub mod loader;
mod logger;
mod object;
mod step;
pub mod subset;

pub use clients::{Client, Discovery, KubeClient};
pub use error::{Error, Result};
pub use logger::{Logger, StepLogger};
pub use object::{gvk_string, new_resource, Document, ObjectIdentity};
pub use step::Step;
