/*!

A `Step` is one unit of a test. It is loaded from the YAML files of a step directory and holds the
objects to apply, the objects that must eventually exist (asserts) and the objects that must never
exist (errors). Running a step applies its objects and then polls the cluster until every assert is
satisfied, an error object is found, or the step times out.

!*/

mod check;
mod load;
mod sync;

use crate::clients::{Client, Discovery};
use crate::command;
use crate::error::Error;
use crate::logger::Logger;
use crate::object::Document;
use kstep_model::{TestAssert, TestStep};
use kube::core::DynamicObject;
use log::{debug, warn};
use std::fmt::{Display, Formatter};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Pause between two passes over the asserts of a step.
const CHECK_INTERVAL: Duration = Duration::from_secs(1);

const BACKGROUND_WARNING: &str =
    "background commands are not allowed for steps and will be run in foreground";

/// One step of a test. Construct it with [`Step::new`], call [`Step::load_yaml`] for each file of
/// the step directory, then call [`Step::run`] once.
pub struct Step<C, D> {
    /// The name of the step. Taken from the first file of objects to apply, unless a `TestStep`
    /// names the step.
    pub name: String,
    /// The position of the step in its test.
    pub index: usize,
    /// The directory the step was loaded from. Commands run here and `TestStep` paths are relative
    /// to it.
    pub dir: PathBuf,
    pub step: Option<TestStep>,
    pub assert: Option<TestAssert>,
    pub asserts: Vec<Document>,
    pub apply: Vec<DynamicObject>,
    pub errors: Vec<Document>,
    /// Seconds the step may take to apply its objects and to satisfy its asserts.
    pub timeout: u64,
    client: Arc<C>,
    discovery: Arc<D>,
    logger: Arc<dyn Logger>,
}

impl<C, D> Step<C, D> {
    pub fn new<P>(
        index: usize,
        dir: P,
        timeout: u64,
        client: Arc<C>,
        discovery: Arc<D>,
        logger: Arc<dyn Logger>,
    ) -> Self
    where
        P: Into<PathBuf>,
    {
        Self {
            name: String::new(),
            index,
            dir: dir.into(),
            step: None,
            assert: None,
            asserts: Vec::new(),
            apply: Vec::new(),
            errors: Vec::new(),
            timeout,
            client,
            discovery,
            logger,
        }
    }

    /// The number of seconds the asserts of the step may take. A `TestAssert` with a nonzero
    /// timeout overrides the timeout of the step.
    pub fn get_timeout(&self) -> u64 {
        match &self.assert {
            Some(assert) if assert.timeout != 0 => assert.timeout,
            _ => self.timeout,
        }
    }
}

impl<C, D> Step<C, D>
where
    C: Client,
    D: Discovery,
{
    /// Runs the step in `namespace` and returns everything that went wrong. An empty list means the
    /// step passed.
    ///
    /// Objects listed for deletion are deleted first, then the fixture commands run and the objects
    /// are applied. A failure in any of these phases ends the step. Otherwise the asserts are checked
    /// once per second until they all pass or the timeout is reached. If the step fails, the
    /// collectors of its `TestAssert` are run to gather diagnostics.
    pub async fn run(&mut self, namespace: &str) -> Vec<Error> {
        self.logger.log(&format!("starting test step {}", self));

        if let Err(e) = self.delete_existing(namespace).await {
            return vec![e];
        }

        if let Err(e) = self.run_fixtures(namespace).await {
            return vec![e];
        }

        let errors = self.create(namespace).await;
        if !errors.is_empty() {
            return errors;
        }

        let errors = self.poll_check(namespace).await;
        if errors.is_empty() {
            self.logger.log(&format!("test step completed {}", self));
            return errors;
        }

        self.logger.log(&format!("test step failed {}", self));
        self.collect(namespace).await;
        errors
    }

    async fn run_fixtures(&mut self, namespace: &str) -> crate::error::Result<()> {
        let step = match self.step.as_mut() {
            Some(step) => step,
            None => return Ok(()),
        };
        for command in step.commands.iter_mut().filter(|command| command.background) {
            warn!("{}: {}", command.text(), BACKGROUND_WARNING);
            self.logger.log(BACKGROUND_WARNING);
            command.background = false;
        }
        command::run_commands(
            self.logger.as_ref(),
            namespace,
            &step.all_commands(),
            &self.dir,
            self.timeout,
        )
        .await
    }

    /// Checks the asserts `max(get_timeout(), 1)` times, one second apart, stopping at the first
    /// pass without errors.
    async fn poll_check(&self, namespace: &str) -> Vec<Error> {
        let passes = self.get_timeout().max(1);
        let mut errors = Vec::new();
        for pass in 1..=passes {
            errors = self.check(namespace).await;
            if errors.is_empty() {
                break;
            }
            debug!(
                "step {} check pass {}/{} found {} errors",
                self,
                pass,
                passes,
                errors.len()
            );
            if pass < passes {
                tokio::time::sleep(CHECK_INTERVAL).await;
            }
        }
        errors
    }

    /// Runs the collectors of the step's `TestAssert`. Collector failures are logged and otherwise
    /// ignored.
    async fn collect(&self, namespace: &str) {
        let collectors = match &self.assert {
            Some(assert) if !assert.collectors.is_empty() => &assert.collectors,
            _ => return,
        };
        for collector in collectors {
            self.logger.log(&format!("collecting log output for {}", collector));
            let collector_command = match collector.command() {
                Some(collector_command) => collector_command,
                None => {
                    self.logger.log("skipping invalid assertion collector");
                    continue;
                }
            };
            if let Err(e) = command::run_command(
                self.logger.as_ref(),
                namespace,
                &collector_command,
                &self.dir,
                self.timeout,
            )
            .await
            {
                self.logger.log(&format!("post assert collector failure: {}", e));
            }
        }
        self.logger.flush();
    }
}

impl<C, D> Display for Step<C, D> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.index, self.name)
    }
}
