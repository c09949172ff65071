use log::info;

/// Receives the progress messages of a step: step starts and outcomes, applied objects, command
/// output and diagnostics. Implement this to capture the output of a step, e.g. to attach it to a
/// test report.
pub trait Logger: Send + Sync {
    fn log(&self, message: &str);

    /// Emit any buffered messages.
    fn flush(&self);
}

/// The default [`Logger`]. Messages are prefixed with the name of the test the step belongs to and
/// written to the `log` facade at the `info` level.
#[derive(Debug, Clone)]
pub struct StepLogger {
    test_name: String,
}

impl StepLogger {
    pub fn new<S>(test_name: S) -> Self
    where
        S: Into<String>,
    {
        Self {
            test_name: test_name.into(),
        }
    }
}

impl Logger for StepLogger {
    fn log(&self, message: &str) {
        info!("{} | {}", self.test_name, message);
    }

    fn flush(&self) {
        log::logger().flush();
    }
}
