/// Helper macro to avoid retyping the base domain-like name of the step configuration API group.
/// When given no parameters, this returns the group name. When given a string literal parameter it
/// adds `/parameter` to the end.
macro_rules! kuttl {
    () => {
        "kuttl.dev"
    };
    ($s:literal) => {
        concat!(kuttl!(), "/", $s)
    };
}

// API identifiers
pub const API_GROUP: &str = kuttl!();
pub const API_VERSION: &str = kuttl!("v1beta1");

// Kinds of the configuration documents found among a step's objects
pub const TEST_STEP_KIND: &str = "TestStep";
pub const TEST_ASSERT_KIND: &str = "TestAssert";

// Environment variables
pub const ENV_NAMESPACE: &str = "NAMESPACE";

// Collector types
pub const COLLECTOR_POD: &str = "pod";
pub const COLLECTOR_COMMAND: &str = "command";
pub const COLLECTOR_EVENTS: &str = "events";

/// Number of log lines kept by a pod collector that selects pods by label and sets no `tail`.
pub const DEFAULT_SELECTOR_TAIL: i64 = 10;
