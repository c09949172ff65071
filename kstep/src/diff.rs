use crate::subset::prune;
use serde_json::Value;
use similar::TextDiff;

/// Lines of unchanged context printed around each change.
const CONTEXT: usize = 3;

/// Renders `expected` and `actual` as YAML and returns a unified diff between them. `actual` is
/// first pruned to the keys present in `expected` so that the diff only shows what the expectation
/// is about.
pub(crate) fn pretty_diff(
    expected: &Value,
    actual: &Value,
    expected_id: &str,
    actual_id: &str,
) -> Result<String, serde_yaml::Error> {
    let expected_yaml = serde_yaml::to_string(expected)?;
    let actual_yaml = serde_yaml::to_string(&prune(actual, expected))?;
    Ok(unified_diff(
        expected_id,
        actual_id,
        &expected_yaml,
        &actual_yaml,
    ))
}

/// A line based diff in the unified format with `CONTEXT` lines of context. Returns an empty
/// string if `a` and `b` are equal.
pub(crate) fn unified_diff(from: &str, to: &str, a: &str, b: &str) -> String {
    TextDiff::from_lines(a, b)
        .unified_diff()
        .context_radius(CONTEXT)
        .header(from, to)
        .to_string()
}
