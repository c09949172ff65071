use regex::Regex;

/// Base names of step files: an optional numeric prefix, the name, and an optional `.yaml` suffix.
const FILE_NAME_PATTERN_REGEX: &str = r"^(\d+-)?([^.]+)(.yaml)?$";

/// Files with this name hold objects that must eventually be found in the cluster.
pub const ASSERT_FILE_NAME: &str = "assert";

/// Files with this name hold objects that must never be found in the cluster.
pub const ERRORS_FILE_NAME: &str = "errors";

lazy_static::lazy_static! {
    static ref FILE_NAME_REGEX: Regex = {
        #[allow(clippy::unwrap_used)]
        Regex::new(FILE_NAME_PATTERN_REGEX).unwrap()
    };
}

/// The list of a step that the objects of a file are added to.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum Bucket {
    /// Objects to assert are present.
    Assert,
    /// Objects to assert are absent.
    Errors,
    /// Objects to apply. `name` is the step name this file suggests.
    Apply { name: String },
}

/// Decides which list of a step the objects of the file named `file_name` belong to, e.g.
/// `00-assert.yaml` holds assertions, `01-errors.yaml` holds forbidden objects and
/// `00-install.yaml` holds objects to apply for a step that would be named `install`.
///
/// A base name that does not follow the pattern, such as `install.v2.yaml`, is a file of objects to
/// apply that suggests its whole base name as the step name.
pub fn classify(file_name: &str) -> Bucket {
    let name = FILE_NAME_REGEX
        .captures(file_name)
        .and_then(|captures| captures.get(2))
        .map(|name| name.as_str())
        .unwrap_or(file_name);
    match name {
        ASSERT_FILE_NAME => Bucket::Assert,
        ERRORS_FILE_NAME => Bucket::Errors,
        _ => Bucket::Apply {
            name: name.to_string(),
        },
    }
}
