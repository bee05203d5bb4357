//! Small shared helpers.

mod retry;

use regex::Regex;

pub(crate) use retry::is_retriable_download_error;

/// Compiles a regex pattern that is a compile-time constant.
///
/// Panics with the pattern and its context if compilation fails; that is a
/// programming error, not a runtime condition.
pub(crate) fn compile_regex_unsafe(pattern: &str, context: &str) -> Regex {
    Regex::new(pattern).unwrap_or_else(|e| {
        panic!(
            "Failed to compile regex pattern '{}' in {}: {}. This is a programming error.",
            pattern, context, e
        )
    })
}
