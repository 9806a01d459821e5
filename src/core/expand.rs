//! Environment variable expansion for commands and image fields

use serde_yaml::Value;

/// Expand `$VAR` and `${VAR}` tokens using the current process environment.
///
/// Unset variables expand to an empty string.
pub fn expand_vars(input: &str) -> String {
    expand_with(input, |name| std::env::var(name).ok())
}

/// Expand `$VAR` and `${VAR}` tokens using a custom lookup.
///
/// Variables the lookup does not know expand to an empty string, matching
/// what a shell does with an unset variable.
pub fn expand_with<F>(input: &str, lookup: F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    shellexpand::env_with_context_no_errors(input, |name: &str| {
        Some(lookup(name).unwrap_or_default())
    })
    .into_owned()
}

/// Expand a document value if it is a string.
///
/// Absent or non-string values stay unset.
pub fn expand_value<F>(value: Option<&Value>, lookup: F) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    value.and_then(Value::as_str).map(|s| expand_with(s, lookup))
}
