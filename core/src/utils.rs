//! Utility functions and types.

use std::fmt::{Debug, Display};

/// Redacts secrets such as account keys, client secrets and access tokens
/// before they reach a log line or a `Debug` dump.
///
/// - Empty input prints `EMPTY`.
/// - Input shorter than 12 characters is fully hidden as `***`.
/// - Longer input keeps its first and last three characters so two different
///   secrets can still be told apart.
pub struct Redact<'a>(&'a str);

impl<'a> From<&'a str> for Redact<'a> {
    fn from(value: &'a str) -> Self {
        Redact(value)
    }
}

impl<'a> From<&'a String> for Redact<'a> {
    fn from(value: &'a String) -> Self {
        Redact(value.as_str())
    }
}

impl<'a> From<&'a Option<String>> for Redact<'a> {
    fn from(value: &'a Option<String>) -> Self {
        Redact(value.as_deref().unwrap_or_default())
    }
}

impl Display for Redact<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let count = self.0.chars().count();
        if count == 0 {
            return f.write_str("EMPTY");
        }
        if count < 12 {
            return f.write_str("***");
        }

        let head: String = self.0.chars().take(3).collect();
        let tail: String = self.0.chars().skip(count - 3).collect();
        write!(f, "{head}***{tail}")
    }
}

impl Debug for Redact<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        Display::fmt(self, f)
    }
}
