use crate::error::CoreError;
use crate::rules::validation::is_valid_email_syntax;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lowercases and trims an address. Never fails; an all-whitespace input
/// normalizes to the empty string.
pub fn normalize_email(value: &str) -> String {
    value.trim().to_lowercase()
}

/// Returns everything after the last `@`.
pub fn domain_of(email: &str) -> Result<&str, CoreError> {
    email
        .rsplit_once('@')
        .map(|(_, domain)| domain)
        .ok_or_else(|| CoreError::MalformedAddress(email.to_string()))
}

/// A normalized address that passed syntax validation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EmailAddress(String);

impl EmailAddress {
    pub fn parse(raw: &str) -> Result<Self, CoreError> {
        let normalized = normalize_email(raw);
        if !is_valid_email_syntax(&normalized) {
            return Err(CoreError::InvalidFormat(normalized));
        }
        Ok(Self(normalized))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn domain(&self) -> &str {
        // parse() guarantees an '@'
        self.0.rsplit_once('@').map(|(_, d)| d).unwrap_or_default()
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for EmailAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for EmailAddress {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
