//! Cache key construction

use std::fmt;

/// Deterministic cache key.
///
/// Composite keys are always ordered parent first (`app:promptConfig`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);

impl CacheKey {
    const SEPARATOR: char = ':';

    /// Application-level key, e.g. the default prompt config lookup.
    pub fn application(application_id: &str) -> Self {
        Self(application_id.to_string())
    }

    /// Key of one prompt config within an application.
    pub fn prompt_config(application_id: &str, prompt_config_id: &str) -> Self {
        Self(format!(
            "{application_id}{}{prompt_config_id}",
            Self::SEPARATOR
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CacheKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<CacheKey> for String {
    fn from(key: CacheKey) -> Self {
        key.0
    }
}
