//! UI language preference, persisted independently of the session.

#[cfg(test)]
#[path = "language_test.rs"]
mod language_test;

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::storage::{KeyValueStore, StorageError, keys};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Language {
    #[default]
    English,
    Swahili,
}

impl Language {
    #[must_use]
    pub fn code(self) -> &'static str {
        match self {
            Self::English => "en",
            Self::Swahili => "sw",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unsupported language {0:?} (expected \"en\" or \"sw\")")]
pub struct UnknownLanguage(pub String);

impl FromStr for Language {
    type Err = UnknownLanguage;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "en" => Ok(Self::English),
            "sw" => Ok(Self::Swahili),
            other => Err(UnknownLanguage(other.to_owned())),
        }
    }
}

/// Reads and writes the `elimubuddy-language` key.
#[derive(Clone)]
pub struct LanguagePreference {
    store: Arc<dyn KeyValueStore>,
}

impl LanguagePreference {
    #[must_use]
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Stored language, or English when nothing valid is stored.
    #[must_use]
    pub fn load(&self) -> Language {
        match self.store.get(keys::LANGUAGE) {
            Ok(Some(raw)) => raw.parse().unwrap_or_else(|e| {
                tracing::warn!(error = %e, "ignoring stored language");
                Language::default()
            }),
            Ok(None) => Language::default(),
            Err(e) => {
                tracing::warn!(error = %e, "language preference unreadable");
                Language::default()
            }
        }
    }

    /// Persist `language`.
    ///
    /// # Errors
    ///
    /// Returns the storage error if the write fails.
    pub fn store(&self, language: Language) -> Result<(), StorageError> {
        self.store.set(keys::LANGUAGE, language.code())
    }
}
