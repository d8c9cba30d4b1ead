//! Factory configuration.
//!
//! Loaded from TOML. Every section and field is optional; missing values take
//! the defaults below.
//!
//! ```toml
//! [keys]
//! strip_prefix = "#$"
//! trim = true
//!
//! [vocabulary]
//! empty_list = "TheEmptyList"
//! list_fn = "TheList"
//!
//! [log]
//! filter = "kbfacade=debug"
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Top-level configuration for a [`Factory`](crate::Factory).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FactoryConfig {
    /// Request-key normalisation.
    pub keys: KeyConfig,
    /// Well-known knowledge-base names.
    pub vocabulary: Vocabulary,
    /// Logging.
    pub log: LogConfig,
}

impl FactoryConfig {
    /// Parses a configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] if the text is not valid for this schema.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Reads and parses a configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read and
    /// [`ConfigError::Parse`] if it is not valid TOML for this schema.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }
}

/// How request keys (names and ids) are normalised before lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyConfig {
    /// Prefix stripped from request keys (constants are often written `#$Dog`).
    pub strip_prefix: Option<String>,
    /// Whether surrounding whitespace is trimmed.
    pub trim: bool,
}

impl Default for KeyConfig {
    fn default() -> Self {
        Self {
            strip_prefix: Some("#$".to_owned()),
            trim: true,
        }
    }
}

impl KeyConfig {
    /// Normalises a request key.
    #[must_use]
    pub fn normalize(&self, key: &str) -> String {
        let mut key = if self.trim { key.trim() } else { key };
        if let Some(prefix) = self.strip_prefix.as_deref().filter(|p| !p.is_empty()) {
            key = key.strip_prefix(prefix).unwrap_or(key);
        }
        key.to_owned()
    }
}

/// Names of well-known knowledge-base constants the facade relies on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Vocabulary {
    /// Sentinel constant denoting the empty list.
    pub empty_list: String,
    /// Sentinel constant denoting the empty set.
    pub empty_set: String,
    /// Function building a list term.
    pub list_fn: String,
    /// Function building a set term.
    pub set_fn: String,
    /// Year-denoting function, `(YearFn 2024)`.
    pub year_fn: String,
    /// Month-denoting function, `(MonthFn March <year>)`.
    pub month_fn: String,
    /// Day-denoting function, `(DayFn 3 <month>)`.
    pub day_fn: String,
    /// Hour-denoting function, `(HourFn 13 <day>)`.
    pub hour_fn: String,
    /// Minute-denoting function, `(MinuteFn 5 <hour>)`.
    pub minute_fn: String,
    /// Second-denoting function, `(SecondFn 59 <minute>)`.
    pub second_fn: String,
    /// Names of the twelve month constants, January first.
    pub months: Vec<String>,
    /// Collection marking relations of variable arity.
    pub variable_arity_marker: String,
    /// Collection marking context-dependent (indexical) terms.
    pub indexical_marker: String,
}

impl Default for Vocabulary {
    fn default() -> Self {
        Self {
            empty_list: "TheEmptyList".to_owned(),
            empty_set: "TheEmptySet".to_owned(),
            list_fn: "TheList".to_owned(),
            set_fn: "TheSet".to_owned(),
            year_fn: "YearFn".to_owned(),
            month_fn: "MonthFn".to_owned(),
            day_fn: "DayFn".to_owned(),
            hour_fn: "HourFn".to_owned(),
            minute_fn: "MinuteFn".to_owned(),
            second_fn: "SecondFn".to_owned(),
            months: [
                "January",
                "February",
                "March",
                "April",
                "May",
                "June",
                "July",
                "August",
                "September",
                "October",
                "November",
                "December",
            ]
            .into_iter()
            .map(str::to_owned)
            .collect(),
            variable_arity_marker: "VariableArityRelation".to_owned(),
            indexical_marker: "IndexicalConcept".to_owned(),
        }
    }
}

/// Logging configuration consumed by binaries when `RUST_LOG` is unset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// An `EnvFilter` directive string.
    pub filter: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_owned(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_yields_defaults() {
        let config = FactoryConfig::from_toml_str("").unwrap();
        assert_eq!(config, FactoryConfig::default());
        assert_eq!(config.vocabulary.months.len(), 12);
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config = FactoryConfig::from_toml_str(
            r#"
            [vocabulary]
            list_fn = "ListFn"

            [log]
            filter = "kbfacade=debug"
            "#,
        )
        .unwrap();
        assert_eq!(config.vocabulary.list_fn, "ListFn");
        assert_eq!(config.vocabulary.empty_list, "TheEmptyList");
        assert_eq!(config.log.filter, "kbfacade=debug");
        assert!(config.keys.trim);
    }

    #[test]
    fn invalid_toml_is_a_parse_error() {
        let err = FactoryConfig::from_toml_str("[keys\ntrim = ").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = FactoryConfig::load(Path::new("/nonexistent/kbfacade.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn keys_are_trimmed_and_unprefixed() {
        let keys = KeyConfig::default();
        assert_eq!(keys.normalize("  #$Dog "), "Dog");
        assert_eq!(keys.normalize("Dog"), "Dog");
        let raw = KeyConfig {
            strip_prefix: None,
            trim: false,
        };
        assert_eq!(raw.normalize(" #$Dog"), " #$Dog");
    }
}
