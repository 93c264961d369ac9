//! Configuration loading traits and types.
//!
//! Two access styles are provided:
//!
//! - [`ConfigLoader`]: deserialize a whole TOML file into a serde struct
//!   (robot descriptions, trial controller parameter files).
//! - [`ConfigSource`]: parameter-server style key/value lookup by
//!   slash-separated key path, consulted once during controller `init`.
//!
//! # Usage
//!
//! ```rust
//! use gps_common::config::{ConfigSource, TomlConfigSource};
//!
//! let source = TomlConfigSource::from_toml_str(r#"
//! [GPSSuperchickPlugin]
//! base_group = "base_link"
//! "#).unwrap();
//! assert_eq!(
//!     source.get_str("/GPSSuperchickPlugin/base_group").unwrap().as_deref(),
//!     Some("base_link"),
//! );
//! ```

use std::path::Path;
use thiserror::Error;

/// Error type for configuration loading operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// Configuration file not found at specified path.
    #[error("Configuration file not found")]
    FileNotFound,

    /// TOML parsing failed.
    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    /// Semantic validation failed.
    #[error("Configuration validation failed: {0}")]
    ValidationError(String),

    /// A key exists but holds a value of the wrong type.
    #[error("Configuration key '{key}' has wrong type: expected {expected}")]
    WrongType {
        /// Full key path.
        key: String,
        /// Expected value type.
        expected: &'static str,
    },
}

/// Trait for loading configuration from TOML files.
///
/// Default implementation works with any type implementing
/// `serde::de::DeserializeOwned`.
///
/// # Contract
///
/// - Returns `ConfigError::FileNotFound` if the file does not exist
/// - Returns `ConfigError::ParseError` if TOML syntax is invalid
pub trait ConfigLoader: Sized + serde::de::DeserializeOwned {
    /// Load configuration from a TOML file.
    fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::FileNotFound
            } else {
                ConfigError::ParseError(e.to_string())
            }
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }
}

// Blanket implementation for all types that implement DeserializeOwned.
impl<T: serde::de::DeserializeOwned> ConfigLoader for T {}

// ─── Key/Value Configuration Source ─────────────────────────────────

/// A scalar configuration value returned by a [`ConfigSource`].
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigValue {
    Str(String),
    Float(f64),
    Int(i64),
    Bool(bool),
}

/// Parameter-server style key/value lookup.
///
/// Keys are slash-separated paths (`/namespace/group/name`). Only
/// [`ConfigSource::get`] is required; the typed getters distinguish a
/// missing key (`Ok(None)`) from a key of the wrong type (`Err`).
///
/// Implementations are consulted only during initialization and may
/// allocate freely.
pub trait ConfigSource {
    /// Look up a raw scalar value.
    fn get(&self, key: &str) -> Option<ConfigValue>;

    /// Look up a string value.
    fn get_str(&self, key: &str) -> Result<Option<String>, ConfigError> {
        match self.get(key) {
            None => Ok(None),
            Some(ConfigValue::Str(s)) => Ok(Some(s)),
            Some(_) => Err(wrong_type(key, "string")),
        }
    }

    /// Look up a floating-point value. Integers are widened.
    fn get_f64(&self, key: &str) -> Result<Option<f64>, ConfigError> {
        match self.get(key) {
            None => Ok(None),
            Some(ConfigValue::Float(v)) => Ok(Some(v)),
            Some(ConfigValue::Int(v)) => Ok(Some(v as f64)),
            Some(_) => Err(wrong_type(key, "number")),
        }
    }

    /// Look up a non-negative integer value.
    fn get_u64(&self, key: &str) -> Result<Option<u64>, ConfigError> {
        match self.get(key) {
            None => Ok(None),
            Some(ConfigValue::Int(v)) => u64::try_from(v)
                .map(Some)
                .map_err(|_| wrong_type(key, "non-negative integer")),
            Some(_) => Err(wrong_type(key, "non-negative integer")),
        }
    }

    /// Look up a boolean value.
    fn get_bool(&self, key: &str) -> Result<Option<bool>, ConfigError> {
        match self.get(key) {
            None => Ok(None),
            Some(ConfigValue::Bool(v)) => Ok(Some(v)),
            Some(_) => Err(wrong_type(key, "boolean")),
        }
    }
}

fn wrong_type(key: &str, expected: &'static str) -> ConfigError {
    ConfigError::WrongType {
        key: key.to_string(),
        expected,
    }
}

/// Join a namespace and a relative key into a full key path.
///
/// ```rust
/// use gps_common::config::join_key;
/// assert_eq!(join_key("/ns", "base_group"), "/ns/base_group");
/// assert_eq!(join_key("/ns/", "/a/b"), "/ns/a/b");
/// ```
pub fn join_key(namespace: &str, key: &str) -> String {
    format!(
        "{}/{}",
        namespace.trim_end_matches('/'),
        key.trim_start_matches('/')
    )
}

/// [`ConfigSource`] backed by a parsed TOML document.
///
/// Each path segment selects a nested table: `/a/b/c` reads `c` in
/// table `[a.b]`. Empty segments are ignored, so a leading slash is
/// optional.
#[derive(Debug, Clone, Default)]
pub struct TomlConfigSource {
    root: toml::Table,
}

impl TomlConfigSource {
    /// Wrap an already parsed TOML table.
    pub fn new(root: toml::Table) -> Self {
        Self { root }
    }

    /// Parse a TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let root: toml::Table =
            toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        Ok(Self { root })
    }

    /// Read and parse a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let root = toml::Table::load(path)?;
        Ok(Self { root })
    }

    /// Resolve a key path to the raw TOML value.
    pub fn lookup(&self, key: &str) -> Option<&toml::Value> {
        let mut segments = key.split('/').filter(|s| !s.is_empty()).peekable();
        let mut table = &self.root;
        while let Some(segment) = segments.next() {
            let value = table.get(segment)?;
            if segments.peek().is_none() {
                return Some(value);
            }
            table = value.as_table()?;
        }
        None
    }
}

impl ConfigSource for TomlConfigSource {
    fn get(&self, key: &str) -> Option<ConfigValue> {
        match self.lookup(key)? {
            toml::Value::String(s) => Some(ConfigValue::Str(s.clone())),
            toml::Value::Float(v) => Some(ConfigValue::Float(*v)),
            toml::Value::Integer(v) => Some(ConfigValue::Int(*v)),
            toml::Value::Boolean(v) => Some(ConfigValue::Bool(*v)),
            _ => None,
        }
    }
}
