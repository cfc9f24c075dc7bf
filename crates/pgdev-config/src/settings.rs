//! `postgresql.conf` settings merging and rendering.
//!
//! # Design
//! - Computed defaults and user overrides are combined by one explicit,
//!   ordered merge: later layers win on key collision.
//! - Keys are kept in a `BTreeMap` so rendering is deterministic.

use std::collections::BTreeMap;
use std::fmt::{self, Display, Formatter};

use serde_json::Value;

use crate::error::{ConfigError, ConfigResult};
use crate::model::PostgresConfig;

/// A typed `postgresql.conf` value.
#[derive(Debug, Clone, PartialEq)]
pub enum SettingValue {
    /// Rendered as `true` or `false`.
    Bool(bool),
    /// Rendered literally.
    Integer(i64),
    /// Rendered literally.
    Float(f64),
    /// Rendered single-quoted with embedded quotes doubled.
    String(String),
}

impl SettingValue {
    /// Convert a JSON value, rejecting arrays, objects, and null.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidSettingType`] when the value is not a
    /// boolean, number, or string.
    pub fn from_json(key: &str, value: &Value) -> ConfigResult<Self> {
        let invalid = |kind| ConfigError::InvalidSettingType {
            key: key.to_string(),
            kind,
        };
        match value {
            Value::Bool(flag) => Ok(Self::Bool(*flag)),
            Value::Number(number) => number
                .as_i64()
                .map(Self::Integer)
                .or_else(|| number.as_f64().map(Self::Float))
                .ok_or_else(|| invalid("number")),
            Value::String(text) => Ok(Self::String(text.clone())),
            Value::Array(_) => Err(invalid("array")),
            Value::Object(_) => Err(invalid("object")),
            Value::Null => Err(invalid("null")),
        }
    }
}

impl Display for SettingValue {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(flag) => write!(formatter, "{flag}"),
            Self::Integer(number) => write!(formatter, "{number}"),
            Self::Float(number) => write!(formatter, "{number}"),
            Self::String(text) => write!(formatter, "'{}'", text.replace('\'', "''")),
        }
    }
}

impl From<bool> for SettingValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for SettingValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<u16> for SettingValue {
    fn from(value: u16) -> Self {
        Self::Integer(i64::from(value))
    }
}

impl From<f64> for SettingValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for SettingValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for SettingValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

/// Final key/value configuration for the server.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Settings(BTreeMap<String, SettingValue>);

impl Settings {
    /// Empty settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a value, returning the previous one.
    pub fn insert(
        &mut self,
        key: impl Into<String>,
        value: impl Into<SettingValue>,
    ) -> Option<SettingValue> {
        self.0.insert(key.into(), value.into())
    }

    /// Look up a value.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&SettingValue> {
        self.0.get(key)
    }

    /// Number of keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether no keys are set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate keys and values in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &SettingValue)> {
        self.0.iter()
    }

    /// Combine two layers; keys present in `overrides` replace `defaults`.
    #[must_use]
    pub fn merge(defaults: Self, overrides: Self) -> Self {
        let mut merged = defaults;
        merged.0.extend(overrides.0);
        merged
    }

    /// Convert raw JSON overrides into typed settings.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidSettingType`] for the first non-scalar value.
    pub fn from_json(raw: &BTreeMap<String, Value>) -> ConfigResult<Self> {
        raw.iter()
            .map(|(key, value)| Ok((key.clone(), SettingValue::from_json(key, value)?)))
            .collect::<ConfigResult<BTreeMap<_, _>>>()
            .map(Self)
    }

    /// Render as `postgresql.conf` text, one `key = value` line per setting.
    #[must_use]
    pub fn render(&self) -> String {
        self.0
            .iter()
            .map(|(key, value)| format!("{key} = {value}\n"))
            .collect()
    }
}

impl FromIterator<(String, SettingValue)> for Settings {
    fn from_iter<I: IntoIterator<Item = (String, SettingValue)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Settings the instance computes from its own options.
#[must_use]
pub fn computed_defaults(config: &PostgresConfig) -> Settings {
    let mut settings = Settings::new();
    settings.insert("listen_addresses", config.listen_addresses.as_str());
    settings.insert("port", config.port);
    settings.insert(
        "unix_socket_directories",
        config.socket_dir().display().to_string(),
    );
    settings.insert("hba_file", config.hba_file().display().to_string());
    settings
}

/// Computed defaults overlaid with the user's `settings`.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidSettingType`] when an override is not scalar.
pub fn effective_settings(config: &PostgresConfig) -> ConfigResult<Settings> {
    let overrides = Settings::from_json(&config.settings)?;
    Ok(Settings::merge(computed_defaults(config), overrides))
}
