//! Validation run on every configuration before any side effect.

use std::collections::HashSet;

use crate::error::{ConfigError, ConfigResult};
use crate::hba::HbaRule;
use crate::model::{DatabaseSpec, PostgresConfig, port_override};
use crate::settings::Settings;

impl PostgresConfig {
    /// Check the configuration shape.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] found: invalid names, ports, setting
    /// types, duplicate databases, malformed rules, or self-referencing
    /// dependencies.
    pub fn validate(&self) -> ConfigResult<()> {
        validate_name(&self.name)?;
        if self.port == 0 {
            return Err(ConfigError::invalid(
                "port",
                "must be between 1 and 65535",
                Some(self.port.to_string()),
            ));
        }
        if self.superuser.as_deref().is_some_and(str::is_empty) {
            return Err(ConfigError::invalid("superuser", "must not be empty", None));
        }
        if let Some(extension) = self.extensions.iter().find(|ext| ext.trim().is_empty()) {
            return Err(ConfigError::invalid(
                "extensions",
                "extension names must not be empty",
                Some(extension.clone()),
            ));
        }
        validate_databases(&self.initial_databases)?;
        Settings::from_json(&self.settings)?;
        if let Some(port) = self.settings.get("port")
            && port_override(port).is_none()
        {
            return Err(ConfigError::invalid(
                "settings.port",
                "must be an integer between 1 and 65535",
                Some(port.to_string()),
            ));
        }
        for rule in &self.hba_conf {
            validate_rule(rule)?;
        }
        for dependency in self.depends_on.keys() {
            if *dependency == self.name || *dependency == self.init_process_name() {
                return Err(ConfigError::invalid(
                    "depends_on",
                    "must not reference the instance's own processes",
                    Some(dependency.clone()),
                ));
            }
        }
        if self.probe.period_seconds == 0
            || self.probe.timeout_seconds == 0
            || self.probe.success_threshold == 0
            || self.probe.failure_threshold == 0
        {
            return Err(ConfigError::invalid(
                "probe",
                "period, timeout, and thresholds must be positive",
                None,
            ));
        }
        if self.startup.max_attempts == 0 {
            return Err(ConfigError::invalid(
                "startup.max_attempts",
                "must be positive",
                Some("0".into()),
            ));
        }
        Ok(())
    }
}

/// Reject empty or repeated database names.
///
/// # Errors
///
/// Returns [`ConfigError::DuplicateDatabaseName`] for the first repeated name,
/// or [`ConfigError::InvalidField`] for an empty one.
pub fn validate_databases(databases: &[DatabaseSpec]) -> ConfigResult<()> {
    let mut seen = HashSet::new();
    for database in databases {
        if database.name.is_empty() {
            return Err(ConfigError::invalid(
                "initial_databases.name",
                "must not be empty",
                None,
            ));
        }
        if !seen.insert(database.name.as_str()) {
            return Err(ConfigError::DuplicateDatabaseName {
                name: database.name.clone(),
            });
        }
    }
    Ok(())
}

fn validate_name(name: &str) -> ConfigResult<()> {
    if name.is_empty() {
        return Err(ConfigError::invalid("name", "must not be empty", None));
    }
    if !name
        .chars()
        .all(|ch| ch.is_ascii_alphanumeric() || ch == '-' || ch == '_')
    {
        return Err(ConfigError::invalid(
            "name",
            "may only contain ASCII letters, digits, '-' and '_'",
            Some(name.to_string()),
        ));
    }
    Ok(())
}

fn validate_rule(rule: &HbaRule) -> ConfigResult<()> {
    let columns = [
        ("hba_conf.type", &rule.kind),
        ("hba_conf.database", &rule.database),
        ("hba_conf.user", &rule.user),
        ("hba_conf.method", &rule.method),
    ];
    for (field, value) in columns {
        if value.is_empty() {
            return Err(ConfigError::invalid(field, "must not be empty", None));
        }
    }
    if rule.kind != "local" && rule.address.is_empty() {
        return Err(ConfigError::invalid(
            "hba_conf.address",
            "required for non-local rules",
            Some(rule.kind.clone()),
        ));
    }
    let line = rule.render_line();
    if line.contains('\n') || line.split('\t').count() != 5 {
        return Err(ConfigError::invalid(
            "hba_conf",
            "fields must not contain tabs or newlines",
            Some(line),
        ));
    }
    Ok(())
}
