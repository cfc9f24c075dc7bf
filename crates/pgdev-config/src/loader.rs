//! Loading instance configuration documents from disk.
//!
//! # Design
//! - Documents are JSON; unknown fields are errors rather than silently ignored.
//! - Relative paths are anchored at the document's directory so the
//!   supervisor's working directory does not matter.
//! - Validation runs as part of loading, before any caller side effect.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{ConfigError, ConfigResult};
use crate::model::PostgresConfig;

/// Read, anchor, and validate the configuration at `path`.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] when the file cannot be read,
/// [`ConfigError::Json`] when it does not match the model, or any validation
/// error.
pub fn load_config(path: &Path) -> ConfigResult<PostgresConfig> {
    let absolute = std::path::absolute(path)
        .map_err(|source| ConfigError::io("config.resolve", path, source))?;
    let text = fs::read_to_string(&absolute)
        .map_err(|source| ConfigError::io("config.read", &absolute, source))?;
    let base = absolute
        .parent()
        .map_or_else(|| PathBuf::from("/"), Path::to_path_buf);
    let config = parse_config(&text, &absolute)?.anchored(&base);
    config.validate()?;
    debug!(
        instance = %config.name,
        data_dir = %config.data_dir().display(),
        "loaded instance configuration"
    );
    Ok(config)
}

/// Parse a configuration document without anchoring or validating it.
///
/// # Errors
///
/// Returns [`ConfigError::Json`] when `text` does not match the model.
pub fn parse_config(text: &str, origin: &Path) -> ConfigResult<PostgresConfig> {
    serde_json::from_str(text).map_err(|source| ConfigError::Json {
        path: origin.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::DependencyCondition;
    use std::io::Write;

    #[test]
    fn load_config_applies_defaults_and_anchors_paths() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("pg.json");
        let mut file = fs::File::create(&path)?;
        write!(
            file,
            r#"{{
                "name": "pg1",
                "port": 5433,
                "initial_databases": [{{"name": "app", "schemas": ["schema.sql"]}}],
                "settings": {{"log_statement": "all", "fsync": false}},
                "depends_on": {{"minio": {{"condition": "process_healthy"}}}}
            }}"#
        )?;

        let config = load_config(&path)?;
        assert_eq!(config.port, 5433);
        assert_eq!(config.listen_addresses, "127.0.0.1");
        assert_eq!(config.initdb_args, vec!["--locale=C", "--encoding=UTF8"]);
        assert_eq!(config.data_dir(), dir.path().join("data/pg1"));
        assert_eq!(
            config.initial_databases[0].schemas,
            Some(vec![dir.path().join("schema.sql")])
        );
        assert_eq!(
            config.depends_on["minio"].condition,
            DependencyCondition::ProcessHealthy
        );
        Ok(())
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let err = parse_config(r#"{"name":"pg1","prot":1}"#, Path::new("pg.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Json { .. }));
    }

    #[test]
    fn load_config_validates() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("pg.json");
        fs::write(
            &path,
            r#"{"name":"pg1","initial_databases":[{"name":"a"},{"name":"a"}]}"#,
        )?;
        assert!(matches!(
            load_config(&path),
            Err(ConfigError::DuplicateDatabaseName { .. })
        ));
        Ok(())
    }

    #[test]
    fn missing_file_reports_io() {
        let err = load_config(Path::new("/definitely/missing/pg.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { operation: "config.read", .. }));
    }
}
