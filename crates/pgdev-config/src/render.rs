//! The generated file set for one instance.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::defaults::{CONFIG_FILE_NAME, HBA_FILE_NAME};
use crate::error::{ConfigError, ConfigResult};
use crate::hba;
use crate::model::PostgresConfig;
use crate::settings::effective_settings;

/// Rendered `postgresql.conf` and `pg_hba.conf` contents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedFiles {
    /// `postgresql.conf` text.
    pub postgresql_conf: String,
    /// `pg_hba.conf` text.
    pub pg_hba_conf: String,
}

impl RenderedFiles {
    /// Render both files from `config`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidSettingType`] when a setting is not scalar.
    pub fn render(config: &PostgresConfig) -> ConfigResult<Self> {
        Ok(Self {
            postgresql_conf: effective_settings(config)?.render(),
            pg_hba_conf: hba::compile(&config.hba_conf),
        })
    }

    /// Write both files into `dir`, creating it if needed. Existing files are
    /// replaced.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] when the directory or a file cannot be written.
    pub fn write_to(&self, dir: &Path) -> ConfigResult<WrittenFiles> {
        fs::create_dir_all(dir).map_err(|source| ConfigError::io("render.create_dir", dir, source))?;
        let written = WrittenFiles {
            postgresql_conf: dir.join(CONFIG_FILE_NAME),
            pg_hba_conf: dir.join(HBA_FILE_NAME),
        };
        fs::write(&written.postgresql_conf, &self.postgresql_conf).map_err(|source| {
            ConfigError::io("render.write_config", &written.postgresql_conf, source)
        })?;
        fs::write(&written.pg_hba_conf, &self.pg_hba_conf)
            .map_err(|source| ConfigError::io("render.write_hba", &written.pg_hba_conf, source))?;
        debug!(dir = %dir.display(), "wrote postgresql.conf and pg_hba.conf");
        Ok(written)
    }
}

/// Paths of files produced by [`RenderedFiles::write_to`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrittenFiles {
    /// Path of `postgresql.conf`.
    pub postgresql_conf: PathBuf,
    /// Path of `pg_hba.conf`.
    pub pg_hba_conf: PathBuf,
}
