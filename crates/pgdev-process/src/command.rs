//! Shell command assembly for supervised processes.

use std::borrow::Cow;
use std::path::Path;

use pgdev_config::PostgresConfig;
use pgdev_config::defaults::PROBE_DATABASE;

/// Quote `word` for a POSIX shell; words made of safe characters pass through.
#[must_use]
pub fn shell_quote(word: &str) -> Cow<'_, str> {
    let safe = !word.is_empty()
        && word
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || "-_./=:,@%+".contains(ch));
    if safe {
        Cow::Borrowed(word)
    } else {
        Cow::Owned(format!("'{}'", word.replace('\'', r"'\''")))
    }
}

/// A program and its arguments, rendered as one shell command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    program: String,
    args: Vec<String>,
}

impl CommandLine {
    /// Start a command line for `program`.
    #[must_use]
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Append one argument.
    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append a path argument.
    #[must_use]
    pub fn path_arg(self, path: &Path) -> Self {
        self.arg(path.display().to_string())
    }

    /// Render with every word quoted as needed.
    #[must_use]
    pub fn render(&self) -> String {
        std::iter::once(&self.program)
            .chain(&self.args)
            .map(|word| shell_quote(word))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Command lines for the processes of one instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceCommands {
    /// Init process: `pgdev setup --config <file>`.
    pub init: String,
    /// Server process: `postgres -D <data_dir>`.
    pub main: String,
    /// Readiness check: `pg_isready -h <socket_dir> -p <port> -d template1 [-U <superuser>]`.
    pub readiness: String,
}

impl InstanceCommands {
    /// Commands for `config`, with the init process running `pgdev` against
    /// `config_path`.
    #[must_use]
    pub fn for_config(config: &PostgresConfig, pgdev: &Path, config_path: &Path) -> Self {
        let init = CommandLine::new(pgdev.display().to_string())
            .arg("setup")
            .arg("--config")
            .path_arg(config_path)
            .render();
        let main = CommandLine::new(binary(config, "postgres"))
            .arg("-D")
            .path_arg(&config.data_dir())
            .render();
        Self {
            init,
            main,
            readiness: readiness_command(config),
        }
    }
}

/// Readiness check against the instance's socket.
#[must_use]
pub fn readiness_command(config: &PostgresConfig) -> String {
    let mut command = CommandLine::new(binary(config, "pg_isready"))
        .arg("-h")
        .path_arg(&config.effective_socket_dir())
        .arg("-p")
        .arg(config.effective_port().to_string())
        .arg("-d")
        .arg(PROBE_DATABASE);
    if let Some(superuser) = &config.superuser {
        command = command.arg("-U").arg(superuser.as_str());
    }
    command.render()
}

fn binary(config: &PostgresConfig, name: &str) -> String {
    config
        .package
        .bin_dir
        .as_ref()
        .map_or_else(|| name.to_string(), |dir| dir.join(name).display().to_string())
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    #[test]
    fn shell_quote_handles_spaces_and_quotes() {
        assert_eq!(shell_quote("/usr/bin/postgres"), "/usr/bin/postgres");
        assert_eq!(shell_quote("my dir"), "'my dir'");
        assert_eq!(shell_quote("it's"), r"'it'\''s'");
        assert_eq!(shell_quote(""), "''");
    }

    #[test]
    fn instance_commands_use_bin_dir_and_paths() {
        let config = PostgresConfig {
            data_dir: Some(PathBuf::from("/srv/pg data")),
            socket_dir: Some(PathBuf::from("/run/pg")),
            port: 5433,
            superuser: Some("admin".into()),
            package: pgdev_config::PackageConfig {
                bin_dir: Some(PathBuf::from("/opt/pg/bin")),
            },
            ..PostgresConfig::named("pg1")
        };
        let commands = InstanceCommands::for_config(
            &config,
            Path::new("/usr/local/bin/pgdev"),
            Path::new("/project/pg1.json"),
        );
        assert_eq!(
            commands.init,
            "/usr/local/bin/pgdev setup --config /project/pg1.json"
        );
        assert_eq!(commands.main, "/opt/pg/bin/postgres -D '/srv/pg data'");
        assert_eq!(
            commands.readiness,
            "/opt/pg/bin/pg_isready -h /run/pg -p 5433 -d template1 -U admin"
        );
    }

    #[test]
    fn readiness_without_superuser_omits_user_flag() {
        let config = PostgresConfig {
            data_dir: Some(PathBuf::from("/srv/pg")),
            ..PostgresConfig::named("pg1")
        };
        assert_eq!(
            readiness_command(&config),
            "pg_isready -h /srv/pg -p 5432 -d template1"
        );
    }

    #[test]
    fn readiness_follows_port_and_socket_settings() {
        let mut config = PostgresConfig {
            data_dir: Some(PathBuf::from("/srv/pg")),
            ..PostgresConfig::named("pg1")
        };
        config
            .settings
            .insert("port".into(), serde_json::json!(7000));
        config
            .settings
            .insert("unix_socket_directories".into(), serde_json::json!("/tmp/sock"));
        assert_eq!(
            readiness_command(&config),
            "pg_isready -h /tmp/sock -p 7000 -d template1"
        );
    }
}
