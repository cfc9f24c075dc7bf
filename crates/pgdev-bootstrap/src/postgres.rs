//! `sqlx` executor talking to the temporary server over its unix socket.

use async_trait::async_trait;
use pgdev_config::PostgresConfig;
use pgdev_config::defaults::MAINTENANCE_DATABASE;
use sqlx::postgres::PgConnectOptions;
use sqlx::{ConnectOptions, Connection, PgConnection};
use tracing::{debug, instrument};

use crate::error::{BootstrapError, BootstrapResult};
use crate::executor::SqlExecutor;

/// Executes bootstrap SQL as the instance superuser.
pub struct PgSqlExecutor {
    options: PgConnectOptions,
    maintenance: PgConnection,
}

impl PgSqlExecutor {
    /// Connect to the maintenance database of `config` as `user`.
    ///
    /// # Errors
    ///
    /// Returns [`BootstrapError::SqlScriptFailure`] when the connection fails.
    #[instrument(name = "bootstrap.connect", skip(config), fields(instance = %config.name))]
    pub async fn connect(config: &PostgresConfig, user: &str) -> BootstrapResult<Self> {
        let options = PgConnectOptions::new()
            .socket(config.effective_socket_dir())
            .port(config.effective_port())
            .username(user);
        let maintenance = open(&options, MAINTENANCE_DATABASE).await?;
        Ok(Self {
            options,
            maintenance,
        })
    }

    /// Close the maintenance connection.
    ///
    /// # Errors
    ///
    /// Returns [`BootstrapError::SqlScriptFailure`] when the close handshake fails.
    pub async fn close(self) -> BootstrapResult<()> {
        self.maintenance
            .close()
            .await
            .map_err(map_sqlx_err("bootstrap.close", MAINTENANCE_DATABASE))
    }
}

#[async_trait]
impl SqlExecutor for PgSqlExecutor {
    async fn database_exists(&mut self, name: &str) -> BootstrapResult<bool> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM pg_database WHERE datname = $1)",
        )
        .bind(name)
        .fetch_one(&mut self.maintenance)
        .await
        .map_err(map_sqlx_err("bootstrap.database_exists", name))
    }

    async fn create_database(&mut self, name: &str) -> BootstrapResult<()> {
        let statement = format!("CREATE DATABASE {}", quote_ident(name));
        sqlx::Executor::execute(&mut self.maintenance, sqlx::raw_sql(&statement))
            .await
            .map_err(map_sqlx_err("bootstrap.create_database", name))?;
        debug!(database = name, "database created");
        Ok(())
    }

    async fn drop_database(&mut self, name: &str) -> BootstrapResult<()> {
        let statement = format!("DROP DATABASE IF EXISTS {} WITH (FORCE)", quote_ident(name));
        sqlx::Executor::execute(&mut self.maintenance, sqlx::raw_sql(&statement))
            .await
            .map_err(map_sqlx_err("bootstrap.drop_database", name))?;
        debug!(database = name, "database dropped");
        Ok(())
    }

    async fn run_script(&mut self, database: Option<&str>, sql: &str) -> BootstrapResult<()> {
        match database {
            None | Some(MAINTENANCE_DATABASE) => {
                sqlx::Executor::execute(&mut self.maintenance, sqlx::raw_sql(sql))
                    .await
                    .map_err(map_sqlx_err("bootstrap.run_script", MAINTENANCE_DATABASE))?;
            }
            Some(database) => {
                let mut conn = open(&self.options, database).await?;
                sqlx::Executor::execute(&mut conn, sqlx::raw_sql(sql))
                    .await
                    .map_err(map_sqlx_err("bootstrap.run_script", database))?;
                conn.close()
                    .await
                    .map_err(map_sqlx_err("bootstrap.close", database))?;
            }
        }
        Ok(())
    }
}

async fn open(options: &PgConnectOptions, database: &str) -> BootstrapResult<PgConnection> {
    options
        .clone()
        .database(database)
        .connect()
        .await
        .map_err(map_sqlx_err("bootstrap.connect", database))
}

fn map_sqlx_err(
    operation: &'static str,
    database: &str,
) -> impl FnOnce(sqlx::Error) -> BootstrapError {
    let database = database.to_string();
    move |source| BootstrapError::SqlScriptFailure {
        operation,
        database,
        source,
    }
}

/// Quote `name` as a SQL identifier.
fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}
