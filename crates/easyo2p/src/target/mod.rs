//! PostgreSQL target execution.

use postgres::{Client, NoTls};
use tracing::{debug, info};

use crate::config::TargetConfig;
use crate::error::{MigrateError, Result};

/// Trait for live statement execution against the target(s).
///
/// Sessions are autocommit, so every executed DDL statement is immediately
/// durable. An execution failure is fatal to the run; whatever was already
/// written to script files remains on disk for manual replay.
pub trait TargetExec {
    /// Execute one statement against every target session, in order.
    fn execute(&mut self, statement: &str) -> Result<()>;
}

/// One PostgreSQL session per configured target connection.
pub struct PgSessions {
    clients: Vec<Client>,
}

impl PgSessions {
    /// Connect every configured target and initialise the schema on each,
    /// dropping it first when `drop_schema` is set.
    pub fn connect(config: &TargetConfig, drop_schema: bool) -> Result<Self> {
        if config.conn.is_empty() {
            return Err(MigrateError::config("no target connections configured"));
        }

        let schema = &config.schema;
        let mut clients = Vec::with_capacity(config.conn.len());
        for descriptor in &config.conn {
            let mut client = Client::connect(descriptor, NoTls)?;
            if drop_schema {
                client.batch_execute(&format!("DROP SCHEMA IF EXISTS {} CASCADE", schema))?;
            }
            client.batch_execute(&format!("CREATE SCHEMA IF NOT EXISTS {}", schema))?;
            clients.push(client);
        }

        info!("Connected to {} PostgreSQL target(s)", clients.len());
        Ok(Self { clients })
    }
}

impl TargetExec for PgSessions {
    fn execute(&mut self, statement: &str) -> Result<()> {
        for client in &mut self.clients {
            debug!("executing: {}", statement.lines().next().unwrap_or(""));
            client.batch_execute(statement)?;
        }
        Ok(())
    }
}
