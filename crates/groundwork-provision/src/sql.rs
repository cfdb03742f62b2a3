//! Azure SQL (TDS) implementation of the database seam

use async_trait::async_trait;
use tiberius::{Client, Config};
use tokio::net::TcpStream;
use tokio_util::compat::{Compat, TokioAsyncWriteCompatExt};

use groundwork_core::{Error, Result};

use crate::binder::{DatabaseConnector, DatabaseSession};

fn db_err(context: &str, err: impl std::fmt::Display) -> Error {
    Error::database(format!("{context}: {err}"))
}

/// Connects with the ADO-style connection string the deployment emits.
pub struct SqlServerConnector;

#[async_trait]
impl DatabaseConnector for SqlServerConnector {
    async fn connect(&self, connection_string: &str) -> Result<Box<dyn DatabaseSession>> {
        let config = Config::from_ado_string(connection_string)
            .map_err(|e| db_err("invalid connection string", e))?;

        let tcp = TcpStream::connect(config.get_addr())
            .await
            .map_err(|e| db_err("failed to reach database host", e))?;
        tcp.set_nodelay(true)
            .map_err(|e| db_err("failed to configure socket", e))?;

        let client = Client::connect(config, tcp.compat_write())
            .await
            .map_err(|e| db_err("database login failed", e))?;
        Ok(Box::new(SqlServerSession { client }))
    }
}

struct SqlServerSession {
    client: Client<Compat<TcpStream>>,
}

#[async_trait]
impl DatabaseSession for SqlServerSession {
    async fn principal_exists(&mut self, principal: &str) -> Result<bool> {
        let row = self
            .client
            .query("SELECT DATABASE_PRINCIPAL_ID(@P1)", &[&principal])
            .await
            .map_err(|e| db_err("principal lookup failed", e))?
            .into_row()
            .await
            .map_err(|e| db_err("principal lookup failed", e))?;

        Ok(row.and_then(|r| r.get::<i32, usize>(0)).is_some())
    }

    async fn create_external_principal(&mut self, principal: &str) -> Result<()> {
        // DDL does not accept parameters; bracket-quote the identifier.
        let stmt = format!(
            "CREATE USER [{}] FROM EXTERNAL PROVIDER",
            principal.replace(']', "]]")
        );
        self.client
            .execute(stmt, &[])
            .await
            .map_err(|e| db_err("create user failed", e))?;
        Ok(())
    }
}
