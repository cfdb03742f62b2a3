//! Post-deployment identity binding
//!
//! Grants a deployed principal (managed identity or directory user)
//! access to the application database. The existence probe and the
//! mutating statement are split across the [`DatabaseSession`] seam so
//! the at-most-one-create discipline is testable without a server.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};

use groundwork_core::{DeploymentOutputs, Result};

use crate::sql::SqlServerConnector;

/// One open connection to the target database.
#[async_trait]
pub trait DatabaseSession: Send {
    /// Whether a database-level principal with this name exists.
    async fn principal_exists(&mut self, principal: &str) -> Result<bool>;

    /// Create the database user from the external identity provider.
    async fn create_external_principal(&mut self, principal: &str) -> Result<()>;
}

/// Opens sessions from an opaque connection string.
#[async_trait]
pub trait DatabaseConnector: Send + Sync {
    async fn connect(&self, connection_string: &str) -> Result<Box<dyn DatabaseSession>>;
}

pub struct IdentityBinder {
    connector: Arc<dyn DatabaseConnector>,
}

impl IdentityBinder {
    pub fn new(connector: Arc<dyn DatabaseConnector>) -> Self {
        Self { connector }
    }

    /// Binder for Azure SQL over TDS.
    pub fn sql_server() -> Self {
        Self::new(Arc::new(SqlServerConnector))
    }

    /// Idempotently grant `principal` database access: an existing
    /// principal is success, not an error, and issues no statement.
    pub async fn bind_principal(&self, connection_string: &str, principal: &str) -> Result<()> {
        let mut session = self.connector.connect(connection_string).await?;
        if session.principal_exists(principal).await? {
            debug!("principal {principal} already bound");
            return Ok(());
        }
        info!("binding principal {principal}");
        session.create_external_principal(principal).await
    }

    /// Bind every principal the deployment emitted, in order.
    pub async fn bind_all(&self, outputs: &DeploymentOutputs) -> Result<()> {
        for principal in &outputs.principal_ids {
            self.bind_principal(&outputs.connection_string, principal)
                .await?;
        }
        Ok(())
    }
}
