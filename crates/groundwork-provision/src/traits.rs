//! Collaborator traits for the provisioning pipeline
//!
//! The provisioner is written against these seams so the pipeline's
//! ordering, idempotence, and get-or-create discipline can be exercised
//! with in-memory fakes. The Azure adapters in [`crate::azure`] are the
//! production implementations.

use async_trait::async_trait;

use groundwork_core::{BackendConfig, KeyHandle, Result, SecretString, VaultGrantee};

/// Create-or-update of the resource group holding everything else.
#[async_trait]
pub trait ResourceGroupProvider: Send + Sync {
    async fn ensure_group(&self, config: &BackendConfig) -> Result<()>;
}

/// Create-or-update of the secrets vault, granting `grantee` key
/// permissions. Returns the vault's data-plane endpoint.
#[async_trait]
pub trait VaultProvider: Send + Sync {
    async fn ensure_vault(&self, config: &BackendConfig, grantee: &VaultGrantee) -> Result<String>;
}

/// Key lookup and creation inside a provisioned vault.
#[async_trait]
pub trait KeyProvider: Send + Sync {
    /// Explicit lookup; absence is `Ok(None)`, never an error.
    async fn find_key(&self, vault_uri: &str, name: &str) -> Result<Option<KeyHandle>>;

    /// Create a new asymmetric key. Called at most once per run, and only
    /// after `find_key` reported absence.
    async fn create_key(&self, vault_uri: &str, name: &str) -> Result<KeyHandle>;
}

/// Storage account, container, and access-key operations.
#[async_trait]
pub trait StorageProvider: Send + Sync {
    /// Create-or-update the account and wait for provisioning completion.
    async fn ensure_account(&self, config: &BackendConfig) -> Result<()>;

    /// Create-or-update the container with private access.
    async fn ensure_container(&self, config: &BackendConfig) -> Result<()>;

    /// Return an access key for the account.
    async fn access_key(&self, config: &BackendConfig) -> Result<SecretString>;
}
