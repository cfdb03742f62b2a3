//! Idempotent backend bootstrap
//!
//! Reconciles the prerequisite resources in dependency order: the
//! resource group first, then the vault branch (vault, then key) and the
//! storage branch (account, container, access key) concurrently. There
//! is no rollback on partial failure - every step is create-or-update or
//! a pure read, so re-running converges on the same end state.

use std::sync::Arc;

use tracing::{debug, info};

use groundwork_azure::{ArmClient, TokenCredential};
use groundwork_core::retry::{retry_transient, RetryPolicy};
use groundwork_core::{BackendConfig, Error, KeyHandle, ProvisioningResult, Result, VaultGrantee};

use crate::azure::{AzureKeys, AzureResourceGroups, AzureStorage, AzureVaults};
use crate::traits::{KeyProvider, ResourceGroupProvider, StorageProvider, VaultProvider};

pub struct BootstrapProvisioner {
    groups: Arc<dyn ResourceGroupProvider>,
    vaults: Arc<dyn VaultProvider>,
    keys: Arc<dyn KeyProvider>,
    storage: Arc<dyn StorageProvider>,
    retry: RetryPolicy,
}

impl BootstrapProvisioner {
    pub fn new(
        groups: Arc<dyn ResourceGroupProvider>,
        vaults: Arc<dyn VaultProvider>,
        keys: Arc<dyn KeyProvider>,
        storage: Arc<dyn StorageProvider>,
    ) -> Self {
        Self {
            groups,
            vaults,
            keys,
            storage,
            retry: RetryPolicy::default(),
        }
    }

    /// Wire the production Azure collaborators from a single shared
    /// credential.
    pub fn azure(credential: Arc<dyn TokenCredential>, config: &BackendConfig) -> Result<Self> {
        let arm = ArmClient::new(Arc::clone(&credential), config.subscription_id.clone())?;
        Ok(Self::new(
            Arc::new(AzureResourceGroups::new(arm.clone())),
            Arc::new(AzureVaults::new(arm.clone())),
            Arc::new(AzureKeys::new(credential)),
            Arc::new(AzureStorage::new(arm)),
        ))
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Run the full bootstrap. Returns only after every required
    /// resource reports success; a partial failure leaves whatever was
    /// created in place for the next run.
    pub async fn run(
        &self,
        config: &BackendConfig,
        grantee: &VaultGrantee,
    ) -> Result<ProvisioningResult> {
        config.validate()?;

        info!("ensuring resource group {}", config.resource_group);
        retry_transient(&self.retry, "ensure resource group", || {
            self.groups.ensure_group(config)
        })
        .await?;

        // The vault and storage branches only depend on the group.
        let vault_branch = async {
            info!("ensuring vault {}", config.vault_name);
            let vault_uri = retry_transient(&self.retry, "ensure vault", || {
                self.vaults.ensure_vault(config, grantee)
            })
            .await?;
            self.ensure_key(&vault_uri, &config.key_name).await
        };

        let storage_branch = async {
            info!("ensuring storage account {}", config.storage_account);
            retry_transient(&self.retry, "ensure storage account", || {
                self.storage.ensure_account(config)
            })
            .await?;
            retry_transient(&self.retry, "ensure container", || {
                self.storage.ensure_container(config)
            })
            .await?;
            retry_transient(&self.retry, "list storage keys", || {
                self.storage.access_key(config)
            })
            .await
        };

        let (key, storage_key) = tokio::try_join!(vault_branch, storage_branch)?;

        if storage_key.is_empty() {
            return Err(Error::Api {
                status: 0,
                code: "EmptyStorageKey".to_string(),
                message: format!("storage account {} returned an empty key", config.storage_account),
            });
        }

        info!("bootstrap complete, key {}", key.id());
        Ok(ProvisioningResult { storage_key, key })
    }

    /// Get-or-create the vault key. Creation happens only on a reported
    /// absence; every other lookup failure propagates untouched.
    pub async fn ensure_key(&self, vault_uri: &str, name: &str) -> Result<KeyHandle> {
        let existing = retry_transient(&self.retry, "look up key", || {
            self.keys.find_key(vault_uri, name)
        })
        .await?;

        match existing {
            Some(handle) => {
                debug!("key {name} already present: {}", handle.id());
                Ok(handle)
            }
            None => {
                info!("key {name} absent, creating");
                retry_transient(&self.retry, "create key", || {
                    self.keys.create_key(vault_uri, name)
                })
                .await
            }
        }
    }
}
