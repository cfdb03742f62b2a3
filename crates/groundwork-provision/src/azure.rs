//! Azure implementations of the collaborator traits

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use groundwork_azure::{
    ArmClient, KeyClient, KeyCryptoClient, ResourceGroupClient, StorageClient, TokenCredential,
    VaultClient,
};
use groundwork_core::{BackendConfig, KeyHandle, Result, SecretString, VaultGrantee};

use crate::cipher::KeyCipher;
use crate::traits::{KeyProvider, ResourceGroupProvider, StorageProvider, VaultProvider};

pub struct AzureResourceGroups {
    client: ResourceGroupClient,
}

impl AzureResourceGroups {
    pub fn new(arm: ArmClient) -> Self {
        Self {
            client: ResourceGroupClient::new(arm),
        }
    }
}

#[async_trait]
impl ResourceGroupProvider for AzureResourceGroups {
    async fn ensure_group(&self, config: &BackendConfig) -> Result<()> {
        self.client
            .create_or_update(&config.resource_group, &config.region)
            .await
    }
}

pub struct AzureVaults {
    client: VaultClient,
}

impl AzureVaults {
    pub fn new(arm: ArmClient) -> Self {
        Self {
            client: VaultClient::new(arm),
        }
    }
}

#[async_trait]
impl VaultProvider for AzureVaults {
    async fn ensure_vault(&self, config: &BackendConfig, grantee: &VaultGrantee) -> Result<String> {
        self.client
            .create_or_update(
                &config.resource_group,
                &config.vault_name,
                &config.region,
                grantee,
            )
            .await
    }
}

/// Key operations target a data-plane endpoint that is only known once
/// the vault branch has provisioned it. Clients are built lazily and
/// cached per endpoint so every call shares one connection pool.
pub struct AzureKeys {
    credential: Arc<dyn TokenCredential>,
    clients: Mutex<HashMap<String, Arc<KeyClient>>>,
}

impl AzureKeys {
    pub fn new(credential: Arc<dyn TokenCredential>) -> Self {
        Self {
            credential,
            clients: Mutex::new(HashMap::new()),
        }
    }

    fn client_for(&self, vault_uri: &str) -> Result<Arc<KeyClient>> {
        let mut clients = self.clients.lock().expect("key client cache poisoned");
        if let Some(client) = clients.get(vault_uri) {
            return Ok(Arc::clone(client));
        }
        let client = Arc::new(KeyClient::new(Arc::clone(&self.credential), vault_uri)?);
        clients.insert(vault_uri.to_string(), Arc::clone(&client));
        Ok(client)
    }
}

#[async_trait]
impl KeyProvider for AzureKeys {
    async fn find_key(&self, vault_uri: &str, name: &str) -> Result<Option<KeyHandle>> {
        self.client_for(vault_uri)?.find_key(name).await
    }

    async fn create_key(&self, vault_uri: &str, name: &str) -> Result<KeyHandle> {
        self.client_for(vault_uri)?.create_rsa_key(name).await
    }
}

pub struct AzureStorage {
    client: StorageClient,
}

impl AzureStorage {
    pub fn new(arm: ArmClient) -> Self {
        Self {
            client: StorageClient::new(arm),
        }
    }
}

#[async_trait]
impl StorageProvider for AzureStorage {
    async fn ensure_account(&self, config: &BackendConfig) -> Result<()> {
        self.client
            .create_account(
                &config.resource_group,
                &config.storage_account,
                &config.region,
            )
            .await
    }

    async fn ensure_container(&self, config: &BackendConfig) -> Result<()> {
        self.client
            .create_container(
                &config.resource_group,
                &config.storage_account,
                &config.container,
            )
            .await
    }

    async fn access_key(&self, config: &BackendConfig) -> Result<SecretString> {
        self.client
            .list_primary_key(&config.resource_group, &config.storage_account)
            .await
    }
}

/// Remote RSA cipher backend over the provisioned vault key.
pub struct AzureKeyCipher {
    client: KeyCryptoClient,
}

impl AzureKeyCipher {
    pub fn new(credential: Arc<dyn TokenCredential>, key: KeyHandle) -> Result<Self> {
        Ok(Self {
            client: KeyCryptoClient::new(credential, key)?,
        })
    }
}

#[async_trait]
impl KeyCipher for AzureKeyCipher {
    async fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>> {
        self.client.encrypt(plaintext).await
    }

    async fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>> {
        self.client.decrypt(ciphertext).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use groundwork_core::SecretString;

    struct StaticCredential;

    #[async_trait]
    impl TokenCredential for StaticCredential {
        async fn token(&self, _resource: &str) -> Result<SecretString> {
            Ok(SecretString::new("test-token"))
        }
    }

    #[test]
    fn key_clients_are_cached_per_vault_endpoint() {
        let keys = AzureKeys::new(Arc::new(StaticCredential));

        let first = keys
            .client_for("https://vault-a.vault.azure.net")
            .unwrap();
        let again = keys
            .client_for("https://vault-a.vault.azure.net")
            .unwrap();
        let other = keys
            .client_for("https://vault-b.vault.azure.net")
            .unwrap();

        assert!(Arc::ptr_eq(&first, &again));
        assert!(!Arc::ptr_eq(&first, &other));
    }
}
