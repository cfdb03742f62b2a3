//! Value types shared across the bootstrap pipeline

use std::fmt;
use std::path::Path;

use serde::Deserialize;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::{Error, Result};

/// Secret value with automatic zeroing on drop.
///
/// Holds process-lifetime secrets (storage access keys, connection
/// strings). Never serialized; `Debug` is redacted so the value cannot
/// leak through logs.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SecretString(String);

impl SecretString {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Borrow the secret. Callers must not persist the value.
    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretString(<redacted>)")
    }
}

impl From<String> for SecretString {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

/// Reference to a provisioned Key Vault key - never the key material itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyHandle {
    /// Vault endpoint, e.g. `https://myvault.vault.azure.net`
    pub vault_uri: String,
    /// Key name inside the vault
    pub name: String,
    /// Key version assigned by the vault
    pub version: String,
}

impl KeyHandle {
    /// Parse a handle from the full key identifier the vault returns
    /// (`https://{vault}/keys/{name}/{version}`).
    pub fn parse(kid: &str) -> Result<Self> {
        let mut parts = kid.rsplitn(4, '/');
        let version = parts.next().unwrap_or_default();
        let name = parts.next().unwrap_or_default();
        let keys = parts.next().unwrap_or_default();
        let vault_uri = parts.next().unwrap_or_default();
        if keys != "keys" || version.is_empty() || name.is_empty() || vault_uri.is_empty() {
            return Err(Error::crypto(format!("malformed key identifier: {kid}")));
        }
        Ok(Self {
            vault_uri: vault_uri.to_string(),
            name: name.to_string(),
            version: version.to_string(),
        })
    }

    /// Full key identifier URI.
    pub fn id(&self) -> String {
        format!("{}/keys/{}/{}", self.vault_uri, self.name, self.version)
    }
}

impl fmt::Display for KeyHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.id())
    }
}

/// Identity running the bootstrap, granted key permissions on the vault.
#[derive(Debug, Clone)]
pub struct VaultGrantee {
    /// Directory tenant the grantee belongs to
    pub tenant_id: String,
    /// Directory object id of the grantee
    pub object_id: String,
}

/// Outcome of a successful bootstrap run. Immutable thereafter.
#[derive(Debug)]
pub struct ProvisioningResult {
    /// Storage account access key; process-lifetime only, never persisted.
    pub storage_key: SecretString,
    /// Handle to the vault key backing the secret cipher.
    pub key: KeyHandle,
}

/// Outputs of the declarative deployment phase, consumed by the binder.
///
/// Both fields are opaque to the pipeline; the connection string is only
/// ever handed to the database driver.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DeploymentOutputs {
    /// Database connection string emitted by the deployment
    pub connection_string: String,
    /// Principals to grant database access, in binding order
    pub principal_ids: Vec<String>,
}

impl DeploymentOutputs {
    /// Load outputs from the JSON file the deployment phase writes.
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|_| Error::config_not_found(path.display().to_string()))?;
        Ok(serde_json::from_str(&raw)?)
    }
}
