//! Azure REST clients for Groundwork
//!
//! A deliberately small surface over the collaborators the bootstrap
//! pipeline talks to: the ARM control plane (resource groups, vaults,
//! storage accounts) and the Key Vault data plane (keys and RSA
//! encrypt/decrypt). Authentication goes through a single process-wide
//! [`auth::TokenCredential`] injected into every client.

pub mod arm;
pub mod auth;
pub mod keyvault;
mod rest;

pub use arm::{ArmClient, ResourceGroupClient, StorageClient, VaultClient, ARM_RESOURCE};
pub use auth::{
    default_credential, principal_object_id, AzureCliCredential, ClientSecretCredential,
    TokenCredential,
};
pub use keyvault::{KeyClient, KeyCryptoClient, VAULT_RESOURCE};
