//! Bootstrap provisioning pipeline
//!
//! Brings a subscription to the known state the declarative deployment
//! phase depends on (resource group, vault + key, state storage), exposes
//! the secret cipher over the provisioned key, and binds deployed
//! principals to database access afterwards. Every operation is
//! idempotent; a failed run is recovered by running again.

pub mod azure;
pub mod binder;
pub mod cipher;
pub mod provisioner;
pub mod sql;
pub mod traits;

pub use binder::IdentityBinder;
pub use cipher::{KeyCipher, SecretCipher};
pub use provisioner::BootstrapProvisioner;
pub use traits::{KeyProvider, ResourceGroupProvider, StorageProvider, VaultProvider};
