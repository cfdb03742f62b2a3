//! Core library for Groundwork
//!
//! Provides the shared building blocks for the bootstrap pipeline:
//! the validated backend configuration, the error taxonomy used by every
//! cloud collaborator, secret-holding value types, and the retry engine
//! for transient cloud failures.

pub mod config;
pub mod error;
pub mod retry;
pub mod types;

pub use config::BackendConfig;
pub use error::{Error, Result};
pub use types::{DeploymentOutputs, KeyHandle, ProvisioningResult, SecretString, VaultGrantee};
