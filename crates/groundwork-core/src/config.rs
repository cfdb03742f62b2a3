//! Backend configuration loading and validation
//!
//! The configuration names every cloud resource the bootstrap reconciles.
//! All fields are required and validated up front against the target
//! cloud's naming rules, so a re-run with the same file always converges
//! on the same resources. No defaults are baked into business logic.

use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;
use serde::Deserialize;

use crate::error::{Error, Result};

/// Names and identifiers of the backend resources to reconcile.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct BackendConfig {
    /// Azure subscription id (UUID)
    pub subscription_id: String,
    /// Azure AD tenant id (UUID)
    pub tenant_id: String,
    /// Region for every created resource, e.g. `westeurope`
    pub region: String,
    /// Resource group holding the vault and the storage account
    pub resource_group: String,
    /// Key Vault name
    pub vault_name: String,
    /// Name of the RSA key inside the vault
    pub key_name: String,
    /// Storage account holding the remote state container
    pub storage_account: String,
    /// Blob container name
    pub container: String,
}

fn uuid_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}$")
            .expect("valid uuid regex")
    })
}

fn storage_account_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[a-z0-9]{3,24}$").expect("valid storage account regex"))
}

fn vault_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // 3-24 chars, starts with a letter, ends alphanumeric, no double hyphen
    RE.get_or_init(|| Regex::new(r"^[a-zA-Z][a-zA-Z0-9-]{1,22}[a-zA-Z0-9]$").expect("valid vault regex"))
}

fn container_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[a-z0-9][a-z0-9-]{1,61}[a-z0-9]$").expect("valid container regex"))
}

fn key_name_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[0-9a-zA-Z-]{1,127}$").expect("valid key name regex"))
}

fn resource_group_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[-\w\.\(\)]{1,90}$").expect("valid resource group regex"))
}

impl BackendConfig {
    /// Load and validate a configuration file.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|_| Error::config_not_found(path.display().to_string()))?;
        let config: Self = serde_yaml_ng::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate every field against the target cloud's naming rules.
    pub fn validate(&self) -> Result<()> {
        if !uuid_re().is_match(&self.subscription_id) {
            return Err(Error::invalid_config(format!(
                "subscription_id '{}' is not a UUID",
                self.subscription_id
            )));
        }
        if !uuid_re().is_match(&self.tenant_id) {
            return Err(Error::invalid_config(format!(
                "tenant_id '{}' is not a UUID",
                self.tenant_id
            )));
        }
        if self.region.trim().is_empty() {
            return Err(Error::invalid_config("region must not be empty"));
        }
        if !resource_group_re().is_match(&self.resource_group) || self.resource_group.ends_with('.') {
            return Err(Error::invalid_config(format!(
                "resource group '{}' violates naming rules",
                self.resource_group
            )));
        }
        if !vault_re().is_match(&self.vault_name) || self.vault_name.contains("--") {
            return Err(Error::invalid_config(format!(
                "vault name '{}' must be 3-24 alphanumerics/hyphens starting with a letter",
                self.vault_name
            )));
        }
        if !key_name_re().is_match(&self.key_name) {
            return Err(Error::invalid_config(format!(
                "key name '{}' must be 1-127 alphanumerics or hyphens",
                self.key_name
            )));
        }
        if !storage_account_re().is_match(&self.storage_account) {
            return Err(Error::invalid_config(format!(
                "storage account '{}' must be 3-24 lowercase alphanumerics",
                self.storage_account
            )));
        }
        if !container_re().is_match(&self.container) || self.container.contains("--") {
            return Err(Error::invalid_config(format!(
                "container '{}' must be 3-63 lowercase alphanumerics/hyphens",
                self.container
            )));
        }
        Ok(())
    }

    /// Data-plane endpoint of the configured vault.
    pub fn vault_uri(&self) -> String {
        format!("https://{}.vault.azure.net", self.vault_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> BackendConfig {
        BackendConfig {
            subscription_id: "cfed8a6e-91e3-4ba3-b79d-698c8b7b4e29".into(),
            tenant_id: "17e6b881-0146-48e2-8241-7b564e5e94cb".into(),
            region: "westeurope".into(),
            resource_group: "myapp-infra-dev".into(),
            vault_name: "myappvaulta1b2-dev".into(),
            key_name: "pulumi".into(),
            storage_account: "myapp1pulumistatedev".into(),
            container: "pulumistate".into(),
        }
    }

    #[test]
    fn accepts_reference_configuration() {
        valid().validate().unwrap();
    }

    #[test]
    fn rejects_malformed_subscription() {
        let mut config = valid();
        config.subscription_id = "not-a-uuid".into();
        assert!(matches!(
            config.validate().unwrap_err(),
            Error::InvalidConfig { .. }
        ));
    }

    #[test]
    fn rejects_uppercase_storage_account() {
        let mut config = valid();
        config.storage_account = "MyAppState".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_overlong_storage_account() {
        let mut config = valid();
        config.storage_account = "a".repeat(25);
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_vault_starting_with_digit() {
        let mut config = valid();
        config.vault_name = "1vault".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_container_with_double_hyphen() {
        let mut config = valid();
        config.container = "state--files".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn vault_uri_is_derived_from_the_name() {
        assert_eq!(
            valid().vault_uri(),
            "https://myappvaulta1b2-dev.vault.azure.net"
        );
    }

    #[test]
    fn loads_from_yaml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("groundwork.yaml");
        std::fs::write(
            &path,
            "subscription_id: cfed8a6e-91e3-4ba3-b79d-698c8b7b4e29\n\
             tenant_id: 17e6b881-0146-48e2-8241-7b564e5e94cb\n\
             region: westeurope\n\
             resource_group: myapp-infra-dev\n\
             vault_name: myappvaulta1b2-dev\n\
             key_name: pulumi\n\
             storage_account: myapp1pulumistatedev\n\
             container: pulumistate\n",
        )
        .unwrap();

        let config = BackendConfig::load(&path).unwrap();
        assert_eq!(config, valid());
    }

    #[test]
    fn missing_file_is_config_not_found() {
        let err = BackendConfig::load(Path::new("/nonexistent/groundwork.yaml")).unwrap_err();
        assert!(matches!(err, Error::ConfigNotFound { .. }));
    }
}
