//! Live bootstrap tests against a real Azure subscription
//!
//! These tests require an authenticated credential (Azure CLI login or
//! service-principal environment variables) and a throwaway subscription.
//! They are gated on `GROUNDWORK_LIVE_SUBSCRIPTION` / `GROUNDWORK_LIVE_TENANT`
//! and skip cleanly when either is unset.
//! Run with: cargo test --test azure_live -- --ignored
//!
//! Resource names are derived from the subscription id, so repeated runs
//! reconcile the same resources instead of accumulating new ones. Nothing
//! is deleted afterwards; clean up the resource group manually.

use std::sync::Arc;

use groundwork_azure::{default_credential, principal_object_id, TokenCredential, ARM_RESOURCE};
use groundwork_core::{BackendConfig, VaultGrantee};
use groundwork_provision::{BootstrapProvisioner, SecretCipher};

struct LiveEnvironment {
    config: BackendConfig,
    grantee: VaultGrantee,
    credential: Arc<dyn TokenCredential>,
}

/// Skip unless the live subscription variables are set.
fn live_target() -> Option<(String, String)> {
    let subscription = match std::env::var("GROUNDWORK_LIVE_SUBSCRIPTION") {
        Ok(value) if !value.is_empty() => value,
        _ => {
            eprintln!("Skipping test: GROUNDWORK_LIVE_SUBSCRIPTION not set");
            return None;
        }
    };
    let tenant = match std::env::var("GROUNDWORK_LIVE_TENANT") {
        Ok(value) if !value.is_empty() => value,
        _ => {
            eprintln!("Skipping test: GROUNDWORK_LIVE_TENANT not set");
            return None;
        }
    };
    Some((subscription, tenant))
}

async fn live_environment() -> Option<LiveEnvironment> {
    let (subscription_id, tenant_id) = live_target()?;

    // Stable per-subscription names keep re-runs convergent while staying
    // globally unique for the vault and storage account.
    let suffix: String = subscription_id
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .map(|c| c.to_ascii_lowercase())
        .take(8)
        .collect();
    let config = BackendConfig {
        subscription_id,
        tenant_id: tenant_id.clone(),
        region: std::env::var("GROUNDWORK_LIVE_REGION").unwrap_or_else(|_| "westeurope".into()),
        resource_group: format!("groundwork-live-{suffix}"),
        vault_name: format!("gwlive-{suffix}"),
        key_name: "pulumi".into(),
        storage_account: format!("gwlive{suffix}"),
        container: "pulumistate".into(),
    };
    config.validate().expect("derived live config is valid");

    let credential = default_credential().expect("failed to resolve a credential");
    let token = credential
        .token(ARM_RESOURCE)
        .await
        .expect("failed to acquire a management token");
    let object_id =
        principal_object_id(token.expose()).expect("token carries no object id claim");

    Some(LiveEnvironment {
        config,
        grantee: VaultGrantee {
            tenant_id,
            object_id,
        },
        credential,
    })
}

/// Two full bootstrap runs against the real control plane converge on the
/// same resources, and the provisioned key round-trips a secret.
#[tokio::test]
#[ignore] // Requires an Azure subscription and credential
async fn live_bootstrap_is_idempotent_and_key_round_trips() {
    let Some(env) = live_environment().await else {
        return;
    };

    let provisioner = BootstrapProvisioner::azure(Arc::clone(&env.credential), &env.config)
        .expect("failed to wire the Azure provisioner");

    let first = provisioner
        .run(&env.config, &env.grantee)
        .await
        .expect("first bootstrap run failed");
    let second = provisioner
        .run(&env.config, &env.grantee)
        .await
        .expect("second bootstrap run failed");

    // The second run must reuse, never recreate
    assert_eq!(first.key, second.key);
    assert_eq!(first.key.name, env.config.key_name);
    assert!(!second.storage_key.is_empty());

    let cipher = SecretCipher::for_key(Arc::clone(&env.credential), first.key)
        .expect("failed to bind the cipher");
    let literal = cipher
        .encrypt("hello-secret")
        .await
        .expect("encryption against the live key failed");
    assert_eq!(
        cipher.decrypt(&literal).await.expect("decryption failed"),
        "hello-secret"
    );
}
