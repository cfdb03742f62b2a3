use std::sync::Arc;

use anyhow::Result;
use camino::Utf8Path;
use tracing::debug;

use groundwork_azure::{default_credential, principal_object_id, TokenCredential as _, ARM_RESOURCE};
use groundwork_core::types::VaultGrantee;
use groundwork_provision::BootstrapProvisioner;

use crate::cli::BootstrapArgs;
use crate::output;

pub async fn run(args: BootstrapArgs, config_path: Option<&Utf8Path>) -> Result<()> {
    let config = super::load_config(config_path)?;
    let credential = default_credential()?;

    let object_id = match args.object_id {
        Some(id) => id,
        None => {
            let token = credential.token(ARM_RESOURCE).await?;
            let id = principal_object_id(token.expose())?;
            debug!("resolved caller object id {id}");
            id
        }
    };
    let grantee = VaultGrantee {
        tenant_id: config.tenant_id.clone(),
        object_id,
    };

    output::header("Bootstrapping backend prerequisites");
    let provisioner = BootstrapProvisioner::azure(Arc::clone(&credential), &config)?;

    let spinner = output::spinner("reconciling cloud resources...");
    let outcome = provisioner.run(&config, &grantee).await;
    spinner.finish_and_clear();
    let result = outcome?;

    output::success("backend prerequisites ready");
    output::kv("resource group", &config.resource_group);
    output::kv("vault", &config.vault_uri());
    output::kv("key", &result.key.id());
    output::kv("storage account", &config.storage_account);
    output::kv("container", &config.container);

    if args.export {
        // Shell exports for the declarative phase
        output::export("AZURE_STORAGE_ACCOUNT", &config.storage_account);
        output::export("AZURE_STORAGE_KEY", result.storage_key.expose());
    }

    Ok(())
}
