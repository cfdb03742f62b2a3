//! Storage-account and blob-container operations

use serde_json::{json, Value};
use tracing::debug;

use groundwork_core::{Error, Result, SecretString};

use super::ArmClient;
use crate::rest::{state_or_creating, wait_for_provisioning, POLL_INTERVAL, PROVISIONING_TIMEOUT};

const API_VERSION: &str = "2023-01-01";

pub struct StorageClient {
    arm: ArmClient,
}

impl StorageClient {
    pub fn new(arm: ArmClient) -> Self {
        Self { arm }
    }

    fn account_path(&self, resource_group: &str, account: &str) -> String {
        format!(
            "resourceGroups/{resource_group}/providers/Microsoft.Storage/storageAccounts/{account}"
        )
    }

    /// Create-or-update the StorageV2 account and wait for provisioning
    /// to complete; dependent container and key operations need the
    /// account fully materialized, not merely accepted.
    pub async fn create_account(
        &self,
        resource_group: &str,
        account: &str,
        region: &str,
    ) -> Result<()> {
        let resource = format!("storage account {account}");
        let url = self
            .arm
            .url(&self.account_path(resource_group, account), API_VERSION);

        let body = json!({
            "sku": { "name": "Standard_LRS" },
            "kind": "StorageV2",
            "location": region,
        });

        debug!("ensuring {resource} in {resource_group}");
        self.arm.put_json(&url, &body, &resource).await?;

        wait_for_provisioning(&resource, PROVISIONING_TIMEOUT, POLL_INTERVAL, || async {
            Ok(state_or_creating(
                self.arm.get_optional(&url, &resource).await?,
            ))
        })
        .await?;
        Ok(())
    }

    /// Create-or-update the container with public access disabled. An
    /// existing container is updated in place, never recreated.
    pub async fn create_container(
        &self,
        resource_group: &str,
        account: &str,
        container: &str,
    ) -> Result<()> {
        let resource = format!("container {container}");
        let url = self.arm.url(
            &format!(
                "{}/blobServices/default/containers/{container}",
                self.account_path(resource_group, account)
            ),
            API_VERSION,
        );

        debug!("ensuring {resource} in {account}");
        self.arm
            .put_json(
                &url,
                &json!({ "properties": { "publicAccess": "None" } }),
                &resource,
            )
            .await?;
        Ok(())
    }

    /// List account keys and return the primary one.
    pub async fn list_primary_key(
        &self,
        resource_group: &str,
        account: &str,
    ) -> Result<SecretString> {
        let resource = format!("storage account {account} keys");
        let url = self.arm.url(
            &format!("{}/listKeys", self.account_path(resource_group, account)),
            API_VERSION,
        );

        let body = self.arm.post_json(&url, &resource).await?;
        body.pointer("/keys/0/value")
            .and_then(Value::as_str)
            .map(SecretString::new)
            .ok_or_else(|| Error::Api {
                status: 0,
                code: "NoStorageKeys".to_string(),
                message: format!("{resource}: listKeys returned no keys"),
            })
    }
}
