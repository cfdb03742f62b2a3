//! Key Vault control-plane operations

use serde_json::{json, Value};
use tracing::debug;

use groundwork_core::{Error, Result, VaultGrantee};

use super::ArmClient;
use crate::rest::{state_or_creating, wait_for_provisioning, POLL_INTERVAL, PROVISIONING_TIMEOUT};

const API_VERSION: &str = "2023-07-01";

pub struct VaultClient {
    arm: ArmClient,
}

impl VaultClient {
    pub fn new(arm: ArmClient) -> Self {
        Self { arm }
    }

    /// Create-or-update the vault with key permissions for `grantee`,
    /// wait until provisioning settles, and return the vault endpoint.
    pub async fn create_or_update(
        &self,
        resource_group: &str,
        name: &str,
        region: &str,
        grantee: &VaultGrantee,
    ) -> Result<String> {
        let resource = format!("vault {name}");
        let url = self.arm.url(
            &format!("resourceGroups/{resource_group}/providers/Microsoft.KeyVault/vaults/{name}"),
            API_VERSION,
        );

        let body = json!({
            "location": region,
            "properties": {
                "tenantId": grantee.tenant_id,
                "sku": { "family": "A", "name": "standard" },
                "accessPolicies": [{
                    "tenantId": grantee.tenant_id,
                    "objectId": grantee.object_id,
                    "permissions": {
                        "keys": ["list", "get", "create", "encrypt", "decrypt"]
                    }
                }]
            }
        });

        debug!("ensuring {resource} in {resource_group}");
        self.arm.put_json(&url, &body, &resource).await?;

        // The PUT is accepted before the vault endpoint is ready, and the
        // vault may not even be readable yet.
        let settled = wait_for_provisioning(&resource, PROVISIONING_TIMEOUT, POLL_INTERVAL, || async {
            Ok(state_or_creating(
                self.arm.get_optional(&url, &resource).await?,
            ))
        })
        .await?;

        settled
            .pointer("/properties/vaultUri")
            .and_then(Value::as_str)
            .map(|uri| uri.trim_end_matches('/').to_string())
            .ok_or_else(|| Error::Api {
                status: 0,
                code: "MissingVaultUri".to_string(),
                message: format!("{resource} reported no vaultUri"),
            })
    }
}
