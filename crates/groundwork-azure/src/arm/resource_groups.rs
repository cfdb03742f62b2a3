//! Resource-group operations

use serde_json::json;
use tracing::debug;

use groundwork_core::Result;

use super::ArmClient;

const API_VERSION: &str = "2021-04-01";

pub struct ResourceGroupClient {
    arm: ArmClient,
}

impl ResourceGroupClient {
    pub fn new(arm: ArmClient) -> Self {
        Self { arm }
    }

    /// Create-or-update the resource group. ARM treats repeated PUTs with
    /// identical bodies as a no-op update, so this is safe to re-run.
    pub async fn create_or_update(&self, name: &str, region: &str) -> Result<()> {
        let resource = format!("resource group {name}");
        let url = self.arm.url(&format!("resourcegroups/{name}"), API_VERSION);
        debug!("ensuring {resource} in {region}");
        self.arm
            .put_json(&url, &json!({ "location": region }), &resource)
            .await?;
        Ok(())
    }
}
