//! ARM control-plane client
//!
//! All management operations are subscription-scoped PUT/GET/POST calls
//! with an `api-version` query parameter and a bearer token for the ARM
//! resource. [`ArmClient`] carries the shared HTTP client, credential,
//! and subscription; the per-service clients wrap it.

mod resource_groups;
mod storage;
mod vaults;

pub use resource_groups::ResourceGroupClient;
pub use storage::StorageClient;
pub use vaults::VaultClient;

use std::sync::Arc;

use serde_json::Value;

use groundwork_core::{Result, SecretString};

use crate::auth::TokenCredential;
use crate::rest::{default_http_client, expect_success, json_body, transport_error};

/// Token resource for every management-plane call.
pub const ARM_RESOURCE: &str = "https://management.azure.com";

#[derive(Clone)]
pub struct ArmClient {
    http: reqwest::Client,
    credential: Arc<dyn TokenCredential>,
    subscription_id: String,
}

impl ArmClient {
    pub fn new(
        credential: Arc<dyn TokenCredential>,
        subscription_id: impl Into<String>,
    ) -> Result<Self> {
        Ok(Self {
            http: default_http_client()?,
            credential,
            subscription_id: subscription_id.into(),
        })
    }

    /// Subscription-scoped URL for `path` (no leading slash).
    pub(crate) fn url(&self, path: &str, api_version: &str) -> String {
        format!(
            "{ARM_RESOURCE}/subscriptions/{}/{path}?api-version={api_version}",
            self.subscription_id
        )
    }

    async fn bearer(&self) -> Result<SecretString> {
        self.credential.token(ARM_RESOURCE).await
    }

    pub(crate) async fn put_json(&self, url: &str, body: &Value, resource: &str) -> Result<Value> {
        let token = self.bearer().await?;
        let resp = self
            .http
            .put(url)
            .bearer_auth(token.expose())
            .json(body)
            .send()
            .await
            .map_err(|e| transport_error(e, resource))?;
        let resp = expect_success(resp, resource).await?;
        json_body(resp, resource).await
    }

    pub(crate) async fn get_json(&self, url: &str, resource: &str) -> Result<Value> {
        let token = self.bearer().await?;
        let resp = self
            .http
            .get(url)
            .bearer_auth(token.expose())
            .send()
            .await
            .map_err(|e| transport_error(e, resource))?;
        let resp = expect_success(resp, resource).await?;
        json_body(resp, resource).await
    }

    /// Lookup that reports absence as `Ok(None)` instead of an error.
    pub(crate) async fn get_optional(&self, url: &str, resource: &str) -> Result<Option<Value>> {
        let token = self.bearer().await?;
        let resp = self
            .http
            .get(url)
            .bearer_auth(token.expose())
            .send()
            .await
            .map_err(|e| transport_error(e, resource))?;
        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let resp = expect_success(resp, resource).await?;
        Ok(Some(json_body(resp, resource).await?))
    }

    pub(crate) async fn post_json(&self, url: &str, resource: &str) -> Result<Value> {
        let token = self.bearer().await?;
        let resp = self
            .http
            .post(url)
            .bearer_auth(token.expose())
            .header(reqwest::header::CONTENT_LENGTH, 0)
            .send()
            .await
            .map_err(|e| transport_error(e, resource))?;
        let resp = expect_success(resp, resource).await?;
        json_body(resp, resource).await
    }
}
