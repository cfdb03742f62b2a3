//! Credential acquisition for Azure service calls
//!
//! One credential is resolved at process start and shared (read-only)
//! by every client. Two implementations cover the usual environments:
//! a service-principal client-credentials grant when the `AZURE_CLIENT_ID`
//! family of variables is set, and the Azure CLI's cached login otherwise.
//! Tokens are cached per resource with a refresh margin.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use base64::engine::general_purpose::{URL_SAFE, URL_SAFE_NO_PAD};
use base64::Engine;
use serde::Deserialize;
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::debug;

use groundwork_core::{Error, Result, SecretString};

use crate::rest::default_http_client;

/// Refresh tokens this long before they expire.
const REFRESH_MARGIN: Duration = Duration::from_secs(120);
/// Lifetime assumed when the token source reports no expiry.
const FALLBACK_LIFETIME: Duration = Duration::from_secs(300);

/// Supplies bearer tokens for a target resource
/// (e.g. `https://management.azure.com`).
#[async_trait]
pub trait TokenCredential: Send + Sync {
    async fn token(&self, resource: &str) -> Result<SecretString>;
}

struct CacheEntry {
    token: SecretString,
    expires_at: SystemTime,
}

#[derive(Default)]
struct TokenCache {
    entries: RwLock<HashMap<String, CacheEntry>>,
}

impl TokenCache {
    async fn get(&self, resource: &str) -> Option<SecretString> {
        let entries = self.entries.read().await;
        let entry = entries.get(resource)?;
        if entry.expires_at > SystemTime::now() + REFRESH_MARGIN {
            Some(entry.token.clone())
        } else {
            None
        }
    }

    async fn put(&self, resource: &str, token: SecretString, expires_at: SystemTime) {
        self.entries
            .write()
            .await
            .insert(resource.to_string(), CacheEntry { token, expires_at });
    }
}

/// Credential backed by `az account get-access-token`.
#[derive(Default)]
pub struct AzureCliCredential {
    cache: TokenCache,
}

#[derive(Deserialize)]
struct CliToken {
    #[serde(rename = "accessToken")]
    access_token: String,
    /// Unix timestamp, present in recent CLI versions
    #[serde(rename = "expires_on")]
    expires_on: Option<i64>,
}

impl AzureCliCredential {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TokenCredential for AzureCliCredential {
    async fn token(&self, resource: &str) -> Result<SecretString> {
        if let Some(token) = self.cache.get(resource).await {
            return Ok(token);
        }

        debug!("acquiring token for {resource} via Azure CLI");
        let output = tokio::process::Command::new("az")
            .args([
                "account",
                "get-access-token",
                "--resource",
                resource,
                "--output",
                "json",
            ])
            .output()
            .await
            .map_err(|e| Error::auth(format!("failed to run az: {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::auth(format!(
                "az account get-access-token failed: {}",
                stderr.trim()
            )));
        }

        let parsed: CliToken = serde_json::from_slice(&output.stdout)
            .map_err(|e| Error::auth(format!("unexpected az output: {e}")))?;

        let expires_at = parsed
            .expires_on
            .and_then(|secs| UNIX_EPOCH.checked_add(Duration::from_secs(secs.max(0) as u64)))
            .unwrap_or_else(|| SystemTime::now() + FALLBACK_LIFETIME);
        let token = SecretString::new(parsed.access_token);
        self.cache.put(resource, token.clone(), expires_at).await;
        Ok(token)
    }
}

/// Service-principal credential using the OAuth2 client-credentials grant.
pub struct ClientSecretCredential {
    http: reqwest::Client,
    tenant_id: String,
    client_id: String,
    client_secret: SecretString,
    cache: TokenCache,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: Option<u64>,
}

impl ClientSecretCredential {
    pub fn new(
        tenant_id: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: SecretString,
    ) -> Result<Self> {
        Ok(Self {
            http: default_http_client()?,
            tenant_id: tenant_id.into(),
            client_id: client_id.into(),
            client_secret,
            cache: TokenCache::default(),
        })
    }
}

#[async_trait]
impl TokenCredential for ClientSecretCredential {
    async fn token(&self, resource: &str) -> Result<SecretString> {
        if let Some(token) = self.cache.get(resource).await {
            return Ok(token);
        }

        debug!("acquiring token for {resource} via client credentials");
        let url = format!(
            "https://login.microsoftonline.com/{}/oauth2/v2.0/token",
            self.tenant_id
        );
        let scope = format!("{}/.default", resource.trim_end_matches('/'));
        let response = self
            .http
            .post(&url)
            .form(&[
                ("grant_type", "client_credentials"),
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.expose()),
                ("scope", scope.as_str()),
            ])
            .send()
            .await
            .map_err(|e| Error::auth(format!("token request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::auth(format!(
                "token endpoint returned HTTP {status}: {body}"
            )));
        }

        let parsed: TokenResponse = response
            .json()
            .await
            .map_err(|e| Error::auth(format!("malformed token response: {e}")))?;

        let lifetime = parsed
            .expires_in
            .map(Duration::from_secs)
            .unwrap_or(FALLBACK_LIFETIME);
        let token = SecretString::new(parsed.access_token);
        self.cache
            .put(resource, token.clone(), SystemTime::now() + lifetime)
            .await;
        Ok(token)
    }
}

/// Resolve the process-wide credential: service principal from the
/// environment when configured, Azure CLI otherwise.
pub fn default_credential() -> Result<Arc<dyn TokenCredential>> {
    let client_id = std::env::var("AZURE_CLIENT_ID").ok();
    let client_secret = std::env::var("AZURE_CLIENT_SECRET").ok();
    let tenant_id = std::env::var("AZURE_TENANT_ID").ok();

    match (client_id, client_secret, tenant_id) {
        (Some(id), Some(secret), Some(tenant)) => {
            debug!("using service principal credential from environment");
            Ok(Arc::new(ClientSecretCredential::new(
                tenant,
                id,
                SecretString::new(secret),
            )?))
        }
        _ => {
            debug!("using Azure CLI credential");
            Ok(Arc::new(AzureCliCredential::new()))
        }
    }
}

/// Extract the caller's directory object id from an access token.
///
/// Prefers the `oid` claim and falls back to `sub`, matching how the
/// grantee is identified when no explicit object id is supplied.
pub fn principal_object_id(token: &str) -> Result<String> {
    let payload = token
        .split('.')
        .nth(1)
        .ok_or_else(|| Error::auth("access token is not a JWT"))?;
    let bytes = URL_SAFE_NO_PAD
        .decode(payload)
        .or_else(|_| URL_SAFE.decode(payload))
        .map_err(|_| Error::auth("access token payload is not base64url"))?;
    let claims: Value = serde_json::from_slice(&bytes)
        .map_err(|_| Error::auth("access token payload is not JSON"))?;

    claims
        .get("oid")
        .or_else(|| claims.get("sub"))
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| Error::auth("access token carries neither oid nor sub claim"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fake_jwt(claims: Value) -> String {
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"none"}"#);
        let payload = URL_SAFE_NO_PAD.encode(claims.to_string().as_bytes());
        format!("{header}.{payload}.sig")
    }

    #[test]
    fn object_id_prefers_oid_claim() {
        let token = fake_jwt(json!({"oid": "a60745a7-184b-418e-9a1e-76f1e09ceb4b", "sub": "other"}));
        assert_eq!(
            principal_object_id(&token).unwrap(),
            "a60745a7-184b-418e-9a1e-76f1e09ceb4b"
        );
    }

    #[test]
    fn object_id_falls_back_to_sub() {
        let token = fake_jwt(json!({"sub": "subject-id"}));
        assert_eq!(principal_object_id(&token).unwrap(), "subject-id");
    }

    #[test]
    fn object_id_rejects_non_jwt_tokens() {
        assert!(matches!(
            principal_object_id("opaque-token").unwrap_err(),
            Error::Auth { .. }
        ));
    }

    #[test]
    fn object_id_rejects_claimless_tokens() {
        let token = fake_jwt(json!({"aud": "https://management.azure.com"}));
        assert!(principal_object_id(&token).is_err());
    }

    #[tokio::test]
    async fn token_cache_honours_expiry_margin() {
        let cache = TokenCache::default();
        cache
            .put(
                "https://management.azure.com",
                SecretString::new("fresh"),
                SystemTime::now() + Duration::from_secs(3600),
            )
            .await;
        cache
            .put(
                "https://vault.azure.net",
                SecretString::new("stale"),
                SystemTime::now() + Duration::from_secs(30),
            )
            .await;

        assert!(cache.get("https://management.azure.com").await.is_some());
        // Inside the refresh margin: treated as expired
        assert!(cache.get("https://vault.azure.net").await.is_none());
        assert!(cache.get("https://unknown").await.is_none());
    }
}
