//! Key Vault data-plane clients: key lookup/creation and RSA crypto

use std::sync::Arc;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde_json::{json, Value};
use tracing::debug;

use groundwork_core::{Error, KeyHandle, Result};

use crate::auth::TokenCredential;
use crate::rest::{default_http_client, expect_success, json_body, transport_error};

/// Token resource for every data-plane call.
pub const VAULT_RESOURCE: &str = "https://vault.azure.net";

const API_VERSION: &str = "7.4";

/// Encryption scheme bound to the provisioned key.
const ALGORITHM: &str = "RSA1_5";

/// Key management against one vault endpoint.
pub struct KeyClient {
    http: reqwest::Client,
    credential: Arc<dyn TokenCredential>,
    vault_uri: String,
}

impl KeyClient {
    pub fn new(credential: Arc<dyn TokenCredential>, vault_uri: impl Into<String>) -> Result<Self> {
        Ok(Self {
            http: default_http_client()?,
            credential,
            vault_uri: vault_uri.into().trim_end_matches('/').to_string(),
        })
    }

    /// Explicit lookup: `Ok(None)` when the key does not exist, so the
    /// create-or-skip decision is an ordinary branch in the caller. Any
    /// other failure (auth, throttling) propagates and must never be
    /// taken as a cue to create.
    pub async fn find_key(&self, name: &str) -> Result<Option<KeyHandle>> {
        let resource = format!("key {name}");
        let url = format!("{}/keys/{name}?api-version={API_VERSION}", self.vault_uri);
        let token = self.credential.token(VAULT_RESOURCE).await?;

        let resp = self
            .http
            .get(&url)
            .bearer_auth(token.expose())
            .send()
            .await
            .map_err(|e| transport_error(e, &resource))?;
        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let resp = expect_success(resp, &resource).await?;
        let body = json_body(resp, &resource).await?;
        Ok(Some(handle_from_body(&body)?))
    }

    /// Create an RSA key with the vault's default parameters.
    pub async fn create_rsa_key(&self, name: &str) -> Result<KeyHandle> {
        let resource = format!("key {name}");
        let url = format!(
            "{}/keys/{name}/create?api-version={API_VERSION}",
            self.vault_uri
        );
        let token = self.credential.token(VAULT_RESOURCE).await?;

        debug!("creating RSA {resource} in {}", self.vault_uri);
        let resp = self
            .http
            .post(&url)
            .bearer_auth(token.expose())
            .json(&json!({ "kty": "RSA" }))
            .send()
            .await
            .map_err(|e| transport_error(e, &resource))?;
        let resp = expect_success(resp, &resource).await?;
        let body = json_body(resp, &resource).await?;
        handle_from_body(&body)
    }
}

fn handle_from_body(body: &Value) -> Result<KeyHandle> {
    let kid = body
        .pointer("/key/kid")
        .and_then(Value::as_str)
        .ok_or_else(|| Error::Api {
            status: 0,
            code: "MissingKid".to_string(),
            message: "vault key response carries no key identifier".to_string(),
        })?;
    KeyHandle::parse(kid)
}

/// Remote RSA operations on one specific key version.
///
/// The handle is read-only for the lifetime of the client, so instances
/// are safe to share across tasks.
pub struct KeyCryptoClient {
    http: reqwest::Client,
    credential: Arc<dyn TokenCredential>,
    key: KeyHandle,
}

impl KeyCryptoClient {
    pub fn new(credential: Arc<dyn TokenCredential>, key: KeyHandle) -> Result<Self> {
        Ok(Self {
            http: default_http_client()?,
            credential,
            key,
        })
    }

    pub fn key(&self) -> &KeyHandle {
        &self.key
    }

    pub async fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>> {
        self.invoke("encrypt", plaintext).await
    }

    pub async fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>> {
        self.invoke("decrypt", ciphertext).await
    }

    async fn invoke(&self, operation: &str, payload: &[u8]) -> Result<Vec<u8>> {
        let resource = format!("key {} {operation}", self.key.name);
        let url = format!(
            "{}/keys/{}/{}/{operation}?api-version={API_VERSION}",
            self.key.vault_uri, self.key.name, self.key.version
        );
        let token = self.credential.token(VAULT_RESOURCE).await?;

        let resp = self
            .http
            .post(&url)
            .bearer_auth(token.expose())
            .json(&json!({
                "alg": ALGORITHM,
                "value": URL_SAFE_NO_PAD.encode(payload),
            }))
            .send()
            .await
            .map_err(|e| transport_error(e, &resource))?;

        // The vault reports ciphertext it cannot process (wrong key,
        // corrupted payload) as a 400; that is a hard crypto failure
        // here, not a generic API error.
        if resp.status() == reqwest::StatusCode::BAD_REQUEST {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::crypto(format!("{resource} rejected: {body}")));
        }
        let resp = expect_success(resp, &resource).await?;
        let body = json_body(resp, &resource).await?;

        let value = body
            .get("value")
            .and_then(Value::as_str)
            .ok_or_else(|| Error::crypto(format!("{resource} returned no value")))?;
        URL_SAFE_NO_PAD
            .decode(value)
            .map_err(|_| Error::crypto(format!("{resource} returned malformed base64url")))
    }
}
