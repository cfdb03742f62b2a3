//! Secret cipher over a provisioned asymmetric key
//!
//! Sensitive configuration values are stored as base64 ciphertext
//! literals instead of plaintext; the literal format is standard base64
//! of the raw bytes the bound key's encryption scheme produced. The
//! cipher is bound to exactly one key for its lifetime - decrypting a
//! literal produced by any other key is a hard failure.

use std::sync::Arc;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;

use groundwork_azure::TokenCredential;
use groundwork_core::{Error, KeyHandle, Result};

use crate::azure::AzureKeyCipher;

/// Raw byte-level encryption against the bound key.
#[async_trait]
pub trait KeyCipher: Send + Sync {
    async fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>>;
    async fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>>;
}

/// String-level façade: UTF-8 in, base64 literal out, and back.
///
/// The backend handle is read-only, so a shared instance is safe to use
/// concurrently.
pub struct SecretCipher {
    backend: Arc<dyn KeyCipher>,
}

impl SecretCipher {
    pub fn new(backend: Arc<dyn KeyCipher>) -> Self {
        Self { backend }
    }

    /// Cipher bound to a vault key.
    pub fn for_key(credential: Arc<dyn TokenCredential>, key: KeyHandle) -> Result<Self> {
        Ok(Self::new(Arc::new(AzureKeyCipher::new(credential, key)?)))
    }

    /// Encrypt a short secret string into an embeddable literal.
    /// Callers must not assume the output is deterministic.
    pub async fn encrypt(&self, plaintext: &str) -> Result<String> {
        let ciphertext = self.backend.encrypt(plaintext.as_bytes()).await?;
        Ok(BASE64.encode(ciphertext))
    }

    /// Decrypt a literal produced by [`SecretCipher::encrypt`] against
    /// the same key.
    pub async fn decrypt(&self, literal: &str) -> Result<String> {
        let ciphertext = BASE64
            .decode(literal.trim())
            .map_err(|_| Error::crypto("secret literal is not valid base64"))?;
        let plaintext = self.backend.decrypt(&ciphertext).await?;
        String::from_utf8(plaintext)
            .map_err(|_| Error::crypto("decrypted secret is not valid UTF-8"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Symmetric stand-in for the remote key: XORs with a key byte and
    /// tags the ciphertext with a key id, so a wrong-key decryption is
    /// detected the way the vault would reject it.
    struct FakeKeyCipher {
        key_id: u8,
    }

    #[async_trait]
    impl KeyCipher for FakeKeyCipher {
        async fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>> {
            let mut out = vec![self.key_id];
            out.extend(plaintext.iter().map(|b| b ^ self.key_id));
            Ok(out)
        }

        async fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>> {
            match ciphertext.split_first() {
                Some((id, rest)) if *id == self.key_id => {
                    Ok(rest.iter().map(|b| b ^ self.key_id).collect())
                }
                _ => Err(Error::crypto("ciphertext was produced by a different key")),
            }
        }
    }

    fn cipher(key_id: u8) -> SecretCipher {
        SecretCipher::new(Arc::new(FakeKeyCipher { key_id }))
    }

    #[tokio::test]
    async fn round_trips_a_simple_secret() {
        let cipher = cipher(0x5a);
        let literal = cipher.encrypt("hello-secret").await.unwrap();
        assert_ne!(literal, "hello-secret");
        assert_eq!(cipher.decrypt(&literal).await.unwrap(), "hello-secret");
    }

    #[tokio::test]
    async fn round_trips_printable_ascii_up_to_4096_bytes() {
        let cipher = cipher(0x17);
        let printable: String = (0x20u8..=0x7e).map(char::from).collect();
        let long: String = printable.chars().cycle().take(4096).collect();

        for secret in [" ", "~", printable.as_str(), long.as_str()] {
            let literal = cipher.encrypt(secret).await.unwrap();
            assert_eq!(cipher.decrypt(&literal).await.unwrap(), secret);
        }
    }

    #[tokio::test]
    async fn literal_is_standard_base64() {
        let cipher = cipher(0x01);
        let literal = cipher.encrypt("value").await.unwrap();
        assert!(BASE64.decode(&literal).is_ok());
    }

    #[tokio::test]
    async fn rejects_non_base64_input() {
        let err = cipher(0x01).decrypt("not base64 !!!").await.unwrap_err();
        assert!(matches!(err, Error::Crypto { .. }));
    }

    #[tokio::test]
    async fn wrong_key_is_a_hard_failure() {
        let literal = cipher(0x01).encrypt("bound-to-key-one").await.unwrap();
        let err = cipher(0x02).decrypt(&literal).await.unwrap_err();
        assert!(matches!(err, Error::Crypto { .. }));
    }
}
