use std::io::Read;
use std::sync::Arc;

use anyhow::{anyhow, Result};
use camino::Utf8Path;

use groundwork_azure::{default_credential, KeyClient, TokenCredential};
use groundwork_core::config::BackendConfig;
use groundwork_provision::SecretCipher;

use crate::cli::SecretsCommands;

pub async fn run(cmd: SecretsCommands, config_path: Option<&Utf8Path>) -> Result<()> {
    let config = super::load_config(config_path)?;
    let credential = default_credential()?;
    let cipher = cipher_for(&config, Arc::clone(&credential)).await?;

    match cmd {
        SecretsCommands::Encrypt(args) => {
            let plaintext = value_or_stdin(args.value)?;
            println!("{}", cipher.encrypt(&plaintext).await?);
        }
        SecretsCommands::Decrypt(args) => {
            let literal = value_or_stdin(args.literal)?;
            println!("{}", cipher.decrypt(&literal).await?);
        }
    }
    Ok(())
}

/// Resolve the configured key's current version and build the cipher on it.
async fn cipher_for(
    config: &BackendConfig,
    credential: Arc<dyn TokenCredential>,
) -> Result<SecretCipher> {
    let keys = KeyClient::new(Arc::clone(&credential), config.vault_uri())?;
    let key = keys.find_key(&config.key_name).await?.ok_or_else(|| {
        anyhow!(
            "key '{}' not found in {}; run `groundwork bootstrap` first",
            config.key_name,
            config.vault_uri()
        )
    })?;
    Ok(SecretCipher::for_key(credential, key)?)
}

fn value_or_stdin(value: Option<String>) -> Result<String> {
    match value {
        Some(value) => Ok(value),
        None => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            Ok(buf.trim_end_matches(['\r', '\n']).to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_value_wins_over_stdin() {
        assert_eq!(
            value_or_stdin(Some("hello-secret".into())).unwrap(),
            "hello-secret"
        );
    }
}
