pub mod bind;
pub mod bootstrap;
pub mod secrets;

use anyhow::Result;
use camino::Utf8Path;
use groundwork_core::config::BackendConfig;

const DEFAULT_CONFIG: &str = "groundwork.yaml";

/// Load the backend config from the `--config` path or the default location.
pub fn load_config(path: Option<&Utf8Path>) -> Result<BackendConfig> {
    let path = path.map_or_else(|| Utf8Path::new(DEFAULT_CONFIG), |p| p);
    let config = BackendConfig::load(path.as_std_path())?;
    Ok(config)
}
