pub mod analyze;
pub mod apps;
pub mod fetch;

use std::path::Path;

use sparkscope_core::SparkscopeConfig;
use sparkscope_state::StateStore;
use tracing::{debug, info};

const DEFAULT_CONFIG: &str = "sparkscope.toml";

/// An explicit path must exist; the implicit one may be absent.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<SparkscopeConfig> {
    let config = match path {
        Some(path) => SparkscopeConfig::from_file(path)?,
        None if Path::new(DEFAULT_CONFIG).is_file() => {
            SparkscopeConfig::from_file(Path::new(DEFAULT_CONFIG))?
        }
        None => {
            debug!("no {DEFAULT_CONFIG} found, using defaults");
            SparkscopeConfig::default()
        }
    };
    Ok(config)
}

/// Open the configured store, creating its parent directory if needed.
pub fn open_store(config: &SparkscopeConfig) -> anyhow::Result<StateStore> {
    let path = &config.store.path;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let store = StateStore::open(path)?;
    info!(path = %path.display(), "state store opened");
    Ok(store)
}

pub fn show_config(config: &SparkscopeConfig) -> anyhow::Result<()> {
    print!("{}", config.to_toml_string()?);
    Ok(())
}
