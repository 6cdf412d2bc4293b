mod types;

pub use types::*;

use anyhow::{Context, Result};
use std::path::Path;

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let mut config: Config = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    validate_config(&config)?;

    normalize_extensions(&mut config);

    Ok(config)
}

/// Load config from default locations or return default config
pub fn load_config_or_default(custom_path: Option<&Path>) -> Result<Config> {
    if let Some(path) = custom_path {
        return load_config(path);
    }

    // Try default locations
    let default_paths = ["./remuxer.toml", "~/.config/remuxer/config.toml"];

    for path_str in default_paths {
        let path = shellexpand::tilde(path_str);
        let path = Path::new(path.as_ref());
        if path.exists() {
            tracing::debug!("Using config file {:?}", path);
            return load_config(path);
        }
    }

    Ok(Config::default())
}

/// Lowercase extensions and strip any leading dot.
fn normalize_extensions(config: &mut Config) {
    config.remux.extension = config
        .remux
        .extension
        .trim_start_matches('.')
        .to_lowercase();

    for ext in config.batch.extensions.iter_mut() {
        *ext = ext.trim_start_matches('.').to_lowercase();
    }
}

/// Validate configuration
fn validate_config(config: &Config) -> Result<()> {
    if config.remux.lookahead == 0 {
        anyhow::bail!("remux.lookahead must be at least 1");
    }

    if config.remux.extension.trim_start_matches('.').is_empty() {
        anyhow::bail!("remux.extension cannot be empty");
    }

    if config.batch.extensions.is_empty() {
        tracing::warn!("batch.extensions is empty, batch runs will find no files");
    }

    let cores = num_cpus::get();
    if config.batch.max_jobs > cores {
        tracing::warn!(
            "batch.max_jobs = {} exceeds {} available cores and will be capped",
            config.batch.max_jobs,
            cores
        );
    }

    Ok(())
}
