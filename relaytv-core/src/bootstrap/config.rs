//! Configuration loading

use anyhow::Result;
use tracing::info;

use crate::Config;

/// Load configuration from config file or environment variables
///
/// Config file search order:
/// 1. `RELAYTV_CONFIG_PATH` environment variable (explicit path)
/// 2. ./config.yaml (current working directory)
/// 3. /config/config.yaml (Kubernetes mount path)
/// 4. Fall back to environment variables only
pub fn load_config() -> Result<Config> {
    let config_path = std::env::var("RELAYTV_CONFIG_PATH")
        .ok()
        .filter(|p| std::path::Path::new(p).exists())
        .or_else(|| {
            let cwd = "config.yaml";
            if std::path::Path::new(cwd).exists() {
                Some(cwd.to_string())
            } else {
                None
            }
        })
        .or_else(|| {
            let k8s = "/config/config.yaml";
            if std::path::Path::new(k8s).exists() {
                Some(k8s.to_string())
            } else {
                None
            }
        });

    let config = if let Some(path) = config_path {
        eprintln!("Loading config from {path}");
        match Config::from_file(&path) {
            Ok(cfg) => cfg,
            Err(e) => {
                eprintln!("Failed to load {path}: {e}");
                eprintln!("Falling back to environment variables");
                Config::from_env().unwrap_or_default()
            }
        }
    } else {
        eprintln!("No config file found, using environment variables");
        Config::from_env().unwrap_or_else(|e| {
            eprintln!("Failed to load config: {e}");
            eprintln!("Using default configuration");
            Config::default()
        })
    };

    // Fail fast on misconfigurations
    if let Err(errors) = config.validate() {
        for error in &errors {
            tracing::error!("Config validation error: {}", error);
        }
        return Err(anyhow::anyhow!(
            "Configuration validation failed with {} error(s): {}",
            errors.len(),
            errors.join("; ")
        ));
    }

    info!("Configuration loaded and validated successfully");
    info!("HTTP address: {}", config.http_address());

    Ok(config)
}
