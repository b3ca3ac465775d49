use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Global configuration loaded from `~/.config/recfetch/config.toml`.
///
/// The retry window and the backoff base/cap are fixed and deliberately not
/// part of this file; see [`crate::retry`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecfetchConfig {
    /// Number of identifiers fetched concurrently.
    pub concurrency: usize,
    /// Maximum outbound requests per second across all workers.
    pub rate_limit: f64,
    /// Per-attempt HTTP timeout in seconds.
    pub timeout_secs: f64,
    /// User-Agent header sent with every request.
    pub user_agent: String,
    /// URL template; `{id}` is replaced with the identifier.
    pub url_template: String,
    /// Query parameter name used when authenticating with an API key.
    pub api_key_name: String,
}

impl Default for RecfetchConfig {
    fn default() -> Self {
        Self {
            concurrency: 8,
            rate_limit: 10.0,
            timeout_secs: 15.0,
            user_agent: "record-export/1.0".to_string(),
            url_template: "https://api.hubapi.com/engagements/v1/engagements/{id}".to_string(),
            api_key_name: "hapikey".to_string(),
        }
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("recfetch")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<RecfetchConfig> {
    load_or_init_at(&config_path()?)
}

/// Like [`load_or_init`] but at an explicit path.
pub fn load_or_init_at(path: &Path) -> Result<RecfetchConfig> {
    if !path.exists() {
        let default_cfg = RecfetchConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, toml)
            .with_context(|| format!("failed to write default config: {}", path.display()))?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data = fs::read_to_string(path)
        .with_context(|| format!("failed to read config: {}", path.display()))?;
    let cfg: RecfetchConfig = toml::from_str(&data)
        .with_context(|| format!("invalid config: {}", path.display()))?;
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_values() {
        let cfg = RecfetchConfig::default();
        assert_eq!(cfg.concurrency, 8);
        assert!((cfg.rate_limit - 10.0).abs() < 1e-9);
        assert!((cfg.timeout_secs - 15.0).abs() < 1e-9);
        assert!(cfg.url_template.contains("{id}"));
        assert_eq!(cfg.api_key_name, "hapikey");
    }

    #[test]
    fn config_toml_custom_values() {
        let toml = r#"
            concurrency = 2
            rate_limit = 4.5
            timeout_secs = 30.0
            user_agent = "exporter/2.0"
            url_template = "https://api.example.com/records/{id}"
            api_key_name = "key"
        "#;
        let cfg: RecfetchConfig = toml::from_str(toml).unwrap();
        assert_eq!(cfg.concurrency, 2);
        assert!((cfg.rate_limit - 4.5).abs() < 1e-9);
        assert_eq!(cfg.user_agent, "exporter/2.0");
        assert_eq!(cfg.api_key_name, "key");
    }

    #[test]
    fn load_or_init_creates_default_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let cfg = load_or_init_at(&path).unwrap();
        assert!(path.exists());
        assert_eq!(cfg.concurrency, RecfetchConfig::default().concurrency);

        fs::write(&path, toml::to_string_pretty(&RecfetchConfig {
            concurrency: 3,
            ..RecfetchConfig::default()
        })
        .unwrap())
        .unwrap();
        assert_eq!(load_or_init_at(&path).unwrap().concurrency, 3);
    }

    #[test]
    fn load_or_init_rejects_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "concurrency = \"lots\"").unwrap();
        assert!(load_or_init_at(&path).is_err());
    }
}
