// Configuration module for the Chronicle Quest proxy server

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Overrides the config file location.
pub const CONFIG_PATH_ENV: &str = "CHRONICLE_PROXY_CONFIG";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct AppConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_upstream_timeout_secs")]
    pub upstream_timeout_secs: u64,

    /// Outbound HTTP proxy for OpenRouter calls; empty means direct.
    #[serde(default)]
    pub proxy_url: String,

    #[serde(default)]
    pub debug: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            upstream_timeout_secs: default_upstream_timeout_secs(),
            proxy_url: String::new(),
            debug: false,
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_upstream_timeout_secs() -> u64 {
    60
}

impl AppConfig {
    pub fn bind_addr(&self) -> String {
        let host = if self.host.is_empty() {
            "0.0.0.0"
        } else {
            &self.host
        };
        format!("{}:{}", host, self.port)
    }

    pub fn upstream_timeout(&self) -> Duration {
        Duration::from_secs(self.upstream_timeout_secs.max(1))
    }

    pub fn proxy_url(&self) -> Option<&str> {
        Some(self.proxy_url.trim()).filter(|url| !url.is_empty())
    }
}

/// `$CHRONICLE_PROXY_CONFIG`, else `<config dir>/chronicle-quest/config.yaml`.
pub fn resolve_config_path() -> PathBuf {
    if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
        if !path.is_empty() {
            return PathBuf::from(path);
        }
    }

    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("chronicle-quest")
        .join("config.yaml")
}

/// Where a loaded config came from.
#[derive(Debug)]
pub enum ConfigOrigin {
    File,
    DefaultWritten,
    /// Defaults are in use but could not be persisted.
    DefaultUnsaved(anyhow::Error),
}

/// Reads the config file, writing one with defaults when it does not exist.
pub fn load_config(path: &Path) -> Result<(AppConfig, ConfigOrigin)> {
    if path.exists() {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let config = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config {}", path.display()))?;
        return Ok((config, ConfigOrigin::File));
    }

    let config = AppConfig::default();
    let origin = match write_default(path, &config) {
        Ok(()) => ConfigOrigin::DefaultWritten,
        Err(e) => ConfigOrigin::DefaultUnsaved(e),
    };
    Ok((config, origin))
}

fn write_default(path: &Path, config: &AppConfig) -> Result<()> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)?;
    }
    std::fs::write(path, serde_yaml::to_string(config)?)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("chronicle-proxy-{}-{}", name, uuid::Uuid::new_v4()))
            .join("config.yaml")
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let config: AppConfig = serde_yaml::from_str("port: 9000\nproxy-url: http://127.0.0.1:3128\n").unwrap();
        assert_eq!(config.port, 9000);
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.upstream_timeout_secs, 60);
        assert_eq!(config.proxy_url(), Some("http://127.0.0.1:3128"));
        assert!(!config.debug);
    }

    #[test]
    fn test_bind_addr_defaults_to_all_interfaces_when_host_empty() {
        let config = AppConfig {
            host: String::new(),
            ..AppConfig::default()
        };
        assert_eq!(config.bind_addr(), "0.0.0.0:8080");
    }

    #[test]
    fn test_upstream_timeout_has_floor() {
        let config = AppConfig {
            upstream_timeout_secs: 0,
            ..AppConfig::default()
        };
        assert_eq!(config.upstream_timeout(), Duration::from_secs(1));
    }

    #[test]
    fn test_load_config_writes_default_when_missing() {
        let path = temp_path("missing");
        let (config, origin) = load_config(&path).unwrap();
        assert_eq!(config, AppConfig::default());
        assert!(matches!(origin, ConfigOrigin::DefaultWritten));
        assert!(path.exists());

        let (reloaded, origin) = load_config(&path).unwrap();
        assert_eq!(reloaded, config);
        assert!(matches!(origin, ConfigOrigin::File));
        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn test_load_config_reports_bad_yaml() {
        let path = temp_path("bad");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "port: [not a number").unwrap();

        let err = load_config(&path).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config"));
        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }
}
