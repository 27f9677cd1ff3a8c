//! # Configuration
//!
//! Persisted at `.matchdeck/config.json`, then overridden by `MATCHDECK_*`
//! environment variables. The API key is only ever read from the
//! environment and never written back to disk.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::scan::MAX_PHASE_SCALE;
use crate::state::db::DEFAULT_DB_PATH;

pub const CONFIG_PATH: &str = ".matchdeck/config.json";

/// Where the resolver and payload fetcher live
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendMode {
    /// Local SQLite directory and payload store
    #[default]
    Local,
    /// Hosted backend functions over HTTP
    Remote,
}

impl BackendMode {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "local" => Some(Self::Local),
            "remote" => Some(Self::Remote),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchdeckConfig {
    pub backend: BackendMode,
    /// Base URL of the hosted backend, required for `remote`
    pub remote_url: Option<String>,
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    pub db_path: PathBuf,
    pub port: u16,
    pub http_timeout_secs: u64,
    /// Multiplier applied to every scan phase duration
    pub phase_scale: f32,
}

impl Default for MatchdeckConfig {
    fn default() -> Self {
        Self {
            backend: BackendMode::Local,
            remote_url: None,
            api_key: None,
            db_path: PathBuf::from(DEFAULT_DB_PATH),
            port: 8080,
            http_timeout_secs: 30,
            phase_scale: 1.0,
        }
    }
}

/// Partial update, as sent by `PATCH`-style callers
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backend: Option<BackendMode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub db_path: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub http_timeout_secs: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phase_scale: Option<f32>,
}

impl MatchdeckConfig {
    /// Load from the default location with environment overrides applied
    pub async fn load() -> Self {
        let mut config = Self::load_from(CONFIG_PATH).await;
        config.apply_env();
        config
    }

    /// Load from `path`. A missing or unreadable file yields defaults.
    pub async fn load_from<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        Self::try_load_from(path).await.unwrap_or_else(|e| {
            tracing::warn!("Ignoring config {}: {:#}", path.display(), e);
            Self::default()
        })
    }

    /// Load from `path`, failing on a file that exists but cannot be read
    /// or parsed. A missing file yields defaults.
    pub async fn try_load_from<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Could not read config {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Config {} is not valid JSON", path.display()))
    }

    pub async fn save(&self) -> Result<()> {
        self.save_to(CONFIG_PATH).await
    }

    pub async fn save_to<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        let content = serde_json::to_string_pretty(self)?;
        tokio::fs::write(path, content)
            .await
            .with_context(|| format!("Failed to write config {}", path.display()))
    }

    pub fn merge(&mut self, patch: ConfigPatch) {
        if let Some(backend) = patch.backend {
            self.backend = backend;
        }
        if patch.remote_url.is_some() {
            self.remote_url = patch.remote_url;
        }
        if let Some(db_path) = patch.db_path {
            self.db_path = db_path;
        }
        if let Some(port) = patch.port {
            self.port = port;
        }
        if let Some(timeout) = patch.http_timeout_secs {
            self.http_timeout_secs = timeout;
        }
        if let Some(scale) = patch.phase_scale {
            self.phase_scale = scale;
        }
    }

    /// Apply `MATCHDECK_*` overrides from the process environment
    pub fn apply_env(&mut self) {
        self.apply_env_from(|key| std::env::var(key).ok());
    }

    pub fn apply_env_from<F: Fn(&str) -> Option<String>>(&mut self, lookup: F) {
        if let Some(mode) = lookup("MATCHDECK_BACKEND") {
            match BackendMode::parse(&mode) {
                Some(mode) => self.backend = mode,
                None => tracing::warn!("Ignoring unknown MATCHDECK_BACKEND '{}'", mode),
            }
        }
        if let Some(url) = lookup("MATCHDECK_REMOTE_URL").filter(|u| !u.trim().is_empty()) {
            self.remote_url = Some(url);
        }
        if let Some(key) = lookup("MATCHDECK_API_KEY").filter(|k| !k.trim().is_empty()) {
            self.api_key = Some(key);
        }
        if let Some(path) = lookup("MATCHDECK_DB_PATH").filter(|p| !p.trim().is_empty()) {
            self.db_path = PathBuf::from(path);
        }
        if let Some(port) = lookup("MATCHDECK_PORT") {
            match port.trim().parse() {
                Ok(port) => self.port = port,
                Err(_) => tracing::warn!("Ignoring invalid MATCHDECK_PORT '{}'", port),
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.backend == BackendMode::Remote {
            let Some(remote_url) = &self.remote_url else {
                bail!("backend 'remote' requires remote_url (or MATCHDECK_REMOTE_URL)");
            };
            url::Url::parse(remote_url)
                .with_context(|| format!("remote_url '{}' is not a valid URL", remote_url))?;
        }
        if !(0.0..=MAX_PHASE_SCALE).contains(&self.phase_scale) {
            bail!("phase_scale must be between 0 and {}", MAX_PHASE_SCALE);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[tokio::test]
    async fn test_missing_file_gives_defaults() {
        let path = std::env::temp_dir().join(format!("matchdeck-missing-{}.json", uuid::Uuid::new_v4()));
        assert_eq!(MatchdeckConfig::load_from(&path).await, MatchdeckConfig::default());
    }

    #[tokio::test]
    async fn test_invalid_file_fails_strict_load() {
        let dir = std::env::temp_dir().join(format!("matchdeck-invalid-{}", uuid::Uuid::new_v4()));
        let path = dir.join("config.json");
        tokio::fs::create_dir_all(&dir).await.unwrap();
        tokio::fs::write(&path, "{ not json").await.unwrap();

        assert!(MatchdeckConfig::try_load_from(&path).await.is_err());
        assert_eq!(MatchdeckConfig::load_from(&path).await, MatchdeckConfig::default());

        let _ = tokio::fs::remove_dir_all(dir).await;
    }

    #[tokio::test]
    async fn test_save_and_load_skips_api_key() {
        let dir = std::env::temp_dir().join(format!("matchdeck-config-{}", uuid::Uuid::new_v4()));
        let path = dir.join("config.json");

        let config = MatchdeckConfig {
            backend: BackendMode::Remote,
            remote_url: Some("https://api.example.com".to_string()),
            api_key: Some("secret".to_string()),
            port: 9090,
            ..MatchdeckConfig::default()
        };
        config.save_to(&path).await.unwrap();

        let written = tokio::fs::read_to_string(&path).await.unwrap();
        assert!(!written.contains("secret"));

        let loaded = MatchdeckConfig::load_from(&path).await;
        assert_eq!(loaded.backend, BackendMode::Remote);
        assert_eq!(loaded.port, 9090);
        assert_eq!(loaded.api_key, None);

        let _ = tokio::fs::remove_dir_all(dir).await;
    }

    #[test]
    fn test_merge_only_overrides_present_fields() {
        let mut config = MatchdeckConfig::default();
        config.merge(ConfigPatch {
            port: Some(3000),
            phase_scale: Some(0.5),
            ..ConfigPatch::default()
        });

        assert_eq!(config.port, 3000);
        assert_eq!(config.phase_scale, 0.5);
        assert_eq!(config.backend, BackendMode::Local);
        assert_eq!(config.http_timeout_secs, 30);
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("MATCHDECK_BACKEND", "Remote"),
            ("MATCHDECK_REMOTE_URL", "https://api.example.com"),
            ("MATCHDECK_API_KEY", "sk_test"),
            ("MATCHDECK_PORT", "not-a-port"),
        ]);
        let mut config = MatchdeckConfig::default();
        config.apply_env_from(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.backend, BackendMode::Remote);
        assert_eq!(config.api_key.as_deref(), Some("sk_test"));
        assert_eq!(config.port, 8080);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_phase_scale_bounds() {
        for scale in [0.0, 0.5, MAX_PHASE_SCALE] {
            let config = MatchdeckConfig {
                phase_scale: scale,
                ..MatchdeckConfig::default()
            };
            assert!(config.validate().is_ok(), "scale {scale}");
        }
        for scale in [-1.0, 1e30, f32::NAN, f32::INFINITY] {
            let config = MatchdeckConfig {
                phase_scale: scale,
                ..MatchdeckConfig::default()
            };
            assert!(config.validate().is_err(), "scale {scale}");
        }
    }

    #[test]
    fn test_remote_requires_url() {
        let config = MatchdeckConfig {
            backend: BackendMode::Remote,
            ..MatchdeckConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
