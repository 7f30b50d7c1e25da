//! Configuration management for the offline router

use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{ConfigError, Result};
use crate::worker::routes::{RouteClass, RouteTable, prefix_overlaps_api};

/// Router configuration, stored as YAML at `~/.nearly/config.yaml`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Origin the app is served from; relative URLs resolve against it
    pub origin: String,

    /// Cache generation. Bumping it makes older stores stale on activation.
    pub cache_version: String,

    /// Static store name prefix (`{prefix}-{version}`)
    pub static_cache_prefix: String,

    /// API store name prefix (`{prefix}-{version}`)
    pub api_cache_prefix: String,

    /// App shell files cached verbatim during install
    pub static_manifest: Vec<String>,

    /// Paths under this prefix are served cache-first
    pub assets_prefix: String,

    /// Default notification title
    pub app_name: String,

    /// Icon attached to every notification
    pub notification_icon: String,

    /// Badge attached to every notification
    pub notification_badge: String,

    /// Background sync tag the worker recognises
    pub sync_tag: String,

    /// Network timeout for a single fetch
    pub request_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            origin: "http://localhost:5173".to_string(),
            cache_version: "v1".to_string(),
            static_cache_prefix: "nearly-static".to_string(),
            api_cache_prefix: "nearly-api".to_string(),
            static_manifest: default_manifest(),
            assets_prefix: "/assets/".to_string(),
            app_name: "Nearly".to_string(),
            notification_icon: "/icon-192.png".to_string(),
            notification_badge: "/icon-192.png".to_string(),
            sync_tag: "sync-posts".to_string(),
            request_timeout_secs: 30,
        }
    }
}

fn default_manifest() -> Vec<String> {
    ["/", "/index.html", "/manifest.json", "/icon-192.png", "/icon-512.png"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

impl Config {
    /// Get the default config file path
    pub fn default_path() -> Result<PathBuf> {
        let home = dirs::home_dir().ok_or(ConfigError::Invalid(
            "Could not determine home directory".to_string(),
        ))?;

        Ok(home.join(".nearly").join("config.yaml"))
    }

    /// Resolve an explicit path or fall back to the default location
    pub fn resolve_path(path: Option<&str>) -> Result<PathBuf> {
        match path {
            Some(p) => Ok(PathBuf::from(p)),
            None => Self::default_path(),
        }
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(ConfigError::NotFound.into());
        }

        let contents = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&contents).map_err(ConfigError::from)?;
        config.validate()?;

        Ok(config)
    }

    /// Load configuration, using defaults when no file exists yet
    pub fn load_or_default(path: Option<&str>) -> Result<Self> {
        let path = Self::resolve_path(path)?;
        match Self::load_from(&path) {
            Ok(config) => Ok(config),
            Err(crate::error::Error::Config(ConfigError::NotFound)) => {
                log::debug!("No config at {}, using defaults", path.display());
                Ok(Self::default())
            }
            Err(e) => Err(e),
        }
    }

    /// Save configuration to a specific path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents =
            serde_yaml::to_string(self).map_err(|e| ConfigError::SaveError(e.to_string()))?;

        std::fs::write(path, contents)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mut perms = std::fs::metadata(path)?.permissions();
            perms.set_mode(0o600);
            std::fs::set_permissions(path, perms)?;
        }

        Ok(())
    }

    /// Name of the static-asset store for the current version
    pub fn static_cache_name(&self) -> String {
        format!("{}-{}", self.static_cache_prefix, self.cache_version)
    }

    /// Name of the API-response store for the current version
    pub fn api_cache_name(&self) -> String {
        format!("{}-{}", self.api_cache_prefix, self.cache_version)
    }

    /// Parsed origin URL
    pub fn origin_url(&self) -> Result<Url> {
        Url::parse(&self.origin).map_err(|e| {
            ConfigError::Invalid(format!("origin '{}' is not a URL: {}", self.origin, e)).into()
        })
    }

    /// Check that the configuration can drive a router
    pub fn validate(&self) -> Result<()> {
        self.origin_url()?;

        if self.static_cache_name() == self.api_cache_name() {
            return Err(ConfigError::Invalid(
                "static and API cache names must differ".to_string(),
            )
            .into());
        }

        if !self.assets_prefix.starts_with('/') {
            return Err(ConfigError::Invalid(format!(
                "assets_prefix '{}' must start with '/'",
                self.assets_prefix
            ))
            .into());
        }

        if let Some(bad) = self.static_manifest.iter().find(|p| !p.starts_with('/')) {
            return Err(ConfigError::Invalid(format!(
                "manifest entry '{}' must be an absolute path",
                bad
            ))
            .into());
        }

        // Route classes must stay disjoint: no shell file may look like an API
        // resource, and the assets prefix may not cover or sit under one
        if prefix_overlaps_api(&self.assets_prefix) {
            return Err(ConfigError::Invalid(format!(
                "assets_prefix '{}' overlaps an API route",
                self.assets_prefix
            ))
            .into());
        }

        let routes = RouteTable::new(&self.static_manifest, &self.assets_prefix);
        let overlapping = self
            .static_manifest
            .iter()
            .find(|path| routes.matching_classes(path).contains(&RouteClass::ApiResource));
        if let Some(path) = overlapping {
            return Err(ConfigError::Invalid(format!(
                "static path '{}' overlaps an API route",
                path
            ))
            .into());
        }

        Ok(())
    }
}
