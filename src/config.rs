//! Store and server configuration

use std::path::PathBuf;

use serde::Deserialize;

use crate::constants::{DEFAULT_DB_PATH, DEFAULT_MAP_SIZE, MAX_GROUP_DEPTH};
use crate::error::{PermError, Result};

/// Settings for [`crate::LmdbStore`]
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub path: PathBuf,
    pub map_size: usize,
    /// Levels of group nesting followed when computing a closure
    pub max_group_depth: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig { path: PathBuf::from(DEFAULT_DB_PATH), map_size: DEFAULT_MAP_SIZE, max_group_depth: MAX_GROUP_DEPTH }
    }
}

impl StoreConfig {
    pub fn at(path: impl Into<PathBuf>) -> Self {
        StoreConfig { path: path.into(), ..Self::default() }
    }

    /// Defaults overridden by `PERMRES_DB`, `PERMRES_MAP_SIZE`, `PERMRES_MAX_GROUP_DEPTH`
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|k| std::env::var(k).ok())
    }

    pub(crate) fn from_lookup<F: Fn(&str) -> Option<String>>(get: F) -> Result<Self> {
        let mut c = Self::default();
        c.override_from(get)?;
        Ok(c)
    }

    fn override_from<F: Fn(&str) -> Option<String>>(&mut self, get: F) -> Result<()> {
        if let Some(p) = get("PERMRES_DB") {
            self.path = PathBuf::from(p);
        }
        if let Some(v) = get("PERMRES_MAP_SIZE") {
            self.map_size = parse_num("PERMRES_MAP_SIZE", &v)?;
        }
        if let Some(v) = get("PERMRES_MAX_GROUP_DEPTH") {
            self.max_group_depth = parse_num("PERMRES_MAX_GROUP_DEPTH", &v)?;
        }
        Ok(())
    }
}

/// Settings for the HTTP server binary
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
    pub store: StoreConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig { bind: "0.0.0.0:3000".into(), store: StoreConfig::default() }
    }
}

impl ServerConfig {
    /// Store settings from the environment, bind port from `PORT`
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|k| std::env::var(k).ok())
    }

    pub(crate) fn from_lookup<F: Fn(&str) -> Option<String>>(get: F) -> Result<Self> {
        let mut c = Self::default();
        c.override_from(get)?;
        Ok(c)
    }

    fn override_from<F: Fn(&str) -> Option<String>>(&mut self, get: F) -> Result<()> {
        self.store.override_from(&get)?;
        if let Some(p) = get("PORT") {
            self.bind = format!("0.0.0.0:{}", parse_num::<u16>("PORT", &p)?);
        }
        Ok(())
    }

    /// Parse a JSON config; missing fields keep their defaults
    #[cfg(feature = "server")]
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| PermError::invalid(format!("bad config: {}", e)))
    }

    /// File named by `PERMRES_CONFIG` (defaults if unset), then environment overrides
    #[cfg(feature = "server")]
    pub fn load() -> Result<Self> {
        let mut c = match std::env::var("PERMRES_CONFIG") {
            Ok(path) => {
                let text = std::fs::read_to_string(&path)
                    .map_err(|e| PermError::invalid(format!("cannot read {}: {}", path, e)))?;
                Self::from_json(&text)?
            }
            Err(_) => Self::default(),
        };
        c.override_from(|k| std::env::var(k).ok())?;
        Ok(c)
    }
}

fn parse_num<T: std::str::FromStr>(key: &str, v: &str) -> Result<T> {
    v.trim().parse().map_err(|_| PermError::invalid(format!("{} is not a number: '{}'", key, v)))
}
