use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};

use crate::error::RockhoundError;

pub const DEFAULT_CONFIG_FILE: &str = "rockhound.json";
pub const DATA_DIR_ENV: &str = "ROCKHOUND_DATA_DIR";
pub const DEFAULT_TIMEOUT_SECS: u64 = 600;

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub schema_version: Option<u32>,
    #[serde(default)]
    pub cache_dir: Option<String>,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    #[serde(default)]
    pub archives: BTreeMap<String, ArchiveOverride>,
}

/// Replaces the download location and/or checksum of a registered archive.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct ArchiveOverride {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub sha256: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub schema_version: u32,
    pub cache_dir: Option<Utf8PathBuf>,
    pub timeout: Duration,
    pub archives: BTreeMap<String, ArchiveOverride>,
}

impl Default for ResolvedConfig {
    fn default() -> Self {
        Self {
            schema_version: 1,
            cache_dir: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            archives: BTreeMap::new(),
        }
    }
}

pub struct ConfigLoader;

impl ConfigLoader {
    /// Loads the config file and applies environment overrides.
    ///
    /// An explicit path must exist. Without one, `rockhound.json` in the
    /// current directory is used when present and defaults otherwise.
    pub fn resolve(path: Option<&str>) -> Result<ResolvedConfig, RockhoundError> {
        let config_path = match path {
            Some(path) => PathBuf::from(path),
            None => PathBuf::from(DEFAULT_CONFIG_FILE),
        };

        let config = if path.is_none() && !config_path.exists() {
            Config::default()
        } else {
            let content = fs::read_to_string(&config_path)
                .map_err(|_| RockhoundError::ConfigRead(config_path.clone()))?;
            serde_json::from_str(&content)
                .map_err(|err| RockhoundError::ConfigParse(err.to_string()))?
        };

        let mut resolved = Self::resolve_config(config)?;
        Self::apply_env(&mut resolved, std::env::var(DATA_DIR_ENV).ok());
        Ok(resolved)
    }

    pub fn resolve_config(config: Config) -> Result<ResolvedConfig, RockhoundError> {
        let schema_version = config.schema_version.unwrap_or(1);
        let cache_dir = config
            .cache_dir
            .filter(|dir| !dir.trim().is_empty())
            .map(Utf8PathBuf::from);
        let timeout = Duration::from_secs(config.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS));

        let archives = config
            .archives
            .into_iter()
            .map(|(name, entry)| {
                let sha256 = entry
                    .sha256
                    .map(|hash| normalize_sha256(&hash))
                    .transpose()?;
                Ok((
                    name,
                    ArchiveOverride {
                        url: entry.url,
                        sha256,
                    },
                ))
            })
            .collect::<Result<BTreeMap<_, _>, RockhoundError>>()?;

        Ok(ResolvedConfig {
            schema_version,
            cache_dir,
            timeout,
            archives,
        })
    }

    pub fn apply_env(config: &mut ResolvedConfig, data_dir: Option<String>) {
        if let Some(dir) = data_dir.filter(|dir| !dir.trim().is_empty()) {
            config.cache_dir = Some(Utf8PathBuf::from(dir.trim()));
        }
    }
}

fn normalize_sha256(value: &str) -> Result<String, RockhoundError> {
    let normalized = value.trim().to_ascii_lowercase();
    let is_valid = normalized.len() == 64 && normalized.chars().all(|ch| ch.is_ascii_hexdigit());
    if !is_valid {
        return Err(RockhoundError::ConfigParse(format!(
            "invalid sha256 checksum: {value}"
        )));
    }
    Ok(normalized)
}
