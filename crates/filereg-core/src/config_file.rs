//! Optional TOML settings: `[server]` and `[display]`, every key optional.
//!
//! The user file lives in the platform config directory; a `.filereg.toml` in
//! the working directory overrides it key by key.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Name of the per-directory override file.
pub const LOCAL_CONFIG_NAME: &str = ".filereg.toml";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigFile {
    pub server: Option<ServerConfig>,
    pub display: Option<DisplayConfig>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    pub base_url: Option<String>,
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayConfig {
    pub color: Option<bool>,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("no platform config directory")]
    NoConfigDir,
    #[error("cannot write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot encode config: {0}")]
    Encode(#[from] toml::ser::Error),
}

impl ServerConfig {
    fn overlay(self, top: Self) -> Self {
        Self {
            base_url: top.base_url.or(self.base_url),
            timeout_secs: top.timeout_secs.or(self.timeout_secs),
        }
    }
}

impl DisplayConfig {
    fn overlay(self, top: Self) -> Self {
        Self {
            color: top.color.or(self.color),
        }
    }
}

/// `<config_dir>/filereg/config.toml`, if the platform has a config directory.
pub fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("filereg").join("config.toml"))
}

/// The user file with the working-directory file layered on top.
pub fn load_config() -> ConfigFile {
    let sources = config_path()
        .into_iter()
        .chain(std::iter::once(PathBuf::from(LOCAL_CONFIG_NAME)));
    sources
        .filter_map(|p| load_from_path(&p))
        .fold(ConfigFile::default(), merge)
}

/// Read one config file. Missing files are silently skipped; malformed ones are
/// skipped with a warning.
pub fn load_from_path(path: &Path) -> Option<ConfigFile> {
    let text = std::fs::read_to_string(path).ok()?;
    toml::from_str(&text)
        .inspect_err(|e| {
            tracing::warn!(path = %path.display(), error = %e, "ignoring unparsable config file");
        })
        .ok()
}

/// Layer `top` over `base` key by key. A section present in neither stays absent.
pub fn merge(base: ConfigFile, top: ConfigFile) -> ConfigFile {
    fn layer<T: Default>(base: Option<T>, top: Option<T>, f: fn(T, T) -> T) -> Option<T> {
        match (base, top) {
            (None, None) => None,
            (b, t) => Some(f(b.unwrap_or_default(), t.unwrap_or_default())),
        }
    }
    ConfigFile {
        server: layer(base.server, top.server, ServerConfig::overlay),
        display: layer(base.display, top.display, DisplayConfig::overlay),
    }
}

/// Write `config` as TOML, creating missing parent directories.
pub fn save_to_path(config: &ConfigFile, path: &Path) -> Result<(), ConfigError> {
    let text = toml::to_string_pretty(config)?;
    let write = |source| ConfigError::Write {
        path: path.to_path_buf(),
        source,
    };
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir).map_err(write)?;
    }
    std::fs::write(path, text).map_err(write)
}

/// Write `config` to the user file and return where it went.
pub fn save_config(config: &ConfigFile) -> Result<PathBuf, ConfigError> {
    let path = config_path().ok_or(ConfigError::NoConfigDir)?;
    save_to_path(config, &path)?;
    Ok(path)
}
