//! Configuration loader built on figment.
//!
//! Sources are layered, lowest to highest precedence:
//!
//! 1. Built-in defaults
//! 2. Profile-specific file (`ingot.{profile}.toml` / `.yaml`)
//! 3. Main file (`ingot.toml`, `config.toml`, or the yaml equivalents)
//! 4. Environment variables (`INGOT_` prefix, `__` separator:
//!    `INGOT_LOGGING__LEVEL=debug` → `logging.level`)
//! 5. Programmatic overrides via [`ConfigLoader::merge`]
//!
//! Which file formats are searched is controlled by the `toml-config`
//! (default) and `yaml-config` features.

use std::path::{Path, PathBuf};

use figment::Figment;
#[cfg(any(feature = "toml-config", feature = "yaml-config"))]
use figment::providers::Format;
#[cfg(feature = "toml-config")]
use figment::providers::Toml;
#[cfg(feature = "yaml-config")]
use figment::providers::Yaml;
use figment::providers::{Env, Serialized};
use tracing::{debug, info, warn};

use super::error::{ConfigError, ConfigResult};
use super::schema::HostConfig;

#[cfg(feature = "toml-config")]
const TOML_NAMES: &[&str] = &["ingot.toml", "config.toml"];
#[cfg(feature = "yaml-config")]
const YAML_NAMES: &[&str] = &["ingot.yaml", "ingot.yml", "config.yaml", "config.yml"];

/// Configuration loader with layered figment sources.
///
/// ```rust,ignore
/// let config = ConfigLoader::new()
///     .search_path("./config")
///     .profile("production")
///     .load()?;
/// ```
pub struct ConfigLoader {
    overrides: Figment,
    profile: Option<String>,
    search_paths: Vec<PathBuf>,
    config_file: Option<PathBuf>,
    load_env: bool,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    /// Creates a loader with default search behaviour.
    pub fn new() -> Self {
        Self {
            overrides: Figment::new(),
            profile: std::env::var("INGOT_PROFILE").ok(),
            search_paths: Vec::new(),
            config_file: None,
            load_env: true,
        }
    }

    /// Sets the configuration profile (e.g. `"production"`).
    pub fn profile(mut self, profile: impl Into<String>) -> Self {
        self.profile = Some(profile.into());
        self
    }

    /// Adds a directory to search for configuration files.
    pub fn search_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.search_paths.push(path.as_ref().to_path_buf());
        self
    }

    /// Adds the current directory to the search paths.
    pub fn with_current_dir(self) -> Self {
        match std::env::current_dir() {
            Ok(cwd) => self.search_path(cwd),
            Err(_) => self,
        }
    }

    /// Adds the user config directory (`~/.config/ingot`) to the search
    /// paths.
    pub fn with_user_config_dir(self) -> Self {
        match dirs::config_dir() {
            Some(dir) => self.search_path(dir.join("ingot")),
            None => self,
        }
    }

    /// Loads exactly this file instead of searching.
    pub fn file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_file = Some(path.as_ref().to_path_buf());
        self
    }

    /// Disables the environment variable layer.
    pub fn without_env(mut self) -> Self {
        self.load_env = false;
        self
    }

    /// Merges programmatic overrides (highest precedence).
    pub fn merge(mut self, config: HostConfig) -> Self {
        self.overrides = self.overrides.merge(Serialized::defaults(config));
        self
    }

    /// Loads and extracts the configuration.
    pub fn load(self) -> ConfigResult<HostConfig> {
        let figment = self.build()?;
        let config: HostConfig = figment
            .extract()
            .map_err(|e| ConfigError::Parse(e.to_string()))?;
        debug!(level = %config.logging.level, "configuration loaded");
        Ok(config)
    }

    fn build(self) -> ConfigResult<Figment> {
        let mut figment = Figment::from(Serialized::defaults(HostConfig::default()));

        if let Some(path) = &self.config_file {
            if !path.exists() {
                return Err(ConfigError::FileNotFound(path.clone()));
            }
            info!(path = %path.display(), "loading configuration file");
            figment = merge_file(figment, path)?;
        } else {
            figment = self.search_files(figment);
        }

        if self.load_env {
            figment = figment.merge(
                Env::prefixed("INGOT_")
                    .split("__")
                    .map(|key| key.as_str().replace("__", ".").into()),
            );
        }

        Ok(figment.merge(self.overrides))
    }

    fn search_files(&self, mut figment: Figment) -> Figment {
        let search_paths = if self.search_paths.is_empty() {
            let mut paths = Vec::new();
            if let Ok(cwd) = std::env::current_dir() {
                paths.push(cwd);
            }
            if let Some(dir) = dirs::config_dir() {
                paths.push(dir.join("ingot"));
            }
            paths
        } else {
            self.search_paths.clone()
        };

        let mut found = false;
        for dir in &search_paths {
            #[cfg(feature = "toml-config")]
            {
                found |= self.merge_format(&mut figment, dir, TOML_NAMES, |fig, path| {
                    fig.merge(Toml::file(path))
                });
            }
            #[cfg(feature = "yaml-config")]
            {
                found |= self.merge_format(&mut figment, dir, YAML_NAMES, |fig, path| {
                    fig.merge(Yaml::file(path))
                });
            }
            if found {
                break;
            }
        }

        if !found {
            warn!("no configuration file found, using defaults");
        }
        figment
    }

    /// Merges the first matching base name in `dir`, trying a
    /// profile-specific variant first.
    #[cfg(any(feature = "toml-config", feature = "yaml-config"))]
    fn merge_format<F>(
        &self,
        figment: &mut Figment,
        dir: &Path,
        base_names: &[&str],
        merge: F,
    ) -> bool
    where
        F: Fn(Figment, &Path) -> Figment,
    {
        for base_name in base_names {
            let Some((stem, ext)) = base_name.rsplit_once('.') else {
                continue;
            };

            if let Some(profile) = &self.profile {
                let profile_path = dir.join(format!("{stem}.{profile}.{ext}"));
                if profile_path.exists() {
                    debug!(path = %profile_path.display(), "loading profile configuration");
                    *figment = merge(std::mem::take(figment), &profile_path);
                }
            }

            let base_path = dir.join(base_name);
            if base_path.exists() {
                info!(path = %base_path.display(), "loading configuration file");
                *figment = merge(std::mem::take(figment), &base_path);
                return true;
            }
        }
        false
    }
}

/// Merges a single config file, dispatching on its extension.
fn merge_file(figment: Figment, path: &Path) -> ConfigResult<Figment> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
    match ext {
        #[cfg(feature = "toml-config")]
        "toml" => Ok(figment.merge(Toml::file(path))),
        #[cfg(feature = "yaml-config")]
        "yaml" | "yml" => Ok(figment.merge(Yaml::file(path))),
        _ => Err(ConfigError::Parse(format!(
            "unsupported or disabled configuration format: .{ext}"
        ))),
    }
}

/// Loads configuration from the default locations.
pub fn load_config() -> ConfigResult<HostConfig> {
    ConfigLoader::new().load()
}

/// Loads configuration from a specific file.
pub fn load_config_from_file<P: AsRef<Path>>(path: P) -> ConfigResult<HostConfig> {
    ConfigLoader::new().file(path).load()
}
