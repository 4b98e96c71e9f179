//! Configuration file support for Berth.
//!
//! Berth reads two configuration file locations:
//! - Global: `~/.berth/config.toml` - User-wide defaults
//! - Project: `.berth/config.toml` - Project-specific overrides
//!
//! Project config takes precedence over global config, and anything given
//! on the command line takes precedence over both.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::core::option::OptionValue;
use crate::core::platform::{normalize_os, PlatformContext};
use crate::sources::http::DEFAULT_TIMEOUT_SECS;

/// Name of the per-user and per-project configuration directory.
pub const CONFIG_DIR: &str = ".berth";

/// Berth configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Default platform settings
    pub platform: PlatformConfig,

    /// Default option values, applied below `-o` overrides
    pub options: BTreeMap<String, OptionValue>,

    /// Network settings
    pub net: NetConfig,
}

/// Default platform settings.
///
/// Unset fields fall back to the host platform.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlatformConfig {
    pub os: Option<String>,
    pub compiler: Option<String>,
    pub arch: Option<String>,
    pub build_type: Option<String>,
    pub cppstd: Option<String>,
}

/// Network-related configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetConfig {
    /// Download timeout in seconds
    pub timeout: Option<u64>,

    /// Extra attempts after a transient download failure
    pub retries: Option<u32>,

    /// Offline mode (don't fetch from network)
    #[serde(default)]
    pub offline: bool,
}

impl Config {
    /// Load configuration from a file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;

        toml::from_str(&contents)
            .with_context(|| format!("failed to parse config file: {}", path.display()))
    }

    /// Load configuration with fallback to defaults if file doesn't exist.
    pub fn load_or_default(path: &Path) -> Self {
        if path.exists() {
            Self::load(path).unwrap_or_else(|e| {
                tracing::warn!("Failed to load config from {}: {:#}", path.display(), e);
                Self::default()
            })
        } else {
            Self::default()
        }
    }

    /// Merge another config into this one (other takes precedence).
    pub fn merge(&mut self, other: Config) {
        let platform = other.platform;
        if platform.os.is_some() {
            self.platform.os = platform.os;
        }
        if platform.compiler.is_some() {
            self.platform.compiler = platform.compiler;
        }
        if platform.arch.is_some() {
            self.platform.arch = platform.arch;
        }
        if platform.build_type.is_some() {
            self.platform.build_type = platform.build_type;
        }
        if platform.cppstd.is_some() {
            self.platform.cppstd = platform.cppstd;
        }

        self.options.extend(other.options);

        if other.net.timeout.is_some() {
            self.net.timeout = other.net.timeout;
        }
        if other.net.retries.is_some() {
            self.net.retries = other.net.retries;
        }
        if other.net.offline {
            self.net.offline = true;
        }
    }

    /// The configured default platform.
    pub fn platform(&self) -> PlatformContext {
        let settings = &self.platform;

        let mut platform = match settings.os {
            Some(ref os) => PlatformContext::new(normalize_os(os)),
            None => PlatformContext::host(),
        };

        if let Some(ref compiler) = settings.compiler {
            platform = platform.with_compiler(compiler);
        }
        if let Some(ref arch) = settings.arch {
            platform = platform.with_arch(arch);
        }
        if let Some(ref build_type) = settings.build_type {
            platform = platform.with_build_type(build_type);
        }
        if let Some(ref cppstd) = settings.cppstd {
            platform = platform.with_cppstd(cppstd);
        }

        platform
    }

    /// Download timeout.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.net.timeout.unwrap_or(DEFAULT_TIMEOUT_SECS))
    }

    /// Extra download attempts.
    pub fn retries(&self) -> u32 {
        self.net.retries.unwrap_or(0)
    }
}

/// Load merged configuration from global and project locations.
///
/// Order of precedence (highest to lowest):
/// 1. Project config (.berth/config.toml)
/// 2. Global config (~/.berth/config.toml)
/// 3. Defaults
pub fn load_config(global_path: &Path, project_path: &Path) -> Config {
    let mut config = Config::default();

    if global_path.exists() {
        config.merge(Config::load_or_default(global_path));
    }

    if project_path.exists() {
        config.merge(Config::load_or_default(project_path));
    }

    config
}

/// Get the global berth config directory (~/.berth).
pub fn global_config_dir() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|b| b.home_dir().join(CONFIG_DIR))
}

/// Get the project config path (.berth/config.toml).
pub fn project_config_path(project_root: &Path) -> PathBuf {
    project_root.join(CONFIG_DIR).join("config.toml")
}
