//! Configuration for vtkernel.
//!
//! Loaded from `~/.vtkernel/config.toml`. Every field is optional; a missing
//! or unreadable file means the defaults below.
//!
//! ```toml
//! # Shell prompt
//! prompt = "$ "
//!
//! # Log filter (trace, debug, info, warn, error or an EnvFilter directive)
//! log_level = "debug"
//!
//! # Lines kept in each shell's history
//! history_limit = 500
//!
//! [ids]
//! # Pids ready before the pool first grows
//! initial_capacity = 4
//!
//! [bus]
//! # Ticks one drain may run before giving up on the queue
//! max_ticks_per_drain = 10000
//! ```

use std::fs;
use std::path::PathBuf;
use serde::{Deserialize, Serialize};

use crate::core::tick::DEFAULT_MAX_TICKS;
use crate::history::HISTORY_LIMIT;
use crate::proc::{ManagerOptions, ShellOptions};

/// Main configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Shell prompt
    pub prompt: String,
    /// Log filter
    pub log_level: String,
    /// Maximum history entries per shell
    pub history_limit: usize,
    /// Id allocation settings
    pub ids: IdsConfig,
    /// Event bus settings
    pub bus: BusConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            prompt: "> ".to_string(),
            log_level: "info".to_string(),
            history_limit: HISTORY_LIMIT,
            ids: IdsConfig::default(),
            bus: BusConfig::default(),
        }
    }
}

/// Id allocation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IdsConfig {
    pub initial_capacity: usize,
}

impl Default for IdsConfig {
    fn default() -> Self {
        Self { initial_capacity: 1 }
    }
}

/// Event bus configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BusConfig {
    pub max_ticks_per_drain: usize,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            max_ticks_per_drain: DEFAULT_MAX_TICKS,
        }
    }
}

impl Config {
    /// Load the user's config, falling back to defaults on any problem
    pub fn load() -> Self {
        if let Some(path) = Self::get_config_path() {
            if path.exists() {
                if let Ok(content) = fs::read_to_string(&path) {
                    if let Ok(config) = Self::from_toml(&content) {
                        return config;
                    }
                }
            }
        }
        Self::default()
    }

    pub fn from_toml(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// `~/.vtkernel`, created on first use
    pub fn data_dir() -> Option<PathBuf> {
        let home = home_dir()?;
        let dir = home.join(".vtkernel");
        if !dir.exists() {
            let _ = fs::create_dir_all(&dir);
        }
        Some(dir)
    }

    fn get_config_path() -> Option<PathBuf> {
        Self::data_dir().map(|dir| dir.join("config.toml"))
    }

    pub fn log_path() -> Option<PathBuf> {
        Self::data_dir().map(|dir| dir.join("vtkernel.log"))
    }

    pub fn shell_options(&self) -> ShellOptions {
        ShellOptions {
            prompt: self.prompt.clone(),
            history_limit: self.history_limit,
        }
    }

    pub fn manager_options(&self) -> ManagerOptions {
        ManagerOptions {
            initial_capacity: self.ids.initial_capacity.max(1),
            shell: self.shell_options(),
        }
    }
}

fn home_dir() -> Option<PathBuf> {
    std::env::var_os("USERPROFILE")
        .or_else(|| std::env::var_os("HOME"))
        .map(PathBuf::from)
}
