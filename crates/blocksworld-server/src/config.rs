//! Server configuration (§7 of SPEC_FULL): an optional YAML file plus
//! built-in defaults, matching `blocksworld-core`'s own default counts so a
//! config-free run behaves exactly like the reference implementation.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use blocksworld_core::SimConfig;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Text,
    Json,
}

impl Default for LogFormat {
    fn default() -> Self {
        LogFormat::Text
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    #[serde(default = "default_http_addr")]
    pub http_addr: SocketAddr,

    /// Directory scanned for `*.json` scenario files at startup. `None`
    /// leaves the registry empty, matching a fresh reference install before
    /// any scenarios have been authored.
    #[serde(default)]
    pub scenario_dir: Option<PathBuf>,

    #[serde(default = "default_ticks_per_second")]
    pub ticks_per_second: u32,

    #[serde(default = "default_n_stacks")]
    pub default_n_stacks: u32,

    #[serde(default = "default_n_blocks")]
    pub default_n_blocks: u32,

    #[serde(default)]
    pub log_format: LogFormat,

    /// Enable the stdin-line interactive surface alongside HTTP. Disabled by
    /// default so the server runs unattended under a process supervisor.
    #[serde(default)]
    pub interactive: bool,
}

fn default_http_addr() -> SocketAddr {
    blocksworld_core::constants::DEFAULT_HTTP_ADDR
        .parse()
        .expect("fatal: DEFAULT_HTTP_ADDR must be a valid socket address")
}

fn default_ticks_per_second() -> u32 {
    blocksworld_core::constants::DEFAULT_TICKS_PER_SECOND
}

fn default_n_stacks() -> u32 {
    blocksworld_core::constants::DEFAULT_N_STACKS
}

fn default_n_blocks() -> u32 {
    blocksworld_core::constants::DEFAULT_N_BLOCKS
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_addr: default_http_addr(),
            scenario_dir: None,
            ticks_per_second: default_ticks_per_second(),
            default_n_stacks: default_n_stacks(),
            default_n_blocks: default_n_blocks(),
            log_format: LogFormat::default(),
            interactive: false,
        }
    }
}

impl ServerConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config from {}", path.display()))?;
        let config: Self = serde_yaml::from_str(&content)
            .with_context(|| format!("failed to parse config from {}", path.display()))?;
        Ok(config)
    }

    /// Loads `path` if given and present, otherwise falls back to defaults —
    /// a missing `--config` is not an error, only an unreadable one is.
    pub fn load_optional(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) if path.exists() => Self::load(path),
            Some(path) => anyhow::bail!("config file {} does not exist", path.display()),
            None => Ok(Self::default()),
        }
    }

    pub fn to_sim_config(&self) -> SimConfig {
        SimConfig {
            ticks_per_second: self.ticks_per_second,
            default_n_stacks: self.default_n_stacks,
            default_n_blocks: self.default_n_blocks,
        }
    }
}
