//! Runtime configuration from `brisk.toml`.
//!
//! Searches the current directory then its ancestors, falling back to
//! `~/.config/brisk/brisk.toml`, and finally to built-in defaults. The
//! `BRISK_EXEC_ROOT` environment variable overrides `exec_root`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const CONFIG_FILE_NAME: &str = "brisk.toml";
pub const EXEC_ROOT_ENV: &str = "BRISK_EXEC_ROOT";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid toml in '{path}': {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

#[derive(Debug, Deserialize, Serialize, Default, Clone, PartialEq)]
pub struct RuntimeConfig {
    /// Directory relative script paths resolve against. Defaults to the
    /// process's current directory.
    #[serde(default)]
    pub exec_root: Option<PathBuf>,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub net: NetConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct HttpConfig {
    /// Overall timeout for one outbound `http.request`.
    pub client_timeout_ms: u64,
    /// Upper bound on the request line plus headers the server will parse.
    pub max_header_bytes: usize,
    /// Upper bound on an inbound request body.
    pub max_body_bytes: usize,
    /// Poll interval of an interruptible `http.accept`.
    pub accept_poll_ms: u64,
    /// Honour `HTTP_PROXY`/`HTTPS_PROXY`/`NO_PROXY` for outbound requests.
    pub proxy_from_env: bool,
    /// How long `http.accept` waits for a connected client to finish
    /// sending its request.
    pub request_read_timeout_ms: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            client_timeout_ms: 30_000,
            max_header_bytes: 64 * 1024,
            max_body_bytes: 16 * 1024 * 1024,
            accept_poll_ms: 10,
            proxy_from_env: true,
            request_read_timeout_ms: 30_000,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct NetConfig {
    /// Poll interval of an interruptible `socket.accept`.
    pub accept_poll_ms: u64,
}

impl Default for NetConfig {
    fn default() -> Self {
        Self { accept_poll_ms: 10 }
    }
}

impl RuntimeConfig {
    /// Load config from `brisk.toml`, searching the current dir then parents.
    /// Returns defaults when no file is found or the file is unreadable.
    pub fn load() -> Self {
        let mut cfg = Self::find_and_load()
            .map(|(_path, cfg)| cfg)
            .unwrap_or_default();
        cfg.apply_env();
        cfg
    }

    /// Load config from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let mut cfg = Self::parse(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        cfg.apply_env();
        Ok(cfg)
    }

    pub fn parse(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// The exec root, or the current directory when unset.
    pub fn resolved_exec_root(&self) -> PathBuf {
        self.exec_root
            .clone()
            .or_else(|| std::env::current_dir().ok())
            .unwrap_or_else(|| PathBuf::from("."))
    }

    fn apply_env(&mut self) {
        if let Some(root) = std::env::var_os(EXEC_ROOT_ENV) {
            if !root.is_empty() {
                self.exec_root = Some(PathBuf::from(root));
            }
        }
    }

    fn find_and_load() -> Option<(PathBuf, Self)> {
        let mut dir = std::env::current_dir().ok()?;
        loop {
            let config_path = dir.join(CONFIG_FILE_NAME);
            if config_path.exists() {
                let content = std::fs::read_to_string(&config_path).ok()?;
                let cfg = Self::parse(&content).ok()?;
                return Some((config_path, cfg));
            }
            if !dir.pop() {
                break;
            }
        }
        let global = dirs::config_dir()?.join("brisk").join(CONFIG_FILE_NAME);
        let content = std::fs::read_to_string(&global).ok()?;
        let cfg = Self::parse(&content).ok()?;
        Some((global, cfg))
    }
}
