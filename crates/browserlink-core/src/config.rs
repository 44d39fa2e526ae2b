//! Configuration loading.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Top-level Browserlink configuration, loaded from a JSON5 file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub browser: BrowserConfig,

    #[serde(default)]
    pub agent: AgentConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            port: default_port(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrowserConfig {
    /// Path to a Chrome/Chromium binary (auto-detected when omitted).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chrome_path: Option<String>,

    /// Run the browser headless (default: true).
    #[serde(default = "default_true")]
    pub headless: bool,

    /// Per-operation timeout in ms (default: 30000).
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            chrome_path: None,
            headless: default_true(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Task bound to the hosted agent; a `run_agent` command may override it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task: Option<String>,

    /// Step limit for a hosted agent run (default: 100).
    #[serde(default = "default_max_steps")]
    pub max_steps: u32,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            task: None,
            max_steps: default_max_steps(),
        }
    }
}

fn default_bind() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8765
}

fn default_true() -> bool {
    true
}

fn default_timeout_ms() -> u64 {
    30_000
}

fn default_max_steps() -> u32 {
    100
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config parse error: {0}")]
    Parse(String),
}

impl Config {
    /// Load config from a JSON5 file. A missing file yields defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path)?;
        json5::from_str(&raw).map_err(|e| ConfigError::Parse(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config: Config = json5::from_str("{}").unwrap();
        assert_eq!(config.server.bind, "0.0.0.0");
        assert_eq!(config.server.port, 8765);
        assert!(config.browser.headless);
        assert_eq!(config.browser.timeout_ms, 30_000);
        assert_eq!(config.agent.max_steps, 100);
        assert!(config.agent.task.is_none());
    }

    #[test]
    fn test_partial_override() {
        let config: Config = json5::from_str(
            r#"{
                server: { port: 9001 },
                browser: { headless: false },
                agent: { task: "book a table" },
            }"#,
        )
        .unwrap();
        assert_eq!(config.server.port, 9001);
        assert_eq!(config.server.bind, "0.0.0.0");
        assert!(!config.browser.headless);
        assert_eq!(config.agent.task.as_deref(), Some("book a table"));
    }

    #[test]
    fn test_load_missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(&dir.path().join("nope.json5")).unwrap();
        assert_eq!(config.server.port, 8765);
    }

    #[test]
    fn test_load_rejects_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json5");
        std::fs::write(&path, "server: {").unwrap();
        assert!(Config::load(&path).is_err());
    }
}
