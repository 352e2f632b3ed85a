use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::net::SocketAddr;
use std::path::Path;

use crate::analysis::SearchLimits;
use crate::analysis::reachability::{
    DEFAULT_COMPLETION_DEPTH, DEFAULT_DEADLOCK_DEPTH, DEFAULT_LIVENESS_DEPTH,
};

pub const DEFAULT_CONFIG_FILE: &str = "wfnet.toml";

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct AnalysisConfig {
    #[serde(default = "default_completion_depth")]
    pub completion_depth: usize,
    #[serde(default = "default_liveness_depth")]
    pub liveness_depth: usize,
    #[serde(default = "default_deadlock_depth")]
    pub deadlock_depth: usize,
    #[serde(default = "default_server_addr")]
    pub server_addr: String,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            completion_depth: default_completion_depth(),
            liveness_depth: default_liveness_depth(),
            deadlock_depth: default_deadlock_depth(),
            server_addr: default_server_addr(),
        }
    }
}

impl AnalysisConfig {
    /// A missing file yields the defaults.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        let config: AnalysisConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path))?;
        Ok(config)
    }

    pub fn limits(&self) -> SearchLimits {
        SearchLimits {
            completion_depth: self.completion_depth,
            liveness_depth: self.liveness_depth,
            deadlock_depth: self.deadlock_depth,
        }
    }

    pub fn socket_addr(&self) -> Result<SocketAddr> {
        self.server_addr
            .parse()
            .with_context(|| format!("Invalid server address: {}", self.server_addr))
    }
}

fn default_completion_depth() -> usize {
    DEFAULT_COMPLETION_DEPTH
}

fn default_liveness_depth() -> usize {
    DEFAULT_LIVENESS_DEPTH
}

fn default_deadlock_depth() -> usize {
    DEFAULT_DEADLOCK_DEPTH
}

fn default_server_addr() -> String {
    "127.0.0.1:5200".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = AnalysisConfig::load_from_file(dir.path().join("absent.toml")).unwrap();
        assert_eq!(config, AnalysisConfig::default());
        assert_eq!(config.limits(), SearchLimits::default());
        assert_eq!(config.socket_addr().unwrap().port(), 5200);
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(DEFAULT_CONFIG_FILE);
        fs::write(&path, "deadlock_depth = 25\nserver_addr = \"0.0.0.0:8080\"\n").unwrap();

        let config = AnalysisConfig::load_from_file(&path).unwrap();
        assert_eq!(config.deadlock_depth, 25);
        assert_eq!(config.completion_depth, DEFAULT_COMPLETION_DEPTH);
        assert_eq!(config.socket_addr().unwrap().port(), 8080);
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(DEFAULT_CONFIG_FILE);
        fs::write(&path, "completion_depth = \"deep\"").unwrap();
        let err = AnalysisConfig::load_from_file(&path).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config file"));
    }
}
