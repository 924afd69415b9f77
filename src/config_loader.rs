// src/config_loader.rs
//
// Loads NodeConfig from a YAML file, e.g. "config/node.yaml".

use serde::{Deserialize, Serialize};
use anyhow::Result;
use std::fs;
use tracing::{info, instrument};
use crate::error::NodeError;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct NodeConfig {
    pub node: NodeIdentity,
    pub server: ServerConfig,
    pub kbucket: KBucketConfig,
    pub query: QueryConfig,
    #[serde(default)]
    pub call: CallConfig,
    #[serde(default)]
    pub event: EventConfig,
    #[serde(default)]
    pub debug: DebugConfig,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct NodeIdentity {
    /// Hex-encoded 160-bit id. If absent, a random id is generated at startup.
    #[serde(default)]
    pub id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct KBucketConfig {
    #[serde(default = "default_ksize")]
    pub ksize: usize,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct QueryConfig {
    #[serde(default = "default_alpha")]
    pub alpha: usize,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct CallConfig {
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for CallConfig {
    fn default() -> Self {
        Self { timeout_ms: default_timeout_ms() }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct EventConfig {
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
}

impl Default for EventConfig {
    fn default() -> Self {
        Self { queue_capacity: default_queue_capacity() }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct DebugConfig {
    #[serde(default)]
    pub events: bool,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(untagged)]
pub enum LoggingConfig {
    Level(String),
    Structured {
        level: String,
        dir: String,
        file: String,
    },
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig::Level("info".to_string())
    }
}

fn default_ksize() -> usize {
    20
}

fn default_alpha() -> usize {
    3
}

fn default_timeout_ms() -> u64 {
    5000
}

fn default_queue_capacity() -> usize {
    1024
}

/// Loads the config from a YAML file.
///
/// Example: `let cfg = load_config("config/node.yaml")?;`
#[instrument(name = "load_config", skip(path))]
pub fn load_config(path: &str) -> Result<NodeConfig> {
    let content = fs::read_to_string(path)
        .map_err(|e| NodeError::Other(format!("reading config file {}: {:?}", path, e)))?;

    let cfg: NodeConfig = serde_yaml::from_str(&content)
        .map_err(|e| NodeError::Other(format!("parsing config file {}: {:?}", path, e)))?;

    info!(
        host = %cfg.server.host,
        port = cfg.server.port,
        ksize = cfg.kbucket.ksize,
        alpha = cfg.query.alpha,
        "node config loaded"
    );

    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minimal_config() {
        let yaml = r#"
node: {}
server:
  host: "127.0.0.1"
  port: 9000
kbucket:
  ksize: 20
query:
  alpha: 3
"#;
        let cfg: NodeConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(cfg.server.port, 9000);
        assert_eq!(cfg.kbucket.ksize, 20);
        assert_eq!(cfg.query.alpha, 3);
        assert_eq!(cfg.call.timeout_ms, 5000);
        assert!(!cfg.debug.events);
    }

    #[test]
    fn parses_structured_logging() {
        let yaml = r#"
node: {}
server:
  host: "0.0.0.0"
  port: 9001
kbucket:
  ksize: 20
query:
  alpha: 3
debug:
  events: true
  logging:
    level: "debug"
    dir: "logs"
    file: "node.log"
"#;
        let cfg: NodeConfig = serde_yaml::from_str(yaml).unwrap();
        assert!(cfg.debug.events);
        match cfg.debug.logging {
            LoggingConfig::Structured { level, dir, file } => {
                assert_eq!(level, "debug");
                assert_eq!(dir, "logs");
                assert_eq!(file, "node.log");
            }
            LoggingConfig::Level(_) => panic!("expected structured logging config"),
        }
    }
}
