//! Node and engine configuration.
//!
//! Values come from defaults, optionally overridden by `CHAIN_NODE_*`
//! environment variables.

use crate::utils::log::Level;
use std::env;
use thiserror::Error;

/// Version string reported by the diagnostics page.
pub const NODE_VERSION: &str = env!("CARGO_PKG_VERSION");

pub const DEFAULT_MAX_INVOCATION_DEPTH: usize = 1024;
pub const DEFAULT_MAX_STACK_SIZE: usize = 2048;

/// Errors raised while reading configuration.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var}: invalid value {value:?}")]
    InvalidValue { var: &'static str, value: String },
}

/// Resource bounds for one engine.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct EngineLimits {
    /// Maximum number of nested execution contexts.
    pub max_invocation_depth: usize,
    /// Maximum number of items on the evaluation stack.
    pub max_stack_size: usize,
}

impl Default for EngineLimits {
    fn default() -> Self {
        Self {
            max_invocation_depth: DEFAULT_MAX_INVOCATION_DEPTH,
            max_stack_size: DEFAULT_MAX_STACK_SIZE,
        }
    }
}

/// Listening ports and identity shown on the diagnostics page.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct NodeConfig {
    pub version: String,
    pub node_port: u16,
    pub http_info_port: u16,
    pub http_rest_port: u16,
    pub http_ws_port: u16,
    pub http_json_port: u16,
    pub http_local_port: u16,
    pub log_level: Level,
    pub engine: EngineLimits,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            version: NODE_VERSION.to_string(),
            node_port: 20338,
            http_info_port: 20333,
            http_rest_port: 20334,
            http_ws_port: 20335,
            http_json_port: 20336,
            http_local_port: 20337,
            log_level: Level::Info,
            engine: EngineLimits::default(),
        }
    }
}

impl NodeConfig {
    /// Defaults overridden by the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Defaults overridden by whatever `lookup` returns for each variable.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = NodeConfig::default();

        let port = |var: &'static str, slot: &mut u16| -> Result<(), ConfigError> {
            if let Some(v) = lookup(var) {
                *slot = parse(var, &v)?;
            }
            Ok(())
        };
        port("CHAIN_NODE_PORT", &mut cfg.node_port)?;
        port("CHAIN_NODE_HTTP_INFO_PORT", &mut cfg.http_info_port)?;
        port("CHAIN_NODE_HTTP_REST_PORT", &mut cfg.http_rest_port)?;
        port("CHAIN_NODE_HTTP_WS_PORT", &mut cfg.http_ws_port)?;
        port("CHAIN_NODE_HTTP_JSON_PORT", &mut cfg.http_json_port)?;
        port("CHAIN_NODE_HTTP_LOCAL_PORT", &mut cfg.http_local_port)?;

        if let Some(v) = lookup("CHAIN_NODE_LOG") {
            cfg.log_level = Level::parse(&v).ok_or(ConfigError::InvalidValue {
                var: "CHAIN_NODE_LOG",
                value: v.clone(),
            })?;
        }
        if let Some(v) = lookup("CHAIN_NODE_MAX_INVOCATION_DEPTH") {
            cfg.engine.max_invocation_depth = parse("CHAIN_NODE_MAX_INVOCATION_DEPTH", &v)?;
        }
        if let Some(v) = lookup("CHAIN_NODE_MAX_STACK_SIZE") {
            cfg.engine.max_stack_size = parse("CHAIN_NODE_MAX_STACK_SIZE", &v)?;
        }
        Ok(cfg)
    }
}

fn parse<T: std::str::FromStr>(var: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        var,
        value: value.to_string(),
    })
}
