//! Startup configuration: built-in defaults, then `Y2JS_*` environment
//! variables, then command-line overrides.

use crate::types::Config;
use std::time::Duration;
use thiserror::Error;

pub const ENV_LISTEN_ADDR: &str = "Y2JS_LISTEN_ADDR";
pub const ENV_LISTEN_PORT: &str = "Y2JS_LISTEN_PORT";
pub const ENV_AUTH_KEY: &str = "Y2JS_AUTH_KEY";
pub const ENV_URL_SUB_PATH: &str = "Y2JS_URL_SUB_PATH";
pub const ENV_FETCH_TIMEOUT: &str = "Y2JS_FETCH_TIMEOUT";

// Characters the router treats as path captures.
const ROUTE_META: [char; 4] = [':', '*', '{', '}'];

/// Name printed by `-version`.
pub const PROGRAM_NAME: &str = "yaml2json-server";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Bad port number: {0}")]
    InvalidPort(String),
    #[error("Bad port number: {0}")]
    PortOutOfRange(i64),
    #[error("Bad sub-path {0:?}: must start with '/' and contain no route wildcards")]
    InvalidSubPath(String),
    #[error("Bad fetch timeout: {0}")]
    InvalidTimeout(String),
}

/// Values supplied explicitly on the command line. `None` means the flag was
/// not given and the environment (or default) applies.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub listen_addr: Option<String>,
    pub listen_port: Option<i64>,
    pub auth_key: Option<String>,
    pub url_sub_path: Option<String>,
    pub fetch_timeout_secs: Option<u64>,
}

/// Version baked in at compile time through `Y2JS_VERSION`.
pub fn version() -> &'static str {
    match option_env!("Y2JS_VERSION") {
        Some(v) if !v.is_empty() => v,
        _ => "development",
    }
}

pub fn version_line() -> String {
    format!("{PROGRAM_NAME} Version: {}", version())
}

/// Builds the immutable [`Config`].
///
/// `env_get` is the environment lookup; empty values count as unset. Every
/// field is resolved independently, so a flag for one field never hides the
/// environment value of another.
///
/// # Examples
///
/// ```
/// use yaml2json_core::config::{resolve_config, ConfigOverrides};
///
/// let overrides = ConfigOverrides {
///     listen_port: Some(9000),
///     ..ConfigOverrides::default()
/// };
/// let cfg = resolve_config(|k| (k == "Y2JS_LISTEN_PORT").then(|| "7000".to_string()), overrides)
///     .unwrap();
/// assert_eq!(cfg.listen_port, 9000);
/// assert_eq!(cfg.url_sub_path, "/");
/// ```
pub fn resolve_config<F>(env_get: F, overrides: ConfigOverrides) -> Result<Config, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let env = |name: &str| env_get(name).filter(|v| !v.is_empty());
    let mut cfg = Config::default();

    if let Some(v) = env(ENV_LISTEN_ADDR) {
        cfg.listen_addr = v;
    }
    let mut port = i64::from(cfg.listen_port);
    if let Some(v) = env(ENV_LISTEN_PORT) {
        port = v
            .trim()
            .parse::<i64>()
            .map_err(|_| ConfigError::InvalidPort(v.clone()))?;
    }
    if let Some(v) = env(ENV_AUTH_KEY) {
        cfg.auth_key = v;
    }
    if let Some(v) = env(ENV_URL_SUB_PATH) {
        cfg.url_sub_path = v;
    }
    let mut timeout_secs = cfg.fetch_timeout.map(|d| d.as_secs()).unwrap_or(0);
    if let Some(v) = env(ENV_FETCH_TIMEOUT) {
        timeout_secs = v
            .trim()
            .parse::<u64>()
            .map_err(|_| ConfigError::InvalidTimeout(v.clone()))?;
    }

    if let Some(v) = overrides.listen_addr {
        cfg.listen_addr = v;
    }
    if let Some(v) = overrides.listen_port {
        port = v;
    }
    if let Some(v) = overrides.auth_key {
        cfg.auth_key = v;
    }
    if let Some(v) = overrides.url_sub_path {
        cfg.url_sub_path = v;
    }
    if let Some(v) = overrides.fetch_timeout_secs {
        timeout_secs = v;
    }

    cfg.listen_port = u16::try_from(port).map_err(|_| ConfigError::PortOutOfRange(port))?;
    if !cfg.url_sub_path.starts_with('/') || cfg.url_sub_path.contains(ROUTE_META) {
        return Err(ConfigError::InvalidSubPath(cfg.url_sub_path));
    }
    cfg.fetch_timeout = (timeout_secs > 0).then(|| Duration::from_secs(timeout_secs));

    Ok(cfg)
}
