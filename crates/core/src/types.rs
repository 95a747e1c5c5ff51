use bytes::Bytes;
use futures::stream::BoxStream;
use serde::Serialize;
use std::time::Duration;

/// Source document as a stream of byte chunks, from either the request body
/// or a remote fetch. Dropping it releases the underlying connection.
pub type InputStream = BoxStream<'static, Result<Bytes, std::io::Error>>;

pub const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0";
pub const DEFAULT_LISTEN_PORT: u16 = 8080;
pub const DEFAULT_URL_SUB_PATH: &str = "/";
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 30;

/// Runtime configuration, resolved once at startup and read by every request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub listen_addr: String,
    pub listen_port: u16,
    /// Pre-shared key. Empty disables authentication.
    pub auth_key: String,
    pub url_sub_path: String,
    /// Upper bound for a remote fetch. `None` waits indefinitely.
    pub fetch_timeout: Option<Duration>,
}

impl Config {
    pub fn auth_enabled(&self) -> bool {
        !self.auth_key.is_empty()
    }

    /// `host:port` string handed to the listener.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.listen_addr, self.listen_port)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_addr: DEFAULT_LISTEN_ADDR.to_string(),
            listen_port: DEFAULT_LISTEN_PORT,
            auth_key: String::new(),
            url_sub_path: DEFAULT_URL_SUB_PATH.to_string(),
            fetch_timeout: Some(Duration::from_secs(DEFAULT_FETCH_TIMEOUT_SECS)),
        }
    }
}

/// JSON body written for every failed request.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorEnvelope {
    pub error: &'static str,
}

/// Decoded query string of an inbound request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams {
    pairs: Vec<(String, String)>,
}

impl QueryParams {
    pub fn parse(raw: Option<&str>) -> Self {
        let pairs = raw
            .map(|q| {
                url::form_urlencoded::parse(q.as_bytes())
                    .into_owned()
                    .collect()
            })
            .unwrap_or_default();
        Self { pairs }
    }

    /// First value for `name`; a missing parameter reads as `""`.
    pub fn get(&self, name: &str) -> &str {
        self.pairs
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
            .unwrap_or("")
    }
}
