//! Network configuration loaded from environment variables.
//!
//! All settings have sensible defaults so a client can start with zero
//! configuration against a local development backend.

use std::time::Duration;

use confab_shared::constants::{DEFAULT_API_URL, DEFAULT_SOCKET_URL};

/// Reconnection policy for the realtime socket.
#[derive(Debug, Clone)]
pub struct ReconnectPolicy {
    /// Whether the socket reconnects on its own after a failure.
    /// When disabled, a dropped connection stays down until the caller
    /// opens a new socket.
    pub enabled: bool,
    /// Delay before the first reconnect attempt.
    pub initial_delay: Duration,
    /// Upper bound for the exponential backoff.
    pub max_delay: Duration,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            enabled: true,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
        }
    }
}

/// Client network configuration.
#[derive(Debug, Clone)]
pub struct NetConfig {
    /// Base URL of the remote document store's HTTP API.
    /// Env: `CONFAB_API_URL`
    /// Default: `http://127.0.0.1:8080`
    pub api_url: String,

    /// URL of the realtime transport endpoint.
    /// Env: `CONFAB_SOCKET_URL`
    /// Default: `ws://127.0.0.1:8080/chat`
    pub socket_url: String,

    /// Realtime reconnection policy.
    /// Env: `CONFAB_RECONNECT` (true/false), `CONFAB_RECONNECT_MAX_SECS`
    pub reconnect: ReconnectPolicy,
}

impl Default for NetConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            socket_url: DEFAULT_SOCKET_URL.to_string(),
            reconnect: ReconnectPolicy::default(),
        }
    }
}

impl NetConfig {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(url) = std::env::var("CONFAB_API_URL") {
            config.api_url = url.trim_end_matches('/').to_string();
        }

        if let Ok(url) = std::env::var("CONFAB_SOCKET_URL") {
            config.socket_url = url;
        }

        if let Ok(val) = std::env::var("CONFAB_RECONNECT") {
            config.reconnect.enabled = val != "false" && val != "0";
        }

        if let Ok(val) = std::env::var("CONFAB_RECONNECT_MAX_SECS") {
            if let Ok(secs) = val.parse::<u64>() {
                config.reconnect.max_delay = Duration::from_secs(secs);
            } else {
                tracing::warn!(value = %val, "Invalid CONFAB_RECONNECT_MAX_SECS, using default");
            }
        }

        config
    }
}

/// Derive a websocket base URL from an HTTP API URL.
pub(crate) fn ws_base_url(api_url: &str) -> String {
    if let Some(rest) = api_url.strip_prefix("https://") {
        format!("wss://{rest}")
    } else if let Some(rest) = api_url.strip_prefix("http://") {
        format!("ws://{rest}")
    } else {
        api_url.to_string()
    }
}
