//! Binance connection configuration.

use serde::{Deserialize, Serialize};

use crate::trader::setting::Settings;

use super::constants::{SPOT_REST_HOST, SPOT_TESTNET_REST_HOST, SPOT_TESTNET_WS_HOST, SPOT_WS_HOST};

/// Server and proxy settings shared by the REST and WebSocket clients
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BinanceConfig {
    /// Server mode (REAL or TESTNET)
    #[serde(default = "default_server")]
    pub server: String,
    /// Proxy host (can be empty)
    #[serde(default)]
    pub proxy_host: String,
    /// Proxy port (0 means no proxy)
    #[serde(default)]
    pub proxy_port: u16,
}

fn default_server() -> String {
    "REAL".to_string()
}

impl Default for BinanceConfig {
    fn default() -> Self {
        Self {
            server: default_server(),
            proxy_host: String::new(),
            proxy_port: 0,
        }
    }
}

impl BinanceConfig {
    /// Read the `binance.*` keys
    pub fn from_settings(settings: &Settings) -> Self {
        let server = settings
            .get_string("binance.server")
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(default_server);
        let proxy_host = settings.get_string("binance.proxy_host").unwrap_or_default();
        let proxy_port = settings
            .get_int("binance.proxy_port")
            .and_then(|p| u16::try_from(p).ok())
            .unwrap_or(0);

        Self {
            server,
            proxy_host,
            proxy_port,
        }
    }

    pub fn is_testnet(&self) -> bool {
        self.server.trim().eq_ignore_ascii_case("TESTNET")
    }

    pub fn rest_host(&self) -> &'static str {
        if self.is_testnet() {
            SPOT_TESTNET_REST_HOST
        } else {
            SPOT_REST_HOST
        }
    }

    pub fn ws_host(&self) -> &'static str {
        if self.is_testnet() {
            SPOT_TESTNET_WS_HOST
        } else {
            SPOT_WS_HOST
        }
    }

    /// True when both proxy host and port are set
    pub fn use_proxy(&self) -> bool {
        !self.proxy_host.trim().is_empty() && self.proxy_port > 0
    }

    /// Proxy host and port, when configured
    pub fn proxy(&self) -> Option<(&str, u16)> {
        self.use_proxy()
            .then(|| (self.proxy_host.trim(), self.proxy_port))
    }
}
