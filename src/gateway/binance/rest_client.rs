//! Binance REST API client for public market data.

use std::collections::HashMap;
use std::time::Duration;

use reqwest::{Client, Method};
use serde_json::Value;
use tracing::{debug, error, info, warn};

/// Request timeout in seconds
const REQUEST_TIMEOUT: u64 = 30;

/// REST API client for Binance
pub struct BinanceRestClient {
    /// HTTP client
    client: Client,
    /// Base URL
    host: String,
}

impl BinanceRestClient {
    /// Create a client for `host`, optionally routed through an HTTP proxy
    pub fn new(host: &str, proxy: Option<(&str, u16)>) -> Self {
        let client = if let Some((proxy_host, proxy_port)) = proxy {
            let proxy_url = format!("http://{}:{}", proxy_host, proxy_port);
            match reqwest::Proxy::all(&proxy_url).and_then(|proxy| {
                Client::builder()
                    .proxy(proxy)
                    .timeout(Duration::from_secs(REQUEST_TIMEOUT))
                    .build()
            }) {
                Ok(client) => {
                    info!("REST client using proxy {}:{}", proxy_host, proxy_port);
                    client
                }
                Err(e) => {
                    warn!("Invalid proxy {}:{}, connecting directly: {}", proxy_host, proxy_port, e);
                    Self::direct_client()
                }
            }
        } else {
            Self::direct_client()
        };

        Self {
            client,
            host: host.trim_end_matches('/').to_string(),
        }
    }

    fn direct_client() -> Client {
        Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT))
            .build()
            .unwrap_or_else(|e| {
                warn!("Failed to build HTTP client, using defaults: {}", e);
                Client::new()
            })
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    /// Build request URL with parameters sorted by name
    pub fn build_url(&self, path: &str, params: &HashMap<String, String>) -> String {
        let mut url = format!("{}{}", self.host, path);
        if !params.is_empty() {
            let mut sorted_params: Vec<_> = params.iter().collect();
            sorted_params.sort_by(|a, b| a.0.cmp(b.0));

            let query_string = sorted_params
                .iter()
                .map(|(k, v)| format!("{}={}", k, v))
                .collect::<Vec<_>>()
                .join("&");
            url = format!("{}?{}", url, query_string);
        }
        url
    }

    /// Send a request to the API
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        params: &HashMap<String, String>,
    ) -> Result<Value, String> {
        let url = self.build_url(path, params);
        debug!("Binance API request: {} {}", method, url);

        let response = self
            .client
            .request(method, &url)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| format!("Request failed: {}", e))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| format!("Failed to read response: {}", e))?;

        if !status.is_success() {
            if status.as_u16() == 429 {
                warn!("Binance API rate limit hit: {}", text);
                return Err(format!("Rate limit: {}", text));
            }
            error!("Binance API error {}: {}", status, text);
            return Err(format!("API error {}: {}", status, text));
        }

        serde_json::from_str(&text).map_err(|e| format!("Failed to parse JSON: {} - {}", e, text))
    }

    /// GET request
    pub async fn get(&self, path: &str, params: &HashMap<String, String>) -> Result<Value, String> {
        self.request(Method::GET, path, params).await
    }
}
