//! Binance WebSocket client.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::{mpsc, RwLock};
use tokio::time::timeout;
use tokio_socks::tcp::Socks5Stream;
use tokio_tungstenite::{client_async_tls_with_config, connect_async, tungstenite::Message, WebSocketStream};
use tracing::{debug, error, info, warn};
use url::Url;

use crate::trader::gateway::FeedEvent;

/// Handshake timeout in seconds, proxy included
const CONNECT_TIMEOUT: u64 = 15;

/// WebSocket event handler type
pub type WsEventHandler = Arc<dyn Fn(FeedEvent) + Send + Sync>;

/// Split a proxy host setting into the SOCKS5 address to dial
fn socks5_addr(proxy_host: &str, proxy_port: u16) -> String {
    let host = proxy_host.trim();
    let host = host.strip_prefix("socks5://").unwrap_or(host);
    format!("{}:{}", host.trim_end_matches('/'), proxy_port)
}

/// Host and port of a `wss://` target
fn target_addr(url: &str) -> Result<(String, u16), String> {
    let target = Url::parse(url).map_err(|e| format!("Failed to parse target url: {}", e))?;
    let host = target
        .host_str()
        .ok_or_else(|| "Target host not available".to_string())?
        .to_string();
    let port = target.port_or_known_default().unwrap_or(443);
    Ok((host, port))
}

/// WebSocket client for Binance raw streams
pub struct BinanceWebSocketClient {
    /// Message sender for sending to WebSocket
    tx: Arc<RwLock<Option<mpsc::UnboundedSender<Message>>>>,
    /// Active flag, cleared on disconnect so the read loop stops reporting
    active: Arc<AtomicBool>,
    /// Name for logging
    name: String,
}

impl BinanceWebSocketClient {
    /// Create a new WebSocket client
    pub fn new(name: &str) -> Self {
        Self {
            tx: Arc::new(RwLock::new(None)),
            active: Arc::new(AtomicBool::new(false)),
            name: name.to_string(),
        }
    }

    /// Connect to `url`, through a SOCKS5 proxy when one is given.
    ///
    /// `handler` receives Connected, every text frame, then Disconnected or
    /// Error when the stream ends. Gives up after `CONNECT_TIMEOUT` seconds.
    pub async fn connect(
        &self,
        url: &str,
        proxy: Option<(&str, u16)>,
        handler: WsEventHandler,
    ) -> Result<(), String> {
        info!("{}: Connecting to WebSocket: {}", self.name, url);

        timeout(Duration::from_secs(CONNECT_TIMEOUT), self.open_stream(url, proxy, handler))
            .await
            .map_err(|_| format!("WebSocket connection timed out after {}s", CONNECT_TIMEOUT))?
    }

    async fn open_stream(
        &self,
        url: &str,
        proxy: Option<(&str, u16)>,
        handler: WsEventHandler,
    ) -> Result<(), String> {
        if let Some((proxy_host, proxy_port)) = proxy {
            let proxy_addr = socks5_addr(proxy_host, proxy_port);
            info!("{}: Using proxy: socks5://{}", self.name, proxy_addr);

            let (host, port) = target_addr(url)?;
            let proxy_stream = Socks5Stream::connect(proxy_addr.as_str(), (host.as_str(), port))
                .await
                .map_err(|e| format!("Failed to connect through proxy: {}", e))?;

            let (ws_stream, _) = client_async_tls_with_config(url, proxy_stream, None, None)
                .await
                .map_err(|e| format!("WebSocket connection through proxy failed: {}", e))?;

            info!("{}: WebSocket connected", self.name);
            self.handle_websocket_stream(ws_stream, handler).await;
        } else {
            let (ws_stream, _) = connect_async(url)
                .await
                .map_err(|e| format!("WebSocket connection failed: {}", e))?;

            info!("{}: WebSocket connected", self.name);
            self.handle_websocket_stream(ws_stream, handler).await;
        }

        Ok(())
    }

    /// Spawn the read and write halves of a connected stream
    async fn handle_websocket_stream<S>(&self, ws_stream: WebSocketStream<S>, handler: WsEventHandler)
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        let (write, read) = ws_stream.split();
        let (tx, rx) = mpsc::unbounded_channel::<Message>();

        *self.tx.write().await = Some(tx);
        self.active.store(true, Ordering::SeqCst);
        handler(FeedEvent::Connected);

        // Write task
        let name = self.name.clone();
        tokio::spawn(async move {
            let mut write = write;
            let mut rx = rx;
            while let Some(msg) = rx.recv().await {
                let closing = matches!(msg, Message::Close(_));
                if let Err(e) = write.send(msg).await {
                    error!("{}: WebSocket write error: {}", name, e);
                    break;
                }
                if closing {
                    break;
                }
            }
        });

        // Read task
        let active = self.active.clone();
        let name = self.name.clone();
        tokio::spawn(async move {
            let mut read = read;
            while let Some(result) = read.next().await {
                if !active.load(Ordering::SeqCst) {
                    break;
                }
                match result {
                    Ok(Message::Text(text)) => {
                        handler(FeedEvent::Message(text.as_str().to_owned()));
                    }
                    Ok(Message::Ping(_)) => {
                        // Pong is handled automatically by tungstenite
                        debug!("{}: Received ping", name);
                    }
                    Ok(Message::Close(_)) => {
                        warn!("{}: WebSocket closed by server", name);
                        break;
                    }
                    Ok(Message::Binary(_)) => {
                        debug!("{}: Received binary message", name);
                    }
                    Err(e) => {
                        error!("{}: WebSocket read error: {}", name, e);
                        if active.load(Ordering::SeqCst) {
                            handler(FeedEvent::Error(e.to_string()));
                        }
                        break;
                    }
                    _ => {}
                }
            }
            if active.swap(false, Ordering::SeqCst) {
                handler(FeedEvent::Disconnected);
            }
            debug!("{}: WebSocket read loop ended", name);
        });
    }

    /// Disconnect from WebSocket. No events are reported afterwards.
    pub async fn disconnect(&self) {
        self.active.store(false, Ordering::SeqCst);
        if let Some(tx) = self.tx.write().await.take() {
            let _ = tx.send(Message::Close(None));
        }
        info!("{}: WebSocket disconnected", self.name);
    }

    /// Check if connected
    pub fn is_connected(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }
}

impl Default for BinanceWebSocketClient {
    fn default() -> Self {
        Self::new("BINANCE")
    }
}
