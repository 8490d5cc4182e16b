//! Live kline feed over the Binance raw stream endpoint.

use std::sync::Arc;

use async_trait::async_trait;

use crate::trader::gateway::{FeedConnection, FeedConnector, FeedEventSender};
use crate::trader::object::Instrument;

use super::config::BinanceConfig;
use super::constants::kline_stream_name;
use super::websocket_client::{BinanceWebSocketClient, WsEventHandler};

/// Opens one WebSocket per instrument on `<ws host><symbol>@kline_<interval>`
pub struct BinanceKlineFeed {
    config: BinanceConfig,
}

impl BinanceKlineFeed {
    pub fn new(config: BinanceConfig) -> Self {
        Self { config }
    }

    pub fn stream_url(&self, instrument: &Instrument) -> String {
        format!(
            "{}{}",
            self.config.ws_host(),
            kline_stream_name(&instrument.symbol, instrument.interval)
        )
    }
}

/// An open kline stream
struct BinanceKlineConnection {
    client: BinanceWebSocketClient,
}

#[async_trait]
impl FeedConnection for BinanceKlineConnection {
    async fn close(&self) {
        self.client.disconnect().await;
    }
}

#[async_trait]
impl FeedConnector for BinanceKlineFeed {
    async fn open(
        &self,
        instrument: &Instrument,
        sender: FeedEventSender,
    ) -> Result<Box<dyn FeedConnection>, String> {
        let url = self.stream_url(instrument);
        let client = BinanceWebSocketClient::new(&format!("KLINE {}", instrument.key()));

        let handler: WsEventHandler = Arc::new(move |event| {
            sender.send(event);
        });
        client
            .connect(&url, self.config.proxy(), handler)
            .await?;

        Ok(Box::new(BinanceKlineConnection { client }))
    }
}
