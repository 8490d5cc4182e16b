//! Session engine: binds the bar series to one instrument.
//!
//! `SessionController` owns the `BarStore`, the `IndicatorSet` and the
//! `StreamReconciler` of a single (symbol, interval) pair and drives the
//! `Idle -> Loading -> Live` lifecycle. It can be driven directly with
//! `&mut self` calls, or spawned as an actor behind a `SessionHandle`.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, trace, warn};

use crate::chart::{BarStore, ChartEvent, IndicatorKind, IndicatorSet, IndicatorUpdate, LineItem, DEFAULT_WINDOW};
use crate::error::{BarError, BarResult};

use super::constant::Interval;
use super::datafeed::{BackfillProvider, DEFAULT_BACKFILL_LIMIT};
use super::gateway::{ConnectionStatus, FeedConnection, FeedConnector, FeedEnvelope, FeedEvent, FeedEventSender};
use super::object::{Bar, Instrument};
use super::reconciler::{ReconcileStats, StreamReconciler};
use super::setting::Settings;

/// Lifecycle state of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionState {
    Idle,
    Loading,
    Live,
}

/// Tunables of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionConfig {
    pub backfill_limit: usize,
    pub indicator_window: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            backfill_limit: DEFAULT_BACKFILL_LIMIT,
            indicator_window: DEFAULT_WINDOW,
        }
    }
}

impl SessionConfig {
    /// Read `backfill.limit` and `indicator.window`, falling back to defaults
    pub fn from_settings(settings: &Settings) -> Self {
        let defaults = Self::default();
        Self {
            backfill_limit: settings
                .get_usize("backfill.limit")
                .unwrap_or(defaults.backfill_limit),
            indicator_window: settings
                .get_usize("indicator.window")
                .filter(|w| *w > 0)
                .unwrap_or(defaults.indicator_window),
        }
    }
}

/// Commands accepted by a running session
#[derive(Debug, Clone, PartialEq)]
pub enum SessionCommand {
    SetInstrument { symbol: String, interval: Interval },
    ToggleIndicator(IndicatorKind),
    ClearIndicators,
    /// Re-run the backfill for the current instrument, e.g. after a reconnect
    Refresh,
    Shutdown,
}

/// Result of one asynchronous step of a load
enum LoadStep {
    Fetched(Result<Vec<Bar>, String>),
    Opened(Result<Box<dyn FeedConnection>, String>),
}

type LoadFuture = Pin<Box<dyn Future<Output = LoadStep> + Send>>;

/// A backfill fetch or feed open in flight. Dropping it cancels the step.
struct PendingLoad {
    generation: u64,
    step: LoadFuture,
}

/// Controller of one live kline session
pub struct SessionController {
    provider: Arc<dyn BackfillProvider>,
    connector: Arc<dyn FeedConnector>,
    config: SessionConfig,

    state: SessionState,
    instrument: Option<Instrument>,
    store: BarStore,
    indicators: IndicatorSet,
    reconciler: StreamReconciler,

    connection: Option<Box<dyn FeedConnection>>,
    generation: u64,
    feed_tx: mpsc::UnboundedSender<FeedEnvelope>,
    feed_rx: Option<mpsc::UnboundedReceiver<FeedEnvelope>>,

    events: mpsc::UnboundedSender<ChartEvent>,
}

impl SessionController {
    /// Create an idle session. Chart events are delivered on the returned receiver.
    pub fn new(
        provider: Arc<dyn BackfillProvider>,
        connector: Arc<dyn FeedConnector>,
        config: SessionConfig,
    ) -> (Self, mpsc::UnboundedReceiver<ChartEvent>) {
        let (events, event_rx) = mpsc::unbounded_channel();
        let (feed_tx, feed_rx) = mpsc::unbounded_channel();

        let controller = Self {
            provider,
            connector,
            config,
            state: SessionState::Idle,
            instrument: None,
            store: BarStore::new(),
            indicators: IndicatorSet::with_default_window(config.indicator_window),
            reconciler: StreamReconciler::new(),
            connection: None,
            generation: 0,
            feed_tx,
            feed_rx: Some(feed_rx),
            events,
        };
        (controller, event_rx)
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn instrument(&self) -> Option<&Instrument> {
        self.instrument.as_ref()
    }

    pub fn store(&self) -> &BarStore {
        &self.store
    }

    pub fn indicators(&self) -> &IndicatorSet {
        &self.indicators
    }

    pub fn stats(&self) -> &ReconcileStats {
        self.reconciler.stats()
    }

    /// Generation of the current feed connection
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Switch to a new instrument: tear down, backfill, then go live.
    pub async fn set_instrument(&mut self, symbol: &str, interval: Interval) -> BarResult<()> {
        let pending = self.begin_backfill(Instrument::new(symbol, interval)).await;
        self.complete_load(pending).await
    }

    /// Reload the current instrument from a fresh backfill
    pub async fn refresh(&mut self) -> BarResult<()> {
        let Some(instrument) = self.instrument.clone() else {
            debug!("Refresh ignored, no instrument selected");
            return Ok(());
        };
        let pending = self.begin_backfill(instrument).await;
        self.complete_load(pending).await
    }

    /// Flip an indicator and republish every line.
    ///
    /// Returns the new active flag.
    pub fn toggle_indicator(&mut self, kind: IndicatorKind) -> bool {
        let active = self.indicators.toggle(kind);
        let updates = self.indicators.recompute_all(self.store.closes());
        self.publish_indicators(&updates);
        active
    }

    /// Turn every indicator off
    pub fn clear_indicators(&mut self) {
        self.indicators.clear_all();
        let updates = self.indicators.recompute_all(self.store.closes());
        self.publish_indicators(&updates);
    }

    /// Handle one event from the feed connection.
    ///
    /// Events from an older generation are dropped.
    pub fn handle_feed_event(&mut self, envelope: FeedEnvelope) {
        if envelope.generation != self.generation {
            trace!(
                "Dropping feed event of generation {} (current {})",
                envelope.generation,
                self.generation
            );
            return;
        }

        match envelope.event {
            FeedEvent::Message(raw) => {
                let Some(reconciled) =
                    self.reconciler
                        .on_message(&raw, &mut self.store, &mut self.indicators)
                else {
                    return;
                };
                self.publish(ChartEvent::bar(&reconciled.bar, reconciled.outcome));
                self.publish_indicators(&reconciled.indicators);
            }
            FeedEvent::Connected => {
                info!("Feed connected: {}", self.instrument_key());
                self.publish(ChartEvent::Connection(ConnectionStatus::Connected));
            }
            FeedEvent::Disconnected => {
                warn!("Feed disconnected: {}", self.instrument_key());
                self.publish(ChartEvent::Connection(ConnectionStatus::Disconnected));
            }
            FeedEvent::Error(msg) => {
                warn!("Feed error on {}: {}", self.instrument_key(), msg);
                self.publish(ChartEvent::Connection(ConnectionStatus::Error));
            }
        }
    }

    /// Handle every feed event already queued. Returns how many were taken.
    ///
    /// Only useful while the session is driven directly; a running actor
    /// owns the feed receiver.
    pub fn process_pending_feed(&mut self) -> usize {
        let mut batch = Vec::new();
        if let Some(rx) = self.feed_rx.as_mut() {
            while let Ok(envelope) = rx.try_recv() {
                batch.push(envelope);
            }
        }
        let count = batch.len();
        for envelope in batch {
            self.handle_feed_event(envelope);
        }
        count
    }

    /// Close the feed and go idle. The series is kept.
    pub async fn shutdown(&mut self) {
        self.close_feed().await;
        self.generation += 1;
        self.set_state(SessionState::Idle);
        info!("Session stopped");
    }

    /// Spawn the session on the tokio runtime
    pub fn spawn(self) -> (SessionHandle, JoinHandle<()>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(self.run(rx));
        (SessionHandle { commands: tx }, task)
    }

    /// Actor loop: serialise commands, load steps and feed events.
    ///
    /// A `SetInstrument`, `Refresh` or `Shutdown` arriving while a backfill
    /// or feed open is pending drops that step.
    pub async fn run(mut self, mut commands: mpsc::UnboundedReceiver<SessionCommand>) {
        let Some(mut feed_rx) = self.feed_rx.take() else {
            error!("Session is already running");
            return;
        };
        let mut pending: Option<PendingLoad> = None;

        loop {
            tokio::select! {
                biased;

                command = commands.recv() => {
                    match command {
                        Some(SessionCommand::SetInstrument { symbol, interval }) => {
                            drop(pending.take());
                            pending = Some(self.begin_backfill(Instrument::new(&symbol, interval)).await);
                        }
                        Some(SessionCommand::Refresh) => {
                            if let Some(instrument) = self.instrument.clone() {
                                drop(pending.take());
                                pending = Some(self.begin_backfill(instrument).await);
                            }
                        }
                        Some(SessionCommand::ToggleIndicator(kind)) => {
                            self.toggle_indicator(kind);
                        }
                        Some(SessionCommand::ClearIndicators) => self.clear_indicators(),
                        Some(SessionCommand::Shutdown) | None => {
                            drop(pending.take());
                            self.shutdown().await;
                            break;
                        }
                    }
                }
                step = wait_load(&mut pending) => {
                    let generation = pending.take().map(|p| p.generation).unwrap_or_default();
                    match self.advance_load(generation, step).await {
                        Ok(next) => pending = next,
                        Err(e) => error!("Session load failed: {}", e),
                    }
                }
                Some(envelope) = feed_rx.recv() => {
                    self.handle_feed_event(envelope);
                }
            }
        }
    }

    /// Tear down the current feed, reset the series and start a fetch.
    async fn begin_backfill(&mut self, instrument: Instrument) -> PendingLoad {
        self.close_feed().await;
        self.generation += 1;
        self.set_state(SessionState::Idle);

        info!("Loading {} (generation {})", instrument.key(), self.generation);
        self.store.clear();
        self.reconciler.set_instrument(Some(instrument.clone()));
        self.instrument = Some(instrument.clone());
        self.set_state(SessionState::Loading);

        let provider = self.provider.clone();
        let limit = self.config.backfill_limit;
        let step: LoadFuture = Box::pin(async move {
            LoadStep::Fetched(
                provider
                    .fetch(&instrument.symbol, instrument.interval, limit)
                    .await,
            )
        });

        PendingLoad {
            generation: self.generation,
            step,
        }
    }

    /// Drive a load to the end when the session is used directly
    async fn complete_load(&mut self, pending: PendingLoad) -> BarResult<()> {
        let mut next = Some(pending);
        while let Some(PendingLoad { generation, step }) = next.take() {
            next = self.advance_load(generation, step.await).await?;
        }
        Ok(())
    }

    /// Apply a finished step. Returns the next step, if any.
    async fn advance_load(&mut self, generation: u64, step: LoadStep) -> BarResult<Option<PendingLoad>> {
        let result = match step {
            LoadStep::Fetched(result) => self.finish_backfill(generation, result),
            LoadStep::Opened(result) => self.finish_open(generation, result).await.map(|_| None),
        };
        result.inspect_err(|e| self.publish(ChartEvent::LoadFailed(e.clone())))
    }

    /// Apply a finished fetch and start opening the feed.
    fn finish_backfill(
        &mut self,
        generation: u64,
        result: Result<Vec<Bar>, String>,
    ) -> BarResult<Option<PendingLoad>> {
        if generation != self.generation {
            debug!("Ignoring backfill of generation {}", generation);
            return Ok(None);
        }
        let Some(instrument) = self.instrument.clone() else {
            return Ok(None);
        };

        let loaded = result
            .map_err(BarError::BackfillFailed)
            .and_then(|bars| self.store.replace_all(bars));
        if let Err(e) = loaded {
            self.store.clear();
            self.publish_history(&instrument);
            self.set_state(SessionState::Idle);
            return Err(e);
        }

        info!("Backfilled {} bars for {}", self.store.len(), instrument.key());
        self.publish_history(&instrument);

        let connector = self.connector.clone();
        let sender = FeedEventSender::new(self.generation, self.feed_tx.clone());
        let step: LoadFuture = Box::pin(async move {
            LoadStep::Opened(connector.open(&instrument, sender).await)
        });
        Ok(Some(PendingLoad {
            generation: self.generation,
            step,
        }))
    }

    /// Keep the opened connection and go live.
    async fn finish_open(
        &mut self,
        generation: u64,
        result: Result<Box<dyn FeedConnection>, String>,
    ) -> BarResult<()> {
        if generation != self.generation {
            debug!("Ignoring feed opened for generation {}", generation);
            if let Ok(connection) = result {
                connection.close().await;
            }
            return Ok(());
        }

        match result {
            Ok(connection) => {
                self.connection = Some(connection);
                self.set_state(SessionState::Live);
                Ok(())
            }
            Err(e) => {
                self.set_state(SessionState::Idle);
                Err(BarError::FeedFailed(e))
            }
        }
    }

    async fn close_feed(&mut self) {
        if let Some(connection) = self.connection.take() {
            debug!("Closing feed of generation {}", self.generation);
            connection.close().await;
        }
    }

    fn publish_history(&mut self, instrument: &Instrument) {
        self.publish(ChartEvent::history(instrument, self.store.bars()));
        let updates = self.indicators.recompute_all(self.store.closes());
        self.publish_indicators(&updates);
    }

    fn publish_indicators(&self, updates: &[IndicatorUpdate]) {
        for update in updates {
            if let Some(item) = LineItem::from_update(update, self.store.bars()) {
                self.publish(ChartEvent::Indicator(item));
            }
        }
    }

    fn set_state(&mut self, state: SessionState) {
        if self.state != state {
            debug!("Session state {:?} -> {:?}", self.state, state);
            self.state = state;
            self.publish(ChartEvent::State(state));
        }
    }

    fn publish(&self, event: ChartEvent) {
        let _ = self.events.send(event);
    }

    fn instrument_key(&self) -> String {
        self.instrument
            .as_ref()
            .map(Instrument::key)
            .unwrap_or_default()
    }
}

async fn wait_load(pending: &mut Option<PendingLoad>) -> LoadStep {
    match pending {
        Some(p) => p.step.as_mut().await,
        None => std::future::pending().await,
    }
}

/// Cloneable handle to a spawned session
#[derive(Debug, Clone)]
pub struct SessionHandle {
    commands: mpsc::UnboundedSender<SessionCommand>,
}

impl SessionHandle {
    pub fn send(&self, command: SessionCommand) -> Result<(), String> {
        self.commands
            .send(command)
            .map_err(|_| "Session is not running".to_string())
    }

    pub fn set_instrument(&self, symbol: impl Into<String>, interval: Interval) -> Result<(), String> {
        self.send(SessionCommand::SetInstrument {
            symbol: symbol.into(),
            interval,
        })
    }

    pub fn toggle_indicator(&self, kind: IndicatorKind) -> Result<(), String> {
        self.send(SessionCommand::ToggleIndicator(kind))
    }

    pub fn clear_indicators(&self) -> Result<(), String> {
        self.send(SessionCommand::ClearIndicators)
    }

    pub fn refresh(&self) -> Result<(), String> {
        self.send(SessionCommand::Refresh)
    }

    pub fn shutdown(&self) -> Result<(), String> {
        self.send(SessionCommand::Shutdown)
    }

    pub fn is_closed(&self) -> bool {
        self.commands.is_closed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::{LineDelta, LinePoint};
    use crate::trader::object::ApplyOutcome;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;
    use tokio_test::{assert_err, assert_ok};

    struct StaticProvider {
        result: Result<Vec<Bar>, String>,
    }

    #[async_trait]
    impl BackfillProvider for StaticProvider {
        async fn fetch(&self, _symbol: &str, _interval: Interval, _limit: usize) -> Result<Vec<Bar>, String> {
            self.result.clone()
        }
    }

    struct MockConnection {
        closed: Arc<AtomicBool>,
    }

    #[async_trait]
    impl FeedConnection for MockConnection {
        async fn close(&self) {
            self.closed.store(true, Ordering::SeqCst);
        }
    }

    #[derive(Default)]
    struct MockConnector {
        fail: bool,
        senders: Mutex<Vec<FeedEventSender>>,
        closed: Mutex<Vec<Arc<AtomicBool>>>,
    }

    #[async_trait]
    impl FeedConnector for MockConnector {
        async fn open(
            &self,
            _instrument: &Instrument,
            sender: FeedEventSender,
        ) -> Result<Box<dyn FeedConnection>, String> {
            if self.fail {
                return Err("connection refused".to_string());
            }
            let closed = Arc::new(AtomicBool::new(false));
            self.senders.lock().unwrap().push(sender);
            self.closed.lock().unwrap().push(closed.clone());
            Ok(Box::new(MockConnection { closed }))
        }
    }

    fn history() -> Vec<Bar> {
        vec![Bar::flat(0, 10.0), Bar::flat(60, 11.0), Bar::flat(120, 12.0)]
    }

    fn kline(t_ms: i64, close: f64) -> String {
        format!(
            r#"{{"k":{{"t":{},"s":"BTCUSDT","i":"1m","o":"{c}","h":"{c}","l":"{c}","c":"{c}","v":"1"}}}}"#,
            t_ms,
            c = close
        )
    }

    fn session(
        result: Result<Vec<Bar>, String>,
        connector: Arc<MockConnector>,
    ) -> (SessionController, mpsc::UnboundedReceiver<ChartEvent>) {
        let config = SessionConfig { backfill_limit: 100, indicator_window: 2 };
        SessionController::new(Arc::new(StaticProvider { result }), connector, config)
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<ChartEvent>) -> Vec<ChartEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    #[tokio::test]
    async fn test_set_instrument_goes_live() {
        let connector = Arc::new(MockConnector::default());
        let (mut session, mut rx) = session(Ok(history()), connector.clone());

        assert_ok!(session.set_instrument(" btcusdt ", Interval::Minute).await);
        assert_eq!(session.state(), SessionState::Live);
        assert_eq!(session.instrument().unwrap().symbol, "BTCUSDT");
        assert_eq!(session.store().snapshot(), history());
        assert_eq!(connector.senders.lock().unwrap()[0].generation(), session.generation());

        let events = drain(&mut rx);
        assert_eq!(events[0], ChartEvent::State(SessionState::Loading));
        assert!(matches!(&events[1], ChartEvent::History { candles, .. } if candles.len() == 3));
        assert_eq!(events[2], ChartEvent::State(SessionState::Live));
    }

    #[tokio::test]
    async fn test_backfill_failure_leaves_session_idle() {
        let connector = Arc::new(MockConnector::default());
        let (mut session, mut rx) = session(Err("HTTP 500".to_string()), connector.clone());

        let err = assert_err!(session.set_instrument("BTCUSDT", Interval::Minute).await);
        assert_eq!(err, BarError::BackfillFailed("HTTP 500".to_string()));
        assert_eq!(session.state(), SessionState::Idle);
        assert!(session.store().is_empty());
        assert!(connector.senders.lock().unwrap().is_empty());

        let events = drain(&mut rx);
        assert_eq!(events.last(), Some(&ChartEvent::LoadFailed(err)));
    }

    #[tokio::test]
    async fn test_invalid_backfill_leaves_session_idle() {
        let connector = Arc::new(MockConnector::default());
        let bars = vec![Bar::flat(60, 1.0), Bar::flat(60, 2.0)];
        let (mut session, _rx) = session(Ok(bars), connector);

        let err = assert_err!(session.set_instrument("BTCUSDT", Interval::Minute).await);
        assert!(matches!(err, BarError::InvalidBackfill { index: 1, time: 60, previous: 60 }));
        assert_eq!(session.state(), SessionState::Idle);
        assert!(session.store().is_empty());
    }

    #[tokio::test]
    async fn test_feed_failure_keeps_backfill() {
        let connector = Arc::new(MockConnector { fail: true, ..Default::default() });
        let (mut session, mut rx) = session(Ok(history()), connector);

        let err = assert_err!(session.set_instrument("BTCUSDT", Interval::Minute).await);
        assert!(matches!(err, BarError::FeedFailed(_)));
        assert_eq!(session.state(), SessionState::Idle);
        assert_eq!(session.store().len(), 3);

        let events = drain(&mut rx);
        assert!(matches!(events.last(), Some(ChartEvent::LoadFailed(BarError::FeedFailed(_)))));
    }

    #[tokio::test]
    async fn test_feed_messages_update_series_and_indicators() {
        let connector = Arc::new(MockConnector::default());
        let (mut session, mut rx) = session(Ok(history()), connector.clone());
        session.set_instrument("BTCUSDT", Interval::Minute).await.unwrap();
        assert!(session.toggle_indicator(IndicatorKind::Sma));
        drain(&mut rx);

        let sender = connector.senders.lock().unwrap()[0].clone();
        sender.on_connected();
        sender.on_message(kline(180_000, 14.0));
        sender.on_message(kline(60_000, 99.0));
        assert_eq!(session.process_pending_feed(), 3);

        assert_eq!(session.store().len(), 4);
        assert_eq!(session.store().get(1).unwrap().close, 11.0);
        assert_eq!(session.stats().stale, 1);

        let events = drain(&mut rx);
        assert_eq!(events[0], ChartEvent::Connection(ConnectionStatus::Connected));
        assert!(matches!(&events[1], ChartEvent::Bar { outcome: ApplyOutcome::Appended, .. }));
        match &events[2] {
            ChartEvent::Indicator(item) => {
                assert_eq!(item.delta, LineDelta::Last(LinePoint { time: 180, value: Some(13.0) }));
            }
            other => panic!("unexpected event {:?}", other),
        }
        assert_eq!(events.len(), 3);
    }

    #[tokio::test]
    async fn test_old_generation_is_dropped() {
        let connector = Arc::new(MockConnector::default());
        let (mut session, _rx) = session(Ok(history()), connector.clone());
        session.set_instrument("BTCUSDT", Interval::Minute).await.unwrap();
        let old = connector.senders.lock().unwrap()[0].clone();

        session.set_instrument("BTCUSDT", Interval::Minute).await.unwrap();
        assert!(connector.closed.lock().unwrap()[0].load(Ordering::SeqCst));

        old.on_message(kline(180_000, 14.0));
        old.on_error("late");
        assert_eq!(session.process_pending_feed(), 2);
        assert_eq!(session.store().len(), 3);
        assert_eq!(session.stats().received, 0);
    }

    #[tokio::test]
    async fn test_toggle_and_clear_indicators() {
        let connector = Arc::new(MockConnector::default());
        let (mut session, mut rx) = session(Ok(history()), connector);
        session.set_instrument("BTCUSDT", Interval::Minute).await.unwrap();
        drain(&mut rx);

        assert!(session.toggle_indicator(IndicatorKind::Ema));
        assert_eq!(session.indicators().line(IndicatorKind::Ema).len(), 3);
        assert!(matches!(
            drain(&mut rx).as_slice(),
            [ChartEvent::Indicator(LineItem { delta: LineDelta::Full(_), .. })]
        ));

        session.clear_indicators();
        assert!(!session.indicators().any_active());
        assert!(matches!(
            drain(&mut rx).as_slice(),
            [ChartEvent::Indicator(LineItem { delta: LineDelta::Cleared, .. })]
        ));
    }

    #[tokio::test]
    async fn test_refresh_without_instrument_is_noop() {
        let connector = Arc::new(MockConnector::default());
        let (mut session, mut rx) = session(Ok(history()), connector);
        assert_ok!(session.refresh().await);
        assert_eq!(session.state(), SessionState::Idle);
        assert!(drain(&mut rx).is_empty());
    }

    #[tokio::test]
    async fn test_shutdown_closes_feed() {
        let connector = Arc::new(MockConnector::default());
        let (mut session, _rx) = session(Ok(history()), connector.clone());
        session.set_instrument("BTCUSDT", Interval::Minute).await.unwrap();
        let sender = connector.senders.lock().unwrap()[0].clone();

        session.shutdown().await;
        assert_eq!(session.state(), SessionState::Idle);
        assert!(connector.closed.lock().unwrap()[0].load(Ordering::SeqCst));

        sender.on_message(kline(180_000, 14.0));
        session.process_pending_feed();
        assert_eq!(session.store().len(), 3);
    }

    #[test]
    fn test_config_from_settings() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::load_from(&dir.path().join("none.json"));
        settings.set("indicator.window", crate::trader::setting::SettingValue::Int(0));
        let config = SessionConfig::from_settings(&settings);
        assert_eq!(config.backfill_limit, 500);
        assert_eq!(config.indicator_window, DEFAULT_WINDOW);
    }
}
