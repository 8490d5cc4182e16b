//! End-to-end tests of a spawned session with in-memory collaborators.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{mpsc, Notify};
use tokio::time::timeout;

use kline_session::chart::{ChartEvent, IndicatorKind, LineDelta, LinePoint};
use kline_session::error::BarError;
use kline_session::trader::{
    ApplyOutcome, BackfillProvider, Bar, FeedConnection, FeedConnector, FeedEventSender, Instrument,
    Interval, SessionConfig, SessionController, SessionHandle, SessionState,
};

/// Sets its flag when dropped, i.e. when the fetch future is cancelled
struct DropFlag(Arc<AtomicBool>);

impl Drop for DropFlag {
    fn drop(&mut self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

/// "SLOW*" never completes, "BAD*" fails, anything else returns three bars
struct ScriptedProvider {
    slow_started: Arc<Notify>,
    slow_cancelled: Arc<AtomicBool>,
}

#[async_trait]
impl BackfillProvider for ScriptedProvider {
    async fn fetch(&self, symbol: &str, _interval: Interval, _limit: usize) -> Result<Vec<Bar>, String> {
        if symbol.starts_with("SLOW") {
            let _guard = DropFlag(self.slow_cancelled.clone());
            self.slow_started.notify_one();
            std::future::pending::<()>().await;
        }
        if symbol.starts_with("BAD") {
            return Err("HTTP 500".to_string());
        }
        Ok(vec![Bar::flat(0, 10.0), Bar::flat(60, 11.0), Bar::flat(120, 12.0)])
    }
}

struct NoopConnection;

#[async_trait]
impl FeedConnection for NoopConnection {
    async fn close(&self) {}
}

/// Records every opened feed. "HANG*" never finishes opening.
#[derive(Default)]
struct RecordingConnector {
    opened: Mutex<Vec<(Instrument, FeedEventSender)>>,
    hang_started: Arc<Notify>,
    hang_cancelled: Arc<AtomicBool>,
}

impl RecordingConnector {
    fn sender(&self, ix: usize) -> FeedEventSender {
        self.opened.lock().unwrap()[ix].1.clone()
    }
}

#[async_trait]
impl FeedConnector for RecordingConnector {
    async fn open(
        &self,
        instrument: &Instrument,
        sender: FeedEventSender,
    ) -> Result<Box<dyn FeedConnection>, String> {
        if instrument.symbol.starts_with("HANG") {
            let _guard = DropFlag(self.hang_cancelled.clone());
            self.hang_started.notify_one();
            std::future::pending::<()>().await;
        }
        self.opened.lock().unwrap().push((instrument.clone(), sender));
        Ok(Box::new(NoopConnection))
    }
}

struct Harness {
    handle: SessionHandle,
    events: mpsc::UnboundedReceiver<ChartEvent>,
    connector: Arc<RecordingConnector>,
    slow_started: Arc<Notify>,
    slow_cancelled: Arc<AtomicBool>,
}

fn spawn_session() -> Harness {
    let slow_started = Arc::new(Notify::new());
    let slow_cancelled = Arc::new(AtomicBool::new(false));
    let connector = Arc::new(RecordingConnector::default());
    let provider = Arc::new(ScriptedProvider {
        slow_started: slow_started.clone(),
        slow_cancelled: slow_cancelled.clone(),
    });
    let config = SessionConfig { backfill_limit: 500, indicator_window: 2 };

    let (session, events) = SessionController::new(provider, connector.clone(), config);
    let (handle, _task) = session.spawn();
    Harness { handle, events, connector, slow_started, slow_cancelled }
}

fn kline(symbol: &str, t_ms: i64, close: f64) -> String {
    format!(
        r#"{{"e":"kline","k":{{"t":{},"s":"{}","i":"1m","o":"10","h":"{c}","l":"9","c":"{c}","v":"5","x":false}}}}"#,
        t_ms,
        symbol,
        c = close
    )
}

/// Wait for the next event matching `pred`, skipping the rest
async fn next_event<F>(events: &mut mpsc::UnboundedReceiver<ChartEvent>, pred: F) -> ChartEvent
where
    F: Fn(&ChartEvent) -> bool,
{
    timeout(Duration::from_secs(5), async {
        loop {
            let event = events.recv().await.expect("session stopped");
            if pred(&event) {
                return event;
            }
        }
    })
    .await
    .expect("timed out waiting for chart event")
}

fn is_live(event: &ChartEvent) -> bool {
    *event == ChartEvent::State(SessionState::Live)
}

#[tokio::test]
async fn test_session_goes_live_and_streams() {
    let mut h = spawn_session();
    h.handle.set_instrument("btcusdt", Interval::Minute).unwrap();

    let history = next_event(&mut h.events, |e| matches!(e, ChartEvent::History { .. })).await;
    match history {
        ChartEvent::History { instrument, candles, volumes } => {
            assert_eq!(instrument, Instrument::new("BTCUSDT", Interval::Minute));
            assert_eq!(candles.len(), 3);
            assert_eq!(volumes.len(), 3);
        }
        _ => unreachable!(),
    }
    next_event(&mut h.events, is_live).await;

    h.handle.toggle_indicator(IndicatorKind::Sma).unwrap();
    let full = next_event(&mut h.events, |e| matches!(e, ChartEvent::Indicator(_))).await;
    assert!(matches!(full, ChartEvent::Indicator(item) if matches!(item.delta, LineDelta::Full(ref p) if p.len() == 3)));

    let sender = h.connector.sender(0);
    sender.on_message(kline("BTCUSDT", 120_000, 12.5));
    sender.on_message(kline("BTCUSDT", 180_000, 13.0));

    let amended = next_event(&mut h.events, |e| matches!(e, ChartEvent::Bar { .. })).await;
    assert!(matches!(amended, ChartEvent::Bar { outcome: ApplyOutcome::Amended, candle, .. } if candle.close == 12.5));

    let line = next_event(&mut h.events, |e| matches!(e, ChartEvent::Indicator(_))).await;
    match line {
        ChartEvent::Indicator(item) => {
            assert_eq!(item.delta, LineDelta::Last(LinePoint { time: 120, value: Some(11.75) }));
        }
        _ => unreachable!(),
    }

    let appended = next_event(&mut h.events, |e| matches!(e, ChartEvent::Bar { .. })).await;
    assert!(matches!(appended, ChartEvent::Bar { outcome: ApplyOutcome::Appended, candle, .. } if candle.time == 180));

    h.handle.shutdown().unwrap();
}

#[tokio::test]
async fn test_new_instrument_cancels_pending_backfill() {
    let mut h = spawn_session();
    h.handle.set_instrument("SLOWUSDT", Interval::Minute).unwrap();
    next_event(&mut h.events, |e| *e == ChartEvent::State(SessionState::Loading)).await;
    timeout(Duration::from_secs(5), h.slow_started.notified())
        .await
        .expect("slow fetch never started");
    assert!(!h.slow_cancelled.load(Ordering::SeqCst));

    h.handle.set_instrument("ETHUSDT", Interval::Minute).unwrap();
    let history = next_event(&mut h.events, |e| matches!(e, ChartEvent::History { .. })).await;
    assert!(matches!(history, ChartEvent::History { instrument, .. } if instrument.symbol == "ETHUSDT"));
    next_event(&mut h.events, is_live).await;

    assert!(h.slow_cancelled.load(Ordering::SeqCst));
    let opened = h.connector.opened.lock().unwrap();
    assert_eq!(opened.len(), 1);
    assert_eq!(opened[0].0.symbol, "ETHUSDT");
}

#[tokio::test]
async fn test_messages_from_previous_instrument_are_dropped() {
    let mut h = spawn_session();
    h.handle.set_instrument("BTCUSDT", Interval::Minute).unwrap();
    next_event(&mut h.events, is_live).await;
    let old = h.connector.sender(0);

    h.handle.set_instrument("ETHUSDT", Interval::Minute).unwrap();
    next_event(&mut h.events, is_live).await;
    let new = h.connector.sender(1);
    assert!(new.generation() > old.generation());

    // Same payload shape on both; only the generation tells them apart
    old.on_message(kline("ETHUSDT", 180_000, 99.0));
    new.on_message(kline("ETHUSDT", 180_000, 13.0));

    let bar = next_event(&mut h.events, |e| matches!(e, ChartEvent::Bar { .. })).await;
    assert!(matches!(bar, ChartEvent::Bar { candle, .. } if candle.close == 13.0));
}

#[tokio::test]
async fn test_backfill_failure_then_refresh() {
    let mut h = spawn_session();
    h.handle.set_instrument("BADUSDT", Interval::Minute).unwrap();

    let history = next_event(&mut h.events, |e| matches!(e, ChartEvent::History { .. })).await;
    assert!(matches!(history, ChartEvent::History { candles, .. } if candles.is_empty()));
    next_event(&mut h.events, |e| *e == ChartEvent::State(SessionState::Idle)).await;
    assert!(h.connector.opened.lock().unwrap().is_empty());

    // A good instrument afterwards loads normally, and refresh reloads it
    h.handle.set_instrument("BTCUSDT", Interval::Minute).unwrap();
    next_event(&mut h.events, is_live).await;
    h.handle.refresh().unwrap();
    next_event(&mut h.events, |e| *e == ChartEvent::State(SessionState::Loading)).await;
    next_event(&mut h.events, is_live).await;
    assert_eq!(h.connector.opened.lock().unwrap().len(), 2);
}

#[tokio::test]
async fn test_new_instrument_cancels_pending_feed_open() {
    let mut h = spawn_session();
    h.handle.set_instrument("HANGUSDT", Interval::Minute).unwrap();
    let history = next_event(&mut h.events, |e| matches!(e, ChartEvent::History { .. })).await;
    assert!(matches!(history, ChartEvent::History { candles, .. } if candles.len() == 3));
    timeout(Duration::from_secs(5), h.connector.hang_started.notified())
        .await
        .expect("feed open never started");

    h.handle.set_instrument("ETHUSDT", Interval::Minute).unwrap();
    let history = next_event(&mut h.events, |e| matches!(e, ChartEvent::History { .. })).await;
    assert!(matches!(history, ChartEvent::History { instrument, .. } if instrument.symbol == "ETHUSDT"));
    next_event(&mut h.events, is_live).await;

    assert!(h.connector.hang_cancelled.load(Ordering::SeqCst));
    let opened = h.connector.opened.lock().unwrap();
    assert_eq!(opened.len(), 1);
    assert_eq!(opened[0].0.symbol, "ETHUSDT");
}

#[tokio::test]
async fn test_shutdown_while_feed_opens() {
    let mut h = spawn_session();
    h.handle.set_instrument("HANGUSDT", Interval::Minute).unwrap();
    next_event(&mut h.events, |e| matches!(e, ChartEvent::History { .. })).await;
    timeout(Duration::from_secs(5), h.connector.hang_started.notified())
        .await
        .expect("feed open never started");

    h.handle.shutdown().unwrap();
    next_event(&mut h.events, |e| *e == ChartEvent::State(SessionState::Idle)).await;
    assert!(h.connector.hang_cancelled.load(Ordering::SeqCst));
}

#[tokio::test]
async fn test_failed_load_is_reported() {
    let mut h = spawn_session();
    h.handle.set_instrument("BADUSDT", Interval::Minute).unwrap();
    let failed = next_event(&mut h.events, |e| matches!(e, ChartEvent::LoadFailed(_))).await;
    assert_eq!(failed, ChartEvent::LoadFailed(BarError::BackfillFailed("HTTP 500".to_string())));
}

#[tokio::test]
async fn test_shutdown_stops_the_session() {
    let h = spawn_session();
    h.handle.shutdown().unwrap();
    timeout(Duration::from_secs(5), async {
        while !h.handle.is_closed() {
            tokio::task::yield_now().await;
        }
    })
    .await
    .expect("session did not stop");
    assert!(h.handle.set_instrument("BTCUSDT", Interval::Minute).is_err());
}
