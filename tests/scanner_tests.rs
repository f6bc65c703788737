//! Интеграционные тесты сканера: полный цикл на моковом источнике свечей
//! и записывающем нотификаторе, без сети

#![cfg(feature = "live")]

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use marubozu_scanner::alerts::{AlertLedger, Notifier, NotifyError};
use marubozu_scanner::exchanges::{FetchError, MarketDataSource};
use marubozu_scanner::models::{Candle, Direction, Instrument, TrendLabel};
use marubozu_scanner::patterns::Rejection;
use marubozu_scanner::screener::scanner::{ScanError, Scanner, ShutdownSignal, SkipReason, SymbolOutcome};
use marubozu_scanner::utils::config::ScannerConfig;

const HOUR_MS: i64 = 3_600_000;

// ---------- моки ----------

#[derive(Default)]
struct MockSource {
    universe: Vec<Instrument>,
    candles: Mutex<HashMap<String, Vec<Candle>>>,
    fail_universe: bool,
    candle_calls: AtomicUsize,
}

impl MockSource {
    fn with_symbols(symbols: &[&str]) -> Self {
        let universe = symbols
            .iter()
            .enumerate()
            .map(|(i, s)| Instrument {
                symbol: s.to_string(),
                quote_volume: 1_000_000.0 - i as f64,
                tradable: true,
            })
            .collect();
        Self { universe, ..Self::default() }
    }

    fn set_candles(&self, symbol: &str, candles: Vec<Candle>) {
        self.candles.lock().insert(symbol.to_string(), candles);
    }
}

#[async_trait]
impl MarketDataSource for MockSource {
    async fn instruments(&self, _perpetual_only: bool) -> Result<Vec<Instrument>, FetchError> {
        if self.fail_universe {
            return Err(FetchError::Status { status: 503, body: "maintenance".to_string() });
        }
        Ok(self.universe.clone())
    }

    async fn candles(&self, symbol: &str, _interval: &str, _limit: u32) -> Result<Vec<Candle>, FetchError> {
        self.candle_calls.fetch_add(1, Ordering::SeqCst);
        self.candles
            .lock()
            .get(symbol)
            .cloned()
            .ok_or_else(|| FetchError::Malformed(format!("no candles for {}", symbol)))
    }
}

#[derive(Default)]
struct RecordingNotifier {
    sent: Mutex<Vec<String>>,
    attempts: AtomicUsize,
    fail: bool,
    stop_on_send: Option<ShutdownSignal>,
}

impl RecordingNotifier {
    fn sent(&self) -> Vec<String> {
        self.sent.lock().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, message: &str) -> Result<(), NotifyError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if let Some(shutdown) = &self.stop_on_send {
            shutdown.trigger();
        }
        if self.fail {
            return Err(NotifyError::Rejected { status: 500, description: "boom".to_string() });
        }
        self.sent.lock().push(message.to_string());
        Ok(())
    }

    fn name(&self) -> &str {
        "recording"
    }
}

// ---------- фикстуры ----------

fn test_config() -> ScannerConfig {
    ScannerConfig {
        ema_short: 5,
        ema_long: 20,
        cycle_interval_secs: 3600,
        error_backoff_secs: 3600,
        ..ScannerConfig::default()
    }
}

/// Плавный рост мелкими бычьими свечами
fn uptrend_history(start: i64, count: usize) -> Vec<Candle> {
    (0..count)
        .map(|i| {
            let open = 100.0 + i as f64 * 0.5;
            let close = open + 0.3;
            Candle {
                open_time: (start + i as i64) * HOUR_MS,
                open,
                high: close + 0.1,
                low: open - 0.1,
                close,
                volume: 1000.0,
            }
        })
        .collect()
}

fn forming_candle(open_time: i64, open: f64) -> Candle {
    Candle { open_time, open, high: open + 0.3, low: open - 0.1, close: open + 0.2, volume: 100.0 }
}

/// 38 мелких свечей, бычий марубозу, незакрытая свеча
fn bullish_setup(start: i64) -> Vec<Candle> {
    let mut candles = uptrend_history(start, 38);
    let t = (start + 38) * HOUR_MS;
    candles.push(Candle { open_time: t, open: 119.0, high: 125.1, low: 118.95, close: 125.0, volume: 5000.0 });
    candles.push(forming_candle(t + HOUR_MS, 125.0));
    candles
}

/// Медвежий марубозу против восходящего тренда
fn bearish_counter_trend_setup() -> Vec<Candle> {
    let mut candles = uptrend_history(0, 38);
    let t = 38 * HOUR_MS;
    candles.push(Candle { open_time: t, open: 119.0, high: 119.05, low: 112.9, close: 113.0, volume: 5000.0 });
    candles.push(forming_candle(t + HOUR_MS, 113.0));
    candles
}

fn scanner_with(config: ScannerConfig, source: Arc<MockSource>, notifier: Arc<RecordingNotifier>) -> Scanner {
    Scanner::new(config, source, notifier)
}

// ---------- analyze ----------

#[test]
fn test_analyze_finds_bullish_signal_on_last_closed_candle() {
    let scanner = scanner_with(test_config(), Arc::new(MockSource::default()), Arc::default());
    let candles = bullish_setup(0);

    let (signal, candle) = scanner.analyze("BTCUSDT", &candles).unwrap();

    assert_eq!(signal.direction, Direction::Bullish);
    assert_eq!(signal.trend, Some(TrendLabel::Up));
    assert_eq!(signal.candle_open_time, 38 * HOUR_MS);
    assert_eq!(candle.close, 125.0);
    assert_eq!(signal.entry, 125.0);
    assert!(signal.stop_loss < candle.low);
    assert!(signal.take_profit > signal.entry);
}

#[test]
fn test_analyze_ignores_forming_candle() {
    let scanner = scanner_with(test_config(), Arc::new(MockSource::default()), Arc::default());

    // Незакрытая свеча - идеальный марубозу, последняя закрытая - обычная
    let mut candles = uptrend_history(0, 39);
    candles.push(Candle { open_time: 39 * HOUR_MS, open: 120.0, high: 130.0, low: 120.0, close: 130.0, volume: 9000.0 });

    let result = scanner.analyze("BTCUSDT", &candles);
    assert_eq!(result.unwrap_err(), SkipReason::NoPattern(Rejection::BodyRatio));
}

#[test]
fn test_analyze_not_enough_candles() {
    let scanner = scanner_with(test_config(), Arc::new(MockSource::default()), Arc::default());
    let candles = uptrend_history(0, 20);

    assert_eq!(
        scanner.analyze("BTCUSDT", &candles).unwrap_err(),
        SkipReason::NotEnoughCandles { got: 20, need: 30 }
    );
}

#[test]
fn test_analyze_trend_filter_blocks_counter_trend() {
    let scanner = scanner_with(test_config(), Arc::new(MockSource::default()), Arc::default());

    let result = scanner.analyze("BTCUSDT", &bearish_counter_trend_setup());
    assert_eq!(
        result.unwrap_err(),
        SkipReason::TrendMismatch { direction: Direction::Bearish, trend: Some(TrendLabel::Up) }
    );
}

#[test]
fn test_analyze_without_trend_filter_allows_counter_trend() {
    let mut config = test_config();
    config.signal.use_trend_filter = false;
    let scanner = scanner_with(config, Arc::new(MockSource::default()), Arc::default());

    let (signal, _) = scanner.analyze("BTCUSDT", &bearish_counter_trend_setup()).unwrap();
    assert_eq!(signal.direction, Direction::Bearish);
    assert_eq!(signal.trend, Some(TrendLabel::Up));
}

#[test]
fn test_analyze_short_trend_history() {
    let mut config = test_config();
    config.ema_long = 200;
    let scanner = scanner_with(config.clone(), Arc::new(MockSource::default()), Arc::default());

    assert_eq!(
        scanner.analyze("BTCUSDT", &bullish_setup(0)).unwrap_err(),
        SkipReason::InsufficientTrendHistory
    );

    // Без фильтра тренд просто не указывается
    config.signal.use_trend_filter = false;
    let scanner = scanner_with(config, Arc::new(MockSource::default()), Arc::default());
    let (signal, _) = scanner.analyze("BTCUSDT", &bullish_setup(0)).unwrap();
    assert_eq!(signal.trend, None);
}

// ---------- run_cycle ----------

#[tokio::test]
async fn test_alert_sent_once_per_candle() {
    let source = Arc::new(MockSource::with_symbols(&["BTCUSDT"]));
    source.set_candles("BTCUSDT", bullish_setup(0));
    let notifier = Arc::new(RecordingNotifier::default());
    let scanner = scanner_with(test_config(), source.clone(), notifier.clone());

    let first = scanner.run_cycle().await.unwrap();
    assert_eq!(first.alerted, 1);
    assert_eq!(first.scanned, 1);

    let second = scanner.run_cycle().await.unwrap();
    assert_eq!(second.alerted, 0);
    assert_eq!(second.skipped, 1);

    let sent = notifier.sent();
    assert_eq!(sent.len(), 1);
    assert!(sent[0].contains("BULL MARUBOZU"));
    assert!(sent[0].contains("BTCUSDT"));
    assert_eq!(scanner.ledger().last_alerted("BTCUSDT"), Some(38 * HOUR_MS));
}

#[tokio::test]
async fn test_new_candle_triggers_new_alert() {
    let source = Arc::new(MockSource::with_symbols(&["BTCUSDT"]));
    source.set_candles("BTCUSDT", bullish_setup(0));
    let notifier = Arc::new(RecordingNotifier::default());
    let scanner = scanner_with(test_config(), source.clone(), notifier.clone());

    scanner.run_cycle().await.unwrap();

    source.set_candles("BTCUSDT", bullish_setup(1));
    let report = scanner.run_cycle().await.unwrap();

    assert_eq!(report.alerted, 1);
    assert_eq!(notifier.sent().len(), 2);
    assert_eq!(scanner.ledger().last_alerted("BTCUSDT"), Some(39 * HOUR_MS));
}

#[tokio::test]
async fn test_fetch_failure_is_isolated() {
    // BADUSDT без свечей - мок вернет ошибку
    let source = Arc::new(MockSource::with_symbols(&["BADUSDT", "BTCUSDT"]));
    source.set_candles("BTCUSDT", bullish_setup(0));
    let notifier = Arc::new(RecordingNotifier::default());
    let scanner = scanner_with(test_config(), source.clone(), notifier.clone());

    let report = scanner.run_cycle().await.unwrap();

    assert_eq!(report.universe, 2);
    assert_eq!(report.scanned, 2);
    assert_eq!(report.failed, 1);
    assert_eq!(report.alerted, 1);
    assert!(!report.interrupted());

    match scanner.scan_symbol("BADUSDT").await {
        SymbolOutcome::Failed(FetchError::Malformed(_)) => {}
        other => panic!("unexpected outcome: {:?}", other),
    }
}

#[tokio::test]
async fn test_universe_failure_aborts_cycle() {
    let source = Arc::new(MockSource {
        fail_universe: true,
        ..MockSource::with_symbols(&["BTCUSDT"])
    });
    let scanner = scanner_with(test_config(), source.clone(), Arc::default());

    let result = scanner.run_cycle().await;

    assert!(matches!(result, Err(ScanError::Universe(FetchError::Status { status: 503, .. }))));
    assert_eq!(source.candle_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_universe_respects_quote_and_top_n() {
    let source = Arc::new(MockSource::with_symbols(&["BTCUSDT", "ETHBTC", "ETHUSDT", "SOLUSDT"]));
    let mut config = test_config();
    config.universe.top_n = Some(2);
    let scanner = scanner_with(config, source, Arc::default());

    let symbols = scanner.fetch_universe().await.unwrap();
    assert_eq!(symbols, vec!["BTCUSDT".to_string(), "ETHUSDT".to_string()]);
}

#[tokio::test]
async fn test_delivery_failure_still_recorded() {
    let source = Arc::new(MockSource::with_symbols(&["BTCUSDT"]));
    source.set_candles("BTCUSDT", bullish_setup(0));
    let notifier = Arc::new(RecordingNotifier { fail: true, ..RecordingNotifier::default() });
    let scanner = scanner_with(test_config(), source, notifier.clone());

    let report = scanner.run_cycle().await.unwrap();
    assert_eq!(report.alerted, 1);
    assert_eq!(report.undelivered, 1);

    // Повторной попытки по той же свече нет
    scanner.run_cycle().await.unwrap();
    assert_eq!(notifier.attempts.load(Ordering::SeqCst), 1);
    assert_eq!(scanner.ledger().last_alerted("BTCUSDT"), Some(38 * HOUR_MS));
}

#[tokio::test]
async fn test_shared_ledger_across_scanners() {
    let source = Arc::new(MockSource::with_symbols(&["BTCUSDT"]));
    source.set_candles("BTCUSDT", bullish_setup(0));
    let ledger = Arc::new(AlertLedger::new());
    ledger.record_alert("BTCUSDT", 38 * HOUR_MS);

    let notifier = Arc::new(RecordingNotifier::default());
    let scanner = scanner_with(test_config(), source, notifier.clone()).with_ledger(ledger);

    let report = scanner.run_cycle().await.unwrap();
    assert_eq!(report.alerted, 0);
    assert!(notifier.sent().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_cycles_do_not_duplicate_alerts() {
    let symbols = ["BTCUSDT", "ETHUSDT", "SOLUSDT", "XRPUSDT", "BNBUSDT"];
    let source = Arc::new(MockSource::with_symbols(&symbols));
    for symbol in symbols {
        source.set_candles(symbol, bullish_setup(0));
    }
    let notifier = Arc::new(RecordingNotifier::default());
    let mut config = test_config();
    config.max_concurrent_requests = 4;
    let scanner = scanner_with(config, source, notifier.clone());

    let (a, b) = tokio::join!(scanner.run_cycle(), scanner.run_cycle());
    let total = a.unwrap().alerted + b.unwrap().alerted;

    assert_eq!(total, symbols.len());
    assert_eq!(notifier.sent().len(), symbols.len());
    assert_eq!(scanner.ledger().len(), symbols.len());
}

// ---------- остановка ----------

#[tokio::test]
async fn test_cycle_after_shutdown_scans_nothing() {
    let source = Arc::new(MockSource::with_symbols(&["BTCUSDT", "ETHUSDT"]));
    let scanner = scanner_with(test_config(), source.clone(), Arc::default());
    scanner.shutdown_signal().trigger();

    let report = scanner.run_cycle().await.unwrap();

    assert_eq!(report.universe, 2);
    assert_eq!(report.scanned, 0);
    assert!(report.interrupted());
    assert_eq!(source.candle_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_shutdown_mid_cycle_finishes_current_symbol() {
    let source = Arc::new(MockSource::with_symbols(&["BTCUSDT", "ETHUSDT", "SOLUSDT"]));
    for symbol in ["BTCUSDT", "ETHUSDT", "SOLUSDT"] {
        source.set_candles(symbol, bullish_setup(0));
    }
    let shutdown = ShutdownSignal::new();
    let notifier = Arc::new(RecordingNotifier { stop_on_send: Some(shutdown.clone()), ..RecordingNotifier::default() });
    let scanner = scanner_with(test_config(), source, notifier.clone()).with_shutdown(shutdown);

    let report = scanner.run_cycle().await.unwrap();

    assert_eq!(report.scanned, 1);
    assert_eq!(report.alerted, 1);
    assert!(report.interrupted());
    assert_eq!(notifier.sent().len(), 1);
}

#[tokio::test]
async fn test_run_stops_during_pause() {
    let source = Arc::new(MockSource::with_symbols(&["BTCUSDT"]));
    source.set_candles("BTCUSDT", uptrend_history(0, 40));
    let scanner = scanner_with(test_config(), source.clone(), Arc::default());

    let shutdown = scanner.shutdown_signal();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        shutdown.trigger();
    });

    // Пауза между циклами - час, выход должен быть сразу после сигнала
    let finished = tokio::time::timeout(Duration::from_secs(5), scanner.run()).await;
    assert!(finished.is_ok());
    assert_eq!(source.candle_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_run_backs_off_on_universe_error_until_shutdown() {
    let source = Arc::new(MockSource { fail_universe: true, ..MockSource::default() });
    let scanner = scanner_with(test_config(), source, Arc::default());

    let shutdown = scanner.shutdown_signal();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        shutdown.trigger();
    });

    let finished = tokio::time::timeout(Duration::from_secs(5), scanner.run()).await;
    assert!(finished.is_ok());
}
