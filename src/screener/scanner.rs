//! Оркестратор сканирования
//!
//! Цикл: вселенная -> по каждому символу (свечи -> детектор -> тренд -> сигнал -> леджер -> алерт)
//! -> пауза -> снова. Ошибка одного символа не прерывает цикл, ошибка загрузки
//! вселенной дает короткую паузу (backoff) и повтор всего цикла.

use futures_util::future;
use futures_util::stream::{self, StreamExt};
use futures_util::FutureExt;
use std::any::Any;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;

use crate::alerts::{format_alert, AlertLedger, Notifier};
use crate::exchanges::{FetchError, MarketDataSource};
use crate::indicators::trend;
use crate::models::{Candle, Direction, Signal, TrendLabel};
use crate::patterns::{detect, BaselineWindows, DetectionResult, Rejection};
use crate::screener::Screener;
use crate::strategy::evaluate;
use crate::utils::config::ScannerConfig;

/// Флаг остановки: текущий символ дорабатывается, новые не начинаются
#[derive(Clone)]
pub struct ShutdownSignal {
    tx: Arc<watch::Sender<bool>>,
}

impl Default for ShutdownSignal {
    fn default() -> Self {
        Self::new()
    }
}

impl ShutdownSignal {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    pub fn trigger(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_triggered(&self) -> bool {
        *self.tx.borrow()
    }

    pub async fn wait(&self) {
        let mut rx = self.tx.subscribe();
        let _ = rx.wait_for(|stopped| *stopped).await;
    }
}

/// Почему символ пропущен (это не ошибка)
#[derive(Debug, Clone, PartialEq)]
pub enum SkipReason {
    NotEnoughCandles { got: usize, need: usize },
    AlreadyAlerted { open_time: i64 },
    NoPattern(Rejection),
    InsufficientTrendHistory,
    TrendMismatch { direction: Direction, trend: Option<TrendLabel> },
}

#[derive(Debug)]
pub enum SymbolOutcome {
    Alerted { signal: Signal, delivered: bool },
    Skipped(SkipReason),
    Failed(FetchError),
    Panicked(String),
}

#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    #[error("Universe fetch failed: {0}")]
    Universe(#[from] FetchError),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CycleReport {
    pub universe: usize,
    pub scanned: usize,
    pub alerted: usize,
    pub undelivered: usize,
    pub skipped: usize,
    pub failed: usize,
    pub elapsed: Duration,
}

impl CycleReport {
    fn record(&mut self, outcome: &SymbolOutcome) {
        self.scanned += 1;
        match outcome {
            SymbolOutcome::Alerted { delivered, .. } => {
                self.alerted += 1;
                if !delivered {
                    self.undelivered += 1;
                }
            }
            SymbolOutcome::Skipped(_) => self.skipped += 1,
            SymbolOutcome::Failed(_) | SymbolOutcome::Panicked(_) => self.failed += 1,
        }
    }

    /// Цикл прерван остановкой до обхода всей вселенной
    pub fn interrupted(&self) -> bool {
        self.scanned < self.universe
    }
}

impl fmt::Display for CycleReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Цикл завершен за {:.1} сек: {}/{} символов, алертов {} (не доставлено {}), пропусков {}, ошибок {}",
            self.elapsed.as_secs_f64(),
            self.scanned,
            self.universe,
            self.alerted,
            self.undelivered,
            self.skipped,
            self.failed
        )?;
        if self.interrupted() {
            f.write_str(", прерван")?;
        }
        Ok(())
    }
}

pub struct Scanner {
    config: ScannerConfig,
    source: Arc<dyn MarketDataSource>,
    notifier: Arc<dyn Notifier>,
    ledger: Arc<AlertLedger>,
    screener: Screener,
    shutdown: ShutdownSignal,
}

impl Scanner {
    pub fn new(config: ScannerConfig, source: Arc<dyn MarketDataSource>, notifier: Arc<dyn Notifier>) -> Self {
        let screener = Screener::from_config(&config.universe);
        Self {
            config,
            source,
            notifier,
            ledger: Arc::new(AlertLedger::new()),
            screener,
            shutdown: ShutdownSignal::new(),
        }
    }

    pub fn with_ledger(mut self, ledger: Arc<AlertLedger>) -> Self {
        self.ledger = ledger;
        self
    }

    pub fn with_shutdown(mut self, shutdown: ShutdownSignal) -> Self {
        self.shutdown = shutdown;
        self
    }

    pub fn ledger(&self) -> &Arc<AlertLedger> {
        &self.ledger
    }

    pub fn shutdown_signal(&self) -> ShutdownSignal {
        self.shutdown.clone()
    }

    pub async fn fetch_universe(&self) -> Result<Vec<String>, ScanError> {
        let instruments = self.source.instruments(self.config.universe.perpetual_only).await?;
        Ok(self
            .screener
            .select(instruments)
            .into_iter()
            .map(|i| i.symbol)
            .collect())
    }

    /// Синхронная часть конвейера: свечи -> сигнал.
    /// `candles` - как пришли с биржи, последняя свеча считается незакрытой.
    pub fn analyze(&self, symbol: &str, candles: &[Candle]) -> Result<(Signal, Candle), SkipReason> {
        let cfg = &self.config;
        let not_enough = SkipReason::NotEnoughCandles { got: candles.len(), need: cfg.min_candles };

        if candles.len() < cfg.min_candles {
            return Err(not_enough);
        }

        // Последняя свеча формируется, кандидат - последняя закрытая
        let Some((_, closed)) = candles.split_last() else {
            return Err(not_enough);
        };
        let Some((&candidate, _)) = closed.split_last() else {
            return Err(not_enough);
        };

        if !self.ledger.should_alert(symbol, candidate.open_time) {
            return Err(SkipReason::AlreadyAlerted { open_time: candidate.open_time });
        }

        let windows = BaselineWindows::preceding(closed, cfg.body_lookback, cfg.volume_lookback);
        let direction = match detect(&candidate, &windows.bodies, &windows.volumes, &cfg.thresholds) {
            DetectionResult::Match(direction) => direction,
            DetectionResult::NoMatch(rejection) => return Err(SkipReason::NoPattern(rejection)),
        };
        log::info!("📉 {}: найден {} марубозу, свеча {}", symbol, direction, candidate.open_time);

        let closes: Vec<f64> = closed[closed.len().saturating_sub(cfg.trend_lookback)..]
            .iter()
            .map(|c| c.close)
            .collect();

        let trend_label = match trend(&closes, cfg.ema_short, cfg.ema_long) {
            Ok(state) => {
                log::info!(
                    "📈 {}: тренд {} (EMA{} {:.6} / EMA{} {:.6})",
                    symbol, state.label, cfg.ema_short, state.short_ema, cfg.ema_long, state.long_ema
                );
                Some(state.label)
            }
            Err(e) if cfg.signal.use_trend_filter => {
                log::debug!("{}: тренд не посчитан: {}", symbol, e);
                return Err(SkipReason::InsufficientTrendHistory);
            }
            Err(_) => None,
        };

        match evaluate(symbol, &candidate, direction, trend_label, &cfg.signal) {
            Some(signal) => Ok((signal, candidate)),
            None => Err(SkipReason::TrendMismatch { direction, trend: trend_label }),
        }
    }

    /// Полный конвейер одного символа
    pub async fn scan_symbol(&self, symbol: &str) -> SymbolOutcome {
        let cfg = &self.config;

        log::debug!("⏳ Загрузка свечей {}", symbol);
        let candles = match self.source.candles(symbol, &cfg.interval, cfg.candle_limit).await {
            Ok(candles) => candles,
            Err(e) => return SymbolOutcome::Failed(e),
        };

        let (signal, candle) = match self.analyze(symbol, &candles) {
            Ok(found) => found,
            Err(reason) => return SymbolOutcome::Skipped(reason),
        };

        // Проверка и запись атомарно: параллельная обработка того же символа не даст дубль
        if !self.ledger.claim(symbol, signal.candle_open_time) {
            return SymbolOutcome::Skipped(SkipReason::AlreadyAlerted { open_time: signal.candle_open_time });
        }

        let message = format_alert(&signal, &candle, &cfg.interval, &cfg.alert_footer);
        let delivered = match self.notifier.send(&message).await {
            Ok(()) => true,
            Err(e) => {
                log::warn!("⚠️ {}: алерт не доставлен ({}): {}", symbol, self.notifier.name(), e);
                false
            }
        };

        SymbolOutcome::Alerted { signal, delivered }
    }

    /// Один проход по вселенной
    pub async fn run_cycle(&self) -> Result<CycleReport, ScanError> {
        let started = Instant::now();

        log::info!("🔍 Загрузка списка инструментов...");
        let symbols = self.fetch_universe().await?;
        log::info!("📌 Найдено {} символов", symbols.len());

        let mut report = CycleReport {
            universe: symbols.len(),
            ..CycleReport::default()
        };

        let shutdown = &self.shutdown;
        let outcomes: Vec<SymbolOutcome> = stream::iter(symbols)
            .take_while(move |_| future::ready(!shutdown.is_triggered()))
            .map(move |symbol| async move {
                let outcome = AssertUnwindSafe(self.scan_symbol(&symbol))
                    .catch_unwind()
                    .await
                    .unwrap_or_else(|panic| SymbolOutcome::Panicked(panic_message(&*panic)));
                log_outcome(&symbol, &outcome);
                outcome
            })
            .buffer_unordered(self.config.max_concurrent_requests.max(1))
            .collect()
            .await;

        for outcome in &outcomes {
            report.record(outcome);
        }
        report.elapsed = started.elapsed();

        Ok(report)
    }

    /// Бесконечный цикл до остановки
    pub async fn run(&self) {
        let cfg = &self.config;
        log::info!(
            "🚀 Marubozu сканер запущен: TF {}, EMA {}/{}, фильтр тренда {}, RR {}",
            cfg.interval,
            cfg.ema_short,
            cfg.ema_long,
            if cfg.signal.use_trend_filter { "вкл" } else { "выкл" },
            cfg.signal.risk_reward_ratio
        );

        while !self.shutdown.is_triggered() {
            let pause = match AssertUnwindSafe(self.run_cycle()).catch_unwind().await {
                Ok(Ok(report)) => {
                    log_report(&report);
                    cfg.cycle_interval()
                }
                Ok(Err(e)) => {
                    log::error!("🔥 Ошибка цикла: {}", e);
                    cfg.error_backoff()
                }
                Err(panic) => {
                    log::error!("🔥 Паника в цикле: {}", panic_message(&*panic));
                    cfg.error_backoff()
                }
            };

            if self.shutdown.is_triggered() {
                break;
            }

            log::info!("😴 Пауза {} сек...", pause.as_secs());
            tokio::select! {
                _ = tokio::time::sleep(pause) => {}
                _ = self.shutdown.wait() => {}
            }
        }

        log::info!("🛑 Сканер остановлен, в леджере {} символов", self.ledger.len());
    }
}

fn log_outcome(symbol: &str, outcome: &SymbolOutcome) {
    match outcome {
        SymbolOutcome::Alerted { signal, delivered: true } => {
            log::info!("📤 Алерт отправлен → {} ({})", symbol, signal.direction);
        }
        SymbolOutcome::Alerted { signal, delivered: false } => {
            log::info!("📤 Алерт засчитан без доставки → {} ({})", symbol, signal.direction);
        }
        SymbolOutcome::Skipped(SkipReason::AlreadyAlerted { open_time }) => {
            log::debug!("⏭️ {}: алерт по свече {} уже был", symbol, open_time);
        }
        SymbolOutcome::Skipped(SkipReason::NotEnoughCandles { got, need }) => {
            log::debug!("⚠️ {}: мало свечей ({} < {})", symbol, got, need);
        }
        SymbolOutcome::Skipped(reason) => {
            log::debug!("{}: пропуск - {:?}", symbol, reason);
        }
        SymbolOutcome::Failed(e) => {
            log::warn!("❌ Ошибка обработки {}: {}", symbol, e);
        }
        SymbolOutcome::Panicked(msg) => {
            log::error!("❌ Паника при обработке {}: {}", symbol, msg);
        }
    }
}

fn log_report(report: &CycleReport) {
    log::info!("✅ {}", report);
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
