//! Конфигурация сканера: YAML-файл (необязательный) + переменные окружения
//!
//! Все секции имеют значения по умолчанию, поэтому файл может содержать
//! только то, что отличается от дефолта:
//! ```yaml
//! interval: 1h
//! ema_short: 21
//! signal:
//!   use_trend_filter: false
//! universe:
//!   top_n: 100
//! ```

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::patterns::MarubozuThresholds;
use crate::strategy::SignalParams;

pub const ENV_TELEGRAM_TOKEN: &str = "TELEGRAM_BOT_TOKEN";
pub const ENV_TELEGRAM_CHAT_ID: &str = "TELEGRAM_CHAT_ID";
pub const ENV_INTERVAL: &str = "MARUBOZU_INTERVAL";
pub const ENV_BINANCE_URL: &str = "BINANCE_FUTURES_URL";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("Invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UniverseConfig {
    pub quote_asset: String,
    /// None - все подходящие инструменты
    pub top_n: Option<usize>,
    pub perpetual_only: bool,
    pub min_quote_volume: f64,
    pub exclude: Vec<String>,
}

impl Default for UniverseConfig {
    fn default() -> Self {
        Self {
            quote_asset: "USDT".to_string(),
            top_n: Some(50),
            perpetual_only: true,
            min_quote_volume: 0.0,
            exclude: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BinanceConfig {
    pub base_url: String,
}

impl Default for BinanceConfig {
    fn default() -> Self {
        Self {
            base_url: "https://fapi.binance.com".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TelegramConfig {
    pub api_base: String,
    pub bot_token: Option<String>,
    pub chat_id: Option<String>,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            api_base: "https://api.telegram.org".to_string(),
            bot_token: None,
            chat_id: None,
        }
    }
}

impl TelegramConfig {
    /// Токен и chat id заданы и не пустые
    pub fn credentials(&self) -> Option<(&str, &str)> {
        let token = self.bot_token.as_deref().map(str::trim).filter(|s| !s.is_empty())?;
        let chat_id = self.chat_id.as_deref().map(str::trim).filter(|s| !s.is_empty())?;
        Some((token, chat_id))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScannerConfig {
    /// Таймфрейм Binance: 1m, 15m, 1h, 4h, 1d ...
    pub interval: String,
    pub candle_limit: u32,
    /// Меньше свечей - символ пропускается
    pub min_candles: usize,
    pub body_lookback: usize,
    pub volume_lookback: usize,
    /// Сколько последних закрытых свечей идет в EMA
    pub trend_lookback: usize,
    pub ema_short: usize,
    pub ema_long: usize,
    pub thresholds: MarubozuThresholds,
    pub signal: SignalParams,
    pub cycle_interval_secs: u64,
    pub error_backoff_secs: u64,
    pub request_timeout_secs: u64,
    /// 1 = символы сканируются строго по очереди
    pub max_concurrent_requests: usize,
    pub universe: UniverseConfig,
    pub binance: BinanceConfig,
    pub telegram: TelegramConfig,
    pub alert_footer: String,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            interval: "4h".to_string(),
            candle_limit: 300,
            min_candles: 30,
            body_lookback: 10,
            volume_lookback: 20,
            trend_lookback: 300,
            ema_short: 50,
            ema_long: 200,
            thresholds: MarubozuThresholds::default(),
            signal: SignalParams::default(),
            cycle_interval_secs: 60,
            error_backoff_secs: 5,
            request_timeout_secs: 10,
            max_concurrent_requests: 1,
            universe: UniverseConfig::default(),
            binance: BinanceConfig::default(),
            telegram: TelegramConfig::default(),
            alert_footer: "Marubozu Scanner".to_string(),
        }
    }
}

impl ScannerConfig {
    pub fn from_yaml(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(text)?)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Нет файла - дефолтная конфигурация
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Пустые значения игнорируются
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        if let Some(token) = get(ENV_TELEGRAM_TOKEN) {
            self.telegram.bot_token = Some(token);
        }
        if let Some(chat_id) = get(ENV_TELEGRAM_CHAT_ID) {
            self.telegram.chat_id = Some(chat_id);
        }
        if let Some(interval) = get(ENV_INTERVAL) {
            self.interval = interval;
        }
        if let Some(url) = get(ENV_BINANCE_URL) {
            self.binance.base_url = url;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: String| Err(ConfigError::Invalid(msg));

        if self.interval.trim().is_empty() {
            return invalid("interval must not be empty".to_string());
        }
        if self.ema_short == 0 || self.ema_long == 0 {
            return invalid(format!("EMA periods must be > 0 (short={}, long={})", self.ema_short, self.ema_long));
        }
        if self.body_lookback == 0 || self.volume_lookback == 0 || self.trend_lookback == 0 {
            return invalid("lookback windows must be > 0".to_string());
        }
        if self.min_candles < 3 {
            return invalid(format!("min_candles must be >= 3, got {}", self.min_candles));
        }
        if (self.candle_limit as usize) < self.min_candles {
            return invalid(format!(
                "candle_limit {} is below min_candles {}",
                self.candle_limit, self.min_candles
            ));
        }

        let t = &self.thresholds;
        for (name, value) in [("body_ratio", t.body_ratio), ("wick_ratio", t.wick_ratio)] {
            if !(0.0..=1.0).contains(&value) {
                return invalid(format!("{} = {} out of range [0, 1]", name, value));
            }
        }
        for (name, value) in [("body_multiplier", t.body_multiplier), ("volume_multiplier", t.volume_multiplier)] {
            if !(value.is_finite() && value > 0.0) {
                return invalid(format!("{} must be > 0, got {}", name, value));
            }
        }

        let s = &self.signal;
        if !(s.risk_reward_ratio.is_finite() && s.risk_reward_ratio > 0.0) {
            return invalid(format!("risk_reward_ratio must be > 0, got {}", s.risk_reward_ratio));
        }
        if !(s.stop_buffer_pct.is_finite() && s.stop_buffer_pct >= 0.0) {
            return invalid(format!("stop_buffer_pct must be >= 0, got {}", s.stop_buffer_pct));
        }

        // С фильтром тренда EMA должна помещаться в доступную историю, иначе алертов не будет вовсе
        if s.use_trend_filter {
            let need = self.ema_short.max(self.ema_long);
            if self.trend_lookback < need {
                return invalid(format!(
                    "trend_lookback {} is below the longest EMA period {}",
                    self.trend_lookback, need
                ));
            }
            let closed = (self.candle_limit as usize).saturating_sub(1);
            if closed < need {
                return invalid(format!(
                    "candle_limit {} gives {} closed candles, the longest EMA period needs {}",
                    self.candle_limit, closed, need
                ));
            }
        }

        if self.max_concurrent_requests == 0 {
            return invalid("max_concurrent_requests must be >= 1".to_string());
        }
        if self.request_timeout_secs == 0 {
            return invalid("request_timeout_secs must be >= 1".to_string());
        }
        if self.universe.quote_asset.trim().is_empty() {
            return invalid("universe.quote_asset must not be empty".to_string());
        }

        Ok(())
    }

    pub fn cycle_interval(&self) -> Duration {
        Duration::from_secs(self.cycle_interval_secs)
    }

    pub fn error_backoff(&self) -> Duration {
        Duration::from_secs(self.error_backoff_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
