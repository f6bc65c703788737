//! Базовые модели сканера: свечи, направление, тренд, инструмент, сигнал

use serde::{Deserialize, Serialize};
use std::fmt;

/// Закрытая (или формирующаяся) свеча OHLCV.
/// `open_time` - время открытия в миллисекундах, уникально для символа и таймфрейма.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub open_time: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Candle {
    /// Тело свечи |close - open|
    pub fn body(&self) -> f64 {
        (self.close - self.open).abs()
    }

    /// Полный диапазон high - low
    pub fn range(&self) -> f64 {
        self.high - self.low
    }

    pub fn upper_wick(&self) -> f64 {
        self.high - self.open.max(self.close)
    }

    pub fn lower_wick(&self) -> f64 {
        self.open.min(self.close) - self.low
    }

    /// Проверка инварианта high >= max(open, close), low <= min(open, close)
    pub fn is_consistent(&self) -> bool {
        let values = [self.open, self.high, self.low, self.close, self.volume];
        values.iter().all(|v| v.is_finite())
            && self.high >= self.open.max(self.close)
            && self.low <= self.open.min(self.close)
            && self.volume >= 0.0
    }
}

/// Направление марубозу
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Bullish,
    Bearish,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Bullish => "bull",
            Direction::Bearish => "bear",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Метка тренда по EMA
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TrendLabel {
    Up,
    Down,
}

impl TrendLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrendLabel::Up => "up",
            TrendLabel::Down => "down",
        }
    }

    /// Совпадает ли тренд с направлением свечи
    pub fn agrees_with(&self, direction: Direction) -> bool {
        matches!(
            (self, direction),
            (TrendLabel::Up, Direction::Bullish) | (TrendLabel::Down, Direction::Bearish)
        )
    }
}

impl fmt::Display for TrendLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Инструмент из вселенной сканирования
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instrument {
    pub symbol: String,
    pub quote_volume: f64,
    /// Бессрочный контракт в статусе TRADING (true, если exchangeInfo не запрашивался)
    pub tradable: bool,
}

/// Торговая идея по одной закрытой свече
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub symbol: String,
    pub direction: Direction,
    pub entry: f64,
    pub stop_loss: f64,
    pub take_profit: f64,
    /// None, если тренд не считался (фильтр выключен и истории мало)
    pub trend: Option<TrendLabel>,
    pub candle_open_time: i64,
}
