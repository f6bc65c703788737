//! Оценка сигнала: фильтр по тренду + уровни входа, стопа и тейка
//!
//! Long:  entry = close, SL = low - buffer * close,  TP = entry + RR * (entry - SL)
//! Short: entry = close, SL = high + buffer * close, TP = entry - RR * (SL - entry)

use serde::{Deserialize, Serialize};

use crate::models::{Candle, Direction, Signal, TrendLabel};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SignalParams {
    pub use_trend_filter: bool,
    pub risk_reward_ratio: f64,
    /// Отступ стопа за экстремум свечи в долях от close (0.002 = 0.2%)
    pub stop_buffer_pct: f64,
}

impl Default for SignalParams {
    fn default() -> Self {
        Self {
            use_trend_filter: true,
            risk_reward_ratio: 2.0,
            stop_buffer_pct: 0.002,
        }
    }
}

/// Возвращает None, если фильтр тренда включен и тренд не совпадает с направлением
/// (или тренд неизвестен). Это не ошибка, сигнал просто подавляется.
pub fn evaluate(
    symbol: &str,
    candle: &Candle,
    direction: Direction,
    trend: Option<TrendLabel>,
    params: &SignalParams,
) -> Option<Signal> {
    if params.use_trend_filter {
        match trend {
            Some(label) if label.agrees_with(direction) => {}
            _ => return None,
        }
    }

    let entry = candle.close;
    let buffer = params.stop_buffer_pct * candle.close;

    let (stop_loss, take_profit) = match direction {
        Direction::Bullish => {
            let sl = candle.low - buffer;
            (sl, entry + params.risk_reward_ratio * (entry - sl))
        }
        Direction::Bearish => {
            let sl = candle.high + buffer;
            (sl, entry - params.risk_reward_ratio * (sl - entry))
        }
    };

    Some(Signal {
        symbol: symbol.to_string(),
        direction,
        entry,
        stop_loss,
        take_profit,
        trend,
        candle_open_time: candle.open_time,
    })
}
