//! Марубозу - свеча, тело которой занимает почти весь диапазон high-low
//!
//! Условия совпадения (все одновременно):
//! 1. body / range >= body_ratio
//! 2. upper_wick / range <= wick_ratio и lower_wick / range <= wick_ratio
//! 3. body >= body_multiplier * среднее тело предыдущих свечей
//! 4. volume >= volume_multiplier * средний объем предыдущих свечей
//!
//! Пустая история = нет совпадения: без базы сравнения детектор не срабатывает.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::mean;
use crate::models::{Candle, Direction};

/// Пороги детектора
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarubozuThresholds {
    pub body_ratio: f64,
    pub wick_ratio: f64,
    pub body_multiplier: f64,
    pub volume_multiplier: f64,
}

impl Default for MarubozuThresholds {
    fn default() -> Self {
        Self {
            body_ratio: 0.80,
            wick_ratio: 0.05,
            body_multiplier: 1.5,
            volume_multiplier: 1.5,
        }
    }
}

/// Причина, по которой свеча не прошла детектор
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// high == low
    DegenerateRange,
    /// Нет предыдущих тел или объемов для базы
    InsufficientHistory,
    BodyRatio,
    UpperWick,
    LowerWick,
    SmallBody,
    LowVolume,
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Rejection::DegenerateRange => "нулевой диапазон",
            Rejection::InsufficientHistory => "мало истории",
            Rejection::BodyRatio => "тело мало относительно диапазона",
            Rejection::UpperWick => "длинная верхняя тень",
            Rejection::LowerWick => "длинная нижняя тень",
            Rejection::SmallBody => "тело меньше среднего",
            Rejection::LowVolume => "объем ниже среднего",
        };
        f.write_str(text)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectionResult {
    Match(Direction),
    NoMatch(Rejection),
}

impl DetectionResult {
    pub fn is_match(&self) -> bool {
        matches!(self, DetectionResult::Match(_))
    }

    /// Направление определено только при совпадении
    pub fn direction(&self) -> Option<Direction> {
        match self {
            DetectionResult::Match(direction) => Some(*direction),
            DetectionResult::NoMatch(_) => None,
        }
    }
}

/// Классифицирует одну закрытую свечу.
/// `recent_bodies` и `recent_volumes` - окна свечей строго до кандидата.
pub fn detect(
    candle: &Candle,
    recent_bodies: &[f64],
    recent_volumes: &[f64],
    thresholds: &MarubozuThresholds,
) -> DetectionResult {
    let range = candle.range();
    if range <= 0.0 {
        return DetectionResult::NoMatch(Rejection::DegenerateRange);
    }

    let (avg_body, avg_volume) = match (mean(recent_bodies), mean(recent_volumes)) {
        (Some(body), Some(volume)) => (body, volume),
        _ => return DetectionResult::NoMatch(Rejection::InsufficientHistory),
    };

    let body = candle.body();

    if body / range < thresholds.body_ratio {
        return DetectionResult::NoMatch(Rejection::BodyRatio);
    }
    if candle.upper_wick() / range > thresholds.wick_ratio {
        return DetectionResult::NoMatch(Rejection::UpperWick);
    }
    if candle.lower_wick() / range > thresholds.wick_ratio {
        return DetectionResult::NoMatch(Rejection::LowerWick);
    }
    if body < thresholds.body_multiplier * avg_body {
        return DetectionResult::NoMatch(Rejection::SmallBody);
    }
    if candle.volume < thresholds.volume_multiplier * avg_volume {
        return DetectionResult::NoMatch(Rejection::LowVolume);
    }

    // close == open отсекается порогом body_ratio, но если дошли - медвежья
    let direction = if candle.close > candle.open {
        Direction::Bullish
    } else {
        Direction::Bearish
    };

    DetectionResult::Match(direction)
}

/// Окна тел и объемов, предшествующие кандидату
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BaselineWindows {
    pub bodies: Vec<f64>,
    pub volumes: Vec<f64>,
}

impl BaselineWindows {
    /// `closed` - только закрытые свечи, кандидат последний.
    /// Кандидат в окна не попадает.
    pub fn preceding(closed: &[Candle], body_lookback: usize, volume_lookback: usize) -> Self {
        let history = match closed.split_last() {
            Some((_, history)) => history,
            None => return Self::default(),
        };

        let bodies = history[history.len().saturating_sub(body_lookback)..]
            .iter()
            .map(Candle::body)
            .collect();
        let volumes = history[history.len().saturating_sub(volume_lookback)..]
            .iter()
            .map(|c| c.volume)
            .collect();

        Self { bodies, volumes }
    }
}
