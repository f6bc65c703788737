//! Фильтр тренда: короткая EMA выше длинной - тренд вверх, иначе вниз

use crate::indicators::{Ema, IndicatorError, TechnicalIndicator};
use crate::models::TrendLabel;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrendState {
    pub short_ema: f64,
    pub long_ema: f64,
    pub label: TrendLabel,
}

/// Требует closes.len() >= max(short, long).
/// При нехватке истории возвращает ошибку - метку в этом случае не строим.
pub fn trend(closes: &[f64], short_period: usize, long_period: usize) -> Result<TrendState, IndicatorError> {
    let short_ema = Ema::new(short_period).calculate(closes)?;
    let long_ema = Ema::new(long_period).calculate(closes)?;

    // Равенство = вниз
    let label = if short_ema > long_ema { TrendLabel::Up } else { TrendLabel::Down };

    Ok(TrendState { short_ema, long_ema, label })
}
