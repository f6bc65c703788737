// Exponential Moving Average
//
// Первое значение EMA = первая цена ряда (без SMA-затравки):
// ema[i] = price * k + ema[i-1] * (1 - k), k = 2 / (period + 1)
use crate::indicators::{IndicatorError, TechnicalIndicator};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ema {
    period: usize,
}

impl Ema {
    pub fn new(period: usize) -> Self {
        Ema { period }
    }

    fn multiplier(&self) -> f64 {
        2.0 / (self.period as f64 + 1.0)
    }

    /// Полный ряд EMA той же длины, что и вход
    pub fn series(&self, prices: &[f64]) -> Vec<f64> {
        let k = self.multiplier();
        let mut out = Vec::with_capacity(prices.len());

        let mut iter = prices.iter();
        let Some(&first) = iter.next() else {
            return out;
        };

        let mut ema = first;
        out.push(ema);
        for &price in iter {
            ema = price * k + ema * (1.0 - k);
            out.push(ema);
        }
        out
    }
}

impl TechnicalIndicator for Ema {
    fn calculate(&self, prices: &[f64]) -> Result<f64, IndicatorError> {
        if self.period == 0 {
            return Err(IndicatorError::InvalidPeriod(self.period));
        }
        if prices.len() < self.period {
            return Err(IndicatorError::NotEnoughData {
                need: self.period,
                got: prices.len(),
            });
        }
        self.series(prices)
            .last()
            .copied()
            .ok_or(IndicatorError::NotEnoughData { need: self.period, got: 0 })
    }

    fn name(&self) -> &str {
        "EMA"
    }
}
