pub mod ema;
pub mod trend;

pub use ema::Ema;
pub use trend::{trend, TrendState};

/// Индикатор по ряду цен закрытия, возвращает последнее значение
pub trait TechnicalIndicator {
    fn calculate(&self, prices: &[f64]) -> Result<f64, IndicatorError>;
    fn name(&self) -> &str;
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum IndicatorError {
    #[error("Not enough data: need {need} values, got {got}")]
    NotEnoughData { need: usize, got: usize },
    #[error("Invalid period: {0}")]
    InvalidPeriod(usize),
}
