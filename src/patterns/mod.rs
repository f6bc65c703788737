//! Детекторы свечных паттернов
//! Сейчас один - марубозу (тело почти на весь диапазон, минимальные тени)

pub mod marubozu;

pub use marubozu::{detect, BaselineWindows, DetectionResult, MarubozuThresholds, Rejection};

/// Среднее значение, None для пустого окна
pub(crate) fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}
