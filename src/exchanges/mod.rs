//! Источники рыночных данных

pub mod binance;
pub mod endpoints;

use async_trait::async_trait;

use crate::models::{Candle, Instrument};

pub use binance::BinanceFuturesClient;

/// Любая ошибка получения данных - сеть, таймаут, не-2xx, битый JSON.
/// Сканер обрабатывает ее локально: пропуск символа или цикла.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Unexpected status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("API error {code}: {msg}")]
    Api { code: i64, msg: String },
    #[error("Malformed payload: {0}")]
    Malformed(String),
}

#[async_trait]
pub trait MarketDataSource: Send + Sync {
    /// Все инструменты с 24h объемом в котируемой валюте.
    /// При `perpetual_only` поле `tradable` отражает статус бессрочного контракта.
    async fn instruments(&self, perpetual_only: bool) -> Result<Vec<Instrument>, FetchError>;

    /// Свечи по возрастанию open_time; последняя может быть еще не закрыта
    async fn candles(&self, symbol: &str, interval: &str, limit: u32) -> Result<Vec<Candle>, FetchError>;
}
