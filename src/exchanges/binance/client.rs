//! HTTP клиент Binance USDT-M futures (только публичные данные)

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use std::collections::HashSet;
use std::time::Duration;

use super::parser::{parse_exchange_info, parse_klines, parse_tickers};
use crate::exchanges::endpoints::BinanceFuturesGet;
use crate::exchanges::{FetchError, MarketDataSource};
use crate::models::{Candle, Instrument};

pub struct BinanceFuturesClient {
    client: Client,
    base_url: String,
}

impl BinanceFuturesClient {
    /// `timeout` ограничивает каждый запрос целиком
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, FetchError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn get_text(&self, path: &str, query: &[(&str, String)]) -> Result<String, FetchError> {
        let url = format!("{}{}", self.base_url, path);
        log::debug!("   Запрос: {} {:?}", url, query);

        let resp = self.client.get(&url).query(query).send().await?;
        let status = resp.status();
        let body = resp.text().await?;

        check_status(status, body)
    }

    pub async fn fetch_tickers(&self) -> Result<Vec<Instrument>, FetchError> {
        let body = self.get_text(BinanceFuturesGet::TICKER_24H, &[]).await?;
        parse_tickers(&body)
    }

    /// Символы бессрочных контрактов в статусе TRADING
    pub async fn fetch_perpetual_symbols(&self) -> Result<HashSet<String>, FetchError> {
        let body = self.get_text(BinanceFuturesGet::EXCHANGE_INFO, &[]).await?;
        Ok(parse_exchange_info(&body)?
            .into_iter()
            .filter(|c| c.is_tradable_perpetual())
            .map(|c| c.symbol)
            .collect())
    }
}

/// Не-2xx -> FetchError::Status, тело обрезается до 200 символов
fn check_status(status: StatusCode, body: String) -> Result<String, FetchError> {
    if !status.is_success() {
        return Err(FetchError::Status {
            status: status.as_u16(),
            body: body.chars().take(200).collect(),
        });
    }
    Ok(body)
}

#[async_trait]
impl MarketDataSource for BinanceFuturesClient {
    async fn instruments(&self, perpetual_only: bool) -> Result<Vec<Instrument>, FetchError> {
        let mut instruments = self.fetch_tickers().await?;

        if perpetual_only {
            let perpetuals = self.fetch_perpetual_symbols().await?;
            for instrument in instruments.iter_mut() {
                instrument.tradable = perpetuals.contains(&instrument.symbol);
            }
        }

        Ok(instruments)
    }

    async fn candles(&self, symbol: &str, interval: &str, limit: u32) -> Result<Vec<Candle>, FetchError> {
        let limit = limit.clamp(1, BinanceFuturesGet::MAX_KLINES);
        let query = [
            ("symbol", symbol.to_string()),
            ("interval", interval.to_string()),
            ("limit", limit.to_string()),
        ];

        let body = self.get_text(BinanceFuturesGet::KLINES, &query).await?;
        parse_klines(&body)
    }
}
