//! Строгий разбор ответов Binance futures
//!
//! Любое отклонение от схемы - FetchError::Malformed, ответ вида {"code":..,"msg":..} - FetchError::Api.
//! Частично валидный ответ целиком отбрасывается.

use serde::Deserialize;
use serde_json::Value;

use crate::exchanges::FetchError;
use crate::models::{Candle, Instrument};

fn parse_json(body: &str) -> Result<Value, FetchError> {
    let value: Value = serde_json::from_str(body).map_err(|e| FetchError::Malformed(format!("invalid JSON: {}", e)))?;

    // Binance отдает ошибки объектом с code/msg, иногда со статусом 200
    if let Some(obj) = value.as_object() {
        if let (Some(code), Some(msg)) = (obj.get("code").and_then(Value::as_i64), obj.get("msg").and_then(Value::as_str)) {
            return Err(FetchError::Api { code, msg: msg.to_string() });
        }
    }

    Ok(value)
}

/// Число из строки "123.45" или из JSON-числа
fn decimal_field(row: &[Value], idx: usize, name: &str) -> Result<f64, FetchError> {
    let value = row
        .get(idx)
        .ok_or_else(|| FetchError::Malformed(format!("kline field {} missing", name)))?;

    let parsed = match value {
        Value::String(s) => s.parse::<f64>().ok(),
        Value::Number(n) => n.as_f64(),
        _ => None,
    };

    parsed
        .filter(|v| v.is_finite())
        .ok_or_else(|| FetchError::Malformed(format!("kline field {} is not a number: {}", name, value)))
}

/// Массив klines: [openTime, "open", "high", "low", "close", "volume", closeTime, ...]
pub fn parse_klines(body: &str) -> Result<Vec<Candle>, FetchError> {
    let value = parse_json(body)?;
    let rows = value
        .as_array()
        .ok_or_else(|| FetchError::Malformed("klines response is not an array".to_string()))?;

    let mut candles: Vec<Candle> = Vec::with_capacity(rows.len());

    for (i, row) in rows.iter().enumerate() {
        let row = row
            .as_array()
            .ok_or_else(|| FetchError::Malformed(format!("kline #{} is not an array", i)))?;

        if row.len() < 6 {
            return Err(FetchError::Malformed(format!("kline #{} has {} fields, need 6", i, row.len())));
        }

        let open_time = row[0]
            .as_i64()
            .ok_or_else(|| FetchError::Malformed(format!("kline #{} open time is not an integer", i)))?;

        let candle = Candle {
            open_time,
            open: decimal_field(row, 1, "open")?,
            high: decimal_field(row, 2, "high")?,
            low: decimal_field(row, 3, "low")?,
            close: decimal_field(row, 4, "close")?,
            volume: decimal_field(row, 5, "volume")?,
        };

        if !candle.is_consistent() {
            return Err(FetchError::Malformed(format!("kline #{} violates OHLC invariants", i)));
        }

        if let Some(prev) = candles.last() {
            if candle.open_time <= prev.open_time {
                return Err(FetchError::Malformed(format!(
                    "kline #{} open time {} is not after {}",
                    i, candle.open_time, prev.open_time
                )));
            }
        }

        candles.push(candle);
    }

    Ok(candles)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawTicker {
    symbol: String,
    quote_volume: String,
}

/// /fapi/v1/ticker/24hr без параметра symbol - массив по всем контрактам
pub fn parse_tickers(body: &str) -> Result<Vec<Instrument>, FetchError> {
    let value = parse_json(body)?;
    let raw: Vec<RawTicker> =
        serde_json::from_value(value).map_err(|e| FetchError::Malformed(format!("ticker schema: {}", e)))?;

    // Битая строка выкидывается, остальная вселенная остается
    Ok(raw
        .into_iter()
        .filter_map(|t| match t.quote_volume.parse::<f64>() {
            Ok(quote_volume) if quote_volume.is_finite() => Some(Instrument {
                symbol: t.symbol,
                quote_volume,
                tradable: true,
            }),
            _ => {
                log::warn!("⚠️ {}: некорректный quoteVolume {:?}, символ пропущен", t.symbol, t.quote_volume);
                None
            }
        })
        .collect())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractInfo {
    pub symbol: String,
    pub contract_type: String,
    pub status: String,
}

impl ContractInfo {
    pub fn is_tradable_perpetual(&self) -> bool {
        self.contract_type == "PERPETUAL" && self.status == "TRADING"
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSymbolInfo {
    symbol: String,
    status: String,
    #[serde(default)]
    contract_type: String,
}

#[derive(Debug, Deserialize)]
struct RawExchangeInfo {
    symbols: Vec<RawSymbolInfo>,
}

pub fn parse_exchange_info(body: &str) -> Result<Vec<ContractInfo>, FetchError> {
    let value = parse_json(body)?;
    let info: RawExchangeInfo =
        serde_json::from_value(value).map_err(|e| FetchError::Malformed(format!("exchangeInfo schema: {}", e)))?;

    Ok(info
        .symbols
        .into_iter()
        .map(|s| ContractInfo {
            symbol: s.symbol,
            contract_type: s.contract_type,
            status: s.status,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    const KLINES: &str = r#"[
        [1700000000000,"100.0","110.2","99.8","110.0","5000.5",1700014399999,"500000.0",1200,"2500.0","250000.0","0"],
        [1700014400000,"110.0","111.0","109.0","110.5","1200.0",1700028799999,"130000.0",800,"600.0","65000.0","0"]
    ]"#;

    #[test]
    fn test_parse_klines() {
        let candles = parse_klines(KLINES).unwrap();

        assert_eq!(candles.len(), 2);
        assert_eq!(candles[0].open_time, 1_700_000_000_000);
        assert_eq!(candles[0].high, 110.2);
        assert_eq!(candles[0].volume, 5000.5);
        assert_eq!(candles[1].close, 110.5);
    }

    #[test]
    fn test_parse_klines_api_error() {
        let err = parse_klines(r#"{"code":-1121,"msg":"Invalid symbol."}"#).unwrap_err();
        match err {
            FetchError::Api { code, msg } => {
                assert_eq!(code, -1121);
                assert_eq!(msg, "Invalid symbol.");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_parse_klines_rejects_short_rows() {
        let err = parse_klines(r#"[[1700000000000,"1","2","0.5"]]"#).unwrap_err();
        assert!(matches!(err, FetchError::Malformed(_)));
    }

    #[test]
    fn test_parse_klines_rejects_garbage_numbers() {
        let err = parse_klines(r#"[[1700000000000,"abc","2","0.5","1","10"]]"#).unwrap_err();
        assert!(matches!(err, FetchError::Malformed(_)));
    }

    #[test]
    fn test_parse_klines_rejects_broken_ohlc() {
        // high ниже close
        let err = parse_klines(r#"[[1700000000000,"1","1.5","0.5","2","10"]]"#).unwrap_err();
        assert!(matches!(err, FetchError::Malformed(_)));
    }

    #[test]
    fn test_parse_klines_rejects_unordered() {
        let body = r#"[
            [2000,"1","2","0.5","1.5","10"],
            [1000,"1","2","0.5","1.5","10"]
        ]"#;
        assert!(matches!(parse_klines(body), Err(FetchError::Malformed(_))));
    }

    #[test]
    fn test_parse_klines_not_json() {
        assert!(matches!(parse_klines("<html>502</html>"), Err(FetchError::Malformed(_))));
    }

    #[test]
    fn test_parse_klines_empty_array() {
        assert!(parse_klines("[]").unwrap().is_empty());
    }

    #[test]
    fn test_parse_tickers() {
        let body = r#"[
            {"symbol":"BTCUSDT","priceChange":"-94.99","lastPrice":"37000.1","volume":"120.5","quoteVolume":"4458000123.45","count":1000},
            {"symbol":"ETHUSDT","priceChange":"1.2","lastPrice":"2000.0","volume":"90.0","quoteVolume":"180000.0","count":10}
        ]"#;
        let instruments = parse_tickers(body).unwrap();

        assert_eq!(instruments.len(), 2);
        assert_eq!(instruments[0].symbol, "BTCUSDT");
        assert_eq!(instruments[0].quote_volume, 4458000123.45);
        assert!(instruments[1].tradable);
    }

    #[test]
    fn test_parse_tickers_skips_bad_quote_volume() {
        let body = r#"[
            {"symbol":"BTCUSDT","quoteVolume":"4458000123.45"},
            {"symbol":"BROKENUSDT","quoteVolume":"n/a"},
            {"symbol":"ETHUSDT","quoteVolume":"180000.0"}
        ]"#;
        let instruments = parse_tickers(body).unwrap();

        let symbols: Vec<&str> = instruments.iter().map(|i| i.symbol.as_str()).collect();
        assert_eq!(symbols, vec!["BTCUSDT", "ETHUSDT"]);
    }

    #[test]
    fn test_parse_tickers_schema_violation() {
        let err = parse_tickers(r#"[{"symbol":"BTCUSDT"}]"#).unwrap_err();
        assert!(matches!(err, FetchError::Malformed(_)));
    }

    #[test]
    fn test_parse_exchange_info() {
        let body = r#"{
            "timezone":"UTC",
            "symbols":[
                {"symbol":"BTCUSDT","pair":"BTCUSDT","contractType":"PERPETUAL","status":"TRADING","quoteAsset":"USDT"},
                {"symbol":"BTCUSDT_240329","pair":"BTCUSDT","contractType":"CURRENT_QUARTER","status":"TRADING","quoteAsset":"USDT"},
                {"symbol":"OLDUSDT","pair":"OLDUSDT","contractType":"PERPETUAL","status":"SETTLING","quoteAsset":"USDT"}
            ]
        }"#;
        let contracts = parse_exchange_info(body).unwrap();

        assert_eq!(contracts.len(), 3);
        assert!(contracts[0].is_tradable_perpetual());
        assert!(!contracts[1].is_tradable_perpetual());
        assert!(!contracts[2].is_tradable_perpetual());
    }
}
