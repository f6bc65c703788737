//! Binance USDT-M futures: klines, 24h тикеры, exchangeInfo

pub mod client;
pub mod parser;

pub use client::BinanceFuturesClient;
pub use parser::{parse_exchange_info, parse_klines, parse_tickers, ContractInfo};
