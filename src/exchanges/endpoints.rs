//! REST endpoints

/// Binance USDT-M futures (публичные, без подписи)
pub struct BinanceFuturesGet;

impl BinanceFuturesGet {
    pub const BASE: &'static str = "https://fapi.binance.com";
    pub const KLINES: &'static str = "/fapi/v1/klines";
    pub const TICKER_24H: &'static str = "/fapi/v1/ticker/24hr";
    pub const EXCHANGE_INFO: &'static str = "/fapi/v1/exchangeInfo";

    /// Максимальный limit для klines
    pub const MAX_KLINES: u32 = 1500;
}

pub struct TelegramApi;

impl TelegramApi {
    pub const BASE: &'static str = "https://api.telegram.org";
}
