//! Текст алерта (Telegram HTML)

use chrono::DateTime;

use crate::models::{Candle, Signal};

/// Цена без хвостовых нулей, до 8 знаков после точки
pub fn format_price(value: f64) -> String {
    let text = format!("{:.8}", value);
    let text = text.trim_end_matches('0').trim_end_matches('.');
    if text.is_empty() || text == "-" {
        "0".to_string()
    } else {
        text.to_string()
    }
}

fn format_open_time(open_time_ms: i64) -> String {
    match DateTime::from_timestamp_millis(open_time_ms) {
        Some(ts) => ts.format("%Y-%m-%d %H:%M UTC").to_string(),
        None => open_time_ms.to_string(),
    }
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

pub fn format_alert(signal: &Signal, candle: &Candle, interval: &str, footer: &str) -> String {
    let trend = signal.trend.map(|t| t.as_str()).unwrap_or("n/a");

    format!(
        "🚨 <b>{direction} MARUBOZU (Binance Futures)</b>\n\
         Symbol: <b>{symbol}</b>\n\
         TF: <b>{tf}</b>\n\
         Candle: <b>{opened}</b>\n\
         \n\
         Close: <b>{close}</b>\n\
         Volume: <b>{volume}</b>\n\
         Trend: <b>{trend}</b>\n\
         \n\
         Entry: <b>{entry}</b>\n\
         SL: <b>{sl}</b>\n\
         TP: <b>{tp}</b>\n\
         \n\
         <i>{footer}</i>",
        direction = signal.direction.as_str().to_uppercase(),
        symbol = escape_html(&signal.symbol),
        tf = escape_html(&interval.to_uppercase()),
        opened = format_open_time(signal.candle_open_time),
        close = format_price(candle.close),
        volume = format_price(candle.volume),
        trend = trend,
        entry = format_price(signal.entry),
        sl = format_price(signal.stop_loss),
        tp = format_price(signal.take_profit),
        footer = escape_html(footer),
    )
}
