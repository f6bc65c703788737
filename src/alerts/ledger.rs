//! Леджер алертов: символ -> open_time последней свечи, по которой уже отправлен алерт
//!
//! Живет только пока жив процесс. После рестарта все символы снова доступны.
//! Повтор блокируется только при точном совпадении open_time.

use parking_lot::Mutex;
use std::collections::HashMap;

#[derive(Debug, Default)]
pub struct AlertLedger {
    last_alerted: Mutex<HashMap<String, i64>>,
}

impl AlertLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// false только если для символа уже записан ровно этот open_time
    pub fn should_alert(&self, symbol: &str, candle_open_time: i64) -> bool {
        self.last_alerted.lock().get(symbol) != Some(&candle_open_time)
    }

    pub fn record_alert(&self, symbol: &str, candle_open_time: i64) {
        self.last_alerted.lock().insert(symbol.to_string(), candle_open_time);
    }

    /// Проверка и запись под одной блокировкой.
    /// true - вызывающий получил право отправить алерт по этой свече.
    pub fn claim(&self, symbol: &str, candle_open_time: i64) -> bool {
        let mut map = self.last_alerted.lock();
        if map.get(symbol) == Some(&candle_open_time) {
            return false;
        }
        map.insert(symbol.to_string(), candle_open_time);
        true
    }

    pub fn last_alerted(&self, symbol: &str) -> Option<i64> {
        self.last_alerted.lock().get(symbol).copied()
    }

    pub fn len(&self) -> usize {
        self.last_alerted.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.last_alerted.lock().is_empty()
    }
}
