// Models
pub mod models;

// Detection pipeline
pub mod indicators;
pub mod patterns;
pub mod strategy;

// Alerts: ledger, message, notifiers
pub mod alerts;

// Universe selection and scan loop
pub mod screener;
pub mod utils;

// Market data (requires network stack)
#[cfg(feature = "live")]
pub mod exchanges;
