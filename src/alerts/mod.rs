pub mod ledger;
pub mod message;

#[cfg(feature = "live")]
pub mod notifier;

pub use ledger::AlertLedger;
pub use message::format_alert;

#[cfg(feature = "live")]
pub use notifier::{LogNotifier, Notifier, NotifyError, TelegramNotifier};
