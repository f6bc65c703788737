//! Доставка алертов: Telegram или просто лог
//!
//! Доставка best-effort: ошибка логируется вызывающим и не повторяется.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Rejected by server ({status}): {description}")]
    Rejected { status: u16, description: String },
    #[error("Notifier is not configured")]
    NotConfigured,
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, message: &str) -> Result<(), NotifyError>;
    fn name(&self) -> &str;
}

/// Пишет алерт в лог (dry-run или когда Telegram не настроен)
#[derive(Debug, Default, Clone)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, message: &str) -> Result<(), NotifyError> {
        log::info!("📣 [dry-run] Алерт:\n{}", message);
        Ok(())
    }

    fn name(&self) -> &str {
        "log"
    }
}

#[derive(Debug, Serialize)]
struct SendMessageRequest<'a> {
    chat_id: &'a str,
    text: &'a str,
    parse_mode: &'a str,
    disable_web_page_preview: bool,
}

#[derive(Debug, Deserialize)]
struct TelegramResponse {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
}

pub struct TelegramNotifier {
    client: Client,
    api_base: String,
    bot_token: String,
    chat_id: String,
}

impl TelegramNotifier {
    pub fn new(
        api_base: &str,
        bot_token: &str,
        chat_id: &str,
        timeout: Duration,
    ) -> Result<Self, NotifyError> {
        if bot_token.trim().is_empty() || chat_id.trim().is_empty() {
            return Err(NotifyError::NotConfigured);
        }

        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            api_base: api_base.trim_end_matches('/').to_string(),
            bot_token: bot_token.trim().to_string(),
            chat_id: chat_id.trim().to_string(),
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/bot{}/sendMessage", self.api_base, self.bot_token)
    }
}

/// Успех только при 2xx и "ok": true.
/// Без description в ответе описанием ошибки становится сырое тело.
fn interpret_send_response(status: StatusCode, text: String) -> Result<(), NotifyError> {
    let parsed: Option<TelegramResponse> = serde_json::from_str(&text).ok();
    match parsed {
        Some(r) if status.is_success() && r.ok => Ok(()),
        Some(r) => Err(NotifyError::Rejected {
            status: status.as_u16(),
            description: r.description.unwrap_or(text),
        }),
        None => Err(NotifyError::Rejected {
            status: status.as_u16(),
            description: text,
        }),
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn send(&self, message: &str) -> Result<(), NotifyError> {
        let body = SendMessageRequest {
            chat_id: &self.chat_id,
            text: message,
            parse_mode: "HTML",
            disable_web_page_preview: true,
        };

        // URL содержит токен бота, в ошибку он попасть не должен
        let resp = self
            .client
            .post(self.endpoint())
            .json(&body)
            .send()
            .await
            .map_err(|e| NotifyError::Http(e.without_url()))?;
        let status = resp.status();
        let text = resp.text().await.map_err(|e| NotifyError::Http(e.without_url()))?;

        interpret_send_response(status, text)
    }

    fn name(&self) -> &str {
        "telegram"
    }
}
