// Approval notification forwarder: relays a short message to the Telegram
// Bot API. Delivery failures are surfaced to the caller as a distinguishable
// upstream error; nothing here ever rolls back a store write.

use async_trait::async_trait;
use serde_json::Value;

use crate::config::TelegramConfig;

const MAX_ROUTE_NAME: usize = 200;
const MAX_ROUTE_ID: usize = 120;

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("Telegram not configured")]
    NotConfigured,

    #[error("Telegram API error: status {status}, body {body}")]
    Api { status: u16, body: String },

    #[error("Telegram request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

#[derive(Debug, Clone, Default)]
pub struct ApprovalNotice {
    pub route_name: String,
    pub route_id: String,
    pub review_link: String,
}

#[derive(Debug, Clone)]
pub struct NotifyReceipt {
    pub message_id: Option<i64>,
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send_approval(&self, notice: &ApprovalNotice) -> Result<NotifyReceipt, NotifyError>;
}

pub struct TelegramNotifier {
    http: reqwest::Client,
    config: TelegramConfig,
}

impl TelegramNotifier {
    pub fn new(http: reqwest::Client, config: TelegramConfig) -> Self {
        Self { http, config }
    }
}

/// Shape the HTML message exactly as the legacy forwarder did: header line,
/// route name, then either a review link or a bare ID line.
pub fn approval_text(notice: &ApprovalNotice) -> String {
    let route_name = match notice.route_name.is_empty() {
        true => "Маршрут",
        false => truncate(&notice.route_name, MAX_ROUTE_NAME),
    };
    let route_id = truncate(&notice.route_id, MAX_ROUTE_ID);
    let review_link = notice
        .review_link
        .starts_with("http")
        .then_some(notice.review_link.as_str())
        .unwrap_or("");

    let mut text = format!("🚦 Маршрут на погодження:\n{}", route_name);
    if !review_link.is_empty() {
        text.push_str(&format!("\n<a href=\"{}\">Маршрут</a>", review_link));
    } else if !route_id.is_empty() {
        text.push_str(&format!("\nID: {}", route_id));
    }
    text
}

fn truncate(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn send_approval(&self, notice: &ApprovalNotice) -> Result<NotifyReceipt, NotifyError> {
        if self.config.bot_token.is_empty() || self.config.chat_id.is_empty() {
            return Err(NotifyError::NotConfigured);
        }

        let url = format!("{}/bot{}/sendMessage", self.config.api_base, self.config.bot_token);
        let response = self
            .http
            .get(&url)
            .query(&[
                ("chat_id", self.config.chat_id.as_str()),
                ("text", &approval_text(notice)),
                ("parse_mode", "HTML"),
            ])
            .send()
            .await?;

        let status = response.status();
        let body: Value = response.json().await.unwrap_or(Value::Null);

        if !status.is_success() || body.get("ok") != Some(&Value::Bool(true)) {
            return Err(NotifyError::Api { status: status.as_u16(), body: body.to_string() });
        }

        let message_id = body
            .get("result")
            .and_then(|r| r.get("message_id"))
            .and_then(Value::as_i64);
        Ok(NotifyReceipt { message_id })
    }
}
