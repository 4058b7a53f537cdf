//! Admin alert delivery.

use std::time::Duration;

use async_trait::async_trait;
use idena_watch_domain::model::Notification;
use serde::{Deserialize, Serialize};
use thiserror::Error;

const TELEGRAM_API_URL: &str = "https://api.telegram.org";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NotifyError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("delivery rejected: {0}")]
    Rejected(String),
}

impl From<reqwest::Error> for NotifyError {
    fn from(value: reqwest::Error) -> Self {
        Self::Transport(value.to_string())
    }
}

/// Send-message capability of the chat transport.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, recipient: &str, notification: &Notification) -> Result<(), NotifyError>;
}

#[derive(Debug, Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
    parse_mode: &'static str,
    disable_web_page_preview: bool,
}

#[derive(Debug, Deserialize)]
struct BotResponse {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
}

/// Delivers notifications through the Telegram Bot API `sendMessage` call.
pub struct TelegramNotifier {
    http: reqwest::Client,
    base_url: String,
    token: String,
}

impl TelegramNotifier {
    pub fn new(token: impl Into<String>) -> Result<Self, NotifyError> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            http,
            base_url: TELEGRAM_API_URL.to_string(),
            token: token.into(),
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/bot{}/sendMessage",
            self.base_url.trim_end_matches('/'),
            self.token
        )
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn send(&self, recipient: &str, notification: &Notification) -> Result<(), NotifyError> {
        let body = SendMessage {
            chat_id: recipient,
            text: &notification.text,
            parse_mode: "Markdown",
            disable_web_page_preview: true,
        };
        // Telegram answers 4xx with a JSON body explaining the rejection.
        let response: BotResponse = self
            .http
            .post(self.endpoint())
            .json(&body)
            .send()
            .await?
            .json()
            .await?;

        if response.ok {
            Ok(())
        } else {
            Err(NotifyError::Rejected(
                response
                    .description
                    .unwrap_or_else(|| "unknown error".to_string()),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use idena_watch_domain::render::received_alert;
    use mockito::{Matcher, Server};
    use std::net::TcpListener;

    fn localhost_binding_permitted() -> bool {
        TcpListener::bind("127.0.0.1:0").is_ok()
    }

    #[tokio::test]
    async fn posts_markdown_message_to_recipient() {
        if !localhost_binding_permitted() {
            return;
        }
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/bot123:abc/sendMessage")
            .match_body(Matcher::PartialJsonString(
                r#"{"chat_id":"1001","parse_mode":"Markdown"}"#.to_string(),
            ))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"ok":true,"result":{}}"#)
            .create_async()
            .await;

        let notifier = TelegramNotifier::new("123:abc")
            .unwrap()
            .with_base_url(server.url());
        notifier
            .send("1001", &received_alert("5"))
            .await
            .expect("delivered");

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn rejection_carries_description() {
        if !localhost_binding_permitted() {
            return;
        }
        let mut server = Server::new_async().await;
        let _m = server
            .mock("POST", "/bot123:abc/sendMessage")
            .with_status(403)
            .with_header("content-type", "application/json")
            .with_body(r#"{"ok":false,"description":"Forbidden: bot was blocked by the user"}"#)
            .create_async()
            .await;

        let notifier = TelegramNotifier::new("123:abc")
            .unwrap()
            .with_base_url(server.url());
        let err = notifier
            .send("1001", &received_alert("5"))
            .await
            .unwrap_err();

        assert_eq!(
            err,
            NotifyError::Rejected("Forbidden: bot was blocked by the user".into())
        );
    }
}
