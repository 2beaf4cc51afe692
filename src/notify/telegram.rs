use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use crate::config::{Config, DISPATCH_TIMEOUT_SECS};
use crate::error::DispatchError;

/// Delivers one text message to the configured recipient.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, message: &str) -> Result<(), DispatchError>;
}

/// Bot API `sendMessage` client.
pub struct TelegramNotifier {
    client: reqwest::Client,
    api_url: String,
    bot_token: String,
    chat_id: String,
}

#[derive(Debug, Deserialize)]
struct SendMessageResponse {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
}

impl TelegramNotifier {
    pub fn new(cfg: &Config) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(DISPATCH_TIMEOUT_SECS))
            .build()?;
        Ok(Self {
            client,
            api_url: cfg.telegram_api_url.clone(),
            bot_token: cfg.bot_token.clone(),
            chat_id: cfg.chat_id.clone(),
        })
    }

    fn send_url(&self, message: &str) -> String {
        send_message_url(&self.api_url, &self.bot_token, &self.chat_id, message)
    }
}

/// Messages go out with `parse_mode=html`, so `&`, `<` and `>` in listing
/// text must be entities or the gateway refuses the whole message.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    out
}

/// The message body is HTML-escaped and URL-encoded here, never upstream.
pub fn send_message_url(api_url: &str, bot_token: &str, chat_id: &str, message: &str) -> String {
    format!(
        "{}/bot{}/sendMessage?chat_id={}&parse_mode=html&text={}",
        api_url,
        bot_token,
        urlencoding::encode(chat_id),
        urlencoding::encode(&escape_html(message))
    )
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn send(&self, message: &str) -> Result<(), DispatchError> {
        let resp = self.client.get(self.send_url(message)).send().await?;
        let status = resp.status();

        // The gateway reports rejections in the body alongside a 4xx status.
        match resp.json::<SendMessageResponse>().await {
            Ok(body) if body.ok => {
                debug!(chat_id = %self.chat_id, "message delivered");
                Ok(())
            }
            Ok(body) => Err(DispatchError::Rejected(
                body.description
                    .unwrap_or_else(|| format!("HTTP {}", status.as_u16())),
            )),
            Err(_) if !status.is_success() => Err(DispatchError::Status(status.as_u16())),
            Err(e) => Err(DispatchError::Http(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    use axum::extract::{Query, State};
    use axum::http::StatusCode;
    use axum::response::{IntoResponse, Response};
    use axum::routing::get;
    use axum::{Json, Router};
    use serde_json::json;

    use crate::config::test_config;

    type Received = Arc<Mutex<Vec<HashMap<String, String>>>>;

    /// Local stand-in for the Bot API. The bot token picks the behavior.
    async fn spawn_gateway() -> (String, Received) {
        let received: Received = Arc::default();

        async fn accept(
            State(received): State<Received>,
            Query(params): Query<HashMap<String, String>>,
        ) -> Response {
            received.lock().unwrap().push(params);
            Json(json!({ "ok": true, "result": { "message_id": 1 } })).into_response()
        }

        async fn reject() -> Response {
            let body = json!({
                "ok": false,
                "error_code": 400,
                "description": "Bad Request: chat not found"
            });
            (StatusCode::BAD_REQUEST, Json(body)).into_response()
        }

        async fn down() -> Response {
            (StatusCode::BAD_GATEWAY, "upstream unavailable").into_response()
        }

        let app = Router::new()
            .route("/botok/sendMessage", get(accept))
            .route("/botrejected/sendMessage", get(reject))
            .route("/botdown/sendMessage", get(down))
            .with_state(Arc::clone(&received));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
        (format!("http://{addr}"), received)
    }

    fn notifier(api_url: &str, token: &str) -> TelegramNotifier {
        let mut cfg = test_config(&["lego"], "http://unused.invalid", api_url);
        cfg.bot_token = token.to_string();
        TelegramNotifier::new(&cfg).unwrap()
    }

    #[test]
    fn escapes_html_specials() {
        assert_eq!(escape_html("A&W <10> mugs"), "A&amp;W &lt;10&gt; mugs");
        assert_eq!(escape_html("plain"), "plain");
    }

    #[test]
    fn message_body_is_escaped_then_url_encoded() {
        let url = send_message_url("https://api.telegram.org", "123:abc", "-1001", "A & B <x>");
        assert_eq!(
            url,
            "https://api.telegram.org/bot123:abc/sendMessage?chat_id=-1001&parse_mode=html\
             &text=A%20%26amp%3B%20B%20%26lt%3Bx%26gt%3B"
        );
    }

    #[tokio::test]
    async fn delivered_message_arrives_escaped() {
        let (api_url, received) = spawn_gateway().await;
        let listing_text = "Name: A&W Mug\nThumbnail: https://img.example.com/1.jpg?w=1&h=2\n";

        notifier(&api_url, "ok").send(listing_text).await.unwrap();

        let received = received.lock().unwrap();
        assert_eq!(received.len(), 1);
        assert_eq!(received[0]["chat_id"], "chat");
        assert_eq!(received[0]["parse_mode"], "html");
        assert_eq!(
            received[0]["text"],
            "Name: A&amp;W Mug\nThumbnail: https://img.example.com/1.jpg?w=1&amp;h=2\n"
        );
    }

    #[tokio::test]
    async fn ok_false_body_is_rejected() {
        let (api_url, _) = spawn_gateway().await;
        let err = notifier(&api_url, "rejected").send("hello").await.unwrap_err();
        match err {
            DispatchError::Rejected(description) => {
                assert_eq!(description, "Bad Request: chat not found")
            }
            other => panic!("expected Rejected, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn non_json_error_maps_to_status() {
        let (api_url, _) = spawn_gateway().await;
        let err = notifier(&api_url, "down").send("hello").await.unwrap_err();
        assert!(matches!(err, DispatchError::Status(502)), "got {err:?}");
    }
}
