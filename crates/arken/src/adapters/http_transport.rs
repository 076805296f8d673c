//! HTTP Chat Transport
//!
//! Delivers chat-completions requests to the companion endpoint using reqwest.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use tracing::debug;

use crate::domain::DomainError;
use crate::ports::{ChatRequest, ChatTransport};
use crate::services::CompanionConfig;

/// reqwest implementation of `ChatTransport`
pub struct HttpChatTransport {
    client: Client,
    url: String,
    api_key: Option<String>,
}

impl HttpChatTransport {
    pub fn new(config: &CompanionConfig) -> Result<Self, DomainError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs.max(1)))
            .user_agent(concat!("arken/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| DomainError::Transport(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            url: config.api_url.clone(),
            api_key: config.bearer_token().map(str::to_string),
        })
    }
}

#[async_trait]
impl ChatTransport for HttpChatTransport {
    async fn post(&self, request: &ChatRequest) -> Result<String, DomainError> {
        let body = serde_json::to_vec(request).map_err(|e| {
            DomainError::Validation(format!("Failed to serialize chat request: {e}"))
        })?;

        let mut builder = self
            .client
            .post(&self.url)
            .header(CONTENT_TYPE, "application/json");
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder
            .body(body)
            .send()
            .await
            .map_err(|e| DomainError::Transport(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| DomainError::Transport(format!("Failed to read response body: {e}")))?;
        debug!(status = status.as_u16(), body_len = text.len(), "Companion endpoint answered");

        if !status.is_success() {
            return Err(DomainError::Http {
                status: status.as_u16(),
                body: text,
            });
        }

        Ok(text)
    }

    fn endpoint(&self) -> &str {
        &self.url
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Speaker;
    use crate::ports::ChatMessage;
    use crate::services::{CompanionBridge, ReplyOutcome, SessionContext};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    fn header_end(buf: &[u8]) -> Option<usize> {
        buf.windows(4).position(|w| w == b"\r\n\r\n")
    }

    /// Accept one connection, answer with `status_line` + `body`, return the raw request
    async fn serve_once(status_line: &'static str, body: &'static str) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let task = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = Vec::new();
            let mut chunk = [0u8; 4096];
            loop {
                let n = socket.read(&mut chunk).await.unwrap();
                if n == 0 {
                    break;
                }
                buf.extend_from_slice(&chunk[..n]);
                if let Some(end) = header_end(&buf) {
                    let headers = String::from_utf8_lossy(&buf[..end]).to_lowercase();
                    let length = headers
                        .lines()
                        .find_map(|l| l.strip_prefix("content-length:"))
                        .and_then(|v| v.trim().parse::<usize>().ok())
                        .unwrap_or(0);
                    if buf.len() >= end + 4 + length {
                        break;
                    }
                }
            }

            let response = format!(
                "{status_line}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            let _ = socket.shutdown().await;
            String::from_utf8_lossy(&buf).to_string()
        });

        (format!("http://{addr}/v1/chat/completions"), task)
    }

    fn request() -> ChatRequest {
        ChatRequest {
            model: "mistral".to_string(),
            messages: vec![
                ChatMessage::system("guide"),
                ChatMessage::spoken_by(Speaker::Player, "hello"),
            ],
        }
    }

    #[tokio::test]
    async fn test_post_sends_json_with_bearer() {
        let (url, server) =
            serve_once("HTTP/1.1 200 OK", r#"{"choices":[{"message":{"content":"hi"}}]}"#).await;
        let config = CompanionConfig::new(url, "mistral").with_api_key("sk-test");
        let transport = HttpChatTransport::new(&config).unwrap();

        let body = transport.post(&request()).await.unwrap();
        assert_eq!(body, r#"{"choices":[{"message":{"content":"hi"}}]}"#);

        let raw = server.await.unwrap().to_lowercase();
        assert!(raw.starts_with("post /v1/chat/completions"));
        assert!(raw.contains("content-type: application/json"));
        assert!(raw.contains("authorization: bearer sk-test"));
        assert!(raw.contains(r#""model":"mistral""#));
        assert!(raw.contains(r#"{"role":"user","content":"hello"}"#));
    }

    #[tokio::test]
    async fn test_post_without_key_omits_authorization() {
        let (url, server) = serve_once("HTTP/1.1 200 OK", r#"{"choices":[]}"#).await;
        let transport = HttpChatTransport::new(&CompanionConfig::new(url, "mistral")).unwrap();

        transport.post(&request()).await.unwrap();
        let raw = server.await.unwrap().to_lowercase();
        assert!(!raw.contains("authorization:"));
    }

    #[tokio::test]
    async fn test_non_success_status_is_http_error() {
        let (url, _server) =
            serve_once("HTTP/1.1 503 Service Unavailable", r#"{"error":"loading model"}"#).await;
        let transport = HttpChatTransport::new(&CompanionConfig::new(url, "mistral")).unwrap();

        match transport.post(&request()).await {
            Err(DomainError::Http { status, body }) => {
                assert_eq!(status, 503);
                assert!(body.contains("loading model"));
            }
            other => panic!("expected HTTP error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_connection_refused_is_transport_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let config = CompanionConfig::new(format!("http://{addr}/v1/chat/completions"), "mistral");
        let transport = HttpChatTransport::new(&config).unwrap();
        let err = transport.post(&request()).await.unwrap_err();
        assert!(matches!(err, DomainError::Transport(_)));
    }

    #[tokio::test]
    async fn test_bridge_round_trip_over_http() {
        let (url, _server) =
            serve_once("HTTP/1.1 200 OK", r#"{"choices":[{"message":{"content":"hi"}}]}"#).await;
        let config = CompanionConfig::new(url, "mistral");
        let session = SessionContext::new();
        let bridge = CompanionBridge::builder()
            .transport(HttpChatTransport::new(&config).unwrap())
            .config(config)
            .session(session.clone())
            .build()
            .unwrap();

        let outcome = bridge.send("hello").await.unwrap();
        assert_eq!(outcome, ReplyOutcome::Answered("hi".to_string()));
        let last = session.last().unwrap();
        assert_eq!(last.speaker(), Speaker::Companion);
        assert_eq!(last.message(), "hi");
    }
}
