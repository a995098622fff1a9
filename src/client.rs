//! Remote service client
//!
//! The remote browser-automation service is an opaque capability behind
//! the [`RemoteClient`] trait: open a session and start an agent, stop
//! it, scrape a page, and open the per-run message stream. Every call is
//! a single attempt; failures surface as [`Error::RemoteCall`] or
//! [`Error::Stream`] with the underlying cause, and retrying is the
//! caller's decision (the coordinator never does).

use crate::agent::types::{ActiveRun, AgentConfig, TaskDetails};
use crate::config::{DeckConfig, StreamConfig};
use crate::error::{Error, Result};
use crate::scrape::ScrapeConfig;
use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

/// Persistent, ordered message stream for one run.
///
/// `recv` waits at most `wait` for the next text frame: `Ok(Some(_))` is
/// a frame, `Ok(None)` means the poll window elapsed with nothing to
/// deliver (the cooperative-cancellation point), and `Err` means the
/// channel closed or failed.
#[async_trait]
pub trait StreamChannel: Send {
    async fn recv(&mut self, wait: Duration) -> Result<Option<String>>;

    /// Best-effort close; errors are ignored.
    async fn close(&mut self);
}

/// Opaque handle to the remote browser-automation service
#[async_trait]
pub trait RemoteClient: Send + Sync {
    /// Open a session and start an agent run; returns the correlation
    /// identifiers for the stream channel and the stop call.
    async fn start_agent(&self, config: &AgentConfig, details: &TaskDetails)
        -> Result<ActiveRun>;

    /// Stop a running agent.
    async fn stop_agent(&self, run: &ActiveRun) -> Result<()>;

    /// Scrape one URL; returns the extracted data as text (pretty JSON
    /// when the service produced structured output).
    async fn scrape(&self, config: &ScrapeConfig) -> Result<String>;

    /// Open the message stream channel for a run.
    async fn open_stream(&self, run: &ActiveRun) -> Result<Box<dyn StreamChannel>>;
}

// =============================================================================
// HTTP + WebSocket implementation
// =============================================================================

/// Production client speaking HTTP for control calls and WebSocket for
/// the stream channel
pub struct HttpRemoteClient {
    http: reqwest::Client,
    base_url: String,
    ws_base_url: String,
    api_key: String,
    stream: StreamConfig,
}

#[derive(Deserialize)]
struct StartAgentResponse {
    agent_id: String,
    session_id: String,
}

#[derive(Deserialize)]
struct ScrapeResponse {
    data: serde_json::Value,
}

impl HttpRemoteClient {
    /// Build a client from configuration; fails with
    /// [`Error::Config`] when no API key is available.
    pub fn from_config(config: &DeckConfig) -> Result<Self> {
        let api_key = config.require_api_key()?;
        Ok(Self {
            http: reqwest::Client::new(),
            base_url: config.server.base_url.trim_end_matches('/').to_string(),
            ws_base_url: config.server.ws_base_url.trim_end_matches('/').to_string(),
            api_key,
            stream: config.stream.clone(),
        })
    }

    fn stream_endpoint(&self, run: &ActiveRun) -> String {
        format!(
            "{}/agents/{}/listen?token={}&session_id={}",
            self.ws_base_url, run.agent_id, self.api_key, run.session_id
        )
    }

    async fn post_json<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        body: &serde_json::Value,
        context: &str,
    ) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);
        let request_id = uuid::Uuid::new_v4();
        tracing::debug!(%request_id, %url, "Remote call");
        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| Error::RemoteCall(format!("{}: {}", context, e)))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(Error::RemoteCall(format!(
                "{}: HTTP {} {}",
                context, status, detail
            )));
        }

        response
            .json()
            .await
            .map_err(|e| Error::RemoteCall(format!("{}: invalid response: {}", context, e)))
    }
}

#[async_trait]
impl RemoteClient for HttpRemoteClient {
    async fn start_agent(
        &self,
        config: &AgentConfig,
        details: &TaskDetails,
    ) -> Result<ActiveRun> {
        let body = serde_json::json!({
            "reasoning_model": config.reasoning_model,
            "max_steps": config.max_steps,
            "attach_vault": config.attach_vault,
            "attach_persona": config.attach_persona,
            "attach_files": config.attach_files,
            "task": details.task,
            "url": details.url,
        });
        let started: StartAgentResponse = self
            .post_json("/agents/start", &body, "start agent")
            .await?;
        tracing::info!(
            agent_id = %started.agent_id,
            session_id = %started.session_id,
            "Agent started"
        );
        Ok(ActiveRun {
            agent_id: started.agent_id,
            session_id: started.session_id,
        })
    }

    async fn stop_agent(&self, run: &ActiveRun) -> Result<()> {
        let body = serde_json::json!({ "session_id": run.session_id });
        let _: serde_json::Value = self
            .post_json(
                &format!("/agents/{}/stop", run.agent_id),
                &body,
                "stop agent",
            )
            .await?;
        tracing::info!(agent_id = %run.agent_id, "Agent stop requested");
        Ok(())
    }

    async fn scrape(&self, config: &ScrapeConfig) -> Result<String> {
        let body = serde_json::json!({
            "url": config.url,
            "scrape_links": config.scrape_links,
            "only_main_content": config.only_main_content,
            "instructions": config.instructions,
        });
        let response: ScrapeResponse = self.post_json("/scrape", &body, "scrape").await?;
        match response.data {
            serde_json::Value::String(text) => Ok(text),
            structured => serde_json::to_string_pretty(&structured)
                .map_err(|e| Error::RemoteCall(format!("scrape: unrenderable result: {}", e))),
        }
    }

    async fn open_stream(&self, run: &ActiveRun) -> Result<Box<dyn StreamChannel>> {
        let endpoint = self.stream_endpoint(run);
        let connect = tokio::time::timeout(self.stream.open_timeout(), connect_async(&endpoint));
        let (ws, _) = match connect.await {
            Ok(Ok(pair)) => pair,
            Ok(Err(e)) => {
                return Err(Error::Stream(format!(
                    "Failed to open stream channel: {}",
                    e
                )))
            }
            Err(_) => {
                return Err(Error::Stream(format!(
                    "Stream channel open timed out after {:?}",
                    self.stream.open_timeout()
                )))
            }
        };
        tracing::debug!(agent_id = %run.agent_id, "Stream channel open");
        Ok(Box::new(WsStreamChannel::new(ws, self.stream.keep_alive())))
    }
}

// =============================================================================
// WebSocket stream channel
// =============================================================================

/// [`StreamChannel`] over a tungstenite WebSocket with periodic
/// keep-alive pings
pub struct WsStreamChannel {
    ws: WebSocketStream<MaybeTlsStream<TcpStream>>,
    keep_alive: tokio::time::Interval,
}

impl WsStreamChannel {
    pub fn new(
        ws: WebSocketStream<MaybeTlsStream<TcpStream>>,
        keep_alive_every: Duration,
    ) -> Self {
        let mut keep_alive = tokio::time::interval(keep_alive_every);
        // The first tick fires immediately; skip it so pings start one
        // interval after connect.
        keep_alive.reset();
        Self { ws, keep_alive }
    }
}

#[async_trait]
impl StreamChannel for WsStreamChannel {
    async fn recv(&mut self, wait: Duration) -> Result<Option<String>> {
        let deadline = tokio::time::Instant::now() + wait;
        loop {
            tokio::select! {
                _ = tokio::time::sleep_until(deadline) => return Ok(None),
                _ = self.keep_alive.tick() => {
                    self.ws
                        .send(Message::Ping(Vec::new()))
                        .await
                        .map_err(|e| Error::Stream(format!("Keep-alive failed: {}", e)))?;
                }
                frame = self.ws.next() => match frame {
                    Some(Ok(Message::Text(text))) => return Ok(Some(text)),
                    Some(Ok(Message::Ping(payload))) => {
                        let _ = self.ws.send(Message::Pong(payload)).await;
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        return Err(Error::Stream("Channel closed by remote".to_string()));
                    }
                    Some(Ok(_)) => {
                        // Pong and binary frames carry nothing for us
                    }
                    Some(Err(e)) => {
                        return Err(Error::Stream(format!("Channel receive failed: {}", e)));
                    }
                }
            }
        }
    }

    async fn close(&mut self) {
        let _ = self.ws.close(None).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServerConfig;

    fn client() -> HttpRemoteClient {
        let config = DeckConfig {
            server: ServerConfig {
                base_url: "https://api.example.com/".to_string(),
                ws_base_url: "wss://api.example.com/".to_string(),
                api_key: Some("sk-test".to_string()),
            },
            ..Default::default()
        };
        HttpRemoteClient::from_config(&config).unwrap()
    }

    #[test]
    fn test_stream_endpoint_composition() {
        let run = ActiveRun {
            agent_id: "agent-7".to_string(),
            session_id: "session-9".to_string(),
        };
        // Built directly so an ambient key override cannot skew the token.
        let c = HttpRemoteClient {
            http: reqwest::Client::new(),
            base_url: "https://api.example.com".to_string(),
            ws_base_url: "wss://api.example.com".to_string(),
            api_key: "sk-test".to_string(),
            stream: StreamConfig::default(),
        };
        let endpoint = c.stream_endpoint(&run);
        assert_eq!(
            endpoint,
            "wss://api.example.com/agents/agent-7/listen?token=sk-test&session_id=session-9"
        );
    }

    #[test]
    fn test_base_url_trailing_slash_stripped() {
        let c = client();
        assert_eq!(c.base_url, "https://api.example.com");
        assert_eq!(c.ws_base_url, "wss://api.example.com");
    }

    #[test]
    fn test_from_config_requires_api_key() {
        let config = DeckConfig::default();
        // No key in config; only fails when the env override is unset too.
        if std::env::var(crate::config::API_KEY_ENV).is_err() {
            assert!(HttpRemoteClient::from_config(&config).is_err());
        }
    }
}
