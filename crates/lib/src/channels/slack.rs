//! Slack channel: Socket Mode for inbound events and chat.postMessage via the Web API.

use crate::channels::dispatch::ReplySender;
use crate::channels::error::ChannelError;
use crate::channels::inbound::{EventKind, InboundEvent, OutboundReply};
use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Notify};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;

const SLACK_API_BASE: &str = "https://slack.com/api";
const RECONNECT_DELAY: Duration = Duration::from_secs(2);

/// Common shape of Web API responses; only the fields we read.
#[derive(Debug, Deserialize)]
struct ApiResponse {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
    /// apps.connections.open
    #[serde(default)]
    url: Option<String>,
    /// auth.test
    #[serde(default)]
    user_id: Option<String>,
}

/// Socket Mode frame: `{ "type", "envelope_id"?, "payload"?, "reason"? }`.
#[derive(Debug, Deserialize)]
pub struct SocketEnvelope {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub envelope_id: Option<String>,
    #[serde(default)]
    pub payload: Option<serde_json::Value>,
    #[serde(default)]
    pub reason: Option<String>,
}

impl SocketEnvelope {
    /// Acknowledgement frame Slack expects for every envelope that carries an id.
    pub fn ack(&self) -> Option<String> {
        self.envelope_id
            .as_ref()
            .map(|id| serde_json::json!({ "envelope_id": id }).to_string())
    }
}

#[derive(Debug, Deserialize)]
struct EventCallback {
    event: SlackEvent,
}

#[derive(Debug, Deserialize)]
struct SlackEvent {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    user: Option<String>,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    channel: Option<String>,
    #[serde(default)]
    ts: Option<String>,
    #[serde(default)]
    subtype: Option<String>,
    #[serde(default)]
    bot_id: Option<String>,
    #[serde(default)]
    channel_type: Option<String>,
}

/// Convert an `events_api` payload into an inbound event.
/// Returns None for event types we do not subscribe to, bot messages, message subtypes
/// (edits, joins, ...) and events missing text, channel or ts.
pub fn inbound_from_payload(payload: &serde_json::Value) -> Option<InboundEvent> {
    let callback: EventCallback = serde_json::from_value(payload.clone()).ok()?;
    let ev = callback.event;
    let kind = match ev.kind.as_str() {
        "app_mention" => EventKind::Mention,
        "message" if ev.subtype.is_none() && ev.bot_id.is_none() => EventKind::Message,
        _ => return None,
    };
    Some(InboundEvent {
        kind,
        user: ev.user.unwrap_or_default(),
        text: ev.text?,
        channel: ev.channel?,
        ts: ev.ts?,
        channel_type: ev.channel_type,
    })
}

/// Slack connector: Socket Mode receive loop plus Web API calls.
pub struct SlackChannel {
    id: String,
    bot_token: Option<String>,
    app_token: Option<String>,
    api_base: String,
    running: AtomicBool,
    stop_notify: Notify,
    client: reqwest::Client,
}

enum SessionEnd {
    Reconnect,
    Stopped,
    InboundClosed,
}

fn into_connection_error(e: ChannelError) -> ChannelError {
    match e {
        ChannelError::Connection(_) => e,
        other => ChannelError::Connection(other.to_string()),
    }
}

impl SlackChannel {
    pub fn new(bot_token: Option<String>, app_token: Option<String>) -> Self {
        Self {
            id: "slack".to_string(),
            bot_token,
            app_token,
            api_base: slack_api_base(),
            running: AtomicBool::new(false),
            stop_notify: Notify::new(),
            client: reqwest::Client::new(),
        }
    }

    /// Point Web API calls somewhere else (tests, proxies).
    pub fn with_api_base(mut self, base: impl Into<String>) -> Self {
        self.api_base = base.into().trim_end_matches('/').to_string();
        self
    }

    fn running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// POST a Web API method with a bearer token; maps `ok: false` to [`ChannelError::Api`].
    async fn call(
        &self,
        method: &str,
        token: &str,
        body: serde_json::Value,
    ) -> Result<ApiResponse, ChannelError> {
        let url = format!("{}/{}", self.api_base, method);
        let res = self
            .client
            .post(&url)
            .bearer_auth(token)
            .json(&body)
            .send()
            .await?;
        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(ChannelError::Api(format!("{} failed: {} {}", method, status, body)));
        }
        let data: ApiResponse = res.json().await?;
        if !data.ok {
            return Err(ChannelError::Api(format!(
                "{} returned error: {}",
                method,
                data.error.as_deref().unwrap_or("unknown")
            )));
        }
        Ok(data)
    }

    /// Check the bot token with auth.test. Returns the bot's user id.
    pub async fn auth_test(&self) -> Result<String, ChannelError> {
        let token = self
            .bot_token
            .as_deref()
            .ok_or_else(|| ChannelError::Connection("slack bot token not configured".to_string()))?;
        let data = self.call("auth.test", token, serde_json::json!({})).await?;
        Ok(data.user_id.unwrap_or_default())
    }

    /// Ask for a fresh Socket Mode WebSocket URL (apps.connections.open, app-level token).
    pub async fn open_socket_url(&self) -> Result<String, ChannelError> {
        let token = self
            .app_token
            .as_deref()
            .ok_or_else(|| ChannelError::Connection("slack app token not configured".to_string()))?;
        let data = self
            .call("apps.connections.open", token, serde_json::json!({}))
            .await?;
        data.url
            .ok_or_else(|| ChannelError::Api("apps.connections.open returned no url".to_string()))
    }

    /// Establish the workspace session: validate credentials and obtain the Socket Mode URL.
    /// Any failure is reported as [`ChannelError::Connection`]; no retry is attempted.
    pub async fn connect(&self) -> Result<String, ChannelError> {
        log::info!("slack: initializing socket mode session");
        let user_id = self.auth_test().await.map_err(into_connection_error)?;
        log::info!("slack: authenticated as {}", user_id);
        self.open_socket_url().await.map_err(into_connection_error)
    }

    /// Start the Socket Mode loop on `socket_url` and forward events to the dispatcher.
    /// Returns a handle to await on shutdown.
    pub fn start_inbound(
        self: Arc<Self>,
        socket_url: String,
        inbound_tx: mpsc::Sender<InboundEvent>,
    ) -> JoinHandle<()> {
        self.running.store(true, Ordering::SeqCst);
        log::info!("slack channel: starting socket mode loop");
        tokio::spawn(async move {
            run_socket_mode_loop(self, socket_url, inbound_tx).await;
        })
    }

    /// Stop the Socket Mode loop; the open session is closed.
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
        self.stop_notify.notify_one();
    }

    /// Post a reply via chat.postMessage, threaded when `thread_ts` is set.
    pub async fn post_reply(&self, reply: &OutboundReply) -> Result<(), ChannelError> {
        let token = self
            .bot_token
            .as_deref()
            .ok_or_else(|| ChannelError::Send("slack bot token not configured".to_string()))?;
        let mut body = serde_json::json!({ "channel": reply.channel, "text": reply.text });
        if let Some(ref ts) = reply.thread_ts {
            body["thread_ts"] = serde_json::Value::String(ts.clone());
        }
        self.call("chat.postMessage", token, body)
            .await
            .map_err(|e| ChannelError::Send(format!("channel {}: {}", reply.channel, e)))?;
        log::debug!("slack: posted reply to {}", reply.channel);
        Ok(())
    }
}

async fn run_socket_mode_loop(
    channel: Arc<SlackChannel>,
    first_url: String,
    inbound_tx: mpsc::Sender<InboundEvent>,
) {
    let mut next_url = Some(first_url);
    while channel.running() {
        let url = match next_url.take() {
            Some(u) => u,
            None => match channel.open_socket_url().await {
                Ok(u) => u,
                Err(e) => {
                    log::warn!("slack: reopening socket mode failed: {}", e);
                    pause_before_reconnect(&channel).await;
                    continue;
                }
            },
        };
        match run_session(&channel, &url, &inbound_tx).await {
            Ok(SessionEnd::Reconnect) => {
                log::info!("slack: socket mode session ended, reconnecting");
                pause_before_reconnect(&channel).await;
            }
            Ok(SessionEnd::Stopped) => break,
            Ok(SessionEnd::InboundClosed) => {
                log::debug!("slack: inbound channel closed, stopping loop");
                return;
            }
            Err(e) => {
                log::warn!("slack socket mode error: {}", e);
                pause_before_reconnect(&channel).await;
            }
        }
    }
    log::info!("slack channel: socket mode loop stopped");
}

/// Wait [`RECONNECT_DELAY`] before the next session; returns early on stop.
async fn pause_before_reconnect(channel: &SlackChannel) {
    tokio::select! {
        _ = tokio::time::sleep(RECONNECT_DELAY) => {},
        _ = channel.stop_notify.notified() => {},
    }
}

/// One WebSocket session: ack every envelope, forward events, return on disconnect or stop.
async fn run_session(
    channel: &SlackChannel,
    url: &str,
    inbound_tx: &mpsc::Sender<InboundEvent>,
) -> Result<SessionEnd, ChannelError> {
    let (mut ws, _) = tokio_tungstenite::connect_async(url)
        .await
        .map_err(|e| ChannelError::Connection(e.to_string()))?;
    log::info!("slack: socket mode connected");

    loop {
        let frame = tokio::select! {
            frame = ws.next() => frame,
            _ = channel.stop_notify.notified() => {
                let _ = ws.close(None).await;
                return Ok(SessionEnd::Stopped);
            }
        };
        let Some(frame) = frame else {
            return Ok(SessionEnd::Reconnect);
        };
        let text = match frame.map_err(|e| ChannelError::Connection(e.to_string()))? {
            Message::Text(t) => t,
            Message::Close(_) => return Ok(SessionEnd::Reconnect),
            _ => continue,
        };
        let envelope: SocketEnvelope = match serde_json::from_str(&text) {
            Ok(env) => env,
            Err(e) => {
                log::debug!("slack: unreadable socket mode frame: {}", e);
                continue;
            }
        };
        if let Some(ack) = envelope.ack() {
            ws.send(Message::Text(ack))
                .await
                .map_err(|e| ChannelError::Connection(e.to_string()))?;
        }
        match envelope.kind.as_str() {
            "hello" => log::debug!("slack: socket mode hello"),
            "disconnect" => {
                log::info!(
                    "slack: disconnect requested ({})",
                    envelope.reason.as_deref().unwrap_or("no reason")
                );
                return Ok(SessionEnd::Reconnect);
            }
            "events_api" => {
                let Some(event) = envelope.payload.as_ref().and_then(inbound_from_payload) else {
                    continue;
                };
                log::debug!("slack: {:?} from {} in {}", event.kind, event.user, event.channel);
                if inbound_tx.send(event).await.is_err() {
                    return Ok(SessionEnd::InboundClosed);
                }
            }
            other => log::debug!("slack: ignoring {} envelope", other),
        }
    }
}

#[async_trait]
impl ReplySender for SlackChannel {
    fn id(&self) -> &str {
        &self.id
    }

    async fn post_reply(&self, reply: &OutboundReply) -> Result<(), ChannelError> {
        SlackChannel::post_reply(self, reply).await
    }
}

/// Resolve Slack Web API base URL (for tests or custom endpoints).
pub fn slack_api_base() -> String {
    std::env::var("SLACK_API_BASE").unwrap_or_else(|_| SLACK_API_BASE.to_string())
}
