use anyhow::{Context, Result};
use futures_util::{Sink, SinkExt, Stream, StreamExt};
use serde::Deserialize;
use serde_json::{Value, json};
use std::ops::ControlFlow;
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::sync::{Mutex, mpsc};
use tokio::time::{Instant, interval};
use tokio_tungstenite::tungstenite::{Error as WsError, Message};

use super::http_client::DiscordHttpClient;
use super::models::ApiMessage;
use super::types::{DEFAULT_HEARTBEAT_INTERVAL_MS, GatewayOpcode};
use crate::platform::ChannelMessage;

const FALLBACK_GATEWAY_URL: &str = "wss://gateway.discord.gg";

/// Session data kept across reconnects so the listener can resume.
#[derive(Debug)]
pub struct DiscordGatewayState {
    pub session_id: Mutex<Option<String>>,
    pub sequence: AtomicI64,
    pub resume_gateway_url: Mutex<Option<String>>,
}

impl Default for DiscordGatewayState {
    fn default() -> Self {
        Self {
            session_id: Mutex::new(None),
            sequence: AtomicI64::new(-1),
            resume_gateway_url: Mutex::new(None),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum GatewayEvent {
    Ready {
        session_id: String,
        resume_gateway_url: String,
        user_id: u64,
        guild_ids: Vec<u64>,
    },
    GuildCreate {
        guild_id: u64,
    },
    /// `unavailable` marks an outage rather than the bot leaving.
    GuildDelete {
        guild_id: u64,
        unavailable: bool,
    },
    MessageCreate(ChannelMessage),
}

/// Envelope shared by every gateway frame.
#[derive(Debug, Deserialize)]
struct GatewayPayload {
    op: u64,
    #[serde(default)]
    d: Value,
    #[serde(default)]
    s: Option<i64>,
    #[serde(default)]
    t: Option<String>,
}

impl GatewayPayload {
    fn opcode(&self) -> Option<GatewayOpcode> {
        GatewayOpcode::from_u64(self.op)
    }
}

/// Outstanding heartbeat bookkeeping for one session.
#[derive(Debug)]
struct HeartbeatTracker {
    interval: Duration,
    sent_at: Option<Instant>,
}

impl HeartbeatTracker {
    fn new(interval_ms: u64) -> Self {
        Self {
            interval: Duration::from_millis(interval_ms),
            sent_at: None,
        }
    }

    /// A new beat may only go out once the previous one was acknowledged.
    fn ready(&self) -> bool {
        self.sent_at.is_none()
    }

    fn sent(&mut self, at: Instant) {
        self.sent_at = Some(at);
    }

    fn acked(&mut self) {
        self.sent_at = None;
    }

    fn ack_deadline(&self) -> Option<Instant> {
        self.sent_at.map(|at| at + self.interval)
    }
}

/// Why a session stopped; the caller reconnects either way.
type SessionFlow = ControlFlow<&'static str>;

pub struct DiscordGateway {
    bot_token: String,
    intents: u64,
    state: Arc<DiscordGatewayState>,
    presence: Option<Value>,
}

impl DiscordGateway {
    pub fn new(
        bot_token: String,
        intents: u64,
        state: Arc<DiscordGatewayState>,
        presence: Option<Value>,
    ) -> Self {
        Self {
            bot_token,
            intents,
            state,
            presence,
        }
    }

    /// Run one gateway session. `Ok(())` means the session ended in a way
    /// that warrants reconnecting.
    pub async fn connect_and_listen(
        &self,
        http: &DiscordHttpClient,
        tx: &mpsc::Sender<GatewayEvent>,
    ) -> Result<()> {
        let url = gateway_ws_url(&self.resolve_gateway_url(http).await);
        let (socket, _) = tokio_tungstenite::connect_async(&url)
            .await
            .with_context(|| format!("connecting to gateway at {url}"))?;
        let (mut write, mut read) = socket.split();

        let interval_ms = await_hello(&mut read).await?;
        self.open_session(&mut write).await?;

        let mut ticker = interval(Duration::from_millis(interval_ms));
        let mut heartbeat = HeartbeatTracker::new(interval_ms);

        let reason = loop {
            let flow = tokio::select! {
                _ = ticker.tick() => {
                    if heartbeat.ready() {
                        self.send_heartbeat(&mut write).await?;
                        heartbeat.sent(Instant::now());
                        ControlFlow::Continue(())
                    } else {
                        ControlFlow::Break("previous heartbeat never acknowledged")
                    }
                }
                () = sleep_until_opt(heartbeat.ack_deadline()) => {
                    ControlFlow::Break("heartbeat ack timed out")
                }
                frame = read.next() => match frame {
                    None => ControlFlow::Break("socket closed"),
                    Some(frame) => {
                        let frame = frame.context("reading gateway frame")?;
                        self.on_frame(frame, tx, &mut write, &mut heartbeat).await?
                    }
                },
            };
            if let ControlFlow::Break(reason) = flow {
                break reason;
            }
        };

        tracing::warn!(reason, "Discord: gateway session ended");
        Ok(())
    }

    async fn resolve_gateway_url(&self, http: &DiscordHttpClient) -> String {
        if let Some(url) = self.state.resume_gateway_url.lock().await.clone()
            && !url.is_empty()
        {
            return url;
        }

        match http.get_gateway_bot().await {
            Ok(gateway) if !gateway.url.is_empty() => gateway.url,
            Ok(_) => FALLBACK_GATEWAY_URL.to_string(),
            Err(error) => {
                tracing::warn!(%error, "Discord: gateway lookup failed, using default URL");
                FALLBACK_GATEWAY_URL.to_string()
            }
        }
    }

    /// RESUME when a previous session exists, IDENTIFY otherwise.
    async fn open_session<W>(&self, write: &mut W) -> Result<()>
    where
        W: Sink<Message, Error = WsError> + Unpin,
    {
        let session_id = self.state.session_id.lock().await.clone();
        if let Some(session_id) = session_id {
            tracing::info!("Discord: resuming gateway session");
            let resume = json!({
                "token": self.bot_token,
                "session_id": session_id,
                "seq": self.state.sequence.load(Ordering::SeqCst),
            });
            return send_op(write, GatewayOpcode::Resume, resume).await;
        }

        let mut identify = json!({
            "token": self.bot_token,
            "intents": self.intents,
            "properties": {
                "os": std::env::consts::OS,
                "browser": "llm-guard",
                "device": "llm-guard",
            },
        });
        if let Some(presence) = &self.presence {
            identify["presence"] = presence.clone();
        }
        send_op(write, GatewayOpcode::Identify, identify).await
    }

    async fn send_heartbeat<W>(&self, write: &mut W) -> Result<()>
    where
        W: Sink<Message, Error = WsError> + Unpin,
    {
        let sequence = self.state.sequence.load(Ordering::SeqCst);
        let last_sequence = if sequence < 0 {
            Value::Null
        } else {
            json!(sequence)
        };
        send_op(write, GatewayOpcode::Heartbeat, last_sequence).await
    }

    async fn on_frame<W>(
        &self,
        frame: Message,
        tx: &mpsc::Sender<GatewayEvent>,
        write: &mut W,
        heartbeat: &mut HeartbeatTracker,
    ) -> Result<SessionFlow>
    where
        W: Sink<Message, Error = WsError> + Unpin,
    {
        let Some(payload) = decode_frame(frame)? else {
            return Ok(ControlFlow::Continue(()));
        };
        if let Some(sequence) = payload.s {
            self.state.sequence.store(sequence, Ordering::SeqCst);
        }

        match payload.opcode() {
            // Server-requested beats bypass the ack gate.
            Some(GatewayOpcode::Heartbeat) => {
                self.send_heartbeat(write).await?;
            }
            Some(GatewayOpcode::HeartbeatAck) => heartbeat.acked(),
            Some(GatewayOpcode::Reconnect) => {
                return Ok(ControlFlow::Break("server requested reconnect"));
            }
            Some(GatewayOpcode::InvalidSession) => {
                let resumable = payload.d.as_bool().unwrap_or(false);
                self.invalidate_session(resumable).await;
                return Ok(ControlFlow::Break("invalid session"));
            }
            Some(GatewayOpcode::Dispatch) => {
                let event_type = payload.t.as_deref().unwrap_or_default();
                if let Some(event) = parse_dispatch_event(event_type, &payload.d) {
                    self.remember_session(&event).await;
                    tx.send(event)
                        .await
                        .context("gateway event receiver dropped")?;
                }
            }
            _ => {}
        }
        Ok(ControlFlow::Continue(()))
    }

    async fn remember_session(&self, event: &GatewayEvent) {
        if let GatewayEvent::Ready {
            session_id,
            resume_gateway_url,
            ..
        } = event
        {
            *self.state.session_id.lock().await = Some(session_id.clone());
            *self.state.resume_gateway_url.lock().await = Some(resume_gateway_url.clone());
        }
    }

    async fn invalidate_session(&self, resumable: bool) {
        self.state.sequence.store(-1, Ordering::SeqCst);
        *self.state.session_id.lock().await = None;

        if resumable {
            let wait_secs = invalid_session_backoff_secs();
            tracing::warn!(wait_secs, "Discord: invalid session, re-identifying after delay");
            tokio::time::sleep(Duration::from_secs(wait_secs)).await;
        } else {
            tracing::warn!("Discord: invalid session, dropping resume URL");
            *self.state.resume_gateway_url.lock().await = None;
        }
    }
}

async fn send_op<W>(write: &mut W, op: GatewayOpcode, data: Value) -> Result<()>
where
    W: Sink<Message, Error = WsError> + Unpin,
{
    let frame = json!({ "op": op as u8, "d": data }).to_string();
    write
        .send(Message::Text(frame.into()))
        .await
        .with_context(|| format!("sending gateway {op:?}"))
}

/// Text or UTF-8 binary frames as a payload; control frames yield `None`.
fn decode_frame(frame: Message) -> Result<Option<GatewayPayload>> {
    let raw = match frame {
        Message::Text(text) => text.to_string(),
        Message::Binary(bytes) => match String::from_utf8(bytes.to_vec()) {
            Ok(raw) => raw,
            Err(_) => return Ok(None),
        },
        _ => return Ok(None),
    };
    serde_json::from_str(&raw)
        .map(Some)
        .context("decoding gateway payload")
}

fn snowflake_field(d: &Value, key: &str) -> Option<u64> {
    match d.get(key)? {
        Value::String(s) => s.parse().ok(),
        value => value.as_u64(),
    }
}

pub fn parse_dispatch_event(event_type: &str, d: &Value) -> Option<GatewayEvent> {
    match event_type {
        "READY" => parse_ready_event(d),
        "GUILD_CREATE" => Some(GatewayEvent::GuildCreate {
            guild_id: snowflake_field(d, "id")?,
        }),
        "GUILD_DELETE" => Some(GatewayEvent::GuildDelete {
            guild_id: snowflake_field(d, "id")?,
            unavailable: d
                .get("unavailable")
                .and_then(Value::as_bool)
                .unwrap_or(false),
        }),
        "MESSAGE_CREATE" => match serde_json::from_value::<ApiMessage>(d.clone()) {
            Ok(message) => Some(GatewayEvent::MessageCreate(message.into())),
            Err(error) => {
                tracing::debug!(%error, "skipping undecodable MESSAGE_CREATE");
                None
            }
        },
        "RESUMED" => {
            tracing::info!("Discord gateway session resumed");
            None
        }
        _ => None,
    }
}

fn parse_ready_event(d: &Value) -> Option<GatewayEvent> {
    let session_id = d.get("session_id")?.as_str()?.to_string();
    let resume_gateway_url = d.get("resume_gateway_url")?.as_str()?.to_string();
    let user_id = snowflake_field(d.get("user")?, "id")?;
    let guild_ids = d
        .get("guilds")
        .and_then(Value::as_array)
        .map(|guilds| {
            guilds
                .iter()
                .filter_map(|guild| snowflake_field(guild, "id"))
                .collect()
        })
        .unwrap_or_default();

    Some(GatewayEvent::Ready {
        session_id,
        resume_gateway_url,
        user_id,
        guild_ids,
    })
}

async fn sleep_until_opt(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => futures_util::future::pending::<()>().await,
    }
}

async fn await_hello<R>(read: &mut R) -> Result<u64>
where
    R: Stream<Item = std::result::Result<Message, WsError>> + Unpin,
{
    while let Some(frame) = read.next().await {
        let frame = frame.context("reading gateway hello")?;
        if let Some(payload) = decode_frame(frame)?
            && payload.opcode() == Some(GatewayOpcode::Hello)
        {
            return Ok(payload
                .d
                .get("heartbeat_interval")
                .and_then(Value::as_u64)
                .unwrap_or(DEFAULT_HEARTBEAT_INTERVAL_MS));
        }
    }
    anyhow::bail!("gateway closed before hello")
}

fn gateway_ws_url(base_url: &str) -> String {
    format!("{}/?v=10&encoding=json", base_url.trim_end_matches('/'))
}

/// Discord asks for a random 1-5 s wait before re-identifying.
fn invalid_session_backoff_secs() -> u64 {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|duration| duration.subsec_nanos())
        .unwrap_or(0);
    1 + u64::from(nanos % 5)
}
