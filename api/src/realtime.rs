//! Chat inserts pushed from the hosted store's realtime websocket.
//!
//! One [`ChatSubscription`] is one channel (`realtime:chat-<sport>`) listening
//! for `INSERT` on `chat_messages` filtered to that sport. The socket task
//! heartbeats, reconnects after a short pause, and stops when the handle is
//! dropped.
use crate::ChatMessage;
use futures_util::{SinkExt, StreamExt};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Duration, interval, sleep};
use tokio_tungstenite::{connect_async, tungstenite::Message};

pub const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);
pub const RECONNECT_DELAY: Duration = Duration::from_secs(2);
const CHAT_TABLE: &str = "chat_messages";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RealtimeConfig {
    /// Full websocket URL including `apikey` and `vsn` query parameters.
    pub url: String,
    pub api_key: String,
    pub access_token: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ChatEvent {
    Connected,
    Disconnected,
    Message(ChatMessage),
    Error(String),
}

/// Live feed of one sport's chat. Dropping it stops the background task.
#[derive(Debug)]
pub struct ChatSubscription {
    sport_id: String,
    events: mpsc::Receiver<ChatEvent>,
    task: JoinHandle<()>,
}

impl ChatSubscription {
    pub fn open(config: RealtimeConfig, sport_id: String) -> Self {
        let (tx, rx) = mpsc::channel(64);
        let task = tokio::spawn(run_channel(config, sport_id.clone(), tx));
        Self::from_parts(sport_id, rx, task)
    }

    pub(crate) fn from_parts(
        sport_id: String,
        events: mpsc::Receiver<ChatEvent>,
        task: JoinHandle<()>,
    ) -> Self {
        Self { sport_id, events, task }
    }

    pub fn sport_id(&self) -> &str {
        &self.sport_id
    }

    /// Next event in arrival order; `None` once the task has ended.
    pub async fn recv(&mut self) -> Option<ChatEvent> {
        self.events.recv().await
    }
}

impl Drop for ChatSubscription {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Phoenix channel frame as exchanged with the realtime server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RealtimeFrame {
    pub topic: String,
    pub event: String,
    #[serde(default)]
    pub payload: Value,
    #[serde(rename = "ref", default)]
    pub reference: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FrameEvent {
    Joined,
    Rejected(String),
    Insert(ChatMessage),
    Closed,
    Ignored,
}

pub fn channel_topic(sport_id: &str) -> String {
    format!("realtime:chat-{sport_id}")
}

pub fn join_frame(sport_id: &str, access_token: &str, reference: u64) -> RealtimeFrame {
    RealtimeFrame {
        topic: channel_topic(sport_id),
        event: "phx_join".to_string(),
        payload: json!({
            "config": {
                "broadcast": { "self": false },
                "presence": { "key": "" },
                "postgres_changes": [{
                    "event": "INSERT",
                    "schema": "public",
                    "table": CHAT_TABLE,
                    "filter": format!("sport_id=eq.{sport_id}"),
                }],
            },
            "access_token": access_token,
        }),
        reference: Some(reference.to_string()),
    }
}

pub fn heartbeat_frame(reference: u64) -> RealtimeFrame {
    RealtimeFrame {
        topic: "phoenix".to_string(),
        event: "heartbeat".to_string(),
        payload: json!({}),
        reference: Some(reference.to_string()),
    }
}

/// Classify an incoming text frame. Anything unparseable or unrelated to
/// chat inserts is `Ignored`.
pub fn decode_frame(text: &str) -> FrameEvent {
    let Ok(frame) = serde_json::from_str::<RealtimeFrame>(text) else {
        return FrameEvent::Ignored;
    };
    if frame.topic == "phoenix" {
        return FrameEvent::Ignored;
    }

    match frame.event.as_str() {
        "phx_reply" => match frame.payload.get("status").and_then(Value::as_str) {
            Some("ok") => FrameEvent::Joined,
            Some(_) => FrameEvent::Rejected(
                frame
                    .payload
                    .pointer("/response/reason")
                    .and_then(Value::as_str)
                    .unwrap_or("join rejected")
                    .to_string(),
            ),
            None => FrameEvent::Ignored,
        },
        "postgres_changes" => frame
            .payload
            .pointer("/data/record")
            .and_then(record_to_message)
            .map_or(FrameEvent::Ignored, FrameEvent::Insert),
        // Older servers push the row directly under the change type.
        "INSERT" => frame
            .payload
            .get("record")
            .and_then(record_to_message)
            .map_or(FrameEvent::Ignored, FrameEvent::Insert),
        "phx_close" | "phx_error" => FrameEvent::Closed,
        _ => FrameEvent::Ignored,
    }
}

fn record_to_message(record: &Value) -> Option<ChatMessage> {
    serde_json::from_value(record.clone()).ok()
}

async fn emit(events: &mpsc::Sender<ChatEvent>, event: ChatEvent) -> bool {
    events.send(event).await.is_ok()
}

async fn send_frame<S>(write: &mut S, frame: &RealtimeFrame) -> Result<(), String>
where
    S: futures_util::sink::Sink<Message, Error = tokio_tungstenite::tungstenite::Error> + Unpin,
{
    let text = serde_json::to_string(frame).map_err(|e| e.to_string())?;
    write
        .send(Message::Text(text.into()))
        .await
        .map_err(|e| e.to_string())
}

async fn run_channel(config: RealtimeConfig, sport_id: String, events: mpsc::Sender<ChatEvent>) {
    let mut reference: u64 = 0;
    loop {
        match connect_async(config.url.as_str()).await {
            Ok((stream, _)) => {
                debug!("realtime connected for {sport_id}");
                let (mut write, mut read) = stream.split();

                reference += 1;
                let join = join_frame(&sport_id, &config.access_token, reference);
                if let Err(e) = send_frame(&mut write, &join).await {
                    if !emit(&events, ChatEvent::Error(format!("chat join failed: {e}"))).await {
                        return;
                    }
                } else {
                    let mut heartbeat = interval(HEARTBEAT_INTERVAL);
                    heartbeat.tick().await;

                    loop {
                        tokio::select! {
                            _ = heartbeat.tick() => {
                                reference += 1;
                                if let Err(e) = send_frame(&mut write, &heartbeat_frame(reference)).await {
                                    warn!("realtime heartbeat failed: {e}");
                                    break;
                                }
                            }
                            inbound = read.next() => {
                                match inbound {
                                    Some(Ok(Message::Text(text))) => {
                                        let event = match decode_frame(text.as_str()) {
                                            FrameEvent::Joined => Some(ChatEvent::Connected),
                                            FrameEvent::Insert(msg) if msg.sport_id == sport_id => {
                                                Some(ChatEvent::Message(msg))
                                            }
                                            FrameEvent::Rejected(reason) => {
                                                Some(ChatEvent::Error(format!("chat join rejected: {reason}")))
                                            }
                                            FrameEvent::Closed => break,
                                            FrameEvent::Insert(_) | FrameEvent::Ignored => None,
                                        };
                                        if let Some(event) = event
                                            && !emit(&events, event).await
                                        {
                                            return;
                                        }
                                    }
                                    Some(Ok(Message::Close(_))) | None => break,
                                    Some(Ok(_)) => {}
                                    Some(Err(e)) => {
                                        if !emit(&events, ChatEvent::Error(format!("chat read failed: {e}"))).await {
                                            return;
                                        }
                                        break;
                                    }
                                }
                            }
                            _ = events.closed() => return,
                        }
                    }
                }
            }
            Err(e) => {
                if !emit(&events, ChatEvent::Error(format!("chat connect failed: {e}"))).await {
                    return;
                }
            }
        }

        if !emit(&events, ChatEvent::Disconnected).await {
            return;
        }
        sleep(RECONNECT_DELAY).await;
    }
}
