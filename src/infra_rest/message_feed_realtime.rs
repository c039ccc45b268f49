use super::client::RestClient;
use crate::application_port::*;
use crate::domain_model::*;
use crate::domain_port::*;
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::mpsc::{self, Receiver, Sender};
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(25);
const JOIN_TIMEOUT: Duration = Duration::from_secs(10);
const FEED_CAP: usize = 256;

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

pub fn topic_for(chat_id: ChatId) -> String {
    format!("realtime:chat:{chat_id}")
}

/// Phoenix channel frame as spoken by the realtime endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhoenixFrame {
    pub topic: String,
    pub event: String,
    #[serde(default)]
    pub payload: Value,
    #[serde(rename = "ref", default)]
    pub reference: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub join_ref: Option<String>,
}

impl PhoenixFrame {
    pub fn join(chat_id: ChatId, access_token: &str, reference: &str) -> Self {
        Self {
            topic: topic_for(chat_id),
            event: "phx_join".to_owned(),
            payload: json!({
                "config": {
                    "broadcast": { "ack": false, "self": false },
                    "presence": { "key": "" },
                    "postgres_changes": [{
                        "event": "INSERT",
                        "schema": "public",
                        "table": "messages",
                        "filter": format!("chat_id=eq.{chat_id}"),
                    }],
                },
                "access_token": access_token,
            }),
            reference: Some(reference.to_owned()),
            join_ref: Some(reference.to_owned()),
        }
    }

    pub fn heartbeat(reference: &str) -> Self {
        Self {
            topic: "phoenix".to_owned(),
            event: "heartbeat".to_owned(),
            payload: json!({}),
            reference: Some(reference.to_owned()),
            join_ref: None,
        }
    }

    pub fn leave(chat_id: ChatId, reference: &str) -> Self {
        Self {
            topic: topic_for(chat_id),
            event: "phx_leave".to_owned(),
            payload: json!({}),
            reference: Some(reference.to_owned()),
            join_ref: None,
        }
    }

    pub fn encode(&self) -> Result<String, GatewayError> {
        serde_json::to_string(self).map_err(|e| GatewayError::Decode(e.to_string()))
    }

    pub fn decode(text: &str) -> Result<Self, GatewayError> {
        serde_json::from_str(text).map_err(|e| GatewayError::Decode(e.to_string()))
    }

    /// `Some("ok")` / `Some("error")` for a `phx_reply`, `None` otherwise.
    pub fn reply_status(&self) -> Option<&str> {
        if self.event != "phx_reply" {
            return None;
        }
        self.payload.get("status").and_then(Value::as_str)
    }

    pub fn is_close(&self) -> bool {
        self.event == "phx_close" || self.event == "phx_error"
    }

    /// The new row of a `postgres_changes` INSERT, `None` for any other frame.
    pub fn inserted_message(&self) -> Option<Result<Message, GatewayError>> {
        if self.event != "postgres_changes" {
            return None;
        }
        let data = self.payload.get("data")?;
        if data.get("type").and_then(Value::as_str) != Some("INSERT") {
            return None;
        }
        let record = data.get("record")?.clone();
        Some(serde_json::from_value(record).map_err(|e| GatewayError::Decode(e.to_string())))
    }

    fn rejection(&self) -> GatewayError {
        let reason = self
            .payload
            .pointer("/response/reason")
            .and_then(Value::as_str)
            .unwrap_or("join refused");
        ApiFault::new(400, format!("realtime join on {}: {reason}", self.topic)).into()
    }
}

pub struct RealtimeMessageFeed {
    client: RestClient,
}

impl RealtimeMessageFeed {
    pub fn new(client: RestClient) -> Self {
        Self { client }
    }
}

#[async_trait::async_trait]
impl MessageFeed for RealtimeMessageFeed {
    async fn open(
        &self,
        chat_id: ChatId,
        cancel: CancellationToken,
    ) -> Result<Receiver<Message>, GatewayError> {
        let url = self.client.realtime_url()?;
        let (mut socket, _) = connect_async(url.as_str())
            .await
            .map_err(|e| GatewayError::Transport(format!("connect realtime: {e}")))?;

        let join = PhoenixFrame::join(chat_id, self.client.bearer(), "1");
        send_frame(&mut socket, &join).await?;
        tokio::time::timeout(JOIN_TIMEOUT, await_join_reply(&mut socket, &join.topic))
            .await
            .map_err(|_| GatewayError::Transport(format!("timed out joining {}", join.topic)))??;
        debug!("joined realtime channel {}", join.topic);

        let (sender, receiver) = mpsc::channel(FEED_CAP);
        tokio::spawn(pump(socket, chat_id, sender, cancel));
        Ok(receiver)
    }
}

async fn send_frame(socket: &mut Socket, frame: &PhoenixFrame) -> Result<(), GatewayError> {
    socket
        .send(WsMessage::Text(frame.encode()?))
        .await
        .map_err(|e| GatewayError::Transport(format!("send {}: {e}", frame.event)))
}

async fn await_join_reply(socket: &mut Socket, topic: &str) -> Result<(), GatewayError> {
    while let Some(incoming) = socket.next().await {
        let incoming = incoming.map_err(|e| GatewayError::Transport(e.to_string()))?;
        let WsMessage::Text(text) = incoming else {
            continue;
        };
        let frame = PhoenixFrame::decode(&text)?;
        if frame.topic != topic {
            continue;
        }
        match frame.reply_status() {
            Some("ok") => return Ok(()),
            Some(_) => return Err(frame.rejection()),
            None => continue,
        }
    }
    Err(GatewayError::Transport(
        "realtime socket closed before join reply".into(),
    ))
}

async fn leave(socket: &mut Socket, chat_id: ChatId, reference: &str) {
    if let Err(e) = send_frame(socket, &PhoenixFrame::leave(chat_id, reference)).await {
        debug!("leave frame not sent: {e}");
    }
    if let Err(e) = socket.close(None).await {
        debug!("realtime close: {e}");
    }
}

async fn pump(
    mut socket: Socket,
    chat_id: ChatId,
    sender: Sender<Message>,
    cancel: CancellationToken,
) {
    let topic = topic_for(chat_id);
    let mut heartbeat = tokio::time::interval(HEARTBEAT_INTERVAL);
    heartbeat.tick().await;
    let mut next_ref: u64 = 2;

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                leave(&mut socket, chat_id, &next_ref.to_string()).await;
                break;
            }
            _ = sender.closed() => {
                leave(&mut socket, chat_id, &next_ref.to_string()).await;
                break;
            }
            _ = heartbeat.tick() => {
                let frame = PhoenixFrame::heartbeat(&next_ref.to_string());
                next_ref += 1;
                if let Err(e) = send_frame(&mut socket, &frame).await {
                    warn!("realtime heartbeat on {topic} failed: {e}");
                    break;
                }
            }
            incoming = socket.next() => match incoming {
                Some(Ok(WsMessage::Text(text))) => {
                    let frame = match PhoenixFrame::decode(&text) {
                        Ok(frame) if frame.topic == topic => frame,
                        Ok(_) => continue,
                        Err(e) => {
                            warn!("unreadable realtime frame on {topic}: {e}");
                            continue;
                        }
                    };
                    if frame.is_close() {
                        debug!("realtime channel {topic} closed by gateway");
                        break;
                    }
                    match frame.inserted_message() {
                        Some(Ok(message)) => {
                            if sender.send(message).await.is_err() {
                                break;
                            }
                        }
                        Some(Err(e)) => warn!("unreadable insert on {topic}: {e}"),
                        None => {}
                    }
                }
                Some(Ok(WsMessage::Close(_))) | None => {
                    debug!("realtime socket for {topic} closed");
                    break;
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    warn!("realtime socket for {topic} failed: {e}");
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chat() -> ChatId {
        ChatId(uuid::Uuid::from_u128(7))
    }

    #[test]
    fn join_frame_scopes_inserts_to_one_chat() {
        let frame = PhoenixFrame::join(chat(), "token", "1");
        let text = frame.encode().unwrap();
        let value: Value = serde_json::from_str(&text).unwrap();

        assert_eq!(value["topic"], format!("realtime:chat:{}", chat()));
        assert_eq!(value["event"], "phx_join");
        assert_eq!(value["ref"], "1");
        let change = &value["payload"]["config"]["postgres_changes"][0];
        assert_eq!(change["event"], "INSERT");
        assert_eq!(change["table"], "messages");
        assert_eq!(change["filter"], format!("chat_id=eq.{}", chat()));
        assert_eq!(value["payload"]["access_token"], "token");
    }

    #[test]
    fn reads_join_replies() {
        let ok = PhoenixFrame::decode(
            r#"{"topic":"realtime:chat:x","event":"phx_reply","payload":{"status":"ok","response":{}},"ref":"1"}"#,
        )
        .unwrap();
        assert_eq!(ok.reply_status(), Some("ok"));

        let refused = PhoenixFrame::decode(
            r#"{"topic":"realtime:chat:x","event":"phx_reply","payload":{"status":"error","response":{"reason":"unauthorized"}},"ref":"1"}"#,
        )
        .unwrap();
        assert_eq!(refused.reply_status(), Some("error"));
        assert!(refused.rejection().to_string().contains("unauthorized"));
    }

    #[test]
    fn extracts_inserted_message() {
        let text = format!(
            r#"{{"topic":"realtime:chat:{chat}","event":"postgres_changes","ref":null,"payload":{{
                "ids":[1],
                "data":{{
                    "type":"INSERT","schema":"public","table":"messages",
                    "commit_timestamp":"2024-05-01T10:00:00Z",
                    "record":{{
                        "id":"00000000-0000-0000-0000-0000000000aa",
                        "chat_id":"{chat}",
                        "sender_id":"00000000-0000-0000-0000-000000000001",
                        "content":"hi",
                        "file_url":null,
                        "created_at":"2024-05-01T10:00:00.123456+00:00",
                        "is_edited":false,
                        "reply_to_id":null
                    }}
                }}
            }}}}"#,
            chat = chat()
        );
        let frame = PhoenixFrame::decode(&text).unwrap();
        let message = frame.inserted_message().unwrap().unwrap();

        assert_eq!(message.content, "hi");
        assert_eq!(message.chat_id, chat());
        assert_eq!(message.sender, None);
    }

    #[test]
    fn ignores_other_frames() {
        let presence = PhoenixFrame::decode(
            r#"{"topic":"realtime:chat:x","event":"presence_state","payload":{},"ref":null}"#,
        )
        .unwrap();
        assert!(presence.inserted_message().is_none());

        let update = PhoenixFrame::decode(
            r#"{"topic":"realtime:chat:x","event":"postgres_changes","payload":{"data":{"type":"UPDATE","record":{}}},"ref":null}"#,
        )
        .unwrap();
        assert!(update.inserted_message().is_none());
    }

    #[test]
    fn heartbeat_uses_phoenix_topic() {
        let frame = PhoenixFrame::heartbeat("5");
        assert_eq!(frame.topic, "phoenix");
        assert_eq!(frame.reference.as_deref(), Some("5"));
        assert!(!frame.encode().unwrap().contains("join_ref"));
    }
}
