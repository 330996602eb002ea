// ABOUTME: Slack RTM transport — rtm.connect handshake and the websocket event stream.
// ABOUTME: Implements ChatTransport over numbered JSON frames on the shared socket.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use crate::event::InboundEvent;
use crate::transport::ChatTransport;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

#[derive(Deserialize)]
struct RtmConnectResponse {
    ok: bool,
    #[serde(default)]
    error: String,
    #[serde(default)]
    url: String,
    #[serde(rename = "self", default)]
    bot: Option<RtmSelf>,
}

#[derive(Deserialize)]
struct RtmSelf {
    id: String,
}

#[derive(serde::Serialize)]
struct OutboundFrame<'a> {
    id: u64,
    #[serde(rename = "type")]
    kind: &'a str,
    channel: &'a str,
    text: &'a str,
}

/// Send half of the RTM connection. Frames carry a monotonically increasing
/// id as the protocol requires.
pub struct SlackTransport {
    sink: tokio::sync::Mutex<SplitSink<WsStream, WsMessage>>,
    counter: AtomicU64,
}

#[async_trait]
impl ChatTransport for SlackTransport {
    async fn send(&self, channel_id: &str, text: &str) -> Result<()> {
        let frame = OutboundFrame {
            id: self.counter.fetch_add(1, Ordering::Relaxed) + 1,
            kind: "message",
            channel: channel_id,
            text,
        };
        let json = serde_json::to_string(&frame)?;
        let mut sink = self.sink.lock().await;
        sink.send(WsMessage::Text(json.into()))
            .await
            .with_context(|| format!("failed to send message to channel {}", channel_id))?;
        Ok(())
    }
}

/// A live RTM connection: the bot's own id, the shared send half, and the
/// receive stream the main loop drains.
pub struct SlackConnection {
    pub bot_id: String,
    pub transport: Arc<SlackTransport>,
    reader: SplitStream<WsStream>,
}

impl SlackConnection {
    /// Perform the rtm.connect handshake and open the websocket.
    pub async fn connect(token: &str) -> Result<Self> {
        let resp: RtmConnectResponse = reqwest::Client::new()
            .get("https://slack.com/api/rtm.connect")
            .query(&[("token", token)])
            .send()
            .await
            .context("rtm.connect request failed")?
            .error_for_status()
            .context("rtm.connect returned an error status")?
            .json()
            .await
            .context("rtm.connect response was not valid JSON")?;

        if !resp.ok {
            bail!("rtm.connect rejected: {}", resp.error);
        }
        let bot_id = resp
            .bot
            .map(|b| b.id)
            .filter(|id| !id.is_empty())
            .context("rtm.connect response carried no bot id")?;

        let (socket, _) = connect_async(&resp.url)
            .await
            .context("failed to open RTM websocket")?;
        let (sink, reader) = socket.split();

        tracing::info!(bot_id = %bot_id, "Connected to Slack RTM");

        Ok(Self {
            bot_id,
            transport: Arc::new(SlackTransport {
                sink: tokio::sync::Mutex::new(sink),
                counter: AtomicU64::new(0),
            }),
            reader,
        })
    }

    /// Next inbound event. `Ok(None)` means the socket closed. Frames that
    /// don't decode are logged and skipped; the receive loop continues.
    pub async fn next_event(&mut self) -> Result<Option<InboundEvent>> {
        loop {
            let Some(frame) = self.reader.next().await else {
                return Ok(None);
            };
            match frame {
                Ok(WsMessage::Text(text)) => match serde_json::from_str::<InboundEvent>(&text) {
                    Ok(event) => return Ok(Some(event)),
                    Err(e) => {
                        tracing::debug!(error = %e, "Skipping undecodable RTM frame");
                    }
                },
                Ok(WsMessage::Close(_)) => return Ok(None),
                Ok(_) => {}
                Err(e) => {
                    // Receive faults are non-fatal; the loop keeps reading.
                    tracing::warn!(error = %e, "Error receiving RTM frame");
                }
            }
        }
    }
}
