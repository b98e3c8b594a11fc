use std::collections::VecDeque;

use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{debug, warn};
use uuid::Uuid;

use lostfound_types::events::{GatewayCommand, GatewayEvent};
use lostfound_types::models::Message;

use crate::error::{ClientError, ClientResult};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Live gateway connection. A background task decodes incoming frames;
/// pings are answered by the socket itself.
pub struct LiveClient {
    sink: SplitSink<WsStream, WsMessage>,
    events: mpsc::UnboundedReceiver<GatewayEvent>,
    pending: VecDeque<GatewayEvent>,
    reader: JoinHandle<()>,
}

impl LiveClient {
    /// Open `/gateway` on the server at `base_url` (http or https).
    pub async fn connect(base_url: &str, token: &str) -> ClientResult<Self> {
        let ws_url = gateway_url(base_url, token)?;
        let (stream, _) = tokio_tungstenite::connect_async(ws_url.as_str()).await?;
        let (sink, mut stream) = stream.split();

        let (tx, events) = mpsc::unbounded_channel();
        let reader = tokio::spawn(async move {
            while let Some(frame) = stream.next().await {
                match frame {
                    Ok(WsMessage::Text(text)) => match serde_json::from_str::<GatewayEvent>(&text) {
                        Ok(event) => {
                            if tx.send(event).is_err() {
                                break;
                            }
                        }
                        Err(e) => warn!("Undecodable gateway event: {}", e),
                    },
                    Ok(WsMessage::Close(_)) => break,
                    Ok(_) => {}
                    Err(e) => {
                        warn!("Gateway read error: {}", e);
                        break;
                    }
                }
            }
            debug!("Gateway reader finished");
        });

        Ok(Self {
            sink,
            events,
            pending: VecDeque::new(),
            reader,
        })
    }

    /// Bind this connection to `user_id` and wait for the server's
    /// acknowledgement. The server never acknowledges an id other than the
    /// token's own; wrap in a timeout if that can happen.
    pub async fn register(&mut self, user_id: Uuid) -> ClientResult<()> {
        self.command(&GatewayCommand::Register(user_id)).await?;

        loop {
            match self.events.recv().await {
                Some(GatewayEvent::Registered(id)) if id == user_id => return Ok(()),
                Some(other) => self.pending.push_back(other),
                None => return Err(ClientError::Closed),
            }
        }
    }

    /// Ask the relay to push `message` to its recipient. Best effort: there
    /// is no acknowledgement and offline recipients are skipped.
    pub async fn send_message(&mut self, message: &Message) -> ClientResult<()> {
        self.command(&GatewayCommand::SendMessage(message.clone())).await
    }

    /// Next event from the server; `None` once the connection is gone.
    pub async fn next_event(&mut self) -> Option<GatewayEvent> {
        match self.pending.pop_front() {
            Some(event) => Some(event),
            None => self.events.recv().await,
        }
    }

    /// Next pushed message, skipping other events.
    pub async fn next_message(&mut self) -> Option<Message> {
        while let Some(event) = self.next_event().await {
            if let GatewayEvent::ReceiveMessage(message) = event {
                return Some(message);
            }
        }
        None
    }

    pub async fn close(mut self) -> ClientResult<()> {
        self.sink.close().await?;
        Ok(())
    }

    async fn command(&mut self, command: &GatewayCommand) -> ClientResult<()> {
        let json = serde_json::to_string(command)?;
        self.sink.send(WsMessage::Text(json.into())).await?;
        Ok(())
    }
}

impl Drop for LiveClient {
    fn drop(&mut self) {
        self.reader.abort();
    }
}

fn gateway_url(base_url: &str, token: &str) -> ClientResult<String> {
    let base = base_url.trim_end_matches('/');
    let ws_base = if let Some(rest) = base.strip_prefix("https://") {
        format!("wss://{}", rest)
    } else if let Some(rest) = base.strip_prefix("http://") {
        format!("ws://{}", rest)
    } else {
        return Err(ClientError::InvalidUrl(base_url.to_string()));
    };
    Ok(format!("{}/gateway?token={}", ws_base, token))
}
