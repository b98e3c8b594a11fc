use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use bytes::Bytes;
use futures_util::{SinkExt, StreamExt};
use tracing::{debug, info, warn};
use uuid::Uuid;

use lostfound_types::events::{GatewayCommand, GatewayEvent};

use crate::relay::{Relay, RelayConnection};

/// Heartbeat interval: server sends a Ping every 15 seconds.
/// If 2 consecutive Pongs are missed (~30s), the socket is closed and the
/// normal disconnect path runs.
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(15);

/// Drive one gateway WebSocket. The bearer token was already validated at
/// the HTTP upgrade, so `user_id` is the only identity this socket may
/// register as.
pub async fn handle_connection(socket: WebSocket, relay: Relay, user_id: Uuid, name: String) {
    let (mut sender, mut receiver) = socket.split();
    let (mut conn, mut outbound_rx) = relay.on_connect();

    info!("{} ({}) opened gateway connection {}", name, user_id, conn.id());

    let pong_received = Arc::new(AtomicBool::new(true));
    let pong_flag_send = pong_received.clone();

    // Forward queued events -> client, with heartbeat
    let mut send_task = tokio::spawn(async move {
        let mut heartbeat = tokio::time::interval(HEARTBEAT_INTERVAL);
        heartbeat.tick().await;
        let mut missed_heartbeats: u8 = 0;

        loop {
            tokio::select! {
                event = outbound_rx.recv() => {
                    let Some(event) = event else { break };
                    let text = match serde_json::to_string(&event) {
                        Ok(text) => text,
                        Err(e) => {
                            warn!("Failed to encode gateway event: {}", e);
                            continue;
                        }
                    };
                    if sender.send(Message::Text(text.into())).await.is_err() {
                        break;
                    }
                }
                _ = heartbeat.tick() => {
                    if pong_flag_send.swap(false, Ordering::Acquire) {
                        missed_heartbeats = 0;
                    } else {
                        missed_heartbeats += 1;
                        if missed_heartbeats >= 2 {
                            warn!("Heartbeat timeout (missed {} pongs), dropping connection", missed_heartbeats);
                            break;
                        }
                    }
                    if sender.send(Message::Ping(Bytes::new())).await.is_err() {
                        break;
                    }
                }
            }
        }

        let _ = sender.close().await;
    });

    // Read commands from client until either side ends
    loop {
        tokio::select! {
            _ = &mut send_task => break,
            frame = receiver.next() => {
                let Some(Ok(frame)) = frame else { break };
                match frame {
                    Message::Text(text) => {
                        match serde_json::from_str::<GatewayCommand>(&text) {
                            Ok(cmd) => {
                                handle_command(&relay, &mut conn, user_id, &name, cmd).await;
                            }
                            Err(e) => {
                                warn!(
                                    "{} ({}) bad command: {} -- raw: {}",
                                    name,
                                    user_id,
                                    e,
                                    truncate(&text, 200)
                                );
                            }
                        }
                    }
                    Message::Pong(_) => {
                        pong_received.store(true, Ordering::Release);
                    }
                    Message::Close(_) => break,
                    _ => {}
                }
            }
        }
    }

    send_task.abort();
    relay.on_disconnect(&mut conn).await;
    info!("{} ({}) closed gateway connection {}", name, user_id, conn.id());
}

async fn handle_command(
    relay: &Relay,
    conn: &mut RelayConnection,
    user_id: Uuid,
    name: &str,
    cmd: GatewayCommand,
) {
    match cmd {
        GatewayCommand::Register(requested) => {
            if requested != user_id {
                warn!(
                    "{} ({}) tried to register as {}, ignoring",
                    name, user_id, requested
                );
                return;
            }
            if relay.on_register(conn, user_id).await {
                conn.reply(GatewayEvent::Registered(user_id));
            }
        }

        GatewayCommand::SendMessage(message) => {
            if message.sender.id != user_id {
                warn!(
                    "{} ({}) tried to push message {} as sender {}, dropping",
                    name, user_id, message.id, message.sender.id
                );
                return;
            }
            debug!(
                "{} ({}) -> message {} for {}",
                name, user_id, message.id, message.recipient.id
            );
            relay.on_send(conn, message).await;
        }
    }
}

fn truncate(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
