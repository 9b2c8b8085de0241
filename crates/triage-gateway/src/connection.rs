use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use futures_util::{SinkExt, StreamExt};
use tracing::{info, warn};
use uuid::Uuid;

use triage_types::api::Claims;
use triage_types::events::{GatewayCommand, GatewayEvent};

use crate::dispatcher::Dispatcher;

/// Heartbeat interval: server sends a Ping every 15 seconds.
/// If 2 consecutive Pongs are missed (~30s), the connection is dropped.
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(15);

/// Handle a single WebSocket connection. The client must open with an
/// Identify command carrying its JWT, then Subscribe to the tickets it
/// is viewing; the server pushes matching events until either side
/// closes. This is the replacement for the old fixed-interval polling.
pub async fn handle_connection(socket: WebSocket, dispatcher: Dispatcher, jwt_secret: String) {
    let (mut sender, mut receiver) = socket.split();

    // Step 1: Wait for Identify command with JWT
    let claims = match wait_for_identify(&mut receiver, &jwt_secret).await {
        Some(claims) => claims,
        None => {
            warn!("WebSocket client failed to identify, closing");
            return;
        }
    };

    let user_id = claims.sub;
    let is_admin = claims.role.is_admin();

    info!("{} ({}) connected to gateway", claims.name, user_id);

    // Step 2: Send Ready event
    let ready = GatewayEvent::Ready {
        user_id,
        name: claims.name.clone(),
        role: claims.role,
    };
    let Ok(text) = serde_json::to_string(&ready) else {
        return;
    };
    if sender.send(Message::Text(text.into())).await.is_err() {
        return;
    }

    // Subscribe to the event stream and relay to this client
    let mut broadcast_rx = dispatcher.subscribe();

    // Per-connection ticket subscriptions (shared between send and recv tasks).
    let subscribed_tickets: Arc<std::sync::RwLock<HashSet<Uuid>>> =
        Arc::new(std::sync::RwLock::new(HashSet::new()));
    let send_subscriptions = subscribed_tickets.clone();

    // Shared flag for heartbeat
    let pong_received = Arc::new(AtomicBool::new(true));
    let pong_flag_send = pong_received.clone();
    let pong_flag_recv = pong_received.clone();

    // Forward events -> client, with heartbeat
    let mut send_task = tokio::spawn(async move {
        let mut heartbeat = tokio::time::interval(HEARTBEAT_INTERVAL);
        heartbeat.tick().await;
        let mut missed_heartbeats: u8 = 0;

        loop {
            tokio::select! {
                result = broadcast_rx.recv() => {
                    let event = match result {
                        Ok(event) => event,
                        Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                            warn!("Broadcast receiver lagged by {} events", n);
                            continue;
                        }
                        Err(_) => break,
                    };

                    // Same ownership rule as reads: strangers never see
                    // events for a ticket they don't own.
                    if !event.visible_to(user_id, is_admin) {
                        continue;
                    }

                    if let Some(ticket_id) = event.ticket_id() {
                        let subs = match send_subscriptions.read() {
                            Ok(subs) => subs,
                            Err(_) => break,
                        };
                        if !subs.contains(&ticket_id) {
                            continue;
                        }
                    }

                    let Ok(text) = serde_json::to_string(&event) else {
                        continue;
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
                    if sender.send(Message::Ping(vec![].into())).await.is_err() {
                        break;
                    }
                }
            }
        }
    });

    // Read commands from client
    let name_recv = claims.name.clone();
    let recv_subscriptions = subscribed_tickets.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            match msg {
                Message::Text(text) => {
                    match serde_json::from_str::<GatewayCommand>(&text) {
                        Ok(GatewayCommand::Subscribe { ticket_ids }) => {
                            if let Ok(mut subs) = recv_subscriptions.write() {
                                *subs = ticket_ids.into_iter().collect();
                            }
                        }
                        // Already authenticated
                        Ok(GatewayCommand::Identify { .. }) => {}
                        Err(e) => {
                            warn!(
                                "{} ({}) bad command: {} -- raw: {}",
                                name_recv,
                                user_id,
                                e,
                                preview(&text, 200)
                            );
                        }
                    }
                }
                Message::Pong(_) => {
                    pong_flag_recv.store(true, Ordering::Release);
                }
                Message::Close(_) => break,
                _ => {}
            }
        }
    });

    // Wait for either task to finish
    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    info!("{} ({}) disconnected from gateway", claims.name, user_id);
}

/// Truncate client-supplied text for logging without splitting a UTF-8
/// character; a byte slice here would panic on a multibyte character
/// straddling the cut.
fn preview(text: &str, max: usize) -> &str {
    if text.len() <= max {
        return text;
    }
    let mut end = max;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

async fn wait_for_identify(
    receiver: &mut futures_util::stream::SplitStream<WebSocket>,
    jwt_secret: &str,
) -> Option<Claims> {
    use jsonwebtoken::{DecodingKey, Validation, decode};

    // Only wait a short while for the Identify command
    let identify = tokio::time::timeout(Duration::from_secs(10), async {
        while let Some(Ok(msg)) = receiver.next().await {
            if let Message::Text(text) = msg {
                if let Ok(GatewayCommand::Identify { token }) =
                    serde_json::from_str::<GatewayCommand>(&text)
                {
                    return Some(token);
                }
            }
        }
        None
    })
    .await
    .ok()??;

    let token_data = decode::<Claims>(
        &identify,
        &DecodingKey::from_secret(jwt_secret.as_bytes()),
        &Validation::default(),
    )
    .ok()?;

    Some(token_data.claims)
}

#[cfg(test)]
mod tests {
    use super::preview;

    #[test]
    fn preview_never_splits_a_multibyte_character() {
        // 199 ASCII bytes followed by a two-byte character spanning the
        // 200-byte mark.
        let mut text = "a".repeat(199);
        text.push('é');
        assert_eq!(text.len(), 201);

        let cut = preview(&text, 200);
        assert_eq!(cut.len(), 199);
        assert!(text.starts_with(cut));
    }

    #[test]
    fn short_text_passes_through_untouched() {
        assert_eq!(preview("subscribe", 200), "subscribe");
        assert_eq!(preview("", 200), "");
    }
}
