//! Realtime transport socket.
//!
//! One process-scoped duplex websocket connection shared by every room.
//! The driver task owns the connection and runs the lifecycle state
//! machine; inbound frames are parsed as single [`Message`] records and
//! fanned out over a broadcast channel so each room subscription
//! independently observes every frame.  Malformed frames are logged and
//! dropped without affecting the connection.

use std::sync::{Arc, Mutex};

use futures::{SinkExt, StreamExt};
use tokio::sync::{broadcast, mpsc, watch};
use tokio_tungstenite::connect_async_with_config;
use tokio_tungstenite::tungstenite::protocol::WebSocketConfig;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tracing::{debug, info, warn};

use confab_shared::adapters::RealtimeTransport;
use confab_shared::constants::{MAX_FRAME_SIZE, TRANSPORT_FANOUT_CAPACITY};
use confab_shared::types::{ConnectionState, Message};

use crate::config::ReconnectPolicy;

/// Handle to the shared realtime connection.
///
/// The connection lives in a background task; dropping the handle (or
/// calling [`RealtimeSocket::close`]) shuts it down.
pub struct RealtimeSocket {
    state: Arc<Mutex<ConnectionState>>,
    inbound: broadcast::Sender<Message>,
    outbound: mpsc::Sender<Message>,
    shutdown: watch::Sender<bool>,
}

impl RealtimeSocket {
    /// Open the connection to `url` in a background task and return the
    /// handle immediately.  The state moves through
    /// `DISCONNECTED -> CONNECTING -> OPEN` as the dial progresses.
    pub fn connect(url: impl Into<String>, reconnect: ReconnectPolicy) -> Self {
        let url = url.into();
        let state = Arc::new(Mutex::new(ConnectionState::Disconnected));
        let (inbound, _) = broadcast::channel(TRANSPORT_FANOUT_CAPACITY);
        let (outbound_tx, outbound_rx) = mpsc::channel(TRANSPORT_FANOUT_CAPACITY);
        let (shutdown, shutdown_rx) = watch::channel(false);

        tokio::spawn(run_connection(
            url,
            reconnect,
            Arc::clone(&state),
            inbound.clone(),
            outbound_rx,
            shutdown_rx,
        ));

        Self {
            state,
            inbound,
            outbound: outbound_tx,
            shutdown,
        }
    }

    /// Request a graceful shutdown.  Idempotent.
    pub fn close(&self) {
        let _ = self.shutdown.send(true);
    }
}

impl RealtimeTransport for RealtimeSocket {
    fn subscribe(&self) -> broadcast::Receiver<Message> {
        self.inbound.subscribe()
    }

    fn send_message(&self, message: &Message) {
        if self.state() != ConnectionState::Open {
            debug!(msg_id = %message.id, "socket not open, dropping outbound message");
            return;
        }
        if let Err(e) = self.outbound.try_send(message.clone()) {
            debug!(msg_id = %message.id, error = %e, "outbound queue full, dropping message");
        }
    }

    fn state(&self) -> ConnectionState {
        self.state
            .lock()
            .map(|guard| *guard)
            .unwrap_or(ConnectionState::Closed)
    }
}

impl Drop for RealtimeSocket {
    fn drop(&mut self) {
        let _ = self.shutdown.send(true);
    }
}

fn set_state(state: &Arc<Mutex<ConnectionState>>, next: ConnectionState) {
    if let Ok(mut guard) = state.lock() {
        *guard = next;
    }
}

/// Connection driver: dial, pump frames, and (when the policy allows)
/// reconnect with capped exponential backoff.
async fn run_connection(
    url: String,
    reconnect: ReconnectPolicy,
    state: Arc<Mutex<ConnectionState>>,
    inbound: broadcast::Sender<Message>,
    mut outbound_rx: mpsc::Receiver<Message>,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    let mut delay = reconnect.initial_delay;
    let ws_config = WebSocketConfig {
        max_message_size: Some(MAX_FRAME_SIZE),
        ..WebSocketConfig::default()
    };

    loop {
        set_state(&state, ConnectionState::Connecting);

        let attempt = tokio::select! {
            result = connect_async_with_config(url.as_str(), Some(ws_config), false) => result,
            _ = shutdown_rx.changed() => {
                set_state(&state, ConnectionState::Closed);
                return;
            }
        };

        match attempt {
            Ok((ws, _)) => {
                set_state(&state, ConnectionState::Open);
                info!(url = %url, "realtime socket open");
                delay = reconnect.initial_delay;

                let (mut writer, mut reader) = ws.split();

                loop {
                    tokio::select! {
                        frame = reader.next() => match frame {
                            Some(Ok(WsMessage::Text(text))) => {
                                match serde_json::from_str::<Message>(&text) {
                                    Ok(message) => {
                                        // Send only fails with zero
                                        // subscribers; that is fine.
                                        let _ = inbound.send(message);
                                    }
                                    Err(e) => {
                                        warn!(error = %e, "dropping malformed realtime frame");
                                    }
                                }
                            }
                            Some(Ok(WsMessage::Binary(bytes))) => {
                                debug!(len = bytes.len(), "ignoring binary realtime frame");
                            }
                            Some(Ok(WsMessage::Close(_))) | None => {
                                info!("realtime socket closed by peer");
                                break;
                            }
                            Some(Ok(_)) => {} // ping/pong
                            Some(Err(e)) => {
                                warn!(error = %e, "realtime socket failed");
                                break;
                            }
                        },
                        Some(message) = outbound_rx.recv() => {
                            match serde_json::to_string(&message) {
                                Ok(json) => {
                                    if let Err(e) = writer.send(WsMessage::Text(json)).await {
                                        warn!(error = %e, "realtime send failed");
                                        break;
                                    }
                                }
                                Err(e) => warn!(error = %e, "failed to encode outbound frame"),
                            }
                        },
                        _ = shutdown_rx.changed() => {
                            set_state(&state, ConnectionState::Closing);
                            let _ = writer.send(WsMessage::Close(None)).await;
                            set_state(&state, ConnectionState::Closed);
                            return;
                        }
                    }
                }

                set_state(&state, ConnectionState::Disconnected);
            }
            Err(e) => {
                warn!(url = %url, error = %e, "realtime connect failed");
                set_state(&state, ConnectionState::Disconnected);
            }
        }

        if !reconnect.enabled {
            // Manual-reconnect mode: stay DISCONNECTED until the caller
            // opens a new socket.
            return;
        }

        debug!(delay_ms = delay.as_millis() as u64, "scheduling realtime reconnect");
        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            _ = shutdown_rx.changed() => {
                set_state(&state, ConnectionState::Closed);
                return;
            }
        }
        delay = (delay * 2).min(reconnect.max_delay);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::time::Duration;

    use confab_shared::types::RoomId;
    use tokio::net::TcpListener;
    use tokio::time::timeout;

    fn no_reconnect() -> ReconnectPolicy {
        ReconnectPolicy {
            enabled: false,
            ..ReconnectPolicy::default()
        }
    }

    async fn wait_for_state(socket: &RealtimeSocket, wanted: ConnectionState) {
        timeout(Duration::from_secs(5), async {
            loop {
                if socket.state() == wanted {
                    return;
                }
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("state not reached in time");
    }

    #[tokio::test]
    async fn inbound_frames_are_fanned_out_and_malformed_ones_dropped() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let first = Message::text(RoomId::new(), "u1", "one");
        let second = Message::text(RoomId::new(), "u1", "two");
        let frames = vec![
            serde_json::to_string(&first).unwrap(),
            "{not json".to_string(),
            serde_json::to_string(&second).unwrap(),
        ];

        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
            for frame in frames {
                ws.send(WsMessage::Text(frame)).await.unwrap();
            }
            // Keep the connection alive until the client hangs up.
            while ws.next().await.is_some() {}
        });

        let socket = RealtimeSocket::connect(format!("ws://{addr}"), no_reconnect());
        let mut rx = socket.subscribe();

        let got_first = timeout(Duration::from_secs(5), rx.recv()).await.unwrap().unwrap();
        assert_eq!(got_first, first);

        // The malformed frame must have been skipped, not kill the feed.
        let got_second = timeout(Duration::from_secs(5), rx.recv()).await.unwrap().unwrap();
        assert_eq!(got_second, second);
        assert_eq!(socket.state(), ConnectionState::Open);
    }

    #[tokio::test]
    async fn outbound_messages_reach_the_peer() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let (echo_tx, mut echo_rx) = mpsc::channel::<String>(4);
        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
            while let Some(Ok(WsMessage::Text(text))) = ws.next().await {
                let _ = echo_tx.send(text).await;
            }
        });

        let socket = RealtimeSocket::connect(format!("ws://{addr}"), no_reconnect());
        wait_for_state(&socket, ConnectionState::Open).await;

        let msg = Message::text(RoomId::new(), "u1", "ciphertext");
        socket.send_message(&msg);

        let received = timeout(Duration::from_secs(5), echo_rx.recv())
            .await
            .unwrap()
            .unwrap();
        let decoded: Message = serde_json::from_str(&received).unwrap();
        assert_eq!(decoded, msg);
    }

    #[tokio::test]
    async fn send_while_not_open_is_a_silent_noop() {
        // Nothing is listening on this port.
        let socket = RealtimeSocket::connect("ws://127.0.0.1:1", no_reconnect());
        wait_for_state(&socket, ConnectionState::Disconnected).await;

        // Must not panic or error out.
        socket.send_message(&Message::text(RoomId::new(), "u1", "dropped"));
        assert_eq!(socket.state(), ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn close_is_idempotent() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
            while ws.next().await.is_some() {}
        });

        let socket = RealtimeSocket::connect(format!("ws://{addr}"), no_reconnect());
        wait_for_state(&socket, ConnectionState::Open).await;

        socket.close();
        socket.close();
        wait_for_state(&socket, ConnectionState::Closed).await;
    }
}
