//! The reconciliation engine.
//!
//! One engine instance serves the whole client.  Reads are per-room
//! combine-latest loops over the three sources; writes fan out to the
//! remote store (authoritative), the realtime socket (best-effort push)
//! and the local cache (availability copy).

use std::path::Path;
use std::sync::Arc;

use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use confab_shared::adapters::{LocalCache, RealtimeTransport, RemoteFeed};
use confab_shared::cipher::ContentCipher;
use confab_shared::constants::FEED_CHANNEL_CAPACITY;
use confab_shared::types::{Message, MessageId, MessageStatus, MessageType, RoomId, UserId};

use crate::error::{StatusUpdateError, SyncError};
use crate::merge::merge_snapshots;

/// Live, cancellable feed of one room's reconciled message list.
///
/// Dropping the feed (or calling [`RoomFeed::cancel`]) stops the merge
/// task and releases the underlying source subscriptions.
pub struct RoomFeed {
    rx: mpsc::Receiver<Vec<Message>>,
    task: JoinHandle<()>,
}

impl RoomFeed {
    /// Next reconciled snapshot, or `None` once the feed is cancelled.
    pub async fn recv(&mut self) -> Option<Vec<Message>> {
        self.rx.recv().await
    }

    /// Stop the feed.  Idempotent.
    pub fn cancel(&mut self) {
        self.task.abort();
        self.rx.close();
        // Discard snapshots that were already queued.
        while self.rx.try_recv().is_ok() {}
    }
}

impl Drop for RoomFeed {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Central reconciliation engine, constructed from its three data
/// sources and the content cipher.
pub struct SyncEngine {
    remote: Arc<dyn RemoteFeed>,
    transport: Arc<dyn RealtimeTransport>,
    cache: Arc<dyn LocalCache>,
    cipher: ContentCipher,
}

impl SyncEngine {
    pub fn new(
        remote: Arc<dyn RemoteFeed>,
        transport: Arc<dyn RealtimeTransport>,
        cache: Arc<dyn LocalCache>,
        cipher: ContentCipher,
    ) -> Self {
        Self {
            remote,
            transport,
            cache,
            cipher,
        }
    }

    /// Open the reconciled message feed for one room.
    ///
    /// Each source starts as an empty snapshot; a source that closes
    /// (remote outage, socket down) simply stops contributing updates
    /// while the remaining sources keep the feed alive.  Identical
    /// consecutive snapshots are suppressed.
    pub fn observe_room(&self, room_id: RoomId) -> RoomFeed {
        let (tx, rx) = mpsc::channel(FEED_CHANNEL_CAPACITY);

        let remote_rx = self.remote.observe_messages(room_id);
        let cache_rx = self.cache.observe_messages(room_id);
        let transport_rx = self.transport.subscribe();

        let cache = Arc::clone(&self.cache);
        let cipher = self.cipher.clone();
        let task = tokio::spawn(run_room_feed(
            room_id, remote_rx, cache_rx, transport_rx, cache, cipher, tx,
        ));

        RoomFeed { rx, task }
    }

    /// Send a message.
    ///
    /// TEXT bodies are encrypted before leaving the engine; attachments
    /// carry their placeholder content untouched.  The remote write is
    /// the commit point: if it fails, the error propagates and nothing
    /// else runs.  The realtime push is fire-and-forget and the cache
    /// write is best-effort.
    pub async fn send_message(&self, message: &Message) -> Result<(), SyncError> {
        let mut outgoing = message.clone();
        if outgoing.kind == MessageType::Text {
            match self.cipher.encrypt(&outgoing.content) {
                Ok(ciphertext) => outgoing.content = ciphertext,
                Err(e) => {
                    warn!(msg_id = %outgoing.id, error = %e, "content encryption failed, sending raw");
                }
            }
        }

        self.remote
            .send_message(&outgoing)
            .await
            .map_err(SyncError::Remote)?;

        self.transport.send_message(&outgoing);

        if let Err(e) = self.cache.upsert_messages(std::slice::from_ref(&outgoing)).await {
            warn!(msg_id = %outgoing.id, error = %e, "cache write-behind failed");
        }
        Ok(())
    }

    /// Upload a local file and send the attachment message referencing
    /// it.  Returns the message as sent.  A failed upload has no
    /// partial effects.
    pub async fn send_file(
        &self,
        room_id: RoomId,
        sender_id: UserId,
        path: &Path,
        kind: MessageType,
    ) -> Result<Message, SyncError> {
        if kind == MessageType::Text {
            return Err(SyncError::InvalidArgument(
                "text messages carry no attachment".into(),
            ));
        }
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| SyncError::InvalidArgument("path has no file name".into()))?
            .to_string();

        let url = self
            .remote
            .upload_file(path, kind)
            .await
            .map_err(SyncError::Remote)?;

        let message = Message::attachment(room_id, sender_id, kind, url, file_name);
        self.send_message(&message).await?;
        Ok(message)
    }

    /// Advance a message's delivery status on the remote store and the
    /// local cache.  Both writes are always attempted; failures are
    /// reported together so a caller can tell a remote outage from a
    /// cache defect.
    pub async fn update_message_status(
        &self,
        room_id: RoomId,
        message_id: MessageId,
        status: MessageStatus,
    ) -> Result<(), StatusUpdateError> {
        let remote_err = self
            .remote
            .update_message_status(room_id, message_id, status)
            .await
            .err();
        let cache_err = self
            .cache
            .update_message_status(room_id, message_id, status)
            .await
            .err();

        match StatusUpdateError::from_parts(remote_err, cache_err) {
            None => Ok(()),
            Some(e) => Err(e),
        }
    }
}

/// Combine-latest loop for one room.
///
/// Holds the latest snapshot of each source; every source update
/// triggers a re-merge.  Realtime frames accumulate into their own
/// snapshot (replace-by-id) and are written through to the cache before
/// the merged emission, so they survive a restart.
async fn run_room_feed(
    room_id: RoomId,
    mut remote_rx: mpsc::Receiver<Vec<Message>>,
    mut cache_rx: mpsc::Receiver<Vec<Message>>,
    mut transport_rx: broadcast::Receiver<Message>,
    cache: Arc<dyn LocalCache>,
    cipher: ContentCipher,
    tx: mpsc::Sender<Vec<Message>>,
) {
    let mut remote_snapshot: Vec<Message> = Vec::new();
    let mut realtime_snapshot: Vec<Message> = Vec::new();
    let mut local_snapshot: Vec<Message> = Vec::new();

    let mut remote_open = true;
    let mut cache_open = true;
    let mut transport_open = true;

    let mut last: Option<Vec<Message>> = None;

    loop {
        tokio::select! {
            snapshot = remote_rx.recv(), if remote_open => match snapshot {
                Some(list) => remote_snapshot = list,
                None => {
                    debug!(room_id = %room_id, "remote subscription ended");
                    remote_open = false;
                    continue;
                }
            },
            snapshot = cache_rx.recv(), if cache_open => match snapshot {
                Some(list) => local_snapshot = list,
                None => {
                    debug!(room_id = %room_id, "cache subscription ended");
                    cache_open = false;
                    continue;
                }
            },
            frame = transport_rx.recv(), if transport_open => match frame {
                Ok(message) if message.room_id == room_id => {
                    if let Err(e) = cache.upsert_messages(std::slice::from_ref(&message)).await {
                        warn!(msg_id = %message.id, error = %e, "realtime write-through failed");
                    }
                    match realtime_snapshot.iter_mut().find(|m| m.id == message.id) {
                        Some(existing) => *existing = message,
                        None => realtime_snapshot.push(message),
                    }
                }
                Ok(_) => continue, // another room's frame
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    // Missed frames will come back via the remote
                    // snapshot; keep going.
                    warn!(room_id = %room_id, skipped, "realtime feed lagged");
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => {
                    debug!(room_id = %room_id, "realtime transport gone");
                    transport_open = false;
                    continue;
                }
            },
            else => break,
        }

        let merged = merge_snapshots(&remote_snapshot, &realtime_snapshot, &local_snapshot, &cipher);
        if last.as_ref() != Some(&merged) {
            if tx.send(merged.clone()).await.is_err() {
                break; // subscriber hung up
            }
            last = Some(merged);
        }
    }
}
