//! Room directory.
//!
//! Serves the room list cached-first: subscribers immediately get the
//! locally stored list, then every remote snapshot as it arrives, with
//! each remote snapshot written through to the cache.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use confab_shared::adapters::{LocalCache, RemoteFeed};
use confab_shared::constants::FEED_CHANNEL_CAPACITY;
use confab_shared::types::ChatRoom;

use crate::error::SyncError;

/// Live, cancellable feed of the reconciled room list.
pub struct RoomListFeed {
    rx: mpsc::Receiver<Vec<ChatRoom>>,
    task: JoinHandle<()>,
}

impl RoomListFeed {
    pub async fn recv(&mut self) -> Option<Vec<ChatRoom>> {
        self.rx.recv().await
    }

    pub fn cancel(&mut self) {
        self.task.abort();
        self.rx.close();
        while self.rx.try_recv().is_ok() {}
    }
}

impl Drop for RoomListFeed {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Directory of the rooms the client participates in.
pub struct RoomDirectory {
    remote: Arc<dyn RemoteFeed>,
    cache: Arc<dyn LocalCache>,
}

impl RoomDirectory {
    pub fn new(remote: Arc<dyn RemoteFeed>, cache: Arc<dyn LocalCache>) -> Self {
        Self { remote, cache }
    }

    /// Observe the room list.  The cached list is emitted first, so the
    /// subscriber renders instantly even when the remote store is
    /// unreachable; remote snapshots follow and replace it.
    pub fn observe_rooms(&self) -> RoomListFeed {
        let (tx, rx) = mpsc::channel(FEED_CHANNEL_CAPACITY);
        let remote_rx = self.remote.observe_rooms();
        let cache = Arc::clone(&self.cache);

        let task = tokio::spawn(run_room_list(remote_rx, cache, tx));
        RoomListFeed { rx, task }
    }

    /// Create a room.  The remote write is the commit point; the cache
    /// copy is best-effort so the room shows up before the next remote
    /// snapshot.
    pub async fn create_room(&self, room: &ChatRoom) -> Result<(), SyncError> {
        self.remote
            .create_room(room)
            .await
            .map_err(SyncError::Remote)?;
        if let Err(e) = self.cache.upsert_rooms(std::slice::from_ref(room)).await {
            warn!(room_id = %room.id, error = %e, "cache write-behind failed");
        }
        Ok(())
    }
}

async fn run_room_list(
    mut remote_rx: mpsc::Receiver<Vec<ChatRoom>>,
    cache: Arc<dyn LocalCache>,
    tx: mpsc::Sender<Vec<ChatRoom>>,
) {
    let mut last: Option<Vec<ChatRoom>> = None;

    match cache.rooms().await {
        Ok(cached) => {
            if tx.send(cached.clone()).await.is_err() {
                return;
            }
            last = Some(cached);
        }
        Err(e) => warn!(error = %e, "cached room list unavailable"),
    }

    while let Some(snapshot) = remote_rx.recv().await {
        if let Err(e) = cache.upsert_rooms(&snapshot).await {
            warn!(error = %e, "room list write-through failed");
        }
        if last.as_ref() != Some(&snapshot) {
            if tx.send(snapshot.clone()).await.is_err() {
                return;
            }
            last = Some(snapshot);
        }
    }
    debug!("remote room subscription ended");
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::path::Path;
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;
    use tokio::time::timeout;

    use confab_shared::error::AdapterError;
    use confab_shared::types::{Message, MessageId, MessageStatus, MessageType, RoomId, UserId};
    use confab_store::{Cache, Database};

    struct FakeRemote {
        rooms_feed: Mutex<Option<mpsc::Receiver<Vec<ChatRoom>>>>,
        created: Mutex<Vec<ChatRoom>>,
        fail_writes: bool,
    }

    impl FakeRemote {
        fn with_rooms_feed() -> (Arc<Self>, mpsc::Sender<Vec<ChatRoom>>) {
            let (tx, rx) = mpsc::channel(FEED_CHANNEL_CAPACITY);
            let remote = Arc::new(Self {
                rooms_feed: Mutex::new(Some(rx)),
                created: Mutex::new(Vec::new()),
                fail_writes: false,
            });
            (remote, tx)
        }

        fn unreachable() -> Arc<Self> {
            Arc::new(Self {
                rooms_feed: Mutex::new(None),
                created: Mutex::new(Vec::new()),
                fail_writes: true,
            })
        }
    }

    #[async_trait]
    impl RemoteFeed for FakeRemote {
        fn observe_messages(&self, _room_id: RoomId) -> mpsc::Receiver<Vec<Message>> {
            mpsc::channel(1).1
        }

        async fn send_message(&self, _message: &Message) -> Result<(), AdapterError> {
            Ok(())
        }

        async fn update_message_status(
            &self,
            _room_id: RoomId,
            _message_id: MessageId,
            _status: MessageStatus,
        ) -> Result<(), AdapterError> {
            Ok(())
        }

        async fn upload_file(
            &self,
            _path: &Path,
            _kind: MessageType,
        ) -> Result<String, AdapterError> {
            Ok(String::new())
        }

        fn observe_rooms(&self) -> mpsc::Receiver<Vec<ChatRoom>> {
            match self.rooms_feed.lock().unwrap().take() {
                Some(rx) => rx,
                None => mpsc::channel(1).1,
            }
        }

        async fn create_room(&self, room: &ChatRoom) -> Result<(), AdapterError> {
            if self.fail_writes {
                return Err(AdapterError::Unavailable("remote down".into()));
            }
            self.created.lock().unwrap().push(room.clone());
            Ok(())
        }
    }

    fn memory_cache() -> Arc<Cache> {
        Arc::new(Cache::new(Database::open_in_memory().unwrap()))
    }

    fn room(name: &str) -> ChatRoom {
        ChatRoom::new(name, None, vec![UserId::from("u1")])
    }

    async fn next(feed: &mut RoomListFeed) -> Vec<ChatRoom> {
        timeout(Duration::from_secs(5), feed.recv())
            .await
            .expect("room list emission timed out")
            .expect("room list feed closed")
    }

    #[tokio::test]
    async fn cached_rooms_come_first_then_remote_snapshots() {
        let (remote, remote_tx) = FakeRemote::with_rooms_feed();
        let cache = memory_cache();

        let known = room("general");
        cache.upsert_rooms(&[known.clone()]).await.unwrap();

        let directory = RoomDirectory::new(remote, Arc::clone(&cache) as Arc<dyn LocalCache>);
        let mut feed = directory.observe_rooms();

        let first = next(&mut feed).await;
        assert_eq!(first, vec![known.clone()]);

        let fresh = vec![known.clone(), room("random")];
        remote_tx.send(fresh.clone()).await.unwrap();
        let second = next(&mut feed).await;
        assert_eq!(second, fresh);

        // The remote snapshot was written through.
        let cached = cache.rooms().await.unwrap();
        assert_eq!(cached.len(), 2);
    }

    #[tokio::test]
    async fn remote_outage_still_lists_cached_rooms() {
        let cache = memory_cache();
        let known = room("general");
        cache.upsert_rooms(&[known.clone()]).await.unwrap();

        let directory =
            RoomDirectory::new(FakeRemote::unreachable(), Arc::clone(&cache) as Arc<dyn LocalCache>);
        let mut feed = directory.observe_rooms();

        assert_eq!(next(&mut feed).await, vec![known]);
    }

    #[tokio::test]
    async fn create_room_commits_remotely_and_caches() {
        let (remote, _tx) = FakeRemote::with_rooms_feed();
        let cache = memory_cache();
        let directory = RoomDirectory::new(
            Arc::clone(&remote) as Arc<dyn RemoteFeed>,
            Arc::clone(&cache) as Arc<dyn LocalCache>,
        );

        let new_room = room("plans");
        directory.create_room(&new_room).await.unwrap();

        assert_eq!(remote.created.lock().unwrap().len(), 1);
        assert_eq!(cache.rooms().await.unwrap(), vec![new_room]);
    }

    #[tokio::test]
    async fn create_room_remote_failure_propagates() {
        let cache = memory_cache();
        let directory =
            RoomDirectory::new(FakeRemote::unreachable(), Arc::clone(&cache) as Arc<dyn LocalCache>);

        let err = directory.create_room(&room("nope")).await.unwrap_err();
        assert!(matches!(err, SyncError::Remote(_)));
        // No partial effect in the cache.
        assert!(cache.rooms().await.unwrap().is_empty());
    }
}
