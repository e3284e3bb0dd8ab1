//! Async cache adapter.
//!
//! [`Cache`] wraps the synchronous [`Database`] behind a mutex and adds
//! the change-notification streams the reconciliation engine consumes:
//! every write broadcasts an invalidation event, and each `observe_*`
//! subscription re-queries and re-emits when an event touches its scope.
//! Dropping a subscription's receiver ends its task.

use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, warn};

use confab_shared::adapters::LocalCache;
use confab_shared::constants::FEED_CHANNEL_CAPACITY;
use confab_shared::error::AdapterError;
use confab_shared::types::{ChatRoom, Message, MessageId, MessageStatus, RoomId, User, UserId};

use crate::database::Database;
use crate::error::StoreError;

/// Cache invalidation events broadcast to observers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CacheEvent {
    /// The message list of one room changed.
    Messages(RoomId),
    /// Every table changed (clear_all).
    Everything,
    /// The room list changed.
    Rooms,
}

/// Thread-safe async handle over the local database.
pub struct Cache {
    db: Arc<Mutex<Database>>,
    events: broadcast::Sender<CacheEvent>,
}

impl Cache {
    pub fn new(db: Database) -> Self {
        let (events, _) = broadcast::channel(64);
        Self {
            db: Arc::new(Mutex::new(db)),
            events,
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Database>, StoreError> {
        self.db.lock().map_err(|_| StoreError::LockPoisoned)
    }

    fn notify(&self, event: CacheEvent) {
        // No receivers is fine; nobody is observing yet.
        let _ = self.events.send(event);
    }
}

#[async_trait]
impl LocalCache for Cache {
    async fn upsert_messages(&self, messages: &[Message]) -> Result<(), AdapterError> {
        if messages.is_empty() {
            return Ok(());
        }
        self.lock()?.upsert_messages(messages)?;
        let mut touched: Vec<RoomId> = messages.iter().map(|m| m.room_id).collect();
        touched.dedup();
        for room_id in touched {
            self.notify(CacheEvent::Messages(room_id));
        }
        Ok(())
    }

    fn observe_messages(&self, room_id: RoomId) -> mpsc::Receiver<Vec<Message>> {
        let (tx, rx) = mpsc::channel(FEED_CHANNEL_CAPACITY);
        let db = Arc::clone(&self.db);
        let mut events = self.events.subscribe();

        tokio::spawn(async move {
            // Emit the current list immediately, then on every change.
            if !requery_and_send(&db, room_id, &tx).await {
                return;
            }
            loop {
                match events.recv().await {
                    Ok(CacheEvent::Messages(touched)) if touched == room_id => {}
                    Ok(CacheEvent::Everything) => {}
                    Ok(_) => continue,
                    // Missed events are fine: a re-query always reflects
                    // the latest state.
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        debug!(room = %room_id, skipped, "cache observer lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
                if !requery_and_send(&db, room_id, &tx).await {
                    break;
                }
            }
        });

        rx
    }

    async fn update_message_status(
        &self,
        room_id: RoomId,
        message_id: MessageId,
        status: MessageStatus,
    ) -> Result<(), AdapterError> {
        self.lock()?.update_message_status(room_id, message_id, status)?;
        self.notify(CacheEvent::Messages(room_id));
        Ok(())
    }

    async fn upsert_rooms(&self, rooms: &[ChatRoom]) -> Result<(), AdapterError> {
        if rooms.is_empty() {
            return Ok(());
        }
        self.lock()?.upsert_rooms(rooms)?;
        self.notify(CacheEvent::Rooms);
        Ok(())
    }

    fn observe_rooms(&self) -> mpsc::Receiver<Vec<ChatRoom>> {
        let (tx, rx) = mpsc::channel(FEED_CHANNEL_CAPACITY);
        let db = Arc::clone(&self.db);
        let mut events = self.events.subscribe();

        tokio::spawn(async move {
            loop {
                let snapshot = match db.lock() {
                    Ok(guard) => guard.list_rooms(),
                    Err(_) => Err(StoreError::LockPoisoned),
                };
                match snapshot {
                    Ok(rooms) => {
                        if tx.send(rooms).await.is_err() {
                            break;
                        }
                    }
                    Err(e) => warn!(error = %e, "failed to read cached rooms"),
                }
                loop {
                    match events.recv().await {
                        Ok(CacheEvent::Rooms) | Ok(CacheEvent::Everything) => break,
                        Ok(_) => continue,
                        Err(broadcast::error::RecvError::Lagged(_)) => break,
                        Err(broadcast::error::RecvError::Closed) => return,
                    }
                }
            }
        });

        rx
    }

    async fn rooms(&self) -> Result<Vec<ChatRoom>, AdapterError> {
        Ok(self.lock()?.list_rooms()?)
    }

    async fn clear_all(&self) -> Result<(), AdapterError> {
        self.lock()?.clear_all()?;
        self.notify(CacheEvent::Everything);
        Ok(())
    }

    async fn save_user(&self, user: &User) -> Result<(), AdapterError> {
        Ok(self.lock()?.save_current_user(user)?)
    }

    async fn current_user(&self) -> Result<Option<User>, AdapterError> {
        Ok(self.lock()?.get_current_user()?)
    }

    async fn user_by_id(&self, id: &UserId) -> Result<Option<User>, AdapterError> {
        Ok(self.lock()?.get_user_by_id(id)?)
    }
}

/// Re-query one room's list and push it to the observer.
/// Returns `false` once the observer is gone.
async fn requery_and_send(
    db: &Arc<Mutex<Database>>,
    room_id: RoomId,
    tx: &mpsc::Sender<Vec<Message>>,
) -> bool {
    let snapshot = match db.lock() {
        Ok(guard) => guard.get_messages_for_room(room_id),
        Err(_) => Err(StoreError::LockPoisoned),
    };
    match snapshot {
        Ok(messages) => tx.send(messages).await.is_ok(),
        Err(e) => {
            warn!(room = %room_id, error = %e, "failed to read cached messages");
            true
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cache() -> Cache {
        Cache::new(Database::open_in_memory().unwrap())
    }

    #[tokio::test]
    async fn observer_sees_initial_list_then_changes() {
        let cache = cache();
        let room = RoomId::new();

        let msg = Message::text(room, "u1", "first");
        cache.upsert_messages(std::slice::from_ref(&msg)).await.unwrap();

        let mut feed = cache.observe_messages(room);
        assert_eq!(feed.recv().await.unwrap(), vec![msg.clone()]);

        let second = Message::text(room, "u1", "second");
        cache
            .upsert_messages(std::slice::from_ref(&second))
            .await
            .unwrap();

        let next = feed.recv().await.unwrap();
        assert_eq!(next.len(), 2);
    }

    #[tokio::test]
    async fn observer_ignores_other_rooms() {
        let cache = cache();
        let room = RoomId::new();

        let mut feed = cache.observe_messages(room);
        assert!(feed.recv().await.unwrap().is_empty());

        let elsewhere = Message::text(RoomId::new(), "u1", "noise");
        cache
            .upsert_messages(std::slice::from_ref(&elsewhere))
            .await
            .unwrap();

        // Give the observer task a chance to (wrongly) emit.
        tokio::task::yield_now().await;
        assert!(feed.try_recv().is_err());
    }

    #[tokio::test]
    async fn status_update_is_observed() {
        let cache = cache();
        let room = RoomId::new();
        let msg = Message::text(room, "u1", "hi");
        cache.upsert_messages(std::slice::from_ref(&msg)).await.unwrap();

        let mut feed = cache.observe_messages(room);
        let _ = feed.recv().await.unwrap();

        cache
            .update_message_status(room, msg.id, MessageStatus::Delivered)
            .await
            .unwrap();

        let next = feed.recv().await.unwrap();
        assert_eq!(next[0].status, MessageStatus::Delivered);
    }

    #[tokio::test]
    async fn clear_all_wakes_room_observers() {
        let cache = cache();
        let mut rooms_feed = cache.observe_rooms();
        assert!(rooms_feed.recv().await.unwrap().is_empty());

        cache
            .upsert_rooms(&[ChatRoom::new("general", None, vec![])])
            .await
            .unwrap();
        assert_eq!(rooms_feed.recv().await.unwrap().len(), 1);

        cache.clear_all().await.unwrap();
        assert!(rooms_feed.recv().await.unwrap().is_empty());
    }
}
