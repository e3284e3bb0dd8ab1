//! Account session lifecycle.
//!
//! Thin coordinator between the authoritative account store and the
//! local cache: login stores the authenticated identity locally so the
//! client can render offline, logout wipes every cached table.

use std::sync::Arc;

use tracing::{info, warn};

use confab_shared::adapters::{AccountStore, LocalCache};
use confab_shared::types::User;

use crate::error::SyncError;

pub struct SessionManager {
    accounts: Arc<dyn AccountStore>,
    cache: Arc<dyn LocalCache>,
}

impl SessionManager {
    pub fn new(accounts: Arc<dyn AccountStore>, cache: Arc<dyn LocalCache>) -> Self {
        Self { accounts, cache }
    }

    /// Create an account and store the resulting identity locally.
    pub async fn register(
        &self,
        email: &str,
        password: &str,
        username: &str,
    ) -> Result<User, SyncError> {
        let user = self
            .accounts
            .register(email, password, username)
            .await
            .map_err(SyncError::Remote)?;
        self.remember(&user).await;
        Ok(user)
    }

    /// Open a session and store the resulting identity locally.
    pub async fn login(&self, email: &str, password: &str) -> Result<User, SyncError> {
        let user = self
            .accounts
            .login(email, password)
            .await
            .map_err(SyncError::Remote)?;
        self.remember(&user).await;
        Ok(user)
    }

    /// Close the session and erase everything cached on the device.
    pub async fn logout(&self) -> Result<(), SyncError> {
        self.accounts.logout().await.map_err(SyncError::Remote)?;
        self.cache.clear_all().await.map_err(SyncError::Cache)?;
        info!("session closed, local cache wiped");
        Ok(())
    }

    /// The authenticated user, resolved authoritatively when possible.
    ///
    /// Asks the account store who is signed in, fetches that profile
    /// (falling back to the cached copy), and finally falls back to the
    /// cached identity when the account store is unreachable.
    pub async fn current_user(&self) -> Result<Option<User>, SyncError> {
        match self.accounts.current_identity().await {
            Ok(Some(id)) => {
                if let Ok(Some(user)) = self.accounts.user_by_id(&id).await {
                    self.remember(&user).await;
                    return Ok(Some(user));
                }
                self.cache
                    .user_by_id(&id)
                    .await
                    .map_err(SyncError::Cache)
            }
            Ok(None) => Ok(None),
            Err(e) => {
                warn!(error = %e, "account store unreachable, using cached identity");
                self.cache.current_user().await.map_err(SyncError::Cache)
            }
        }
    }

    async fn remember(&self, user: &User) {
        if let Err(e) = self.cache.save_user(user).await {
            warn!(user_id = %user.id, error = %e, "failed to cache identity");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Mutex;

    use async_trait::async_trait;

    use confab_shared::error::AdapterError;
    use confab_shared::types::{RoomId, UserId};
    use confab_store::{Cache, Database};

    struct FakeAccounts {
        user: User,
        signed_in: Mutex<bool>,
        reachable: bool,
    }

    impl FakeAccounts {
        fn new(reachable: bool) -> Arc<Self> {
            Arc::new(Self {
                user: User {
                    id: UserId::from("acct-1"),
                    username: "ada".into(),
                    email: "ada@example.com".into(),
                    avatar_url: None,
                },
                signed_in: Mutex::new(false),
                reachable,
            })
        }

        fn check(&self) -> Result<(), AdapterError> {
            if self.reachable {
                Ok(())
            } else {
                Err(AdapterError::Unavailable("account store down".into()))
            }
        }
    }

    #[async_trait]
    impl AccountStore for FakeAccounts {
        async fn register(
            &self,
            _email: &str,
            _password: &str,
            _username: &str,
        ) -> Result<User, AdapterError> {
            self.check()?;
            *self.signed_in.lock().unwrap() = true;
            Ok(self.user.clone())
        }

        async fn login(&self, _email: &str, _password: &str) -> Result<User, AdapterError> {
            self.check()?;
            *self.signed_in.lock().unwrap() = true;
            Ok(self.user.clone())
        }

        async fn logout(&self) -> Result<(), AdapterError> {
            self.check()?;
            *self.signed_in.lock().unwrap() = false;
            Ok(())
        }

        async fn current_identity(&self) -> Result<Option<UserId>, AdapterError> {
            self.check()?;
            Ok(self
                .signed_in
                .lock()
                .unwrap()
                .then(|| self.user.id.clone()))
        }

        async fn user_by_id(&self, id: &UserId) -> Result<Option<User>, AdapterError> {
            self.check()?;
            Ok((id == &self.user.id).then(|| self.user.clone()))
        }
    }

    fn memory_cache() -> Arc<Cache> {
        Arc::new(Cache::new(Database::open_in_memory().unwrap()))
    }

    #[tokio::test]
    async fn login_caches_the_identity() {
        let cache = memory_cache();
        let session = SessionManager::new(
            FakeAccounts::new(true),
            Arc::clone(&cache) as Arc<dyn LocalCache>,
        );

        let user = session.login("ada@example.com", "pw").await.unwrap();
        assert_eq!(cache.current_user().await.unwrap(), Some(user));
    }

    #[tokio::test]
    async fn logout_wipes_the_cache() {
        let cache = memory_cache();
        let session = SessionManager::new(
            FakeAccounts::new(true),
            Arc::clone(&cache) as Arc<dyn LocalCache>,
        );

        session.login("ada@example.com", "pw").await.unwrap();
        cache
            .upsert_messages(&[confab_shared::types::Message::text(
                RoomId::new(),
                "acct-1",
                "x",
            )])
            .await
            .unwrap();

        session.logout().await.unwrap();
        assert_eq!(cache.current_user().await.unwrap(), None);
        assert!(cache.rooms().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn current_user_falls_back_to_cache_when_offline() {
        let cache = memory_cache();

        // Sign in while online.
        let online = SessionManager::new(
            FakeAccounts::new(true),
            Arc::clone(&cache) as Arc<dyn LocalCache>,
        );
        let user = online.login("ada@example.com", "pw").await.unwrap();

        // Later, the account store is unreachable.
        let offline = SessionManager::new(
            FakeAccounts::new(false),
            Arc::clone(&cache) as Arc<dyn LocalCache>,
        );
        assert_eq!(offline.current_user().await.unwrap(), Some(user));
    }

    #[tokio::test]
    async fn current_user_is_none_without_a_session() {
        let session = SessionManager::new(
            FakeAccounts::new(true),
            memory_cache() as Arc<dyn LocalCache>,
        );
        assert_eq!(session.current_user().await.unwrap(), None);
    }
}
