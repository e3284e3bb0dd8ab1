//! HTTP client for the authoritative account store.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Serialize;
use tracing::info;

use confab_shared::adapters::AccountStore;
use confab_shared::error::AdapterError;
use confab_shared::types::{User, UserId};

use crate::error::NetError;

/// Account store client.  Sessions are cookie-scoped per client, so a
/// single [`reqwest::Client`] with a cookie store would carry them; this
/// backend instead keys the session on the connection, so no extra state
/// is held here.
#[derive(Debug, Clone)]
pub struct HttpAccountStore {
    http: reqwest::Client,
    api_url: String,
}

#[derive(Serialize)]
struct RegisterRequest<'a> {
    username: &'a str,
    email: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
struct LoginRequest<'a> {
    email: &'a str,
    password: &'a str,
}

impl HttpAccountStore {
    pub fn new(api_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_url: api_url.into(),
        }
    }
}

#[async_trait]
impl AccountStore for HttpAccountStore {
    async fn register(
        &self,
        email: &str,
        password: &str,
        username: &str,
    ) -> Result<User, AdapterError> {
        let response = self
            .http
            .post(format!("{}/accounts", self.api_url))
            .json(&RegisterRequest {
                username,
                email,
                password,
            })
            .send()
            .await
            .map_err(NetError::from)?
            .error_for_status()
            .map_err(NetError::from)?;
        let user: User = response.json().await.map_err(NetError::from)?;
        info!(user_id = %user.id, "account registered");
        Ok(user)
    }

    async fn login(&self, email: &str, password: &str) -> Result<User, AdapterError> {
        let response = self
            .http
            .post(format!("{}/sessions", self.api_url))
            .json(&LoginRequest { email, password })
            .send()
            .await
            .map_err(NetError::from)?
            .error_for_status()
            .map_err(NetError::from)?;
        let user: User = response.json().await.map_err(NetError::from)?;
        info!(user_id = %user.id, "session opened");
        Ok(user)
    }

    async fn logout(&self) -> Result<(), AdapterError> {
        self.http
            .delete(format!("{}/sessions/current", self.api_url))
            .send()
            .await
            .map_err(NetError::from)?
            .error_for_status()
            .map_err(NetError::from)?;
        info!("session closed");
        Ok(())
    }

    async fn current_identity(&self) -> Result<Option<UserId>, AdapterError> {
        let response = self
            .http
            .get(format!("{}/sessions/current", self.api_url))
            .send()
            .await
            .map_err(NetError::from)?;
        match response.status() {
            StatusCode::NOT_FOUND | StatusCode::UNAUTHORIZED => Ok(None),
            _ => {
                let response = response.error_for_status().map_err(NetError::from)?;
                let user: User = response.json().await.map_err(NetError::from)?;
                Ok(Some(user.id))
            }
        }
    }

    async fn user_by_id(&self, id: &UserId) -> Result<Option<User>, AdapterError> {
        let response = self
            .http
            .get(format!("{}/users/{id}", self.api_url))
            .send()
            .await
            .map_err(NetError::from)?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let response = response.error_for_status().map_err(NetError::from)?;
        let user: User = response.json().await.map_err(NetError::from)?;
        Ok(Some(user))
    }
}
