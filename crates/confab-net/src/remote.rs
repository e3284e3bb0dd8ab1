//! Remote message store client.
//!
//! Writes go over plain HTTP; reads are push subscriptions carried on
//! per-room websocket streams, where every frame is a full JSON-array
//! snapshot of the subscribed collection.

use std::path::Path;

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::StatusCode;
use serde::Deserialize;
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tracing::{debug, warn};
use uuid::Uuid;

use confab_shared::adapters::RemoteFeed;
use confab_shared::constants::{FEED_CHANNEL_CAPACITY, STORAGE_FILES_PATH, STORAGE_IMAGES_PATH};
use confab_shared::error::AdapterError;
use confab_shared::types::{ChatRoom, Message, MessageId, MessageStatus, MessageType, RoomId};

use crate::config::ws_base_url;
use crate::error::NetError;

/// Remote store client speaking the chat server's REST + stream API.
#[derive(Debug, Clone)]
pub struct HttpRemoteFeed {
    http: reqwest::Client,
    api_url: String,
    stream_url: String,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    url: String,
}

impl HttpRemoteFeed {
    pub fn new(api_url: impl Into<String>) -> Self {
        let api_url = api_url.into();
        let stream_url = ws_base_url(&api_url);
        Self {
            http: reqwest::Client::new(),
            api_url,
            stream_url,
        }
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response, NetError> {
        Ok(response.error_for_status()?)
    }
}

/// Pump full-snapshot frames from a websocket subscription into `tx`
/// until either side goes away.  Closing `tx` is the error signal; the
/// consumer treats a closed feed as "no further updates".
async fn pump_snapshots<T>(url: String, tx: mpsc::Sender<Vec<T>>)
where
    T: serde::de::DeserializeOwned,
{
    let mut ws = match connect_async(url.as_str()).await {
        Ok((ws, _)) => ws,
        Err(e) => {
            warn!(url = %url, error = %e, "remote subscription failed to connect");
            return;
        }
    };

    while let Some(frame) = ws.next().await {
        match frame {
            Ok(WsMessage::Text(text)) => match serde_json::from_str::<Vec<T>>(&text) {
                Ok(snapshot) => {
                    if tx.send(snapshot).await.is_err() {
                        // Subscriber hung up, stop streaming.
                        return;
                    }
                }
                Err(e) => warn!(error = %e, "dropping malformed remote snapshot"),
            },
            Ok(WsMessage::Close(_)) => break,
            Ok(_) => {}
            Err(e) => {
                warn!(url = %url, error = %e, "remote subscription failed");
                break;
            }
        }
    }
    debug!(url = %url, "remote subscription ended");
}

#[async_trait]
impl RemoteFeed for HttpRemoteFeed {
    fn observe_messages(&self, room_id: RoomId) -> mpsc::Receiver<Vec<Message>> {
        let (tx, rx) = mpsc::channel(FEED_CHANNEL_CAPACITY);
        let url = format!("{}/rooms/{room_id}/messages", self.stream_url);
        tokio::spawn(pump_snapshots(url, tx));
        rx
    }

    async fn send_message(&self, message: &Message) -> Result<(), AdapterError> {
        let url = format!(
            "{}/rooms/{}/messages/{}",
            self.api_url, message.room_id, message.id
        );
        let response = self.http.put(url).json(message).send().await.map_err(NetError::from)?;
        Self::check(response).await?;
        Ok(())
    }

    async fn update_message_status(
        &self,
        room_id: RoomId,
        message_id: MessageId,
        status: MessageStatus,
    ) -> Result<(), AdapterError> {
        let url = format!(
            "{}/rooms/{room_id}/messages/{message_id}/status",
            self.api_url
        );
        let response = self
            .http
            .patch(url)
            .json(&serde_json::json!({ "status": status }))
            .send()
            .await
            .map_err(NetError::from)?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(AdapterError::NotFound);
        }
        Self::check(response).await?;
        Ok(())
    }

    async fn upload_file(&self, path: &Path, kind: MessageType) -> Result<String, AdapterError> {
        let prefix = match kind {
            MessageType::Image => STORAGE_IMAGES_PATH,
            MessageType::File => STORAGE_FILES_PATH,
            MessageType::Text => {
                return Err(AdapterError::InvalidArgument(
                    "text messages carry no attachment".into(),
                ))
            }
        };
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| AdapterError::InvalidArgument("path has no file name".into()))?;
        let storage_path = format!("{prefix}{}_{file_name}", Uuid::new_v4());

        let bytes = tokio::fs::read(path).await.map_err(NetError::from)?;
        let response = self
            .http
            .post(format!("{}/files", self.api_url))
            .query(&[("path", storage_path.as_str())])
            .body(bytes)
            .send()
            .await
            .map_err(NetError::from)?;
        let response = Self::check(response).await?;
        let uploaded: UploadResponse = response.json().await.map_err(NetError::from)?;
        Ok(uploaded.url)
    }

    fn observe_rooms(&self) -> mpsc::Receiver<Vec<ChatRoom>> {
        let (tx, rx) = mpsc::channel(FEED_CHANNEL_CAPACITY);
        let url = format!("{}/rooms", self.stream_url);
        tokio::spawn(pump_snapshots(url, tx));
        rx
    }

    async fn create_room(&self, room: &ChatRoom) -> Result<(), AdapterError> {
        let url = format!("{}/rooms/{}", self.api_url, room.id);
        let response = self.http.put(url).json(room).send().await.map_err(NetError::from)?;
        Self::check(response).await?;
        Ok(())
    }
}
