use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use spy_sketch_engine::models::{ChatId, Message, Notice, Recipient, UserId};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::broadcast;
use tracing::warn;

#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    #[error("nobody is listening on {0:?}")]
    NoListener(Recipient),
    #[error("failed to encode message: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Outbound side of the chat platform.
pub trait MessageGateway: Send + Sync {
    fn send_to_chat(&self, chat_id: ChatId, text: &str) -> Result<(), DeliveryError>;
    fn send_to_user(&self, user_id: UserId, text: &str) -> Result<(), DeliveryError>;
    fn send_photo_to_chat(
        &self,
        chat_id: ChatId,
        file_id: &str,
        caption: &str,
    ) -> Result<(), DeliveryError>;
    fn send_photo_to_user(
        &self,
        user_id: UserId,
        file_id: &str,
        caption: &str,
    ) -> Result<(), DeliveryError>;
}

// 送信失敗はログに残すだけで、処理は止めない
pub fn deliver(gateway: &dyn MessageGateway, notice: &Notice) {
    let result = match (notice.recipient, &notice.message) {
        (Recipient::Chat(id), Message::Text { text }) => gateway.send_to_chat(id, text),
        (Recipient::User(id), Message::Text { text }) => gateway.send_to_user(id, text),
        (Recipient::Chat(id), Message::Photo { file_id, caption }) => {
            gateway.send_photo_to_chat(id, file_id, caption)
        }
        (Recipient::User(id), Message::Photo { file_id, caption }) => {
            gateway.send_photo_to_user(id, file_id, caption)
        }
    };
    if let Err(e) = result {
        warn!("Failed to deliver message to {:?}: {}", notice.recipient, e);
    }
}

/// JSON frame pushed to WebSocket subscribers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutboundMessage {
    pub recipient: Recipient,
    pub message: Message,
    pub sent_at: DateTime<Utc>,
}

/// One broadcast channel per chat and per user.
#[derive(Default)]
pub struct ChannelHub {
    chats: Mutex<HashMap<ChatId, broadcast::Sender<String>>>,
    users: Mutex<HashMap<UserId, broadcast::Sender<String>>>,
}

impl ChannelHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn chat_channel(&self, chat_id: ChatId) -> broadcast::Sender<String> {
        let mut chats = self.chats.lock().unwrap_or_else(PoisonError::into_inner);
        chats
            .entry(chat_id)
            .or_insert_with(|| broadcast::channel(1000).0)
            .clone()
    }

    pub fn user_channel(&self, user_id: UserId) -> broadcast::Sender<String> {
        let mut users = self.users.lock().unwrap_or_else(PoisonError::into_inner);
        users
            .entry(user_id)
            .or_insert_with(|| broadcast::channel(1000).0)
            .clone()
    }

    fn publish(&self, recipient: Recipient, message: Message) -> Result<(), DeliveryError> {
        let tx = match recipient {
            Recipient::Chat(id) => self.chat_channel(id),
            Recipient::User(id) => self.user_channel(id),
        };
        let frame = serde_json::to_string(&OutboundMessage {
            recipient,
            message,
            sent_at: Utc::now(),
        })?;
        tx.send(frame)
            .map(|_| ())
            .map_err(|_| DeliveryError::NoListener(recipient))
    }
}

/// Gateway that fans messages out to the hub's WebSocket subscribers.
#[derive(Clone)]
pub struct BroadcastGateway {
    hub: Arc<ChannelHub>,
}

impl BroadcastGateway {
    pub fn new(hub: Arc<ChannelHub>) -> Self {
        Self { hub }
    }
}

impl MessageGateway for BroadcastGateway {
    fn send_to_chat(&self, chat_id: ChatId, text: &str) -> Result<(), DeliveryError> {
        self.hub.publish(Recipient::Chat(chat_id), Message::text(text))
    }

    fn send_to_user(&self, user_id: UserId, text: &str) -> Result<(), DeliveryError> {
        self.hub.publish(Recipient::User(user_id), Message::text(text))
    }

    fn send_photo_to_chat(
        &self,
        chat_id: ChatId,
        file_id: &str,
        caption: &str,
    ) -> Result<(), DeliveryError> {
        self.hub.publish(
            Recipient::Chat(chat_id),
            Message::Photo {
                file_id: file_id.to_string(),
                caption: caption.to_string(),
            },
        )
    }

    fn send_photo_to_user(
        &self,
        user_id: UserId,
        file_id: &str,
        caption: &str,
    ) -> Result<(), DeliveryError> {
        self.hub.publish(
            Recipient::User(user_id),
            Message::Photo {
                file_id: file_id.to_string(),
                caption: caption.to_string(),
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subscriber_receives_json_frame() {
        let hub = Arc::new(ChannelHub::new());
        let gateway = BroadcastGateway::new(hub.clone());
        let mut rx = hub.chat_channel(-5).subscribe();

        gateway.send_to_chat(-5, "hello agents").unwrap();

        let frame: OutboundMessage = serde_json::from_str(&rx.try_recv().unwrap()).unwrap();
        assert_eq!(frame.recipient, Recipient::Chat(-5));
        assert_eq!(frame.message, Message::text("hello agents"));
    }

    #[test]
    fn test_missing_listener_is_reported() {
        let gateway = BroadcastGateway::new(Arc::new(ChannelHub::new()));
        let err = gateway.send_photo_to_user(9, "file", "caption").unwrap_err();
        assert!(matches!(err, DeliveryError::NoListener(Recipient::User(9))));
    }
}
