use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

use super::{game::Game, game::GamePhase, ChatId, UserId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum Recipient {
    Chat(ChatId), // グループチャット
    User(UserId), // 個人宛て
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Message {
    Text { text: String },
    Photo { file_id: String, caption: String },
}

impl Message {
    pub fn text(text: impl Into<String>) -> Self {
        Message::Text { text: text.into() }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub recipient: Recipient,
    pub message: Message,
}

/// Timed transitions. Each one leaves exactly one phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Transition {
    BeginCreative,
    BeginDiscussion,
    BeginVoting,
    CloseVoting,
}

impl Transition {
    pub fn from_phase(self) -> GamePhase {
        match self {
            Transition::BeginCreative => GamePhase::Preparation,
            Transition::BeginDiscussion => GamePhase::Creative,
            Transition::BeginVoting => GamePhase::Discussion,
            Transition::CloseVoting => GamePhase::Voting,
        }
    }

    pub fn leaving(phase: GamePhase) -> Option<Transition> {
        match phase {
            GamePhase::Preparation => Some(Transition::BeginCreative),
            GamePhase::Creative => Some(Transition::BeginDiscussion),
            GamePhase::Discussion => Some(Transition::BeginVoting),
            GamePhase::Voting => Some(Transition::CloseVoting),
            GamePhase::Idle | GamePhase::Registration | GamePhase::Results => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseTimer {
    pub game_id: Uuid,
    pub round_number: u32,
    pub transition: Transition,
    pub delay: Duration,
}

// 状態遷移の結果として外側（サーバー）が実行すべき処理
#[derive(Debug, Clone)]
pub enum Effect {
    Notify(Notice),
    Schedule(PhaseTimer),
    CancelTimer,
    GameFinished(Box<Game>),
}

impl Effect {
    pub fn to_chat(chat_id: ChatId, message: Message) -> Self {
        Effect::Notify(Notice {
            recipient: Recipient::Chat(chat_id),
            message,
        })
    }

    pub fn to_user(user_id: UserId, message: Message) -> Self {
        Effect::Notify(Notice {
            recipient: Recipient::User(user_id),
            message,
        })
    }
}
