use serde::{Deserialize, Serialize};
use spy_sketch_engine::models::{PlayerId, SubmissionContent, UserId};

use super::user::PlatformUser;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoteRequest {
    pub user_id: UserId,
    // 省略時は現在のラウンド
    #[serde(default)]
    pub round: Option<u32>,
    pub target_player_id: PlayerId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmissionRequest {
    pub user_id: UserId,
    pub content: SubmissionContent,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotCommandRequest {
    pub user: PlatformUser,
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotReply {
    pub reply: Option<String>,
}
