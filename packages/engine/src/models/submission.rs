use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::PlayerId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Medium {
    Drawing,
    Text,
}

impl fmt::Display for Medium {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Medium::Drawing => write!(f, "drawing"),
            Medium::Text => write!(f, "text"),
        }
    }
}

// プレイヤーから届いた作品
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SubmissionContent {
    Photo { file_id: String },
    Text { text: String },
}

impl SubmissionContent {
    pub fn medium(&self) -> Medium {
        match self {
            SubmissionContent::Photo { .. } => Medium::Drawing,
            SubmissionContent::Text { .. } => Medium::Text,
        }
    }

    fn into_value(self) -> String {
        match self {
            SubmissionContent::Photo { file_id } => file_id,
            SubmissionContent::Text { text } => text,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Submission {
    pub player_id: PlayerId,
    pub task: String,
    pub medium: Medium,
    pub content: Option<String>, // 画像ならfile_id、テキストなら本文
    pub submitted_at: Option<DateTime<Utc>>,
}

impl Submission {
    pub fn pending(player_id: PlayerId, task: String, medium: Medium) -> Self {
        Self {
            player_id,
            task,
            medium,
            content: None,
            submitted_at: None,
        }
    }

    pub fn is_submitted(&self) -> bool {
        self.content.is_some()
    }

    pub(crate) fn fill(&mut self, content: SubmissionContent) {
        self.content = Some(content.into_value());
        self.submitted_at = Some(Utc::now());
    }
}
