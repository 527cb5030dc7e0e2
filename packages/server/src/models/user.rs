use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use spy_sketch_engine::models::{Role, UserId};
use std::collections::BTreeMap;

/// Sender identity as reported by the chat platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformUser {
    pub id: UserId,
    #[serde(default)]
    pub username: Option<String>,
    pub first_name: String,
    #[serde(default)]
    pub last_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: Option<String>,
    pub first_name: String,
    pub last_name: Option<String>,
    pub games_played: u32,
    pub games_won: u32,
    pub total_score: i64,
    pub roles_played: BTreeMap<Role, u32>,
    pub created_at: DateTime<Utc>,
    pub last_active: DateTime<Utc>,
}

impl User {
    pub fn new(user: &PlatformUser) -> Self {
        let now = Utc::now();
        Self {
            id: user.id,
            username: user.username.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            games_played: 0,
            games_won: 0,
            total_score: 0,
            roles_played: BTreeMap::new(),
            created_at: now,
            last_active: now,
        }
    }

    pub fn display_name(&self) -> String {
        match &self.last_name {
            Some(last) if !last.is_empty() => format!("{} {}", self.first_name, last),
            _ => self.first_name.clone(),
        }
    }

    // 0.0〜1.0
    pub fn win_rate(&self) -> f64 {
        if self.games_played == 0 {
            0.0
        } else {
            self.games_won as f64 / self.games_played as f64
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserStats {
    pub user_id: UserId,
    pub display_name: String,
    pub games_played: u32,
    pub games_won: u32,
    pub win_rate: f64,
    pub total_score: i64,
    pub roles_played: BTreeMap<Role, u32>,
}

impl From<&User> for UserStats {
    fn from(user: &User) -> Self {
        Self {
            user_id: user.id,
            display_name: user.display_name(),
            games_played: user.games_played,
            games_won: user.games_won,
            win_rate: user.win_rate(),
            total_score: user.total_score,
            roles_played: user.roles_played.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub rank: usize,
    pub user_id: UserId,
    pub display_name: String,
    pub games_played: u32,
    pub games_won: u32,
    pub win_rate: f64,
}
