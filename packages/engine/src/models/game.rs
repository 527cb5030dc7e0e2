use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use uuid::Uuid;

use super::{player::Player, role::Role, role::Team, round::Round, ChatId, PlayerId, UserId};
use crate::error::{EntityKind, GameError};

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Game {
    pub id: Uuid,
    pub chat_id: ChatId,
    pub phase: GamePhase,
    pub current_round: u32,
    pub max_rounds: u32, // 目安のみ（上限で打ち切らない）
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub winner: Option<Team>,
    pub players: Vec<Player>,
    pub rounds: Vec<Round>,
}

impl fmt::Display for Game {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Game {{ id: {}, chat_id: {}, phase: {}, round: {}, players: {}, active: {} }}",
            self.id,
            self.chat_id,
            self.phase,
            self.current_round,
            self.players.len(),
            self.active_players().count()
        )
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GamePhase {
    Idle,         // ゲーム開始前・終了後
    Registration, // 参加受付中
    Preparation,  // ラウンド準備
    Creative,     // 創作フェーズ
    Discussion,   // 議論フェーズ
    Voting,       // 投票フェーズ
    Results,      // 結果発表フェーズ
}

impl fmt::Display for GamePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            GamePhase::Idle => "IDLE",
            GamePhase::Registration => "REGISTRATION",
            GamePhase::Preparation => "PREPARATION",
            GamePhase::Creative => "CREATIVE",
            GamePhase::Discussion => "DISCUSSION",
            GamePhase::Voting => "VOTING",
            GamePhase::Results => "RESULTS",
        };
        f.write_str(name)
    }
}

impl Game {
    pub fn new(chat_id: ChatId, max_rounds: u32, players: Vec<Player>) -> Self {
        Game {
            id: Uuid::new_v4(),
            chat_id,
            phase: GamePhase::Preparation,
            current_round: 1,
            max_rounds,
            started_at: Utc::now(),
            finished_at: None,
            winner: None,
            players,
            rounds: vec![Round::new(1)],
        }
    }

    pub fn is_finished(&self) -> bool {
        self.finished_at.is_some()
    }

    pub fn player(&self, id: PlayerId) -> Option<&Player> {
        self.players.iter().find(|p| p.id == id)
    }

    pub(crate) fn player_mut(&mut self, id: PlayerId) -> Option<&mut Player> {
        self.players.iter_mut().find(|p| p.id == id)
    }

    pub fn player_by_user(&self, user_id: UserId) -> Option<&Player> {
        self.players.iter().find(|p| p.user_id == user_id)
    }

    pub fn active_players(&self) -> impl Iterator<Item = &Player> {
        self.players.iter().filter(|p| p.is_active)
    }

    pub fn active_ids(&self) -> BTreeSet<PlayerId> {
        self.active_players().map(|p| p.id).collect()
    }

    pub fn active_roles(&self) -> BTreeMap<PlayerId, Role> {
        self.active_players().map(|p| (p.id, p.role)).collect()
    }

    pub fn round(&self, number: u32) -> Option<&Round> {
        self.rounds.iter().find(|r| r.number == number)
    }

    pub fn current(&self) -> Result<&Round, GameError> {
        self.round(self.current_round).ok_or_else(|| {
            GameError::EntityNotFound(EntityKind::Round, self.round_key(self.current_round))
        })
    }

    pub(crate) fn current_mut(&mut self) -> Result<&mut Round, GameError> {
        let key = self.round_key(self.current_round);
        let number = self.current_round;
        self.rounds
            .iter_mut()
            .find(|r| r.number == number)
            .ok_or(GameError::EntityNotFound(EntityKind::Round, key))
    }

    // ゲームと現在のラウンドのフェーズを揃えて更新する
    pub(crate) fn set_phase(&mut self, phase: GamePhase) -> Result<(), GameError> {
        self.current_mut()?.phase = phase;
        self.phase = phase;
        Ok(())
    }

    pub(crate) fn round_key(&self, number: u32) -> String {
        format!("{}#{}", self.id, number)
    }

    /// Whether the given player ended up on the winning side.
    pub fn is_winner(&self, player: &Player) -> bool {
        self.winner == Some(player.role.team())
    }
}
