use serde::{Deserialize, Serialize};

use super::{game::Game, game::GamePhase, player::Registrant, ChatId, PlayerId};

/// Everything one chat owns: the registration list and at most one running game.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatSession {
    pub chat_id: ChatId,
    pub registrants: Vec<Registrant>,
    pub game: Option<Game>,
}

impl ChatSession {
    pub fn new(chat_id: ChatId) -> Self {
        ChatSession {
            chat_id,
            registrants: Vec::new(),
            game: None,
        }
    }

    pub fn phase(&self) -> GamePhase {
        match &self.game {
            Some(game) if !game.is_finished() => game.phase,
            _ if !self.registrants.is_empty() => GamePhase::Registration,
            _ => GamePhase::Idle,
        }
    }

    // 役職を伏せた公開用の状態
    pub fn view(&self) -> SessionView {
        let game = self.game.as_ref();
        SessionView {
            chat_id: self.chat_id,
            phase: self.phase(),
            round: game.map(|g| g.current_round),
            max_rounds: game.map(|g| g.max_rounds),
            registrants: self.registrants.iter().map(|r| r.name.clone()).collect(),
            players: game
                .map(|g| {
                    g.players
                        .iter()
                        .map(|p| PlayerView {
                            id: p.id,
                            name: p.name.clone(),
                            is_active: p.is_active,
                            score: p.score,
                        })
                        .collect()
                })
                .unwrap_or_default(),
            votes_cast: game
                .and_then(|g| g.current().ok())
                .map(|r| r.tally.len())
                .unwrap_or(0),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionView {
    pub chat_id: ChatId,
    pub phase: GamePhase,
    pub round: Option<u32>,
    pub max_rounds: Option<u32>,
    pub registrants: Vec<String>,
    pub players: Vec<PlayerView>,
    pub votes_cast: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerView {
    pub id: PlayerId,
    pub name: String,
    pub is_active: bool,
    pub score: i32,
}
