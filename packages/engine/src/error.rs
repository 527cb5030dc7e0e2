use std::fmt;

use crate::models::{GamePhase, Medium};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GameError {
    #[error("a game is already in progress in this chat")]
    GameInProgress,
    #[error("there is no active game in this chat")]
    NoActiveGame,
    #[error("you have already joined the game")]
    AlreadyJoined,
    #[error("you are not registered for the upcoming game")]
    NotRegistered,
    #[error("not enough players: {count} registered, at least {min} needed")]
    InsufficientPlayers { count: usize, min: usize },
    #[error("too many players: {count} registered, at most {max} allowed")]
    TooManyPlayers { count: usize, max: usize },
    #[error("this action is only allowed during {expected}, the game is in {actual}")]
    PhaseViolation {
        expected: GamePhase,
        actual: GamePhase,
    },
    #[error("invalid vote: {0}")]
    InvalidVote(VoteRejection),
    #[error("this task expects a {expected} submission, not {got}")]
    WrongMedium { expected: Medium, got: Medium },
    #[error("you are not an active player of this game")]
    NotAParticipant,
    #[error("you have already submitted your work for this round")]
    AlreadySubmitted,
    #[error("{0} not found: {1}")]
    EntityNotFound(EntityKind, String),
}

impl GameError {
    // 整合性が壊れている場合のみtrue（ガード違反はfalse）
    pub fn is_fatal(&self) -> bool {
        matches!(self, GameError::EntityNotFound(..))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum VoteRejection {
    #[error("you cannot vote for yourself")]
    SelfVote,
    #[error("only active players can vote")]
    VoterNotActive,
    #[error("the chosen player is not in the game any more")]
    TargetNotActive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Game,
    Round,
    Player,
    Submission,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityKind::Game => write!(f, "game"),
            EntityKind::Round => write!(f, "round"),
            EntityKind::Player => write!(f, "player"),
            EntityKind::Submission => write!(f, "submission"),
        }
    }
}
