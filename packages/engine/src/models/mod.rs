pub mod config;
pub mod effect;
pub mod game;
pub mod player;
pub mod role;
pub mod round;
pub mod session;
pub mod submission;

pub type ChatId = i64;
pub type UserId = i64;
pub type PlayerId = u32;

pub use config::GameConfig;
pub use effect::{Effect, Message, Notice, PhaseTimer, Recipient, Transition};
pub use game::{Game, GamePhase};
pub use player::{Player, Registrant};
pub use role::{Role, Team};
pub use round::Round;
pub use session::{ChatSession, SessionView};
pub use submission::{Medium, Submission, SubmissionContent};
