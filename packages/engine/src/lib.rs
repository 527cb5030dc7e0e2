//! Rules of the spy sketch party game.
//!
//! Nothing in this crate does I/O. [`GameStateMachine`] mutates a
//! [`ChatSession`] and hands back [`Effect`]s for the server to deliver.

pub mod error;
pub mod models;
pub mod role_assigner;
pub mod scoring;
pub mod state_machine;
pub mod task_provider;
pub mod vote_tally;
pub mod win_condition;

pub use error::{EntityKind, GameError, VoteRejection};
pub use models::{ChatSession, Effect, GameConfig, GamePhase, Role, Team};
pub use role_assigner::RoleAssigner;
pub use scoring::score_round;
pub use state_machine::GameStateMachine;
pub use task_provider::{Task, TaskProvider, TemplateTaskProvider};
pub use vote_tally::{Resolution, VoteTally};
pub use win_condition::check_game_end;
