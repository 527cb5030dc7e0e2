pub mod commands;
pub mod game_service;
pub mod messaging;
pub mod scheduler;
pub mod store;
pub mod user_service;
