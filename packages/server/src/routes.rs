use crate::state::AppState;
use axum::{routing::get, Router};

use crate::utils::websocket;

mod bot;
mod game;
mod user;

pub fn create_routes(state: AppState) -> Router {
    Router::new()
        .nest("/api/bot", bot::routes(state.clone()))
        .nest("/api/game", game::routes(state.clone()))
        .nest("/api/users", user::routes(state.clone()))
        // websocat ws://localhost:8080/api/chat/{chat_id}/ws
        .route(
            "/api/chat/:chat_id/ws",
            get(websocket::chat_handler).with_state(state),
        )
}
