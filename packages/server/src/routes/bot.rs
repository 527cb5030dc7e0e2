use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::post,
    Json, Router,
};
use spy_sketch_engine::models::ChatId;

use crate::error::ApiError;
use crate::models::request::{BotCommandRequest, BotReply};
use crate::services::commands::{self, BotCommand};
use crate::state::AppState;

pub fn routes(state: AppState) -> Router {
    Router::new()
        // チャットに届いたコマンドを処理する
        // curl -X POST http://localhost:8080/api/bot/{chat_id} -H 'Content-Type: application/json' \
        //   -d '{"user": {"id": 1, "first_name": "Ann"}, "text": "/join"}'
        .route("/:chat_id", post(handle_command))
        .with_state(state)
}

async fn handle_command(
    State(state): State<AppState>,
    Path(chat_id): Path<ChatId>,
    Json(req): Json<BotCommandRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let Some(command) = BotCommand::parse(&req.text) else {
        return Ok((StatusCode::OK, Json(BotReply { reply: None })));
    };
    let reply = commands::dispatch(state, chat_id, &req.user, command).await?;
    Ok((StatusCode::OK, Json(BotReply { reply: Some(reply) })))
}
