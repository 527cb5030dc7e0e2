use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use spy_sketch_engine::models::ChatId;

use crate::error::ApiError;
use crate::models::request::{SubmissionRequest, VoteRequest};
use crate::services::game_service;
use crate::state::AppState;

pub fn routes(state: AppState) -> Router {
    Router::new()
        .nest(
            "/:chat_id",
            Router::new()
                // ゲームの基本操作
                .route("/start", post(start_game))
                .route("/end", post(end_game_handler))
                .route("/state", get(get_game_state))
                // プレイヤーの行動
                .route("/vote", post(cast_vote_handler))
                .route("/submission", post(submission_handler))
                // ゲーム進行の管理（タイマーを待たずに次のフェーズへ）
                .route("/phase/next", post(advance_phase_handler)),
        )
        .with_state(state)
}

pub async fn start_game(
    State(state): State<AppState>,
    Path(chat_id): Path<ChatId>,
) -> Result<impl IntoResponse, ApiError> {
    let view = game_service::start_game(state, chat_id).await?;
    Ok((StatusCode::OK, Json(view)))
}

pub async fn get_game_state(
    Path(chat_id): Path<ChatId>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    let view = game_service::get_game_state(state, chat_id).await;
    (StatusCode::OK, Json(view))
}

async fn end_game_handler(
    State(state): State<AppState>,
    Path(chat_id): Path<ChatId>,
) -> Result<impl IntoResponse, ApiError> {
    let view = game_service::end_game(state, chat_id).await?;
    Ok((StatusCode::OK, Json(view)))
}

async fn cast_vote_handler(
    State(state): State<AppState>,
    Path(chat_id): Path<ChatId>,
    Json(vote): Json<VoteRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let view = game_service::cast_vote(state, chat_id, vote).await?;
    Ok((StatusCode::OK, Json(view)))
}

async fn submission_handler(
    State(state): State<AppState>,
    Path(chat_id): Path<ChatId>,
    Json(req): Json<SubmissionRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let view = game_service::submit(state, chat_id, req.user_id, req.content).await?;
    Ok((StatusCode::OK, Json(view)))
}

async fn advance_phase_handler(
    State(state): State<AppState>,
    Path(chat_id): Path<ChatId>,
) -> Result<impl IntoResponse, ApiError> {
    let view = game_service::force_next_phase(state, chat_id).await?;
    Ok((StatusCode::OK, Json(view)))
}
