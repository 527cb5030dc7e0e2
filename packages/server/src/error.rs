use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use spy_sketch_engine::GameError;
use tracing::error;

use crate::services::user_service::UserServiceError;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Game(#[from] GameError),
    #[error(transparent)]
    User(#[from] UserServiceError),
}

fn game_status(e: &GameError) -> StatusCode {
    match e {
        GameError::NoActiveGame | GameError::NotRegistered => StatusCode::NOT_FOUND,
        GameError::GameInProgress
        | GameError::AlreadyJoined
        | GameError::AlreadySubmitted
        | GameError::PhaseViolation { .. } => StatusCode::CONFLICT,
        GameError::InsufficientPlayers { .. }
        | GameError::TooManyPlayers { .. }
        | GameError::InvalidVote(_)
        | GameError::WrongMedium { .. }
        | GameError::NotAParticipant => StatusCode::BAD_REQUEST,
        GameError::EntityNotFound(..) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

// エラーハンドリング
impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let e = match self {
            ApiError::Game(e) => e,
            ApiError::User(e) => return e.into_response(),
        };
        let (status, message) = match &e {
            e if e.is_fatal() => {
                error!("Internal error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal server error".to_string(),
                )
            }
            e => (game_status(e), e.to_string()),
        };

        let body = Json(serde_json::json!({
            "error": message
        }));

        (status, body).into_response()
    }
}
