use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use spy_sketch_engine::models::UserId;

use crate::services::user_service::UserServiceError;
use crate::state::AppState;
use crate::utils::websocket;

// ユーザールートの設定
pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/leaderboard", get(get_leaderboard))
        .route("/:user_id/stats", get(get_user_stats))
        // websocat ws://localhost:8080/api/users/{user_id}/ws
        .route("/:user_id/ws", get(websocket::user_handler))
        .with_state(state)
}

// エラーハンドリング
impl IntoResponse for UserServiceError {
    fn into_response(self) -> Response {
        let status = match self {
            UserServiceError::UserNotFound(_) => StatusCode::NOT_FOUND,
        };

        let body = Json(serde_json::json!({
            "error": self.to_string()
        }));

        (status, body).into_response()
    }
}

// ユーザーの戦績
pub async fn get_user_stats(
    State(state): State<AppState>,
    Path(user_id): Path<UserId>,
) -> Result<impl IntoResponse, UserServiceError> {
    let stats = state.user_service.stats(user_id)?;
    Ok((StatusCode::OK, Json(stats)))
}

// 3戦以上のユーザーの勝率ランキング
pub async fn get_leaderboard(State(state): State<AppState>) -> impl IntoResponse {
    (StatusCode::OK, Json(state.user_service.leaderboard()))
}
