use axum::{
    extract::{
        ws::{Message, WebSocket},
        Path, State, WebSocketUpgrade,
    },
    response::IntoResponse,
};
use futures::{sink::SinkExt, stream::StreamExt};
use spy_sketch_engine::models::{ChatId, UserId};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::state::AppState;

// グループチャット宛てのメッセージを購読する
pub async fn chat_handler(
    State(state): State<AppState>,
    Path(chat_id): Path<ChatId>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    let rx = state.hub.chat_channel(chat_id).subscribe();
    ws.on_upgrade(move |socket| handle_socket(socket, rx, format!("chat {}", chat_id)))
}

// 個人宛てのメッセージ（役職・お題・投票用紙）を購読する
pub async fn user_handler(
    State(state): State<AppState>,
    Path(user_id): Path<UserId>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    let rx = state.hub.user_channel(user_id).subscribe();
    ws.on_upgrade(move |socket| handle_socket(socket, rx, format!("user {}", user_id)))
}

pub async fn handle_socket(ws: WebSocket, mut rx: broadcast::Receiver<String>, label: String) {
    info!("New WebSocket connection established for {}", label);
    let (mut sender, mut receiver) = ws.split();

    let label_for_send = label.clone();
    let mut send_task = tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(frame) => {
                    if let Err(e) = sender.send(Message::Text(frame)).await {
                        debug!("Stopped sending to {}: {}", label_for_send, e);
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!("Subscriber of {} lagged, {} messages skipped", label_for_send, skipped);
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    // 受信側は切断の検知のみ（操作はHTTPで受け付ける）
    let mut receive_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            if let Message::Close(_) = msg {
                break;
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => receive_task.abort(),
        _ = &mut receive_task => send_task.abort(),
    }
    info!("WebSocket connection closed for {}", label);
}
