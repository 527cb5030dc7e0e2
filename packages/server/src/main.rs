use anyhow::Context;
use axum::http::{self, HeaderValue, Method};
use dotenvy::dotenv;
use env_logger::Builder;
use log::LevelFilter;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use spy_sketch_server::{app, services::game_service, state::AppState, utils::config::CONFIG};

// ログ設定
fn init_logger() {
    let mut builder = Builder::new();
    builder
        .filter_level(LevelFilter::Info)
        .filter_module("spy_sketch_engine", LevelFilter::Debug)
        .filter_module("spy_sketch_server", LevelFilter::Debug)
        .filter_module("tower_http", LevelFilter::Debug)
        .filter_module("axum", LevelFilter::Debug)
        .format_timestamp(Some(env_logger::TimestampPrecision::Millis))
        .format_target(true)
        .parse_env("RUST_LOG")
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 環境変数をロード
    if let Err(e) = dotenv() {
        eprintln!("Warning: .envファイルの読み込みに失敗しました: {}", e);
    }

    init_logger(); // ロガーの初期化

    let state = AppState::new();
    game_service::restore_sessions(&state).await;

    // CORSレイヤーの設定
    let origin = CONFIG
        .cors_origin
        .parse::<HeaderValue>()
        .context("CORS_ORIGIN is not a valid header value")?;
    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([http::header::CONTENT_TYPE]);

    // ルーティングの設定
    let app = app::create_app_with_state(state)
        .layer(cors) // CORSレイヤーを追加
        .layer(
            TraceLayer::new_for_http() // HTTPトレースログを有効化
                .make_span_with(|request: &http::Request<_>| {
                    tracing::info_span!(
                        "HTTP request",
                        method = %request.method(),
                        uri = %request.uri(),
                    )
                }),
        );

    // サーバーの起動
    let addr = format!("{}:{}", CONFIG.host, CONFIG.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;

    log::info!("サーバーを起動しました: http://{}", addr);
    axum::serve(listener, app).await?;
    Ok(())
}
