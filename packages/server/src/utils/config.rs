use once_cell::sync::Lazy;
use std::env;
use std::path::PathBuf;

pub static CONFIG: Lazy<ServerConfig> = Lazy::new(ServerConfig::new);

pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub cors_origin: String,
    // 未設定ならメモリ上にのみ保存する
    pub game_store_dir: Option<PathBuf>,
}

impl ServerConfig {
    fn new() -> Self {
        Self {
            host: env::var("SERVER_HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: env::var("SERVER_PORT")
                .ok()
                .and_then(|v| v.parse::<u16>().ok())
                .unwrap_or(8080),
            cors_origin: env::var("CORS_ORIGIN")
                .unwrap_or_else(|_| "http://localhost:3000".to_string()),
            game_store_dir: env::var("GAME_STORE_DIR")
                .ok()
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from),
        }
    }
}
