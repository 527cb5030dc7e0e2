use dotenvy::dotenv;
use std::sync::Once;

static INIT: Once = Once::new();

pub fn setup_test_env() {
    INIT.call_once(|| {
        dotenv().ok();
        // テストでは永続化せず、フェーズのタイマーも発火しないよう長めにする
        std::env::remove_var("GAME_STORE_DIR");
        for var in [
            "PREPARATION_TIME",
            "CREATIVE_TIME",
            "DISCUSSION_TIME",
            "VOTING_TIME",
        ] {
            std::env::set_var(var, "3600");
        }
        if std::env::var("RNG_SEED").is_err() {
            std::env::set_var("RNG_SEED", "42");
        }
    });
}
