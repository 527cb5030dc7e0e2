use std::env;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct GameConfig {
    pub min_players: usize,
    pub max_players: usize,
    // 各フェーズの制限時間（秒）
    pub preparation_seconds: u64,
    pub creative_seconds: u64,
    pub discussion_seconds: u64,
    pub voting_seconds: u64,
    // 役職の配分
    pub spy_ratio: f64,
    pub double_agent_enabled: bool,
    pub double_agent_probability: f64,
    pub max_rounds: u32,
    // 指定するとゲームの乱数が再現可能になる
    pub rng_seed: Option<u64>,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            min_players: 3,
            max_players: 20,
            preparation_seconds: 60,
            creative_seconds: 120,
            discussion_seconds: 240,
            voting_seconds: 60,
            spy_ratio: 0.25,
            double_agent_enabled: true,
            double_agent_probability: 0.15,
            max_rounds: 3,
            rng_seed: None,
        }
    }
}

impl GameConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let min_players = parse_var("MIN_PLAYERS").unwrap_or(defaults.min_players).max(1);
        let max_players = parse_var("MAX_PLAYERS")
            .unwrap_or(defaults.max_players)
            .max(min_players);
        let preparation_seconds =
            parse_var("PREPARATION_TIME").unwrap_or(defaults.preparation_seconds);
        let creative_seconds = parse_var("CREATIVE_TIME").unwrap_or(defaults.creative_seconds);
        let discussion_seconds =
            parse_var("DISCUSSION_TIME").unwrap_or(defaults.discussion_seconds);
        let voting_seconds = parse_var("VOTING_TIME").unwrap_or(defaults.voting_seconds);
        let spy_ratio = parse_var::<f64>("SPY_RATIO")
            .unwrap_or(defaults.spy_ratio)
            .clamp(0.0, 1.0);
        let double_agent_enabled = env::var("DOUBLE_AGENT_ENABLED")
            .map(|v| v == "true")
            .unwrap_or(defaults.double_agent_enabled);
        let double_agent_probability = parse_var::<f64>("DOUBLE_AGENT_PROBABILITY")
            .unwrap_or(defaults.double_agent_probability)
            .clamp(0.0, 1.0);
        let max_rounds = parse_var("MAX_ROUNDS").unwrap_or(defaults.max_rounds);
        let rng_seed = parse_var("RNG_SEED");

        Self {
            min_players,
            max_players,
            preparation_seconds,
            creative_seconds,
            discussion_seconds,
            voting_seconds,
            spy_ratio,
            double_agent_enabled,
            double_agent_probability,
            max_rounds,
            rng_seed,
        }
    }

    pub fn preparation_time(&self) -> Duration {
        Duration::from_secs(self.preparation_seconds)
    }

    pub fn creative_time(&self) -> Duration {
        Duration::from_secs(self.creative_seconds)
    }

    pub fn discussion_time(&self) -> Duration {
        Duration::from_secs(self.discussion_seconds)
    }

    pub fn voting_time(&self) -> Duration {
        Duration::from_secs(self.voting_seconds)
    }
}

fn parse_var<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.trim().parse::<T>().ok())
}
