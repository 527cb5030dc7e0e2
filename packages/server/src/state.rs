use rand::rngs::StdRng;
use rand::SeedableRng;
use spy_sketch_engine::models::{ChatId, ChatSession, GameConfig, PhaseTimer};
use spy_sketch_engine::{GameStateMachine, TemplateTaskProvider};
use std::sync::{MutexGuard, PoisonError};
use std::{collections::HashMap, sync::Arc};
use tokio::sync::Mutex;
use tracing::error;

use crate::services::messaging::{BroadcastGateway, ChannelHub, MessageGateway};
use crate::services::scheduler::{Scheduler, TimerHandle};
use crate::services::store::{FileStore, GameStore, MemoryStore};
use crate::services::user_service::UserService;
use crate::utils::config::CONFIG;

/// A chat's session together with its pending phase timer.
pub struct SessionEntry {
    pub session: ChatSession,
    pub timer: Option<(PhaseTimer, TimerHandle)>,
}

impl SessionEntry {
    pub fn new(chat_id: ChatId) -> Self {
        Self {
            session: ChatSession::new(chat_id),
            timer: None,
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub sessions: Arc<Mutex<HashMap<ChatId, Arc<Mutex<SessionEntry>>>>>,
    pub machine: Arc<GameStateMachine>,
    pub gateway: Arc<dyn MessageGateway>,
    pub hub: Arc<ChannelHub>,
    pub scheduler: Scheduler,
    pub user_service: UserService,
    pub store: Arc<dyn GameStore>,
    rng: Arc<std::sync::Mutex<StdRng>>,
}

impl AppState {
    pub fn new() -> Self {
        let state = Self::with_config(GameConfig::from_env());
        match &CONFIG.game_store_dir {
            Some(dir) => match FileStore::open(dir) {
                Ok(store) => state.with_store(Arc::new(store)),
                Err(e) => {
                    error!("Cannot open game store at {}: {}", dir.display(), e);
                    state
                }
            },
            None => state,
        }
    }

    pub fn with_config(config: GameConfig) -> Self {
        let rng = match config.rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let hub = Arc::new(ChannelHub::new());
        let tasks = Arc::new(TemplateTaskProvider::default());

        AppState {
            sessions: Arc::new(Mutex::new(HashMap::new())),
            machine: Arc::new(GameStateMachine::new(config, tasks)),
            gateway: Arc::new(BroadcastGateway::new(hub.clone())),
            hub,
            scheduler: Scheduler::new(),
            user_service: UserService::new(),
            store: Arc::new(MemoryStore::new()),
            rng: Arc::new(std::sync::Mutex::new(rng)),
        }
    }

    pub fn with_gateway(mut self, gateway: Arc<dyn MessageGateway>) -> Self {
        self.gateway = gateway;
        self
    }

    pub fn with_store(mut self, store: Arc<dyn GameStore>) -> Self {
        self.store = store;
        self
    }

    // マップのロックは参照の取得中だけ保持する
    pub async fn session_entry(&self, chat_id: ChatId) -> Arc<Mutex<SessionEntry>> {
        let mut sessions = self.sessions.lock().await;
        sessions
            .entry(chat_id)
            .or_insert_with(|| Arc::new(Mutex::new(SessionEntry::new(chat_id))))
            .clone()
    }

    pub async fn existing_session(&self, chat_id: ChatId) -> Option<Arc<Mutex<SessionEntry>>> {
        self.sessions.lock().await.get(&chat_id).cloned()
    }

    pub fn rng(&self) -> MutexGuard<'_, StdRng> {
        self.rng.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}
