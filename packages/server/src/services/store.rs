use spy_sketch_engine::models::{ChatId, ChatSession, Game};
use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use tracing::{debug, warn};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("storage I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("snapshot could not be encoded or decoded: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Snapshots of chat sessions plus the archive of finished games.
pub trait GameStore: Send + Sync {
    fn save(&self, session: &ChatSession) -> Result<(), StoreError>;
    fn load(&self, chat_id: ChatId) -> Result<Option<ChatSession>, StoreError>;
    fn load_all(&self) -> Result<Vec<ChatSession>, StoreError>;
    fn remove(&self, chat_id: ChatId) -> Result<(), StoreError>;
    fn archive(&self, game: &Game) -> Result<(), StoreError>;
    fn finished_games(&self) -> Result<Vec<Game>, StoreError>;
}

#[derive(Default)]
pub struct MemoryStore {
    sessions: Mutex<HashMap<ChatId, ChatSession>>,
    finished: Mutex<Vec<Game>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl GameStore for MemoryStore {
    fn save(&self, session: &ChatSession) -> Result<(), StoreError> {
        let mut sessions = self.sessions.lock().unwrap_or_else(PoisonError::into_inner);
        sessions.insert(session.chat_id, session.clone());
        Ok(())
    }

    fn load(&self, chat_id: ChatId) -> Result<Option<ChatSession>, StoreError> {
        let sessions = self.sessions.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(sessions.get(&chat_id).cloned())
    }

    fn load_all(&self) -> Result<Vec<ChatSession>, StoreError> {
        let sessions = self.sessions.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(sessions.values().cloned().collect())
    }

    fn remove(&self, chat_id: ChatId) -> Result<(), StoreError> {
        let mut sessions = self.sessions.lock().unwrap_or_else(PoisonError::into_inner);
        sessions.remove(&chat_id);
        Ok(())
    }

    fn archive(&self, game: &Game) -> Result<(), StoreError> {
        let mut finished = self.finished.lock().unwrap_or_else(PoisonError::into_inner);
        finished.push(game.clone());
        Ok(())
    }

    fn finished_games(&self) -> Result<Vec<Game>, StoreError> {
        let finished = self.finished.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(finished.clone())
    }
}

/// One JSON file per chat under `sessions/`, one per finished game under `games/`.
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let root = root.into();
        fs::create_dir_all(root.join("sessions"))?;
        fs::create_dir_all(root.join("games"))?;
        debug!("Using file store at {}", root.display());
        Ok(Self { root })
    }

    fn session_path(&self, chat_id: ChatId) -> PathBuf {
        self.root.join("sessions").join(format!("{}.json", chat_id))
    }

    // 壊れたファイルは読み飛ばす
    fn read_dir<T: serde::de::DeserializeOwned>(dir: &Path) -> Result<Vec<T>, StoreError> {
        let mut items = Vec::new();
        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            match serde_json::from_slice(&fs::read(&path)?) {
                Ok(item) => items.push(item),
                Err(e) => warn!("Skipping unreadable snapshot {}: {}", path.display(), e),
            }
        }
        Ok(items)
    }
}

impl GameStore for FileStore {
    fn save(&self, session: &ChatSession) -> Result<(), StoreError> {
        let path = self.session_path(session.chat_id);
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_vec_pretty(session)?)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }

    fn load(&self, chat_id: ChatId) -> Result<Option<ChatSession>, StoreError> {
        match fs::read(self.session_path(chat_id)) {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn load_all(&self) -> Result<Vec<ChatSession>, StoreError> {
        Self::read_dir(&self.root.join("sessions"))
    }

    fn remove(&self, chat_id: ChatId) -> Result<(), StoreError> {
        match fs::remove_file(self.session_path(chat_id)) {
            Err(e) if e.kind() != ErrorKind::NotFound => Err(e.into()),
            _ => Ok(()),
        }
    }

    fn archive(&self, game: &Game) -> Result<(), StoreError> {
        let path = self.root.join("games").join(format!("{}.json", game.id));
        fs::write(path, serde_json::to_vec_pretty(game)?)?;
        Ok(())
    }

    fn finished_games(&self) -> Result<Vec<Game>, StoreError> {
        let mut games: Vec<Game> = Self::read_dir(&self.root.join("games"))?;
        games.sort_by_key(|g| g.finished_at);
        Ok(games)
    }
}
