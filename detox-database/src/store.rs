//! Chat-scoped storage used by the moderation engine.

use std::collections::HashMap;
use std::hash::Hash;
use std::future::Future;
use std::sync::{Arc, Mutex};

use tokio::sync::{OwnedMutexGuard, RwLock};

use crate::database::Database;
use crate::impls::chat_config::{get_chat_config, put_chat_config};
use crate::impls::user_state::{get_user_state, put_user_state};
use crate::model::{ChatConfig, UserModerationState};

/// Held while a stored record is read, updated and written back.
pub type StoreGuard = OwnedMutexGuard<()>;

/// Storage for per-chat config and per-user ladder state.
///
/// Implementations must serialize read-modify-write cycles on one
/// `(chat, user)` key for as long as the guard from
/// [`ChatStore::lock_user_state`] is alive, and on one chat's config for as
/// long as the guard from [`ChatStore::lock_config`] is alive.
pub trait ChatStore: Send + Sync {
    fn get_config(&self, chat_id: u64) -> impl Future<Output = anyhow::Result<ChatConfig>> + Send;

    fn put_config(
        &self,
        chat_id: u64,
        config: &ChatConfig,
    ) -> impl Future<Output = anyhow::Result<()>> + Send;

    fn get_user_state(
        &self,
        chat_id: u64,
        user_id: u64,
    ) -> impl Future<Output = anyhow::Result<UserModerationState>> + Send;

    fn put_user_state(
        &self,
        chat_id: u64,
        user_id: u64,
        state: &UserModerationState,
    ) -> impl Future<Output = anyhow::Result<()>> + Send;

    fn lock_user_state(
        &self,
        chat_id: u64,
        user_id: u64,
    ) -> impl Future<Output = StoreGuard> + Send;

    fn lock_config(&self, chat_id: u64) -> impl Future<Output = StoreGuard> + Send;
}

/// Apply `edit` to a chat's config and store the result, holding the chat's
/// config lock so concurrent edits of different fields are all kept.
pub async fn update_config<S, F>(store: &S, chat_id: u64, edit: F) -> anyhow::Result<ChatConfig>
where
    S: ChatStore,
    F: FnOnce(&mut ChatConfig) + Send,
{
    let _guard = store.lock_config(chat_id).await;
    let mut config = store.get_config(chat_id).await?;
    edit(&mut config);
    store.put_config(chat_id, &config).await?;
    Ok(config)
}

// Unused entries are dropped once the map grows past this many keys.
const LOCK_PRUNE_THRESHOLD: usize = 1_024;

/// One async mutex per key, created on demand.
#[derive(Clone, Debug)]
pub struct KeyedLocks<K> {
    locks: Arc<Mutex<HashMap<K, Arc<tokio::sync::Mutex<()>>>>>,
}

impl<K> Default for KeyedLocks<K> {
    fn default() -> Self {
        Self {
            locks: Arc::default(),
        }
    }
}

impl<K: Eq + Hash> KeyedLocks<K> {
    pub async fn lock(&self, key: K) -> StoreGuard {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
            if locks.len() > LOCK_PRUNE_THRESHOLD {
                locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            }
            locks.entry(key).or_default().clone()
        };
        lock.lock_owned().await
    }
}

impl ChatStore for Database {
    async fn get_config(&self, chat_id: u64) -> anyhow::Result<ChatConfig> {
        Ok(get_chat_config(self, chat_id).await?.unwrap_or_default())
    }

    async fn put_config(&self, chat_id: u64, config: &ChatConfig) -> anyhow::Result<()> {
        put_chat_config(self, chat_id, config).await
    }

    async fn get_user_state(
        &self,
        chat_id: u64,
        user_id: u64,
    ) -> anyhow::Result<UserModerationState> {
        Ok(get_user_state(self, chat_id, user_id)
            .await?
            .unwrap_or_default())
    }

    async fn put_user_state(
        &self,
        chat_id: u64,
        user_id: u64,
        state: &UserModerationState,
    ) -> anyhow::Result<()> {
        put_user_state(self, chat_id, user_id, state).await
    }

    async fn lock_user_state(&self, chat_id: u64, user_id: u64) -> StoreGuard {
        self.user_locks().lock((chat_id, user_id)).await
    }

    async fn lock_config(&self, chat_id: u64) -> StoreGuard {
        self.config_locks().lock(chat_id).await
    }
}

/// Process-local store, used when no database is configured and in tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
    configs: RwLock<HashMap<u64, ChatConfig>>,
    user_states: RwLock<HashMap<(u64, u64), UserModerationState>>,
    user_locks: KeyedLocks<(u64, u64)>,
    config_locks: KeyedLocks<u64>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ChatStore for MemoryStore {
    async fn get_config(&self, chat_id: u64) -> anyhow::Result<ChatConfig> {
        Ok(self
            .configs
            .read()
            .await
            .get(&chat_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn put_config(&self, chat_id: u64, config: &ChatConfig) -> anyhow::Result<()> {
        self.configs.write().await.insert(chat_id, config.clone());
        Ok(())
    }

    async fn get_user_state(
        &self,
        chat_id: u64,
        user_id: u64,
    ) -> anyhow::Result<UserModerationState> {
        Ok(self
            .user_states
            .read()
            .await
            .get(&(chat_id, user_id))
            .copied()
            .unwrap_or_default())
    }

    async fn put_user_state(
        &self,
        chat_id: u64,
        user_id: u64,
        state: &UserModerationState,
    ) -> anyhow::Result<()> {
        self.user_states
            .write()
            .await
            .insert((chat_id, user_id), *state);
        Ok(())
    }

    async fn lock_user_state(&self, chat_id: u64, user_id: u64) -> StoreGuard {
        self.user_locks.lock((chat_id, user_id)).await
    }

    async fn lock_config(&self, chat_id: u64) -> StoreGuard {
        self.config_locks.lock(chat_id).await
    }
}

/// The store the bot runs on, picked at startup.
#[derive(Clone, Debug)]
pub enum ModerationStore {
    Database(Database),
    Memory(Arc<MemoryStore>),
}

impl ChatStore for ModerationStore {
    async fn get_config(&self, chat_id: u64) -> anyhow::Result<ChatConfig> {
        match self {
            Self::Database(store) => store.get_config(chat_id).await,
            Self::Memory(store) => store.get_config(chat_id).await,
        }
    }

    async fn put_config(&self, chat_id: u64, config: &ChatConfig) -> anyhow::Result<()> {
        match self {
            Self::Database(store) => store.put_config(chat_id, config).await,
            Self::Memory(store) => store.put_config(chat_id, config).await,
        }
    }

    async fn get_user_state(
        &self,
        chat_id: u64,
        user_id: u64,
    ) -> anyhow::Result<UserModerationState> {
        match self {
            Self::Database(store) => store.get_user_state(chat_id, user_id).await,
            Self::Memory(store) => store.get_user_state(chat_id, user_id).await,
        }
    }

    async fn put_user_state(
        &self,
        chat_id: u64,
        user_id: u64,
        state: &UserModerationState,
    ) -> anyhow::Result<()> {
        match self {
            Self::Database(store) => store.put_user_state(chat_id, user_id, state).await,
            Self::Memory(store) => store.put_user_state(chat_id, user_id, state).await,
        }
    }

    async fn lock_user_state(&self, chat_id: u64, user_id: u64) -> StoreGuard {
        match self {
            Self::Database(store) => store.lock_user_state(chat_id, user_id).await,
            Self::Memory(store) => store.lock_user_state(chat_id, user_id).await,
        }
    }

    async fn lock_config(&self, chat_id: u64) -> StoreGuard {
        match self {
            Self::Database(store) => store.lock_config(chat_id).await,
            Self::Memory(store) => store.lock_config(chat_id).await,
        }
    }
}
