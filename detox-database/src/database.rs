use sqlx::{PgPool, migrate::Migrator};

use crate::cache::CacheService;
use crate::store::KeyedLocks;

/// Compile-time discovered SQLx migrations for the `detox-database` crate.
pub static MIGRATOR: Migrator = sqlx::migrate!();

/// Shared database handle passed across crates.
#[derive(Clone, Debug)]
pub struct Database {
    pool: PgPool,
    cache: CacheService,
    user_locks: KeyedLocks<(u64, u64)>,
    config_locks: KeyedLocks<u64>,
}

impl Database {
    /// Create a database handle from an existing pool.
    pub fn new(pool: PgPool) -> Self {
        Self::with_cache(pool, CacheService::disabled("detox:prod"))
    }

    /// Create a database handle from an existing pool and cache service.
    pub fn with_cache(pool: PgPool, cache: CacheService) -> Self {
        Self {
            pool,
            cache,
            user_locks: KeyedLocks::default(),
            config_locks: KeyedLocks::default(),
        }
    }

    /// Expose the underlying pool for query modules.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Expose the cache service for query modules.
    pub fn cache(&self) -> &CacheService {
        &self.cache
    }

    /// Per-`(chat, user)` locks guarding moderation state updates.
    pub fn user_locks(&self) -> &KeyedLocks<(u64, u64)> {
        &self.user_locks
    }

    /// Per-chat locks guarding config edits.
    pub fn config_locks(&self) -> &KeyedLocks<u64> {
        &self.config_locks
    }
}
