//! Per-guild write serialization
//!
//! Every mutating service method holds its guild's lock across the
//! read-validate-write sequence, so two moderators editing the same guild
//! never interleave. Different guilds never contend.

use std::sync::Arc;

use dashmap::DashMap;
use haven_core::Snowflake;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Registry of async mutexes keyed by guild id
#[derive(Clone, Default)]
pub struct GuildLocks {
    locks: Arc<DashMap<Snowflake, Arc<Mutex<()>>>>,
}

impl GuildLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for and hold the guild's lock until the guard is dropped
    pub async fn acquire(&self, guild_id: Snowflake) -> OwnedMutexGuard<()> {
        // Clone the Arc out so the DashMap shard lock is released before awaiting
        let lock = Arc::clone(self.locks.entry(guild_id).or_default().value());
        lock.lock_owned().await
    }

    /// Number of guilds that have been locked at least once
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}

impl std::fmt::Debug for GuildLocks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GuildLocks").field("guilds", &self.len()).finish()
    }
}
