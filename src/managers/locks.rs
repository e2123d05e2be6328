use dashmap::DashMap;
use poise::serenity_prelude::{ChannelId, UserId};
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard, OwnedRwLockReadGuard, OwnedRwLockWriteGuard, RwLock};

/// Lock registry for seasons, channels and participants.
///
/// Transitions hold a season's write half, participant actions the read
/// half, so players never observe a half-applied transition. A participant's
/// own create-or-update additionally runs under their user lock. Host commands
/// on one channel are serialized by the channel lock, which is taken before any
/// season lock.
#[derive(Default)]
pub struct SeasonLocks {
    seasons: DashMap<u64, Arc<RwLock<()>>>,
    users: DashMap<(u64, UserId), Arc<Mutex<()>>>,
    channels: DashMap<ChannelId, Arc<Mutex<()>>>,
    host_threads: DashMap<u64, Arc<Mutex<()>>>,
}

impl SeasonLocks {
    pub fn new() -> Self {
        Self::default()
    }

    fn season(&self, season_id: u64) -> Arc<RwLock<()>> {
        self.seasons.entry(season_id).or_default().clone()
    }

    /// Exclusive access for transitions and scoring
    pub async fn write(&self, season_id: u64) -> OwnedRwLockWriteGuard<()> {
        self.season(season_id).write_owned().await
    }

    /// Shared access for participant actions
    pub async fn read(&self, season_id: u64) -> OwnedRwLockReadGuard<()> {
        self.season(season_id).read_owned().await
    }

    pub async fn user(&self, season_id: u64, user_id: UserId) -> OwnedMutexGuard<()> {
        let lock = self.users.entry((season_id, user_id)).or_default().clone();
        lock.lock_owned().await
    }

    pub async fn channel(&self, channel_id: ChannelId) -> OwnedMutexGuard<()> {
        let lock = self.channels.entry(channel_id).or_default().clone();
        lock.lock_owned().await
    }

    /// Guards lazy creation of a season's host thread; taken after the season lock
    pub async fn host_thread(&self, season_id: u64) -> OwnedMutexGuard<()> {
        let lock = self.host_threads.entry(season_id).or_default().clone();
        lock.lock_owned().await
    }

    /// Drop the locks of a deleted season
    pub fn forget(&self, season_id: u64) {
        self.seasons.remove(&season_id);
        self.host_threads.remove(&season_id);
        self.users.retain(|(season, _), _| *season != season_id);
    }
}

pub type SharedSeasonLocks = Arc<SeasonLocks>;

pub fn create_shared_season_locks() -> SharedSeasonLocks {
    Arc::new(SeasonLocks::new())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_readers_wait_for_writer() {
        let locks = create_shared_season_locks();
        let writer = locks.write(1).await;

        let pending = {
            let locks = locks.clone();
            tokio::spawn(async move {
                let _reader = locks.read(1).await;
            })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!pending.is_finished());

        drop(writer);
        pending.await.unwrap();
    }

    #[tokio::test]
    async fn test_readers_share_a_season() {
        let locks = SeasonLocks::new();
        let _a = locks.read(1).await;
        let _b = locks.read(1).await;
        let _other = locks.write(2).await;
    }
}
