use async_trait::async_trait;
use poise::serenity_prelude::{ChannelId, UserId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

use crate::error::{BotError, Result};
use crate::models::{ChannelBinding, Participant, PromptSuggestion, Response, Season, Vote};
use crate::state::{SharedStore, Store, Write, WriteBatch};

const SCHEMA_VERSION: u32 = 1;

/// Every table of the game, as persisted on disk
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GameTables {
    /// Schema version
    pub version: u32,

    /// Next entity id to hand out
    pub next_id: u64,

    pub seasons: BTreeMap<u64, Season>,

    /// Channel ID -> binding
    pub bindings: BTreeMap<u64, ChannelBinding>,

    pub participants: BTreeMap<u64, Participant>,
    pub responses: BTreeMap<u64, Response>,
    pub votes: BTreeMap<u64, Vote>,

    #[serde(default)]
    pub prompts: BTreeMap<u64, PromptSuggestion>,
}

impl Default for GameTables {
    fn default() -> Self {
        Self {
            version: SCHEMA_VERSION,
            next_id: 1,
            seasons: BTreeMap::new(),
            bindings: BTreeMap::new(),
            participants: BTreeMap::new(),
            responses: BTreeMap::new(),
            votes: BTreeMap::new(),
            prompts: BTreeMap::new(),
        }
    }
}

impl GameTables {
    /// Load from file or create new
    pub async fn load(path: &str) -> Result<Self> {
        match tokio::fs::read_to_string(path).await {
            Ok(content) => serde_json::from_str(&content).map_err(|e| BotError::ConfigParse {
                path: path.to_string(),
                source: e,
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(BotError::StateLoad {
                path: path.to_string(),
                source: e,
            }),
        }
    }

    /// Save to file atomically
    pub async fn save(&self, path: &str) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;

        let temp_path = format!("{}.tmp", path);
        tokio::fs::write(&temp_path, &content)
            .await
            .map_err(|e| BotError::StateSave {
                path: path.to_string(),
                source: e,
            })?;

        tokio::fs::rename(&temp_path, path)
            .await
            .map_err(|e| BotError::StateSave {
                path: path.to_string(),
                source: e,
            })?;

        Ok(())
    }

    fn max_id(&self) -> u64 {
        [
            self.seasons.keys().last(),
            self.participants.keys().last(),
            self.responses.keys().last(),
            self.votes.keys().last(),
            self.prompts.keys().last(),
        ]
        .into_iter()
        .flatten()
        .copied()
        .max()
        .unwrap_or(0)
    }

    /// Apply a batch in place, stopping at the first violated constraint
    fn apply(&mut self, batch: WriteBatch) -> Result<()> {
        for write in batch.writes {
            match write {
                Write::PutSeason(season) => {
                    self.seasons.insert(season.id, season);
                }
                Write::DeleteSeason(id) => {
                    self.seasons.remove(&id);
                    self.participants.retain(|_, p| p.season_id != id);
                    self.responses.retain(|_, r| r.season_id != id);
                    self.votes.retain(|_, v| v.season_id != id);
                    self.prompts.retain(|_, p| p.season_id != id);
                }
                Write::PutBinding(binding) => {
                    if !self.seasons.contains_key(&binding.current_season_id) {
                        return Err(constraint(format!(
                            "binding for channel {} points at missing season {}",
                            binding.channel_id, binding.current_season_id
                        )));
                    }
                    self.bindings.insert(binding.channel_id.get(), binding);
                }
                Write::DeleteBinding(channel_id) => {
                    self.bindings.remove(&channel_id.get());
                }
                Write::PutParticipant(participant) => {
                    let duplicate = self.participants.values().any(|p| {
                        p.id != participant.id
                            && p.season_id == participant.season_id
                            && p.user_id == participant.user_id
                    });
                    if duplicate {
                        return Err(constraint(format!(
                            "user {} already participates in season {}",
                            participant.user_id, participant.season_id
                        )));
                    }
                    self.participants.insert(participant.id, participant);
                }
                Write::DeleteParticipant(id) => {
                    self.participants.remove(&id);
                }
                Write::PutResponse(response) => {
                    let duplicate = self.responses.values().any(|r| {
                        r.id != response.id
                            && r.season_id == response.season_id
                            && r.user_id == response.user_id
                            && r.round == response.round
                    });
                    if duplicate {
                        return Err(constraint(format!(
                            "user {} already has a response for season {} round {}",
                            response.user_id, response.season_id, response.round
                        )));
                    }
                    self.responses.insert(response.id, response);
                }
                Write::DeleteResponse(id) => {
                    self.responses.remove(&id);
                }
                Write::PutVote(vote) => {
                    self.check_vote(&vote)?;
                    self.votes.insert(vote.id, vote);
                }
                Write::PutPrompt(prompt) => {
                    self.prompts.insert(prompt.id, prompt);
                }
            }
        }
        Ok(())
    }

    fn check_vote(&self, vote: &Vote) -> Result<()> {
        if self.votes.contains_key(&vote.id) {
            return Err(constraint(format!("vote {} is immutable", vote.id)));
        }
        if vote.preferred_id == vote.rejected_id {
            return Err(BotError::InvalidVote {
                message: "a response cannot be compared with itself".to_string(),
            });
        }
        for id in [vote.preferred_id, vote.rejected_id] {
            match self.responses.get(&id) {
                Some(r) if r.season_id == vote.season_id && r.round == vote.round => {}
                _ => {
                    return Err(BotError::InvalidVote {
                        message: format!(
                            "response {} is not part of season {} round {}",
                            id, vote.season_id, vote.round
                        ),
                    })
                }
            }
        }
        let repeated = self.votes.values().any(|v| {
            v.season_id == vote.season_id
                && v.round == vote.round
                && v.user_id == vote.user_id
                && v.covers(vote.preferred_id, vote.rejected_id)
        });
        if repeated {
            return Err(BotError::InvalidVote {
                message: "this pair was already voted on".to_string(),
            });
        }
        Ok(())
    }
}

fn constraint(message: String) -> BotError {
    BotError::Store { message }
}

/// JSON-file backed store.
///
/// Tables live in memory behind a `parking_lot` lock; commits are serialized,
/// applied to a copy, written to disk and only then swapped in, so a failed
/// write leaves the committed state untouched.
pub struct JsonStore {
    tables: parking_lot::RwLock<GameTables>,
    commit_lock: tokio::sync::Mutex<()>,
    next_id: AtomicU64,
    path: Option<String>,
}

impl JsonStore {
    /// Store that never touches the disk
    pub fn in_memory() -> Self {
        Self::from_tables(GameTables::default(), None)
    }

    /// Open the store at `path`, creating an empty one if the file is missing
    pub async fn open(path: &str) -> Result<Self> {
        let tables = GameTables::load(path).await?;
        info!(
            "Loaded game state: {} season(s), {} binding(s), {} response(s), {} vote(s)",
            tables.seasons.len(),
            tables.bindings.len(),
            tables.responses.len(),
            tables.votes.len()
        );
        Ok(Self::from_tables(tables, Some(path.to_string())))
    }

    fn from_tables(tables: GameTables, path: Option<String>) -> Self {
        let next_id = tables.next_id.max(tables.max_id() + 1);
        Self {
            tables: parking_lot::RwLock::new(tables),
            commit_lock: tokio::sync::Mutex::new(()),
            next_id: AtomicU64::new(next_id),
            path,
        }
    }

    /// Copy of every table (used for diagnostics and tests)
    pub fn snapshot(&self) -> GameTables {
        self.tables.read().clone()
    }

    fn read<T>(&self, f: impl FnOnce(&GameTables) -> T) -> T {
        f(&self.tables.read())
    }
}

#[async_trait]
impl Store for JsonStore {
    async fn next_id(&self) -> Result<u64> {
        Ok(self.next_id.fetch_add(1, Ordering::SeqCst))
    }

    async fn commit(&self, batch: WriteBatch) -> Result<()> {
        if batch.is_empty() {
            return Ok(());
        }
        let _guard = self.commit_lock.lock().await;

        let writes = batch.len();
        let mut staged = self.tables.read().clone();
        staged.apply(batch)?;
        staged.next_id = self.next_id.load(Ordering::SeqCst);

        if let Some(path) = &self.path {
            staged.save(path).await?;
        }

        *self.tables.write() = staged;
        debug!("Committed {} write(s)", writes);
        Ok(())
    }

    async fn get_season(&self, id: u64) -> Result<Option<Season>> {
        Ok(self.read(|t| t.seasons.get(&id).cloned()))
    }

    async fn get_binding(&self, channel_id: ChannelId) -> Result<Option<ChannelBinding>> {
        Ok(self.read(|t| t.bindings.get(&channel_id.get()).cloned()))
    }

    async fn all_bindings(&self) -> Result<Vec<ChannelBinding>> {
        Ok(self.read(|t| t.bindings.values().cloned().collect()))
    }

    async fn participants(&self, season_id: u64) -> Result<Vec<Participant>> {
        Ok(self.read(|t| {
            t.participants
                .values()
                .filter(|p| p.season_id == season_id)
                .cloned()
                .collect()
        }))
    }

    async fn participant_by_user(
        &self,
        season_id: u64,
        user_id: UserId,
    ) -> Result<Option<Participant>> {
        let mut matches = self.read(|t| {
            t.participants
                .values()
                .filter(|p| p.season_id == season_id && p.user_id == user_id)
                .cloned()
                .collect::<Vec<_>>()
        });
        single(&mut matches, "participant", season_id, user_id)
    }

    async fn get_response(&self, id: u64) -> Result<Option<Response>> {
        Ok(self.read(|t| t.responses.get(&id).cloned()))
    }

    async fn response_by_user(
        &self,
        season_id: u64,
        user_id: UserId,
        round: u32,
    ) -> Result<Option<Response>> {
        let mut matches = self.read(|t| {
            t.responses
                .values()
                .filter(|r| r.season_id == season_id && r.user_id == user_id && r.round == round)
                .cloned()
                .collect::<Vec<_>>()
        });
        single(&mut matches, "response", season_id, user_id)
    }

    async fn responses_for_round(&self, season_id: u64, round: u32) -> Result<Vec<Response>> {
        Ok(self.read(|t| {
            t.responses
                .values()
                .filter(|r| r.season_id == season_id && r.round == round)
                .cloned()
                .collect()
        }))
    }

    async fn votes_for_round(&self, season_id: u64, round: u32) -> Result<Vec<Vote>> {
        Ok(self.read(|t| {
            t.votes
                .values()
                .filter(|v| v.season_id == season_id && v.round == round)
                .cloned()
                .collect()
        }))
    }

    async fn votes_by_user(&self, season_id: u64, round: u32, user_id: UserId) -> Result<Vec<Vote>> {
        Ok(self.read(|t| {
            t.votes
                .values()
                .filter(|v| v.season_id == season_id && v.round == round && v.user_id == user_id)
                .cloned()
                .collect()
        }))
    }

    async fn prompts(&self, season_id: u64) -> Result<Vec<PromptSuggestion>> {
        Ok(self.read(|t| {
            t.prompts
                .values()
                .filter(|p| p.season_id == season_id)
                .cloned()
                .collect()
        }))
    }
}

/// Unpack a lookup that must match at most one row
fn single<T>(matches: &mut Vec<T>, what: &str, season_id: u64, user_id: UserId) -> Result<Option<T>> {
    if matches.len() > 1 {
        return Err(BotError::Invariant {
            message: format!(
                "{} {} rows for user {} in season {}",
                matches.len(),
                what,
                user_id,
                season_id
            ),
        });
    }
    Ok(matches.pop())
}

pub fn create_shared_store(store: JsonStore) -> SharedStore {
    Arc::new(store)
}
