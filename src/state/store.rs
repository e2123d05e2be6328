use async_trait::async_trait;
use poise::serenity_prelude::{ChannelId, UserId};
use std::sync::Arc;

use crate::error::{BotError, Result};
use crate::models::{ChannelBinding, Participant, PromptSuggestion, Response, Season, Vote};

/// A single write inside a [`WriteBatch`]
#[derive(Debug, Clone)]
pub enum Write {
    PutSeason(Season),
    /// Also removes the season's participants, responses, votes and prompts
    DeleteSeason(u64),
    PutBinding(ChannelBinding),
    DeleteBinding(ChannelId),
    PutParticipant(Participant),
    DeleteParticipant(u64),
    PutResponse(Response),
    DeleteResponse(u64),
    PutVote(Vote),
    PutPrompt(PromptSuggestion),
}

/// Writes that are committed together or not at all
#[derive(Debug, Clone, Default)]
pub struct WriteBatch {
    pub writes: Vec<Write>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, write: Write) -> &mut Self {
        self.writes.push(write);
        self
    }

    pub fn put_season(&mut self, season: Season) -> &mut Self {
        self.push(Write::PutSeason(season))
    }

    pub fn put_binding(&mut self, binding: ChannelBinding) -> &mut Self {
        self.push(Write::PutBinding(binding))
    }

    pub fn put_participant(&mut self, participant: Participant) -> &mut Self {
        self.push(Write::PutParticipant(participant))
    }

    pub fn put_response(&mut self, response: Response) -> &mut Self {
        self.push(Write::PutResponse(response))
    }

    pub fn put_vote(&mut self, vote: Vote) -> &mut Self {
        self.push(Write::PutVote(vote))
    }

    pub fn is_empty(&self) -> bool {
        self.writes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.writes.len()
    }
}

impl From<Write> for WriteBatch {
    fn from(write: Write) -> Self {
        Self {
            writes: vec![write],
        }
    }
}

/// Durable storage for every game entity.
///
/// Reads observe only committed batches. `commit` either applies every write
/// of the batch or none of them, and rejects batches that would break a
/// uniqueness constraint.
#[async_trait]
pub trait Store: Send + Sync {
    /// Allocate a fresh entity id
    async fn next_id(&self) -> Result<u64>;

    async fn commit(&self, batch: WriteBatch) -> Result<()>;

    async fn get_season(&self, id: u64) -> Result<Option<Season>>;

    async fn get_binding(&self, channel_id: ChannelId) -> Result<Option<ChannelBinding>>;

    async fn all_bindings(&self) -> Result<Vec<ChannelBinding>>;

    async fn participants(&self, season_id: u64) -> Result<Vec<Participant>>;

    async fn participant_by_user(&self, season_id: u64, user_id: UserId)
        -> Result<Option<Participant>>;

    async fn get_response(&self, id: u64) -> Result<Option<Response>>;

    async fn response_by_user(
        &self,
        season_id: u64,
        user_id: UserId,
        round: u32,
    ) -> Result<Option<Response>>;

    async fn responses_for_round(&self, season_id: u64, round: u32) -> Result<Vec<Response>>;

    async fn votes_for_round(&self, season_id: u64, round: u32) -> Result<Vec<Vote>>;

    async fn votes_by_user(&self, season_id: u64, round: u32, user_id: UserId) -> Result<Vec<Vote>>;

    async fn prompts(&self, season_id: u64) -> Result<Vec<PromptSuggestion>>;
}

/// Shared store type
pub type SharedStore = Arc<dyn Store>;

/// Load a season that a binding or custom id points at; a dangling id means corrupt data
pub async fn require_season(store: &dyn Store, id: u64) -> Result<Season> {
    store.get_season(id).await?.ok_or_else(|| BotError::Invariant {
        message: format!("season {} is referenced but does not exist", id),
    })
}
