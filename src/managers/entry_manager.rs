use chrono::Utc;
use poise::serenity_prelude::UserId;
use std::sync::Arc;
use tracing::{error, info};

use crate::error::{BotError, Result};
use crate::managers::season_manager::SharedSeasonManager;
use crate::messages::{feedback_relay_message, prompt_relay_message};
use crate::models::{flatten_text, Actor, Participant, PromptSuggestion, Response, Season, SeasonPhase};
use crate::state::{SharedStore, Write, WriteBatch};

/// A participant's entry as shown back to them
#[derive(Debug, Clone, PartialEq)]
pub struct EntryReceipt {
    pub author: String,
    pub content: String,
}

/// Sign-ups, responses and hibernation mail
pub struct EntryManager {
    store: SharedStore,
    seasons: SharedSeasonManager,
}

impl EntryManager {
    pub fn new(store: SharedStore, seasons: SharedSeasonManager) -> Self {
        Self { store, seasons }
    }

    /// Season a button points at, if it is still in `phase` (and `round`)
    pub async fn open_season(&self, season_id: u64, phase: SeasonPhase, round: Option<u32>) -> Result<Season> {
        let season = self.store.get_season(season_id).await?;
        match season {
            Some(season) if season.phase == phase && round.map_or(true, |r| r == season.round) => {
                Ok(season)
            }
            other => Err(BotError::StaleAction {
                season_id,
                round: round.or(other.map(|s| s.round)).unwrap_or(0),
            }),
        }
    }

    async fn require_participant(&self, season_id: u64, user_id: UserId) -> Result<Participant> {
        self.store
            .participant_by_user(season_id, user_id)
            .await?
            .ok_or_else(|| BotError::NotRegistered {
                user_id: user_id.to_string(),
            })
    }

    /// Current participant row and round response of a user, for prefilling forms
    pub async fn entry(&self, season_id: u64, round: u32, user_id: UserId) -> Result<(Option<Participant>, Option<Response>)> {
        let participant = self.store.participant_by_user(season_id, user_id).await?;
        let response = self.store.response_by_user(season_id, user_id, round).await?;
        Ok((participant, response))
    }

    /// Register for a season, or update the moniker and sign-up response
    pub async fn sign_up(
        &self,
        actor: &Actor,
        season_id: u64,
        moniker: Option<&str>,
        response: Option<&str>,
    ) -> Result<EntryReceipt> {
        let locks = self.seasons.locks();
        let _season_guard = locks.read(season_id).await;
        let _user_guard = locks.user(season_id, actor.user_id).await;
        let season = self.open_season(season_id, SeasonPhase::Registering, None).await?;
        let limits = &self.seasons.config().limits;

        let moniker = non_empty(moniker)
            .map(|m| clean_text(m, limits.moniker_max_len, "moniker"))
            .transpose()?;
        let content = non_empty(response)
            .map(|r| clean_text(r, limits.response_max_len, "response"))
            .transpose()?;

        let mut participant = match self.store.participant_by_user(season.id, actor.user_id).await? {
            Some(participant) => participant,
            None => Participant::new(self.store.next_id().await?, season.id, actor.user_id),
        };
        if moniker.is_some() {
            participant.moniker = moniker;
        }

        let mut entry = match self
            .store
            .response_by_user(season.id, actor.user_id, season.round)
            .await?
        {
            Some(entry) => entry,
            None => Response::new(
                self.store.next_id().await?,
                season.id,
                actor.user_id,
                season.round,
                self.seasons.config().rating.initial_rating,
            ),
        };
        if content.is_some() {
            entry.content = content;
        }
        let Some(content) = entry.content.clone() else {
            return Err(BotError::InvalidInput {
                message: "🚫 A response is required to sign up.".to_string(),
            });
        };

        let author = participant
            .moniker
            .clone()
            .unwrap_or_else(|| actor.user_name.clone());
        let mut batch = WriteBatch::new();
        batch.put_participant(participant);
        batch.put_response(entry);
        self.store.commit(batch).await?;

        info!("{} Signed up for season {}.", actor.chip(), season.id);
        Ok(EntryReceipt { author, content })
    }

    /// The user's response for `round`
    pub async fn view_response(&self, actor: &Actor, season_id: u64, round: u32) -> Result<EntryReceipt> {
        let participant = self.require_participant(season_id, actor.user_id).await?;
        let content = self
            .store
            .response_by_user(season_id, actor.user_id, round)
            .await?
            .and_then(|r| r.content)
            .ok_or_else(|| BotError::NoResponse {
                user_id: actor.user_id.to_string(),
            })?;

        Ok(EntryReceipt {
            author: participant.moniker.unwrap_or_else(|| actor.user_name.clone()),
            content,
        })
    }

    /// Clear the moniker; returns false when none was set
    pub async fn reset_moniker(&self, actor: &Actor, season_id: u64) -> Result<bool> {
        let locks = self.seasons.locks();
        let _season_guard = locks.read(season_id).await;
        let _user_guard = locks.user(season_id, actor.user_id).await;
        self.open_season(season_id, SeasonPhase::Registering, None).await?;

        let mut participant = self.require_participant(season_id, actor.user_id).await?;
        if participant.moniker.is_none() {
            return Ok(false);
        }
        participant.moniker = None;
        self.store.commit(Write::PutParticipant(participant).into()).await?;

        info!("{} Moniker reset in season {}.", actor.chip(), season_id);
        Ok(true)
    }

    /// Leave a season during sign-ups, dropping the sign-up response
    pub async fn withdraw(&self, actor: &Actor, season_id: u64) -> Result<()> {
        let locks = self.seasons.locks();
        let _season_guard = locks.read(season_id).await;
        let _user_guard = locks.user(season_id, actor.user_id).await;
        let season = self.open_season(season_id, SeasonPhase::Registering, None).await?;

        let participant = self.require_participant(season.id, actor.user_id).await?;
        let mut batch = WriteBatch::new();
        batch.push(Write::DeleteParticipant(participant.id));
        if let Some(response) = self
            .store
            .response_by_user(season.id, actor.user_id, season.round)
            .await?
        {
            batch.push(Write::DeleteResponse(response.id));
        }
        self.store.commit(batch).await?;

        info!("{} Removed from season {}.", actor.chip(), season.id);
        Ok(())
    }

    /// Create or overwrite the user's response for the open round
    pub async fn submit_response(
        &self,
        actor: &Actor,
        season_id: u64,
        round: u32,
        text: &str,
    ) -> Result<EntryReceipt> {
        let locks = self.seasons.locks();
        let _season_guard = locks.read(season_id).await;
        let _user_guard = locks.user(season_id, actor.user_id).await;
        let season = self
            .open_season(season_id, SeasonPhase::Responding, Some(round))
            .await?;

        let participant = self.require_participant(season.id, actor.user_id).await?;
        let content = clean_text(text, self.seasons.config().limits.response_max_len, "response")?;

        let mut response = match self
            .store
            .response_by_user(season.id, actor.user_id, round)
            .await?
        {
            Some(response) => response,
            None => Response::new(
                self.store.next_id().await?,
                season.id,
                actor.user_id,
                round,
                self.seasons.config().rating.initial_rating,
            ),
        };
        response.content = Some(content.clone());
        self.store.commit(Write::PutResponse(response).into()).await?;

        info!("{} Response recorded for round {}.", actor.chip(), round);
        Ok(EntryReceipt {
            author: participant.moniker.unwrap_or_else(|| actor.user_name.clone()),
            content,
        })
    }

    pub async fn delete_response(&self, actor: &Actor, season_id: u64, round: u32) -> Result<()> {
        let locks = self.seasons.locks();
        let _season_guard = locks.read(season_id).await;
        let _user_guard = locks.user(season_id, actor.user_id).await;
        self.open_season(season_id, SeasonPhase::Responding, Some(round))
            .await?;

        self.require_participant(season_id, actor.user_id).await?;
        let response = self
            .store
            .response_by_user(season_id, actor.user_id, round)
            .await?
            .ok_or_else(|| BotError::NoResponse {
                user_id: actor.user_id.to_string(),
            })?;
        self.store.commit(Write::DeleteResponse(response.id).into()).await?;

        info!("{} Response deleted for round {}.", actor.chip(), round);
        Ok(())
    }

    /// Store a prompt suggestion and pass it on to the hosts
    pub async fn suggest_prompt(&self, actor: &Actor, season_id: u64, text: &str) -> Result<PromptSuggestion> {
        let _season_guard = self.seasons.locks().read(season_id).await;
        let season = self
            .open_season(season_id, SeasonPhase::Hibernating, None)
            .await?;
        let content = clean_text(text, self.seasons.config().limits.prompt_max_len, "prompt")?;

        let prompt = PromptSuggestion {
            id: self.store.next_id().await?,
            season_id: season.id,
            user_id: actor.user_id,
            content,
            submitted_at: Utc::now(),
        };
        self.store.commit(Write::PutPrompt(prompt.clone()).into()).await?;
        info!("{} Prompt suggested for season {}.", actor.chip(), season.id);

        let relay = prompt_relay_message(&mention(actor.user_id), &prompt.content);
        if let Err(e) = self.relay_to_hosts(season.id, &relay).await {
            error!("{} Failed to relay prompt suggestion: {}", actor.chip(), e);
        }
        Ok(prompt)
    }

    /// Relay feedback to the hosts; nothing is stored
    pub async fn send_feedback(&self, actor: &Actor, season_id: u64, text: &str) -> Result<String> {
        let _season_guard = self.seasons.locks().read(season_id).await;
        let season = self
            .open_season(season_id, SeasonPhase::Hibernating, None)
            .await?;
        let content = flatten_text(text);
        if content.is_empty() {
            return Err(BotError::InvalidInput {
                message: "🚫 Feedback cannot be empty.".to_string(),
            });
        }

        self.relay_to_hosts(season.id, &feedback_relay_message(&mention(actor.user_id), &content))
            .await?;
        info!("{} Feedback sent for season {}.", actor.chip(), season.id);
        Ok(content)
    }

    async fn relay_to_hosts(&self, season_id: u64, content: &str) -> Result<()> {
        let thread = self.seasons.ensure_host_thread(season_id).await?;
        self.seasons.announcer().relay(thread, content).await
    }
}

fn non_empty(text: Option<&str>) -> Option<&str> {
    text.filter(|t| !t.trim().is_empty())
}

fn mention(user_id: UserId) -> String {
    format!("<@{}>", user_id)
}

/// Flatten user text and enforce its length limit
fn clean_text(text: &str, max_len: usize, what: &str) -> Result<String> {
    let text = flatten_text(text);
    if text.is_empty() {
        return Err(BotError::InvalidInput {
            message: format!("🚫 The {} cannot be empty.", what),
        });
    }
    if text.chars().count() > max_len {
        return Err(BotError::InvalidInput {
            message: format!("🚫 The {} can be at most {} characters long.", what, max_len),
        });
    }
    Ok(text)
}

/// Shared entry manager type
pub type SharedEntryManager = Arc<EntryManager>;

pub fn create_shared_entry_manager(store: SharedStore, seasons: SharedSeasonManager) -> SharedEntryManager {
    Arc::new(EntryManager::new(store, seasons))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GameConfig;
    use crate::managers::locks::create_shared_season_locks;
    use crate::managers::season_manager::create_shared_season_manager;
    use crate::notify::testing::{Call, RecordingAnnouncer};
    use crate::state::{JsonStore, Store};
    use poise::serenity_prelude::{ChannelId, GuildId, RoleId};

    fn actor(user: u64) -> Actor {
        Actor {
            guild_id: GuildId::new(1),
            channel_id: ChannelId::new(2),
            user_id: UserId::new(user),
            user_name: format!("player{}", user),
        }
    }

    struct Harness {
        store: Arc<JsonStore>,
        announcer: Arc<RecordingAnnouncer>,
        seasons: SharedSeasonManager,
        entries: EntryManager,
    }

    async fn harness() -> Harness {
        let store = Arc::new(JsonStore::in_memory());
        let announcer = RecordingAnnouncer::new();
        let seasons = create_shared_season_manager(
            store.clone(),
            announcer.clone(),
            Arc::new(GameConfig::default()),
            create_shared_season_locks(),
        );
        seasons.activate(&actor(1), Some(RoleId::new(77))).await.unwrap();
        let entries = EntryManager::new(store.clone(), seasons.clone());
        Harness {
            store,
            announcer,
            seasons,
            entries,
        }
    }

    async fn season_id(h: &Harness) -> u64 {
        h.seasons.current_season(ChannelId::new(2)).await.unwrap().id
    }

    #[tokio::test]
    async fn test_sign_up_and_update() {
        let h = harness().await;
        h.seasons.open_signups(&actor(1), "Describe a cloud.").await.unwrap();
        let id = season_id(&h).await;

        let receipt = h
            .entries
            .sign_up(&actor(10), id, None, Some("fluffy\nand white"))
            .await
            .unwrap();
        assert_eq!(receipt.author, "player10");
        assert_eq!(receipt.content, "fluffy and white");

        // A blank response keeps the stored one
        let receipt = h
            .entries
            .sign_up(&actor(10), id, Some("Cirrus"), Some(""))
            .await
            .unwrap();
        assert_eq!(receipt.author, "Cirrus");
        assert_eq!(receipt.content, "fluffy and white");
        assert_eq!(h.store.participants(id).await.unwrap().len(), 1);
        assert_eq!(h.store.responses_for_round(id, 0).await.unwrap().len(), 1);

        assert!(h.entries.reset_moniker(&actor(10), id).await.unwrap());
        assert!(!h.entries.reset_moniker(&actor(10), id).await.unwrap());
    }

    #[tokio::test]
    async fn test_sign_up_requires_response_and_open_registration() {
        let h = harness().await;
        let placeholder = season_id(&h).await;
        let err = h
            .entries
            .sign_up(&actor(10), placeholder, None, Some("too early"))
            .await
            .unwrap_err();
        assert!(matches!(err, BotError::StaleAction { .. }));

        h.seasons.open_signups(&actor(1), "Describe a cloud.").await.unwrap();
        let id = season_id(&h).await;
        let err = h.entries.sign_up(&actor(10), id, Some("Nimbus"), None).await.unwrap_err();
        assert!(matches!(err, BotError::InvalidInput { .. }));
        assert!(h.store.participants(id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_withdraw_removes_participant_and_response() {
        let h = harness().await;
        h.seasons.open_signups(&actor(1), "Describe a cloud.").await.unwrap();
        let id = season_id(&h).await;
        h.entries.sign_up(&actor(10), id, None, Some("grey")).await.unwrap();

        h.entries.withdraw(&actor(10), id).await.unwrap();
        assert!(h.store.participants(id).await.unwrap().is_empty());
        assert!(h.store.responses_for_round(id, 0).await.unwrap().is_empty());
        assert!(matches!(
            h.entries.withdraw(&actor(10), id).await.unwrap_err(),
            BotError::NotRegistered { .. }
        ));
    }

    #[tokio::test]
    async fn test_submissions_follow_the_round() {
        let h = harness().await;
        h.seasons.open_signups(&actor(1), "Describe a cloud.").await.unwrap();
        let id = season_id(&h).await;
        h.entries.sign_up(&actor(10), id, None, Some("grey")).await.unwrap();
        h.seasons.open_round(&actor(1), "Describe rain.").await.unwrap();

        let err = h
            .entries
            .submit_response(&actor(11), id, 1, "wet")
            .await
            .unwrap_err();
        assert!(matches!(err, BotError::NotRegistered { .. }));

        h.entries.submit_response(&actor(10), id, 1, "wet").await.unwrap();
        let receipt = h.entries.submit_response(&actor(10), id, 1, "very wet").await.unwrap();
        assert_eq!(receipt.content, "very wet");
        assert_eq!(h.store.responses_for_round(id, 1).await.unwrap().len(), 1);

        let too_long = "x".repeat(101);
        assert!(matches!(
            h.entries.submit_response(&actor(10), id, 1, &too_long).await.unwrap_err(),
            BotError::InvalidInput { .. }
        ));

        // A button from the sign-up round no longer applies
        assert!(matches!(
            h.entries.submit_response(&actor(10), id, 0, "late").await.unwrap_err(),
            BotError::StaleAction { .. }
        ));

        h.entries.delete_response(&actor(10), id, 1).await.unwrap();
        assert!(matches!(
            h.entries.view_response(&actor(10), id, 1).await.unwrap_err(),
            BotError::NoResponse { .. }
        ));

        h.seasons.open_voting(&actor(1)).await.unwrap();
        assert!(matches!(
            h.entries.submit_response(&actor(10), id, 1, "after").await.unwrap_err(),
            BotError::StaleAction { .. }
        ));
    }

    #[tokio::test]
    async fn test_hibernation_mail_reaches_one_host_thread() {
        let h = harness().await;
        let id = season_id(&h).await;

        h.entries.suggest_prompt(&actor(10), id, "Describe fog.").await.unwrap();
        h.entries.send_feedback(&actor(11), id, "More rounds!").await.unwrap();

        let calls = h.announcer.calls();
        let threads: Vec<_> = calls
            .iter()
            .filter(|c| matches!(c, Call::ThreadOpened { .. }))
            .collect();
        assert_eq!(threads.len(), 1);
        let relayed = calls
            .iter()
            .filter(|c| matches!(c, Call::Relayed { .. }))
            .count();
        assert_eq!(relayed, 2);
        assert_eq!(h.store.prompts(id).await.unwrap().len(), 1);

        let season = h.store.get_season(id).await.unwrap().unwrap();
        assert!(season.private_channel_id.is_some());
    }
}
