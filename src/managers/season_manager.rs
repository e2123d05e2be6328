use dashmap::DashMap;
use poise::serenity_prelude::{ChannelId, RoleId, UserId};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::config::GameConfig;
use crate::error::{BotError, Result};
use crate::game::{phase, rating, scoring, Command};
use crate::managers::SharedSeasonLocks;
use crate::messages::{
    results_heading, round_open_message, season_over_message, signups_open_message,
    voting_closed_message, voting_open_message,
};
use crate::models::{Actor, ChannelBinding, Participant, Season, SeasonPhase};
use crate::notify::{Announcement, SharedAnnouncer};
use crate::results::{build_entries, paginate, ResultEntry};
use crate::state::{require_season, SharedStore, Write, WriteBatch};

/// What an accepted transition did
#[derive(Debug, Clone)]
pub struct TransitionOutcome {
    pub season: Season,
    pub previous: SeasonPhase,

    /// False when the new announcement could not be posted or recorded
    pub announced: bool,

    /// Set when a round was concluded
    pub round: Option<RoundSummary>,
}

/// Scoring work done when a round concludes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoundSummary {
    pub votes: usize,
    pub responses: usize,
    pub participants_scored: usize,
}

#[derive(Debug, Clone)]
pub struct SeasonStatus {
    pub season: Season,
    pub participants: usize,
    pub submitted: usize,
}

#[derive(Debug, Clone)]
pub struct RoundResults {
    pub season: Season,
    pub round: u32,
    pub pages: Vec<Vec<ResultEntry>>,
}

/// Runs the season state machine of every enabled channel
pub struct SeasonManager {
    store: SharedStore,
    announcer: SharedAnnouncer,
    config: Arc<GameConfig>,
    locks: SharedSeasonLocks,

    /// Channel -> current season id, derived from the stored bindings
    current: DashMap<ChannelId, u64>,
}

impl SeasonManager {
    pub fn new(
        store: SharedStore,
        announcer: SharedAnnouncer,
        config: Arc<GameConfig>,
        locks: SharedSeasonLocks,
    ) -> Self {
        Self {
            store,
            announcer,
            config,
            locks,
            current: DashMap::new(),
        }
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn locks(&self) -> &SharedSeasonLocks {
        &self.locks
    }

    pub fn announcer(&self) -> &SharedAnnouncer {
        &self.announcer
    }

    /// Rebuild the channel index from the store's bindings
    pub async fn rebuild_index(&self) -> Result<usize> {
        self.current.clear();
        for binding in self.store.all_bindings().await? {
            let season = require_season(self.store.as_ref(), binding.current_season_id).await?;
            info!(
                "Channel {} resumes season {} in {} (round {})",
                binding.channel_id, season.id, season.phase, season.round
            );
            self.current.insert(binding.channel_id, season.id);
        }
        Ok(self.current.len())
    }

    /// Current season of a channel
    pub async fn current_season(&self, channel_id: ChannelId) -> Result<Season> {
        let season_id = self.current_id(channel_id).ok_or_else(|| not_active(channel_id))?;
        require_season(self.store.as_ref(), season_id).await
    }

    fn current_id(&self, channel_id: ChannelId) -> Option<u64> {
        self.current.get(&channel_id).map(|id| *id)
    }

    /// Enable the game in a channel with a placeholder hibernating season
    pub async fn activate(&self, actor: &Actor, host_role: Option<RoleId>) -> Result<Season> {
        let _channel_guard = self.locks.channel(actor.channel_id).await;

        if let Some(binding) = self.store.get_binding(actor.channel_id).await? {
            let season = require_season(self.store.as_ref(), binding.current_season_id).await?;
            warn!(
                "{} activate attempted while {}. {} state preserved.",
                actor.chip(),
                season.phase,
                season.phase
            );
            return Err(BotError::AlreadyActive {
                channel_id: actor.channel_id.to_string(),
                phase: season.phase,
            });
        }

        let season = Season::new(
            self.store.next_id().await?,
            actor.guild_id,
            actor.channel_id,
            SeasonPhase::Hibernating,
        );
        let mut batch = WriteBatch::new();
        batch.put_season(season.clone());
        batch.put_binding(ChannelBinding {
            channel_id: actor.channel_id,
            host_role_id: host_role,
            current_season_id: season.id,
        });
        self.store.commit(batch).await?;
        self.current.insert(actor.channel_id, season.id);

        info!("{} Game activated, state set to {}.", actor.chip(), season.phase);
        Ok(season)
    }

    /// Disable the game in a channel, deleting its current season
    pub async fn deactivate(&self, actor: &Actor) -> Result<()> {
        let _channel_guard = self.locks.channel(actor.channel_id).await;

        let Some(binding) = self.store.get_binding(actor.channel_id).await? else {
            warn!(
                "{} deactivate attempted while INACTIVE. INACTIVE state preserved.",
                actor.chip()
            );
            return Err(not_active(actor.channel_id));
        };

        let season_id = binding.current_season_id;
        let _season_guard = self.locks.write(season_id).await;
        let season = self.store.get_season(season_id).await?;

        let mut batch = WriteBatch::new();
        batch.push(Write::DeleteBinding(actor.channel_id));
        batch.push(Write::DeleteSeason(season_id));
        self.store.commit(batch).await?;
        self.current.remove(&actor.channel_id);

        if let Some(season) = season {
            if let Some(message_id) = season.announcement_id {
                if let Err(e) = self.announcer.deactivate_announcement(&season, message_id).await {
                    warn!("Failed to disable announcement {}: {}", message_id, e);
                }
            }
        }
        self.locks.forget(season_id);

        info!("{} Game deactivated, season {} removed.", actor.chip(), season_id);
        Ok(())
    }

    /// Hibernating -> Registering: starts a new season
    pub async fn open_signups(&self, actor: &Actor, prompt: &str) -> Result<TransitionOutcome> {
        self.transition(actor, Command::OpenSignups, Some(prompt)).await
    }

    /// Registering or Idle -> Responding: starts the next round
    pub async fn open_round(&self, actor: &Actor, prompt: &str) -> Result<TransitionOutcome> {
        self.transition(actor, Command::OpenRound, Some(prompt)).await
    }

    pub async fn open_voting(&self, actor: &Actor) -> Result<TransitionOutcome> {
        self.transition(actor, Command::OpenVoting, None).await
    }

    /// Voting -> Idle: rates and scores the round, then publishes its results
    pub async fn conclude(&self, actor: &Actor) -> Result<TransitionOutcome> {
        self.transition(actor, Command::Conclude, None).await
    }

    pub async fn hibernate(&self, actor: &Actor) -> Result<TransitionOutcome> {
        self.transition(actor, Command::Hibernate, None).await
    }

    async fn transition(
        &self,
        actor: &Actor,
        command: Command,
        prompt: Option<&str>,
    ) -> Result<TransitionOutcome> {
        let _channel_guard = self.locks.channel(actor.channel_id).await;

        let Some(season_id) = self.current_id(actor.channel_id) else {
            warn!(
                "{} {} attempted while INACTIVE. INACTIVE state preserved.",
                actor.chip(),
                command.name()
            );
            return Err(not_active(actor.channel_id));
        };
        let _season_guard = self.locks.write(season_id).await;
        let current = require_season(self.store.as_ref(), season_id).await?;

        let target = match phase::plan(current.phase, command) {
            Ok(target) => target,
            Err(e) => {
                warn!(
                    "{} {} attempted while {}. {} state preserved.",
                    actor.chip(),
                    command.name(),
                    current.phase,
                    current.phase
                );
                return Err(e);
            }
        };

        let prompt = match prompt {
            Some(text) => {
                let text = text.trim();
                if text.is_empty() {
                    return Err(BotError::InvalidInput {
                        message: "🚫 The prompt cannot be empty.".to_string(),
                    });
                }
                Some(text)
            }
            None => None,
        };

        info!(
            "{} Changing state from {} to {}.",
            actor.chip(),
            current.phase,
            target
        );

        let mut next = match command {
            Command::OpenSignups => Season::new(
                self.store.next_id().await?,
                current.guild_id,
                current.channel_id,
                target,
            ),
            _ => {
                let mut season = current.clone();
                season.phase = target;
                season.announcement_id = None;
                if command == Command::OpenRound {
                    season.round += 1;
                }
                season
            }
        };
        let _next_guard = if next.id != current.id {
            Some(self.locks.write(next.id).await)
        } else {
            None
        };

        let mut batch = WriteBatch::new();
        let summary = if command == Command::Conclude {
            Some(self.score_round(&current, &mut batch).await?)
        } else {
            None
        };
        batch.put_season(next.clone());
        if command == Command::OpenSignups {
            let binding = self
                .store
                .get_binding(actor.channel_id)
                .await?
                .ok_or_else(|| BotError::Invariant {
                    message: format!("channel {} is indexed but has no binding", actor.channel_id),
                })?;
            batch.put_binding(ChannelBinding {
                current_season_id: next.id,
                ..binding
            });
        }
        self.store.commit(batch).await?;
        self.current.insert(actor.channel_id, next.id);

        // The old announcement goes dark before the new one appears
        if let Some(message_id) = current.announcement_id {
            if let Err(e) = self.announcer.deactivate_announcement(&current, message_id).await {
                error!(
                    "{} Failed to disable announcement {}: {}",
                    actor.chip(),
                    message_id,
                    e
                );
            }
        }

        let announcement = Announcement {
            content: announcement_text(command, &next, prompt.unwrap_or_default()),
        };
        let announced = self.announce(actor, &mut next, &announcement).await;

        if let Some(summary) = summary {
            info!(
                "{} Round {} concluded: {} vote(s) over {} response(s), {} participant(s) scored.",
                actor.chip(),
                next.round,
                summary.votes,
                summary.responses,
                summary.participants_scored
            );
            if let Err(e) = self.publish_results(&next).await {
                error!("{} Failed to post round {} results: {}", actor.chip(), next.round, e);
            }
        }

        info!("{} State set to {}.", actor.chip(), target);
        Ok(TransitionOutcome {
            season: require_season(self.store.as_ref(), next.id).await?,
            previous: current.phase,
            announced,
            round: summary,
        })
    }

    /// Post the announcement for `season` and record its message id
    async fn announce(&self, actor: &Actor, season: &mut Season, announcement: &Announcement) -> bool {
        let message_id = match self.announcer.post_announcement(season, announcement).await {
            Ok(message_id) => message_id,
            Err(e) => {
                error!("{} Failed to post {} announcement: {}", actor.chip(), season.phase, e);
                return false;
            }
        };

        season.announcement_id = Some(message_id);
        if let Err(e) = self.store.commit(Write::PutSeason(season.clone()).into()).await {
            error!(
                "{} Failed to record announcement {}: {}",
                actor.chip(),
                message_id,
                e
            );
            season.announcement_id = None;
            if let Err(e) = self.announcer.deactivate_announcement(season, message_id).await {
                warn!("Failed to disable unrecorded announcement {}: {}", message_id, e);
            }
            return false;
        }
        true
    }

    /// Stage ratings, round scores and cumulative scores of the current round
    async fn score_round(&self, season: &Season, batch: &mut WriteBatch) -> Result<RoundSummary> {
        let round = season.round;
        let votes = self.store.votes_for_round(season.id, round).await?;
        let mut responses: Vec<_> = self
            .store
            .responses_for_round(season.id, round)
            .await?
            .into_iter()
            .filter(|r| r.is_submitted())
            .collect();

        if responses.is_empty() {
            return Ok(RoundSummary {
                votes: 0,
                responses: 0,
                participants_scored: 0,
            });
        }

        let mut participants = self.store.participants(season.id).await?;
        // Without votes every rating keeps its prior value; bands still apply
        let applied = rating::apply_votes(&mut responses, &votes, self.config.rating.k_factor)?;
        let (quantile, base) = self.config.scoring.bands_for_round(round);
        scoring::quantize(&mut responses, quantile, base);
        let scored = scoring::accumulate(&mut participants, &responses, round);

        let summary = RoundSummary {
            votes: applied,
            responses: responses.len(),
            participants_scored: scored,
        };
        for response in responses {
            batch.put_response(response);
        }
        if scored > 0 {
            for participant in participants {
                batch.put_participant(participant);
            }
        }
        Ok(summary)
    }

    async fn publish_results(&self, season: &Season) -> Result<()> {
        let pages = self.result_pages(season, season.round).await?;
        if pages.is_empty() {
            debug!("Round {} of season {} has no responses to publish", season.round, season.id);
            return Ok(());
        }
        let thread = self.ensure_host_thread(season.id).await?;
        self.announcer
            .post_results(thread, &results_heading(season.round), &pages)
            .await
    }

    async fn result_pages(&self, season: &Season, round: u32) -> Result<Vec<Vec<ResultEntry>>> {
        let responses = self.store.responses_for_round(season.id, round).await?;
        let participants = self.store.participants(season.id).await?;
        let names = self.display_names(season, &participants).await;
        let entries = build_entries(&responses, &participants, &names)?;
        Ok(paginate(entries, self.config.results_page_size))
    }

    /// Display names of participants without a moniker
    pub async fn display_names(
        &self,
        season: &Season,
        participants: &[Participant],
    ) -> HashMap<UserId, String> {
        let mut names = HashMap::new();
        for participant in participants.iter().filter(|p| p.moniker.is_none()) {
            match self.announcer.display_name(season.guild_id, participant.user_id).await {
                Ok(Some(name)) => {
                    names.insert(participant.user_id, name);
                }
                Ok(None) => warn!("A member with ID {} could not be found.", participant.user_id),
                Err(e) => warn!("Fetching member with ID {} failed: {}", participant.user_id, e),
            }
        }
        names
    }

    /// Host thread of a season, created on first use.
    ///
    /// Callers must hold the season lock (either half).
    pub async fn ensure_host_thread(&self, season_id: u64) -> Result<ChannelId> {
        let _thread_guard = self.locks.host_thread(season_id).await;

        let mut season = require_season(self.store.as_ref(), season_id).await?;
        if let Some(thread) = season.private_channel_id {
            return Ok(thread);
        }

        let host_role = self
            .store
            .get_binding(season.channel_id)
            .await?
            .and_then(|b| b.host_role_id);
        let thread = self.announcer.open_host_thread(&season, host_role).await?;

        season.private_channel_id = Some(thread);
        self.store.commit(Write::PutSeason(season).into()).await?;
        Ok(thread)
    }

    pub async fn status(&self, channel_id: ChannelId) -> Result<SeasonStatus> {
        let season = self.current_season(channel_id).await?;
        let participants = self.store.participants(season.id).await?.len();
        let submitted = self
            .store
            .responses_for_round(season.id, season.round)
            .await?
            .iter()
            .filter(|r| r.is_submitted())
            .count();
        Ok(SeasonStatus {
            season,
            participants,
            submitted,
        })
    }

    /// Ranked results of a concluded round; defaults to the latest one
    pub async fn round_results(&self, channel_id: ChannelId, round: Option<u32>) -> Result<RoundResults> {
        let season = self.current_season(channel_id).await?;
        let _season_guard = self.locks.read(season.id).await;

        let latest = match season.phase {
            SeasonPhase::Idle | SeasonPhase::Hibernating => season.round,
            _ => season.round.saturating_sub(1),
        };
        let round = round.unwrap_or(latest);
        if round == 0 || round > latest {
            return Err(BotError::InvalidInput {
                message: if latest == 0 {
                    "🚫 No round has been concluded this season yet.".to_string()
                } else {
                    format!("🚫 Pick a concluded round between 1 and {}.", latest)
                },
            });
        }

        let pages = self.result_pages(&season, round).await?;
        Ok(RoundResults {
            season,
            round,
            pages,
        })
    }

    /// Participants ranked by cumulative score, with their shown names
    pub async fn standings(&self, channel_id: ChannelId) -> Result<Vec<(Participant, String)>> {
        let season = self.current_season(channel_id).await?;
        let participants = self.store.participants(season.id).await?;
        let names = self.display_names(&season, &participants).await;

        let mut ranked: Vec<(Participant, String)> = participants
            .into_iter()
            .map(|p| {
                let name = p
                    .moniker
                    .clone()
                    .or_else(|| names.get(&p.user_id).cloned())
                    .unwrap_or_else(|| crate::results::UNKNOWN_AUTHOR.to_string());
                (p, name)
            })
            .collect();
        ranked.sort_by(|a, b| b.0.score.cmp(&a.0.score).then_with(|| a.1.cmp(&b.1)));
        Ok(ranked)
    }
}

fn announcement_text(command: Command, season: &Season, prompt: &str) -> String {
    match command {
        Command::OpenSignups => signups_open_message(prompt),
        Command::OpenRound => round_open_message(season.round, prompt),
        Command::OpenVoting => voting_open_message(season.round),
        Command::Conclude => voting_closed_message(season.round),
        Command::Hibernate => season_over_message(season.round),
    }
}

fn not_active(channel_id: ChannelId) -> BotError {
    BotError::NotActive {
        channel_id: channel_id.to_string(),
    }
}

/// Shared season manager type
pub type SharedSeasonManager = Arc<SeasonManager>;

pub fn create_shared_season_manager(
    store: SharedStore,
    announcer: SharedAnnouncer,
    config: Arc<GameConfig>,
    locks: SharedSeasonLocks,
) -> SharedSeasonManager {
    Arc::new(SeasonManager::new(store, announcer, config, locks))
}
