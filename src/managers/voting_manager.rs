use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

use crate::error::{BotError, Result};
use crate::game::{select_pair, PairOutcome};
use crate::managers::season_manager::SharedSeasonManager;
use crate::models::{Actor, Season, SeasonPhase, Vote};
use crate::state::{SharedStore, Write};

/// Two responses to choose between, in presentation order
#[derive(Debug, Clone, PartialEq)]
pub struct Ballot {
    pub season_id: u64,
    pub round: u32,
    pub first: (u64, String),
    pub second: (u64, String),
    pub recorded_votes: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum BallotOutcome {
    Ballot(Ballot),
    InsufficientResponses,
    Exhausted { recorded_votes: usize },
}

/// Hands out blind ballots and records votes
pub struct VotingManager {
    store: SharedStore,
    seasons: SharedSeasonManager,
    rng: parking_lot::Mutex<StdRng>,
}

impl VotingManager {
    pub fn new(store: SharedStore, seasons: SharedSeasonManager) -> Self {
        Self::with_rng(store, seasons, StdRng::from_os_rng())
    }

    pub fn with_rng(store: SharedStore, seasons: SharedSeasonManager, rng: StdRng) -> Self {
        Self {
            store,
            seasons,
            rng: parking_lot::Mutex::new(rng),
        }
    }

    async fn voting_season(&self, season_id: u64, round: u32) -> Result<Season> {
        match self.store.get_season(season_id).await? {
            Some(season) if season.phase == SeasonPhase::Voting && season.round == round => Ok(season),
            _ => Err(BotError::StaleAction { season_id, round }),
        }
    }

    /// Next ballot for a voter
    pub async fn request_ballot(&self, actor: &Actor, season_id: u64, round: u32) -> Result<BallotOutcome> {
        let _season_guard = self.seasons.locks().read(season_id).await;
        let season = self.voting_season(season_id, round).await?;
        self.next_ballot(actor, &season).await
    }

    /// Record a choice and return the voter's next ballot
    pub async fn cast_vote(
        &self,
        actor: &Actor,
        season_id: u64,
        round: u32,
        preferred_id: u64,
        rejected_id: u64,
    ) -> Result<BallotOutcome> {
        let locks = self.seasons.locks();
        let _season_guard = locks.read(season_id).await;
        let _user_guard = locks.user(season_id, actor.user_id).await;
        let season = self.voting_season(season_id, round).await?;

        if preferred_id == rejected_id {
            return Err(BotError::InvalidVote {
                message: "a response cannot be compared with itself".to_string(),
            });
        }
        for id in [preferred_id, rejected_id] {
            match self.store.get_response(id).await? {
                Some(r) if r.season_id == season.id && r.round == round && r.is_submitted() => {
                    if r.user_id == actor.user_id {
                        return Err(BotError::InvalidVote {
                            message: "you cannot vote on your own response".to_string(),
                        });
                    }
                }
                _ => {
                    return Err(BotError::InvalidVote {
                        message: format!("response {} is not on this round's ballot", id),
                    })
                }
            }
        }

        let votes = self.store.votes_by_user(season.id, round, actor.user_id).await?;
        if votes.iter().any(|v| v.covers(preferred_id, rejected_id)) {
            // Repeated click on a ballot that was already counted
            debug!("{} Ignoring repeated vote on {} / {}", actor.chip(), preferred_id, rejected_id);
        } else {
            let vote = Vote {
                id: self.store.next_id().await?,
                season_id: season.id,
                user_id: actor.user_id,
                round,
                preferred_id,
                rejected_id,
            };
            self.store.commit(Write::PutVote(vote).into()).await?;
            info!(
                "{} Vote recorded in round {} ({} over {}).",
                actor.chip(),
                round,
                preferred_id,
                rejected_id
            );
        }

        self.next_ballot(actor, &season).await
    }

    async fn next_ballot(&self, actor: &Actor, season: &Season) -> Result<BallotOutcome> {
        let contents: HashMap<u64, String> = self
            .store
            .responses_for_round(season.id, season.round)
            .await?
            .into_iter()
            .filter(|r| r.user_id != actor.user_id)
            .filter_map(|r| r.content.map(|c| (r.id, c)))
            .collect();
        let mut eligible: Vec<u64> = contents.keys().copied().collect();
        eligible.sort_unstable();

        let votes = self
            .store
            .votes_by_user(season.id, season.round, actor.user_id)
            .await?;
        let recorded_votes = votes.len();

        let outcome = select_pair(&eligible, &votes, &mut *self.rng.lock());
        match outcome {
            PairOutcome::Pair(first, second) => {
                debug!("{} Ballot {} / {}", actor.chip(), first, second);
                Ok(BallotOutcome::Ballot(Ballot {
                    season_id: season.id,
                    round: season.round,
                    first: (first, contents[&first].clone()),
                    second: (second, contents[&second].clone()),
                    recorded_votes,
                }))
            }
            PairOutcome::InsufficientResponses => Ok(BallotOutcome::InsufficientResponses),
            PairOutcome::Exhausted => Ok(BallotOutcome::Exhausted { recorded_votes }),
        }
    }
}

/// Shared voting manager type
pub type SharedVotingManager = Arc<VotingManager>;

pub fn create_shared_voting_manager(store: SharedStore, seasons: SharedSeasonManager) -> SharedVotingManager {
    Arc::new(VotingManager::new(store, seasons))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GameConfig;
    use crate::managers::entry_manager::EntryManager;
    use crate::managers::locks::create_shared_season_locks;
    use crate::managers::season_manager::create_shared_season_manager;
    use crate::notify::testing::RecordingAnnouncer;
    use crate::state::{JsonStore, Store};
    use poise::serenity_prelude::{ChannelId, GuildId, UserId};
    use std::collections::HashSet;

    fn actor(user: u64) -> Actor {
        Actor {
            guild_id: GuildId::new(1),
            channel_id: ChannelId::new(2),
            user_id: UserId::new(user),
            user_name: format!("player{}", user),
        }
    }

    /// A season in round 1 voting with one response per player
    async fn voting_round(players: &[u64]) -> (Arc<JsonStore>, SharedSeasonManager, VotingManager, u64) {
        let store = Arc::new(JsonStore::in_memory());
        let seasons = create_shared_season_manager(
            store.clone(),
            RecordingAnnouncer::new(),
            Arc::new(GameConfig::default()),
            create_shared_season_locks(),
        );
        let entries = EntryManager::new(store.clone(), seasons.clone());
        seasons.activate(&actor(1), None).await.unwrap();
        let id = seasons.open_signups(&actor(1), "Describe a cloud.").await.unwrap().season.id;
        for &p in players {
            entries.sign_up(&actor(p), id, None, Some("sign-up")).await.unwrap();
        }
        seasons.open_round(&actor(1), "Describe rain.").await.unwrap();
        for &p in players {
            entries
                .submit_response(&actor(p), id, 1, &format!("rain by {}", p))
                .await
                .unwrap();
        }
        seasons.open_voting(&actor(1)).await.unwrap();

        let voting = VotingManager::with_rng(store.clone(), seasons.clone(), StdRng::seed_from_u64(7));
        (store, seasons, voting, id)
    }

    #[tokio::test]
    async fn test_voter_exhausted_after_every_pair() {
        let players = [10, 11, 12, 13, 14, 15];
        let (store, _seasons, voting, id) = voting_round(&players).await;
        let voter = actor(10);

        let mut outcome = voting.request_ballot(&voter, id, 1).await.unwrap();
        let mut seen = HashSet::new();
        while let BallotOutcome::Ballot(ballot) = outcome {
            let (a, b) = (ballot.first.0, ballot.second.0);
            assert!(seen.insert((a.min(b), a.max(b))));
            assert!(!ballot.first.1.ends_with("by 10"));
            assert!(!ballot.second.1.ends_with("by 10"));
            outcome = voting.cast_vote(&voter, id, 1, a, b).await.unwrap();
        }

        // Five other responses give C(5, 2) pairs
        assert_eq!(outcome, BallotOutcome::Exhausted { recorded_votes: 10 });
        assert_eq!(
            store.votes_by_user(id, 1, UserId::new(10)).await.unwrap().len(),
            10
        );
    }

    #[tokio::test]
    async fn test_insufficient_responses() {
        let (_store, _seasons, voting, id) = voting_round(&[10, 11]).await;
        assert_eq!(
            voting.request_ballot(&actor(10), id, 1).await.unwrap(),
            BallotOutcome::InsufficientResponses
        );
        // An outsider sees both responses
        assert!(matches!(
            voting.request_ballot(&actor(99), id, 1).await.unwrap(),
            BallotOutcome::Ballot(_)
        ));
    }

    #[tokio::test]
    async fn test_own_response_and_repeats() {
        let (store, _seasons, voting, id) = voting_round(&[10, 11, 12]).await;
        let responses = store.responses_for_round(id, 1).await.unwrap();
        let own = responses.iter().find(|r| r.user_id == UserId::new(10)).unwrap().id;
        let other = responses.iter().find(|r| r.user_id == UserId::new(11)).unwrap().id;
        let third = responses.iter().find(|r| r.user_id == UserId::new(12)).unwrap().id;

        let err = voting.cast_vote(&actor(10), id, 1, own, other).await.unwrap_err();
        assert!(matches!(err, BotError::InvalidVote { .. }));

        voting.cast_vote(&actor(10), id, 1, other, third).await.unwrap();
        let outcome = voting.cast_vote(&actor(10), id, 1, third, other).await.unwrap();
        assert_eq!(outcome, BallotOutcome::Exhausted { recorded_votes: 1 });
    }

    #[tokio::test]
    async fn test_vote_after_conclude_is_stale() {
        let (store, seasons, voting, id) = voting_round(&[10, 11, 12]).await;
        let BallotOutcome::Ballot(ballot) = voting.request_ballot(&actor(10), id, 1).await.unwrap() else {
            panic!("expected a ballot");
        };
        seasons.conclude(&actor(1)).await.unwrap();

        let err = voting
            .cast_vote(&actor(10), id, 1, ballot.first.0, ballot.second.0)
            .await
            .unwrap_err();
        assert!(matches!(err, BotError::StaleAction { round: 1, .. }));
        assert!(store.votes_for_round(id, 1).await.unwrap().is_empty());
    }
}
