// src/models.rs
use chrono::{DateTime, Utc};
use poise::serenity_prelude::{ChannelId, GuildId, MessageId, RoleId, UserId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Phase of a season
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SeasonPhase {
    /// Between seasons; also the placeholder phase of a freshly activated channel
    Hibernating,
    Registering,
    Responding,
    Voting,
    Idle,
}

impl SeasonPhase {
    pub fn name(&self) -> &'static str {
        match self {
            SeasonPhase::Hibernating => "HIBERNATING",
            SeasonPhase::Registering => "REGISTERING",
            SeasonPhase::Responding => "RESPONDING",
            SeasonPhase::Voting => "VOTING",
            SeasonPhase::Idle => "IDLE",
        }
    }
}

impl fmt::Display for SeasonPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One play-through bound to a channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Season {
    pub id: u64,
    pub guild_id: GuildId,
    pub channel_id: ChannelId,

    /// Host discussion thread, created lazily
    #[serde(default)]
    pub private_channel_id: Option<ChannelId>,

    pub phase: SeasonPhase,
    pub round: u32,

    /// Message carrying the live buttons for the current phase
    #[serde(default)]
    pub announcement_id: Option<MessageId>,

    pub created_at: DateTime<Utc>,
}

impl Season {
    pub fn new(id: u64, guild_id: GuildId, channel_id: ChannelId, phase: SeasonPhase) -> Self {
        Self {
            id,
            guild_id,
            channel_id,
            private_channel_id: None,
            phase,
            round: 0,
            announcement_id: None,
            created_at: Utc::now(),
        }
    }
}

/// A channel enabled for the game
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelBinding {
    pub channel_id: ChannelId,
    #[serde(default)]
    pub host_role_id: Option<RoleId>,
    pub current_season_id: u64,
}

/// A user's membership in one season
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Participant {
    pub id: u64,
    pub season_id: u64,
    pub user_id: UserId,
    #[serde(default)]
    pub moniker: Option<String>,
    #[serde(default)]
    pub score: i64,
}

impl Participant {
    pub fn new(id: u64, season_id: u64, user_id: UserId) -> Self {
        Self {
            id,
            season_id,
            user_id,
            moniker: None,
            score: 0,
        }
    }
}

/// One user's entry for one round
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub id: u64,
    pub season_id: u64,
    pub user_id: UserId,
    pub round: u32,
    #[serde(default)]
    pub content: Option<String>,
    pub rating: f64,
    #[serde(default)]
    pub upvotes: u32,
    #[serde(default)]
    pub downvotes: u32,
    #[serde(default)]
    pub score: Option<i64>,
}

impl Response {
    pub fn new(id: u64, season_id: u64, user_id: UserId, round: u32, initial_rating: f64) -> Self {
        Self {
            id,
            season_id,
            user_id,
            round,
            content: None,
            rating: initial_rating,
            upvotes: 0,
            downvotes: 0,
            score: None,
        }
    }

    pub fn is_submitted(&self) -> bool {
        self.content.is_some()
    }

    pub fn word_count(&self) -> usize {
        self.content
            .as_deref()
            .map(|c| c.split_whitespace().count())
            .unwrap_or(0)
    }
}

/// One voter's pairwise judgment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vote {
    pub id: u64,
    pub season_id: u64,
    pub user_id: UserId,
    pub round: u32,
    pub preferred_id: u64,
    pub rejected_id: u64,
}

impl Vote {
    /// Whether this vote compares `a` and `b`, in either order
    pub fn covers(&self, a: u64, b: u64) -> bool {
        (self.preferred_id == a && self.rejected_id == b)
            || (self.preferred_id == b && self.rejected_id == a)
    }

    pub fn touches(&self, response_id: u64) -> bool {
        self.preferred_id == response_id || self.rejected_id == response_id
    }
}

/// A prompt suggested by a user while the channel hibernates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptSuggestion {
    pub id: u64,
    pub season_id: u64,
    pub user_id: UserId,
    pub content: String,
    pub submitted_at: DateTime<Utc>,
}

/// Who issued a command or clicked a button, and where
#[derive(Debug, Clone, PartialEq)]
pub struct Actor {
    pub guild_id: GuildId,
    pub channel_id: ChannelId,
    pub user_id: UserId,
    pub user_name: String,
}

impl Actor {
    /// Log prefix `[guild | channel | user]`
    pub fn chip(&self) -> String {
        format!("[{} | {} | {}]", self.guild_id, self.channel_id, self.user_name)
    }
}

/// Normalize user text: newlines become spaces, surrounding whitespace is trimmed
pub fn flatten_text(input: &str) -> String {
    input.replace(['\r', '\n'], " ").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vote_covers_both_orders() {
        let vote = Vote {
            id: 1,
            season_id: 1,
            user_id: UserId::new(5),
            round: 1,
            preferred_id: 10,
            rejected_id: 20,
        };

        assert!(vote.covers(10, 20));
        assert!(vote.covers(20, 10));
        assert!(!vote.covers(10, 30));
        assert!(vote.touches(20));
        assert!(!vote.touches(30));
    }

    #[test]
    fn test_word_count_and_flatten() {
        let mut response = Response::new(1, 1, UserId::new(5), 1, 1000.0);
        assert_eq!(response.word_count(), 0);
        assert!(!response.is_submitted());

        response.content = Some(flatten_text("ten words\nor fewer  please\n"));
        assert_eq!(response.content.as_deref(), Some("ten words or fewer  please"));
        assert_eq!(response.word_count(), 5);
    }

    #[test]
    fn test_phase_serialization() {
        let json = serde_json::to_string(&SeasonPhase::Voting).unwrap();
        assert_eq!(json, "\"voting\"");
        assert_eq!(SeasonPhase::Voting.to_string(), "VOTING");
    }
}
