use thiserror::Error;

use crate::models::SeasonPhase;

#[derive(Error, Debug)]
pub enum BotError {
    // Configuration errors
    #[error("Failed to load config file '{path}': {source}")]
    ConfigLoad {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file '{path}': {source}")]
    ConfigParse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid config: {message}")]
    ConfigValidation { message: String },

    // State errors
    #[error("Failed to save state to '{path}': {source}")]
    StateSave {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to load state from '{path}': {source}")]
    StateLoad {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Store error: {message}")]
    Store { message: String },

    /// A lookup found zero or several rows where exactly one must exist.
    #[error("Store invariant violated: {message}")]
    Invariant { message: String },

    // Game errors
    #[error("{message}")]
    InvalidTransition {
        current: SeasonPhase,
        command: &'static str,
        message: String,
    },

    #[error("No season is active in this channel. Use `/activate` first.")]
    NotActive { channel_id: String },

    #[error("A season is already active in this channel ({phase}).")]
    AlreadyActive {
        channel_id: String,
        phase: SeasonPhase,
    },

    #[error("You are not signed up to participate in this season! Make sure to sign up next season.")]
    NotRegistered { user_id: String },

    #[error("You have not submitted a response this round.")]
    NoResponse { user_id: String },

    #[error("This message belongs to a round that is no longer open.")]
    StaleAction { season_id: u64, round: u32 },

    #[error("Invalid vote: {message}")]
    InvalidVote { message: String },

    #[error("{message}")]
    InvalidInput { message: String },

    // Discord errors
    #[error("Discord API error: {message}")]
    Discord { message: String },

    #[error("Notification failed: {message}")]
    Notify { message: String },
}

impl BotError {
    /// Whether the error is a rejection the user caused and can fix, as opposed to a failure
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            BotError::InvalidTransition { .. }
                | BotError::NotActive { .. }
                | BotError::AlreadyActive { .. }
                | BotError::NotRegistered { .. }
                | BotError::NoResponse { .. }
                | BotError::StaleAction { .. }
                | BotError::InvalidVote { .. }
                | BotError::InvalidInput { .. }
        )
    }
}

impl From<serenity::Error> for BotError {
    fn from(err: serenity::Error) -> Self {
        BotError::Discord {
            message: err.to_string(),
        }
    }
}

impl From<std::io::Error> for BotError {
    fn from(err: std::io::Error) -> Self {
        BotError::Store {
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for BotError {
    fn from(err: serde_json::Error) -> Self {
        BotError::Store {
            message: err.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, BotError>;

use poise::serenity_prelude as serenity;
