//! Outbound side effects: announcements, result pages and host relays.
//!
//! The game managers only talk to the chat platform through [`Announcer`], so
//! they can be exercised without a gateway connection.

pub mod discord;

use async_trait::async_trait;
use poise::serenity_prelude::{ChannelId, GuildId, MessageId, RoleId, UserId};
use std::sync::Arc;

use crate::error::Result;
use crate::models::Season;
use crate::results::ResultEntry;

pub use discord::DiscordAnnouncer;

/// A message that opens a phase of a season
#[derive(Debug, Clone, PartialEq)]
pub struct Announcement {
    pub content: String,
}

#[async_trait]
pub trait Announcer: Send + Sync {
    /// Post the announcement for the season's current phase, with the phase's buttons
    async fn post_announcement(&self, season: &Season, announcement: &Announcement)
        -> Result<MessageId>;

    /// Disable the buttons of an earlier announcement; `season` is the state it was posted for
    async fn deactivate_announcement(&self, season: &Season, message_id: MessageId) -> Result<()>;

    /// Post ranked result pages
    async fn post_results(&self, channel_id: ChannelId, heading: &str, pages: &[Vec<ResultEntry>])
        -> Result<()>;

    /// Create the private host thread for a season
    async fn open_host_thread(&self, season: &Season, host_role: Option<RoleId>) -> Result<ChannelId>;

    /// Post a plain message into a channel or thread
    async fn relay(&self, channel_id: ChannelId, content: &str) -> Result<()>;

    /// Display name of a guild member, if they can still be found
    async fn display_name(&self, guild_id: GuildId, user_id: UserId) -> Result<Option<String>>;
}

/// Shared announcer type
pub type SharedAnnouncer = Arc<dyn Announcer>;

#[cfg(test)]
pub mod testing {
    use super::*;
    use crate::error::BotError;
    use crate::models::SeasonPhase;
    use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

    /// Everything an announcer was asked to do
    #[derive(Debug, Clone, PartialEq)]
    pub enum Call {
        Posted { season_id: u64, phase: SeasonPhase, message_id: MessageId, content: String },
        Deactivated { season_id: u64, phase: SeasonPhase, message_id: MessageId },
        Results { channel_id: ChannelId, heading: String, entries: usize },
        ThreadOpened { season_id: u64, thread_id: ChannelId },
        Relayed { channel_id: ChannelId, content: String },
    }

    /// Announcer that records calls and can be told to fail
    #[derive(Default)]
    pub struct RecordingAnnouncer {
        pub calls: parking_lot::Mutex<Vec<Call>>,
        pub fail_posts: AtomicBool,
        next_id: AtomicU64,
    }

    impl RecordingAnnouncer {
        pub fn new() -> Arc<Self> {
            Arc::new(Self {
                next_id: AtomicU64::new(500),
                ..Default::default()
            })
        }

        pub fn calls(&self) -> Vec<Call> {
            self.calls.lock().clone()
        }

        pub fn clear(&self) {
            self.calls.lock().clear();
        }

        fn id(&self) -> u64 {
            self.next_id.fetch_add(1, Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Announcer for RecordingAnnouncer {
        async fn post_announcement(
            &self,
            season: &Season,
            announcement: &Announcement,
        ) -> Result<MessageId> {
            if self.fail_posts.load(Ordering::SeqCst) {
                return Err(BotError::Notify {
                    message: "announcements are down".to_string(),
                });
            }
            let message_id = MessageId::new(self.id());
            self.calls.lock().push(Call::Posted {
                season_id: season.id,
                phase: season.phase,
                message_id,
                content: announcement.content.clone(),
            });
            Ok(message_id)
        }

        async fn deactivate_announcement(&self, season: &Season, message_id: MessageId) -> Result<()> {
            self.calls.lock().push(Call::Deactivated {
                season_id: season.id,
                phase: season.phase,
                message_id,
            });
            Ok(())
        }

        async fn post_results(
            &self,
            channel_id: ChannelId,
            heading: &str,
            pages: &[Vec<ResultEntry>],
        ) -> Result<()> {
            self.calls.lock().push(Call::Results {
                channel_id,
                heading: heading.to_string(),
                entries: pages.iter().map(|p| p.len()).sum(),
            });
            Ok(())
        }

        async fn open_host_thread(&self, season: &Season, _host_role: Option<RoleId>) -> Result<ChannelId> {
            let thread_id = ChannelId::new(self.id());
            self.calls.lock().push(Call::ThreadOpened {
                season_id: season.id,
                thread_id,
            });
            Ok(thread_id)
        }

        async fn relay(&self, channel_id: ChannelId, content: &str) -> Result<()> {
            self.calls.lock().push(Call::Relayed {
                channel_id,
                content: content.to_string(),
            });
            Ok(())
        }

        async fn display_name(&self, _guild_id: GuildId, user_id: UserId) -> Result<Option<String>> {
            Ok(Some(format!("user{}", user_id)))
        }
    }
}
