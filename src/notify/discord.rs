use async_trait::async_trait;
use poise::serenity_prelude::{
    self as serenity, ChannelId, ChannelType, CreateEmbed, CreateMessage, CreateThread,
    EditMessage, GuildId, Http, MessageId, RoleId, UserId,
};
use std::sync::Arc;
use tracing::{debug, info};

use crate::components::announcement_components;
use crate::error::{BotError, Result};
use crate::models::Season;
use crate::notify::{Announcement, Announcer};
use crate::results::ResultEntry;

const RESULTS_COLOR: u32 = 0x3498db;

/// Announcer backed by the Discord REST API
pub struct DiscordAnnouncer {
    http: Arc<Http>,
}

impl DiscordAnnouncer {
    pub fn new(http: Arc<Http>) -> Self {
        Self { http }
    }
}

/// One results page as an embed, one field per ranked entry
pub fn render_page(heading: &str, page: &[ResultEntry]) -> CreateEmbed {
    page.iter().fold(
        CreateEmbed::new().title(heading).color(RESULTS_COLOR),
        |embed, entry| embed.field(entry.title(), entry.body(), false),
    )
}

#[async_trait]
impl Announcer for DiscordAnnouncer {
    async fn post_announcement(&self, season: &Season, announcement: &Announcement) -> Result<MessageId> {
        let message = season
            .channel_id
            .send_message(
                self.http.as_ref(),
                CreateMessage::new()
                    .content(&announcement.content)
                    .components(announcement_components(season, false)),
            )
            .await?;

        debug!(
            "Posted {} announcement {} in channel {}",
            season.phase, message.id, season.channel_id
        );
        Ok(message.id)
    }

    async fn deactivate_announcement(&self, season: &Season, message_id: MessageId) -> Result<()> {
        season
            .channel_id
            .edit_message(
                self.http.as_ref(),
                message_id,
                EditMessage::new().components(announcement_components(season, true)),
            )
            .await?;
        Ok(())
    }

    async fn post_results(&self, channel_id: ChannelId, heading: &str, pages: &[Vec<ResultEntry>]) -> Result<()> {
        for page in pages {
            channel_id
                .send_message(
                    self.http.as_ref(),
                    CreateMessage::new().embed(render_page(heading, page)),
                )
                .await?;
        }
        Ok(())
    }

    async fn open_host_thread(&self, season: &Season, host_role: Option<RoleId>) -> Result<ChannelId> {
        let thread = season
            .channel_id
            .create_thread(
                self.http.as_ref(),
                CreateThread::new(format!("Season {} hosts", season.id))
                    .kind(ChannelType::PrivateThread),
            )
            .await?;

        let greeting = match host_role {
            Some(role) => format!(
                "<@&{}> Prompt suggestions, feedback and results for this season will show up here.",
                role
            ),
            None => "Prompt suggestions, feedback and results for this season will show up here."
                .to_string(),
        };
        thread
            .id
            .send_message(self.http.as_ref(), CreateMessage::new().content(greeting))
            .await?;

        info!("Opened host thread {} for season {}", thread.id, season.id);
        Ok(thread.id)
    }

    async fn relay(&self, channel_id: ChannelId, content: &str) -> Result<()> {
        channel_id
            .send_message(self.http.as_ref(), CreateMessage::new().content(content))
            .await?;
        Ok(())
    }

    async fn display_name(&self, guild_id: GuildId, user_id: UserId) -> Result<Option<String>> {
        match guild_id.member(self.http.as_ref(), user_id).await {
            Ok(member) => Ok(Some(member.display_name().to_string())),
            // Members who left the guild show up as unknown authors
            Err(serenity::Error::Http(e)) if e.status_code().map(|s| s.as_u16()) == Some(404) => Ok(None),
            Err(e) => Err(BotError::from(e)),
        }
    }
}
