use async_trait::async_trait;
use poise::serenity_prelude as serenity;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use super::permissions::check_channel_permissions;
use super::render::page_embeds;
use super::session::NavigatorSession;
use crate::error::Result;
use crate::managers::job_queue::Requester;
use crate::managers::recap_service::RecapSink;
use crate::navigator::Navigator;
use crate::recap::Page;

/// Posts recaps through the Discord HTTP API
pub struct DiscordSink {
    http: Arc<serenity::Http>,
    shard: serenity::ShardMessenger,
    bot_user_id: serenity::UserId,
    navigator_timeout: Duration,
}

impl DiscordSink {
    pub fn new(
        http: Arc<serenity::Http>,
        shard: serenity::ShardMessenger,
        bot_user_id: serenity::UserId,
        navigator_timeout: Duration,
    ) -> Self {
        Self {
            http,
            shard,
            bot_user_id,
            navigator_timeout,
        }
    }
}

#[async_trait]
impl RecapSink for DiscordSink {
    async fn check_post_permissions(
        &self,
        guild_id: serenity::GuildId,
        channel_id: serenity::ChannelId,
    ) -> Result<()> {
        check_channel_permissions(&self.http, guild_id, self.bot_user_id, channel_id)
            .await?
            .into_result()
    }

    async fn post_page(&self, channel_id: serenity::ChannelId, page: &Page) -> Result<()> {
        channel_id
            .send_message(
                &self.http,
                serenity::CreateMessage::new().embeds(page_embeds(page)),
            )
            .await?;
        Ok(())
    }

    async fn post_navigator(&self, channel_id: serenity::ChannelId, pages: Vec<Page>) -> Result<()> {
        let navigator = Navigator::new(pages)?;
        let session =
            NavigatorSession::post(&self.http, channel_id, navigator, self.navigator_timeout).await?;
        tokio::spawn(session.run(self.http.clone(), self.shard.clone()));
        Ok(())
    }

    async fn notify(&self, requester: &Requester, message: &str) {
        let Requester::Interaction { user_id, token } = requester else {
            return;
        };
        let followup = serenity::CreateInteractionResponseFollowup::new()
            .content(message)
            .ephemeral(true);
        match self.http.create_followup_message(token, &followup, vec![]).await {
            Ok(_) => debug!("Sent follow-up to {}", user_id),
            Err(e) => warn!("Failed to send follow-up to {}: {}", user_id, e),
        }
    }
}
