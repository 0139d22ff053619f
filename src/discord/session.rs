//! Binds a [`Navigator`] to one posted message.

use poise::serenity_prelude as serenity;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::render::{navigator_components, page_embeds, parse_nav_event};
use crate::error::Result;
use crate::navigator::Navigator;

pub struct NavigatorSession {
    id: Uuid,
    navigator: Navigator,
    message: serenity::Message,
    timeout: Duration,
}

impl NavigatorSession {
    /// Post the navigator's current page with its controls
    pub async fn post(
        http: &Arc<serenity::Http>,
        channel_id: serenity::ChannelId,
        navigator: Navigator,
        timeout: Duration,
    ) -> Result<Self> {
        let id = Uuid::new_v4();
        let render = navigator.render();
        let message = channel_id
            .send_message(
                http,
                serenity::CreateMessage::new()
                    .embeds(page_embeds(navigator.current_page()))
                    .components(navigator_components(id, &navigator, render)),
            )
            .await?;
        debug!(
            "Navigator {} posted as message {} with {} page(s)",
            id,
            message.id,
            navigator.len()
        );

        Ok(Self {
            id,
            navigator,
            message,
            timeout,
        })
    }

    /// Handle interactions until none arrive within the timeout, then strip the controls
    pub async fn run(mut self, http: Arc<serenity::Http>, shard: serenity::ShardMessenger) {
        while let Some(interaction) = self
            .message
            .await_component_interaction(shard.clone())
            .timeout(self.timeout)
            .await
        {
            if let Err(e) = interaction
                .create_response(&http, serenity::CreateInteractionResponse::Acknowledge)
                .await
            {
                error!("Failed to acknowledge navigator {} interaction: {}", self.id, e);
                continue;
            }

            let values: &[String] = match &interaction.data.kind {
                serenity::ComponentInteractionDataKind::StringSelect { values } => values,
                _ => &[],
            };
            let Some(event) = parse_nav_event(self.id, &interaction.data.custom_id, values) else {
                continue;
            };

            let before = self.navigator.index();
            let render = self.navigator.handle(event);
            if render.index == before {
                continue;
            }

            let edit = serenity::EditMessage::new()
                .embeds(page_embeds(self.navigator.current_page()))
                .components(navigator_components(self.id, &self.navigator, render));
            if let Err(e) = self.message.edit(&http, edit).await {
                warn!("Failed to update navigator {}: {}", self.id, e);
            }
        }

        info!("Navigator {} expired, removing controls", self.id);
        if let Err(e) = self
            .message
            .edit(&http, serenity::EditMessage::new().components(vec![]))
            .await
        {
            warn!("Failed to remove controls from navigator {}: {}", self.id, e);
        }
    }
}
