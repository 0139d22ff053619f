use tracing::info;

use crate::managers::job_queue::Requester;
use crate::managers::recap_service::request_recap;
use crate::messages;
use crate::{Context, Error};

/// Post a recap of every week so far, with week navigation
#[poise::command(slash_command, guild_only, guild_cooldown = 30)]
pub async fn weeklyrecap(ctx: Context<'_>) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("This command must be used in a guild")?;
    let poise::Context::Application(app_ctx) = ctx else {
        return Err("This command is only available as a slash command".into());
    };
    let token = app_ctx.interaction.token.clone();

    // The worker reports back through follow-ups on this interaction
    ctx.defer_ephemeral().await?;

    let data = ctx.data();
    let requester = Requester::Interaction {
        user_id: ctx.author().id,
        token,
    };
    let content = match request_recap(&data.settings, &data.queue, guild_id, None, requester).await {
        Ok(position) => {
            info!(
                "Recap for guild {} queued by {} at position {}",
                guild_id,
                ctx.author().name,
                position
            );
            messages::recap_queued(position)
        }
        Err(e) => messages::user_error(&e),
    };

    ctx.send(poise::CreateReply::default()
        .content(content)
        .ephemeral(true))
        .await?;
    Ok(())
}
