use poise::serenity_prelude as serenity;
use tracing::info;

use crate::{Context, Error};

/// Check if the bot is running
#[poise::command(slash_command)]
pub async fn ping(ctx: Context<'_>) -> Result<(), Error> {
    info!("Ping command called by {}", ctx.author().name);
    let pending = ctx.data().queue.pending();
    ctx.send(poise::CreateReply::default()
        .content(format!("🏓 Pong! {} recap(s) waiting in the queue.", pending))
        .ephemeral(true))
        .await?;
    Ok(())
}

/// Show help information
#[poise::command(slash_command)]
pub async fn help(ctx: Context<'_>) -> Result<(), Error> {
    let embed = serenity::CreateEmbed::new()
        .title("Fantasy Recap Commands")
        .description("Available commands:")
        .field("/setup", "Connect this server to an ESPN league (Manage Server)", false)
        .field("/configure", "Change league, cookies, channel or bench handling (Manage Server)", false)
        .field("/autopost", "Turn the weekly automatic recap on or off (Manage Server)", false)
        .field("/weeklyrecap", "Post a recap of every week so far with week navigation", false)
        .field("/settings", "Show the saved league settings", false)
        .field("/debugweek", "Show which week the league is on", false)
        .field("/ping", "Check if the bot is running", false)
        .color(0x3498db);

    ctx.send(poise::CreateReply::default().embed(embed).ephemeral(true)).await?;
    Ok(())
}
