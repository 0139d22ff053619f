use poise::serenity_prelude as serenity;
use tracing::{info, warn};

use crate::managers::recap_service::{fetch_league_status, validate_league};
use crate::messages;
use crate::state::{GuildSettings, SettingsUpdate};
use crate::{Context, Error};

async fn reply_private(ctx: Context<'_>, content: impl Into<String>) -> Result<(), Error> {
    ctx.send(poise::CreateReply::default()
        .content(content)
        .ephemeral(true))
        .await?;
    Ok(())
}

/// Connect this server to an ESPN fantasy football league
#[poise::command(
    slash_command,
    guild_only,
    default_member_permissions = "MANAGE_GUILD"
)]
pub async fn setup(
    ctx: Context<'_>,
    #[description = "ESPN league id"] league_id: u64,
    #[description = "Season year, e.g. 2024"] season: u16,
    #[description = "SWID cookie, including the braces"] swid: String,
    #[description = "espn_s2 cookie"] espn_s2: String,
    #[description = "Channel recaps are posted in"]
    #[channel_types("Text")]
    channel: serenity::GuildChannel,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("This command must be used in a guild")?;

    // Validation goes through the upstream gate and can take a while
    ctx.defer_ephemeral().await?;

    let settings = GuildSettings {
        league_id,
        season,
        swid,
        espn_s2,
        channel_id: channel.id.get(),
        autopost_enabled: false,
        starters_only: false,
    };

    let data = ctx.data();
    let status = match validate_league(&data.gate, &data.client, &settings.credentials()).await {
        Ok(status) => status,
        Err(e) => {
            warn!("Setup rejected for guild {}: {}", guild_id, e);
            return reply_private(ctx, messages::user_error(&e)).await;
        }
    };

    let saved = data
        .settings
        .write()
        .await
        .commit(guild_id, |store| {
            store.upsert(guild_id, settings);
            Ok(())
        })
        .await;
    if let Err(e) = saved {
        return reply_private(ctx, messages::user_error(&e)).await;
    }

    info!(
        "Guild {} linked to league {} ({}) season {}",
        guild_id, league_id, status.league_name, season
    );
    reply_private(ctx, messages::setup_success(&status.league_name, channel.id)).await
}

/// Change part of this server's league settings
#[poise::command(
    slash_command,
    guild_only,
    default_member_permissions = "MANAGE_GUILD"
)]
pub async fn configure(
    ctx: Context<'_>,
    #[description = "ESPN league id"] league_id: Option<u64>,
    #[description = "Season year"] season: Option<u16>,
    #[description = "SWID cookie"] swid: Option<String>,
    #[description = "espn_s2 cookie"] espn_s2: Option<String>,
    #[description = "Channel recaps are posted in"]
    #[channel_types("Text")]
    channel: Option<serenity::GuildChannel>,
    #[description = "Ignore bench players when picking top performers"] starters_only: Option<bool>,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("This command must be used in a guild")?;

    let update = SettingsUpdate {
        league_id,
        season,
        swid,
        espn_s2,
        channel_id: channel.map(|c| c.id.get()),
        starters_only,
    };
    if update.is_empty() {
        return reply_private(ctx, messages::configure_nothing_to_change()).await;
    }

    let data = ctx.data();
    let current = data.settings.read().await.require(guild_id).cloned();
    let current = match current {
        Ok(settings) => settings,
        Err(e) => return reply_private(ctx, messages::user_error(&e)).await,
    };

    if update.changes_credentials() {
        ctx.defer_ephemeral().await?;
        let candidate = update.applied_to(&current);
        if let Err(e) = validate_league(&data.gate, &data.client, &candidate.credentials()).await {
            warn!("Configure rejected for guild {}: {}", guild_id, e);
            return reply_private(ctx, messages::user_error(&e)).await;
        }
    }

    let saved = data
        .settings
        .write()
        .await
        .commit(guild_id, |store| store.update(guild_id, update).map(|_| ()))
        .await;
    if let Err(e) = saved {
        return reply_private(ctx, messages::user_error(&e)).await;
    }

    info!("Guild {} settings updated by {}", guild_id, ctx.author().name);
    reply_private(ctx, messages::configure_success()).await
}

/// Turn the weekly automatic recap on or off
#[poise::command(
    slash_command,
    guild_only,
    default_member_permissions = "MANAGE_GUILD"
)]
pub async fn autopost(
    ctx: Context<'_>,
    #[description = "Post a recap every week"] enabled: bool,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("This command must be used in a guild")?;

    let saved = ctx
        .data()
        .settings
        .write()
        .await
        .commit(guild_id, |store| store.set_autopost(guild_id, enabled))
        .await;
    if let Err(e) = saved {
        return reply_private(ctx, messages::user_error(&e)).await;
    }

    info!("Guild {} autopost set to {}", guild_id, enabled);
    reply_private(ctx, messages::autopost_toggled(enabled)).await
}

/// Show this server's saved league settings
#[poise::command(slash_command, guild_only)]
pub async fn settings(ctx: Context<'_>) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("This command must be used in a guild")?;

    let saved = ctx.data().settings.read().await.get(guild_id).cloned();
    let Some(saved) = saved else {
        return reply_private(
            ctx,
            messages::user_error(&crate::error::BotError::ConfigurationMissing {
                guild_id: guild_id.to_string(),
            }),
        )
        .await;
    };

    ctx.send(poise::CreateReply::default()
        .embed(settings_embed(&saved))
        .ephemeral(true))
        .await?;
    Ok(())
}

fn set_or_unset(value: &str) -> &'static str {
    if value.trim().is_empty() {
        "❌ not set"
    } else {
        "✅ set"
    }
}

fn settings_embed(settings: &GuildSettings) -> serenity::CreateEmbed {
    let channel = settings
        .channel()
        .map(|c| format!("<#{}>", c))
        .unwrap_or_else(|| "not set".to_string());

    serenity::CreateEmbed::new()
        .title("League Settings")
        .field("League", settings.league_id.to_string(), true)
        .field("Season", settings.season.to_string(), true)
        .field("Channel", channel, true)
        .field("SWID", set_or_unset(&settings.swid), true)
        .field("espn_s2", set_or_unset(&settings.espn_s2), true)
        .field("Auto-post", if settings.autopost_enabled { "on" } else { "off" }, true)
        .field("Starters only", if settings.starters_only { "yes" } else { "no" }, true)
        .color(0x3498db)
}

/// Show which week the league is on
#[poise::command(slash_command, guild_only)]
pub async fn debugweek(ctx: Context<'_>) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("This command must be used in a guild")?;
    let data = ctx.data();

    let credentials = data
        .settings
        .read()
        .await
        .require(guild_id)
        .map(GuildSettings::credentials);
    let credentials = match credentials {
        Ok(credentials) => credentials,
        Err(e) => return reply_private(ctx, messages::user_error(&e)).await,
    };

    ctx.defer_ephemeral().await?;
    let status = match fetch_league_status(&data.gate, &data.client, &credentials).await {
        Ok(status) => status,
        Err(e) => return reply_private(ctx, messages::user_error(&e)).await,
    };

    let embed = serenity::CreateEmbed::new()
        .title(format!("{} ({})", status.league_name, credentials.season))
        .field("Current week", status.current_week.to_string(), true)
        .field("Matchup period", status.current_matchup_period.to_string(), true)
        .field("Latest scoring period", status.latest_scoring_period.to_string(), true)
        .field("Final regular-season week", status.final_week.to_string(), true)
        .field("Teams", status.teams.len().to_string(), true)
        .color(0x95a5a6);

    ctx.send(poise::CreateReply::default()
        .embed(embed)
        .ephemeral(true))
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::guild_settings::sample_settings;

    #[test]
    fn test_credentials_are_never_echoed() {
        let settings = sample_settings(1, 2);
        assert_eq!(set_or_unset(&settings.swid), "✅ set");
        assert_eq!(set_or_unset(""), "❌ not set");
        assert_eq!(set_or_unset("   "), "❌ not set");
    }
}
