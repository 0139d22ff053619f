// src/messages.rs

use poise::serenity_prelude::ChannelId;

use crate::error::BotError;

pub fn user_error(error: &BotError) -> String {
    match error {
        BotError::ConfigurationMissing { .. } => "⚙️ **No league configured**\n\n\
            This server has not been set up yet. An administrator needs to run `/setup` first."
            .to_string(),
        BotError::PermissionDenied { message } => format!(
            "🔒 **Missing permissions**\n\n\
            {}\n\n\
            Give me **Send Messages** and **Embed Links** in the recap channel, then try again.",
            message
        ),
        BotError::ValidationFailure { message } => format!(
            "❌ **Could not reach your league**\n\n\
            {}\n\n\
            Double-check the league id, season and both cookies (`SWID` and `espn_s2`). Nothing was saved.",
            message
        ),
        BotError::UpstreamTimeout { .. } => "⏱️ **ESPN is taking too long**\n\n\
            The league data did not arrive in time. Please try again in a few minutes."
            .to_string(),
        BotError::UpstreamFailure { .. } => "📡 **ESPN request failed**\n\n\
            I couldn't load the league data right now. Please try again later."
            .to_string(),
        BotError::NoRecapData { detail } => format!(
            "📭 **Nothing to recap**\n\n\
            No usable box scores were found ({}).",
            detail
        ),
        BotError::StateSave { .. } => "💾 **Settings not saved**\n\n\
            I couldn't write the settings to disk, so nothing was changed. Please try again later."
            .to_string(),
        BotError::Discord { .. } => {
            "⚠️ Discord rejected the recap message. Please try again later.".to_string()
        }
        _ => "⚠️ Something went wrong while building the recap. Please try again later.".to_string(),
    }
}

pub fn recap_queued(position: usize) -> String {
    if position <= 1 {
        "📬 Recap queued. I'll post it shortly.".to_string()
    } else {
        format!(
            "📬 Recap queued at position **{}**. I'll post it when it's ready.",
            position
        )
    }
}

pub fn recap_started() -> String {
    "🏈 Building your recap, this can take a moment...".to_string()
}

pub fn recap_posted(channel_id: ChannelId, pages: usize) -> String {
    if pages == 1 {
        format!("✅ Recap posted in <#{}>.", channel_id)
    } else {
        format!(
            "✅ Recap posted in <#{}> with **{}** weeks. Use the buttons to browse.",
            channel_id, pages
        )
    }
}

pub fn setup_success(league_name: &str, channel_id: ChannelId) -> String {
    format!(
        "✅ **League connected**\n\n\
        **{}** is now linked to this server.\n\
        Recaps will be posted in <#{}>.\n\n\
        Use `/autopost true` to post a recap every week, or `/weeklyrecap` to post one now.",
        league_name, channel_id
    )
}

pub fn configure_success() -> String {
    "✅ Settings updated.".to_string()
}

pub fn configure_nothing_to_change() -> String {
    "ℹ️ Nothing to change. Pass at least one option.".to_string()
}

pub fn autopost_toggled(enabled: bool) -> String {
    if enabled {
        "🗓️ Weekly auto-post **enabled**.".to_string()
    } else {
        "🗓️ Weekly auto-post **disabled**.".to_string()
    }
}

pub fn cooldown(remaining_secs: u64) -> String {
    format!(
        "⏳ A recap was requested here recently. Try again in {}s.",
        remaining_secs.max(1)
    )
}
