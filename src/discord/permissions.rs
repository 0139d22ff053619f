use poise::serenity_prelude::{ChannelId, GuildId, Http, Permissions, UserId};
use tracing::{error, info, warn};

use crate::error::{BotError, Result};

/// A single permission with its status
#[derive(Debug, Clone)]
pub struct PermissionStatus {
    pub name: &'static str,
    pub description: &'static str,
    pub has_permission: bool,
}

/// Everything the bot needs in a recap channel
pub fn required_post_permissions() -> Vec<(&'static str, &'static str, Permissions)> {
    vec![
        ("VIEW_CHANNEL", "See the recap channel", Permissions::VIEW_CHANNEL),
        ("SEND_MESSAGES", "Post recap messages", Permissions::SEND_MESSAGES),
        ("EMBED_LINKS", "Send recap cards as embeds", Permissions::EMBED_LINKS),
    ]
}

pub fn permission_statuses(granted: Permissions) -> Vec<PermissionStatus> {
    required_post_permissions()
        .into_iter()
        .map(|(name, description, permission)| PermissionStatus {
            name,
            description,
            has_permission: granted.contains(permission),
        })
        .collect()
}

/// Result of checking one channel
#[derive(Debug)]
pub struct ChannelPermissionCheck {
    pub guild_id: GuildId,
    pub guild_name: String,
    pub channel_id: ChannelId,
    pub channel_name: String,
    pub permission_statuses: Vec<PermissionStatus>,
}

impl ChannelPermissionCheck {
    pub fn missing(&self) -> Vec<&'static str> {
        self.permission_statuses
            .iter()
            .filter(|s| !s.has_permission)
            .map(|s| s.name)
            .collect()
    }

    pub fn into_result(self) -> Result<()> {
        let missing = self.missing();
        if missing.is_empty() {
            return Ok(());
        }
        Err(BotError::PermissionDenied {
            message: format!("I am missing {} in <#{}>.", missing.join(", "), self.channel_id),
        })
    }
}

/// Resolve the bot's effective permissions in a channel over HTTP
pub async fn check_channel_permissions(
    http: &Http,
    guild_id: GuildId,
    bot_user_id: UserId,
    channel_id: ChannelId,
) -> Result<ChannelPermissionCheck> {
    let guild = guild_id.to_partial_guild(http).await?;
    let bot_member = guild.member(http, bot_user_id).await?;

    let channel = channel_id
        .to_channel(http)
        .await?
        .guild()
        .filter(|c| c.guild_id == guild_id)
        .ok_or_else(|| BotError::PermissionDenied {
            message: format!("<#{}> is not a channel of this server.", channel_id),
        })?;

    let granted = guild.user_permissions_in(&channel, &bot_member);

    Ok(ChannelPermissionCheck {
        guild_id,
        guild_name: guild.name.clone(),
        channel_id,
        channel_name: channel.name.clone(),
        permission_statuses: permission_statuses(granted),
    })
}

/// Check every configured recap channel and log what is missing
pub async fn run_startup_permission_check(
    http: &Http,
    bot_user_id: UserId,
    channels: &[(GuildId, ChannelId)],
) {
    info!("Checking recap channel permissions for {} guild(s)", channels.len());

    let mut issues = 0;
    for (guild_id, channel_id) in channels {
        match check_channel_permissions(http, *guild_id, bot_user_id, *channel_id).await {
            Ok(check) => {
                let missing = check.missing();
                if missing.is_empty() {
                    info!(
                        "Guild '{}' (ID: {}): #{} OK",
                        check.guild_name, check.guild_id, check.channel_name
                    );
                } else {
                    issues += 1;
                    error!(
                        "Guild '{}' (ID: {}): missing {} in #{}",
                        check.guild_name,
                        check.guild_id,
                        missing.join(", "),
                        check.channel_name
                    );
                    for status in check.permission_statuses.iter().filter(|s| !s.has_permission) {
                        warn!("  - {}: needed to {}", status.name, status.description.to_lowercase());
                    }
                }
            }
            Err(e) => {
                issues += 1;
                warn!(
                    "Could not check channel {} in guild {}: {}",
                    channel_id, guild_id, e
                );
            }
        }
    }

    if issues > 0 {
        warn!("{} recap channel(s) cannot receive recaps until permissions are fixed", issues);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn check(granted: Permissions) -> ChannelPermissionCheck {
        ChannelPermissionCheck {
            guild_id: GuildId::new(1),
            guild_name: "League".to_string(),
            channel_id: ChannelId::new(2),
            channel_name: "recaps".to_string(),
            permission_statuses: permission_statuses(granted),
        }
    }

    #[test]
    fn test_all_granted() {
        let granted = Permissions::VIEW_CHANNEL | Permissions::SEND_MESSAGES | Permissions::EMBED_LINKS;
        assert!(check(granted).missing().is_empty());
        assert!(check(granted).into_result().is_ok());
    }

    #[test]
    fn test_missing_embed_links() {
        let c = check(Permissions::VIEW_CHANNEL | Permissions::SEND_MESSAGES);
        assert_eq!(c.missing(), vec!["EMBED_LINKS"]);
        match c.into_result() {
            Err(BotError::PermissionDenied { message }) => {
                assert!(message.contains("EMBED_LINKS"));
                assert!(message.contains("<#2>"));
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_nothing_granted() {
        assert_eq!(check(Permissions::empty()).missing().len(), 3);
    }
}
