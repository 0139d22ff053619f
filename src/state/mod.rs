pub mod guild_settings;

pub use guild_settings::{
    create_shared_settings_store, GuildSettings, LeagueCredentials, SettingsStore,
    SettingsUpdate, SharedSettingsStore,
};
