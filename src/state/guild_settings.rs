use poise::serenity_prelude::{ChannelId, GuildId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::{BotError, Result};

/// League configuration saved for one guild
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GuildSettings {
    pub league_id: u64,
    pub season: u16,
    /// ESPN `SWID` cookie
    pub swid: String,
    /// ESPN `espn_s2` cookie
    pub espn_s2: String,
    pub channel_id: u64,
    #[serde(default)]
    pub autopost_enabled: bool,
    /// Skip bench slots when picking weekly top performers
    #[serde(default)]
    pub starters_only: bool,
}

impl GuildSettings {
    /// The configured post channel, if any
    pub fn channel(&self) -> Option<ChannelId> {
        (self.channel_id != 0).then(|| ChannelId::new(self.channel_id))
    }

    pub fn credentials(&self) -> LeagueCredentials {
        LeagueCredentials {
            league_id: self.league_id,
            season: self.season,
            swid: self.swid.clone(),
            espn_s2: self.espn_s2.clone(),
        }
    }
}

/// Everything the upstream client needs to read one league
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct LeagueCredentials {
    pub league_id: u64,
    pub season: u16,
    pub swid: String,
    pub espn_s2: String,
}

// Cookies never end up in logs
impl std::fmt::Debug for LeagueCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LeagueCredentials")
            .field("league_id", &self.league_id)
            .field("season", &self.season)
            .finish_non_exhaustive()
    }
}

/// Partial update applied by `/configure`
#[derive(Debug, Clone, Default)]
pub struct SettingsUpdate {
    pub league_id: Option<u64>,
    pub season: Option<u16>,
    pub swid: Option<String>,
    pub espn_s2: Option<String>,
    pub channel_id: Option<u64>,
    pub starters_only: Option<bool>,
}

impl SettingsUpdate {
    pub fn is_empty(&self) -> bool {
        self.league_id.is_none()
            && self.season.is_none()
            && self.swid.is_none()
            && self.espn_s2.is_none()
            && self.channel_id.is_none()
            && self.starters_only.is_none()
    }

    /// Whether the update touches anything the upstream client uses
    pub fn changes_credentials(&self) -> bool {
        self.league_id.is_some()
            || self.season.is_some()
            || self.swid.is_some()
            || self.espn_s2.is_some()
    }

    /// `settings` with this update applied, leaving the original untouched
    pub fn applied_to(&self, settings: &GuildSettings) -> GuildSettings {
        let mut next = settings.clone();
        self.clone().apply(&mut next);
        next
    }

    fn apply(self, settings: &mut GuildSettings) {
        if let Some(v) = self.league_id {
            settings.league_id = v;
        }
        if let Some(v) = self.season {
            settings.season = v;
        }
        if let Some(v) = self.swid {
            settings.swid = v;
        }
        if let Some(v) = self.espn_s2 {
            settings.espn_s2 = v;
        }
        if let Some(v) = self.channel_id {
            settings.channel_id = v;
        }
        if let Some(v) = self.starters_only {
            settings.starters_only = v;
        }
    }
}

/// Flat JSON document of guild id -> settings.
///
/// Writers are last-writer-wins; every mutation is followed by [`SettingsStore::save`].
#[derive(Debug)]
pub struct SettingsStore {
    path: PathBuf,
    guilds: HashMap<String, GuildSettings>,
}

impl SettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            guilds: HashMap::new(),
        }
    }

    /// Load from a JSON file, or start empty if it does not exist yet
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let display = path.display().to_string();

        match tokio::fs::read_to_string(path).await {
            Ok(content) => {
                let guilds = serde_json::from_str(&content).map_err(|e| BotError::StateParse {
                    path: display,
                    source: e,
                })?;
                Ok(Self {
                    path: path.to_path_buf(),
                    guilds,
                })
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::new(path)),
            Err(e) => Err(BotError::StateLoad {
                path: display,
                source: e,
            }),
        }
    }

    /// Save to the backing file atomically
    pub async fn save(&self) -> Result<()> {
        let display = self.path.display().to_string();
        let content = serde_json::to_string_pretty(&self.guilds)?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| BotError::StateSave {
                    path: display.clone(),
                    source: e,
                })?;
        }

        // Write to temp file first, then rename for atomicity
        let mut temp_path = self.path.clone().into_os_string();
        temp_path.push(".tmp");
        tokio::fs::write(&temp_path, &content)
            .await
            .map_err(|e| BotError::StateSave {
                path: display.clone(),
                source: e,
            })?;

        tokio::fs::rename(&temp_path, &self.path)
            .await
            .map_err(|e| BotError::StateSave {
                path: display,
                source: e,
            })?;

        Ok(())
    }

    /// Apply `change` to one guild and save. If the change or the save fails
    /// the guild's entry is restored, so memory never runs ahead of disk.
    pub async fn commit<T>(
        &mut self,
        guild_id: GuildId,
        change: impl FnOnce(&mut Self) -> Result<T>,
    ) -> Result<T> {
        let key = guild_id.to_string();
        let previous = self.guilds.get(&key).cloned();

        let outcome = match change(self) {
            Ok(value) => self.save().await.map(|_| value),
            Err(e) => Err(e),
        };
        if outcome.is_err() {
            match previous {
                Some(settings) => self.guilds.insert(key, settings),
                None => self.guilds.remove(&key),
            };
        }
        outcome
    }

    pub fn get(&self, guild_id: GuildId) -> Option<&GuildSettings> {
        self.guilds.get(&guild_id.to_string())
    }

    /// Fetch settings or fail with `ConfigurationMissing`
    pub fn require(&self, guild_id: GuildId) -> Result<&GuildSettings> {
        self.get(guild_id).ok_or_else(|| BotError::ConfigurationMissing {
            guild_id: guild_id.to_string(),
        })
    }

    /// Insert or replace a guild's settings, keeping its existing autopost flag
    pub fn upsert(&mut self, guild_id: GuildId, mut settings: GuildSettings) {
        if let Some(existing) = self.guilds.get(&guild_id.to_string()) {
            settings.autopost_enabled = existing.autopost_enabled;
        }
        self.guilds.insert(guild_id.to_string(), settings);
    }

    /// Apply a partial update; the guild must already be set up
    pub fn update(&mut self, guild_id: GuildId, update: SettingsUpdate) -> Result<&GuildSettings> {
        let settings = self
            .guilds
            .get_mut(&guild_id.to_string())
            .ok_or_else(|| BotError::ConfigurationMissing {
                guild_id: guild_id.to_string(),
            })?;
        update.apply(settings);
        Ok(&*settings)
    }

    pub fn set_autopost(&mut self, guild_id: GuildId, enabled: bool) -> Result<()> {
        let settings = self
            .guilds
            .get_mut(&guild_id.to_string())
            .ok_or_else(|| BotError::ConfigurationMissing {
                guild_id: guild_id.to_string(),
            })?;
        settings.autopost_enabled = enabled;
        Ok(())
    }

    /// Guilds that want the weekly auto-post and have a channel to post in
    pub fn autopost_guilds(&self) -> Vec<(GuildId, GuildSettings)> {
        let mut guilds: Vec<(GuildId, GuildSettings)> = self
            .guilds
            .iter()
            .filter(|(_, s)| s.autopost_enabled && s.channel_id != 0)
            .filter_map(|(id, s)| {
                id.parse::<u64>()
                    .ok()
                    .filter(|id| *id != 0)
                    .map(|id| (GuildId::new(id), s.clone()))
            })
            .collect();
        guilds.sort_by_key(|(id, _)| *id);
        guilds
    }

    pub fn guild_count(&self) -> usize {
        self.guilds.len()
    }
}

/// Shared settings store type
pub type SharedSettingsStore = Arc<tokio::sync::RwLock<SettingsStore>>;

pub fn create_shared_settings_store(store: SettingsStore) -> SharedSettingsStore {
    Arc::new(tokio::sync::RwLock::new(store))
}

#[cfg(test)]
pub(crate) fn sample_settings(league_id: u64, channel_id: u64) -> GuildSettings {
    GuildSettings {
        league_id,
        season: 2024,
        swid: "{SWID-COOKIE}".to_string(),
        espn_s2: "s2-cookie".to_string(),
        channel_id,
        autopost_enabled: false,
        starters_only: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_load_missing_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = SettingsStore::load(dir.path().join("nope.json")).await.unwrap();
        assert_eq!(store.guild_count(), 0);
    }

    #[tokio::test]
    async fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("settings.json");

        let mut store = SettingsStore::new(&path);
        store.upsert(GuildId::new(42), sample_settings(1234, 99));
        store.set_autopost(GuildId::new(42), true).unwrap();
        store.save().await.unwrap();

        let reloaded = SettingsStore::load(&path).await.unwrap();
        let settings = reloaded.get(GuildId::new(42)).unwrap();
        assert_eq!(settings.league_id, 1234);
        assert_eq!(settings.channel(), Some(ChannelId::new(99)));
        assert!(settings.autopost_enabled);

        // Stored as a flat guild id -> record document
        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert!(raw.get("42").is_some());
    }

    #[tokio::test]
    async fn test_failed_save_rolls_back_change() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "not a directory").unwrap();

        // The parent of the settings file is a regular file, so saving fails
        let mut store = SettingsStore::new(blocker.join("settings.json"));
        store.upsert(GuildId::new(7), sample_settings(1, 2));

        let result = store
            .commit(GuildId::new(7), |s| s.set_autopost(GuildId::new(7), true))
            .await;
        assert!(matches!(result, Err(BotError::StateSave { .. })));
        assert!(!store.get(GuildId::new(7)).unwrap().autopost_enabled);

        let result = store
            .commit(GuildId::new(8), |s| {
                s.upsert(GuildId::new(8), sample_settings(3, 4));
                Ok(())
            })
            .await;
        assert!(result.is_err());
        assert!(store.get(GuildId::new(8)).is_none());
    }

    #[tokio::test]
    async fn test_commit_saves_and_rejects_unknown_guild() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        let mut store = SettingsStore::new(&path);
        store.upsert(GuildId::new(7), sample_settings(1, 2));

        store
            .commit(GuildId::new(7), |s| s.set_autopost(GuildId::new(7), true))
            .await
            .unwrap();
        let reloaded = SettingsStore::load(&path).await.unwrap();
        assert!(reloaded.get(GuildId::new(7)).unwrap().autopost_enabled);

        let result = store
            .commit(GuildId::new(9), |s| s.set_autopost(GuildId::new(9), true))
            .await;
        assert!(matches!(result, Err(BotError::ConfigurationMissing { .. })));
    }

    #[test]
    fn test_upsert_keeps_autopost_flag() {
        let mut store = SettingsStore::new("unused.json");
        store.upsert(GuildId::new(1), sample_settings(10, 5));
        store.set_autopost(GuildId::new(1), true).unwrap();

        store.upsert(GuildId::new(1), sample_settings(11, 6));
        let settings = store.get(GuildId::new(1)).unwrap();
        assert_eq!(settings.league_id, 11);
        assert!(settings.autopost_enabled);
    }

    #[test]
    fn test_partial_update_preserves_other_fields() {
        let mut store = SettingsStore::new("unused.json");
        store.upsert(GuildId::new(1), sample_settings(10, 5));

        let updated = store
            .update(
                GuildId::new(1),
                SettingsUpdate {
                    season: Some(2025),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(updated.season, 2025);
        assert_eq!(updated.league_id, 10);
        assert_eq!(updated.channel_id, 5);
        assert_eq!(updated.swid, "{SWID-COOKIE}");
    }

    #[test]
    fn test_update_and_autopost_require_setup() {
        let mut store = SettingsStore::new("unused.json");
        assert!(matches!(
            store.update(GuildId::new(7), SettingsUpdate::default()),
            Err(BotError::ConfigurationMissing { .. })
        ));
        assert!(matches!(
            store.set_autopost(GuildId::new(7), true),
            Err(BotError::ConfigurationMissing { .. })
        ));
        assert!(matches!(
            store.require(GuildId::new(7)),
            Err(BotError::ConfigurationMissing { .. })
        ));
    }

    #[test]
    fn test_autopost_guilds_filters() {
        let mut store = SettingsStore::new("unused.json");
        store.upsert(GuildId::new(1), sample_settings(10, 5));
        store.upsert(GuildId::new(2), sample_settings(20, 0));
        store.upsert(GuildId::new(3), sample_settings(30, 7));
        store.set_autopost(GuildId::new(1), true).unwrap();
        store.set_autopost(GuildId::new(2), true).unwrap();

        let guilds = store.autopost_guilds();
        assert_eq!(guilds.len(), 1);
        assert_eq!(guilds[0].0, GuildId::new(1));
    }

    #[test]
    fn test_credentials_debug_hides_cookies() {
        let creds = sample_settings(10, 5).credentials();
        let debug = format!("{:?}", creds);
        assert!(debug.contains("league_id"));
        assert!(!debug.contains("s2-cookie"));
        assert!(!debug.contains("SWID-COOKIE"));
    }
}
