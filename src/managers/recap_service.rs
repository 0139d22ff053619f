//! The recap job handler.
//!
//! For each dequeued job: load the guild's settings, make sure the bot can
//! post in the target channel, read the league through the gate, build the
//! pages and hand them to the [`RecapSink`]. Discord specifics stay behind
//! the sink so the whole flow runs against fakes in tests.

use async_trait::async_trait;
use poise::serenity_prelude::{ChannelId, GuildId};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::gate::SharedGate;
use super::job_queue::{JobHandler, JobQueue, RecapJob, RecapKind, Requester};
use crate::error::{BotError, Result};
use crate::messages;
use crate::recap::builder::point_samples;
use crate::recap::{build_week_page, LeagueKey, Page, PrecisionCache, RecapOptions};
use crate::state::{LeagueCredentials, SharedSettingsStore};
use crate::upstream::{LeagueClient, LeagueStatus, Matchup};

/// Where finished recaps and status messages go
#[async_trait]
pub trait RecapSink: Send + Sync {
    /// `PermissionDenied` unless the bot can send embeds in `channel_id`
    async fn check_post_permissions(&self, guild_id: GuildId, channel_id: ChannelId) -> Result<()>;

    async fn post_page(&self, channel_id: ChannelId, page: &Page) -> Result<()>;

    /// Post the last page with navigation controls. Returns once the message
    /// is up; the navigator keeps running on its own.
    async fn post_navigator(&self, channel_id: ChannelId, pages: Vec<Page>) -> Result<()>;

    /// Private status update for whoever requested the job
    async fn notify(&self, requester: &Requester, message: &str);
}

pub struct RecapService {
    settings: SharedSettingsStore,
    client: Arc<dyn LeagueClient>,
    gate: SharedGate,
    precision: Arc<PrecisionCache>,
    sink: Arc<dyn RecapSink>,
}

impl RecapService {
    pub fn new(
        settings: SharedSettingsStore,
        client: Arc<dyn LeagueClient>,
        gate: SharedGate,
        precision: Arc<PrecisionCache>,
        sink: Arc<dyn RecapSink>,
    ) -> Self {
        Self {
            settings,
            client,
            gate,
            precision,
            sink,
        }
    }

    async fn league_status(&self, credentials: &LeagueCredentials) -> Result<LeagueStatus> {
        fetch_league_status(&self.gate, &self.client, credentials).await
    }

    /// Box scores for every week up to `through_week`. Weeks that fail are
    /// logged and left out.
    async fn fetch_weeks(
        &self,
        credentials: &LeagueCredentials,
        through_week: u32,
    ) -> Result<BTreeMap<u32, Vec<Matchup>>> {
        let fetches = (1..=through_week).map(|week| {
            let client = self.client.clone();
            let credentials = credentials.clone();
            let gate = self.gate.clone();
            async move {
                let result = gate
                    .execute("box_scores", move || client.box_scores(&credentials, week))
                    .await;
                (week, result)
            }
        });

        let mut weeks = BTreeMap::new();
        for (week, result) in futures::future::join_all(fetches).await {
            match result {
                Ok(matchups) => {
                    weeks.insert(week, matchups);
                }
                Err(e) => warn!(
                    "Skipping week {} of league {}: {}",
                    week, credentials.league_id, e
                ),
            }
        }

        if weeks.is_empty() {
            return Err(BotError::NoRecapData {
                detail: format!("every week through {} failed to load", through_week),
            });
        }
        Ok(weeks)
    }
}

#[async_trait]
impl JobHandler for RecapService {
    async fn process(&self, job: &RecapJob) -> Result<()> {
        let settings = self.settings.read().await.require(job.guild_id)?.clone();
        let channel_id = job
            .channel_id
            .or_else(|| settings.channel())
            .ok_or_else(|| BotError::ConfigurationMissing {
                guild_id: job.guild_id.to_string(),
            })?;

        self.sink
            .check_post_permissions(job.guild_id, channel_id)
            .await?;
        self.sink.notify(&job.requester, &messages::recap_started()).await;

        let credentials = settings.credentials();
        let status = self.league_status(&credentials).await?;
        let current_week = status.current_week;
        debug!(
            "League {} ({}) is on week {}",
            credentials.league_id, status.league_name, current_week
        );

        let weeks = self.fetch_weeks(&credentials, current_week).await?;
        let precision = self.precision.get_or_detect(
            LeagueKey {
                league_id: credentials.league_id,
                season: credentials.season,
            },
            || point_samples(&weeks),
        );
        let options = RecapOptions {
            starters_only: settings.starters_only,
        };

        let posted = match job.kind {
            RecapKind::Scheduled => {
                let page = build_week_page(current_week, &weeks, options, precision)?;
                self.sink.post_page(channel_id, &page).await?;
                1
            }
            RecapKind::Manual => {
                let pages: Vec<Page> = weeks
                    .keys()
                    .filter_map(|&week| match build_week_page(week, &weeks, options, precision) {
                        Ok(page) => Some(page),
                        Err(e) => {
                            warn!("No page for week {}: {}", week, e);
                            None
                        }
                    })
                    .collect();
                if pages.is_empty() {
                    return Err(BotError::NoRecapData {
                        detail: format!("no week through {} had matchups", current_week),
                    });
                }
                let count = pages.len();
                self.sink.post_navigator(channel_id, pages).await?;
                count
            }
        };

        info!(
            "Posted {} recap page(s) for guild {} in channel {}",
            posted, job.guild_id, channel_id
        );
        self.sink
            .notify(&job.requester, &messages::recap_posted(channel_id, posted))
            .await;
        Ok(())
    }

    async fn report_failure(&self, job: &RecapJob, error: &BotError) {
        if matches!(job.requester, Requester::Scheduler) {
            warn!(
                "Scheduled recap for guild {} failed: {}",
                job.guild_id, error
            );
        }
        self.sink
            .notify(&job.requester, &messages::user_error(error))
            .await;
    }
}

/// League metadata read through the gate
pub async fn fetch_league_status(
    gate: &SharedGate,
    client: &Arc<dyn LeagueClient>,
    credentials: &LeagueCredentials,
) -> Result<LeagueStatus> {
    let client = client.clone();
    let credentials = credentials.clone();
    gate.execute("league_status", move || client.league_status(&credentials))
        .await
}

/// Check credentials by reading the league; any failure becomes `ValidationFailure`
pub async fn validate_league(
    gate: &SharedGate,
    client: &Arc<dyn LeagueClient>,
    credentials: &LeagueCredentials,
) -> Result<LeagueStatus> {
    fetch_league_status(gate, client, credentials)
        .await
        .map_err(|e| BotError::ValidationFailure {
            message: e.to_string(),
        })
}

/// Queue a manual recap. Guilds without settings get `ConfigurationMissing`
/// and nothing is queued.
pub async fn request_recap(
    settings: &SharedSettingsStore,
    queue: &JobQueue,
    guild_id: GuildId,
    channel_id: Option<ChannelId>,
    requester: Requester,
) -> Result<usize> {
    settings.read().await.require(guild_id)?;
    queue.enqueue(RecapJob::manual(guild_id, channel_id, requester))
}
