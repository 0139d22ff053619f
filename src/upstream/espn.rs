//! Blocking client for the ESPN fantasy football v3 API.
//!
//! Private leagues are read with the `espn_s2` and `SWID` cookies. Raw
//! payloads are deserialized into the `Raw*` structs below and normalized
//! into [`super::types`] before leaving this module.

use once_cell::sync::OnceCell;
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, COOKIE};
use reqwest::StatusCode;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use tracing::debug;

use super::types::{LeagueStatus, LineupEntry, Matchup, MatchupSide, TeamResult, TeamSummary};
use super::LeagueClient;
use crate::error::{BotError, Result};
use crate::state::LeagueCredentials;

/// Base path for ESPN Fantasy Football v3 API.
pub const DEFAULT_BASE_URL: &str = "https://lm-api-reads.fantasy.espn.com/apis/v3/games/ffl";

const USER_AGENT: &str = "gridiron-recap/0.1";

pub struct EspnClient {
    base_url: String,
    request_timeout: Duration,
    /// Built lazily on the first call, which always runs on a blocking thread
    http: OnceCell<Client>,
}

impl EspnClient {
    pub fn new(base_url: impl Into<String>, request_timeout: Duration) -> Self {
        Self {
            base_url: base_url.into(),
            request_timeout,
            http: OnceCell::new(),
        }
    }

    fn http(&self) -> Result<&Client> {
        self.http.get_or_try_init(|| {
            Client::builder()
                .user_agent(USER_AGENT)
                .timeout(self.request_timeout)
                .build()
                .map_err(BotError::from)
        })
    }

    fn league_url(&self, credentials: &LeagueCredentials) -> String {
        format!(
            "{}/seasons/{}/segments/0/leagues/{}",
            self.base_url, credentials.season, credentials.league_id
        )
    }

    fn get_league(
        &self,
        credentials: &LeagueCredentials,
        params: &[(&str, String)],
        extra_headers: HeaderMap,
    ) -> Result<RawLeague> {
        let url = self.league_url(credentials);
        debug!("GET {} {:?}", url, params);

        let mut headers = extra_headers;
        let cookie = format!("espn_s2={}; SWID={}", credentials.espn_s2, credentials.swid);
        headers.insert(
            COOKIE,
            HeaderValue::from_str(&cookie).map_err(|_| BotError::ValidationFailure {
                message: "credentials contain characters that cannot be sent as a cookie"
                    .to_string(),
            })?,
        );

        let response = self.http()?.get(&url).headers(headers).query(params).send()?;

        match response.status() {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                return Err(BotError::UpstreamFailure {
                    message: format!(
                        "ESPN rejected the credentials for league {} ({})",
                        credentials.league_id,
                        response.status()
                    ),
                })
            }
            StatusCode::NOT_FOUND => {
                return Err(BotError::UpstreamFailure {
                    message: format!(
                        "league {} has no {} season on ESPN",
                        credentials.league_id, credentials.season
                    ),
                })
            }
            _ => {}
        }

        Ok(response.error_for_status()?.json::<RawLeague>()?)
    }
}

impl LeagueClient for EspnClient {
    fn league_status(&self, credentials: &LeagueCredentials) -> Result<LeagueStatus> {
        let raw = self.get_league(
            credentials,
            &[
                ("view", "mTeam".to_string()),
                ("view", "mSettings".to_string()),
                ("view", "mStatus".to_string()),
            ],
            HeaderMap::new(),
        )?;
        Ok(normalize_status(&raw))
    }

    fn box_scores(&self, credentials: &LeagueCredentials, week: u32) -> Result<Vec<Matchup>> {
        let filter = serde_json::json!({
            "schedule": { "filterMatchupPeriodIds": { "value": [week] } }
        });
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-fantasy-filter",
            HeaderValue::from_str(&filter.to_string()).map_err(|e| BotError::Internal {
                message: e.to_string(),
            })?,
        );

        let raw = self.get_league(
            credentials,
            &[
                ("view", "mMatchupScore".to_string()),
                ("view", "mScoreboard".to_string()),
                ("view", "mTeam".to_string()),
                ("scoringPeriodId", week.to_string()),
            ],
            headers,
        )?;
        Ok(normalize_box_scores(&raw, week))
    }
}

// Raw payloads

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawLeague {
    #[serde(default)]
    scoring_period_id: u32,
    #[serde(default)]
    status: RawStatus,
    #[serde(default)]
    settings: RawSettings,
    #[serde(default)]
    teams: Vec<RawTeam>,
    #[serde(default)]
    schedule: Vec<RawScheduleItem>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawStatus {
    #[serde(default)]
    current_matchup_period: u32,
    #[serde(default)]
    latest_scoring_period: u32,
    #[serde(default)]
    final_scoring_period: u32,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSettings {
    #[serde(default)]
    name: String,
    #[serde(default)]
    schedule_settings: RawScheduleSettings,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawScheduleSettings {
    #[serde(default)]
    matchup_period_count: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawTeam {
    id: u32,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    location: Option<String>,
    #[serde(default)]
    nickname: Option<String>,
    #[serde(default)]
    record: RawRecord,
}

impl RawTeam {
    fn display_name(&self) -> String {
        if let Some(name) = self.name.as_deref().filter(|n| !n.trim().is_empty()) {
            return name.trim().to_string();
        }
        let joined = [self.location.as_deref(), self.nickname.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        if joined.is_empty() {
            format!("Team {}", self.id)
        } else {
            joined
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct RawRecord {
    #[serde(default)]
    overall: RawOverall,
}

#[derive(Debug, Default, Deserialize)]
struct RawOverall {
    #[serde(default)]
    wins: u32,
    #[serde(default)]
    losses: u32,
    #[serde(default)]
    ties: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawScheduleItem {
    #[serde(default)]
    matchup_period_id: u32,
    #[serde(default)]
    home: Option<RawMatchupTeam>,
    #[serde(default)]
    away: Option<RawMatchupTeam>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawMatchupTeam {
    team_id: u32,
    #[serde(default)]
    total_points: f64,
    #[serde(default)]
    roster_for_current_scoring_period: Option<RawRoster>,
}

#[derive(Debug, Default, Deserialize)]
struct RawRoster {
    #[serde(default)]
    entries: Vec<RawRosterEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawRosterEntry {
    #[serde(default)]
    lineup_slot_id: u32,
    #[serde(default)]
    player_id: Option<i64>,
    #[serde(default)]
    player_pool_entry: Option<RawPlayerPoolEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawPlayerPoolEntry {
    #[serde(default)]
    applied_stat_total: Option<f64>,
    #[serde(default)]
    player: Option<RawPlayer>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawPlayer {
    /// Negative for team defenses
    #[serde(default)]
    id: Option<i64>,
    #[serde(default)]
    full_name: String,
    #[serde(default)]
    default_position_id: u32,
}

/// ESPN `defaultPositionId` to position name
fn position_name(id: u32) -> &'static str {
    match id {
        1 => "QB",
        2 => "RB",
        3 => "WR",
        4 => "TE",
        5 => "K",
        16 => "D/ST",
        7 => "P",
        9 => "DT",
        10 => "DE",
        11 => "LB",
        14 => "CB",
        15 => "S",
        _ => "OTHER",
    }
}

/// ESPN `lineupSlotId` to slot name
fn slot_name(id: u32) -> &'static str {
    match id {
        0 => "QB",
        2 => "RB",
        3 => "RB/WR",
        4 => "WR",
        5 => "WR/TE",
        6 => "TE",
        7 => "OP",
        16 => "D/ST",
        17 => "K",
        20 => "BE",
        21 => "IR",
        23 => "RB/WR/TE",
        _ => "OTHER",
    }
}

fn normalize_status(raw: &RawLeague) -> LeagueStatus {
    let final_week = match raw.settings.schedule_settings.matchup_period_count {
        0 => raw.status.final_scoring_period,
        n => n,
    };

    // Preseason reports period 0; past the regular season we stay on the last week
    let mut current_week = raw.scoring_period_id.max(raw.status.current_matchup_period).max(1);
    if final_week > 0 {
        current_week = current_week.min(final_week);
    }

    LeagueStatus {
        league_name: if raw.settings.name.is_empty() {
            "Fantasy League".to_string()
        } else {
            raw.settings.name.clone()
        },
        current_week,
        current_matchup_period: raw.status.current_matchup_period,
        latest_scoring_period: raw.status.latest_scoring_period,
        final_week,
        teams: raw
            .teams
            .iter()
            .map(|t| TeamSummary {
                team_id: t.id,
                name: t.display_name(),
                wins: t.record.overall.wins,
                losses: t.record.overall.losses,
                ties: t.record.overall.ties,
            })
            .collect(),
    }
}

fn normalize_box_scores(raw: &RawLeague, week: u32) -> Vec<Matchup> {
    let teams: HashMap<u32, &RawTeam> = raw.teams.iter().map(|t| (t.id, t)).collect();

    raw.schedule
        .iter()
        .filter(|item| item.matchup_period_id == week)
        .map(|item| Matchup {
            matchup_period: item.matchup_period_id,
            home: normalize_side(item.home.as_ref(), &teams),
            away: normalize_side(item.away.as_ref(), &teams),
        })
        .collect()
}

fn normalize_side(side: Option<&RawMatchupTeam>, teams: &HashMap<u32, &RawTeam>) -> MatchupSide {
    let Some(side) = side else {
        return MatchupSide::Bye;
    };
    // A team id missing from the league is treated like a bye
    let Some(team) = teams.get(&side.team_id) else {
        return MatchupSide::Bye;
    };

    let lineup = side
        .roster_for_current_scoring_period
        .as_ref()
        .map(|roster| roster.entries.iter().filter_map(normalize_entry).collect())
        .unwrap_or_default();

    MatchupSide::Team(TeamResult {
        team_id: team.id,
        name: team.display_name(),
        wins: team.record.overall.wins,
        losses: team.record.overall.losses,
        ties: team.record.overall.ties,
        score: side.total_points,
        lineup,
    })
}

fn normalize_entry(entry: &RawRosterEntry) -> Option<LineupEntry> {
    let pool = entry.player_pool_entry.as_ref()?;
    let player = pool.player.as_ref()?;

    Some(LineupEntry {
        player_id: player
            .id
            .or(entry.player_id)
            .filter(|id| *id > 0)
            .map(|id| id as u64),
        name: player.full_name.clone(),
        position: position_name(player.default_position_id).to_string(),
        slot: slot_name(entry.lineup_slot_id).to_string(),
        points: pool.applied_stat_total,
    })
}
