//! Upstream league data.
//!
//! [`LeagueClient`] is the boundary to the fantasy data provider. Its calls
//! are blocking and are only ever made through the concurrency gate.
//! Records come back already normalized into [`types`].

pub mod espn;
pub mod types;

pub use espn::EspnClient;
pub use types::{LeagueStatus, LineupEntry, Matchup, MatchupSide, TeamResult};

use crate::error::Result;
use crate::state::LeagueCredentials;

/// Blocking access to one fantasy league
pub trait LeagueClient: Send + Sync {
    /// League metadata, standings and the current week
    fn league_status(&self, credentials: &LeagueCredentials) -> Result<LeagueStatus>;

    /// Every matchup of one week, with lineups
    fn box_scores(&self, credentials: &LeagueCredentials, week: u32) -> Result<Vec<Matchup>>;
}
