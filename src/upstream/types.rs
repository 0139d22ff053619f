/// League metadata used for week detection and validation
#[derive(Debug, Clone, PartialEq)]
pub struct LeagueStatus {
    pub league_name: String,
    /// Week recaps are built up to
    pub current_week: u32,
    pub current_matchup_period: u32,
    pub latest_scoring_period: u32,
    pub final_week: u32,
    pub teams: Vec<TeamSummary>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TeamSummary {
    pub team_id: u32,
    pub name: String,
    pub wins: u32,
    pub losses: u32,
    pub ties: u32,
}

/// One head-to-head game of a week
#[derive(Debug, Clone, PartialEq)]
pub struct Matchup {
    pub matchup_period: u32,
    pub home: MatchupSide,
    pub away: MatchupSide,
}

impl Matchup {
    pub fn sides(&self) -> [&MatchupSide; 2] {
        [&self.home, &self.away]
    }
}

/// A side of a matchup: a real team or a bye
#[derive(Debug, Clone, PartialEq)]
pub enum MatchupSide {
    Team(TeamResult),
    Bye,
}

impl MatchupSide {
    pub fn team(&self) -> Option<&TeamResult> {
        match self {
            MatchupSide::Team(t) => Some(t),
            MatchupSide::Bye => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TeamResult {
    pub team_id: u32,
    pub name: String,
    pub wins: u32,
    pub losses: u32,
    pub ties: u32,
    pub score: f64,
    pub lineup: Vec<LineupEntry>,
}

/// A rostered player in a box score
#[derive(Debug, Clone, PartialEq)]
pub struct LineupEntry {
    pub player_id: Option<u64>,
    pub name: String,
    /// Position as reported upstream, before alias normalization
    pub position: String,
    /// Lineup slot, `BE` for bench
    pub slot: String,
    pub points: Option<f64>,
}

impl LineupEntry {
    pub fn is_bench(&self) -> bool {
        self.slot == "BE"
    }
}
