//! Turns one or more weeks of box scores into recap pages.
//!
//! A page is built from four independent sections, always in this order:
//! weekly top performer per position, head-to-head results, season top 5
//! per position and power rankings.

use once_cell::sync::Lazy;
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

use super::card::{Card, Page};
use super::precision::format_points;
use crate::error::{BotError, Result};
use crate::upstream::{Matchup, MatchupSide, TeamResult};

const PLAYER_IMG: &str =
    "https://a.espncdn.com/combiner/i?img=/i/headshots/nfl/players/full/{id}.png&w=200&h=200";
const TEAM_IMG: &str = "https://a.espncdn.com/i/teamlogos/nfl/500/{code}.png";

const COLOR_TOP_PERFORMER: u32 = 0x1abc9c;
const COLOR_HEAD_TO_HEAD: u32 = 0xf39c12;
const COLOR_SEASON: u32 = 0xe67e22;
const COLOR_RANKINGS: u32 = 0x9b59b6;

/// Discord rejects embeds with more fields than this
const MAX_CARD_FIELDS: usize = 25;
const SEASON_LEADERS: usize = 5;
const MAX_PRECISION_SAMPLES: usize = 200;

/// NFL team nickname to ESPN logo code, for defense thumbnails
static TEAM_LOGO: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("49ers", "sf"), ("Bears", "chi"), ("Bengals", "cin"), ("Bills", "buf"),
        ("Broncos", "den"), ("Browns", "cle"), ("Buccaneers", "tb"), ("Cardinals", "ari"),
        ("Chargers", "lac"), ("Chiefs", "kc"), ("Colts", "ind"), ("Commanders", "wsh"),
        ("Cowboys", "dal"), ("Dolphins", "mia"), ("Eagles", "phi"), ("Falcons", "atl"),
        ("Giants", "nyg"), ("Jaguars", "jax"), ("Jets", "nyj"), ("Lions", "det"),
        ("Packers", "gb"), ("Panthers", "car"), ("Patriots", "ne"), ("Raiders", "lv"),
        ("Rams", "lar"), ("Ravens", "bal"), ("Saints", "no"), ("Seahawks", "sea"),
        ("Steelers", "pit"), ("Texans", "hou"), ("Titans", "ten"), ("Vikings", "min"),
    ])
});

/// Position categories shown in recaps
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Position {
    Qb,
    Rb,
    Wr,
    Te,
    K,
    Dst,
}

impl Position {
    pub const ALL: [Position; 6] = [
        Position::Qb,
        Position::Rb,
        Position::Wr,
        Position::Te,
        Position::K,
        Position::Dst,
    ];

    /// Normalize an upstream position name, folding defense aliases together
    pub fn from_alias(raw: &str) -> Option<Self> {
        match raw.trim() {
            "QB" => Some(Position::Qb),
            "RB" => Some(Position::Rb),
            "WR" => Some(Position::Wr),
            "TE" => Some(Position::Te),
            "K" => Some(Position::K),
            "D/ST" | "DST" | "DEF" | "Def" => Some(Position::Dst),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Position::Qb => "QB",
            Position::Rb => "RB",
            Position::Wr => "WR",
            Position::Te => "TE",
            Position::K => "K",
            Position::Dst => "D/ST",
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RecapOptions {
    /// Ignore bench slots in player scans
    pub starters_only: bool,
}

/// Best scorer at one position for a week
#[derive(Debug, Clone, PartialEq)]
pub struct TopPerformer {
    pub position: Position,
    pub name: String,
    pub player_id: Option<u64>,
    pub points: f64,
    pub fantasy_team: String,
}

impl TopPerformer {
    fn image_url(&self) -> Option<String> {
        if self.position == Position::Dst {
            let nickname = self.name.replace(" D/ST", "");
            TEAM_LOGO
                .get(nickname.trim())
                .map(|code| TEAM_IMG.replace("{code}", code))
        } else {
            self.player_id
                .map(|id| PLAYER_IMG.replace("{id}", &id.to_string()))
        }
    }
}

/// Every scored lineup entry with its normalized position
fn scored_entries<'a>(
    matchups: &'a [Matchup],
    options: RecapOptions,
) -> impl Iterator<Item = (Position, &'a crate::upstream::LineupEntry, &'a TeamResult)> + 'a {
    matchups
        .iter()
        .flat_map(|m| m.sides())
        .filter_map(MatchupSide::team)
        .flat_map(|team| team.lineup.iter().map(move |entry| (entry, team)))
        .filter(move |(entry, _)| !(options.starters_only && entry.is_bench()))
        .filter_map(|(entry, team)| {
            let position = Position::from_alias(&entry.position)?;
            entry.points?;
            Some((position, entry, team))
        })
}

/// Highest scorer per position. Ties keep the first entry seen.
pub fn weekly_top_performers(matchups: &[Matchup], options: RecapOptions) -> Vec<TopPerformer> {
    let mut best: [Option<TopPerformer>; 6] = Default::default();

    for (position, entry, team) in scored_entries(matchups, options) {
        let points = entry.points.unwrap_or_default();
        let slot = &mut best[position.index()];
        let better = match slot {
            Some(current) => points > current.points,
            None => true,
        };
        if better {
            *slot = Some(TopPerformer {
                position,
                name: entry.name.clone(),
                player_id: entry.player_id,
                points,
                fantasy_team: team.name.clone(),
            });
        }
    }

    best.into_iter().flatten().collect()
}

/// Season point totals per position through `through_week`, best first
pub fn season_leaders(
    weeks: &BTreeMap<u32, Vec<Matchup>>,
    through_week: u32,
    options: RecapOptions,
) -> Vec<(Position, Vec<(String, f64)>)> {
    // (position, player key) -> index into totals, to keep first-seen order
    let mut index: HashMap<(Position, String), usize> = HashMap::new();
    let mut totals: Vec<(Position, String, f64)> = Vec::new();

    for (_, matchups) in weeks.range(..=through_week) {
        for (position, entry, _) in scored_entries(matchups, options) {
            let key = entry
                .player_id
                .map(|id| id.to_string())
                .unwrap_or_else(|| entry.name.clone());
            let points = entry.points.unwrap_or_default();
            match index.get(&(position, key.clone())) {
                Some(&i) => totals[i].2 += points,
                None => {
                    index.insert((position, key), totals.len());
                    totals.push((position, entry.name.clone(), points));
                }
            }
        }
    }

    Position::ALL
        .iter()
        .map(|&position| {
            let mut players: Vec<(String, f64)> = totals
                .iter()
                .filter(|(p, _, _)| *p == position)
                .map(|(_, name, pts)| (name.clone(), *pts))
                .collect();
            players.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
            players.truncate(SEASON_LEADERS);
            (position, players)
        })
        .collect()
}

/// How a matchup ended
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MatchupOutcome<'a> {
    Decided {
        home: &'a TeamResult,
        away: &'a TeamResult,
        winner: &'a TeamResult,
    },
    /// Exactly equal scores: no winner
    Tie {
        home: &'a TeamResult,
        away: &'a TeamResult,
    },
    Bye {
        team: &'a TeamResult,
        is_home: bool,
    },
}

/// `None` when neither side is a real team
pub fn resolve_matchup(matchup: &Matchup) -> Option<MatchupOutcome<'_>> {
    match (&matchup.home, &matchup.away) {
        (MatchupSide::Team(home), MatchupSide::Team(away)) => {
            Some(match home.score.partial_cmp(&away.score) {
                Some(Ordering::Greater) => MatchupOutcome::Decided {
                    home,
                    away,
                    winner: home,
                },
                Some(Ordering::Less) => MatchupOutcome::Decided {
                    home,
                    away,
                    winner: away,
                },
                _ => MatchupOutcome::Tie { home, away },
            })
        }
        (MatchupSide::Team(team), MatchupSide::Bye) => Some(MatchupOutcome::Bye {
            team,
            is_home: true,
        }),
        (MatchupSide::Bye, MatchupSide::Team(team)) => Some(MatchupOutcome::Bye {
            team,
            is_home: false,
        }),
        (MatchupSide::Bye, MatchupSide::Bye) => None,
    }
}

/// `W-L`, or `W-L-T` once a team has tied
fn format_record(wins: u32, losses: u32, ties: u32) -> String {
    if ties > 0 {
        format!("{}-{}-{}", wins, losses, ties)
    } else {
        format!("{}-{}", wins, losses)
    }
}

fn team_with_record(team: &TeamResult) -> String {
    format!(
        "{} ({})",
        team.name,
        format_record(team.wins, team.losses, team.ties)
    )
}

fn head_to_head_text(outcome: &MatchupOutcome<'_>, precision: u8) -> String {
    let pts = |v: f64| format_points(v, precision);
    match outcome {
        MatchupOutcome::Decided { home, away, winner } => format!(
            "{} vs. {}\nScore: {} - {}\n🏆 Winner: **{}** (**{}**)",
            team_with_record(home),
            team_with_record(away),
            pts(home.score),
            pts(away.score),
            winner.name,
            pts(winner.score)
        ),
        MatchupOutcome::Tie { home, away } => format!(
            "{} vs. {}\nScore: {} - {}\n🤝 Tie at **{}**",
            team_with_record(home),
            team_with_record(away),
            pts(home.score),
            pts(away.score),
            pts(home.score)
        ),
        MatchupOutcome::Bye { team, is_home: true } => format!(
            "{} vs. BYE\nScore: {} - {}\n🛌 **{}** is on a bye week!",
            team_with_record(team),
            pts(team.score),
            pts(0.0),
            team.name
        ),
        MatchupOutcome::Bye { team, is_home: false } => format!(
            "BYE vs. {}\nScore: {} - {}\n🛌 **{}** is on a bye week!",
            team_with_record(team),
            pts(0.0),
            pts(team.score),
            team.name
        ),
    }
}

pub fn head_to_head_card(week: u32, matchups: &[Matchup], precision: u8) -> Card {
    matchups
        .iter()
        .filter_map(resolve_matchup)
        .take(MAX_CARD_FIELDS)
        .fold(
            Card::new(format!("Week {} Head-to-Head Matchups", week), COLOR_HEAD_TO_HEAD)
                .description("🏈 Weekly fantasy results"),
            |card, outcome| card.field("Matchup", head_to_head_text(&outcome, precision), false),
        )
}

pub fn weekly_top_cards(week: u32, performers: &[TopPerformer], precision: u8) -> Vec<Card> {
    performers
        .iter()
        .map(|top| {
            let pos = top.position.label();
            Card::new(format!("Week {} Top {}", week, pos), COLOR_TOP_PERFORMER)
                .description(format!(
                    "**{}** ({})\nFantasy Points: **{}**\nFantasy Team: *{}*",
                    top.name,
                    pos,
                    format_points(top.points, precision),
                    top.fantasy_team
                ))
                .thumbnail(top.image_url())
        })
        .collect()
}

pub fn season_leaders_card(
    through_week: u32,
    leaders: &[(Position, Vec<(String, f64)>)],
    precision: u8,
) -> Card {
    let sections: Vec<String> = leaders
        .iter()
        .map(|(position, players)| {
            let body = if players.is_empty() {
                "_No data_".to_string()
            } else {
                players
                    .iter()
                    .map(|(name, pts)| format!("• **{}** — {}", name, format_points(*pts, precision)))
                    .collect::<Vec<_>>()
                    .join("\n")
            };
            format!("**{}**\n{}", position.label(), body)
        })
        .collect();

    Card::new(
        format!("Season Top 5 (through Week {})", through_week),
        COLOR_SEASON,
    )
    .description(sections.join("\n\n"))
}

/// Team record accumulated from head-to-head results
#[derive(Debug, Clone, PartialEq)]
pub struct Standing {
    pub team_id: u32,
    pub name: String,
    pub wins: u32,
    pub losses: u32,
    pub ties: u32,
    pub points_for: f64,
    pub points_against: f64,
    pub games: u32,
}

impl Standing {
    fn new(team: &TeamResult) -> Self {
        Self {
            team_id: team.team_id,
            name: team.name.clone(),
            wins: 0,
            losses: 0,
            ties: 0,
            points_for: 0.0,
            points_against: 0.0,
            games: 0,
        }
    }

    pub fn record(&self) -> String {
        format_record(self.wins, self.losses, self.ties)
    }

    pub fn average_points(&self) -> f64 {
        if self.games == 0 {
            0.0
        } else {
            self.points_for / self.games as f64
        }
    }
}

/// Standings through `through_week`: wins desc, then points for desc
pub fn standings_through(weeks: &BTreeMap<u32, Vec<Matchup>>, through_week: u32) -> Vec<Standing> {
    let mut table: Vec<Standing> = Vec::new();
    let mut index: HashMap<u32, usize> = HashMap::new();

    let mut slot = |team: &TeamResult, table: &mut Vec<Standing>| -> usize {
        *index.entry(team.team_id).or_insert_with(|| {
            table.push(Standing::new(team));
            table.len() - 1
        })
    };

    for (_, matchups) in weeks.range(..=through_week) {
        for matchup in matchups {
            let Some(outcome) = resolve_matchup(matchup) else {
                continue;
            };
            match outcome {
                MatchupOutcome::Decided { home, away, winner } => {
                    let (h, a) = (slot(home, &mut table), slot(away, &mut table));
                    let home_won = std::ptr::eq(winner, home);
                    for (i, own, other, won) in [(h, home, away, home_won), (a, away, home, !home_won)] {
                        let s = &mut table[i];
                        s.games += 1;
                        s.points_for += own.score;
                        s.points_against += other.score;
                        if won {
                            s.wins += 1;
                        } else {
                            s.losses += 1;
                        }
                    }
                }
                MatchupOutcome::Tie { home, away } => {
                    let (h, a) = (slot(home, &mut table), slot(away, &mut table));
                    for (i, own, other) in [(h, home, away), (a, away, home)] {
                        let s = &mut table[i];
                        s.games += 1;
                        s.ties += 1;
                        s.points_for += own.score;
                        s.points_against += other.score;
                    }
                }
                MatchupOutcome::Bye { team, .. } => {
                    slot(team, &mut table);
                }
            }
        }
    }

    table.sort_by(|a, b| {
        b.wins.cmp(&a.wins).then(
            b.points_for
                .partial_cmp(&a.points_for)
                .unwrap_or(Ordering::Equal),
        )
    });
    table
}

pub fn power_rankings_card(through_week: u32, standings: &[Standing], precision: u8) -> Card {
    let lines: Vec<String> = standings
        .iter()
        .enumerate()
        .map(|(rank, s)| {
            format!(
                "**{}.** {} ({}) | PF: {} | PA: {} | Avg: {}",
                rank + 1,
                s.name,
                s.record(),
                format_points(s.points_for, precision),
                format_points(s.points_against, precision),
                format_points(s.average_points(), precision.max(1))
            )
        })
        .collect();

    Card::new(
        format!("Power Rankings (through Week {})", through_week),
        COLOR_RANKINGS,
    )
    .description(if lines.is_empty() {
        "_No data_".to_string()
    } else {
        lines.join("\n")
    })
}

/// First week in `1..=through_week` with no box scores
pub fn first_missing_week(weeks: &BTreeMap<u32, Vec<Matchup>>, through_week: u32) -> Option<u32> {
    (1..=through_week).find(|week| !weeks.contains_key(week))
}

/// Rankings stand in for a table that would silently drop a week's results
pub fn incomplete_rankings_card(through_week: u32, missing_week: u32) -> Card {
    Card::new(
        format!("Power Rankings (through Week {})", through_week),
        COLOR_RANKINGS,
    )
    .description(format!(
        "_Standings incomplete: week {} unavailable_",
        missing_week
    ))
}

/// Observed point values used to detect a league's precision
pub fn point_samples(weeks: &BTreeMap<u32, Vec<Matchup>>) -> Vec<f64> {
    weeks
        .values()
        .flatten()
        .flat_map(|m| m.sides())
        .filter_map(MatchupSide::team)
        .flat_map(|team| {
            std::iter::once(team.score).chain(team.lineup.iter().filter_map(|e| e.points))
        })
        .take(MAX_PRECISION_SAMPLES)
        .collect()
}

/// Build the page for `week` from every fetched week up to it
pub fn build_week_page(
    week: u32,
    weeks: &BTreeMap<u32, Vec<Matchup>>,
    options: RecapOptions,
    precision: u8,
) -> Result<Page> {
    let matchups = weeks.get(&week).ok_or_else(|| BotError::NoRecapData {
        detail: format!("no box scores for week {}", week),
    })?;
    if matchups.is_empty() {
        return Err(BotError::NoRecapData {
            detail: format!("week {} has no matchups", week),
        });
    }

    let mut cards = weekly_top_cards(week, &weekly_top_performers(matchups, options), precision);
    cards.push(head_to_head_card(week, matchups, precision));
    cards.push(season_leaders_card(
        week,
        &season_leaders(weeks, week, options),
        precision,
    ));
    cards.push(match first_missing_week(weeks, week) {
        Some(missing) => incomplete_rankings_card(week, missing),
        None => power_rankings_card(week, &standings_through(weeks, week), precision),
    });

    Ok(Page { week, cards })
}

#[cfg(test)]
pub(crate) mod fixtures {
    use crate::upstream::{LineupEntry, Matchup, MatchupSide, TeamResult};

    pub fn entry(name: &str, position: &str, points: f64) -> LineupEntry {
        LineupEntry {
            player_id: None,
            name: name.to_string(),
            position: position.to_string(),
            slot: position.to_string(),
            points: Some(points),
        }
    }

    pub fn bench(name: &str, position: &str, points: f64) -> LineupEntry {
        LineupEntry {
            slot: "BE".to_string(),
            ..entry(name, position, points)
        }
    }

    pub fn team(id: u32, name: &str, score: f64, lineup: Vec<LineupEntry>) -> MatchupSide {
        MatchupSide::Team(TeamResult {
            team_id: id,
            name: name.to_string(),
            wins: 0,
            losses: 0,
            ties: 0,
            score,
            lineup,
        })
    }

    /// A team side carrying its upstream season record
    pub fn team_with(id: u32, name: &str, score: f64, record: (u32, u32, u32)) -> MatchupSide {
        match team(id, name, score, vec![]) {
            MatchupSide::Team(t) => MatchupSide::Team(TeamResult {
                wins: record.0,
                losses: record.1,
                ties: record.2,
                ..t
            }),
            MatchupSide::Bye => MatchupSide::Bye,
        }
    }

    pub fn matchup(week: u32, home: MatchupSide, away: MatchupSide) -> Matchup {
        Matchup {
            matchup_period: week,
            home,
            away,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;

    #[test]
    fn test_position_aliases() {
        assert_eq!(Position::from_alias("DST"), Some(Position::Dst));
        assert_eq!(Position::from_alias("DEF"), Some(Position::Dst));
        assert_eq!(Position::from_alias("Def"), Some(Position::Dst));
        assert_eq!(Position::from_alias("D/ST"), Some(Position::Dst));
        assert_eq!(Position::from_alias("QB"), Some(Position::Qb));
        assert_eq!(Position::from_alias("P"), None);
    }

    #[test]
    fn test_weekly_top_picks_highest() {
        let matchups = vec![matchup(
            1,
            team(1, "A", 100.0, vec![entry("Low", "RB", 10.0)]),
            team(2, "B", 90.0, vec![entry("High", "RB", 10.5)]),
        )];

        let tops = weekly_top_performers(&matchups, RecapOptions::default());
        assert_eq!(tops.len(), 1);
        assert_eq!(tops[0].name, "High");
        assert_eq!(tops[0].fantasy_team, "B");
    }

    #[test]
    fn test_weekly_top_tie_keeps_first_seen() {
        let matchups = vec![matchup(
            1,
            team(1, "A", 100.0, vec![entry("First", "WR", 10.5)]),
            team(2, "B", 90.0, vec![entry("Second", "WR", 10.5)]),
        )];

        let tops = weekly_top_performers(&matchups, RecapOptions::default());
        assert_eq!(tops[0].name, "First");
    }

    #[test]
    fn test_weekly_top_starters_only_skips_bench() {
        let matchups = vec![matchup(
            1,
            team(
                1,
                "A",
                100.0,
                vec![bench("Benched", "QB", 40.0), entry("Starter", "QB", 20.0)],
            ),
            MatchupSide::Bye,
        )];

        let all = weekly_top_performers(&matchups, RecapOptions::default());
        assert_eq!(all[0].name, "Benched");

        let starters = weekly_top_performers(&matchups, RecapOptions { starters_only: true });
        assert_eq!(starters[0].name, "Starter");
    }

    #[test]
    fn test_weekly_top_normalizes_defense_and_orders_positions() {
        let matchups = vec![matchup(
            1,
            team(
                1,
                "A",
                100.0,
                vec![entry("Bears D/ST", "DST", 12.0), entry("Kicker", "K", 9.0), entry("Arm", "QB", 30.0)],
            ),
            MatchupSide::Bye,
        )];

        let tops = weekly_top_performers(&matchups, RecapOptions::default());
        let positions: Vec<Position> = tops.iter().map(|t| t.position).collect();
        assert_eq!(positions, vec![Position::Qb, Position::K, Position::Dst]);
        assert_eq!(
            tops[2].image_url().as_deref(),
            Some("https://a.espncdn.com/i/teamlogos/nfl/500/chi.png")
        );
    }

    #[test]
    fn test_resolve_matchup_variants() {
        let decided = matchup(1, team(1, "A", 90.0, vec![]), team(2, "B", 95.5, vec![]));
        match resolve_matchup(&decided) {
            Some(MatchupOutcome::Decided { winner, .. }) => assert_eq!(winner.name, "B"),
            other => panic!("unexpected outcome {:?}", other),
        }

        let tie = matchup(1, team(1, "A", 90.0, vec![]), team(2, "B", 90.0, vec![]));
        assert!(matches!(resolve_matchup(&tie), Some(MatchupOutcome::Tie { .. })));

        let bye = matchup(1, MatchupSide::Bye, team(2, "B", 70.0, vec![]));
        assert!(matches!(
            resolve_matchup(&bye),
            Some(MatchupOutcome::Bye { is_home: false, .. })
        ));

        let empty = matchup(1, MatchupSide::Bye, MatchupSide::Bye);
        assert!(resolve_matchup(&empty).is_none());
    }

    #[test]
    fn test_head_to_head_card_renders_each_kind() {
        let matchups = vec![
            matchup(3, team(1, "A", 101.0, vec![]), team(2, "B", 99.0, vec![])),
            matchup(3, team(3, "C", 80.0, vec![]), team(4, "D", 80.0, vec![])),
            matchup(3, team(5, "E", 70.0, vec![]), MatchupSide::Bye),
            matchup(3, MatchupSide::Bye, MatchupSide::Bye),
        ];

        let card = head_to_head_card(3, &matchups, 0);
        assert_eq!(card.title, "Week 3 Head-to-Head Matchups");
        assert_eq!(card.fields.len(), 3);
        assert!(card.fields[0].value.contains("🏆 Winner: **A** (**101**)"));
        assert!(card.fields[1].value.contains("Tie at **80**"));
        assert!(card.fields[2].value.contains("E (0-0) vs. BYE"));
    }

    #[test]
    fn test_season_leaders_sum_and_rank() {
        let mut weeks = BTreeMap::new();
        weeks.insert(
            1,
            vec![matchup(
                1,
                team(1, "A", 0.0, vec![entry("Alpha", "QB", 20.0), entry("Beta", "QB", 25.0)]),
                MatchupSide::Bye,
            )],
        );
        weeks.insert(
            2,
            vec![matchup(
                2,
                team(1, "A", 0.0, vec![entry("Alpha", "QB", 10.0), entry("Beta", "QB", 1.0)]),
                MatchupSide::Bye,
            )],
        );
        weeks.insert(
            3,
            vec![matchup(3, team(1, "A", 0.0, vec![entry("Beta", "QB", 50.0)]), MatchupSide::Bye)],
        );

        let leaders = season_leaders(&weeks, 2, RecapOptions::default());
        let (position, qbs) = &leaders[0];
        assert_eq!(*position, Position::Qb);
        assert_eq!(qbs[0], ("Alpha".to_string(), 30.0));
        assert_eq!(qbs[1], ("Beta".to_string(), 26.0));
        // No tight ends at all
        assert!(leaders[3].1.is_empty());

        let card = season_leaders_card(2, &leaders, 0);
        assert!(card.description.as_deref().unwrap().contains("**TE**\n_No data_"));
    }

    #[test]
    fn test_season_leaders_keep_top_five() {
        let lineup = (0..8).map(|i| entry(&format!("WR{}", i), "WR", i as f64)).collect();
        let mut weeks = BTreeMap::new();
        weeks.insert(1, vec![matchup(1, team(1, "A", 0.0, lineup), MatchupSide::Bye)]);

        let leaders = season_leaders(&weeks, 1, RecapOptions::default());
        let wrs = &leaders[2].1;
        assert_eq!(wrs.len(), 5);
        assert_eq!(wrs[0].0, "WR7");
        assert_eq!(wrs[4].0, "WR3");
    }

    #[test]
    fn test_standings_order_by_wins_then_points() {
        let mut weeks = BTreeMap::new();
        weeks.insert(
            1,
            vec![
                matchup(1, team(1, "A", 100.0, vec![]), team(2, "B", 90.0, vec![])),
                matchup(1, team(3, "C", 120.0, vec![]), team(4, "D", 60.0, vec![])),
            ],
        );
        weeks.insert(
            2,
            vec![
                matchup(2, team(1, "A", 80.0, vec![]), team(3, "C", 80.0, vec![])),
                matchup(2, team(2, "B", 105.0, vec![]), team(4, "D", 70.0, vec![])),
            ],
        );

        let standings = standings_through(&weeks, 2);
        let names: Vec<&str> = standings.iter().map(|s| s.name.as_str()).collect();
        // One win each for C (200 PF), B (195 PF) and A (180 PF); D is winless
        assert_eq!(names, vec!["C", "B", "A", "D"]);
        assert_eq!(standings[0].record(), "1-0-1");
        assert_eq!(standings[1].record(), "1-1");
        assert_eq!(standings[3].record(), "0-2");
        assert_eq!(standings[0].points_against, 140.0);

        let through_one = standings_through(&weeks, 1);
        assert_eq!(through_one[0].name, "C");
        assert_eq!(through_one[0].games, 1);
    }

    #[test]
    fn test_build_week_page_card_order() {
        let mut weeks = BTreeMap::new();
        weeks.insert(
            1,
            vec![matchup(
                1,
                team(1, "A", 100.0, vec![entry("Arm", "QB", 30.0)]),
                team(2, "B", 90.0, vec![entry("Legs", "RB", 20.0)]),
            )],
        );

        let page = build_week_page(1, &weeks, RecapOptions::default(), 1).unwrap();
        let titles: Vec<&str> = page.cards.iter().map(|c| c.title.as_str()).collect();
        assert_eq!(
            titles,
            vec![
                "Week 1 Top QB",
                "Week 1 Top RB",
                "Week 1 Head-to-Head Matchups",
                "Season Top 5 (through Week 1)",
                "Power Rankings (through Week 1)",
            ]
        );
        assert!(page.cards[0].description.as_deref().unwrap().contains("**30.0**"));
    }

    #[test]
    fn test_build_week_page_missing_week() {
        let weeks = BTreeMap::new();
        assert!(matches!(
            build_week_page(4, &weeks, RecapOptions::default(), 2),
            Err(BotError::NoRecapData { .. })
        ));
    }

    #[test]
    fn test_rankings_flag_a_missing_week_instead_of_dropping_it() {
        let mut weeks = BTreeMap::new();
        weeks.insert(
            1,
            vec![matchup(1, team_with(1, "A", 100.0, (1, 0, 0)), team_with(2, "B", 90.0, (0, 1, 0)))],
        );
        weeks.insert(
            3,
            vec![matchup(3, team_with(1, "A", 80.0, (2, 1, 0)), team_with(2, "B", 95.0, (1, 2, 0)))],
        );

        assert_eq!(first_missing_week(&weeks, 3), Some(2));
        let page = build_week_page(3, &weeks, RecapOptions::default(), 1).unwrap();

        let head_to_head = &page.cards[page.cards.len() - 3];
        assert!(head_to_head.fields[0].value.starts_with("A (2-1) vs. B (1-2)"));

        let rankings = page.cards.last().unwrap();
        assert_eq!(rankings.title, "Power Rankings (through Week 3)");
        assert_eq!(
            rankings.description.as_deref(),
            Some("_Standings incomplete: week 2 unavailable_")
        );

        // Week 1 alone is complete and still ranked
        let first = build_week_page(1, &weeks, RecapOptions::default(), 1).unwrap();
        let ranked = first.cards.last().unwrap().description.as_deref().unwrap();
        assert!(ranked.starts_with("**1.** A (1-0)"));
    }

    #[test]
    fn test_head_to_head_shows_ties_in_records() {
        let matchups = vec![matchup(
            5,
            team_with(1, "A", 88.0, (2, 1, 1)),
            team_with(2, "B", 77.0, (3, 1, 0)),
        )];

        let card = head_to_head_card(5, &matchups, 0);
        assert!(card.fields[0].value.starts_with("A (2-1-1) vs. B (3-1)"));
    }

    #[test]
    fn test_point_samples_include_scores_and_players() {
        let mut weeks = BTreeMap::new();
        weeks.insert(
            1,
            vec![matchup(1, team(1, "A", 100.5, vec![entry("Arm", "QB", 30.25)]), MatchupSide::Bye)],
        );
        assert_eq!(point_samples(&weeks), vec![100.5, 30.25]);
    }
}
