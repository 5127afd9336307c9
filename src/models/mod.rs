use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

pub type TeamId = u32;
pub type FixtureId = u64;

/// Competitions the analyzer knows how to query on every provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum League {
    Brasileirao,
    PremierLeague,
    LaLiga,
    SerieA,
    Bundesliga,
    Ligue1,
}

impl League {
    pub const ALL: [League; 6] = [
        League::Brasileirao,
        League::PremierLeague,
        League::LaLiga,
        League::SerieA,
        League::Bundesliga,
        League::Ligue1,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            League::Brasileirao => "Brasileirão Série A",
            League::PremierLeague => "Premier League",
            League::LaLiga => "La Liga",
            League::SerieA => "Serie A",
            League::Bundesliga => "Bundesliga",
            League::Ligue1 => "Ligue 1",
        }
    }

    pub fn api_football_id(&self) -> u32 {
        match self {
            League::Brasileirao => 71,
            League::PremierLeague => 39,
            League::LaLiga => 140,
            League::SerieA => 135,
            League::Bundesliga => 78,
            League::Ligue1 => 61,
        }
    }

    pub fn football_data_code(&self) -> &'static str {
        match self {
            League::Brasileirao => "BSA",
            League::PremierLeague => "PL",
            League::LaLiga => "PD",
            League::SerieA => "SA",
            League::Bundesliga => "BL1",
            League::Ligue1 => "FL1",
        }
    }

    /// Season label api-football expects for a match on `date`.
    /// Brasileirão runs on the calendar year; European leagues are keyed by start year.
    pub fn season_for(&self, date: NaiveDate) -> i32 {
        match self {
            League::Brasileirao => date.year(),
            _ if date.month() >= 7 => date.year(),
            _ => date.year() - 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamRef {
    pub id: TeamId,
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Score {
    pub home: u32,
    pub away: u32,
}

/// A finished fixture as reported by a provider. `score` is `None` when the feed omits it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchResult {
    pub fixture_id: FixtureId,
    pub kickoff: Option<DateTime<Utc>>,
    pub home: TeamRef,
    pub away: TeamRef,
    pub score: Option<Score>,
}

impl MatchResult {
    pub fn involves(&self, team_id: TeamId) -> bool {
        self.home.id == team_id || self.away.id == team_id
    }

    /// Result from `team_id`'s point of view, if the team played and the score is known.
    pub fn result_for(&self, team_id: TeamId) -> Option<TeamResult> {
        let score = self.score?;
        let (scored, conceded) = if self.home.id == team_id {
            (score.home, score.away)
        } else if self.away.id == team_id {
            (score.away, score.home)
        } else {
            return None;
        };
        Some(match scored.cmp(&conceded) {
            std::cmp::Ordering::Greater => TeamResult::Win,
            std::cmp::Ordering::Equal => TeamResult::Draw,
            std::cmp::Ordering::Less => TeamResult::Loss,
        })
    }

    /// The side `team_id` played against.
    pub fn opponent_of(&self, team_id: TeamId) -> Option<&TeamRef> {
        if self.home.id == team_id {
            Some(&self.away)
        } else if self.away.id == team_id {
            Some(&self.home)
        } else {
            None
        }
    }

    /// Goals (for, against) from `team_id`'s point of view.
    pub fn goals_for(&self, team_id: TeamId) -> Option<(u32, u32)> {
        let score = self.score?;
        if self.home.id == team_id {
            Some((score.home, score.away))
        } else if self.away.id == team_id {
            Some((score.away, score.home))
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TeamResult {
    Win,
    Draw,
    Loss,
}

impl TeamResult {
    pub fn points(&self) -> u32 {
        match self {
            TeamResult::Win => 3,
            TeamResult::Draw => 1,
            TeamResult::Loss => 0,
        }
    }

    pub fn letter(&self) -> char {
        match self {
            TeamResult::Win => 'W',
            TeamResult::Draw => 'D',
            TeamResult::Loss => 'L',
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Home,
    Draw,
    Away,
}

impl Outcome {
    pub fn label(&self) -> &'static str {
        match self {
            Outcome::Home => "H",
            Outcome::Draw => "D",
            Outcome::Away => "A",
        }
    }
}

const SUM_TOLERANCE: f64 = 1e-6;

/// Three-way home/draw/away distribution. Components are non-negative and sum to 1.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Probabilities {
    home: f64,
    draw: f64,
    away: f64,
}

impl Probabilities {
    pub const NEUTRAL: Probabilities = Probabilities {
        home: 1.0 / 3.0,
        draw: 1.0 / 3.0,
        away: 1.0 / 3.0,
    };

    /// Base distribution used when a fixture has no usable bookmaker odds.
    pub const ODDS_PRIOR: Probabilities = Probabilities {
        home: 0.33,
        draw: 0.34,
        away: 0.33,
    };

    /// Substituted when the weighted combination degenerates to zero.
    pub const COMBINED_FALLBACK: Probabilities = Probabilities {
        home: 0.34,
        draw: 0.32,
        away: 0.34,
    };

    /// Normalizes raw non-negative weights. `None` when any weight is negative
    /// or non-finite, or when they sum to zero.
    pub fn from_weights(home: f64, draw: f64, away: f64) -> Option<Self> {
        let parts = [home, draw, away];
        if parts.iter().any(|p| !p.is_finite() || *p < 0.0) {
            return None;
        }
        let total: f64 = parts.iter().sum();
        if !total.is_finite() || total <= 0.0 {
            return None;
        }
        Some(Self {
            home: home / total,
            draw: draw / total,
            away: away / total,
        })
    }

    pub fn home(&self) -> f64 {
        self.home
    }

    pub fn draw(&self) -> f64 {
        self.draw
    }

    pub fn away(&self) -> f64 {
        self.away
    }

    pub fn get(&self, outcome: Outcome) -> f64 {
        match outcome {
            Outcome::Home => self.home,
            Outcome::Draw => self.draw,
            Outcome::Away => self.away,
        }
    }

    /// Highest-probability side; ties resolve home, then draw, then away.
    pub fn most_likely(&self) -> Outcome {
        if self.home >= self.draw && self.home >= self.away {
            Outcome::Home
        } else if self.draw >= self.away {
            Outcome::Draw
        } else {
            Outcome::Away
        }
    }

    pub fn is_valid(&self) -> bool {
        let parts = [self.home, self.draw, self.away];
        parts.iter().all(|p| p.is_finite() && *p >= 0.0)
            && (parts.iter().sum::<f64>() - 1.0).abs() <= SUM_TOLERANCE
    }
}

/// Decimal bookmaker prices for the 1X2 market.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OddsTriple {
    pub home: f64,
    pub draw: f64,
    pub away: f64,
    pub bookmaker: Option<String>,
}

impl OddsTriple {
    pub fn new(home: f64, draw: f64, away: f64) -> Self {
        Self { home, draw, away, bookmaker: None }
    }

    pub fn get(&self, outcome: Outcome) -> f64 {
        match outcome {
            Outcome::Home => self.home,
            Outcome::Draw => self.draw,
            Outcome::Away => self.away,
        }
    }

    /// The quoted price for `outcome`, if it is a usable positive number.
    pub fn quoted(&self, outcome: Outcome) -> Option<f64> {
        let odd = self.get(outcome);
        (odd.is_finite() && odd > 0.0).then_some(odd)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Fixture {
    pub id: FixtureId,
    pub league: League,
    pub league_name: String,
    pub date: NaiveDate,
    /// Kick-off in UTC, "HH:MM".
    pub kickoff: Option<String>,
    pub home: TeamRef,
    pub away: TeamRef,
    pub odds: Option<OddsTriple>,
    pub probabilities: Option<Probabilities>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FormRecord {
    pub team_id: TeamId,
    pub games: u32,
    pub points: u32,
    pub points_per_match: f64,
    pub goals_for_avg: f64,
    pub goals_against_avg: f64,
    /// Most-recent-first, e.g. "WWDLW".
    pub form: String,
    /// The window the record was computed from, newest first.
    pub matches: Vec<MatchResult>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct HeadToHeadRecord {
    /// Meetings with a known score.
    pub meetings: u32,
    pub home_wins: u32,
    pub away_wins: u32,
    pub draws: u32,
    pub matches: Vec<MatchResult>,
}

/// Which base distribution feeds the combiner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisMode {
    /// Bookmaker odds when quoted, the prior otherwise.
    #[default]
    Odds,
    /// Form and head-to-head only; odds are never fetched.
    Model,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BaseSource {
    Odds,
    Prior,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FixtureAnalysis {
    /// Carries the final distribution and any odds found.
    pub fixture: Fixture,
    pub base: Probabilities,
    pub base_source: BaseSource,
    pub form: Probabilities,
    pub h2h: Probabilities,
    pub home_form: FormRecord,
    pub away_form: FormRecord,
    pub head_to_head: HeadToHeadRecord,
    /// Human-readable "data unavailable" messages for this fixture.
    pub notes: Vec<String>,
}

/// Last analyzed fixture list; replaced wholesale on every search.
#[derive(Debug, Clone, Default)]
pub struct Session {
    analyses: Vec<FixtureAnalysis>,
}

impl Session {
    pub fn replace(&mut self, analyses: Vec<FixtureAnalysis>) {
        self.analyses = analyses;
    }

    pub fn analyses(&self) -> &[FixtureAnalysis] {
        &self.analyses
    }

    pub fn fixtures(&self) -> Vec<Fixture> {
        self.analyses.iter().map(|a| a.fixture.clone()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.analyses.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SimulationMode {
    /// Deterministic expected value per bet.
    Expected,
    /// Demo: one random draw per bet.
    Stochastic,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimulatedBet {
    pub fixture_id: FixtureId,
    pub home_team: String,
    pub away_team: String,
    pub pick: Outcome,
    pub probability: f64,
    pub odd: Option<f64>,
    pub odd_quoted: bool,
    /// Only set in stochastic mode.
    pub won: Option<bool>,
    pub profit: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimulationReport {
    pub mode: SimulationMode,
    pub stake: f64,
    pub bets: Vec<SimulatedBet>,
    pub skipped: usize,
    pub total_staked: f64,
    pub total_profit: f64,
    pub return_on_stake: f64,
    pub starting_bankroll: f64,
    pub final_bankroll: f64,
}

// API Response types
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            timestamp: Utc::now(),
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message),
            timestamp: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn team(id: TeamId) -> TeamRef {
        TeamRef { id, name: format!("Team {}", id) }
    }

    fn result(home: TeamId, away: TeamId, score: Option<(u32, u32)>) -> MatchResult {
        MatchResult {
            fixture_id: 1,
            kickoff: None,
            home: team(home),
            away: team(away),
            score: score.map(|(h, a)| Score { home: h, away: a }),
        }
    }

    #[test]
    fn test_result_for_uses_team_perspective() {
        let m = result(1, 2, Some((0, 2)));
        assert_eq!(m.result_for(1), Some(TeamResult::Loss));
        assert_eq!(m.result_for(2), Some(TeamResult::Win));
        assert_eq!(m.result_for(3), None);
        assert_eq!(result(1, 2, None).result_for(1), None);
    }

    #[test]
    fn test_opponent_of() {
        let m = result(1, 2, Some((0, 2)));
        assert_eq!(m.opponent_of(1).map(|t| t.id), Some(2));
        assert_eq!(m.opponent_of(2).map(|t| t.id), Some(1));
        assert!(m.opponent_of(3).is_none());
    }

    #[test]
    fn test_from_weights_normalizes() {
        let p = Probabilities::from_weights(2.0, 1.0, 1.0).unwrap();
        assert!((p.home() - 0.5).abs() < 1e-12);
        assert!(p.is_valid());
        assert!(Probabilities::from_weights(0.0, 0.0, 0.0).is_none());
        assert!(Probabilities::from_weights(-1.0, 1.0, 1.0).is_none());
        assert!(Probabilities::from_weights(f64::NAN, 1.0, 1.0).is_none());
    }

    #[test]
    fn test_most_likely_tie_break_prefers_home_then_draw() {
        let p = Probabilities::from_weights(0.34, 0.34, 0.32).unwrap();
        assert_eq!(p.most_likely(), Outcome::Home);
        let p = Probabilities::from_weights(0.30, 0.35, 0.35).unwrap();
        assert_eq!(p.most_likely(), Outcome::Draw);
        let p = Probabilities::from_weights(0.20, 0.30, 0.50).unwrap();
        assert_eq!(p.most_likely(), Outcome::Away);
    }

    #[test]
    fn test_fallback_constants_are_valid() {
        assert!(Probabilities::NEUTRAL.is_valid());
        assert!(Probabilities::ODDS_PRIOR.is_valid());
        assert!(Probabilities::COMBINED_FALLBACK.is_valid());
    }

    #[test]
    fn test_season_for() {
        let d = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();
        assert_eq!(League::Brasileirao.season_for(d), 2025);
        assert_eq!(League::PremierLeague.season_for(d), 2024);
        let d = NaiveDate::from_ymd_opt(2025, 8, 16).unwrap();
        assert_eq!(League::PremierLeague.season_for(d), 2025);
    }
}
