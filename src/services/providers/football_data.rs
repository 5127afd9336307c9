use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Deserialize;

use super::{kickoff_label, newest_first, parse_kickoff, DataUnavailable, JsonClient, MatchDataProvider};
use crate::config::AppConfig;
use crate::models::{Fixture, FixtureId, League, MatchResult, OddsTriple, Score, TeamId, TeamRef};

const BASE_URL: &str = "https://api.football-data.org/v4";
const AUTH_HEADER: &str = "X-Auth-Token";

// ── football-data.org structures ────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct FootballDataMatches {
    pub matches: Vec<FootballMatch>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FootballMatch {
    pub id: Option<u64>,
    pub utc_date: Option<String>,
    pub status: Option<String>,
    pub competition: Option<Competition>,
    pub home_team: Option<MatchTeam>,
    pub away_team: Option<MatchTeam>,
    pub score: Option<MatchScore>,
    pub odds: Option<MatchOdds>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Competition {
    pub name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct MatchTeam {
    pub id: Option<u32>,
    pub name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MatchScore {
    pub full_time: Option<FullTime>,
}

#[derive(Debug, Default, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct FullTime {
    pub home: Option<u32>,
    pub away: Option<u32>,
}

/// Only populated with the paid odds add-on; otherwise just a `msg`.
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MatchOdds {
    pub home_win: Option<f64>,
    pub draw: Option<f64>,
    pub away_win: Option<f64>,
    pub msg: Option<String>,
}

// ── Conversions ──────────────────────────────────────────────────────────────

fn team_ref(team: Option<&MatchTeam>) -> Option<TeamRef> {
    let team = team?;
    Some(TeamRef {
        id: team.id?,
        name: team.name.clone().unwrap_or_default(),
    })
}

fn final_score(m: &FootballMatch) -> Option<Score> {
    if m.status.as_deref() != Some("FINISHED") {
        return None;
    }
    let ft = m.score.as_ref()?.full_time?;
    Some(Score {
        home: ft.home?,
        away: ft.away?,
    })
}

pub fn to_match_result(m: &FootballMatch) -> Option<MatchResult> {
    Some(MatchResult {
        fixture_id: m.id?,
        kickoff: m.utc_date.as_deref().and_then(parse_kickoff),
        home: team_ref(m.home_team.as_ref())?,
        away: team_ref(m.away_team.as_ref())?,
        score: final_score(m),
    })
}

pub fn to_fixture(m: &FootballMatch, league: League, date: NaiveDate) -> Option<Fixture> {
    let kickoff = m.utc_date.as_deref().and_then(parse_kickoff);
    Some(Fixture {
        id: m.id?,
        league,
        league_name: m
            .competition
            .as_ref()
            .and_then(|c| c.name.clone())
            .unwrap_or_else(|| league.name().to_string()),
        date,
        kickoff: kickoff_label(kickoff),
        home: team_ref(m.home_team.as_ref())?,
        away: team_ref(m.away_team.as_ref())?,
        odds: None,
        probabilities: None,
    })
}

pub fn extract_odds(m: &FootballMatch) -> Option<OddsTriple> {
    let odds = m.odds.as_ref()?;
    if let Some(msg) = &odds.msg {
        tracing::debug!("football-data odds unavailable: {}", msg);
    }
    Some(OddsTriple::new(odds.home_win?, odds.draw?, odds.away_win?))
}

// ── Provider ─────────────────────────────────────────────────────────────────

/// How many finished matches of one team are scanned to find meetings with another.
const H2H_SCAN_LIMIT: usize = 50;

pub struct FootballDataProvider {
    http: JsonClient,
}

impl FootballDataProvider {
    pub fn new(api_key: String, config: &AppConfig) -> Result<Self, DataUnavailable> {
        Ok(Self {
            http: JsonClient::new(BASE_URL, AUTH_HEADER, api_key, config)?,
        })
    }

    async fn finished_matches(&self, team_id: TeamId) -> Result<Vec<MatchResult>, DataUnavailable> {
        let data: FootballDataMatches = self
            .http
            .get(
                &format!("/teams/{}/matches", team_id),
                &[("status", "FINISHED".to_string())],
            )
            .await?;
        Ok(data.matches.iter().filter_map(to_match_result).collect())
    }
}

#[async_trait]
impl MatchDataProvider for FootballDataProvider {
    fn name(&self) -> &'static str {
        "football-data"
    }

    async fn get_fixtures(&self, league: League, date: NaiveDate) -> Result<Vec<Fixture>, DataUnavailable> {
        let day = date.format("%Y-%m-%d").to_string();
        let data: FootballDataMatches = self
            .http
            .get(
                &format!("/competitions/{}/matches", league.football_data_code()),
                &[("dateFrom", day.clone()), ("dateTo", day)],
            )
            .await?;
        Ok(data
            .matches
            .iter()
            .filter_map(|m| to_fixture(m, league, date))
            .collect())
    }

    // The feed returns a season in ascending order; sort and cap locally.
    async fn get_recent_matches(&self, team_id: TeamId, count: usize) -> Result<Vec<MatchResult>, DataUnavailable> {
        Ok(newest_first(self.finished_matches(team_id).await?, count))
    }

    async fn get_head_to_head(
        &self,
        team_a: TeamId,
        team_b: TeamId,
        count: usize,
    ) -> Result<Vec<MatchResult>, DataUnavailable> {
        let scanned = newest_first(self.finished_matches(team_a).await?, H2H_SCAN_LIMIT);
        let meetings = scanned.into_iter().filter(|m| m.involves(team_b)).collect();
        Ok(newest_first(meetings, count))
    }

    async fn get_match_odds(&self, fixture_id: FixtureId) -> Result<Option<OddsTriple>, DataUnavailable> {
        let m: FootballMatch = self.http.get(&format!("/matches/{}", fixture_id), &[]).await?;
        Ok(extract_odds(&m))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MATCHES: &str = r#"{
        "filters": {"dateFrom": "2024-05-04", "dateTo": "2024-05-04"},
        "resultSet": {"count": 2},
        "competition": {"id": 2021, "name": "Premier League", "code": "PL"},
        "matches": [
            {
                "id": 438001,
                "utcDate": "2024-05-04T11:30:00Z",
                "status": "FINISHED",
                "competition": {"id": 2021, "name": "Premier League"},
                "homeTeam": {"id": 57, "name": "Arsenal FC"},
                "awayTeam": {"id": 61, "name": "Chelsea FC"},
                "score": {"winner": "HOME_TEAM", "fullTime": {"home": 3, "away": 1}, "halfTime": {"home": 1, "away": 0}}
            },
            {
                "id": 438002,
                "utcDate": "2024-05-04T14:00:00Z",
                "status": "TIMED",
                "homeTeam": {"id": 65, "name": "Manchester City FC"},
                "awayTeam": {"id": 64, "name": "Liverpool FC"},
                "score": {"winner": null, "fullTime": {"home": null, "away": null}}
            }
        ]
    }"#;

    #[test]
    fn test_parses_matches() {
        let data: FootballDataMatches = serde_json::from_str(MATCHES).unwrap();
        let date = NaiveDate::from_ymd_opt(2024, 5, 4).unwrap();
        let fixtures: Vec<Fixture> = data
            .matches
            .iter()
            .filter_map(|m| to_fixture(m, League::PremierLeague, date))
            .collect();
        assert_eq!(fixtures.len(), 2);
        assert_eq!(fixtures[0].home.name, "Arsenal FC");
        assert_eq!(fixtures[0].kickoff.as_deref(), Some("11:30"));
        assert_eq!(fixtures[1].league_name, "Premier League");
    }

    #[test]
    fn test_only_finished_matches_carry_scores() {
        let data: FootballDataMatches = serde_json::from_str(MATCHES).unwrap();
        let results: Vec<MatchResult> = data.matches.iter().filter_map(to_match_result).collect();
        assert_eq!(results[0].score, Some(Score { home: 3, away: 1 }));
        assert_eq!(results[1].score, None);
    }

    #[test]
    fn test_odds_require_all_three_prices() {
        let with_odds: FootballMatch = serde_json::from_str(
            r#"{"id": 1, "odds": {"homeWin": 1.85, "draw": 3.6, "awayWin": 4.2}}"#,
        )
        .unwrap();
        let odds = extract_odds(&with_odds).unwrap();
        assert_eq!((odds.home, odds.draw, odds.away), (1.85, 3.6, 4.2));

        let locked: FootballMatch = serde_json::from_str(
            r#"{"id": 1, "odds": {"msg": "Activate Odds-Package in User-Panel to retrieve odds."}}"#,
        )
        .unwrap();
        assert!(extract_odds(&locked).is_none());
    }
}
