use async_trait::async_trait;
use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

use super::{kickoff_label, newest_first, parse_kickoff, DataUnavailable, JsonClient, MatchDataProvider};
use crate::config::AppConfig;
use crate::models::{Fixture, FixtureId, League, MatchResult, OddsTriple, Score, TeamId, TeamRef};

const BASE_URL: &str = "https://v3.football.api-sports.io";
const AUTH_HEADER: &str = "x-apisports-key";

/// Market names api-football has used for the 1X2 market.
const MATCH_WINNER_MARKETS: [&str; 4] = ["match winner", "1x2", "winner", "vencedor da partida"];
const FINISHED_STATUSES: [&str; 3] = ["FT", "AET", "PEN"];

// ── api-football structures ─────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct Envelope {
    /// Decoded item by item so one malformed row doesn't sink the whole list.
    #[serde(default)]
    pub response: Vec<Value>,
    /// `[]` on success; an object or list of messages on failure (still HTTP 200).
    #[serde(default)]
    pub errors: Value,
}

impl Envelope {
    pub fn items<T: DeserializeOwned>(self) -> Vec<T> {
        let total = self.response.len();
        let items: Vec<T> = self
            .response
            .into_iter()
            .filter_map(|raw| serde_json::from_value(raw).ok())
            .collect();
        if items.len() < total {
            tracing::warn!("api-football: skipped {} malformed items", total - items.len());
        }
        items
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct FixtureItem {
    pub fixture: FixtureInfo,
    pub league: Option<LeagueInfo>,
    pub teams: Option<Teams>,
    pub goals: Option<Goals>,
    pub score: Option<ScoreInfo>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct FixtureInfo {
    pub id: Option<u64>,
    pub date: Option<String>,
    pub status: Option<Status>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Status {
    pub short: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LeagueInfo {
    pub name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Teams {
    pub home: Option<TeamInfo>,
    pub away: Option<TeamInfo>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct TeamInfo {
    pub id: Option<u32>,
    pub name: Option<String>,
}

#[derive(Debug, Default, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct Goals {
    pub home: Option<u32>,
    pub away: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ScoreInfo {
    pub fulltime: Option<Goals>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct OddsItem {
    pub bookmakers: Vec<Bookmaker>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Bookmaker {
    pub name: Option<String>,
    pub bets: Vec<Bet>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Bet {
    pub name: Option<String>,
    pub values: Vec<BetValue>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct BetValue {
    pub value: Option<Value>,
    pub odd: Option<Value>,
}

// ── Conversions ──────────────────────────────────────────────────────────────

/// A human-readable message when the `errors` field is non-empty.
pub fn api_error(errors: &Value) -> Option<String> {
    match errors {
        Value::Array(items) if !items.is_empty() => Some(
            items
                .iter()
                .map(value_text)
                .collect::<Vec<_>>()
                .join("; "),
        ),
        Value::Object(map) if !map.is_empty() => Some(
            map.iter()
                .map(|(k, v)| format!("{}: {}", k, value_text(v)))
                .collect::<Vec<_>>()
                .join("; "),
        ),
        _ => None,
    }
}

fn value_text(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn team_ref(info: Option<&TeamInfo>) -> Option<TeamRef> {
    let info = info?;
    Some(TeamRef {
        id: info.id?,
        name: info.name.clone().unwrap_or_default(),
    })
}

fn final_score(item: &FixtureItem) -> Option<Score> {
    let status = item.fixture.status.as_ref().and_then(|s| s.short.as_deref());
    if let Some(short) = status {
        if !FINISHED_STATUSES.contains(&short) {
            return None;
        }
    }
    let goals = item
        .score
        .as_ref()
        .and_then(|s| s.fulltime)
        .filter(|g| g.home.is_some() && g.away.is_some())
        .or(item.goals)?;
    Some(Score {
        home: goals.home?,
        away: goals.away?,
    })
}

pub fn to_match_result(item: &FixtureItem) -> Option<MatchResult> {
    let teams = item.teams.as_ref()?;
    Some(MatchResult {
        fixture_id: item.fixture.id?,
        kickoff: item.fixture.date.as_deref().and_then(parse_kickoff),
        home: team_ref(teams.home.as_ref())?,
        away: team_ref(teams.away.as_ref())?,
        score: final_score(item),
    })
}

pub fn to_fixture(item: &FixtureItem, league: League, date: NaiveDate) -> Option<Fixture> {
    let teams = item.teams.as_ref()?;
    let kickoff = item.fixture.date.as_deref().and_then(parse_kickoff);
    Some(Fixture {
        id: item.fixture.id?,
        league,
        league_name: item
            .league
            .as_ref()
            .and_then(|l| l.name.clone())
            .unwrap_or_else(|| league.name().to_string()),
        date,
        kickoff: kickoff_label(kickoff),
        home: team_ref(teams.home.as_ref())?,
        away: team_ref(teams.away.as_ref())?,
        odds: None,
        probabilities: None,
    })
}

fn price(v: Option<&Value>) -> Option<f64> {
    let odd = match v? {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse().ok()?,
        _ => return None,
    };
    (odd.is_finite() && odd > 0.0).then_some(odd)
}

fn label(v: &BetValue) -> String {
    v.value.as_ref().map(value_text).unwrap_or_default().to_ascii_lowercase()
}

/// Home/draw/away prices from a 1X2 market: matched by label, else by position.
fn match_winner_prices(values: &[BetValue]) -> Option<(f64, f64, f64)> {
    let by_label = |names: [&str; 2]| {
        values
            .iter()
            .find(|v| names.contains(&label(v).as_str()))
            .and_then(|v| price(v.odd.as_ref()))
    };
    if let (Some(h), Some(d), Some(a)) = (
        by_label(["home", "1"]),
        by_label(["draw", "x"]),
        by_label(["away", "2"]),
    ) {
        return Some((h, d, a));
    }

    let at = |i: usize| values.get(i).and_then(|v| price(v.odd.as_ref()));
    Some((at(0)?, at(1)?, at(2)?))
}

/// First bookmaker offering a parseable match-winner market.
pub fn extract_odds(items: &[OddsItem]) -> Option<OddsTriple> {
    items.iter().flat_map(|item| &item.bookmakers).find_map(|bookmaker| {
        let bet = bookmaker.bets.iter().find(|b| {
            b.name
                .as_deref()
                .map(|n| MATCH_WINNER_MARKETS.contains(&n.trim().to_ascii_lowercase().as_str()))
                .unwrap_or(false)
        })?;
        let (home, draw, away) = match_winner_prices(&bet.values)?;
        Some(OddsTriple {
            home,
            draw,
            away,
            bookmaker: bookmaker.name.clone(),
        })
    })
}

// ── Provider ─────────────────────────────────────────────────────────────────

pub struct ApiFootballProvider {
    http: JsonClient,
    season_override: Option<i32>,
}

impl ApiFootballProvider {
    pub fn new(api_key: String, config: &AppConfig) -> Result<Self, DataUnavailable> {
        Ok(Self {
            http: JsonClient::new(BASE_URL, AUTH_HEADER, api_key, config)?,
            season_override: config.season_override,
        })
    }

    async fn fixtures(&self, path: &str, query: &[(&str, String)]) -> Result<Vec<FixtureItem>, DataUnavailable> {
        let envelope: Envelope = self.http.get(path, query).await?;
        match api_error(&envelope.errors) {
            Some(message) => Err(DataUnavailable::Api(message)),
            None => Ok(envelope.items()),
        }
    }
}

#[async_trait]
impl MatchDataProvider for ApiFootballProvider {
    fn name(&self) -> &'static str {
        "api-football"
    }

    async fn get_fixtures(&self, league: League, date: NaiveDate) -> Result<Vec<Fixture>, DataUnavailable> {
        let season = self.season_override.unwrap_or_else(|| league.season_for(date));
        let items = self
            .fixtures(
                "/fixtures",
                &[
                    ("league", league.api_football_id().to_string()),
                    ("season", season.to_string()),
                    ("date", date.format("%Y-%m-%d").to_string()),
                ],
            )
            .await?;

        let total = items.len();
        let fixtures: Vec<Fixture> = items.iter().filter_map(|i| to_fixture(i, league, date)).collect();
        if fixtures.len() < total {
            tracing::warn!(
                "api-football: skipped {} fixtures without id/teams for {}",
                total - fixtures.len(),
                league.name()
            );
        }
        Ok(fixtures)
    }

    async fn get_recent_matches(&self, team_id: TeamId, count: usize) -> Result<Vec<MatchResult>, DataUnavailable> {
        let items = self
            .fixtures(
                "/fixtures",
                &[
                    ("team", team_id.to_string()),
                    ("last", count.to_string()),
                    ("status", "FT".to_string()),
                ],
            )
            .await?;
        Ok(newest_first(items.iter().filter_map(to_match_result).collect(), count))
    }

    async fn get_head_to_head(
        &self,
        team_a: TeamId,
        team_b: TeamId,
        count: usize,
    ) -> Result<Vec<MatchResult>, DataUnavailable> {
        let items = self
            .fixtures(
                "/fixtures/headtohead",
                &[
                    ("h2h", format!("{}-{}", team_a, team_b)),
                    ("last", count.to_string()),
                ],
            )
            .await?;
        Ok(newest_first(items.iter().filter_map(to_match_result).collect(), count))
    }

    async fn get_match_odds(&self, fixture_id: FixtureId) -> Result<Option<OddsTriple>, DataUnavailable> {
        let envelope: Envelope = self
            .http
            .get("/odds", &[("fixture", fixture_id.to_string())])
            .await?;
        if let Some(message) = api_error(&envelope.errors) {
            return Err(DataUnavailable::Api(message));
        }
        Ok(extract_odds(&envelope.items::<OddsItem>()))
    }
}
