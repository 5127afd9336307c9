//! Probability estimators for a single fixture.
//!
//! Three independent views (bookmaker odds, recent form, head-to-head) each
//! produce a home/draw/away distribution; [`combine`] blends them with
//! configurable weights. This is a heuristic, not a calibrated model: every
//! estimator degrades to a neutral prior instead of failing when data is thin.

use std::collections::HashSet;

use thiserror::Error;

use crate::config::ConfigError;
use crate::models::{
    FormRecord, HeadToHeadRecord, MatchResult, OddsTriple, Probabilities, TeamId, TeamResult,
};
use crate::utils::results_to_form;

#[derive(Debug, Error, PartialEq)]
#[error("unusable odds {home}/{draw}/{away}: every price must be a positive number")]
pub struct InvalidOdds {
    pub home: f64,
    pub draw: f64,
    pub away: f64,
}

/// Bookmaker-implied distribution with the overround removed.
pub fn odds_implied(odds: &OddsTriple) -> Result<Probabilities, InvalidOdds> {
    let prices = [odds.home, odds.draw, odds.away];
    if prices.iter().any(|p| !p.is_finite() || *p <= 0.0) {
        return Err(InvalidOdds {
            home: odds.home,
            draw: odds.draw,
            away: odds.away,
        });
    }
    Probabilities::from_weights(1.0 / odds.home, 1.0 / odds.draw, 1.0 / odds.away).ok_or(
        InvalidOdds {
            home: odds.home,
            draw: odds.draw,
            away: odds.away,
        },
    )
}

// ── Form ─────────────────────────────────────────────────────────────────────

/// Points-per-match assumed for a team with no resolved games.
pub const NEUTRAL_PPM: f64 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FormModel {
    draw_floor: f64,
    draw_closeness: f64,
}

impl Default for FormModel {
    fn default() -> Self {
        Self {
            draw_floor: 0.05,
            draw_closeness: 0.0,
        }
    }
}

impl FormModel {
    pub fn new(draw_floor: f64, draw_closeness: f64) -> Result<Self, ConfigError> {
        if !(0.0..1.0).contains(&draw_floor) {
            return Err(ConfigError::InvalidDrawFloor(draw_floor));
        }
        if !(0.0..=1.0).contains(&draw_closeness) {
            return Err(ConfigError::InvalidDrawCloseness(draw_closeness));
        }
        Ok(Self {
            draw_floor,
            draw_closeness,
        })
    }

    pub fn draw_floor(&self) -> f64 {
        self.draw_floor
    }

    pub fn draw_closeness(&self) -> f64 {
        self.draw_closeness
    }

    /// Turns both teams' points-per-match into a three-way distribution.
    ///
    /// The two ppm values are split into home/away shares; the draw share
    /// grows as the shares get closer (scaled by `draw_closeness`) and never
    /// drops below `draw_floor`. The triple is then renormalized.
    pub fn probabilities(&self, home: &FormRecord, away: &FormRecord) -> Probabilities {
        let total = home.points_per_match + away.points_per_match;
        let (ph, pa) = if total > 0.0 && total.is_finite() {
            (home.points_per_match / total, away.points_per_match / total)
        } else {
            (0.5, 0.5)
        };
        let pd = (self.draw_closeness * (1.0 - (ph - pa).abs())).max(self.draw_floor);
        Probabilities::from_weights(ph, pd, pa).unwrap_or(Probabilities::NEUTRAL)
    }
}

/// Form over `team_id`'s `last_n` most recent matches.
///
/// Matches the team didn't play are ignored. Matches without a score still
/// occupy a slot in the window but are not counted as games.
pub fn form_record(team_id: TeamId, matches: &[MatchResult], last_n: usize) -> FormRecord {
    let window = most_recent(matches.iter().filter(|m| m.involves(team_id)), last_n);

    let mut results = Vec::new();
    let mut goals_for = 0u32;
    let mut goals_against = 0u32;
    for m in &window {
        let Some(result) = m.result_for(team_id) else { continue };
        if let Some((gf, ga)) = m.goals_for(team_id) {
            goals_for += gf;
            goals_against += ga;
        }
        results.push(result);
    }

    let games = results.len() as u32;
    let points: u32 = results.iter().map(|r| r.points()).sum();
    let (ppm, gf_avg, ga_avg) = if games == 0 {
        (NEUTRAL_PPM, 0.0, 0.0)
    } else {
        let g = games as f64;
        (points as f64 / g, goals_for as f64 / g, goals_against as f64 / g)
    };

    FormRecord {
        team_id,
        games,
        points,
        points_per_match: ppm,
        goals_for_avg: gf_avg,
        goals_against_avg: ga_avg,
        form: results_to_form(&results),
        matches: window.into_iter().cloned().collect(),
    }
}

// ── Head-to-head ─────────────────────────────────────────────────────────────

/// Counts the last `last_n` meetings between the two teams, attributing wins
/// to today's home/away side regardless of where each meeting was played.
pub fn head_to_head_record(
    home_id: TeamId,
    away_id: TeamId,
    meetings: &[MatchResult],
    last_n: usize,
) -> HeadToHeadRecord {
    let mut seen = HashSet::new();
    let between = meetings.iter().filter(|m| {
        let pair = (m.home.id == home_id && m.away.id == away_id)
            || (m.home.id == away_id && m.away.id == home_id);
        pair && seen.insert(m.fixture_id)
    });

    let window = most_recent(between, last_n);
    let mut record = HeadToHeadRecord::default();
    for m in &window {
        let Some(result) = m.result_for(home_id) else { continue };
        record.meetings += 1;
        match result {
            TeamResult::Win => record.home_wins += 1,
            TeamResult::Loss => record.away_wins += 1,
            TeamResult::Draw => record.draws += 1,
        }
    }
    record.matches = window.into_iter().cloned().collect();
    record
}

pub fn head_to_head_probabilities(record: &HeadToHeadRecord) -> Probabilities {
    if record.meetings == 0 {
        return Probabilities::NEUTRAL;
    }
    Probabilities::from_weights(
        record.home_wins as f64,
        record.draws as f64,
        record.away_wins as f64,
    )
    .unwrap_or(Probabilities::NEUTRAL)
}

/// Newest first; matches without a kickoff time sort last, keeping feed order.
fn most_recent<'a, I>(matches: I, last_n: usize) -> Vec<&'a MatchResult>
where
    I: Iterator<Item = &'a MatchResult>,
{
    let mut sorted: Vec<&MatchResult> = matches.collect();
    sorted.sort_by(|a, b| b.kickoff.cmp(&a.kickoff));
    sorted.truncate(last_n);
    sorted
}

// ── Combination ──────────────────────────────────────────────────────────────

/// Blend weights for (base, form, h2h). Stored normalized to sum to 1.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Weights {
    base: f64,
    form: f64,
    h2h: f64,
}

impl Default for Weights {
    fn default() -> Self {
        Self {
            base: 0.6,
            form: 0.3,
            h2h: 0.1,
        }
    }
}

impl Weights {
    pub fn new(base: f64, form: f64, h2h: f64) -> Result<Self, ConfigError> {
        let parts = [base, form, h2h];
        let total: f64 = parts.iter().sum();
        if parts.iter().any(|w| !w.is_finite() || *w < 0.0) || !total.is_finite() || total <= 0.0 {
            return Err(ConfigError::InvalidWeights { base, form, h2h });
        }
        Ok(Self {
            base: base / total,
            form: form / total,
            h2h: h2h / total,
        })
    }

    pub fn base(&self) -> f64 {
        self.base
    }

    pub fn form(&self) -> f64 {
        self.form
    }

    pub fn h2h(&self) -> f64 {
        self.h2h
    }
}

pub fn combine(
    base: &Probabilities,
    form: &Probabilities,
    h2h: &Probabilities,
    weights: &Weights,
) -> Probabilities {
    let mix = |b: f64, f: f64, h: f64| weights.base * b + weights.form * f + weights.h2h * h;
    let home = mix(base.home(), form.home(), h2h.home());
    let draw = mix(base.draw(), form.draw(), h2h.draw());
    let away = mix(base.away(), form.away(), h2h.away());
    Probabilities::from_weights(home, draw, away).unwrap_or(Probabilities::COMBINED_FALLBACK)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Score, TeamRef};
    use chrono::{TimeZone, Utc};

    const EPS: f64 = 1e-6;

    fn game(id: u64, day: u32, home: TeamId, away: TeamId, score: Option<(u32, u32)>) -> MatchResult {
        MatchResult {
            fixture_id: id,
            kickoff: Some(Utc.with_ymd_and_hms(2024, 5, day, 19, 0, 0).unwrap()),
            home: TeamRef { id: home, name: format!("T{}", home) },
            away: TeamRef { id: away, name: format!("T{}", away) },
            score: score.map(|(h, a)| Score { home: h, away: a }),
        }
    }

    fn assert_probs(p: &Probabilities, home: f64, draw: f64, away: f64) {
        assert!((p.home() - home).abs() < EPS, "home {} != {}", p.home(), home);
        assert!((p.draw() - draw).abs() < EPS, "draw {} != {}", p.draw(), draw);
        assert!((p.away() - away).abs() < EPS, "away {} != {}", p.away(), away);
    }

    #[test]
    fn test_odds_implied_removes_overround() {
        let p = odds_implied(&OddsTriple::new(2.00, 3.40, 3.75)).unwrap();
        assert_probs(&p, 0.471349, 0.277264, 0.251386);
        assert!(p.is_valid());
    }

    #[test]
    fn test_odds_implied_components_in_open_unit_interval() {
        for odds in [(1.01, 30.0, 80.0), (2.5, 3.1, 2.9), (11.0, 6.5, 1.2)] {
            let p = odds_implied(&OddsTriple::new(odds.0, odds.1, odds.2)).unwrap();
            assert!(p.is_valid());
            for v in [p.home(), p.draw(), p.away()] {
                assert!(v > 0.0 && v < 1.0);
            }
        }
    }

    #[test]
    fn test_odds_round_trip() {
        let p = Probabilities::from_weights(0.52, 0.27, 0.21).unwrap();
        let odds = OddsTriple::new(1.0 / p.home(), 1.0 / p.draw(), 1.0 / p.away());
        let back = odds_implied(&odds).unwrap();
        assert_probs(&back, 0.52, 0.27, 0.21);
    }

    #[test]
    fn test_odds_implied_rejects_unusable_prices() {
        assert!(odds_implied(&OddsTriple::new(0.0, 3.0, 3.0)).is_err());
        assert!(odds_implied(&OddsTriple::new(2.0, -3.0, 3.0)).is_err());
        assert!(odds_implied(&OddsTriple::new(2.0, 3.0, f64::NAN)).is_err());
    }

    #[test]
    fn test_form_with_no_data_uses_neutral_ppm_and_draw_floor() {
        let home = form_record(1, &[], 5);
        let away = form_record(2, &[], 5);
        assert_eq!(home.games, 0);
        assert!((home.points_per_match - 1.0).abs() < EPS);
        let p = FormModel::default().probabilities(&home, &away);
        assert_probs(&p, 0.5 / 1.05, 0.05 / 1.05, 0.5 / 1.05);
    }

    #[test]
    fn test_form_record_counts_from_team_perspective() {
        let matches = vec![
            game(1, 1, 1, 9, Some((2, 0))),
            game(2, 2, 8, 1, Some((0, 1))),
            game(3, 3, 1, 7, Some((3, 3))),
            game(4, 4, 6, 1, None),
            game(5, 5, 5, 4, Some((1, 0))),
        ];
        let record = form_record(1, &matches, 5);
        assert_eq!(record.games, 3);
        assert_eq!(record.points, 7);
        assert!((record.points_per_match - 7.0 / 3.0).abs() < EPS);
        assert!((record.goals_for_avg - 2.0).abs() < EPS);
        assert!((record.goals_against_avg - 1.0).abs() < EPS);
        assert_eq!(record.form, "DWW");
        // Newest first, unscored match kept in the listing
        let ids: Vec<u64> = record.matches.iter().map(|m| m.fixture_id).collect();
        assert_eq!(ids, vec![4, 3, 2, 1]);
    }

    #[test]
    fn test_form_window_attributes_away_games_to_the_team() {
        let matches = vec![game(1, 1, 1, 9, Some((2, 2))), game(2, 2, 8, 1, Some((0, 1)))];
        let record = form_record(1, &matches, 5);
        let away_game = &record.matches[0];
        assert_eq!(away_game.away.id, 1);
        assert_eq!(away_game.opponent_of(1).map(|t| t.name.as_str()), Some("T8"));
        assert_eq!(away_game.result_for(1), Some(TeamResult::Win));
        assert_eq!(away_game.goals_for(1), Some((1, 0)));
    }

    #[test]
    fn test_form_record_keeps_only_most_recent_window() {
        let matches = vec![
            game(1, 1, 1, 2, Some((0, 5))),
            game(2, 2, 1, 2, Some((0, 5))),
            game(3, 10, 1, 2, Some((1, 0))),
            game(4, 11, 1, 2, Some((1, 0))),
        ];
        let record = form_record(1, &matches, 2);
        assert_eq!(record.games, 2);
        assert!((record.points_per_match - 3.0).abs() < EPS);
    }

    #[test]
    fn test_form_probabilities_follow_ppm_split() {
        let home = form_record(
            1,
            &[
                game(1, 1, 1, 9, Some((2, 0))),
                game(2, 2, 9, 1, Some((0, 1))),
                game(3, 3, 1, 9, Some((1, 0))),
            ],
            5,
        );
        let away = form_record(
            2,
            &[
                game(4, 1, 2, 9, Some((2, 0))),
                game(5, 2, 9, 2, Some((1, 1))),
                game(6, 3, 2, 9, Some((0, 1))),
            ],
            5,
        );
        let p = FormModel::default().probabilities(&home, &away);
        assert_probs(&p, 0.659341, 0.047619, 0.293040);
    }

    #[test]
    fn test_form_both_teams_pointless_is_even_split() {
        let home = form_record(1, &[game(1, 1, 1, 9, Some((0, 1)))], 5);
        let away = form_record(2, &[game(2, 1, 9, 2, Some((3, 0)))], 5);
        let p = FormModel::default().probabilities(&home, &away);
        assert!(p.is_valid());
        assert!((p.home() - p.away()).abs() < EPS);
    }

    #[test]
    fn test_form_draw_closeness_raises_draw_for_even_teams() {
        let model = FormModel::new(0.05, 0.3).unwrap();
        let even = model.probabilities(&form_record(1, &[], 5), &form_record(2, &[], 5));
        assert_probs(&even, 0.5 / 1.3, 0.3 / 1.3, 0.5 / 1.3);
        assert!(FormModel::new(1.0, 0.0).is_err());
        assert!(FormModel::new(0.05, 1.5).is_err());
    }

    #[test]
    fn test_h2h_attributes_wins_to_current_sides() {
        // Team 1 hosts today; it won once at home and once away, team 2 won once.
        let meetings = vec![
            game(1, 1, 1, 2, Some((2, 1))),
            game(2, 2, 2, 1, Some((0, 3))),
            game(3, 3, 2, 1, Some((1, 0))),
            game(4, 4, 1, 2, Some((1, 1))),
        ];
        let record = head_to_head_record(1, 2, &meetings, 5);
        assert_eq!(
            (record.meetings, record.home_wins, record.away_wins, record.draws),
            (4, 2, 1, 1)
        );
        let ids: Vec<u64> = record.matches.iter().map(|m| m.fixture_id).collect();
        assert_eq!(ids, vec![4, 3, 2, 1]);
        let p = head_to_head_probabilities(&record);
        assert_probs(&p, 0.5, 0.25, 0.25);
    }

    #[test]
    fn test_h2h_dedupes_and_ignores_other_pairs() {
        let meetings = vec![
            game(1, 1, 1, 2, Some((2, 1))),
            game(1, 1, 1, 2, Some((2, 1))),
            game(2, 2, 1, 3, Some((0, 3))),
            game(3, 3, 2, 1, None),
        ];
        let record = head_to_head_record(1, 2, &meetings, 5);
        assert_eq!(record.meetings, 1);
        assert_eq!(record.home_wins, 1);
    }

    #[test]
    fn test_h2h_without_meetings_is_neutral() {
        let record = head_to_head_record(1, 2, &[], 5);
        assert_eq!(head_to_head_probabilities(&record), Probabilities::NEUTRAL);
    }

    #[test]
    fn test_combine_scenario_odds_only() {
        let base = odds_implied(&OddsTriple::new(2.00, 3.40, 3.75)).unwrap();
        let form = FormModel::default().probabilities(&form_record(1, &[], 5), &form_record(2, &[], 5));
        let h2h = Probabilities::NEUTRAL;
        let p = combine(&base, &form, &h2h, &Weights::default());
        assert_probs(&p, 0.459000, 0.213978, 0.327022);
    }

    #[test]
    fn test_combine_is_scale_invariant_in_weights() {
        let base = Probabilities::from_weights(0.6, 0.25, 0.15).unwrap();
        let form = Probabilities::from_weights(0.3, 0.1, 0.6).unwrap();
        let h2h = Probabilities::NEUTRAL;
        let unit = combine(&base, &form, &h2h, &Weights::new(0.6, 0.3, 0.1).unwrap());
        let scaled = combine(&base, &form, &h2h, &Weights::new(6.0, 3.0, 1.0).unwrap());
        assert!(scaled.is_valid());
        assert_probs(&scaled, unit.home(), unit.draw(), unit.away());
    }

    #[test]
    fn test_weights_validation() {
        assert!(Weights::new(0.0, 0.0, 0.0).is_err());
        assert!(Weights::new(0.5, -0.1, 0.6).is_err());
        assert!(Weights::new(f64::INFINITY, 0.1, 0.1).is_err());
        assert!(Weights::new(1e308, 1e308, 1e308).is_err());
        let w = Weights::new(0.0, 1.0, 0.0).unwrap();
        assert!((w.form() - 1.0).abs() < EPS);
    }
}
