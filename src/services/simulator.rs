//! Flat-stake betting simulation over an analyzed fixture list.

use thiserror::Error;

use crate::models::{Fixture, SimulatedBet, SimulationMode, SimulationReport};
use crate::utils::probability_to_odds;

pub const DEFAULT_BANKROLL: f64 = 100.0;

#[derive(Debug, Error, PartialEq)]
pub enum SimulationError {
    #[error("invalid stake {0}: must be a positive number")]
    InvalidStake(f64),

    #[error("invalid bankroll {0}: must be zero or a positive number")]
    InvalidBankroll(f64),
}

/// Expected profit of backing a side with probability `p`.
///
/// With a quoted price this is the usual `stake * (p * odd - 1)`. Without one
/// it falls back to `stake * (p - 0.5)`, a proxy that only ranks picks.
pub fn expected_profit(stake: f64, probability: f64, odd: Option<f64>) -> f64 {
    match odd {
        Some(odd) => stake * (probability * odd - 1.0),
        None => stake * (probability - 0.5),
    }
}

/// Simulates one bet per fixture; the stochastic mode draws from `rand`.
pub fn simulate_session(
    fixtures: &[Fixture],
    stake: f64,
    bankroll: f64,
    mode: SimulationMode,
) -> Result<SimulationReport, SimulationError> {
    simulate_session_with(fixtures, stake, bankroll, mode, rand::random::<f64>)
}

/// Same as [`simulate_session`] with an injected uniform `[0, 1)` source.
pub fn simulate_session_with<F>(
    fixtures: &[Fixture],
    stake: f64,
    bankroll: f64,
    mode: SimulationMode,
    mut uniform: F,
) -> Result<SimulationReport, SimulationError>
where
    F: FnMut() -> f64,
{
    if !stake.is_finite() || stake <= 0.0 {
        return Err(SimulationError::InvalidStake(stake));
    }
    if !bankroll.is_finite() || bankroll < 0.0 {
        return Err(SimulationError::InvalidBankroll(bankroll));
    }

    let mut bets = Vec::new();
    let mut skipped = 0;

    for fixture in fixtures {
        let Some(probabilities) = fixture.probabilities else {
            skipped += 1;
            continue;
        };

        let pick = probabilities.most_likely();
        let p = probabilities.get(pick);
        let quoted = fixture.odds.as_ref().and_then(|o| o.quoted(pick));

        let (odd, won, profit) = match mode {
            SimulationMode::Expected => (quoted, None, expected_profit(stake, p, quoted)),
            SimulationMode::Stochastic => {
                let odd = quoted.unwrap_or_else(|| probability_to_odds(p));
                let won = uniform() < p;
                let profit = if won { stake * (odd - 1.0) } else { -stake };
                (Some(odd), Some(won), profit)
            }
        };

        bets.push(SimulatedBet {
            fixture_id: fixture.id,
            home_team: fixture.home.name.clone(),
            away_team: fixture.away.name.clone(),
            pick,
            probability: p,
            odd,
            odd_quoted: quoted.is_some(),
            won,
            profit,
        });
    }

    let total_staked = stake * bets.len() as f64;
    let total_profit: f64 = bets.iter().map(|b| b.profit).sum();
    let return_on_stake = if total_staked > 0.0 {
        total_profit / total_staked
    } else {
        0.0
    };

    tracing::info!(
        "Simulated {} bets ({:?}), {} skipped: profit {:.2} on {:.2} staked",
        bets.len(),
        mode,
        skipped,
        total_profit,
        total_staked
    );

    Ok(SimulationReport {
        mode,
        stake,
        bets,
        skipped,
        total_staked,
        total_profit,
        return_on_stake,
        starting_bankroll: bankroll,
        final_bankroll: bankroll + total_profit,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{League, OddsTriple, Outcome, Probabilities, TeamRef};
    use chrono::NaiveDate;

    const EPS: f64 = 1e-9;

    fn fixture(id: u64, probs: Option<(f64, f64, f64)>, odds: Option<(f64, f64, f64)>) -> Fixture {
        Fixture {
            id,
            league: League::Brasileirao,
            league_name: "Brasileirão Série A".into(),
            date: NaiveDate::from_ymd_opt(2024, 5, 4).unwrap(),
            kickoff: None,
            home: TeamRef { id: 1, name: "Flamengo".into() },
            away: TeamRef { id: 2, name: "Palmeiras".into() },
            odds: odds.map(|(h, d, a)| OddsTriple::new(h, d, a)),
            probabilities: probs.and_then(|(h, d, a)| Probabilities::from_weights(h, d, a)),
        }
    }

    #[test]
    fn test_expected_value_with_quoted_odd() {
        let fixtures = [fixture(1, Some((0.6, 0.25, 0.15)), Some((1.8, 3.5, 5.0)))];
        let report = simulate_session(&fixtures, 10.0, 100.0, SimulationMode::Expected).unwrap();
        let bet = &report.bets[0];
        assert_eq!(bet.pick, Outcome::Home);
        assert!(bet.odd_quoted);
        assert_eq!(bet.won, None);
        assert!((bet.profit - 0.8).abs() < EPS);
        assert!((report.final_bankroll - 100.8).abs() < EPS);
        assert!((report.return_on_stake - 0.08).abs() < EPS);
    }

    #[test]
    fn test_expected_value_proxy_without_odds() {
        let fixtures = [fixture(1, Some((0.2, 0.3, 0.5)), None)];
        let report = simulate_session(&fixtures, 10.0, 0.0, SimulationMode::Expected).unwrap();
        let bet = &report.bets[0];
        assert_eq!(bet.pick, Outcome::Away);
        assert_eq!(bet.odd, None);
        assert!(!bet.odd_quoted);
        assert!(bet.profit.abs() < EPS);
    }

    #[test]
    fn test_tie_break_prefers_home() {
        let fixtures = [fixture(1, Some((0.4, 0.4, 0.2)), None)];
        let report = simulate_session(&fixtures, 1.0, 0.0, SimulationMode::Expected).unwrap();
        assert_eq!(report.bets[0].pick, Outcome::Home);
    }

    #[test]
    fn test_stochastic_win_and_loss() {
        let fixtures = [
            fixture(1, Some((0.6, 0.25, 0.15)), Some((1.8, 3.5, 5.0))),
            fixture(2, Some((0.5, 0.3, 0.2)), None),
        ];
        let mut draws = [0.1, 0.9].into_iter();
        let report = simulate_session_with(&fixtures, 10.0, 50.0, SimulationMode::Stochastic, || {
            draws.next().unwrap_or(0.0)
        })
        .unwrap();

        assert_eq!(report.bets[0].won, Some(true));
        assert!((report.bets[0].profit - 8.0).abs() < EPS);

        assert_eq!(report.bets[1].won, Some(false));
        assert_eq!(report.bets[1].odd, Some(2.0));
        assert!(!report.bets[1].odd_quoted);
        assert!((report.bets[1].profit + 10.0).abs() < EPS);

        assert!((report.total_profit + 2.0).abs() < EPS);
        assert!((report.final_bankroll - 48.0).abs() < EPS);
    }

    #[test]
    fn test_fixtures_without_distribution_are_skipped() {
        let fixtures = [fixture(1, None, None), fixture(2, Some((0.5, 0.3, 0.2)), None)];
        let report = simulate_session(&fixtures, 5.0, 100.0, SimulationMode::Expected).unwrap();
        assert_eq!(report.skipped, 1);
        assert_eq!(report.bets.len(), 1);
        assert!((report.total_staked - 5.0).abs() < EPS);
    }

    #[test]
    fn test_empty_session_has_zero_return() {
        let report = simulate_session(&[], 5.0, 100.0, SimulationMode::Expected).unwrap();
        assert_eq!(report.return_on_stake, 0.0);
        assert_eq!(report.final_bankroll, 100.0);
    }

    #[test]
    fn test_rejects_bad_stake_and_bankroll() {
        let fixtures = [fixture(1, Some((0.5, 0.3, 0.2)), None)];
        for stake in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            assert!(matches!(
                simulate_session(&fixtures, stake, 100.0, SimulationMode::Expected),
                Err(SimulationError::InvalidStake(_))
            ));
        }
        assert_eq!(
            simulate_session(&fixtures, 1.0, -5.0, SimulationMode::Expected),
            Err(SimulationError::InvalidBankroll(-5.0))
        );
    }
}
