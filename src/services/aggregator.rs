use std::sync::Arc;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::config::{clamp_last_n, AppConfig, DEFAULT_LAST_N};
use crate::models::{
    AnalysisMode, BaseSource, Fixture, FixtureAnalysis, League, Probabilities,
};
use crate::services::estimators::{
    combine, form_record, head_to_head_probabilities, head_to_head_record, odds_implied, FormModel,
    Weights,
};
use crate::services::providers::{DataUnavailable, MatchDataProvider};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisOptions {
    pub mode: AnalysisMode,
    pub include_h2h: bool,
    pub last_n: usize,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            mode: AnalysisMode::Odds,
            include_h2h: true,
            last_n: DEFAULT_LAST_N,
        }
    }
}

/// Fetches the inputs for each fixture and blends the three estimators.
///
/// Provider failures never abort an analysis: the missing input becomes
/// empty data (or the odds prior), a note is attached to the fixture and the
/// remaining fixtures are processed as usual.
pub struct ProbabilityAggregator {
    provider: Arc<dyn MatchDataProvider>,
    weights: Weights,
    form_model: FormModel,
}

impl ProbabilityAggregator {
    pub fn new(provider: Arc<dyn MatchDataProvider>, weights: Weights, form_model: FormModel) -> Self {
        Self {
            provider,
            weights,
            form_model,
        }
    }

    pub fn from_config(provider: Arc<dyn MatchDataProvider>, config: &AppConfig) -> Self {
        Self::new(provider, config.weights, config.form_model)
    }

    pub fn provider_name(&self) -> &'static str {
        self.provider.name()
    }

    /// Analyzes every fixture of `leagues` on `date`, league by league, one fixture at a time.
    pub async fn analyze(
        &self,
        leagues: &[League],
        date: NaiveDate,
        options: &AnalysisOptions,
    ) -> Vec<FixtureAnalysis> {
        let mut analyses = Vec::new();

        for &league in leagues {
            let fixtures = match self.provider.get_fixtures(league, date).await {
                Ok(fixtures) => fixtures,
                Err(e) => {
                    tracing::warn!("Skipping {} on {}: {}", league.name(), date, e);
                    continue;
                }
            };
            tracing::info!("Found {} fixtures for {} on {}", fixtures.len(), league.name(), date);

            for fixture in fixtures {
                analyses.push(self.analyze_fixture(fixture, options).await);
            }
        }

        analyses
    }

    pub async fn analyze_fixture(&self, mut fixture: Fixture, options: &AnalysisOptions) -> FixtureAnalysis {
        let last_n = clamp_last_n(options.last_n);
        let mut notes = Vec::new();

        // Base distribution
        let mut odds = None;
        if options.mode == AnalysisMode::Odds {
            odds = match fixture.odds.take() {
                Some(quoted) => Some(quoted),
                None => degrade(
                    self.provider.get_match_odds(fixture.id).await,
                    "odds",
                    &fixture,
                    &mut notes,
                ),
            };
        }
        let (base, base_source) = match odds.as_ref().map(odds_implied) {
            Some(Ok(p)) => (p, BaseSource::Odds),
            Some(Err(e)) => {
                tracing::warn!("{} vs {}: {}", fixture.home.name, fixture.away.name, e);
                notes.push(e.to_string());
                (Probabilities::ODDS_PRIOR, BaseSource::Prior)
            }
            None => (Probabilities::ODDS_PRIOR, BaseSource::Prior),
        };

        // Recent form
        let home_matches = degrade(
            self.provider.get_recent_matches(fixture.home.id, last_n).await,
            "home form",
            &fixture,
            &mut notes,
        );
        let away_matches = degrade(
            self.provider.get_recent_matches(fixture.away.id, last_n).await,
            "away form",
            &fixture,
            &mut notes,
        );
        let home_form = form_record(fixture.home.id, &home_matches, last_n);
        let away_form = form_record(fixture.away.id, &away_matches, last_n);
        let form = self.form_model.probabilities(&home_form, &away_form);

        // Head-to-head; disabled means the neutral prior still carries its weight
        let meetings = if options.include_h2h {
            degrade(
                self.provider
                    .get_head_to_head(fixture.home.id, fixture.away.id, last_n)
                    .await,
                "head-to-head",
                &fixture,
                &mut notes,
            )
        } else {
            Vec::new()
        };
        let head_to_head = head_to_head_record(fixture.home.id, fixture.away.id, &meetings, last_n);
        let h2h = head_to_head_probabilities(&head_to_head);

        let combined = combine(&base, &form, &h2h, &self.weights);

        tracing::info!(
            "Analyzed {} vs {}: Home {:.1}%, Draw {:.1}%, Away {:.1}% (base from {:?})",
            fixture.home.name,
            fixture.away.name,
            combined.home() * 100.0,
            combined.draw() * 100.0,
            combined.away() * 100.0,
            base_source
        );

        fixture.odds = odds;
        fixture.probabilities = Some(combined);

        FixtureAnalysis {
            fixture,
            base,
            base_source,
            form,
            h2h,
            home_form,
            away_form,
            head_to_head,
            notes,
        }
    }
}

/// Substitutes "no data" for a failed provider call and records why.
fn degrade<T: Default>(
    result: Result<T, DataUnavailable>,
    what: &str,
    fixture: &Fixture,
    notes: &mut Vec<String>,
) -> T {
    match result {
        Ok(value) => value,
        Err(e) => {
            tracing::warn!(
                "{} unavailable for {} vs {}: {}",
                what,
                fixture.home.name,
                fixture.away.name,
                e
            );
            notes.push(format!("{} unavailable: {}", what, e));
            T::default()
        }
    }
}
