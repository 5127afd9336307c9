//! Sports-data providers.
//!
//! Every feed disagrees on field names and nesting, so each one lives in its
//! own adapter and is flattened into the crate's models before it reaches the
//! estimators. "No data" is an empty list or `None`; anything that went wrong
//! on the way is a [`DataUnavailable`] the caller decides how to degrade.

pub mod api_football;
pub mod football_data;
pub mod mock;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use reqwest::Client;
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::config::{AppConfig, ProviderKind};
use crate::models::{Fixture, FixtureId, League, MatchResult, OddsTriple, TeamId};

pub use api_football::ApiFootballProvider;
pub use football_data::FootballDataProvider;
pub use mock::MockProvider;

#[derive(Debug, Error)]
pub enum DataUnavailable {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("provider reported an error: {0}")]
    Api(String),

    #[error("unexpected response shape: {0}")]
    Schema(#[from] serde_json::Error),

    #[error("provider not configured: {0}")]
    NotConfigured(String),
}

#[async_trait]
pub trait MatchDataProvider: Send + Sync {
    fn name(&self) -> &'static str;

    async fn get_fixtures(
        &self,
        league: League,
        date: NaiveDate,
    ) -> Result<Vec<Fixture>, DataUnavailable>;

    /// Most recent finished matches of a team, newest first where the feed allows.
    async fn get_recent_matches(
        &self,
        team_id: TeamId,
        count: usize,
    ) -> Result<Vec<MatchResult>, DataUnavailable>;

    async fn get_head_to_head(
        &self,
        team_a: TeamId,
        team_b: TeamId,
        count: usize,
    ) -> Result<Vec<MatchResult>, DataUnavailable>;

    async fn get_match_odds(
        &self,
        fixture_id: FixtureId,
    ) -> Result<Option<OddsTriple>, DataUnavailable>;
}

/// Picks the adapter named by the configuration. `Auto` prefers api-football,
/// then football-data, and falls back to offline mock data.
pub fn build_provider(config: &AppConfig) -> Result<Arc<dyn MatchDataProvider>> {
    let provider: Arc<dyn MatchDataProvider> = match config.provider {
        ProviderKind::ApiFootball => {
            let key = config
                .api_football_key
                .clone()
                .ok_or_else(|| DataUnavailable::NotConfigured("API_FOOTBALL_KEY not set".into()))?;
            Arc::new(ApiFootballProvider::new(key, config)?)
        }
        ProviderKind::FootballData => {
            let key = config
                .football_data_key
                .clone()
                .ok_or_else(|| DataUnavailable::NotConfigured("FOOTBALL_DATA_API_KEY not set".into()))?;
            Arc::new(FootballDataProvider::new(key, config)?)
        }
        ProviderKind::Mock => Arc::new(MockProvider::new()),
        ProviderKind::Auto => {
            if let Some(key) = config.api_football_key.clone() {
                Arc::new(ApiFootballProvider::new(key, config)?)
            } else if let Some(key) = config.football_data_key.clone() {
                Arc::new(FootballDataProvider::new(key, config)?)
            } else {
                tracing::warn!(
                    "No API key configured (API_FOOTBALL_KEY / FOOTBALL_DATA_API_KEY), using offline mock data"
                );
                Arc::new(MockProvider::new())
            }
        }
    };

    tracing::info!("Using data provider: {}", provider.name());
    Ok(provider)
}

// ── Shared HTTP plumbing ─────────────────────────────────────────────────────

const MAX_ERROR_BODY: usize = 300;

/// Authenticated GET-and-decode client shared by the HTTP adapters.
///
/// Sleeps `delay` after every call, successful or not, to stay under the
/// providers' free-tier rate limits. No retries.
pub(crate) struct JsonClient {
    client: Client,
    base_url: String,
    auth_header: &'static str,
    api_key: String,
    delay: Duration,
}

impl JsonClient {
    pub(crate) fn new(
        base_url: &str,
        auth_header: &'static str,
        api_key: String,
        config: &AppConfig,
    ) -> Result<Self, DataUnavailable> {
        let client = Client::builder().timeout(config.request_timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            auth_header,
            api_key,
            delay: config.request_delay,
        })
    }

    pub(crate) async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, DataUnavailable> {
        let result = self.fetch(path, query).await;
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        result
    }

    async fn fetch<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, DataUnavailable> {
        let url = format!("{}{}", self.base_url, path);
        tracing::debug!("GET {} {:?}", url, query);

        let response = self
            .client
            .get(&url)
            .header(self.auth_header, self.api_key.as_str())
            .query(query)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DataUnavailable::Status {
                status: status.as_u16(),
                body: truncate(&body, MAX_ERROR_BODY),
            });
        }

        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}…", &text[..idx]),
        None => text.to_string(),
    }
}

pub(crate) fn parse_kickoff(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw.trim())
        .map(|d| d.with_timezone(&Utc))
        .ok()
}

pub(crate) fn kickoff_label(kickoff: Option<DateTime<Utc>>) -> Option<String> {
    kickoff.map(|k| k.format("%H:%M").to_string())
}

/// Newest first, capped at `count`. Undated matches go last.
pub(crate) fn newest_first(mut matches: Vec<MatchResult>, count: usize) -> Vec<MatchResult> {
    matches.sort_by(|a, b| b.kickoff.cmp(&a.kickoff));
    matches.truncate(count);
    matches
}
