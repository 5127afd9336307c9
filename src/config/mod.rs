use std::env;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

use crate::services::estimators::{FormModel, Weights};

pub const DEFAULT_LAST_N: usize = 5;
pub const MAX_LAST_N: usize = 12;
const DEFAULT_REQUEST_DELAY_MS: u64 = 120;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 12;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("invalid weights ({base}, {form}, {h2h}): must be finite, non-negative and not all zero")]
    InvalidWeights { base: f64, form: f64, h2h: f64 },

    #[error("invalid form draw floor {0}: must be in [0, 1)")]
    InvalidDrawFloor(f64),

    #[error("invalid form draw closeness {0}: must be in [0, 1]")]
    InvalidDrawCloseness(f64),

    #[error("unknown provider '{0}' (expected api-football, football-data, mock or auto)")]
    UnknownProvider(String),

    #[error("invalid value '{value}' for {key}")]
    InvalidValue { key: String, value: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    Auto,
    ApiFootball,
    FootballData,
    Mock,
}

impl FromStr for ProviderKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "auto" => Ok(ProviderKind::Auto),
            "api-football" | "api_football" | "apifootball" => Ok(ProviderKind::ApiFootball),
            "football-data" | "football_data" | "footballdata" => Ok(ProviderKind::FootballData),
            "mock" | "offline" => Ok(ProviderKind::Mock),
            other => Err(ConfigError::UnknownProvider(other.to_string())),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub provider: ProviderKind,
    pub api_football_key: Option<String>,
    pub football_data_key: Option<String>,
    pub season_override: Option<i32>,
    pub request_delay: Duration,
    pub request_timeout: Duration,
    pub weights: Weights,
    pub form_model: FormModel,
    pub last_n: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            provider: ProviderKind::Auto,
            api_football_key: None,
            football_data_key: None,
            season_override: None,
            request_delay: Duration::from_millis(DEFAULT_REQUEST_DELAY_MS),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            weights: Weights::default(),
            form_model: FormModel::default(),
            last_n: DEFAULT_LAST_N,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup so tests don't touch the process env.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let provider = match get("MATCHDAY_PROVIDER") {
            Some(v) => v.parse()?,
            None => ProviderKind::Auto,
        };

        let base = parse_or(&get, "WEIGHT_BASE", defaults.weights.base())?;
        let form = parse_or(&get, "WEIGHT_FORM", defaults.weights.form())?;
        let h2h = parse_or(&get, "WEIGHT_H2H", defaults.weights.h2h())?;
        let weights = Weights::new(base, form, h2h)?;

        let form_model = FormModel::new(
            parse_or(&get, "FORM_DRAW_FLOOR", defaults.form_model.draw_floor())?,
            parse_or(&get, "FORM_DRAW_CLOSENESS", defaults.form_model.draw_closeness())?,
        )?;

        let delay_ms: u64 = parse_or(&get, "REQUEST_DELAY_MS", DEFAULT_REQUEST_DELAY_MS)?;
        let timeout_secs: u64 =
            parse_or(&get, "REQUEST_TIMEOUT_SECS", DEFAULT_REQUEST_TIMEOUT_SECS)?;
        let last_n: usize = parse_or(&get, "LAST_N", DEFAULT_LAST_N)?;
        let season_override = get("API_FOOTBALL_SEASON")
            .map(|v| parse_value::<i32>("API_FOOTBALL_SEASON", &v))
            .transpose()?;

        Ok(Self {
            provider,
            api_football_key: get("API_FOOTBALL_KEY"),
            football_data_key: get("FOOTBALL_DATA_API_KEY"),
            season_override,
            request_delay: Duration::from_millis(delay_ms),
            request_timeout: Duration::from_secs(timeout_secs.max(1)),
            weights,
            form_model,
            last_n: clamp_last_n(last_n),
        })
    }
}

pub fn clamp_last_n(n: usize) -> usize {
    n.clamp(1, MAX_LAST_N)
}

fn parse_or<T, G>(get: &G, key: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(raw) => parse_value(key, &raw),
        None => Ok(default),
    }
}

fn parse_value<T: FromStr>(key: &str, raw: &str) -> Result<T, ConfigError> {
    raw.parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        value: raw.to_string(),
    })
}
