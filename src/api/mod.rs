use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::config::clamp_last_n;
use crate::models::{AnalysisMode, ApiResponse, FixtureAnalysis, League, Session, SimulationMode, SimulationReport};
use crate::services::{simulate_session, AnalysisOptions, ProbabilityAggregator, DEFAULT_BANKROLL};

/// Shared by every handler; the session is overwritten by each analysis.
#[derive(Clone)]
pub struct AppState {
    pub aggregator: Arc<ProbabilityAggregator>,
    pub session: Arc<RwLock<Session>>,
    pub defaults: AnalysisOptions,
}

impl AppState {
    pub fn new(aggregator: ProbabilityAggregator, defaults: AnalysisOptions) -> Self {
        Self {
            aggregator: Arc::new(aggregator),
            session: Arc::new(RwLock::new(Session::default())),
            defaults,
        }
    }
}

type ApiResult<T> = Result<Json<ApiResponse<T>>, (StatusCode, Json<ApiResponse<T>>)>;

fn reject<T>(status: StatusCode, message: impl Into<String>) -> (StatusCode, Json<ApiResponse<T>>) {
    (status, Json(ApiResponse::error(message.into())))
}

fn bad_body<T>(rejection: JsonRejection) -> (StatusCode, Json<ApiResponse<T>>) {
    tracing::warn!("Rejected request body: {}", rejection.body_text());
    reject(StatusCode::BAD_REQUEST, rejection.body_text())
}

pub async fn serve(port: u16, state: AppState) -> anyhow::Result<()> {
    let app = create_router().with_state(state);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?;
    tracing::info!("Matchday API server listening on port {}", port);

    axum::serve(listener, app).await?;
    Ok(())
}

fn create_router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health_check))
        .route("/leagues", get(list_leagues_handler))
        .route("/fixtures", get(get_fixtures_handler))
        .route("/fixtures/analyze", post(analyze_fixtures_handler))
        .route("/simulate", post(simulate_handler))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
}

// Health check endpoint
#[derive(Serialize)]
struct HealthStatus {
    status: &'static str,
    provider: &'static str,
}

async fn health_check(State(state): State<AppState>) -> Json<ApiResponse<HealthStatus>> {
    Json(ApiResponse::success(HealthStatus {
        status: "ok",
        provider: state.aggregator.provider_name(),
    }))
}

// GET /leagues - Supported competitions and their provider ids
#[derive(Serialize)]
struct LeagueInfo {
    key: League,
    name: &'static str,
    api_football_id: u32,
    football_data_code: &'static str,
}

async fn list_leagues_handler() -> Json<ApiResponse<Vec<LeagueInfo>>> {
    let leagues = League::ALL
        .into_iter()
        .map(|league| LeagueInfo {
            key: league,
            name: league.name(),
            api_football_id: league.api_football_id(),
            football_data_code: league.football_data_code(),
        })
        .collect();
    Json(ApiResponse::success(leagues))
}

// POST /fixtures/analyze - Fetch and analyze fixtures, replacing the session
#[derive(Deserialize)]
struct AnalyzeRequest {
    #[serde(default)]
    leagues: Vec<League>,
    date: Option<NaiveDate>,
    mode: Option<AnalysisMode>,
    include_h2h: Option<bool>,
    last_n: Option<usize>,
}

async fn analyze_fixtures_handler(
    State(state): State<AppState>,
    payload: Result<Json<AnalyzeRequest>, JsonRejection>,
) -> ApiResult<Vec<FixtureAnalysis>> {
    let Json(request) = payload.map_err(bad_body)?;
    let leagues = if request.leagues.is_empty() {
        vec![League::Brasileirao]
    } else {
        request.leagues
    };
    let date = request.date.unwrap_or_else(|| Utc::now().date_naive());
    let options = AnalysisOptions {
        mode: request.mode.unwrap_or(state.defaults.mode),
        include_h2h: request.include_h2h.unwrap_or(state.defaults.include_h2h),
        last_n: clamp_last_n(request.last_n.unwrap_or(state.defaults.last_n)),
    };

    let analyses = state.aggregator.analyze(&leagues, date, &options).await;
    state.session.write().await.replace(analyses.clone());

    Ok(Json(ApiResponse::success(analyses)))
}

// GET /fixtures - The last analyzed fixture list
async fn get_fixtures_handler(State(state): State<AppState>) -> Json<ApiResponse<Vec<FixtureAnalysis>>> {
    let session = state.session.read().await;
    Json(ApiResponse::success(session.analyses().to_vec()))
}

// POST /simulate - Flat-stake simulation over the session
#[derive(Deserialize)]
struct SimulateRequest {
    stake: f64,
    bankroll: Option<f64>,
    #[serde(default)]
    stochastic: bool,
}

async fn simulate_handler(
    State(state): State<AppState>,
    payload: Result<Json<SimulateRequest>, JsonRejection>,
) -> ApiResult<SimulationReport> {
    let Json(request) = payload.map_err(bad_body)?;
    let fixtures = {
        let session = state.session.read().await;
        if session.is_empty() {
            return Err(reject(StatusCode::CONFLICT, "Search fixtures first"));
        }
        session.fixtures()
    };

    let mode = if request.stochastic {
        SimulationMode::Stochastic
    } else {
        SimulationMode::Expected
    };
    let bankroll = request.bankroll.unwrap_or(DEFAULT_BANKROLL);

    match simulate_session(&fixtures, request.stake, bankroll, mode) {
        Ok(report) => Ok(Json(ApiResponse::success(report))),
        Err(e) => {
            tracing::warn!("Rejected simulation request: {}", e);
            Err(reject(StatusCode::BAD_REQUEST, e.to_string()))
        }
    }
}
