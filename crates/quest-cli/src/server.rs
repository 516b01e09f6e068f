//! HTTP API over the recommender.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::Json;
use axum::routing::get;
use axum::{Router, serve};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use quest_core::{
    Date, PreferenceReport, Quest, RecommendError, RecommendationPath, Recommender, ScoredQuest,
    SufficiencyReport,
};
use quest_store::Store;

#[derive(Clone)]
pub struct AppState {
    store: Arc<Mutex<Store>>,
    recommender: Arc<Recommender>,
}

impl AppState {
    pub fn new(store: Store, recommender: Recommender) -> Self {
        Self {
            store: Arc::new(Mutex::new(store)),
            recommender: Arc::new(recommender),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct UserQuery {
    pub user_id: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub detail: String,
}

type ApiError = (StatusCode, Json<ErrorBody>);

fn api_error(e: RecommendError) -> ApiError {
    let status = match e {
        RecommendError::NotFound(_) | RecommendError::NoSurvey(_) => StatusCode::NOT_FOUND,
        RecommendError::DataAccess(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(ErrorBody { detail: e.to_string() }))
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
}

#[derive(Debug, Serialize)]
pub struct QuestsResponse {
    pub user_id: String,
    pub path: RecommendationPath,
    pub quests: Vec<Quest>,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct GateResponse {
    #[serde(flatten)]
    pub report: SufficiencyReport,
    pub requirements: String,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/recommendations/quests", get(recommend_quests))
        .route("/recommendations/quests/detailed", get(recommend_detailed))
        .route("/recommendations/user/preferences", get(user_preferences))
        .route("/recommendations/gate", get(gate))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind and serve until ctrl-c.
pub async fn run(state: AppState, bind: &str) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(bind).await?;
    tracing::info!("listening on {}", listener.local_addr()?);
    serve(listener, router(state))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("shutdown signal received");
        })
        .await?;
    Ok(())
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        service: "recommendation",
    })
}

async fn recommend_quests(
    State(state): State<AppState>,
    Query(query): Query<UserQuery>,
) -> Result<Json<QuestsResponse>, ApiError> {
    let store = state.store.lock().await;
    let rec = state
        .recommender
        .recommend_detailed(&*store, &query.user_id, Date::today())
        .map_err(api_error)?;
    let quests: Vec<Quest> = rec.quests.into_iter().map(|s| s.quest).collect();
    Ok(Json(QuestsResponse {
        message: format!("recommended {} quests for user {}", quests.len(), rec.user_id),
        user_id: rec.user_id,
        path: rec.path,
        quests,
    }))
}

async fn recommend_detailed(
    State(state): State<AppState>,
    Query(query): Query<UserQuery>,
) -> Result<Json<Vec<ScoredQuest>>, ApiError> {
    let store = state.store.lock().await;
    let rec = state
        .recommender
        .recommend_detailed(&*store, &query.user_id, Date::today())
        .map_err(api_error)?;
    Ok(Json(rec.quests))
}

async fn user_preferences(
    State(state): State<AppState>,
    Query(query): Query<UserQuery>,
) -> Result<Json<PreferenceReport>, ApiError> {
    let store = state.store.lock().await;
    let report = state
        .recommender
        .user_preferences(&*store, &query.user_id, Date::today())
        .map_err(api_error)?;
    Ok(Json(report))
}

async fn gate(State(state): State<AppState>) -> Result<Json<GateResponse>, ApiError> {
    let store = state.store.lock().await;
    let report = state
        .recommender
        .data_sufficiency(&*store)
        .map_err(api_error)?;
    Ok(Json(GateResponse {
        requirements: report.requirements_label(),
        report,
    }))
}
