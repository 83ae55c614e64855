use anyhow::{Context, Result};
use axum::{
    extract::{Json, Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
    Router,
};
use base64::Engine as _;
use chrono::Local;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::dashboard::{resolve_range, summarize, Action, AppState, DashboardSummary, SharedState};
use crate::emissions::{aggregate, compute_record_emissions, EmissionError, EmissionFactors, OperationalRecord};
use crate::insights::{
    analyze_emission_patterns, generate_recommendations, Assistant, ChatMessage, DiagnosticAnalyzer,
    DiagnosticKind, EmissionAnalysis, InsightError, InsightKind, InsightSettings, LLMProvider, RateLimiter,
    Recommendations, UnconfiguredDiagnostics, ASSISTANT_NAME,
};
use crate::report::{Report, ReportError};
use crate::store::{DiagnosticNotes, NewRecord, RecordStore, StoreError};

// --- Error Handling ---

#[derive(Debug, Error)]
#[error("record '{0}' not found")]
struct NotFound(String);

struct ServerError(anyhow::Error);

impl ServerError {
    fn status(&self) -> StatusCode {
        let err = &self.0;
        if err.downcast_ref::<NotFound>().is_some() {
            return StatusCode::NOT_FOUND;
        }
        if err.downcast_ref::<EmissionError>().is_some() {
            return StatusCode::BAD_REQUEST;
        }
        if let Some(e) = err.downcast_ref::<StoreError>() {
            return match e {
                StoreError::Invalid(_) => StatusCode::BAD_REQUEST,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            };
        }
        if let Some(e) = err.downcast_ref::<InsightError>() {
            return match e {
                InsightError::NoData | InsightError::Emission(_) => StatusCode::BAD_REQUEST,
                InsightError::AnalysisRequired => StatusCode::CONFLICT,
                InsightError::RateLimited(_) => StatusCode::TOO_MANY_REQUESTS,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            };
        }
        if let Some(e) = err.downcast_ref::<ReportError>() {
            return match e {
                ReportError::Incomplete(_) => StatusCode::CONFLICT,
                ReportError::Emission(_) => StatusCode::BAD_REQUEST,
            };
        }
        StatusCode::INTERNAL_SERVER_ERROR
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            warn!("Request failed: {:#}", self.0);
        }
        (status, Json(serde_json::json!({ "error": self.0.to_string() }))).into_response()
    }
}

impl<E> From<E> for ServerError where E: Into<anyhow::Error> {
    fn from(err: E) -> Self { Self(err.into()) }
}

// --- Shared State ---

#[derive(Clone)]
pub struct ServerState {
    pub store: Arc<dyn RecordStore>,
    pub dashboard: Arc<SharedState>,
    pub provider: Arc<dyn LLMProvider>,
    pub assistant: Arc<Assistant>,
    pub settings: InsightSettings,
    pub factors: EmissionFactors,
    pub rate_limiter: Arc<Mutex<RateLimiter>>,
    pub diagnostics: Arc<dyn DiagnosticAnalyzer>,
}

impl ServerState {
    pub fn new(
        store: Arc<dyn RecordStore>,
        dashboard: Arc<SharedState>,
        provider: Arc<dyn LLMProvider>,
        settings: InsightSettings,
        factors: EmissionFactors,
    ) -> Self {
        let assistant = Arc::new(Assistant::new(provider.clone(), settings.model.clone(), factors));
        Self {
            store,
            dashboard,
            provider,
            assistant,
            settings,
            factors,
            rate_limiter: Arc::new(Mutex::new(RateLimiter::new())),
            diagnostics: Arc::new(UnconfiguredDiagnostics),
        }
    }

    pub fn with_diagnostics(mut self, analyzer: Arc<dyn DiagnosticAnalyzer>) -> Self {
        self.diagnostics = analyzer;
        self
    }

    async fn consume(&self, kind: InsightKind) -> Result<(), InsightError> {
        if self.rate_limiter.lock().await.check(kind) {
            Ok(())
        } else {
            warn!("Rate limit hit for {}", kind);
            Err(InsightError::RateLimited(kind))
        }
    }
}

// --- Payloads ---

#[derive(Debug, Default, Deserialize)]
pub struct DashboardQuery {
    pub from: Option<String>,
    pub to: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AssistantRequest {
    #[serde(default)]
    pub messages: Vec<ChatMessage>,
}

#[derive(Debug, Serialize)]
pub struct AssistantReply {
    pub name: &'static str,
    pub message: ChatMessage,
}

#[derive(Debug, Deserialize)]
pub struct DiagnosticRequest {
    pub kind: DiagnosticKind,
    pub file_name: String,
    /// File bytes, base64 encoded
    #[serde(default)]
    pub content_base64: String,
}

#[derive(Debug, Serialize)]
pub struct DiagnosticReply {
    pub kind: DiagnosticKind,
    pub description: String,
}

// --- Router ---

pub fn router(state: ServerState) -> Router {
    Router::new()
        .route("/health", get(|| async { "OK" }))
        .route("/api/records", get(list_records).post(create_record))
        .route("/api/records/{id}", delete(delete_record))
        .route("/api/records/{id}/diagnostics", put(update_diagnostics))
        .route("/api/dashboard", get(dashboard_handler))
        .route("/api/analysis", post(analysis_handler))
        .route("/api/recommendations", post(recommendations_handler))
        .route("/api/assistant", post(assistant_handler))
        .route("/api/report", get(report_handler))
        .route("/api/state", get(state_handler))
        .route("/api/diagnostics", post(diagnostics_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn run_server(state: ServerState, addr: &str) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("EcoVision API listening at http://{}", addr);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutdown signal received");
        })
        .await?;
    Ok(())
}

// --- Records ---

async fn list_records(State(state): State<ServerState>) -> Json<Vec<OperationalRecord>> {
    let mut records = state.store.snapshot().await.to_vec();
    records.sort_by(|a, b| b.cmp_by_date(a));
    Json(records)
}

async fn create_record(
    State(state): State<ServerState>,
    Json(entry): Json<NewRecord>,
) -> Result<(StatusCode, Json<OperationalRecord>), ServerError> {
    // Refuse entries whose emissions cannot be represented before persisting them
    let preview = entry.clone().validated()?.into_record(String::new());
    compute_record_emissions(&preview, &state.factors)?;

    let record = state.store.add(entry).await?;
    Ok((StatusCode::CREATED, Json(record)))
}

async fn delete_record(
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ServerError> {
    if state.store.delete(&id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(NotFound(id).into())
    }
}

async fn update_diagnostics(
    State(state): State<ServerState>,
    Path(id): Path<String>,
    Json(notes): Json<DiagnosticNotes>,
) -> Result<Json<OperationalRecord>, ServerError> {
    match state.store.annotate(&id, notes).await? {
        Some(record) => Ok(Json(record)),
        None => Err(NotFound(id).into()),
    }
}

// --- Dashboard ---

async fn dashboard_handler(
    State(state): State<ServerState>,
    Query(query): Query<DashboardQuery>,
) -> Result<Json<DashboardSummary>, ServerError> {
    let range = resolve_range(query.from.as_deref(), query.to.as_deref(), Local::now().date_naive())?;
    let records = state.store.snapshot().await;
    let summary = summarize(&records, range, &state.factors)?;
    Ok(Json(summary.rounded()))
}

async fn state_handler(State(state): State<ServerState>) -> Json<AppState> {
    Json(state.dashboard.current().await)
}

// --- Insights ---

async fn analysis_handler(State(state): State<ServerState>) -> Result<Json<EmissionAnalysis>, ServerError> {
    state.consume(InsightKind::Analysis).await?;

    state.dashboard.dispatch(Action::SetError(None)).await;
    state.dashboard.dispatch(Action::SetAnalysisLoading(true)).await;

    let records = state.store.snapshot().await;
    match analyze_emission_patterns(state.provider.as_ref(), &state.settings, &records, &state.factors).await {
        Ok(analysis) => {
            state.dashboard.dispatch(Action::SetAnalysisResult(Some(analysis.clone()))).await;
            Ok(Json(analysis))
        }
        Err(e) => {
            state.dashboard.dispatch(Action::SetError(Some(e.to_string()))).await;
            Err(e.into())
        }
    }
}

async fn recommendations_handler(State(state): State<ServerState>) -> Result<Json<Recommendations>, ServerError> {
    let analysis = state.dashboard.read().await.analysis.clone();
    if analysis.is_none() {
        return Err(InsightError::AnalysisRequired.into());
    }
    state.consume(InsightKind::Recommendations).await?;

    state.dashboard.dispatch(Action::SetError(None)).await;
    state.dashboard.dispatch(Action::SetRecommendationsLoading(true)).await;

    let result: Result<Recommendations, InsightError> = async {
        let records = state.store.snapshot().await;
        let summary = aggregate(records.iter(), &state.factors)?;
        generate_recommendations(state.provider.as_ref(), &state.settings, analysis.as_ref(), &summary).await
    }
    .await;

    match result {
        Ok(recommendations) => {
            state
                .dashboard
                .dispatch(Action::SetRecommendationsResult(Some(recommendations.clone())))
                .await;
            Ok(Json(recommendations))
        }
        Err(e) => {
            state.dashboard.dispatch(Action::SetError(Some(e.to_string()))).await;
            Err(e.into())
        }
    }
}

async fn assistant_handler(
    State(state): State<ServerState>,
    Json(request): Json<AssistantRequest>,
) -> Result<Json<AssistantReply>, ServerError> {
    state.consume(InsightKind::Assistant).await?;

    let records = state.store.snapshot().await;
    let content = state.assistant.respond(&request.messages, &records).await;
    Ok(Json(AssistantReply {
        name: ASSISTANT_NAME,
        message: ChatMessage::assistant(content),
    }))
}

async fn diagnostics_handler(
    State(state): State<ServerState>,
    Json(request): Json<DiagnosticRequest>,
) -> Result<Json<DiagnosticReply>, ServerError> {
    let content = base64::engine::general_purpose::STANDARD
        .decode(request.content_base64.trim())
        .map_err(|e| StoreError::Invalid(format!("content is not valid base64: {}", e)))?;

    let description = state
        .diagnostics
        .describe(request.kind, &request.file_name, &content)
        .await?;
    Ok(Json(DiagnosticReply { kind: request.kind, description }))
}

// --- Report ---

async fn report_handler(State(state): State<ServerState>) -> Result<Response, ServerError> {
    let records = state.store.snapshot().await;
    let report = {
        let app = state.dashboard.read().await;
        Report::build(
            &records,
            app.analysis.as_ref(),
            app.recommendations.as_ref(),
            &state.factors,
            Local::now().date_naive(),
        )?
    };

    let headers = [
        (header::CONTENT_TYPE, "text/markdown; charset=utf-8".to_string()),
        (header::CONTENT_DISPOSITION, format!("attachment; filename=\"{}\"", report.file_name())),
    ];
    Ok((headers, report.render_markdown()).into_response())
}
