use std::{net::SocketAddr, sync::Arc, time::Instant};

use anyhow::Context;
use axum::{
    Json, Router,
    extract::{Query, Request, State, rejection::JsonRejection},
    http::{HeaderValue, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use finops_rag::{RagError, RagPipeline};
use finops_warehouse::{
    DEFAULT_IDLE_THRESHOLD, InvoiceMonth, KpiSnapshot, Warehouse, WarehouseError,
};
use serde_json::json;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{error, info};
use uuid::Uuid;

use crate::protocol::{
    ApiResponse, AskRequest, AskResponse, AskStructuredData, RecommendationQuery,
    RecommendationResponse,
};

pub const REQUEST_ID_HEADER: &str = "x-request-id";
pub const PROCESS_TIME_HEADER: &str = "x-process-time";

#[derive(Clone)]
pub struct AppState {
    pub warehouse: Arc<Warehouse>,
    pub pipeline: Arc<RagPipeline>,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { host: "127.0.0.1".to_string(), port: 8000 }
    }
}

type ApiError = (StatusCode, Json<ApiResponse<()>>);

fn failure(status: StatusCode, message: impl Into<String>) -> ApiError {
    (status, Json(ApiResponse::error(message)))
}

pub fn app_router(state: AppState) -> Router {
    let cors = CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/kpis", get(kpis))
        .route("/ask", post(ask))
        .route("/recommendations", get(recommendations))
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(request_context))
}

pub async fn run_server(config: ServerConfig, state: AppState) -> anyhow::Result<()> {
    let app = app_router(state);
    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .with_context(|| "invalid host/port for finops-server")?;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("finops-server listening on http://{}", addr);
    axum::serve(listener, app).await?;
    Ok(())
}

/// Tag every response with a request id and its processing time.
async fn request_context(request: Request, next: Next) -> Response {
    let request_id = Uuid::new_v4().to_string();
    let method = request.method().clone();
    let uri = request.uri().clone();
    let started = Instant::now();
    info!(%request_id, %method, %uri, "request started");

    let mut response = next.run(request).await;

    let elapsed = started.elapsed().as_secs_f64();
    let headers = response.headers_mut();
    if let Ok(value) = HeaderValue::from_str(&request_id) {
        headers.insert(REQUEST_ID_HEADER, value);
    }
    if let Ok(value) = HeaderValue::from_str(&format!("{elapsed:.6}")) {
        headers.insert(PROCESS_TIME_HEADER, value);
    }
    info!(
        %request_id,
        %method,
        %uri,
        status = response.status().as_u16(),
        elapsed_secs = elapsed,
        "request finished"
    );
    response
}

async fn health() -> impl IntoResponse {
    Json(json!({"status":"ok","service":"finops-server"}))
}

/// Run a blocking warehouse call off the async runtime.
async fn with_warehouse<T, F>(state: &AppState, call: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce(&Warehouse) -> Result<T, WarehouseError> + Send + 'static,
{
    let warehouse = state.warehouse.clone();
    match tokio::task::spawn_blocking(move || call(warehouse.as_ref())).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => {
            error!(error = %e, "warehouse query failed");
            Err(failure(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
        }
        Err(e) => {
            error!(error = %e, "warehouse task failed");
            Err(failure(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
        }
    }
}

async fn kpis(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<KpiSnapshot>>, ApiError> {
    let snapshot = with_warehouse(&state, Warehouse::kpi_snapshot).await?;
    snapshot
        .map(|snapshot| Json(ApiResponse::success(snapshot)))
        .ok_or_else(|| failure(StatusCode::NOT_FOUND, "No data available"))
}

async fn ask(
    State(state): State<AppState>,
    payload: Result<Json<AskRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<AskResponse>>, ApiError> {
    let Json(request) =
        payload.map_err(|e| failure(StatusCode::UNPROCESSABLE_ENTITY, e.body_text()))?;

    if request.question.trim().is_empty() {
        return Err(failure(StatusCode::BAD_REQUEST, "Question cannot be empty"));
    }

    let answer = state.pipeline.ask(&request.question).await.map_err(|e| match e {
        RagError::EmptyQuestion => failure(StatusCode::BAD_REQUEST, e.to_string()),
        other => {
            error!(error = %other, "question answering failed");
            failure(StatusCode::INTERNAL_SERVER_ERROR, other.to_string())
        }
    })?;

    info!(
        kind = ?answer.kind,
        month = ?request.month,
        source_count = answer.sources.len(),
        "answered question"
    );
    Ok(Json(ApiResponse::success(AskResponse {
        structured_data: Some(AskStructuredData { documents_retrieved: answer.sources.len() }),
        answer: answer.text,
        sources: answer.sources,
        data_type: "rag".to_string(),
    })))
}

async fn recommendations(
    State(state): State<AppState>,
    Query(query): Query<RecommendationQuery>,
) -> Result<Json<ApiResponse<RecommendationResponse>>, ApiError> {
    let raw = query
        .month
        .ok_or_else(|| failure(StatusCode::UNPROCESSABLE_ENTITY, "month is required"))?;
    let month: InvoiceMonth = raw
        .parse()
        .map_err(|e: WarehouseError| failure(StatusCode::UNPROCESSABLE_ENTITY, e.to_string()))?;

    let details = with_warehouse(&state, move |warehouse| {
        warehouse.find_idle_resources(DEFAULT_IDLE_THRESHOLD, Some(&month))
    })
    .await?;

    Ok(Json(ApiResponse::success(RecommendationResponse {
        recommendation_type: "Idle Resources".to_string(),
        details,
    })))
}
