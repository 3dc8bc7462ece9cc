//! HTTP surface for the document analysis service.
//!
//! A compact Axum router with a handful of endpoints:
//!
//! - `POST /analyze` – Run the full pipeline on a document already on disk and return the
//!   terminal result, including the risk narrative split into severity sections.
//! - `POST /ask` – Answer a question about analyzed documents from retrieved passages.
//! - `GET /history` – List logged runs, most recent first; `?filename=` narrows the
//!   response to the latest run for that document.
//! - `GET /stats` – Aggregate counts and the five most recent runs.
//! - `GET /metrics` – Process counters for observability.
//! - `GET /commands` – Machine-readable command catalog for quick discovery by tools/hosts.

use crate::analysis::{split_risk_sections, Severity};
use crate::history::HistoryError;
use crate::pipeline::AnalysisResult;
use crate::service::AnalysisApi;
use axum::{
    Json, Router,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::path::Path;
use std::sync::Arc;

/// Build the HTTP router exposing the analysis API surface.
pub fn create_router<S>(service: Arc<S>) -> Router
where
    S: AnalysisApi + 'static,
{
    Router::new()
        .route("/analyze", post(analyze_document::<S>))
        .route("/ask", post(ask_question::<S>))
        .route("/history", get(list_history::<S>))
        .route("/stats", get(get_stats::<S>))
        .route("/metrics", get(get_metrics::<S>))
        .route("/commands", get(get_commands))
        .with_state(service)
}

/// Request body for the `POST /analyze` endpoint.
#[derive(Deserialize)]
struct AnalyzeRequest {
    /// Path of the document on the server's filesystem.
    file_path: String,
    /// Optional display name overriding the one derived from the path.
    #[serde(default)]
    display_name: Option<String>,
}

/// One severity-tagged slice of the risk narrative.
#[derive(Serialize)]
struct RiskSection {
    severity: Severity,
    text: String,
}

/// Success response for the `POST /analyze` endpoint.
#[derive(Serialize)]
struct AnalyzeResponse {
    #[serde(flatten)]
    result: AnalysisResult,
    /// Risk narrative split at its severity tags, in document order.
    risk_sections: Vec<RiskSection>,
}

/// Run the full analysis pipeline on one document.
///
/// The handler always answers 200 with the terminal result; pipeline failures are
/// reported through the result's `status` and `error` fields rather than an HTTP error.
async fn analyze_document<S>(
    State(service): State<Arc<S>>,
    Json(request): Json<AnalyzeRequest>,
) -> Json<AnalyzeResponse>
where
    S: AnalysisApi,
{
    let result = service
        .analyze(Path::new(&request.file_path), request.display_name.as_deref())
        .await;
    tracing::info!(
        filename = result.filename,
        status = %result.status,
        risk_score = result.risk_score,
        "Analyze request completed"
    );
    let risk_sections = split_risk_sections(&result.risks)
        .into_iter()
        .map(|(severity, text)| RiskSection { severity, text })
        .collect();
    Json(AnalyzeResponse {
        result,
        risk_sections,
    })
}

/// Request body for the `POST /ask` endpoint.
#[derive(Deserialize)]
struct AskRequest {
    /// The question to answer.
    question: String,
    /// Document the question is about.
    filename: String,
    /// Optional response language (defaults to English).
    #[serde(default)]
    language: Option<String>,
}

/// Response body for `POST /ask`.
#[derive(Serialize)]
struct AskResponse {
    answer: String,
}

/// Answer a question from retrieved document passages.
async fn ask_question<S>(
    State(service): State<Arc<S>>,
    Json(request): Json<AskRequest>,
) -> Json<AskResponse>
where
    S: AnalysisApi,
{
    let answer = service
        .ask(
            &request.question,
            &request.filename,
            request.language.as_deref(),
        )
        .await;
    Json(AskResponse { answer })
}

/// Query parameters for `GET /history`.
#[derive(Deserialize)]
struct HistoryQuery {
    /// When set, return only the latest run for this document.
    #[serde(default)]
    filename: Option<String>,
}

/// Response body for `GET /history`.
#[derive(Serialize)]
struct HistoryResponse {
    analyses: Vec<crate::history::RunRecord>,
}

/// List logged runs, or the latest run for one document.
async fn list_history<S>(
    State(service): State<Arc<S>>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<HistoryResponse>, AppError>
where
    S: AnalysisApi,
{
    let analyses = match query.filename.as_deref() {
        Some(filename) => service.latest(filename).await?.into_iter().collect(),
        None => service.history().await?,
    };
    Ok(Json(HistoryResponse { analyses }))
}

/// Return aggregate run statistics.
async fn get_stats<S>(
    State(service): State<Arc<S>>,
) -> Result<Json<crate::history::HistoryStats>, AppError>
where
    S: AnalysisApi,
{
    Ok(Json(service.stats().await?))
}

/// Return process counters.
async fn get_metrics<S>(State(service): State<Arc<S>>) -> Json<crate::metrics::MetricsSnapshot>
where
    S: AnalysisApi,
{
    Json(service.metrics())
}

/// Descriptor for a single command in the discovery catalog.
#[derive(Serialize)]
struct CommandDescriptor {
    name: &'static str,
    method: &'static str,
    path: &'static str,
    description: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    request_example: Option<serde_json::Value>,
}

/// Response body for `GET /commands`.
#[derive(Serialize)]
struct CommandsResponse {
    commands: Vec<CommandDescriptor>,
}

/// Enumerate supported HTTP commands for discovery/UX in hosts and tools.
async fn get_commands() -> Json<CommandsResponse> {
    Json(CommandsResponse {
        commands: vec![
            CommandDescriptor {
                name: "analyze",
                method: "POST",
                path: "/analyze",
                description: "Run the analysis pipeline on a document: extract text, index it, summarize, extract key information, flag and score risks, and produce a report with suggested questions.",
                request_example: Some(json!({
                    "file_path": "/data/uploads/contract.pdf",
                    "display_name": "contract.pdf"
                })),
            },
            CommandDescriptor {
                name: "ask",
                method: "POST",
                path: "/ask",
                description: "Answer a question about analyzed documents using retrieved passages only.",
                request_example: Some(json!({
                    "question": "What is the notice period?",
                    "filename": "contract.pdf",
                    "language": "English"
                })),
            },
            CommandDescriptor {
                name: "history",
                method: "GET",
                path: "/history",
                description: "List logged analysis runs, most recent first. Pass ?filename= to get the latest run for one document.",
                request_example: None,
            },
            CommandDescriptor {
                name: "stats",
                method: "GET",
                path: "/stats",
                description: "Return aggregate run counts, the mean risk score over completed runs, and the five most recent runs.",
                request_example: None,
            },
            CommandDescriptor {
                name: "metrics",
                method: "GET",
                path: "/metrics",
                description: "Return process counters useful for observability dashboards.",
                request_example: None,
            },
        ],
    })
}

struct AppError(HistoryError);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        (StatusCode::INTERNAL_SERVER_ERROR, self.0.to_string()).into_response()
    }
}

impl From<HistoryError> for AppError {
    fn from(inner: HistoryError) -> Self {
        Self(inner)
    }
}
