//! Service facade tying the pipeline, Q&A responder, history log, and metrics together.
//!
//! The HTTP layer talks to [`AnalysisApi`] rather than the concrete service so handler
//! tests can run against a stub without a vector index or a database.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::analysis::{Analyst, DEFAULT_LANGUAGE};
use crate::config::{get_config, DEFAULT_HISTORY_DB_PATH};
use crate::extract::PdfExtractor;
use crate::generation::{get_generation_client, GenerationClient};
use crate::history::{HistoryError, HistoryStats, HistoryStore, RunRecord};
use crate::metrics::{MetricsSnapshot, RunMetrics};
use crate::pipeline::{AnalysisResult, Pipeline, PipelineStatus};
use crate::qa::QaResponder;
use crate::store::{DocumentStore, StoreError};

/// Errors raised while assembling the service.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The document store could not be initialized.
    #[error("Document store initialization failed: {0}")]
    Store(#[from] StoreError),
    /// The history database could not be opened.
    #[error("History store initialization failed: {0}")]
    History(#[from] HistoryError),
}

/// Operations the HTTP surface needs.
#[async_trait]
pub trait AnalysisApi: Send + Sync {
    /// Run the full analysis pipeline on the document at `path`.
    async fn analyze(&self, path: &Path, display_name: Option<&str>) -> AnalysisResult;
    /// Answer a question about an analyzed document.
    async fn ask(&self, question: &str, filename: &str, language: Option<&str>) -> String;
    /// All logged runs, most recent first.
    async fn history(&self) -> Result<Vec<RunRecord>, HistoryError>;
    /// The most recent logged run for a filename.
    async fn latest(&self, filename: &str) -> Result<Option<RunRecord>, HistoryError>;
    /// Aggregate run statistics.
    async fn stats(&self) -> Result<HistoryStats, HistoryError>;
    /// Current process counters.
    fn metrics(&self) -> MetricsSnapshot;
}

/// Concrete service wiring the real capabilities together.
pub struct AnalysisService {
    pipeline: Pipeline,
    qa: QaResponder,
    history: HistoryStore,
    metrics: RunMetrics,
}

impl AnalysisService {
    /// Assemble the service from pre-built parts.
    pub fn new(pipeline: Pipeline, qa: QaResponder, history: HistoryStore) -> Self {
        Self {
            pipeline,
            qa,
            history,
            metrics: RunMetrics::new(),
        }
    }

    /// Build the service from the global configuration.
    pub async fn from_config() -> Result<Self, ServiceError> {
        let config = get_config();

        let store = Arc::new(DocumentStore::from_config().await?);
        let oracle: Arc<dyn GenerationClient + Send + Sync> = Arc::from(get_generation_client());
        let analyst = Arc::new(Analyst::new(oracle));

        let pipeline = Pipeline::new(
            Box::new(PdfExtractor::new()),
            store.clone(),
            analyst.clone(),
        );
        let qa = QaResponder::new(store, analyst, config.qa_scope_to_document);

        let db_path = config
            .history_db_path
            .as_deref()
            .unwrap_or(DEFAULT_HISTORY_DB_PATH);
        let history = HistoryStore::connect(Path::new(db_path)).await?;

        Ok(Self::new(pipeline, qa, history))
    }
}

#[async_trait]
impl AnalysisApi for AnalysisService {
    async fn analyze(&self, path: &Path, display_name: Option<&str>) -> AnalysisResult {
        let filename = display_name
            .map(str::to_string)
            .or_else(|| {
                path.file_name()
                    .map(|name| name.to_string_lossy().into_owned())
            })
            .unwrap_or_else(|| path.display().to_string());

        let result = self.pipeline.run(path, &filename).await;

        match result.status {
            PipelineStatus::Failed => self.metrics.record_failed_run(),
            _ => self.metrics.record_completed_run(),
        }
        if let Err(error) = self.history.log(&result).await {
            tracing::warn!(filename, error = %error, "Failed to log run to history");
        }
        result
    }

    async fn ask(&self, question: &str, filename: &str, language: Option<&str>) -> String {
        let language = language.unwrap_or(DEFAULT_LANGUAGE);
        let answer = self.qa.answer(question, filename, language).await;
        self.metrics.record_answered_question();
        answer
    }

    async fn history(&self) -> Result<Vec<RunRecord>, HistoryError> {
        self.history.list_all().await
    }

    async fn latest(&self, filename: &str) -> Result<Option<RunRecord>, HistoryError> {
        self.history.latest_for(filename).await
    }

    async fn stats(&self) -> Result<HistoryStats, HistoryError> {
        self.history.stats().await
    }

    fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }
}
