//! Staged pipeline runner.
//!
//! A run walks five stages in order: document processing, parallel analysis, risk
//! scoring, report generation, and question generation. Every stage consumes the
//! previous [`RunState`] and returns a new one; once a stage flips the run to
//! `failed`, the remaining stages are skipped and the state is projected as-is.
//!
//! The three analyses in the middle stage run as separate tasks joined with a
//! barrier: a failure in one branch never cancels its siblings, and scoring only
//! starts once all three results are in hand.

use std::path::Path;
use std::sync::Arc;

use crate::analysis::{is_error_marked, Analyst, ANALYSIS_ERROR_MARKER};
use crate::extract::TextExtractor;
use crate::pipeline::state::{AnalysisResult, RunState};
use crate::store::DocumentIndex;

/// Orchestrates one document through extraction, analysis, scoring, and reporting.
pub struct Pipeline {
    extractor: Box<dyn TextExtractor>,
    index: Arc<dyn DocumentIndex>,
    analyst: Arc<Analyst>,
}

impl Pipeline {
    /// Assemble a pipeline from its three capabilities.
    pub fn new(
        extractor: Box<dyn TextExtractor>,
        index: Arc<dyn DocumentIndex>,
        analyst: Arc<Analyst>,
    ) -> Self {
        Self {
            extractor,
            index,
            analyst,
        }
    }

    /// Run the full pipeline for one document and return the terminal result.
    ///
    /// `filename` is the display name used in prompts, indexing, and the result;
    /// `path` is where the document bytes live on disk.
    pub async fn run(&self, path: &Path, filename: &str) -> AnalysisResult {
        let mut state = RunState::new(filename);
        tracing::info!(filename, "Starting analysis run");

        state = self.document_processor(state, path).await;
        if !state.halted() {
            state = self.parallel_analysis(state).await;
        }
        if !state.halted() {
            state = self.risk_scorer(state).await;
        }
        if !state.halted() {
            state = self.report_generator(state).await;
        }
        if !state.halted() {
            state = self.questions_agent(state).await;
        }

        match state.status {
            crate::pipeline::PipelineStatus::Failed => {
                tracing::warn!(filename, error = %state.error, "Analysis run failed");
            }
            _ => {
                tracing::info!(filename, risk_score = state.risk_score, "Analysis run complete");
            }
        }
        state.into_result()
    }

    /// Stage 1: extract text, index it for retrieval, detect the language.
    ///
    /// Extraction and indexing failures are fatal here; nothing downstream can
    /// run without text.
    async fn document_processor(&self, state: RunState, path: &Path) -> RunState {
        let text = match self.extractor.extract(path) {
            Ok(text) => text,
            Err(error) => {
                tracing::warn!(path = %path.display(), error = %error, "Text extraction failed");
                return state.with_failure(format!("Text extraction failed: {error}"));
            }
        };

        match self.index.ingest(&state.filename, &text).await {
            Ok(outcome) if outcome.already_indexed => {
                tracing::debug!(filename = state.filename, "Document already indexed; skipping");
            }
            Ok(outcome) => {
                tracing::debug!(
                    filename = state.filename,
                    chunks = outcome.chunk_count,
                    "Document indexed"
                );
            }
            Err(error) => {
                tracing::warn!(filename = state.filename, error = %error, "Indexing failed");
                return state.with_failure(format!("Document indexing failed: {error}"));
            }
        }

        let language = self.analyst.detect_language(&text).await;
        tracing::debug!(filename = state.filename, language, "Language detected");
        state.with_processed(text, language)
    }

    /// Stage 2: run summary, key-info, and risk analyses as three joined tasks.
    async fn parallel_analysis(&self, state: RunState) -> RunState {
        let text = state.raw_text.clone();
        let language = state.language.clone();

        let summary_task = {
            let analyst = Arc::clone(&self.analyst);
            let (text, language) = (text.clone(), language.clone());
            tokio::spawn(async move { analyst.summarize(&text, &language).await })
        };
        let key_info_task = {
            let analyst = Arc::clone(&self.analyst);
            let (text, language) = (text.clone(), language.clone());
            tokio::spawn(async move { analyst.extract_key_info(&text, &language).await })
        };
        let risks_task = {
            let analyst = Arc::clone(&self.analyst);
            tokio::spawn(async move { analyst.flag_risks(&text, &language).await })
        };

        let (summary, key_info, risks) = tokio::join!(summary_task, key_info_task, risks_task);
        let summary = join_or_marked("summarize", summary);
        let key_info = join_or_marked("extract_key_info", key_info);
        let risks = join_or_marked("flag_risks", risks);

        let failed = [&summary, &key_info, &risks]
            .into_iter()
            .find(|text| is_error_marked(text))
            .cloned();
        let state = state.with_analysis(summary, key_info, risks);
        match failed {
            Some(detail) => state.with_failure(detail),
            None => state,
        }
    }

    /// Stage 3: assign the numeric risk score. Never fatal.
    async fn risk_scorer(&self, state: RunState) -> RunState {
        let score = self
            .analyst
            .score_risk(&state.filename, &state.summary, &state.risks)
            .await;
        state.with_risk_score(score.score, score.reasoning)
    }

    /// Stage 4: compose the final report. An error-marked report fails the run.
    async fn report_generator(&self, state: RunState) -> RunState {
        let report = self
            .analyst
            .generate_report(
                &state.summary,
                &state.key_info,
                &state.risks,
                state.risk_score,
                &state.filename,
                &state.language,
            )
            .await;
        if is_error_marked(&report) {
            let detail = report.clone();
            return state.with_report(report).with_failure(detail);
        }
        state.with_report(report)
    }

    /// Stage 5: suggest follow-up questions. Never fatal; the run completes here.
    async fn questions_agent(&self, state: RunState) -> RunState {
        let questions = self
            .analyst
            .generate_questions(&state.raw_text, &state.language)
            .await;
        state.with_questions(questions)
    }
}

/// Unwrap a joined analysis branch, converting a panicked or aborted task into an
/// error-marked string so the merge logic treats it like any other branch failure.
fn join_or_marked(capability: &str, joined: Result<String, tokio::task::JoinError>) -> String {
    match joined {
        Ok(text) => text,
        Err(error) => format!("{ANALYSIS_ERROR_MARKER} {capability}: task aborted: {error}"),
    }
}
