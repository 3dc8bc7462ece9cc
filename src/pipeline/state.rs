//! Run-state record threaded through the pipeline.
//!
//! Each stage consumes the previous state and returns a new one (copy-with-update), so
//! concurrent branches never share a mutable structure. The terminal projection handed
//! to callers is [`AnalysisResult`].

use serde::Serialize;

/// Pipeline position of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PipelineStatus {
    /// Fresh run, nothing extracted yet.
    Starting,
    /// Text extracted, document indexed, language detected.
    Processed,
    /// Summary, key info, and risk narrative all present.
    Analyzed,
    /// Numeric risk score assigned.
    Scored,
    /// Report and suggested questions produced.
    Complete,
    /// Terminal failure; `error` carries the detail.
    Failed,
}

impl PipelineStatus {
    /// Stable lowercase name used in persistence and HTTP payloads.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Starting => "starting",
            Self::Processed => "processed",
            Self::Analyzed => "analyzed",
            Self::Scored => "scored",
            Self::Complete => "complete",
            Self::Failed => "failed",
        }
    }
}

impl std::fmt::Display for PipelineStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Mutable record for one pipeline run; fresh per invocation.
#[derive(Debug, Clone)]
pub struct RunState {
    /// Display name of the document being analyzed.
    pub filename: String,
    /// Raw extracted text; non-empty once the run passes `processed`.
    pub raw_text: String,
    /// Detected document language.
    pub language: String,
    /// Concise summary text.
    pub summary: String,
    /// Extracted key facts.
    pub key_info: String,
    /// Risk narrative with embedded severity tags.
    pub risks: String,
    /// Numeric risk score in `[0, 100]`; meaningful from `scored` onward.
    pub risk_score: u8,
    /// Reasoning attached to the risk score.
    pub risk_reasoning: String,
    /// Final report text.
    pub report: String,
    /// Suggested follow-up questions (at most five).
    pub questions: Vec<String>,
    /// Current pipeline position.
    pub status: PipelineStatus,
    /// Failure detail; empty unless `status` is `failed`.
    pub error: String,
}

impl RunState {
    /// Create a fresh state for a new run.
    pub fn new(filename: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            raw_text: String::new(),
            language: String::new(),
            summary: String::new(),
            key_info: String::new(),
            risks: String::new(),
            risk_score: 0,
            risk_reasoning: String::new(),
            report: String::new(),
            questions: Vec::new(),
            status: PipelineStatus::Starting,
            error: String::new(),
        }
    }

    /// Whether the run has hit its terminal failure state.
    pub fn halted(&self) -> bool {
        self.status == PipelineStatus::Failed
    }

    /// Transition: extraction, indexing, and language detection succeeded.
    pub fn with_processed(self, raw_text: String, language: String) -> Self {
        Self {
            raw_text,
            language,
            status: PipelineStatus::Processed,
            ..self
        }
    }

    /// Transition: the three parallel analyses joined.
    pub fn with_analysis(self, summary: String, key_info: String, risks: String) -> Self {
        Self {
            summary,
            key_info,
            risks,
            status: PipelineStatus::Analyzed,
            ..self
        }
    }

    /// Transition: numeric risk score assigned.
    pub fn with_risk_score(self, score: u8, reasoning: String) -> Self {
        Self {
            risk_score: score,
            risk_reasoning: reasoning,
            status: PipelineStatus::Scored,
            ..self
        }
    }

    /// Transition: report generated.
    pub fn with_report(self, report: String) -> Self {
        Self { report, ..self }
    }

    /// Transition: suggested questions attached; the run is complete.
    pub fn with_questions(self, questions: Vec<String>) -> Self {
        Self {
            questions,
            status: PipelineStatus::Complete,
            ..self
        }
    }

    /// Transition into the terminal failure state.
    pub fn with_failure(self, error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            status: PipelineStatus::Failed,
            ..self
        }
    }

    /// Project the terminal state into the immutable result handed to callers.
    pub fn into_result(self) -> AnalysisResult {
        AnalysisResult {
            filename: self.filename,
            summary: self.summary,
            key_info: self.key_info,
            risks: self.risks,
            risk_score: self.risk_score,
            risk_reasoning: self.risk_reasoning,
            report: self.report,
            language: self.language,
            suggested_questions: self.questions,
            status: self.status,
            error: self.error,
        }
    }
}

/// Immutable projection of a finished run.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisResult {
    /// Display name of the analyzed document.
    pub filename: String,
    /// Concise summary text.
    pub summary: String,
    /// Extracted key facts.
    pub key_info: String,
    /// Risk narrative with embedded severity tags.
    pub risks: String,
    /// Numeric risk score in `[0, 100]`; zero on runs that failed before scoring.
    pub risk_score: u8,
    /// Reasoning attached to the risk score.
    pub risk_reasoning: String,
    /// Final report text.
    pub report: String,
    /// Detected document language.
    pub language: String,
    /// Suggested follow-up questions.
    pub suggested_questions: Vec<String>,
    /// Terminal pipeline status.
    pub status: PipelineStatus,
    /// Failure detail; empty on success.
    pub error: String,
}
