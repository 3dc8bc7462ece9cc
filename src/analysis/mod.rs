//! Generation-backed analysis capabilities.
//!
//! Each capability is a stateless function over the injected generation oracle: build a
//! self-contained prompt, make one call, post-process the response. Failures never
//! escape a capability as an error value; text capabilities return an error-marked
//! string and structured capabilities substitute their documented default, leaving the
//! short-circuit decision to the orchestrator.

mod parse;
mod prompts;

pub use parse::{Severity, split_risk_sections};

use crate::generation::GenerationClient;
use std::sync::Arc;

/// Marker prefix identifying a capability result that carries a failure instead of
/// analysis output.
pub const ANALYSIS_ERROR_MARKER: &str = "[analysis-error]";

/// Neutral score substituted when the oracle's risk assessment cannot be parsed.
pub const NEUTRAL_RISK_SCORE: u8 = 50;

/// Language assumed when detection fails.
pub const DEFAULT_LANGUAGE: &str = "English";

/// Check whether a capability result carries the failure marker.
pub fn is_error_marked(text: &str) -> bool {
    text.starts_with(ANALYSIS_ERROR_MARKER)
}

/// Numeric risk assessment produced by [`Analyst::score_risk`].
#[derive(Debug, Clone)]
pub struct RiskScore {
    /// Overall risk on a 0-100 scale.
    pub score: u8,
    /// The oracle's reasoning, or a diagnostic note when the default was substituted.
    pub reasoning: String,
}

/// The fixed set of generation-backed analysis capabilities.
pub struct Analyst {
    generation: Arc<dyn GenerationClient + Send + Sync>,
}

impl Analyst {
    /// Construct an analyst over the given generation oracle.
    pub fn new(generation: Arc<dyn GenerationClient + Send + Sync>) -> Self {
        Self { generation }
    }

    async fn invoke_marked(&self, capability: &str, prompt: String) -> String {
        match self.generation.invoke(&prompt).await {
            Ok(text) => text,
            Err(error) => {
                tracing::warn!(capability, error = %error, "Capability call failed");
                format!("{ANALYSIS_ERROR_MARKER} {capability}: {error}")
            }
        }
    }

    /// Name the language the document is written in; defaults to English on failure.
    pub async fn detect_language(&self, text: &str) -> String {
        match self.generation.invoke(&prompts::detect_language(text)).await {
            Ok(language) => {
                let language = language
                    .lines()
                    .next()
                    .unwrap_or_default()
                    .trim()
                    .trim_matches(['"', '.'])
                    .to_string();
                if language.is_empty() {
                    DEFAULT_LANGUAGE.to_string()
                } else {
                    language
                }
            }
            Err(error) => {
                tracing::warn!(error = %error, "Language detection failed; assuming English");
                DEFAULT_LANGUAGE.to_string()
            }
        }
    }

    /// Generate a concise document summary.
    pub async fn summarize(&self, text: &str, language: &str) -> String {
        self.invoke_marked("summarize", prompts::summarize(text, language))
            .await
    }

    /// Extract key facts: document type, parties, dates, amounts, clauses, obligations.
    pub async fn extract_key_info(&self, text: &str, language: &str) -> String {
        self.invoke_marked("extract_key_info", prompts::extract_key_info(text, language))
            .await
    }

    /// Identify risks and missing sections, tagged with embedded severity markers.
    pub async fn flag_risks(&self, text: &str, language: &str) -> String {
        self.invoke_marked("flag_risks", prompts::flag_risks(text, language))
            .await
    }

    /// Score overall document risk on a 0-100 scale.
    ///
    /// Never fails: an unreachable oracle or an unparseable response yields the neutral
    /// score with a diagnostic reasoning string.
    pub async fn score_risk(&self, filename: &str, summary: &str, risks: &str) -> RiskScore {
        let prompt = prompts::score_risk(filename, summary, risks);
        match self.generation.invoke(&prompt).await {
            Ok(raw) => match parse::parse_risk_score(&raw) {
                Some((score, reasoning)) => RiskScore { score, reasoning },
                None => {
                    tracing::warn!(filename, "Risk score response was unparseable; using neutral default");
                    RiskScore {
                        score: NEUTRAL_RISK_SCORE,
                        reasoning: format!("Could not parse a score from the model response: {raw}"),
                    }
                }
            },
            Err(error) => {
                tracing::warn!(filename, error = %error, "Risk scoring failed; using neutral default");
                RiskScore {
                    score: NEUTRAL_RISK_SCORE,
                    reasoning: format!("Risk scoring unavailable: {error}"),
                }
            }
        }
    }

    /// Combine the analysis results into a final structured report.
    pub async fn generate_report(
        &self,
        summary: &str,
        key_info: &str,
        risks: &str,
        risk_score: u8,
        filename: &str,
        language: &str,
    ) -> String {
        self.invoke_marked(
            "generate_report",
            prompts::generate_report(summary, key_info, risks, risk_score, filename, language),
        )
        .await
    }

    /// Suggest up to five follow-up questions; empty on any internal failure.
    pub async fn generate_questions(&self, text: &str, language: &str) -> Vec<String> {
        match self
            .generation
            .invoke(&prompts::generate_questions(text, language))
            .await
        {
            Ok(raw) => parse::parse_questions(&raw),
            Err(error) => {
                tracing::warn!(error = %error, "Question generation failed; returning none");
                Vec::new()
            }
        }
    }

    /// Answer a question from retrieved passages; error-marked string on failure.
    pub async fn answer_question(&self, question: &str, context: &str, language: &str) -> String {
        self.invoke_marked(
            "answer_question",
            prompts::answer_question(question, context, language),
        )
        .await
    }
}
