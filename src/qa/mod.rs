//! Retrieval-augmented question answering over indexed documents.
//!
//! The responder searches the vector index for passages relevant to the question,
//! then asks the oracle to answer strictly from those passages. Like the other
//! analysis capabilities it never propagates an error: retrieval or oracle
//! failures come back as error-marked strings, and an empty retrieval yields a
//! sentinel-derived answer.

use std::sync::Arc;

use crate::analysis::{Analyst, ANALYSIS_ERROR_MARKER};
use crate::store::{DocumentIndex, SearchOutcome, NO_RELEVANT_SECTIONS};

/// Answers questions from retrieved document passages.
pub struct QaResponder {
    index: Arc<dyn DocumentIndex>,
    analyst: Arc<Analyst>,
    scope_to_document: bool,
}

impl QaResponder {
    /// Build a responder.
    ///
    /// With `scope_to_document` set, retrieval is filtered to the named source
    /// document; otherwise the whole indexed corpus is searched.
    pub fn new(
        index: Arc<dyn DocumentIndex>,
        analyst: Arc<Analyst>,
        scope_to_document: bool,
    ) -> Self {
        Self {
            index,
            analyst,
            scope_to_document,
        }
    }

    /// Answer `question` about `source`, responding in `language`.
    pub async fn answer(&self, question: &str, source: &str, language: &str) -> String {
        let scope = self.scope_to_document.then_some(source);
        let outcome = match self.index.search(question, scope).await {
            Ok(outcome) => outcome,
            Err(error) => {
                tracing::warn!(question, error = %error, "Passage retrieval failed");
                return format!("{ANALYSIS_ERROR_MARKER} answer_question: retrieval failed: {error}");
            }
        };

        match outcome {
            SearchOutcome::NoMatch => {
                tracing::debug!(question, source, "No relevant passages retrieved");
                format!(
                    "{NO_RELEVANT_SECTIONS} The indexed documents do not contain \
                     information relevant to this question."
                )
            }
            passages @ SearchOutcome::Passages(_) => {
                let context = passages.as_context();
                self.analyst
                    .answer_question(question, &context, language)
                    .await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::is_error_marked;
    use crate::analysis::test_support::ScriptedOracle;
    use crate::store::{IngestOutcome, Passage, StoreError};
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct StubIndex {
        outcome: Result<SearchOutcome, &'static str>,
        scopes: Mutex<Vec<Option<String>>>,
    }

    impl StubIndex {
        fn with_passages(texts: &[&str]) -> Self {
            let passages = texts
                .iter()
                .enumerate()
                .map(|(i, text)| Passage {
                    source: "doc.pdf".into(),
                    chunk_id: i,
                    text: text.to_string(),
                    score: 0.9,
                })
                .collect();
            Self {
                outcome: Ok(SearchOutcome::Passages(passages)),
                scopes: Mutex::new(Vec::new()),
            }
        }

        fn empty() -> Self {
            Self {
                outcome: Ok(SearchOutcome::NoMatch),
                scopes: Mutex::new(Vec::new()),
            }
        }

        fn failing() -> Self {
            Self {
                outcome: Err("connection reset"),
                scopes: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl DocumentIndex for StubIndex {
        async fn ingest(&self, _source: &str, _text: &str) -> Result<IngestOutcome, StoreError> {
            unreachable!("responder never ingests")
        }

        async fn search(
            &self,
            _query: &str,
            source: Option<&str>,
        ) -> Result<SearchOutcome, StoreError> {
            self.scopes
                .lock()
                .unwrap()
                .push(source.map(str::to_string));
            match &self.outcome {
                Ok(outcome) => Ok(outcome.clone()),
                Err(msg) => Err(StoreError::Embedding(
                    crate::embedding::EmbeddingClientError::GenerationFailed((*msg).into()),
                )),
            }
        }
    }

    fn responder(index: StubIndex, scoped: bool) -> (QaResponder, Arc<ScriptedOracle>) {
        let oracle = Arc::new(ScriptedOracle::new(vec![(
            "Answer the question using ONLY",
            Ok("The notice period is 30 days.".into()),
        )]));
        let analyst = Arc::new(Analyst::new(oracle.clone()));
        (QaResponder::new(Arc::new(index), analyst, scoped), oracle)
    }

    #[tokio::test]
    async fn answers_from_retrieved_passages() {
        let (responder, oracle) = responder(
            StubIndex::with_passages(&["Notice: 30 days.", "Rent: 900."]),
            false,
        );

        let answer = responder
            .answer("What is the notice period?", "doc.pdf", "English")
            .await;

        assert_eq!(answer, "The notice period is 30 days.");
        let calls = oracle.calls.lock().unwrap();
        assert!(calls[0].contains("Notice: 30 days."));
        assert!(calls[0].contains("Rent: 900."));
    }

    #[tokio::test]
    async fn global_scope_by_default_document_scope_when_enabled() {
        for (scoped, expected) in [(false, None), (true, Some("doc.pdf".to_string()))] {
            let index = Arc::new(StubIndex::with_passages(&["text"]));
            let oracle = Arc::new(ScriptedOracle::new(vec![(
                "Answer the question",
                Ok("ok".into()),
            )]));
            let responder =
                QaResponder::new(index.clone(), Arc::new(Analyst::new(oracle)), scoped);
            responder.answer("q?", "doc.pdf", "English").await;
            assert_eq!(index.scopes.lock().unwrap().as_slice(), &[expected]);
        }
    }

    #[tokio::test]
    async fn empty_retrieval_yields_sentinel_answer_without_oracle_call() {
        let (responder, oracle) = responder(StubIndex::empty(), false);

        let answer = responder.answer("Anything?", "doc.pdf", "English").await;

        assert!(answer.starts_with(NO_RELEVANT_SECTIONS));
        assert_eq!(oracle.call_count(), 0);
    }

    #[tokio::test]
    async fn retrieval_failure_is_error_marked_not_propagated() {
        let (responder, oracle) = responder(StubIndex::failing(), false);

        let answer = responder.answer("Anything?", "doc.pdf", "English").await;

        assert!(is_error_marked(&answer));
        assert!(answer.contains("retrieval failed"));
        assert_eq!(oracle.call_count(), 0);
    }
}
