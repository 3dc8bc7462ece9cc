//! End-to-end run over the HTTP surface with mocked Qdrant and Ollama backends.

use std::path::PathBuf;
use std::sync::Arc;

use axum::body::{Body, to_bytes};
use axum::http::{Method, Request, StatusCode};
use docsense::{api, config, service::AnalysisService};
use httpmock::{Method::GET, Method::POST, Method::PUT, MockServer};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};
use serde_json::json;
use tokio::sync::OnceCell;
use tower::ServiceExt;

static INIT: OnceCell<()> = OnceCell::const_new();
static MOCK_SERVER: OnceCell<&'static MockServer> = OnceCell::const_new();

fn set_env(key: &str, value: &str) {
    // SAFETY: Tests run in a single process and establish deterministic configuration upfront.
    unsafe { std::env::set_var(key, value) }
}

fn scratch_dir() -> PathBuf {
    let dir = std::env::temp_dir().join(format!("docsense-e2e-{}", std::process::id()));
    std::fs::create_dir_all(&dir).expect("scratch dir");
    dir
}

/// Build a minimal one-page PDF containing `text`.
fn pdf_fixture(text: &str) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });

    let content = Content {
        operations: vec![
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec!["F1".into(), 24.into()]),
            Operation::new("Td", vec![100.into(), 600.into()]),
            Operation::new("Tj", vec![Object::string_literal(text)]),
            Operation::new("ET", vec![]),
        ],
    };
    let content_id = doc.add_object(Stream::new(
        dictionary! {},
        content.encode().expect("encode content stream"),
    ));

    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Contents" => content_id,
    });
    let pages = dictionary! {
        "Type" => "Pages",
        "Kids" => vec![page_id.into()],
        "Count" => 1,
        "Resources" => resources_id,
        "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
    };
    doc.objects.insert(pages_id, Object::Dictionary(pages));

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.compress();

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).expect("serialize pdf");
    bytes
}

fn generate_mock(server: &'static MockServer, needle: &'static str, response: &'static str) {
    server.mock(|when, then| {
        when.method(POST).path("/api/generate").body_contains(needle);
        then.status(200).json_body(json!({
            "response": response,
            "done": true
        }));
    });
}

async fn harness() -> Arc<AnalysisService> {
    INIT.get_or_init(|| async {
        let mock_server = Box::leak(Box::new(MockServer::start_async().await));
        let base_url = mock_server.base_url();
        MOCK_SERVER.set(mock_server).ok();

        set_env("QDRANT_URL", &base_url);
        set_env("QDRANT_COLLECTION_NAME", "docsense");
        set_env("OLLAMA_URL", &base_url);
        set_env("CHAT_MODEL", "llama3.1:8b");
        set_env("EMBEDDING_MODEL", "nomic-embed-text:latest");
        set_env("EMBEDDING_DIMENSION", "4");
        set_env(
            "HISTORY_DB_PATH",
            scratch_dir().join("analyses.db").to_str().expect("utf8 path"),
        );

        let server = *MOCK_SERVER.get().expect("mock server initialized");

        // Qdrant surface used by the document store.
        server.mock(|when, then| {
            when.method(GET).path("/collections/docsense");
            then.status(200).json_body(json!({ "result": {} }));
        });
        server.mock(|when, then| {
            when.method(PUT).path("/collections/docsense/index");
            then.status(200).json_body(json!({ "result": {} }));
        });
        server.mock(|when, then| {
            when.method(POST).path("/collections/docsense/points/count");
            then.status(200)
                .json_body(json!({ "result": { "count": 0 } }));
        });
        server.mock(|when, then| {
            when.method(PUT).path("/collections/docsense/points");
            then.status(200).json_body(json!({
                "result": { "operation_id": 1, "status": "completed" }
            }));
        });
        server.mock(|when, then| {
            when.method(POST).path("/collections/docsense/points/query");
            then.status(200).json_body(json!({
                "result": {
                    "points": [{
                        "id": "11111111-1111-4111-8111-111111111111",
                        "score": 0.91,
                        "payload": {
                            "source": "agreement.pdf",
                            "chunk_id": 0,
                            "text": "Either party may terminate with 30 days written notice."
                        }
                    }]
                }
            }));
        });

        // Embedding endpoint: one vector per request keeps ingest and search happy
        // as long as documents stay below one chunk window.
        server.mock(|when, then| {
            when.method(POST).path("/api/embed");
            then.status(200)
                .json_body(json!({ "embeddings": [[0.1, 0.2, 0.3, 0.4]] }));
        });

        // Generation oracle, scripted per capability.
        generate_mock(server, "Identify the language", "English");
        generate_mock(server, "Summarize the following", "A supplier agreement with a 30 day notice period.");
        generate_mock(server, "Extract the following key information", "Parties: Acme and Beta. Notice: 30 days.");
        generate_mock(server, "Analyze this document for potential risks", "HIGH RISK: automatic renewal without notice cap.");
        generate_mock(
            server,
            "scoring the overall risk",
            r#"{"score": 64, "reasoning": "Automatic renewal exposure."}"#,
        );
        generate_mock(server, "professional document analysis report", "Report: renewal terms need review.");
        generate_mock(server, "Suggest up to 5 short questions", r#"["When does the term renew?"]"#);
        generate_mock(server, "Answer the question using ONLY", "Termination requires 30 days written notice.");

        config::init_config();
    })
    .await;

    Arc::new(
        AnalysisService::from_config()
            .await
            .expect("service wiring"),
    )
}

#[tokio::test]
async fn analyze_endpoint_runs_the_full_pipeline() {
    let service = harness().await;
    let app = api::create_router(service);

    let pdf_path = scratch_dir().join("agreement.pdf");
    std::fs::write(&pdf_path, pdf_fixture("Supplier agreement with automatic renewal."))
        .expect("write fixture");

    let payload = json!({
        "file_path": pdf_path.to_str().expect("utf8 path"),
        "display_name": "agreement.pdf"
    });
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method(Method::POST)
                .uri("/analyze")
                .header("content-type", "application/json")
                .body(Body::from(payload.to_string()))
                .expect("request"),
        )
        .await
        .expect("router response");

    assert_eq!(response.status(), StatusCode::OK);
    let body = to_bytes(response.into_body(), usize::MAX).await.expect("body");
    let json: serde_json::Value = serde_json::from_slice(&body).expect("json body");
    assert_eq!(json["filename"], "agreement.pdf");
    assert_eq!(json["status"], "complete");
    assert_eq!(json["language"], "English");
    assert_eq!(json["risk_score"], 64);
    assert_eq!(
        json["suggested_questions"][0],
        "When does the term renew?"
    );
    assert_eq!(json["risk_sections"][0]["severity"], "high");

    // The run shows up in history and in the aggregate stats.
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/history?filename=agreement.pdf")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("router response");
    let body = to_bytes(response.into_body(), usize::MAX).await.expect("body");
    let json: serde_json::Value = serde_json::from_slice(&body).expect("json body");
    assert_eq!(json["analyses"][0]["status"], "complete");
    assert_eq!(json["analyses"][0]["risk_score"], 64);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/stats")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("router response");
    let body = to_bytes(response.into_body(), usize::MAX).await.expect("body");
    let json: serde_json::Value = serde_json::from_slice(&body).expect("json body");
    assert!(json["total"].as_i64().expect("total") >= 1);
    assert!(json["successful"].as_i64().expect("successful") >= 1);
}

#[tokio::test]
async fn ask_endpoint_answers_from_retrieved_passages() {
    let service = harness().await;
    let app = api::create_router(service.clone());

    let payload = json!({
        "question": "How can the agreement be terminated?",
        "filename": "agreement.pdf"
    });
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method(Method::POST)
                .uri("/ask")
                .header("content-type", "application/json")
                .body(Body::from(payload.to_string()))
                .expect("request"),
        )
        .await
        .expect("router response");

    assert_eq!(response.status(), StatusCode::OK);
    let body = to_bytes(response.into_body(), usize::MAX).await.expect("body");
    let json: serde_json::Value = serde_json::from_slice(&body).expect("json body");
    assert_eq!(json["answer"], "Termination requires 30 days written notice.");

    let response = app
        .oneshot(
            Request::builder()
                .uri("/metrics")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("router response");
    let body = to_bytes(response.into_body(), usize::MAX).await.expect("body");
    let json: serde_json::Value = serde_json::from_slice(&body).expect("json body");
    assert_eq!(json["questions_answered"], 1);
}
