mod common;

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Method, Request, StatusCode, header},
};
use httpmock::{Method::POST, MockServer};
use pdfchat::{
    api::create_router,
    config::{
        AnswerMode, ChunkingSettings, Config, EmbeddingProvider, EmbeddingSettings,
        FallbackResponse, GenerationProvider, GenerationSettings, PineconeSettings,
        VectorStoreConfig,
    },
    processing::RagService,
};
use serde_json::json;
use std::sync::Arc;
use tower::ServiceExt;

const EMBEDDING_PATH: &str = "/pipeline/feature-extraction/sentence-transformers/all-mpnet-base-v2";
const GENERATION_PATH: &str = "/models/HuggingFaceH4/zephyr-7b-beta";
const PAGE_TEXT: &str = "Ownership moves values between bindings";

fn config(server: &MockServer, answer_mode: AnswerMode) -> Config {
    Config {
        server_port: 0,
        unsupported_content_type: FallbackResponse::Greeting,
        vector_store: VectorStoreConfig::Pinecone(PineconeSettings {
            api_key: "pc-key".into(),
            index_name: "docs".into(),
            environment: None,
            host: Some(server.base_url()),
            controller_url: None,
            namespace: None,
        }),
        embedding: EmbeddingSettings {
            provider: EmbeddingProvider::HuggingFace,
            model: "sentence-transformers/all-mpnet-base-v2".into(),
            dimension: 3,
            api_url: server.base_url(),
            api_key: Some("hf-token".into()),
        },
        generation: GenerationSettings {
            provider: GenerationProvider::HuggingFace,
            model: "HuggingFaceH4/zephyr-7b-beta".into(),
            api_url: server.base_url(),
            api_key: Some("hf-token".into()),
            max_new_tokens: 512,
            temperature: 0.5,
            top_k: 30,
            repetition_penalty: 1.03,
        },
        answer_mode,
        trim_answer: true,
        chunking: ChunkingSettings::default(),
        retrieval_top_k: 4,
        provider_timeout_secs: Some(5),
    }
}

fn app(config: &Config) -> Router {
    let service = RagService::from_config(config).expect("service");
    create_router(Arc::new(service), config.unsupported_content_type)
}

fn upload_request() -> Request<Body> {
    let pdf = common::pdf_bytes(&[PAGE_TEXT]);
    let (content_type, body) = common::multipart_upload("file", "ownership.pdf", &pdf);
    Request::builder()
        .method(Method::POST)
        .uri("/")
        .header(header::CONTENT_TYPE, content_type)
        .body(Body::from(body))
        .expect("request")
}

fn question_request(question: &str) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri("/")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(json!({ "userprompt": question }).to_string()))
        .expect("request")
}

async fn body_text(response: axum::response::Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body bytes");
    String::from_utf8(bytes.to_vec()).expect("utf8")
}

async fn mock_embeddings(server: &MockServer) {
    server
        .mock_async(|when, then| {
            when.method(POST)
                .path(EMBEDDING_PATH)
                .header("Authorization", "Bearer hf-token");
            then.status(200).json_body(json!([[0.1, 0.2, 0.3]]));
        })
        .await;
}

#[tokio::test]
async fn uploaded_pdf_is_indexed_then_answered() {
    let server = MockServer::start_async().await;
    mock_embeddings(&server).await;
    let upsert = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/vectors/upsert")
                .header("Api-Key", "pc-key")
                .body_contains(PAGE_TEXT)
                .body_contains("ownership.pdf");
            then.status(200).json_body(json!({ "upsertedCount": 1 }));
        })
        .await;
    let query = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/query")
                .json_body_partial(r#"{ "topK": 4, "includeMetadata": true }"#);
            then.status(200).json_body(json!({
                "matches": [
                    { "id": "chunk-1", "score": 0.92, "metadata": { "text": PAGE_TEXT, "page": 0 } }
                ]
            }));
        })
        .await;
    let generation = server
        .mock_async(|when, then| {
            when.method(POST)
                .path(GENERATION_PATH)
                .body_contains(PAGE_TEXT)
                .body_contains("Question: What does ownership do?");
            then.status(200).json_body(json!([
                { "generated_text": "  It moves values between bindings.\n" }
            ]));
        })
        .await;

    let app = app(&config(&server, AnswerMode::Generate));

    let response = app.clone().oneshot(upload_request()).await.expect("upload");
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        body_text(response).await,
        "pdf data stored to the vector index, temp pdf deleted.\n"
    );
    upsert.assert_async().await;

    let response = app
        .oneshot(question_request("What does ownership do?"))
        .await
        .expect("question");
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, "It moves values between bindings.");
    query.assert_async().await;
    generation.assert_async().await;
}

#[tokio::test]
async fn matches_mode_returns_ranked_chunks() {
    let server = MockServer::start_async().await;
    mock_embeddings(&server).await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/query");
            then.status(200).json_body(json!({
                "matches": [
                    { "id": "a", "score": 0.9, "metadata": { "text": "first" } },
                    { "id": "b", "score": 0.4, "metadata": { "text": "second" } }
                ]
            }));
        })
        .await;
    let generation = server
        .mock_async(|when, then| {
            when.method(POST).path(GENERATION_PATH);
            then.status(200).json_body(json!([{ "generated_text": "unused" }]));
        })
        .await;

    let response = app(&config(&server, AnswerMode::Matches))
        .oneshot(question_request("anything"))
        .await
        .expect("question");

    assert_eq!(response.status(), StatusCode::OK);
    let json: serde_json::Value = serde_json::from_str(&body_text(response).await).expect("json");
    assert_eq!(json[0]["id"], "a");
    assert_eq!(json[1]["metadata"]["text"], "second");
    generation.assert_hits_async(0).await;
}

#[tokio::test]
async fn reingesting_the_same_pdf_writes_again() {
    let server = MockServer::start_async().await;
    mock_embeddings(&server).await;
    let upsert = server
        .mock_async(|when, then| {
            when.method(POST).path("/vectors/upsert");
            then.status(200).json_body(json!({ "upsertedCount": 1 }));
        })
        .await;

    let app = app(&config(&server, AnswerMode::Generate));
    for _ in 0..2 {
        let response = app.clone().oneshot(upload_request()).await.expect("upload");
        assert_eq!(response.status(), StatusCode::OK);
    }

    upsert.assert_hits_async(2).await;
}

#[tokio::test]
async fn embedding_outage_is_reported_without_details() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path(EMBEDDING_PATH);
            then.status(503).body("model hf-internal-shard-7 is overloaded");
        })
        .await;
    let upsert = server
        .mock_async(|when, then| {
            when.method(POST).path("/vectors/upsert");
            then.status(200).json_body(json!({ "upsertedCount": 1 }));
        })
        .await;

    let app = app(&config(&server, AnswerMode::Generate));

    let response = app.clone().oneshot(upload_request()).await.expect("upload");
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    let body = body_text(response).await;
    assert_eq!(body, "Upstream provider request failed");
    assert!(!body.contains("shard"));
    upsert.assert_hits_async(0).await;

    let response = app.oneshot(question_request("hello")).await.expect("question");
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
}

#[tokio::test]
async fn non_pdf_upload_is_unprocessable() {
    let server = MockServer::start_async().await;
    let (content_type, body) =
        common::multipart_upload("file", "notes.pdf", b"these are plain notes");

    let response = app(&config(&server, AnswerMode::Generate))
        .oneshot(
            Request::builder()
                .method(Method::POST)
                .uri("/")
                .header(header::CONTENT_TYPE, content_type)
                .body(Body::from(body))
                .expect("request"),
        )
        .await
        .expect("upload");

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body_text(response).await, "Uploaded file is not a readable PDF");
}

#[tokio::test]
async fn greeting_and_metrics_are_served() {
    let server = MockServer::start_async().await;
    let app = app(&config(&server, AnswerMode::Generate));

    let response = app
        .clone()
        .oneshot(Request::get("/").body(Body::empty()).expect("request"))
        .await
        .expect("greeting");
    assert_eq!(body_text(response).await, "Hello World.\n");

    let response = app
        .oneshot(Request::get("/metrics").body(Body::empty()).expect("request"))
        .await
        .expect("metrics");
    let json: serde_json::Value = serde_json::from_str(&body_text(response).await).expect("json");
    assert_eq!(json["documents_ingested"], 0);
    assert_eq!(json["failed_requests"], 0);
}
