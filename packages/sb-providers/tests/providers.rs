use std::net::SocketAddr;

use axum::{Json, Router, http::StatusCode, routing::post};
use reqwest::header::AUTHORIZATION;
use serde_json::{Map, Value};
use tokio::net::TcpListener;

use sb_config::{EmbeddingProviderConfig, EnrichmentProviderConfig};
use sb_providers::{Error, embedding, enrichment};

async fn spawn_stub(router: Router) -> SocketAddr {
	let listener = TcpListener::bind("127.0.0.1:0").await.expect("Failed to bind stub server.");
	let addr = listener.local_addr().expect("Failed to read stub address.");

	tokio::spawn(async move {
		let _ = axum::serve(listener, router).await;
	});

	addr
}

fn embedding_cfg(addr: SocketAddr) -> EmbeddingProviderConfig {
	EmbeddingProviderConfig {
		provider_id: "stub".to_string(),
		api_base: format!("http://{addr}"),
		api_key: "test-key".to_string(),
		path: "/embeddings".to_string(),
		model: "stub-embedding".to_string(),
		dimensions: 3,
		timeout_ms: 2_000,
		default_headers: Map::new(),
	}
}

fn enrichment_cfg(addr: SocketAddr, timeout_ms: u64) -> EnrichmentProviderConfig {
	EnrichmentProviderConfig {
		provider_id: "stub".to_string(),
		api_base: format!("http://{addr}"),
		api_key: "test-key".to_string(),
		path: "/chat/completions".to_string(),
		model: "stub-chat".to_string(),
		temperature: 0.3,
		max_tokens: 256,
		timeout_ms,
		default_headers: Map::new(),
		system_prompt: None,
	}
}

#[test]
fn builds_bearer_auth_header() {
	let headers =
		sb_providers::auth_headers("secret", &Map::new()).expect("Failed to build headers.");
	let value = headers.get(AUTHORIZATION).expect("Missing authorization header.");

	assert_eq!(value, "Bearer secret");
}

#[test]
fn rejects_non_string_default_headers() {
	let mut defaults = Map::new();

	defaults.insert("X-Title".to_string(), Value::from(3));

	let err = sb_providers::auth_headers("secret", &defaults).expect_err("Expected config error.");

	assert!(matches!(err, Error::InvalidConfig { .. }));
}

#[tokio::test]
async fn embeds_text_through_stub_server() {
	let router = Router::new().route(
		"/embeddings",
		post(|Json(body): Json<Value>| async move {
			assert_eq!(body["model"], "stub-embedding");
			assert_eq!(body["input"], "hello");

			Json(serde_json::json!({ "data": [{ "index": 0, "embedding": [0.1, 0.2, 0.3] }] }))
		}),
	);
	let addr = spawn_stub(router).await;
	let vector = embedding::embed(&embedding_cfg(addr), "hello").await.expect("Embedding failed.");

	assert_eq!(vector.len(), 3);
}

#[tokio::test]
async fn embedding_surfaces_upstream_error_message() {
	let router = Router::new().route(
		"/embeddings",
		post(|| async {
			(
				StatusCode::TOO_MANY_REQUESTS,
				Json(serde_json::json!({ "error": { "message": "slow down" } })),
			)
		}),
	);
	let addr = spawn_stub(router).await;
	let err = embedding::embed(&embedding_cfg(addr), "hello").await.expect_err("Expected error.");

	assert!(matches!(err, Error::Status { status: 429, .. }));
	assert!(err.to_string().contains("slow down"), "Unexpected error: {err}");
}

#[tokio::test]
async fn analyzes_note_through_stub_server() {
	let router = Router::new().route(
		"/chat/completions",
		post(|Json(body): Json<Value>| async move {
			assert_eq!(body["messages"][1]["content"], "I fear pricing my work");
			assert_eq!(body["max_tokens"], 256);

			let content = serde_json::json!({
				"summary": "Pricing is a signal of value.",
				"mental_model": "Price Anchor",
				"category": "career",
				"tags": ["pricing", "fear"]
			})
			.to_string();

			Json(serde_json::json!({ "choices": [{ "message": { "content": content } }] }))
		}),
	);
	let addr = spawn_stub(router).await;
	let analysis = enrichment::analyze(&enrichment_cfg(addr, 2_000), "I fear pricing my work")
		.await
		.expect("Analysis failed.");

	assert_eq!(analysis.category, "career");
	assert_eq!(analysis.mental_model, "Price Anchor");
	assert_eq!(analysis.tags, vec!["pricing".to_string(), "fear".to_string()]);
}

#[tokio::test]
async fn analysis_times_out_with_user_message() {
	let router = Router::new().route(
		"/chat/completions",
		post(|| async {
			tokio::time::sleep(std::time::Duration::from_secs(5)).await;

			Json(serde_json::json!({}))
		}),
	);
	let addr = spawn_stub(router).await;
	let err = enrichment::analyze(&enrichment_cfg(addr, 100), "anything")
		.await
		.expect_err("Expected timeout.");

	assert!(matches!(err, Error::Timeout { .. }));
	assert_eq!(err.to_string(), "Analysis request timed out, please retry later.");
}

#[tokio::test]
async fn analysis_maps_missing_model() {
	let router = Router::new().route("/chat/completions", post(|| async { StatusCode::NOT_FOUND }));
	let addr = spawn_stub(router).await;
	let err = enrichment::analyze(&enrichment_cfg(addr, 2_000), "anything")
		.await
		.expect_err("Expected status error.");

	assert_eq!(err.to_string(), "Analysis model is unavailable.");
}
