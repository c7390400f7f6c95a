use std::time::Duration;

use reqwest::Client;
use serde_json::Value;

use crate::{Error, Result};

pub async fn embed(cfg: &sb_config::EmbeddingProviderConfig, text: &str) -> Result<Vec<f32>> {
	if text.trim().is_empty() {
		return Err(Error::EmptyInput { message: "Embedding input must be non-empty.".to_string() });
	}

	let client = Client::builder().timeout(Duration::from_millis(cfg.timeout_ms)).build()?;
	let url = format!("{}{}", cfg.api_base, cfg.path);
	let body = serde_json::json!({
		"model": cfg.model,
		"input": text,
	});
	let res = client
		.post(url)
		.headers(crate::auth_headers(&cfg.api_key, &cfg.default_headers)?)
		.json(&body)
		.send()
		.await
		.map_err(map_transport_error)?;
	let status = res.status();

	if !status.is_success() {
		let raw = res.text().await.unwrap_or_default();
		let message = crate::upstream_message(&raw).unwrap_or_else(|| {
			status.canonical_reason().unwrap_or("unknown error").to_string()
		});

		return Err(Error::Status {
			status: status.as_u16(),
			message: format!("Embedding service returned an error ({}): {message}", status.as_u16()),
		});
	}

	let json: Value = res.json().await.map_err(map_transport_error)?;

	parse_embedding_response(&json)
}

fn map_transport_error(err: reqwest::Error) -> Error {
	if err.is_timeout() {
		return Error::Timeout { message: "Embedding request timed out.".to_string() };
	}
	if err.is_connect() {
		return Error::Connection { message: "Embedding service is unreachable.".to_string() };
	}

	Error::Reqwest(err)
}

fn parse_embedding_response(json: &Value) -> Result<Vec<f32>> {
	let embedding = json
		.get("data")
		.and_then(Value::as_array)
		.and_then(|data| data.first())
		.and_then(|item| item.get("embedding"))
		.and_then(Value::as_array)
		.ok_or_else(|| Error::InvalidResponse {
			message: "Embedding response is missing data[0].embedding.".to_string(),
		})?;
	let mut vec = Vec::with_capacity(embedding.len());

	for value in embedding {
		let number = value.as_f64().ok_or_else(|| Error::InvalidResponse {
			message: "Embedding value must be numeric.".to_string(),
		})?;

		vec.push(number as f32);
	}

	if vec.is_empty() {
		return Err(Error::InvalidResponse { message: "Embedding vector is empty.".to_string() });
	}

	Ok(vec)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn parses_first_embedding() {
		let json = serde_json::json!({
			"data": [
				{ "index": 0, "embedding": [0.5, 1.5, -2.0] }
			]
		});
		let parsed = parse_embedding_response(&json).expect("parse failed");

		assert_eq!(parsed, vec![0.5, 1.5, -2.0]);
	}

	#[test]
	fn rejects_missing_embedding_array() {
		let json = serde_json::json!({ "data": [] });
		let err = parse_embedding_response(&json).expect_err("expected missing data error");

		assert!(matches!(err, Error::InvalidResponse { .. }));
	}

	#[test]
	fn rejects_non_numeric_values() {
		let json = serde_json::json!({ "data": [{ "embedding": [0.1, "x"] }] });

		assert!(parse_embedding_response(&json).is_err());
	}

	#[tokio::test]
	async fn empty_text_fails_without_network() {
		let cfg = sb_config::EmbeddingProviderConfig {
			provider_id: "test".to_string(),
			api_base: "http://127.0.0.1:1".to_string(),
			api_key: "test-key".to_string(),
			path: "/embeddings".to_string(),
			model: "test".to_string(),
			dimensions: 3,
			timeout_ms: 1_000,
			default_headers: serde_json::Map::new(),
		};
		let err = embed(&cfg, "   ").await.expect_err("expected empty input error");

		assert!(matches!(err, Error::EmptyInput { .. }));
	}
}
