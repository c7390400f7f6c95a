//! Note enrichment over an OpenAI-compatible chat completions endpoint.
//!
//! The model is asked for a JSON insight card, but prompts have drifted over time and older
//! deployments answer with several different field layouts (or with free prose). Every layout is
//! described by a [`Shape`] and probed in priority order, so adding a layout is one table entry.

use std::time::Duration;

use regex::Regex;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{Error, Result};

const THINKING_BLOCK_PATTERN: &str = r"(?is)<thinking>.*?</thinking>";
const CODE_FENCE_PATTERN: &str = r"(?i)```(?:json)?";
const EXCESS_NEWLINES_PATTERN: &str = r"\n{3,}";
const DEFAULT_CATEGORY: &str = "mindset";
const SYSTEM_PROMPT: &str = "\
You turn a short personal reflection into an insight card.

Think privately inside <thinking></thinking> first if you need to, then answer with one JSON \
object and nothing else:
{
  \"signal_decoding\": \"What the feeling is signalling, with empathy, at most eight lines.\",
  \"pivot\": \"The strategy switch and why it fits this situation.\",
  \"micro_action\": \"One concrete step small enough to start right now.\",
  \"meaning\": \"Why this step addresses the root cause.\",
  \"mental_model\": \"A reusable concept name plus a one-sentence definition.\",
  \"category\": \"One lowercase word such as mindset, career, health, learning.\",
  \"tags\": [\"three to five short lowercase tags\"]
}

Keep each paragraph under four lines, never use emoji, and never repeat the mental model or the \
tags inside the other fields.";

/// Canonical enrichment record attached to a note.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Analysis {
	pub category: String,
	pub tags: Vec<String>,
	pub summary: String,
	pub mental_model: String,
}

struct Shape {
	name: &'static str,
	markers: &'static [&'static str],
	compose: fn(&Map<String, Value>) -> Composed,
}

struct Composed {
	summary: String,
	mental_model: String,
}

// Most specific markers first: `pivot` is shared by several layouts.
const SHAPES: [Shape; 6] = [
	Shape {
		name: "partner",
		markers: &["understanding", "asset_concept", "asset_takeaway"],
		compose: compose_partner,
	},
	Shape { name: "audit", markers: &["audit", "insight", "strategy"], compose: compose_audit },
	Shape {
		name: "essentialist",
		markers: &["signal_decoding", "pivot", "micro_action", "meaning"],
		compose: compose_essentialist,
	},
	Shape { name: "accessible", markers: &["translation", "action"], compose: compose_accessible },
	Shape {
		name: "strategist",
		markers: &["signal", "reframe", "leverage"],
		compose: compose_strategist,
	},
	Shape {
		name: "naval",
		markers: &["essence", "action_plan", "naval_quote"],
		compose: compose_naval,
	},
];

pub async fn analyze(cfg: &sb_config::EnrichmentProviderConfig, content: &str) -> Result<Analysis> {
	if content.trim().is_empty() {
		return Err(Error::EmptyInput { message: "Note content must be non-empty.".to_string() });
	}

	let budget = Duration::from_millis(cfg.timeout_ms);
	let raw = tokio::time::timeout(budget, request_completion(cfg, content)).await.map_err(
		|_| Error::Timeout {
			message: "Analysis request timed out, please retry later.".to_string(),
		},
	)??;

	parse_analysis(&raw)
}

async fn request_completion(
	cfg: &sb_config::EnrichmentProviderConfig,
	content: &str,
) -> Result<String> {
	let client = Client::new();
	let url = format!("{}{}", cfg.api_base, cfg.path);
	let system_prompt = cfg.system_prompt.as_deref().unwrap_or(SYSTEM_PROMPT);
	let body = serde_json::json!({
		"model": cfg.model,
		"messages": [
			{ "role": "system", "content": system_prompt },
			{ "role": "user", "content": content },
		],
		"temperature": cfg.temperature,
		"max_tokens": cfg.max_tokens,
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

		return Err(status_error(status, &raw));
	}

	let json: Value = res.json().await.map_err(map_transport_error)?;

	completion_content(&json)
}

fn map_transport_error(err: reqwest::Error) -> Error {
	if err.is_timeout() {
		return Error::Timeout {
			message: "Analysis request timed out, please retry later.".to_string(),
		};
	}
	if err.is_connect() {
		return Error::Connection {
			message: "Analysis service is unreachable; check the network or proxy settings."
				.to_string(),
		};
	}

	Error::Reqwest(err)
}

fn status_error(status: StatusCode, body: &str) -> Error {
	let upstream = crate::upstream_message(body);
	let message = match status {
		StatusCode::UNAUTHORIZED => "Analysis provider rejected the API key.".to_string(),
		StatusCode::PAYMENT_REQUIRED => upstream.unwrap_or_else(|| {
			"Analysis provider quota is exhausted; top up credits or lower max_tokens.".to_string()
		}),
		StatusCode::NOT_FOUND => "Analysis model is unavailable.".to_string(),
		_ => format!(
			"Analysis service returned an error ({}): {}",
			status.as_u16(),
			upstream.as_deref().or(status.canonical_reason()).unwrap_or("unknown error")
		),
	};

	Error::Status { status: status.as_u16(), message }
}

fn completion_content(json: &Value) -> Result<String> {
	json.get("choices")
		.and_then(Value::as_array)
		.and_then(|choices| choices.first())
		.and_then(|choice| choice.get("message"))
		.and_then(|message| message.get("content"))
		.and_then(Value::as_str)
		.map(|content| content.trim().to_string())
		.ok_or_else(|| Error::InvalidResponse {
			message: "Analysis response is missing message content.".to_string(),
		})
}

/// Interprets raw model output as an [`Analysis`].
///
/// Reasoning blocks and code fences are stripped first. What remains is parsed as JSON when it
/// looks like an object and kept as a prose summary otherwise.
pub fn parse_analysis(raw: &str) -> Result<Analysis> {
	let visible = strip_thinking(raw);
	let unfenced = strip_fences(&visible);
	let unfenced = unfenced.trim();

	if !unfenced.starts_with('{') {
		if visible.is_empty() {
			return Err(Error::InvalidResponse {
				message: "Analysis response is empty.".to_string(),
			});
		}

		return Ok(Analysis { summary: visible, ..Default::default() });
	}

	let parsed: Value = serde_json::from_str(unfenced).map_err(|_| {
		Error::InvalidResponse { message: "Failed to parse analysis JSON.".to_string() }
	})?;
	let Value::Object(object) = parsed else {
		return Err(Error::InvalidResponse {
			message: "Analysis JSON must be an object.".to_string(),
		});
	};

	Ok(map_object(&object))
}

fn map_object(object: &Map<String, Value>) -> Analysis {
	let tags = read_tags(object);

	for shape in &SHAPES {
		if !shape.markers.iter().any(|marker| has_marker(object, marker)) {
			continue;
		}

		tracing::debug!(shape = shape.name, "Matched analysis shape.");

		let composed = (shape.compose)(object);
		let category = read_text(object, "category");

		return Analysis {
			category: if category.is_empty() { DEFAULT_CATEGORY.to_string() } else { category },
			tags,
			summary: composed.summary,
			mental_model: composed.mental_model,
		};
	}

	Analysis {
		category: read_text(object, "category"),
		tags,
		summary: read_text(object, "summary"),
		mental_model: read_text(object, "mental_model"),
	}
}

fn strip_thinking(text: &str) -> String {
	let stripped = match Regex::new(THINKING_BLOCK_PATTERN) {
		Ok(re) => re.replace_all(text, "").into_owned(),
		Err(_) => text.to_string(),
	};
	let collapsed = match Regex::new(EXCESS_NEWLINES_PATTERN) {
		Ok(re) => re.replace_all(&stripped, "\n\n").into_owned(),
		Err(_) => stripped,
	};

	collapsed.trim().to_string()
}

fn strip_fences(text: &str) -> String {
	match Regex::new(CODE_FENCE_PATTERN) {
		Ok(re) => re.replace_all(text, "").into_owned(),
		Err(_) => text.to_string(),
	}
}

fn has_marker(object: &Map<String, Value>, key: &str) -> bool {
	matches!(object.get(key), Some(Value::String(_) | Value::Array(_)))
}

fn read_text(object: &Map<String, Value>, key: &str) -> String {
	match object.get(key) {
		Some(Value::String(text)) => text.trim().to_string(),
		Some(Value::Array(items)) => items
			.iter()
			.filter_map(scalar_to_string)
			.map(|item| item.trim().to_string())
			.filter(|item| !item.is_empty())
			.collect::<Vec<_>>()
			.join("\n"),
		Some(Value::Number(number)) => number.to_string(),
		_ => String::new(),
	}
}

fn read_tags(object: &Map<String, Value>) -> Vec<String> {
	let Some(Value::Array(items)) = object.get("tags") else {
		return Vec::new();
	};

	items
		.iter()
		.filter_map(scalar_to_string)
		.map(|tag| tag.trim().to_string())
		.filter(|tag| !tag.is_empty())
		.collect()
}

fn scalar_to_string(value: &Value) -> Option<String> {
	match value {
		Value::String(text) => Some(text.clone()),
		Value::Number(number) => Some(number.to_string()),
		Value::Bool(flag) => Some(flag.to_string()),
		_ => None,
	}
}

fn join_present(parts: &[String], separator: &str) -> String {
	parts.iter().filter(|part| !part.is_empty()).cloned().collect::<Vec<_>>().join(separator)
}

fn labeled(label: &str, value: String) -> String {
	if value.is_empty() { value } else { format!("{label}{value}") }
}

fn section(heading: &str, lines: &[String], separator: &str) -> String {
	let body = join_present(lines, separator);

	if body.is_empty() { body } else { format!("{heading}\n\n{body}") }
}

fn compose_partner(object: &Map<String, Value>) -> Composed {
	let concept = match read_text(object, "asset_concept") {
		concept if concept.is_empty() => read_text(object, "mental_model"),
		concept => concept,
	};
	let understanding = read_text(object, "understanding");
	let actions = [
		labeled("战略意图：", read_text(object, "pivot")),
		labeled("微行动：", read_text(object, "micro_action")),
		labeled("背后的意义：", read_text(object, "meaning")),
	];
	let assets = [
		if concept.is_empty() { String::new() } else { format!("概念：**【{concept}】**") },
		labeled("资产总结：", read_text(object, "asset_takeaway")),
	];
	let summary = join_present(
		&[
			section("信号解码", &[understanding], "\n"),
			section("行动指南", &actions, "\n"),
			section("心智模型", &assets, "\n"),
		],
		"\n\n",
	);

	Composed { summary, mental_model: concept }
}

fn compose_audit(object: &Map<String, Value>) -> Composed {
	let summary = join_present(
		&[
			read_text(object, "audit"),
			read_text(object, "pivot"),
			read_text(object, "insight"),
			read_text(object, "strategy"),
		],
		"\n\n",
	);

	Composed { summary, mental_model: read_text(object, "mental_model") }
}

fn compose_essentialist(object: &Map<String, Value>) -> Composed {
	let actions = [
		labeled("- 战略意图 ", read_text(object, "pivot")),
		labeled("- 关键动作 ", read_text(object, "micro_action")),
		labeled("- 背后的意义 ", read_text(object, "meaning")),
	];
	let summary = join_present(
		&[
			section("### 信号解码", &[read_text(object, "signal_decoding")], "\n\n"),
			section("### 行动指南", &actions, "\n\n"),
		],
		"\n\n---\n\n",
	);

	Composed { summary, mental_model: read_text(object, "mental_model") }
}

fn compose_accessible(object: &Map<String, Value>) -> Composed {
	let summary =
		join_present(&[read_text(object, "translation"), read_text(object, "action")], "\n\n");

	Composed { summary, mental_model: read_text(object, "mental_model") }
}

fn compose_strategist(object: &Map<String, Value>) -> Composed {
	let summary = join_present(
		&[read_text(object, "signal"), read_text(object, "reframe"), read_text(object, "leverage")],
		"\n\n",
	);

	Composed { summary, mental_model: read_text(object, "mental_model") }
}

fn compose_naval(object: &Map<String, Value>) -> Composed {
	let summary =
		join_present(&[read_text(object, "essence"), read_text(object, "action_plan")], "\n\n");

	Composed { summary, mental_model: read_text(object, "naval_quote") }
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn maps_naval_shape() {
		let raw = r#"{"essence":"E","action_plan":"A","naval_quote":"Q","category":"c","tags":["t"]}"#;
		let analysis = parse_analysis(raw).expect("parse failed");

		assert_eq!(analysis.summary, "E\n\nA");
		assert_eq!(analysis.mental_model, "Q");
		assert_eq!(analysis.category, "c");
		assert_eq!(analysis.tags, vec!["t".to_string()]);
	}

	#[test]
	fn maps_essentialist_shape_into_sections() {
		let raw = serde_json::json!({
			"signal_decoding": "You are overloaded.",
			"pivot": "Subtract.",
			"micro_action": "Drop one task.",
			"meaning": "Less load resets the fuse.",
			"mental_model": "Fuse Reset: cut load before adding effort.",
			"tags": ["overload", " focus ", ""]
		})
		.to_string();
		let analysis = parse_analysis(&raw).expect("parse failed");

		assert_eq!(
			analysis.summary,
			"### 信号解码\n\nYou are overloaded.\n\n---\n\n### 行动指南\n\n- 战略意图 Subtract.\n\n- 关键动作 Drop one task.\n\n- 背后的意义 Less load resets the fuse."
		);
		assert_eq!(analysis.mental_model, "Fuse Reset: cut load before adding effort.");
		assert_eq!(analysis.category, "mindset");
		assert_eq!(analysis.tags, vec!["overload".to_string(), "focus".to_string()]);
	}

	#[test]
	fn partner_shape_wins_over_shared_pivot() {
		let raw = serde_json::json!({
			"understanding": "U",
			"pivot": "P",
			"asset_concept": "Concept",
			"asset_takeaway": "Takeaway"
		})
		.to_string();
		let analysis = parse_analysis(&raw).expect("parse failed");

		assert_eq!(
			analysis.summary,
			"信号解码\n\nU\n\n行动指南\n\n战略意图：P\n\n心智模型\n\n概念：**【Concept】**\n资产总结：Takeaway"
		);
		assert_eq!(analysis.mental_model, "Concept");
	}

	#[test]
	fn audit_shape_joins_strategy_list() {
		let raw = serde_json::json!({
			"audit": "A",
			"insight": "I",
			"strategy": ["one", "two"],
			"mental_model": "M"
		})
		.to_string();
		let analysis = parse_analysis(&raw).expect("parse failed");

		assert_eq!(analysis.summary, "A\n\nI\n\none\ntwo");
		assert_eq!(analysis.mental_model, "M");
	}

	#[test]
	fn accessible_and_strategist_shapes() {
		let accessible =
			parse_analysis(r#"{"translation":"T","action":["x","y"]}"#).expect("parse failed");

		assert_eq!(accessible.summary, "T\n\nx\ny");

		let strategist =
			parse_analysis(r#"{"signal":"S","reframe":"R","leverage":"L"}"#).expect("parse failed");

		assert_eq!(strategist.summary, "S\n\nR\n\nL");
		assert_eq!(strategist.category, "mindset");
	}

	#[test]
	fn plain_shape_defaults_missing_fields() {
		let analysis = parse_analysis(r#"{"summary":"S","tags":["a", 3, true]}"#)
			.expect("parse failed");

		assert_eq!(analysis.summary, "S");
		assert_eq!(analysis.category, "");
		assert_eq!(analysis.mental_model, "");
		assert_eq!(analysis.tags, vec!["a".to_string(), "3".to_string(), "true".to_string()]);
	}

	#[test]
	fn prose_with_thinking_becomes_summary() {
		let raw = "<Thinking>private\nreasoning</Thinking>\n\n\n\nKeep going.\n\n\n\nOne step.";
		let analysis = parse_analysis(raw).expect("parse failed");

		assert_eq!(analysis.summary, "Keep going.\n\nOne step.");
		assert!(analysis.category.is_empty());
		assert!(analysis.tags.is_empty());
		assert!(analysis.mental_model.is_empty());
	}

	#[test]
	fn json_after_thinking_block_is_parsed() {
		let raw = "<thinking>fear of pricing</thinking>\n{\"signal_decoding\":\"S\",\"pivot\":\"P\",\
			\"micro_action\":\"A\",\"meaning\":\"M\",\"mental_model\":\"Model\",\
			\"category\":\"career\",\"tags\":[\"pricing\"]}";
		let analysis = parse_analysis(raw).expect("parse failed");

		assert_eq!(analysis.category, "career");
		assert_eq!(analysis.tags, vec!["pricing".to_string()]);
		assert_eq!(analysis.mental_model, "Model");
		assert!(analysis.summary.starts_with("### 信号解码\n\nS\n\n"));
		assert!(!analysis.summary.contains("signal_decoding"));
	}

	#[test]
	fn fenced_json_after_thinking_block_is_parsed() {
		let raw = "<thinking>plan</thinking>\n```JSON\n{\"summary\": \"S\", \"category\": \"work\"}\n```";
		let analysis = parse_analysis(raw).expect("parse failed");

		assert_eq!(analysis.summary, "S");
		assert_eq!(analysis.category, "work");
	}

	#[test]
	fn thinking_only_response_is_an_error() {
		assert!(parse_analysis("<thinking>nothing else</thinking>").is_err());
	}

	#[test]
	fn strips_code_fences_before_parsing() {
		let raw = "```json\n{\"summary\": \"S\", \"category\": \"work\"}\n```";
		let analysis = parse_analysis(raw).expect("parse failed");

		assert_eq!(analysis.summary, "S");
		assert_eq!(analysis.category, "work");
	}

	#[test]
	fn invalid_json_reports_parse_failure() {
		let err = parse_analysis("{not json").expect_err("expected parse error");

		assert_eq!(err.to_string(), "Failed to parse analysis JSON.");
	}

	#[test]
	fn maps_status_codes_to_user_messages() {
		let quota = status_error(
			StatusCode::PAYMENT_REQUIRED,
			r#"{"error":{"message":"Need more credits"}}"#,
		);

		assert_eq!(quota.to_string(), "Need more credits");
		assert_eq!(
			status_error(StatusCode::UNAUTHORIZED, "").to_string(),
			"Analysis provider rejected the API key."
		);
		assert_eq!(
			status_error(StatusCode::NOT_FOUND, "").to_string(),
			"Analysis model is unavailable."
		);
		assert_eq!(
			status_error(StatusCode::BAD_GATEWAY, r#"{"error":{"message":"upstream down"}}"#)
				.to_string(),
			"Analysis service returned an error (502): upstream down"
		);
	}

	#[test]
	fn reads_completion_content() {
		let json = serde_json::json!({
			"choices": [{ "message": { "content": "  {\"summary\": \"S\"}  " } }]
		});

		assert_eq!(completion_content(&json).expect("missing content"), "{\"summary\": \"S\"}");
		assert!(completion_content(&serde_json::json!({ "choices": [] })).is_err());
	}
}
