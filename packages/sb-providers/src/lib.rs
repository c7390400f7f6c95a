pub mod embedding;
pub mod enrichment;

mod error;

pub use error::{Error, Result};

use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderName};
use serde_json::{Map, Value};

pub fn auth_headers(api_key: &str, default_headers: &Map<String, Value>) -> Result<HeaderMap> {
	let mut headers = HeaderMap::new();

	headers.insert(AUTHORIZATION, format!("Bearer {api_key}").parse()?);

	for (key, value) in default_headers {
		let Some(raw) = value.as_str() else {
			return Err(Error::InvalidConfig {
				message: "Default header values must be strings.".to_string(),
			});
		};

		headers.insert(HeaderName::from_bytes(key.as_bytes())?, raw.parse()?);
	}

	Ok(headers)
}

/// Pulls `error.message` (or a bare `error` string) out of an upstream error body.
pub(crate) fn upstream_message(body: &str) -> Option<String> {
	let json: Value = serde_json::from_str(body).ok()?;
	let error = json.get("error")?;
	let message = match error {
		Value::String(message) => message.as_str(),
		_ => error.get("message").and_then(Value::as_str)?,
	};
	let message = message.trim();

	if message.is_empty() { None } else { Some(message.to_string()) }
}
