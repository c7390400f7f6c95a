use serde::Deserialize;
use serde_json::{Map, Value};

#[derive(Debug, Deserialize)]
pub struct Config {
	pub service: Service,
	pub storage: Storage,
	pub providers: Providers,
	#[serde(default)]
	pub notes: Notes,
	#[serde(default)]
	pub search: Search,
	#[serde(default)]
	pub tags: Tags,
	pub security: Security,
}

#[derive(Debug, Deserialize)]
pub struct Service {
	pub http_bind: String,
	pub log_level: String,
}

#[derive(Debug, Deserialize)]
pub struct Storage {
	pub postgres: Postgres,
}

#[derive(Debug, Deserialize)]
pub struct Postgres {
	pub dsn: String,
	pub pool_max_conns: u32,
}

#[derive(Debug, Deserialize)]
pub struct Providers {
	pub embedding: EmbeddingProviderConfig,
	pub enrichment: EnrichmentProviderConfig,
}

#[derive(Debug, Deserialize)]
pub struct EmbeddingProviderConfig {
	pub provider_id: String,
	pub api_base: String,
	pub api_key: String,
	pub path: String,
	pub model: String,
	pub dimensions: u32,
	pub timeout_ms: u64,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
pub struct EnrichmentProviderConfig {
	pub provider_id: String,
	pub api_base: String,
	pub api_key: String,
	pub path: String,
	pub model: String,
	pub temperature: f32,
	pub max_tokens: u32,
	pub timeout_ms: u64,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
	/// Optional. Replaces the built-in insight-card prompt.
	#[serde(default)]
	pub system_prompt: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Notes {
	/// Rows per page for paginated listing.
	pub page_size: u32,
	/// Row count when a listing names neither a page nor a limit.
	pub default_limit: u32,
	/// Upper bound applied to caller-supplied limits.
	pub max_limit: u32,
	pub max_content_chars: u32,
}
impl Default for Notes {
	fn default() -> Self {
		Self { page_size: 20, default_limit: 20, max_limit: 500, max_content_chars: 20_000 }
	}
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Search {
	/// Minimum cosine similarity a vector hit must exceed.
	pub match_threshold: f32,
	pub match_count: u32,
	pub keyword_limit: u32,
	pub tag_limit: u32,
}
impl Default for Search {
	fn default() -> Self {
		Self { match_threshold: 0.3, match_count: 50, keyword_limit: 50, tag_limit: 50 }
	}
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Tags {
	/// Number of most recent notes sampled for tag counts.
	pub sample_limit: u32,
	pub top_n: u32,
}
impl Default for Tags {
	fn default() -> Self {
		Self { sample_limit: 1_000, top_n: 30 }
	}
}

#[derive(Debug, Deserialize)]
pub struct Security {
	pub bind_localhost_only: bool,
	/// One of "static_keys" or "trusted_header".
	pub auth_mode: String,
	#[serde(default = "default_owner_header")]
	pub owner_header: String,
	#[serde(default)]
	pub auth_keys: Vec<SecurityAuthKey>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SecurityAuthKey {
	pub token_id: String,
	pub token: String,
	pub owner_id: String,
}

fn default_owner_header() -> String {
	"x-sb-owner-id".to_string()
}
