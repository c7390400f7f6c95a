use std::{
	env, fs,
	path::PathBuf,
	sync::atomic::{AtomicU64, Ordering},
	time::{SystemTime, UNIX_EPOCH},
};

use toml::Value;

use sb_config::{Config, SecurityAuthKey};

const SAMPLE_CONFIG_TEMPLATE_TOML: &str = include_str!("fixtures/sample_config.template.toml");

fn sample_toml_with(section: &str, key: &str, value: Value) -> String {
	let mut root: Value =
		toml::from_str(SAMPLE_CONFIG_TEMPLATE_TOML).expect("Failed to parse template config.");
	let mut table = root.as_table_mut().expect("Template config must be a table.");

	for part in section.split('.') {
		table = table
			.get_mut(part)
			.and_then(Value::as_table_mut)
			.unwrap_or_else(|| panic!("Template config must include [{section}]."));
	}

	table.insert(key.to_string(), value);

	toml::to_string(&root).expect("Failed to render template config.")
}

fn write_temp_config(payload: String) -> PathBuf {
	static COUNTER: AtomicU64 = AtomicU64::new(0);

	let nanos = SystemTime::now()
		.duration_since(UNIX_EPOCH)
		.expect("System time must be valid.")
		.as_nanos();
	let ordinal = COUNTER.fetch_add(1, Ordering::SeqCst);
	let pid = std::process::id();
	let mut path = env::temp_dir();

	path.push(format!("sb_config_test_{nanos}_{pid}_{ordinal}.toml"));

	fs::write(&path, payload).expect("Failed to write test config.");

	path
}

fn base_config() -> Config {
	toml::from_str(SAMPLE_CONFIG_TEMPLATE_TOML).expect("Failed to parse test config.")
}

fn load_payload(payload: String) -> sb_config::Result<Config> {
	let path = write_temp_config(payload);
	let result = sb_config::load(&path);

	fs::remove_file(&path).expect("Failed to remove test config.");

	result
}

#[test]
fn sample_config_is_valid() {
	let cfg = load_payload(SAMPLE_CONFIG_TEMPLATE_TOML.to_string())
		.expect("Sample config must load.");

	assert_eq!(cfg.providers.embedding.dimensions, 1_536);
	assert_eq!(cfg.providers.enrichment.max_tokens, 4_096);
	assert_eq!(cfg.security.owner_header, "x-sb-owner-id");
	assert_eq!(
		cfg.providers.embedding.default_headers.get("X-Title").and_then(|v| v.as_str()),
		Some("Second Brain App")
	);
}

#[test]
fn optional_sections_fall_back_to_defaults() {
	let mut root: Value =
		toml::from_str(SAMPLE_CONFIG_TEMPLATE_TOML).expect("Failed to parse template config.");
	let table = root.as_table_mut().expect("Template config must be a table.");

	table.remove("notes");
	table.remove("search");
	table.remove("tags");

	let cfg = load_payload(toml::to_string(&root).expect("Failed to render template config."))
		.expect("Config without optional sections must load.");

	assert_eq!(cfg.notes.page_size, 20);
	assert_eq!(cfg.search.match_count, 50);
	assert!((cfg.search.match_threshold - 0.3).abs() < f32::EPSILON);
	assert_eq!(cfg.tags.sample_limit, 1_000);
	assert_eq!(cfg.tags.top_n, 30);
}

#[test]
fn embedding_dimensions_must_be_positive() {
	let err = load_payload(sample_toml_with("providers.embedding", "dimensions", Value::Integer(0)))
		.expect_err("Expected dimensions validation error.");

	assert!(
		err.to_string().contains("providers.embedding.dimensions must be greater than zero."),
		"Unexpected error: {err}"
	);
}

#[test]
fn match_threshold_must_be_in_unit_range() {
	let err = load_payload(sample_toml_with("search", "match_threshold", Value::Float(1.5)))
		.expect_err("Expected threshold validation error.");

	assert!(
		err.to_string().contains("search.match_threshold must be in the range 0.0-1.0."),
		"Unexpected error: {err}"
	);
}

#[test]
fn default_limit_cannot_exceed_max_limit() {
	let mut cfg = base_config();

	cfg.notes.default_limit = 600;

	let err = sb_config::validate(&cfg).expect_err("Expected limit validation error.");

	assert!(
		err.to_string().contains("notes.default_limit must be at most notes.max_limit."),
		"Unexpected error: {err}"
	);
}

#[test]
fn provider_api_keys_must_be_non_empty() {
	let mut cfg = base_config();

	cfg.providers.enrichment.api_key = "  ".to_string();

	let err = sb_config::validate(&cfg).expect_err("Expected api_key validation error.");

	assert!(
		err.to_string().contains("Provider enrichment api_key must be non-empty."),
		"Unexpected error: {err}"
	);
}

#[test]
fn unknown_auth_mode_is_rejected() {
	let err = load_payload(sample_toml_with(
		"security",
		"auth_mode",
		Value::String("off".to_string()),
	))
	.expect_err("Expected auth_mode validation error.");

	assert!(
		err.to_string().contains("security.auth_mode must be one of static_keys or trusted_header."),
		"Unexpected error: {err}"
	);
}

#[test]
fn static_keys_require_unique_tokens() {
	let mut cfg = base_config();

	cfg.security.auth_keys.push(SecurityAuthKey {
		token_id: "phone".to_string(),
		token: "token-a".to_string(),
		owner_id: "owner-b".to_string(),
	});

	let err = sb_config::validate(&cfg).expect_err("Expected duplicate token error.");

	assert!(err.to_string().contains("duplicates another key"), "Unexpected error: {err}");
}

#[test]
fn trusted_header_requires_loopback_binding() {
	let mut cfg = base_config();

	cfg.security.auth_mode = "trusted_header".to_string();
	cfg.security.bind_localhost_only = false;

	let err = sb_config::validate(&cfg).expect_err("Expected trusted_header validation error.");

	assert!(
		err.to_string().contains(
			"security.bind_localhost_only must be true when security.auth_mode is trusted_header."
		),
		"Unexpected error: {err}"
	);
}

#[test]
fn blank_system_prompt_normalizes_to_none() {
	let payload = sample_toml_with(
		"providers.enrichment",
		"system_prompt",
		Value::String("   ".to_string()),
	);
	let cfg = load_payload(payload).expect("Config with blank prompt must load.");

	assert!(cfg.providers.enrichment.system_prompt.is_none());
}
