//! Resolves the caller's owner id from request headers.
//!
//! `static_keys` maps `Authorization: Bearer <token>` to the owner configured for that token.
//! `trusted_header` reads the owner id verbatim from a header set by a fronting identity proxy,
//! which is only safe when the server listens on loopback.

use std::collections::HashMap;

use axum::{
	extract::FromRequestParts,
	http::{
		HeaderMap, HeaderName,
		header::AUTHORIZATION,
		request::Parts,
	},
};
use color_eyre::{Result, eyre};

use sb_config::Security;

use crate::{routes::ApiError, state::AppState};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AuthGate {
	StaticKeys { owners_by_token: HashMap<String, String> },
	TrustedHeader { header: HeaderName },
}
impl AuthGate {
	pub fn from_security(security: &Security) -> Result<Self> {
		match security.auth_mode.trim() {
			"static_keys" => {
				let mut owners_by_token = HashMap::new();

				for key in &security.auth_keys {
					if owners_by_token
						.insert(key.token.trim().to_string(), key.owner_id.trim().to_string())
						.is_some()
					{
						return Err(eyre::eyre!(
							"security.auth_keys token for token_id {} duplicates another key.",
							key.token_id
						));
					}
				}

				if owners_by_token.is_empty() {
					return Err(eyre::eyre!(
						"security.auth_mode=static_keys requires at least one entry in security.auth_keys."
					));
				}

				Ok(Self::StaticKeys { owners_by_token })
			},
			"trusted_header" => {
				if !security.bind_localhost_only {
					return Err(eyre::eyre!(
						"security.bind_localhost_only must be true when security.auth_mode=trusted_header."
					));
				}

				let header = HeaderName::from_bytes(security.owner_header.trim().as_bytes())
					.map_err(|err| eyre::eyre!("security.owner_header is not a valid header: {err}"))?;

				Ok(Self::TrustedHeader { header })
			},
			other => Err(eyre::eyre!(
				"security.auth_mode must be one of static_keys or trusted_header, got {other}."
			)),
		}
	}

	/// Returns the owner id for a request, or `None` when the caller is not identified.
	pub fn resolve(&self, headers: &HeaderMap) -> Option<String> {
		match self {
			Self::StaticKeys { owners_by_token } =>
				read_bearer_token(headers).and_then(|token| owners_by_token.get(token)).cloned(),
			Self::TrustedHeader { header } => {
				let value = headers.get(header)?.to_str().ok()?.trim();

				if value.is_empty() { None } else { Some(value.to_string()) }
			},
		}
	}
}

/// The authenticated owner of the current request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Owner(pub String);
impl FromRequestParts<AppState> for Owner {
	type Rejection = ApiError;

	async fn from_request_parts(
		parts: &mut Parts,
		state: &AppState,
	) -> Result<Self, Self::Rejection> {
		match state.auth.resolve(&parts.headers) {
			Some(owner_id) => Ok(Self(owner_id)),
			None => {
				tracing::warn!(path = %parts.uri.path(), "Rejected unauthenticated request.");

				Err(ApiError::unauthorized())
			},
		}
	}
}

fn read_bearer_token(headers: &HeaderMap) -> Option<&str> {
	let raw = headers.get(AUTHORIZATION)?;
	let value = raw.to_str().ok()?.trim();
	let token = value.strip_prefix("Bearer ")?.trim();

	if token.is_empty() { None } else { Some(token) }
}

#[cfg(test)]
mod tests {
	use axum::http::{HeaderMap, header::AUTHORIZATION};

	use crate::auth::AuthGate;
	use sb_config::{Security, SecurityAuthKey};

	fn sample_security(auth_mode: &str, auth_keys: Vec<SecurityAuthKey>) -> Security {
		Security {
			bind_localhost_only: true,
			auth_mode: auth_mode.to_string(),
			owner_header: "x-sb-owner-id".to_string(),
			auth_keys,
		}
	}

	fn sample_key(token_id: &str, token: &str, owner_id: &str) -> SecurityAuthKey {
		SecurityAuthKey {
			token_id: token_id.to_string(),
			token: token.to_string(),
			owner_id: owner_id.to_string(),
		}
	}

	fn bearer(token: &str) -> HeaderMap {
		let mut headers = HeaderMap::new();

		headers.insert(AUTHORIZATION, format!("Bearer {token}").parse().expect("valid header"));

		headers
	}

	#[test]
	fn static_keys_resolve_owner_per_token() {
		let security = sample_security(
			"static_keys",
			vec![sample_key("laptop", "token-a", "owner-a"), sample_key("phone", "token-b", "owner-b")],
		);
		let gate = AuthGate::from_security(&security).expect("auth gate");

		assert_eq!(gate.resolve(&bearer("token-a")).as_deref(), Some("owner-a"));
		assert_eq!(gate.resolve(&bearer("token-b")).as_deref(), Some("owner-b"));
		assert_eq!(gate.resolve(&bearer("token-c")), None);
		assert_eq!(gate.resolve(&HeaderMap::new()), None);
	}

	#[test]
	fn static_keys_reject_non_bearer_schemes() {
		let security =
			sample_security("static_keys", vec![sample_key("laptop", "token-a", "owner-a")]);
		let gate = AuthGate::from_security(&security).expect("auth gate");
		let mut headers = HeaderMap::new();

		headers.insert(AUTHORIZATION, "bearer token-a".parse().expect("valid header"));

		assert_eq!(gate.resolve(&headers), None);
	}

	#[test]
	fn static_keys_require_keys() {
		let err = AuthGate::from_security(&sample_security("static_keys", vec![]))
			.expect_err("expected error");

		assert!(err.to_string().contains("at least one entry"), "unexpected error: {err}");
	}

	#[test]
	fn trusted_header_reads_owner_and_ignores_blank_values() {
		let gate = AuthGate::from_security(&sample_security("trusted_header", vec![]))
			.expect("auth gate");
		let mut headers = HeaderMap::new();

		headers.insert("x-sb-owner-id", " owner-a ".parse().expect("valid header"));

		assert_eq!(gate.resolve(&headers).as_deref(), Some("owner-a"));

		headers.insert("x-sb-owner-id", "   ".parse().expect("valid header"));

		assert_eq!(gate.resolve(&headers), None);
	}

	#[test]
	fn trusted_header_requires_loopback_binding() {
		let mut security = sample_security("trusted_header", vec![]);

		security.bind_localhost_only = false;

		let err = AuthGate::from_security(&security).expect_err("expected error");

		assert!(err.to_string().contains("bind_localhost_only"), "unexpected error: {err}");
	}

	#[test]
	fn unknown_mode_is_rejected() {
		let err =
			AuthGate::from_security(&sample_security("off", vec![])).expect_err("expected error");

		assert!(err.to_string().contains("security.auth_mode"), "unexpected error: {err}");
	}
}
