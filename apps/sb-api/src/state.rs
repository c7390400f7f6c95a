use std::sync::Arc;

use sb_service::SecondBrainService;
use sb_storage::db::Db;

use crate::auth::AuthGate;

#[derive(Clone)]
pub struct AppState {
	pub service: Arc<SecondBrainService>,
	pub auth: Arc<AuthGate>,
}
impl AppState {
	pub async fn new(config: sb_config::Config) -> color_eyre::Result<Self> {
		let auth = AuthGate::from_security(&config.security)?;
		let db = Db::connect(&config.storage.postgres).await?;

		db.ensure_schema(config.providers.embedding.dimensions).await?;

		let service = SecondBrainService::new(config, Arc::new(db));

		Ok(Self::from_parts(service, auth))
	}

	pub fn from_parts(service: SecondBrainService, auth: AuthGate) -> Self {
		Self { service: Arc::new(service), auth: Arc::new(auth) }
	}
}
