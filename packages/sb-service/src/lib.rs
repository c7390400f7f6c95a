pub mod create_note;
pub mod delete;
pub mod list;
pub mod search;
pub mod tags;
pub mod time_serde;

mod error;

pub use create_note::{CreateNoteRequest, CreateNoteResponse};
pub use delete::{DeleteRequest, DeleteResponse};
pub use error::{Error, Result};
pub use list::{ListRequest, ListResponse};
pub use sb_providers::enrichment::Analysis;
pub use sb_storage::store::BoxFuture;
pub use search::{MatchType, SearchItem, SearchMode, SearchRequest, SearchResponse};
pub use tags::{TagCountItem, TagsRequest, TagsResponse};

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use sb_config::{Config, EmbeddingProviderConfig, EnrichmentProviderConfig};
use sb_providers::{embedding, enrichment};
use sb_storage::{models::Note, store::NoteStore};

pub trait EmbeddingProvider
where
	Self: Send + Sync,
{
	fn embed<'a>(
		&'a self,
		cfg: &'a EmbeddingProviderConfig,
		text: &'a str,
	) -> BoxFuture<'a, sb_providers::Result<Vec<f32>>>;
}

pub trait EnrichmentProvider
where
	Self: Send + Sync,
{
	fn analyze<'a>(
		&'a self,
		cfg: &'a EnrichmentProviderConfig,
		content: &'a str,
	) -> BoxFuture<'a, sb_providers::Result<Analysis>>;
}

#[derive(Clone)]
pub struct Providers {
	pub embedding: Arc<dyn EmbeddingProvider>,
	pub enrichment: Arc<dyn EnrichmentProvider>,
}
impl Providers {
	pub fn new(
		embedding: Arc<dyn EmbeddingProvider>,
		enrichment: Arc<dyn EnrichmentProvider>,
	) -> Self {
		Self { embedding, enrichment }
	}
}
impl Default for Providers {
	fn default() -> Self {
		let provider = Arc::new(DefaultProviders);

		Self { embedding: provider.clone(), enrichment: provider }
	}
}

/// A note as returned to callers. The embedding stays in the store.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NoteItem {
	pub id: Uuid,
	pub content: String,
	pub category: Option<String>,
	pub summary: Option<String>,
	pub mental_model: Option<String>,
	pub tags: Vec<String>,
	#[serde(with = "crate::time_serde")]
	pub created_at: OffsetDateTime,
}
impl From<Note> for NoteItem {
	fn from(note: Note) -> Self {
		Self {
			id: note.id,
			content: note.content,
			category: note.category,
			summary: note.summary,
			mental_model: note.mental_model,
			tags: note.tags,
			created_at: note.created_at,
		}
	}
}

pub struct SecondBrainService {
	pub cfg: Config,
	pub store: Arc<dyn NoteStore>,
	pub providers: Providers,
}
impl SecondBrainService {
	pub fn new(cfg: Config, store: Arc<dyn NoteStore>) -> Self {
		Self::with_providers(cfg, store, Providers::default())
	}

	pub fn with_providers(cfg: Config, store: Arc<dyn NoteStore>, providers: Providers) -> Self {
		Self { cfg, store, providers }
	}

	/// Embeds `text` and checks the vector against the configured dimensions.
	pub(crate) async fn embed_text(&self, text: &str) -> Result<Vec<f32>> {
		let cfg = &self.cfg.providers.embedding;
		let vector = self
			.providers
			.embedding
			.embed(cfg, text)
			.await
			.map_err(|err| Error::Embedding { message: err.to_string() })?;

		if vector.len() != cfg.dimensions as usize {
			return Err(Error::Embedding {
				message: format!(
					"Embedding dimension mismatch: expected {}, got {}.",
					cfg.dimensions,
					vector.len()
				),
			});
		}

		Ok(vector)
	}
}

struct DefaultProviders;

impl EmbeddingProvider for DefaultProviders {
	fn embed<'a>(
		&'a self,
		cfg: &'a EmbeddingProviderConfig,
		text: &'a str,
	) -> BoxFuture<'a, sb_providers::Result<Vec<f32>>> {
		Box::pin(embedding::embed(cfg, text))
	}
}

impl EnrichmentProvider for DefaultProviders {
	fn analyze<'a>(
		&'a self,
		cfg: &'a EnrichmentProviderConfig,
		content: &'a str,
	) -> BoxFuture<'a, sb_providers::Result<Analysis>> {
		Box::pin(enrichment::analyze(cfg, content))
	}
}

pub(crate) fn require_owner(owner_id: &str) -> Result<&str> {
	let owner_id = owner_id.trim();

	if owner_id.is_empty() {
		return Err(Error::InvalidRequest { message: "owner_id is required.".to_string() });
	}

	Ok(owner_id)
}
