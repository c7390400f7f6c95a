use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{Error, NoteItem, Result, SecondBrainService};
use sb_storage::models::NewNote;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CreateNoteRequest {
	pub owner_id: String,
	pub content: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CreateNoteResponse {
	pub note: NoteItem,
}

impl SecondBrainService {
	/// Enriches, embeds, then persists a note. Any stage failure aborts the whole request.
	pub async fn create_note(&self, req: CreateNoteRequest) -> Result<CreateNoteResponse> {
		let owner_id = crate::require_owner(&req.owner_id)?;
		let content = req.content.as_str();

		if content.trim().is_empty() {
			return Err(Error::InvalidRequest { message: "content must be non-empty.".to_string() });
		}

		let max_chars = self.cfg.notes.max_content_chars as usize;

		if content.chars().count() > max_chars {
			return Err(Error::InvalidRequest {
				message: format!("content must be at most {max_chars} characters."),
			});
		}

		let analysis = self
			.providers
			.enrichment
			.analyze(&self.cfg.providers.enrichment, content)
			.await
			.map_err(|err| {
				tracing::warn!(owner_id, stage = "enrichment", error = %err, "Note enrichment failed.");

				Error::Enrichment { message: err.to_string() }
			})?;
		let embedding_input = format!("{content}\n\nSummary: {}", analysis.summary);
		let embedding = self.embed_text(&embedding_input).await.inspect_err(|err| {
			tracing::warn!(owner_id, stage = "embedding", error = %err, "Note embedding failed.");
		})?;
		let new_note = NewNote {
			id: Uuid::new_v4(),
			owner_id: owner_id.to_string(),
			content: content.to_string(),
			category: Some(analysis.category),
			summary: Some(analysis.summary),
			mental_model: Some(analysis.mental_model),
			tags: analysis.tags,
			embedding,
			created_at: OffsetDateTime::now_utc(),
		};
		let note = self.store.insert(&new_note).await.map_err(|err| {
			tracing::error!(
				owner_id,
				note_id = %new_note.id,
				stage = "persist",
				error = %err,
				"Failed to save note."
			);

			Error::from(err)
		})?;

		tracing::info!(owner_id, note_id = %note.id, tags = note.tags.len(), "Note created.");

		Ok(CreateNoteResponse { note: note.into() })
	}
}
