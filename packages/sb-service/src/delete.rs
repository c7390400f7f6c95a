use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Result, SecondBrainService};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DeleteRequest {
	pub owner_id: String,
	pub id: Uuid,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DeleteResponse {
	pub ok: bool,
	pub deleted: bool,
}

impl SecondBrainService {
	/// Deleting a note the caller does not own is a no-op, reported as `deleted: false`.
	pub async fn delete(&self, req: DeleteRequest) -> Result<DeleteResponse> {
		let owner_id = crate::require_owner(&req.owner_id)?;
		let deleted = self.store.delete(owner_id, req.id).await?;

		if deleted {
			tracing::info!(owner_id, note_id = %req.id, "Note deleted.");
		} else {
			tracing::debug!(owner_id, note_id = %req.id, "Delete matched no owned note.");
		}

		Ok(DeleteResponse { ok: true, deleted })
	}
}
