use serde::{Deserialize, Serialize};

use crate::{Error, NoteItem, Result, SecondBrainService};

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ListRequest {
	pub owner_id: String,
	/// 1-based page number. Takes precedence over `limit`.
	pub page: Option<u32>,
	pub limit: Option<u32>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ListResponse {
	pub notes: Vec<NoteItem>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub total: Option<u64>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub page: Option<u32>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub page_size: Option<u32>,
}

impl SecondBrainService {
	pub async fn list(&self, req: ListRequest) -> Result<ListResponse> {
		let owner_id = crate::require_owner(&req.owner_id)?;

		if req.page == Some(0) {
			return Err(Error::InvalidRequest { message: "page must be at least 1.".to_string() });
		}
		if req.limit == Some(0) {
			return Err(Error::InvalidRequest { message: "limit must be at least 1.".to_string() });
		}

		if let Some(page) = req.page {
			let page_size = self.cfg.notes.page_size;
			let result = self.store.list_page(owner_id, page, page_size).await?;

			return Ok(ListResponse {
				notes: result.notes.into_iter().map(NoteItem::from).collect(),
				total: Some(result.total),
				page: Some(page),
				page_size: Some(page_size),
			});
		}

		let limit = req.limit.unwrap_or(self.cfg.notes.default_limit).min(self.cfg.notes.max_limit);
		let notes = self.store.list_recent(owner_id, limit).await?;

		Ok(ListResponse {
			notes: notes.into_iter().map(NoteItem::from).collect(),
			total: None,
			page: None,
			page_size: None,
		})
	}
}
