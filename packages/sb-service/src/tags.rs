use serde::{Deserialize, Serialize};

use crate::{Result, SecondBrainService};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TagsRequest {
	pub owner_id: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagCountItem {
	pub tag: String,
	pub count: u64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TagsResponse {
	pub tags: Vec<TagCountItem>,
}

impl SecondBrainService {
	pub async fn tags(&self, req: TagsRequest) -> Result<TagsResponse> {
		let owner_id = crate::require_owner(&req.owner_id)?;
		let counts = self
			.store
			.count_tags(owner_id, self.cfg.tags.sample_limit, self.cfg.tags.top_n)
			.await?;

		Ok(TagsResponse {
			tags: counts
				.into_iter()
				.map(|count| TagCountItem { tag: count.tag, count: count.count })
				.collect(),
		})
	}
}
