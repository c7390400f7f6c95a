//! Multi-strategy note search.
//!
//! Each [`SearchMode`] maps to an ordered plan of strategies. The dispatcher runs them in order
//! and returns the first non-empty result. A failing or empty strategy hands over to the next
//! one, so vector search degrades to keyword matching without surfacing an error.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{Error, NoteItem, Result, SecondBrainService};
use sb_storage::models::{MatchArgs, Note, ScoredNote};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchMode {
	/// Exact tag membership.
	Tag,
	/// Vector similarity with tag boost, falling back to keyword matching.
	#[default]
	Hybrid,
}
impl SearchMode {
	fn plan(self) -> &'static [Strategy] {
		match self {
			Self::Tag => &[Strategy::TagExact],
			Self::Hybrid => &[Strategy::VectorHybrid, Strategy::KeywordFallback],
		}
	}
}
impl FromStr for SearchMode {
	type Err = Error;

	fn from_str(raw: &str) -> Result<Self> {
		match raw.trim().to_ascii_lowercase().as_str() {
			"tag" => Ok(Self::Tag),
			"hybrid" | "" => Ok(Self::Hybrid),
			other => Err(Error::InvalidRequest {
				message: format!("mode must be one of tag or hybrid, got {other:?}."),
			}),
		}
	}
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchType {
	Tag,
	Keyword,
	Vector,
}
impl MatchType {
	/// Store rows without a recognised match type count as vector hits.
	fn from_store(raw: Option<&str>) -> Self {
		match raw {
			Some("tag") => Self::Tag,
			Some("keyword") => Self::Keyword,
			_ => Self::Vector,
		}
	}
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SearchRequest {
	pub owner_id: String,
	pub query: String,
	#[serde(default)]
	pub mode: SearchMode,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SearchItem {
	#[serde(flatten)]
	pub note: NoteItem,
	/// 1.0 for exact tag hits, cosine similarity for vector hits, absent for keyword hits.
	pub similarity: Option<f64>,
	pub match_type: MatchType,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SearchResponse {
	pub notes: Vec<SearchItem>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Strategy {
	TagExact,
	VectorHybrid,
	KeywordFallback,
}
impl fmt::Display for Strategy {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let name = match self {
			Self::TagExact => "tag_exact",
			Self::VectorHybrid => "vector_hybrid",
			Self::KeywordFallback => "keyword_fallback",
		};

		f.write_str(name)
	}
}

impl SecondBrainService {
	pub async fn search(&self, req: SearchRequest) -> Result<SearchResponse> {
		let owner_id = crate::require_owner(&req.owner_id)?;
		let query = req.query.trim();

		if query.is_empty() {
			return Ok(SearchResponse { notes: Vec::new() });
		}

		let mut settled = None;
		let mut last_err = None;

		for &strategy in req.mode.plan() {
			match self.run_strategy(strategy, owner_id, query).await {
				Ok(items) if !items.is_empty() => {
					tracing::debug!(%strategy, hits = items.len(), "Search strategy matched.");

					return Ok(SearchResponse { notes: items });
				},
				Ok(items) => {
					tracing::debug!(%strategy, "Search strategy returned no rows.");

					settled = Some(items);
				},
				Err(err) => {
					tracing::warn!(owner_id, %strategy, error = %err, "Search strategy failed.");

					last_err = Some(err);
				},
			}
		}

		match (settled, last_err) {
			(Some(items), _) => Ok(SearchResponse { notes: items }),
			(None, Some(err)) => Err(match err {
				Error::Storage { .. } => err,
				other => Error::Storage { message: other.to_string() },
			}),
			(None, None) => Ok(SearchResponse { notes: Vec::new() }),
		}
	}

	async fn run_strategy(
		&self,
		strategy: Strategy,
		owner_id: &str,
		query: &str,
	) -> Result<Vec<SearchItem>> {
		let search = &self.cfg.search;

		match strategy {
			Strategy::TagExact => {
				let notes = self.store.tag_filter(owner_id, query, search.tag_limit).await?;

				Ok(annotate(notes, Some(1.0), MatchType::Tag))
			},
			Strategy::VectorHybrid => {
				let query_embedding = self.embed_text(query).await?;
				let rows = self
					.store
					.similarity_search(MatchArgs {
						owner_id,
						query_text: query,
						query_embedding: &query_embedding,
						match_threshold: f64::from(search.match_threshold),
						match_count: search.match_count,
					})
					.await?;

				Ok(rows.into_iter().map(scored_item).collect())
			},
			Strategy::KeywordFallback => {
				let notes = self.store.keyword_filter(owner_id, query, search.keyword_limit).await?;

				Ok(annotate(notes, None, MatchType::Keyword))
			},
		}
	}
}

fn annotate(notes: Vec<Note>, similarity: Option<f64>, match_type: MatchType) -> Vec<SearchItem> {
	notes
		.into_iter()
		.map(|note| SearchItem { note: note.into(), similarity, match_type })
		.collect()
}

fn scored_item(row: ScoredNote) -> SearchItem {
	SearchItem {
		match_type: MatchType::from_store(row.match_type.as_deref()),
		similarity: Some(row.similarity),
		note: row.note.into(),
	}
}
