use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, sqlx::FromRow)]
pub struct Note {
	pub id: Uuid,
	pub owner_id: String,
	pub content: String,
	pub category: Option<String>,
	pub summary: Option<String>,
	pub mental_model: Option<String>,
	pub tags: Vec<String>,
	pub created_at: OffsetDateTime,
}

/// Row ready for insertion. `embedding` never leaves the store once written.
#[derive(Clone, Debug)]
pub struct NewNote {
	pub id: Uuid,
	pub owner_id: String,
	pub content: String,
	pub category: Option<String>,
	pub summary: Option<String>,
	pub mental_model: Option<String>,
	pub tags: Vec<String>,
	pub embedding: Vec<f32>,
	pub created_at: OffsetDateTime,
}

#[derive(Clone, Debug, sqlx::FromRow)]
pub struct ScoredNote {
	#[sqlx(flatten)]
	pub note: Note,
	pub similarity: f64,
	pub match_type: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TagCount {
	pub tag: String,
	pub count: u64,
}

#[derive(Clone, Debug)]
pub struct NotePage {
	pub notes: Vec<Note>,
	pub total: u64,
}

pub struct MatchArgs<'a> {
	pub owner_id: &'a str,
	pub query_text: &'a str,
	pub query_embedding: &'a [f32],
	pub match_threshold: f64,
	pub match_count: u32,
}
