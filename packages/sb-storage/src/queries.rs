use sqlx::PgPool;
use uuid::Uuid;

use crate::{
	Result,
	models::{MatchArgs, NewNote, Note, ScoredNote},
	vector,
};

pub async fn insert_note(pool: &PgPool, note: &NewNote) -> Result<Note> {
	vector::ensure_finite(&note.embedding)?;

	let row = sqlx::query_as::<_, Note>(
		"\
INSERT INTO notes (
	id,
	owner_id,
	content,
	category,
	summary,
	mental_model,
	tags,
	embedding,
	created_at
)
VALUES ($1, $2, $3, $4, $5, $6, $7, $8::text::vector, $9)
RETURNING id, owner_id, content, category, summary, mental_model, tags, created_at",
	)
	.bind(note.id)
	.bind(note.owner_id.as_str())
	.bind(note.content.as_str())
	.bind(note.category.as_deref())
	.bind(note.summary.as_deref())
	.bind(note.mental_model.as_deref())
	.bind(&note.tags)
	.bind(vector::vector_to_pg(&note.embedding))
	.bind(note.created_at)
	.fetch_one(pool)
	.await?;

	Ok(row)
}

pub async fn list_notes(
	pool: &PgPool,
	owner_id: &str,
	limit: u32,
	offset: u64,
) -> Result<Vec<Note>> {
	let rows = sqlx::query_as::<_, Note>(
		"\
SELECT id, owner_id, content, category, summary, mental_model, tags, created_at
FROM notes
WHERE owner_id = $1
ORDER BY created_at DESC, id DESC
LIMIT $2
OFFSET $3",
	)
	.bind(owner_id)
	.bind(i64::from(limit))
	.bind(i64::try_from(offset).unwrap_or(i64::MAX))
	.fetch_all(pool)
	.await?;

	Ok(rows)
}

pub async fn count_notes(pool: &PgPool, owner_id: &str) -> Result<u64> {
	let count: i64 = sqlx::query_scalar("SELECT count(*) FROM notes WHERE owner_id = $1")
		.bind(owner_id)
		.fetch_one(pool)
		.await?;

	Ok(count.max(0) as u64)
}

pub async fn delete_note(pool: &PgPool, owner_id: &str, id: Uuid) -> Result<bool> {
	let result = sqlx::query("DELETE FROM notes WHERE id = $1 AND owner_id = $2")
		.bind(id)
		.bind(owner_id)
		.execute(pool)
		.await?;

	Ok(result.rows_affected() > 0)
}

pub async fn match_notes(pool: &PgPool, args: &MatchArgs<'_>) -> Result<Vec<ScoredNote>> {
	vector::ensure_finite(args.query_embedding)?;

	let rows = sqlx::query_as::<_, ScoredNote>(
		"\
SELECT
	id, owner_id, content, category, summary, mental_model, tags, created_at,
	similarity, match_type
FROM match_notes($1, $2::text::vector, $3, $4, $5)",
	)
	.bind(args.query_text)
	.bind(vector::vector_to_pg(args.query_embedding))
	.bind(args.match_threshold)
	.bind(i32::try_from(args.match_count).unwrap_or(i32::MAX))
	.bind(args.owner_id)
	.fetch_all(pool)
	.await?;

	Ok(rows)
}

pub async fn notes_with_tag(
	pool: &PgPool,
	owner_id: &str,
	tag: &str,
	limit: u32,
) -> Result<Vec<Note>> {
	let rows = sqlx::query_as::<_, Note>(
		"\
SELECT id, owner_id, content, category, summary, mental_model, tags, created_at
FROM notes
WHERE owner_id = $1 AND tags @> ARRAY[$2]::text[]
ORDER BY created_at DESC, id DESC
LIMIT $3",
	)
	.bind(owner_id)
	.bind(tag)
	.bind(i64::from(limit))
	.fetch_all(pool)
	.await?;

	Ok(rows)
}

pub async fn notes_matching_keyword(
	pool: &PgPool,
	owner_id: &str,
	query: &str,
	limit: u32,
) -> Result<Vec<Note>> {
	let pattern = format!("%{}%", escape_like(query));
	let rows = sqlx::query_as::<_, Note>(
		"\
SELECT id, owner_id, content, category, summary, mental_model, tags, created_at
FROM notes
WHERE owner_id = $1
	AND (
		content ILIKE $2 ESCAPE '\\'
		OR summary ILIKE $2 ESCAPE '\\'
		OR mental_model ILIKE $2 ESCAPE '\\'
	)
ORDER BY created_at DESC, id DESC
LIMIT $3",
	)
	.bind(owner_id)
	.bind(pattern)
	.bind(i64::from(limit))
	.fetch_all(pool)
	.await?;

	Ok(rows)
}

/// Tag sets of the owner's most recent notes.
pub async fn recent_tag_sets(
	pool: &PgPool,
	owner_id: &str,
	sample_limit: u32,
) -> Result<Vec<Vec<String>>> {
	let rows: Vec<(Vec<String>,)> = sqlx::query_as(
		"\
SELECT tags
FROM notes
WHERE owner_id = $1
ORDER BY created_at DESC, id DESC
LIMIT $2",
	)
	.bind(owner_id)
	.bind(i64::from(sample_limit))
	.fetch_all(pool)
	.await?;

	Ok(rows.into_iter().map(|(tags,)| tags).collect())
}

pub fn escape_like(query: &str) -> String {
	let mut out = String::with_capacity(query.len());

	for ch in query.chars() {
		if matches!(ch, '\\' | '%' | '_') {
			out.push('\\');
		}

		out.push(ch);
	}

	out
}
