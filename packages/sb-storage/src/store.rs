use std::{future::Future, pin::Pin};

use uuid::Uuid;

use crate::{
	Error, Result,
	db::Db,
	models::{MatchArgs, NewNote, Note, NotePage, ScoredNote, TagCount},
	queries, tags,
};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Owner-scoped note persistence. Every read and write is filtered by `owner_id`.
pub trait NoteStore
where
	Self: Send + Sync,
{
	fn insert<'a>(&'a self, note: &'a NewNote) -> BoxFuture<'a, Result<Note>>;

	/// `page` is 1-based.
	fn list_page<'a>(
		&'a self,
		owner_id: &'a str,
		page: u32,
		page_size: u32,
	) -> BoxFuture<'a, Result<NotePage>>;

	fn list_recent<'a>(&'a self, owner_id: &'a str, limit: u32)
	-> BoxFuture<'a, Result<Vec<Note>>>;

	fn count<'a>(&'a self, owner_id: &'a str) -> BoxFuture<'a, Result<u64>>;

	/// Returns `false` when no row with `id` belongs to `owner_id`.
	fn delete<'a>(&'a self, owner_id: &'a str, id: Uuid) -> BoxFuture<'a, Result<bool>>;

	fn similarity_search<'a>(
		&'a self,
		args: MatchArgs<'a>,
	) -> BoxFuture<'a, Result<Vec<ScoredNote>>>;

	fn tag_filter<'a>(
		&'a self,
		owner_id: &'a str,
		tag: &'a str,
		limit: u32,
	) -> BoxFuture<'a, Result<Vec<Note>>>;

	fn keyword_filter<'a>(
		&'a self,
		owner_id: &'a str,
		query: &'a str,
		limit: u32,
	) -> BoxFuture<'a, Result<Vec<Note>>>;

	fn count_tags<'a>(
		&'a self,
		owner_id: &'a str,
		sample_limit: u32,
		top_n: u32,
	) -> BoxFuture<'a, Result<Vec<TagCount>>>;
}

pub fn page_offset(page: u32, page_size: u32) -> Result<u64> {
	if page == 0 || page_size == 0 {
		return Err(Error::InvalidArgument("page and page_size must be at least 1.".to_string()));
	}

	Ok(u64::from(page - 1) * u64::from(page_size))
}

impl NoteStore for Db {
	fn insert<'a>(&'a self, note: &'a NewNote) -> BoxFuture<'a, Result<Note>> {
		Box::pin(queries::insert_note(&self.pool, note))
	}

	fn list_page<'a>(
		&'a self,
		owner_id: &'a str,
		page: u32,
		page_size: u32,
	) -> BoxFuture<'a, Result<NotePage>> {
		Box::pin(async move {
			let offset = page_offset(page, page_size)?;
			let notes = queries::list_notes(&self.pool, owner_id, page_size, offset).await?;
			let total = queries::count_notes(&self.pool, owner_id).await?;

			Ok(NotePage { notes, total })
		})
	}

	fn list_recent<'a>(
		&'a self,
		owner_id: &'a str,
		limit: u32,
	) -> BoxFuture<'a, Result<Vec<Note>>> {
		Box::pin(queries::list_notes(&self.pool, owner_id, limit, 0))
	}

	fn count<'a>(&'a self, owner_id: &'a str) -> BoxFuture<'a, Result<u64>> {
		Box::pin(queries::count_notes(&self.pool, owner_id))
	}

	fn delete<'a>(&'a self, owner_id: &'a str, id: Uuid) -> BoxFuture<'a, Result<bool>> {
		Box::pin(queries::delete_note(&self.pool, owner_id, id))
	}

	fn similarity_search<'a>(
		&'a self,
		args: MatchArgs<'a>,
	) -> BoxFuture<'a, Result<Vec<ScoredNote>>> {
		Box::pin(async move { queries::match_notes(&self.pool, &args).await })
	}

	fn tag_filter<'a>(
		&'a self,
		owner_id: &'a str,
		tag: &'a str,
		limit: u32,
	) -> BoxFuture<'a, Result<Vec<Note>>> {
		Box::pin(queries::notes_with_tag(&self.pool, owner_id, tag, limit))
	}

	fn keyword_filter<'a>(
		&'a self,
		owner_id: &'a str,
		query: &'a str,
		limit: u32,
	) -> BoxFuture<'a, Result<Vec<Note>>> {
		Box::pin(queries::notes_matching_keyword(&self.pool, owner_id, query, limit))
	}

	fn count_tags<'a>(
		&'a self,
		owner_id: &'a str,
		sample_limit: u32,
		top_n: u32,
	) -> BoxFuture<'a, Result<Vec<TagCount>>> {
		Box::pin(async move {
			let tag_sets = queries::recent_tag_sets(&self.pool, owner_id, sample_limit).await?;

			Ok(tags::tally_tags(tag_sets.iter(), top_n as usize))
		})
	}
}
