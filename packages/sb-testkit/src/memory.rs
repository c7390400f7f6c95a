use std::{
	cmp::Ordering as CmpOrdering,
	sync::{
		Mutex, MutexGuard,
		atomic::{AtomicBool, AtomicUsize, Ordering},
	},
};

use uuid::Uuid;

use sb_storage::{
	Error as StorageError, Result as StorageResult,
	models::{MatchArgs, NewNote, Note, NotePage, ScoredNote, TagCount},
	store::{self, BoxFuture, NoteStore},
	tags,
};

/// How [`MemoryNoteStore::similarity_search`] responds.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SimilarityBehavior {
	/// Rank like `match_notes`: exact tags first, then cosine similarity.
	#[default]
	Rank,
	/// Always return no rows.
	Empty,
	/// Always fail with a storage error.
	Fail,
}

/// In-process [`NoteStore`] mirroring the Postgres semantics closely enough for service tests.
#[derive(Default)]
pub struct MemoryNoteStore {
	rows: Mutex<Vec<NewNote>>,
	similarity: Mutex<SimilarityBehavior>,
	fail_inserts: AtomicBool,
	similarity_calls: AtomicUsize,
	keyword_calls: AtomicUsize,
	tag_calls: AtomicUsize,
	insert_calls: AtomicUsize,
}
impl MemoryNoteStore {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn set_similarity(&self, behavior: SimilarityBehavior) {
		*self.similarity.lock().unwrap_or_else(|err| err.into_inner()) = behavior;
	}

	pub fn fail_inserts(&self, fail: bool) {
		self.fail_inserts.store(fail, Ordering::SeqCst);
	}

	/// Seeds a row directly, bypassing failure injection.
	pub fn seed(&self, note: NewNote) {
		self.rows().push(note);
	}

	pub fn len(&self) -> usize {
		self.rows().len()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	pub fn embedding_of(&self, id: Uuid) -> Option<Vec<f32>> {
		self.rows().iter().find(|row| row.id == id).map(|row| row.embedding.clone())
	}

	pub fn similarity_calls(&self) -> usize {
		self.similarity_calls.load(Ordering::SeqCst)
	}

	pub fn keyword_calls(&self) -> usize {
		self.keyword_calls.load(Ordering::SeqCst)
	}

	pub fn tag_calls(&self) -> usize {
		self.tag_calls.load(Ordering::SeqCst)
	}

	pub fn insert_calls(&self) -> usize {
		self.insert_calls.load(Ordering::SeqCst)
	}

	fn rows(&self) -> MutexGuard<'_, Vec<NewNote>> {
		self.rows.lock().unwrap_or_else(|err| err.into_inner())
	}

	fn owned_newest_first(&self, owner_id: &str) -> Vec<NewNote> {
		let mut rows =
			self.rows().iter().filter(|row| row.owner_id == owner_id).cloned().collect::<Vec<_>>();

		rows.sort_by(newest_first);

		rows
	}

	fn insert_now(&self, note: &NewNote) -> StorageResult<Note> {
		self.insert_calls.fetch_add(1, Ordering::SeqCst);

		if self.fail_inserts.load(Ordering::SeqCst) {
			return Err(StorageError::InvalidArgument("Injected insert failure.".to_string()));
		}

		let mut rows = self.rows();

		if rows.iter().any(|row| row.id == note.id) {
			return Err(StorageError::InvalidArgument(format!("Duplicate note id {}.", note.id)));
		}

		rows.push(note.clone());

		Ok(to_note(note))
	}

	fn rank(&self, args: &MatchArgs<'_>) -> StorageResult<Vec<ScoredNote>> {
		self.similarity_calls.fetch_add(1, Ordering::SeqCst);

		match *self.similarity.lock().unwrap_or_else(|err| err.into_inner()) {
			SimilarityBehavior::Empty => return Ok(Vec::new()),
			SimilarityBehavior::Fail =>
				return Err(StorageError::InvalidArgument("Injected similarity failure.".to_string())),
			SimilarityBehavior::Rank => {},
		}

		let query_tag = args.query_text.trim();
		let mut scored = self
			.owned_newest_first(args.owner_id)
			.into_iter()
			.filter_map(|row| {
				if row.tags.iter().any(|tag| tag == query_tag) {
					return Some(ScoredNote {
						note: to_note(&row),
						similarity: 1.0,
						match_type: Some("tag".to_string()),
					});
				}

				let similarity = cosine(&row.embedding, args.query_embedding);

				(similarity > args.match_threshold).then(|| ScoredNote {
					note: to_note(&row),
					similarity,
					match_type: Some("vector".to_string()),
				})
			})
			.collect::<Vec<_>>();

		scored.sort_by(|a, b| {
			let a_tag = a.match_type.as_deref() == Some("tag");
			let b_tag = b.match_type.as_deref() == Some("tag");

			b_tag
				.cmp(&a_tag)
				.then_with(|| b.similarity.partial_cmp(&a.similarity).unwrap_or(CmpOrdering::Equal))
				.then_with(|| b.note.created_at.cmp(&a.note.created_at))
		});
		scored.truncate(args.match_count as usize);

		Ok(scored)
	}
}

impl NoteStore for MemoryNoteStore {
	fn insert<'a>(&'a self, note: &'a NewNote) -> BoxFuture<'a, StorageResult<Note>> {
		Box::pin(async move { self.insert_now(note) })
	}

	fn list_page<'a>(
		&'a self,
		owner_id: &'a str,
		page: u32,
		page_size: u32,
	) -> BoxFuture<'a, StorageResult<NotePage>> {
		Box::pin(async move {
			let offset = store::page_offset(page, page_size)?;
			let rows = self.owned_newest_first(owner_id);
			let total = rows.len() as u64;
			let notes = rows
				.iter()
				.skip(offset as usize)
				.take(page_size as usize)
				.map(to_note)
				.collect();

			Ok(NotePage { notes, total })
		})
	}

	fn list_recent<'a>(
		&'a self,
		owner_id: &'a str,
		limit: u32,
	) -> BoxFuture<'a, StorageResult<Vec<Note>>> {
		Box::pin(async move {
			Ok(self.owned_newest_first(owner_id).iter().take(limit as usize).map(to_note).collect())
		})
	}

	fn count<'a>(&'a self, owner_id: &'a str) -> BoxFuture<'a, StorageResult<u64>> {
		Box::pin(async move { Ok(self.owned_newest_first(owner_id).len() as u64) })
	}

	fn delete<'a>(&'a self, owner_id: &'a str, id: Uuid) -> BoxFuture<'a, StorageResult<bool>> {
		Box::pin(async move {
			let mut rows = self.rows();
			let before = rows.len();

			rows.retain(|row| !(row.id == id && row.owner_id == owner_id));

			Ok(rows.len() < before)
		})
	}

	fn similarity_search<'a>(
		&'a self,
		args: MatchArgs<'a>,
	) -> BoxFuture<'a, StorageResult<Vec<ScoredNote>>> {
		Box::pin(async move { self.rank(&args) })
	}

	fn tag_filter<'a>(
		&'a self,
		owner_id: &'a str,
		tag: &'a str,
		limit: u32,
	) -> BoxFuture<'a, StorageResult<Vec<Note>>> {
		Box::pin(async move {
			self.tag_calls.fetch_add(1, Ordering::SeqCst);

			Ok(self
				.owned_newest_first(owner_id)
				.iter()
				.filter(|row| row.tags.iter().any(|candidate| candidate == tag))
				.take(limit as usize)
				.map(to_note)
				.collect())
		})
	}

	fn keyword_filter<'a>(
		&'a self,
		owner_id: &'a str,
		query: &'a str,
		limit: u32,
	) -> BoxFuture<'a, StorageResult<Vec<Note>>> {
		Box::pin(async move {
			self.keyword_calls.fetch_add(1, Ordering::SeqCst);

			let needle = query.to_lowercase();
			let contains = |field: Option<&str>| {
				field.map(|text| text.to_lowercase().contains(&needle)).unwrap_or(false)
			};

			Ok(self
				.owned_newest_first(owner_id)
				.iter()
				.filter(|row| {
					contains(Some(&row.content))
						|| contains(row.summary.as_deref())
						|| contains(row.mental_model.as_deref())
				})
				.take(limit as usize)
				.map(to_note)
				.collect())
		})
	}

	fn count_tags<'a>(
		&'a self,
		owner_id: &'a str,
		sample_limit: u32,
		top_n: u32,
	) -> BoxFuture<'a, StorageResult<Vec<TagCount>>> {
		Box::pin(async move {
			let mut rows = self
				.rows()
				.iter()
				.filter(|row| row.owner_id == owner_id)
				.cloned()
				.collect::<Vec<_>>();

			rows.sort_by(newest_first);
			rows.truncate(sample_limit as usize);

			Ok(tags::tally_tags(rows.iter().map(|row| row.tags.iter()), top_n as usize))
		})
	}
}

fn newest_first(a: &NewNote, b: &NewNote) -> CmpOrdering {
	b.created_at.cmp(&a.created_at).then_with(|| b.id.cmp(&a.id))
}

fn to_note(row: &NewNote) -> Note {
	Note {
		id: row.id,
		owner_id: row.owner_id.clone(),
		content: row.content.clone(),
		category: row.category.clone(),
		summary: row.summary.clone(),
		mental_model: row.mental_model.clone(),
		tags: row.tags.clone(),
		created_at: row.created_at,
	}
}

fn cosine(a: &[f32], b: &[f32]) -> f64 {
	if a.len() != b.len() || a.is_empty() {
		return 0.0;
	}

	let (mut dot, mut norm_a, mut norm_b) = (0.0_f64, 0.0_f64, 0.0_f64);

	for (x, y) in a.iter().zip(b) {
		let (x, y) = (f64::from(*x), f64::from(*y));

		dot += x * y;
		norm_a += x * x;
		norm_b += y * y;
	}

	if norm_a == 0.0 || norm_b == 0.0 {
		return 0.0;
	}

	dot / (norm_a.sqrt() * norm_b.sqrt())
}
