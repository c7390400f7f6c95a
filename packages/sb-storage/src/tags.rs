use std::collections::HashMap;

use crate::models::TagCount;

/// Counts tags across notes, most frequent first. Ties order by tag text.
pub fn tally_tags<'a, I, T>(tag_sets: I, top_n: usize) -> Vec<TagCount>
where
	I: IntoIterator<Item = T>,
	T: IntoIterator<Item = &'a String>,
{
	let mut counts: HashMap<&str, u64> = HashMap::new();

	for tags in tag_sets {
		for tag in tags {
			let tag = tag.trim();

			if tag.is_empty() {
				continue;
			}

			*counts.entry(tag).or_default() += 1;
		}
	}

	let mut out = counts
		.into_iter()
		.map(|(tag, count)| TagCount { tag: tag.to_string(), count })
		.collect::<Vec<_>>();

	out.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.tag.cmp(&b.tag)));
	out.truncate(top_n);

	out
}
