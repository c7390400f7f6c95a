use crate::{Error, Result};

/// Renders a vector in pgvector's text form, bound as `$n::text::vector`.
pub fn vector_to_pg(vec: &[f32]) -> String {
	let mut out = String::with_capacity(vec.len() * 8 + 2);

	out.push('[');

	for (idx, value) in vec.iter().enumerate() {
		if idx > 0 {
			out.push(',');
		}

		out.push_str(&value.to_string());
	}

	out.push(']');

	out
}

pub fn ensure_finite(vec: &[f32]) -> Result<()> {
	if vec.iter().all(|value| value.is_finite()) {
		Ok(())
	} else {
		Err(Error::InvalidArgument("Vector components must be finite.".to_string()))
	}
}
