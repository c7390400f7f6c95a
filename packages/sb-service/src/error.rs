pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Invalid request: {message}")]
	InvalidRequest { message: String },
	#[error("{message}")]
	Enrichment { message: String },
	#[error("{message}")]
	Embedding { message: String },
	#[error("Storage error: {message}")]
	Storage { message: String },
}
impl From<sb_storage::Error> for Error {
	fn from(err: sb_storage::Error) -> Self {
		match err {
			sb_storage::Error::Sqlx(inner) => Self::Storage { message: inner.to_string() },
			sb_storage::Error::InvalidArgument(message) => Self::Storage { message },
		}
	}
}
