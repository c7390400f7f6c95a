pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Provider failures. The display text is safe to show to an end user.
#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("{message}")]
	EmptyInput { message: String },
	#[error("{message}")]
	Timeout { message: String },
	#[error("{message}")]
	Connection { message: String },
	#[error("{message}")]
	Status { status: u16, message: String },
	#[error("{message}")]
	InvalidResponse { message: String },
	#[error("{message}")]
	InvalidConfig { message: String },
	#[error(transparent)]
	Reqwest(#[from] reqwest::Error),
	#[error(transparent)]
	InvalidHeaderName(#[from] reqwest::header::InvalidHeaderName),
	#[error(transparent)]
	InvalidHeaderValue(#[from] reqwest::header::InvalidHeaderValue),
}
