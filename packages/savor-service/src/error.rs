pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Backend unavailable: {message}")]
	TransientBackendFailure { message: String },
	#[error("Invalid state: {message}")]
	InvalidState { message: String },
	#[error("Dimension mismatch: expected {expected}, got {actual}.")]
	DimensionMismatch { expected: usize, actual: usize },
	#[error("Invalid request: {message}")]
	InvalidRequest { message: String },
	#[error("Provider error: {message}")]
	Provider { message: String },
	#[error("Storage error: {message}")]
	Storage { message: String },
}
impl Error {
	/// Backend errors that a repeated call may clear.
	pub fn is_retryable(&self) -> bool {
		matches!(
			self,
			Self::Provider { .. } | Self::Storage { .. } | Self::TransientBackendFailure { .. }
		)
	}
}

impl From<savor_domain::Error> for Error {
	fn from(err: savor_domain::Error) -> Self {
		match err {
			savor_domain::Error::InvalidState { message } => Self::InvalidState { message },
			savor_domain::Error::DimensionMismatch { expected, actual } =>
				Self::DimensionMismatch { expected, actual },
		}
	}
}

impl From<savor_providers::Error> for Error {
	fn from(err: savor_providers::Error) -> Self {
		Self::Provider { message: err.to_string() }
	}
}

impl From<savor_storage::Error> for Error {
	fn from(err: savor_storage::Error) -> Self {
		match err {
			savor_storage::Error::InvalidArgument(message) => Self::InvalidRequest { message },
			savor_storage::Error::Qdrant(inner) => Self::Storage { message: inner.to_string() },
		}
	}
}
