//! Error types shared by every layer of the site.
//!
//! Views return [`Result`]; the application turns any [`Error`] into an HTML
//! error page carrying the status from [`Error::status_code`].

use hyper::StatusCode;

/// Site-wide error type
#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("{0}")]
	NotFound(String),

	/// Carries the value for the `Allow` header
	#[error("Method not allowed (allowed: {0})")]
	MethodNotAllowed(String),

	#[error("Bad request: {0}")]
	BadRequest(String),

	#[error("Database error: {0}")]
	Database(#[from] sqlx::Error),

	#[error("Migration error: {0}")]
	Migration(#[from] sqlx::migrate::MigrateError),

	#[error("Template error: {0}")]
	Template(#[from] tera::Error),

	#[error("Serialization error: {0}")]
	Serialization(String),

	#[error("Reverse error: {0}")]
	Reverse(String),

	#[error("Internal error: {0}")]
	Internal(String),
}

impl Error {
	/// HTTP status this error is reported with
	///
	/// # Examples
	///
	/// ```
	/// use mysite::Error;
	/// use hyper::StatusCode;
	///
	/// assert_eq!(Error::NotFound("gone".into()).status_code(), StatusCode::NOT_FOUND);
	/// assert_eq!(Error::Internal("boom".into()).status_code(), StatusCode::INTERNAL_SERVER_ERROR);
	/// ```
	pub fn status_code(&self) -> StatusCode {
		match self {
			Error::NotFound(_) => StatusCode::NOT_FOUND,
			Error::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
			Error::BadRequest(_) => StatusCode::BAD_REQUEST,
			Error::Database(_)
			| Error::Migration(_)
			| Error::Template(_)
			| Error::Serialization(_)
			| Error::Reverse(_)
			| Error::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
		}
	}

	/// Whether the message is safe to show to the client
	pub fn is_client_error(&self) -> bool {
		self.status_code().is_client_error()
	}
}

impl From<serde_json::Error> for Error {
	fn from(error: serde_json::Error) -> Self {
		Error::Serialization(error.to_string())
	}
}

impl From<serde_urlencoded::de::Error> for Error {
	fn from(error: serde_urlencoded::de::Error) -> Self {
		Error::BadRequest(error.to_string())
	}
}

impl From<http::Error> for Error {
	fn from(error: http::Error) -> Self {
		Error::BadRequest(error.to_string())
	}
}

pub type Result<T> = std::result::Result<T, Error>;
