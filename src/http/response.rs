use bytes::Bytes;
use hyper::header::{ALLOW, CONTENT_TYPE, HeaderName, HeaderValue, LOCATION};
use hyper::{HeaderMap, StatusCode};

use crate::exception::Error;

/// HTTP response returned by views
#[derive(Debug)]
pub struct Response {
	pub status: StatusCode,
	pub headers: HeaderMap,
	pub body: Bytes,
	/// Template context the body was rendered from, kept for test assertions
	context: Option<serde_json::Value>,
}

impl Response {
	pub fn new(status: StatusCode) -> Self {
		Self {
			status,
			headers: HeaderMap::new(),
			body: Bytes::new(),
			context: None,
		}
	}

	pub fn ok() -> Self {
		Self::new(StatusCode::OK)
	}

	pub fn not_found() -> Self {
		Self::new(StatusCode::NOT_FOUND)
	}

	pub fn bad_request() -> Self {
		Self::new(StatusCode::BAD_REQUEST)
	}

	pub fn method_not_allowed() -> Self {
		Self::new(StatusCode::METHOD_NOT_ALLOWED)
	}

	pub fn internal_server_error() -> Self {
		Self::new(StatusCode::INTERNAL_SERVER_ERROR)
	}

	/// 302 Found pointing at `location`
	///
	/// # Examples
	///
	/// ```
	/// use mysite::http::{Response, StatusCode};
	///
	/// let response = Response::temporary_redirect("/polls/1/results/");
	/// assert_eq!(response.status, StatusCode::FOUND);
	/// assert_eq!(response.location(), Some("/polls/1/results/"));
	/// ```
	pub fn temporary_redirect(location: &str) -> Self {
		Self::new(StatusCode::FOUND).with_location(location)
	}

	/// 301 Moved Permanently pointing at `location`
	pub fn permanent_redirect(location: &str) -> Self {
		Self::new(StatusCode::MOVED_PERMANENTLY).with_location(location)
	}

	pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
		self.body = body.into();
		self
	}

	/// Add a header, silently ignoring names or values that are not valid
	pub fn with_header(mut self, name: &str, value: &str) -> Self {
		if let (Ok(name), Ok(value)) = (
			HeaderName::from_bytes(name.as_bytes()),
			HeaderValue::from_str(value),
		) {
			self.headers.insert(name, value);
		}
		self
	}

	pub fn with_location(mut self, location: &str) -> Self {
		if let Ok(value) = HeaderValue::from_str(location) {
			self.headers.insert(LOCATION, value);
		}
		self
	}

	pub fn with_html(mut self, html: impl Into<Bytes>) -> Self {
		self.headers.insert(
			CONTENT_TYPE,
			HeaderValue::from_static("text/html; charset=utf-8"),
		);
		self.body = html.into();
		self
	}

	pub fn with_context(mut self, context: serde_json::Value) -> Self {
		self.context = Some(context);
		self
	}

	pub fn context(&self) -> Option<&serde_json::Value> {
		self.context.as_ref()
	}

	pub fn location(&self) -> Option<&str> {
		self.headers.get(LOCATION).and_then(|v| v.to_str().ok())
	}

	pub fn is_redirect(&self) -> bool {
		self.status.is_redirection()
	}
}

impl From<Error> for Response {
	/// Render an error as a small HTML page
	///
	/// Client errors show their message. Server errors only show the reason
	/// phrase; the details are logged by the caller.
	fn from(error: Error) -> Self {
		let status = error.status_code();
		let reason = status.canonical_reason().unwrap_or("Error");
		let detail = if error.is_client_error() {
			tera::escape_html(&error.to_string())
		} else {
			String::new()
		};

		let html = format!(
			"<!DOCTYPE html>\n<html>\n<head><title>{code} {reason}</title></head>\n<body>\n<h1>{reason}</h1>\n<p>{detail}</p>\n</body>\n</html>\n",
			code = status.as_u16(),
		);

		let mut response = Response::new(status).with_html(html);
		if let Error::MethodNotAllowed(allowed) = &error
			&& let Ok(value) = HeaderValue::from_str(allowed)
		{
			response.headers.insert(ALLOW, value);
		}
		response
	}
}
