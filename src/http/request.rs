use bytes::Bytes;
use hyper::header::{CONTENT_TYPE, HeaderName, HeaderValue};
use hyper::{HeaderMap, Method, Uri, Version};
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::str::FromStr;

use super::Extensions;
use crate::exception::{Error, Result};

/// HTTP request as seen by views
pub struct Request {
	pub method: Method,
	pub uri: Uri,
	pub version: Version,
	pub headers: HeaderMap,
	body: Bytes,
	/// Parameters captured from the matched URL pattern
	pub path_params: HashMap<String, String>,
	/// URL-decoded query string parameters (last value wins)
	pub query_params: HashMap<String, String>,
	pub remote_addr: Option<SocketAddr>,
	pub extensions: Extensions,
}

impl Request {
	pub fn new(method: Method, uri: Uri, version: Version, headers: HeaderMap, body: Bytes) -> Self {
		let query_params = Self::parse_query_params(&uri);
		Self {
			method,
			uri,
			version,
			headers,
			body,
			path_params: HashMap::new(),
			query_params,
			remote_addr: None,
			extensions: Extensions::new(),
		}
	}

	pub fn builder() -> RequestBuilder {
		RequestBuilder::default()
	}

	fn parse_query_params(uri: &Uri) -> HashMap<String, String> {
		uri.query()
			.and_then(|q| serde_urlencoded::from_str::<Vec<(String, String)>>(q).ok())
			.map(|pairs| pairs.into_iter().collect())
			.unwrap_or_default()
	}

	/// Get the request path
	///
	/// # Examples
	///
	/// ```
	/// use mysite::http::Request;
	///
	/// let request = Request::builder().uri("/polls/?page=2").build().unwrap();
	/// assert_eq!(request.path(), "/polls/");
	/// assert_eq!(request.query("page"), Some("2"));
	/// ```
	pub fn path(&self) -> &str {
		self.uri.path()
	}

	pub fn query(&self, name: &str) -> Option<&str> {
		self.query_params.get(name).map(String::as_str)
	}

	pub fn body(&self) -> &Bytes {
		&self.body
	}

	pub fn set_path_param(&mut self, key: impl Into<String>, value: impl Into<String>) {
		self.path_params.insert(key.into(), value.into());
	}

	/// Parse a captured path parameter
	///
	/// A missing or unparsable parameter means the URL does not name an
	/// existing object, so it is reported as `NotFound`.
	pub fn path_param<T: FromStr>(&self, name: &str) -> Result<T> {
		self.path_params
			.get(name)
			.and_then(|raw| raw.parse().ok())
			.ok_or_else(|| Error::NotFound(format!("Invalid path parameter '{}'", name)))
	}

	/// Deserialize an `application/x-www-form-urlencoded` body
	pub fn form<T: DeserializeOwned>(&self) -> Result<T> {
		Ok(serde_urlencoded::from_bytes(&self.body)?)
	}

	/// The urlencoded body as ordered key/value pairs
	///
	/// Unlike [`Request::form`] this keeps repeated keys.
	pub fn form_pairs(&self) -> Result<Vec<(String, String)>> {
		self.form()
	}

	pub fn content_type(&self) -> Option<&str> {
		self.headers.get(CONTENT_TYPE).and_then(|v| v.to_str().ok())
	}
}

/// Builder used by the test client and unit tests
#[derive(Default)]
pub struct RequestBuilder {
	method: Option<Method>,
	uri: Option<String>,
	headers: HeaderMap,
	body: Bytes,
	remote_addr: Option<SocketAddr>,
}

impl RequestBuilder {
	pub fn method(mut self, method: Method) -> Self {
		self.method = Some(method);
		self
	}

	pub fn uri(mut self, uri: impl Into<String>) -> Self {
		self.uri = Some(uri.into());
		self
	}

	pub fn header(mut self, name: &str, value: &str) -> Self {
		if let (Ok(name), Ok(value)) = (
			HeaderName::from_bytes(name.as_bytes()),
			HeaderValue::from_str(value),
		) {
			self.headers.insert(name, value);
		}
		self
	}

	pub fn body(mut self, body: impl Into<Bytes>) -> Self {
		self.body = body.into();
		self
	}

	/// Set a urlencoded form body and the matching content type
	///
	/// # Examples
	///
	/// ```
	/// use mysite::http::{Method, Request};
	/// use std::collections::HashMap;
	///
	/// let request = Request::builder()
	///     .method(Method::POST)
	///     .uri("/polls/1/vote/")
	///     .form(&[("choice", "3")])
	///     .build()
	///     .unwrap();
	///
	/// let data: HashMap<String, String> = request.form().unwrap();
	/// assert_eq!(data["choice"], "3");
	/// ```
	pub fn form<K: AsRef<str>, V: AsRef<str>>(mut self, data: &[(K, V)]) -> Self {
		let pairs: Vec<(&str, &str)> = data.iter().map(|(k, v)| (k.as_ref(), v.as_ref())).collect();
		let encoded = serde_urlencoded::to_string(pairs).unwrap_or_default();
		self.body = Bytes::from(encoded);
		self.headers.insert(
			CONTENT_TYPE,
			HeaderValue::from_static("application/x-www-form-urlencoded"),
		);
		self
	}

	pub fn remote_addr(mut self, addr: SocketAddr) -> Self {
		self.remote_addr = Some(addr);
		self
	}

	pub fn build(self) -> Result<Request> {
		let uri: Uri = self
			.uri
			.as_deref()
			.unwrap_or("/")
			.parse()
			.map_err(|e: hyper::http::uri::InvalidUri| Error::BadRequest(e.to_string()))?;
		let mut request = Request::new(
			self.method.unwrap_or(Method::GET),
			uri,
			Version::HTTP_11,
			self.headers,
			self.body,
		);
		request.remote_addr = self.remote_addr;
		Ok(request)
	}
}
