use std::sync::Arc;

use super::TestResponse;
use crate::config::Application;
use crate::exception::Result;
use crate::http::{Handler, Method, Request, Response};

/// Sends requests straight to a handler, without a socket
///
/// Like Django's test client, redirects are not followed and handler
/// errors come back as the error response a browser would see.
#[derive(Clone)]
pub struct Client {
	handler: Arc<dyn Handler>,
}

impl Client {
	pub fn new(handler: Arc<dyn Handler>) -> Self {
		Self { handler }
	}

	pub fn for_application(app: Application) -> Self {
		Self::new(Arc::new(app))
	}

	pub async fn get(&self, uri: &str) -> Result<TestResponse> {
		let request = Request::builder().method(Method::GET).uri(uri).build()?;
		self.request(request).await
	}

	/// POST `data` as `application/x-www-form-urlencoded`
	pub async fn post_form<K: AsRef<str>, V: AsRef<str>>(
		&self,
		uri: &str,
		data: &[(K, V)],
	) -> Result<TestResponse> {
		let request = Request::builder()
			.method(Method::POST)
			.uri(uri)
			.form(data)
			.build()?;
		self.request(request).await
	}

	pub async fn request(&self, request: Request) -> Result<TestResponse> {
		let response = self
			.handler
			.handle(request)
			.await
			.unwrap_or_else(Response::from);
		Ok(TestResponse::new(response))
	}
}
