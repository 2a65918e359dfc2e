use hyper::Method;
use std::sync::Arc;

use crate::http::Handler;

/// Route definition
///
/// Pairs a path with a handler, an optional name used for reversing, and
/// the methods the handler accepts.
#[derive(Clone)]
pub struct Route {
	pub path: String,
	handler: Arc<dyn Handler>,
	pub name: Option<String>,
	/// When combined with name, forms "namespace:name"
	pub namespace: Option<String>,
	/// `None` accepts every method
	pub methods: Option<Vec<Method>>,
}

impl Route {
	pub fn new(path: impl Into<String>, handler: Arc<dyn Handler>) -> Self {
		Self {
			path: path.into(),
			handler,
			name: None,
			namespace: None,
			methods: None,
		}
	}

	pub fn with_name(mut self, name: impl Into<String>) -> Self {
		self.name = Some(name.into());
		self
	}

	pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
		self.namespace = Some(namespace.into());
		self
	}

	/// Restrict the route to the given methods
	///
	/// # Examples
	///
	/// ```
	/// use mysite::urls::path;
	/// use mysite::http::{FnHandler, Method, Request, Response};
	/// use std::sync::Arc;
	///
	/// async fn vote(_request: Request) -> mysite::Result<Response> {
	///     Ok(Response::ok())
	/// }
	///
	/// let route = path("{question_id:int}/vote/", Arc::new(FnHandler::new(vote)))
	///     .with_methods(&[Method::POST]);
	/// assert!(route.allows(&Method::POST));
	/// assert!(!route.allows(&Method::GET));
	/// ```
	pub fn with_methods(mut self, methods: &[Method]) -> Self {
		self.methods = Some(methods.to_vec());
		self
	}

	/// Get the full name including namespace
	pub fn full_name(&self) -> Option<String> {
		match (&self.namespace, &self.name) {
			(Some(ns), Some(name)) => Some(format!("{}:{}", ns, name)),
			(None, Some(name)) => Some(name.clone()),
			_ => None,
		}
	}

	/// Whether the route accepts `method`; HEAD is accepted wherever GET is
	pub fn allows(&self, method: &Method) -> bool {
		match &self.methods {
			None => true,
			Some(methods) => {
				methods.contains(method) || (*method == Method::HEAD && methods.contains(&Method::GET))
			}
		}
	}

	/// Methods for the `Allow` header of a 405 response
	pub fn allow_header(&self) -> String {
		let mut names: Vec<&str> = match &self.methods {
			None => return "GET, HEAD, POST, PUT, PATCH, DELETE".to_string(),
			Some(methods) => methods.iter().map(Method::as_str).collect(),
		};
		if names.contains(&"GET") && !names.contains(&"HEAD") {
			names.push("HEAD");
		}
		names.join(", ")
	}

	pub fn handler(&self) -> &Arc<dyn Handler> {
		&self.handler
	}
}

/// Declare a route, the way `django.urls.path` does
pub fn path(pattern: impl Into<String>, handler: Arc<dyn Handler>) -> Route {
	Route::new(pattern, handler)
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::http::{FnHandler, Request, Response};
	use rstest::rstest;

	async fn noop(_request: Request) -> crate::Result<Response> {
		Ok(Response::ok())
	}

	#[rstest]
	fn test_full_name() {
		let route = path("", Arc::new(FnHandler::new(noop)))
			.with_name("index")
			.with_namespace("polls");
		assert_eq!(route.full_name().as_deref(), Some("polls:index"));
	}

	#[rstest]
	fn test_head_follows_get() {
		let route = path("", Arc::new(FnHandler::new(noop))).with_methods(&[Method::GET]);
		assert!(route.allows(&Method::HEAD));
		assert!(!route.allows(&Method::POST));
		assert_eq!(route.allow_header(), "GET, HEAD");
	}
}
