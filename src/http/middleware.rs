//! Handler and middleware traits.
//!
//! ## Handler
//!
//! ```rust
//! use mysite::http::{Handler, Request, Response};
//! use async_trait::async_trait;
//!
//! struct Hello;
//!
//! #[async_trait]
//! impl Handler for Hello {
//!     async fn handle(&self, _request: Request) -> mysite::Result<Response> {
//!         Ok(Response::ok().with_body("Hello!"))
//!     }
//! }
//! ```
//!
//! Plain async functions become handlers through [`FnHandler`].

use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;

use super::{Request, Response};
use crate::exception::Result;

/// Core request processing abstraction
#[async_trait]
pub trait Handler: Send + Sync {
	async fn handle(&self, request: Request) -> Result<Response>;
}

#[async_trait]
impl<T: Handler + ?Sized> Handler for Arc<T> {
	async fn handle(&self, request: Request) -> Result<Response> {
		(**self).handle(request).await
	}
}

/// Adapter turning `async fn(Request) -> Result<Response>` into a [`Handler`]
///
/// # Examples
///
/// ```
/// use mysite::http::{FnHandler, Request, Response};
///
/// async fn ping(_request: Request) -> mysite::Result<Response> {
///     Ok(Response::ok().with_body("pong"))
/// }
///
/// let handler = FnHandler::new(ping);
/// # let _ = handler;
/// ```
pub struct FnHandler<F> {
	func: F,
}

impl<F> FnHandler<F> {
	pub fn new(func: F) -> Self {
		Self { func }
	}
}

#[async_trait]
impl<F, Fut> Handler for FnHandler<F>
where
	F: Fn(Request) -> Fut + Send + Sync + 'static,
	Fut: Future<Output = Result<Response>> + Send + 'static,
{
	async fn handle(&self, request: Request) -> Result<Response> {
		(self.func)(request).await
	}
}

/// Middleware wraps a handler to add cross-cutting behaviour
#[async_trait]
pub trait Middleware: Send + Sync {
	async fn process(&self, request: Request, next: Arc<dyn Handler>) -> Result<Response>;

	/// Returning `false` skips this middleware for the request
	fn should_continue(&self, _request: &Request) -> bool {
		true
	}
}

/// Composes middleware around a handler
///
/// Middleware runs in insertion order: the first one added sees the request
/// first and the response last.
pub struct MiddlewareChain {
	middlewares: Vec<Arc<dyn Middleware>>,
	handler: Arc<dyn Handler>,
}

impl MiddlewareChain {
	pub fn new(handler: Arc<dyn Handler>) -> Self {
		Self {
			middlewares: Vec::new(),
			handler,
		}
	}

	pub fn with_middleware(mut self, middleware: Arc<dyn Middleware>) -> Self {
		self.middlewares.push(middleware);
		self
	}

	/// Fold the chain into a single handler
	pub fn build(self) -> Arc<dyn Handler> {
		self.middlewares
			.into_iter()
			.rev()
			.fold(self.handler, |next, middleware| {
				Arc::new(ChainLink { middleware, next }) as Arc<dyn Handler>
			})
	}
}

struct ChainLink {
	middleware: Arc<dyn Middleware>,
	next: Arc<dyn Handler>,
}

#[async_trait]
impl Handler for ChainLink {
	async fn handle(&self, request: Request) -> Result<Response> {
		if self.middleware.should_continue(&request) {
			self.middleware.process(request, self.next.clone()).await
		} else {
			self.next.handle(request).await
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	struct Echo;

	#[async_trait]
	impl Handler for Echo {
		async fn handle(&self, request: Request) -> Result<Response> {
			let trail = request
				.headers
				.get("x-trail")
				.and_then(|v| v.to_str().ok())
				.unwrap_or("")
				.to_string();
			Ok(Response::ok().with_body(trail))
		}
	}

	struct Tag(&'static str);

	#[async_trait]
	impl Middleware for Tag {
		async fn process(&self, mut request: Request, next: Arc<dyn Handler>) -> Result<Response> {
			let trail = request
				.headers
				.get("x-trail")
				.and_then(|v| v.to_str().ok())
				.unwrap_or("")
				.to_string();
			let value = format!("{}{}", trail, self.0);
			request
				.headers
				.insert("x-trail", value.parse().expect("valid header"));
			next.handle(request).await
		}

		fn should_continue(&self, request: &Request) -> bool {
			!request.path().starts_with("/skip")
		}
	}

	#[rstest]
	#[tokio::test]
	async fn test_chain_runs_in_insertion_order() {
		let handler = MiddlewareChain::new(Arc::new(Echo))
			.with_middleware(Arc::new(Tag("a")))
			.with_middleware(Arc::new(Tag("b")))
			.build();

		let request = Request::builder().uri("/").build().unwrap();
		let response = handler.handle(request).await.unwrap();
		assert_eq!(response.body, "ab");
	}

	#[rstest]
	#[tokio::test]
	async fn test_chain_skips_middleware() {
		let handler = MiddlewareChain::new(Arc::new(Echo))
			.with_middleware(Arc::new(Tag("a")))
			.build();

		let request = Request::builder().uri("/skip").build().unwrap();
		let response = handler.handle(request).await.unwrap();
		assert_eq!(response.body, "");
	}

	#[rstest]
	#[tokio::test]
	async fn test_fn_handler() {
		async fn hello(_request: Request) -> Result<Response> {
			Ok(Response::ok().with_body("hello"))
		}

		let handler = FnHandler::new(hello);
		let request = Request::builder().uri("/").build().unwrap();
		let response = handler.handle(request).await.unwrap();
		assert_eq!(response.body, "hello");
	}
}
