//! Request middleware.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Instant;

use crate::exception::Result;
use crate::http::{Handler, Middleware, Request, Response};

/// Logs method, path, status and duration of every request
#[derive(Default)]
pub struct LoggingMiddleware;

impl LoggingMiddleware {
	pub fn new() -> Self {
		Self
	}
}

#[async_trait]
impl Middleware for LoggingMiddleware {
	async fn process(&self, request: Request, next: Arc<dyn Handler>) -> Result<Response> {
		let start = Instant::now();
		let method = request.method.clone();
		let path = request.path().to_string();

		let result = next.handle(request).await;
		let elapsed_ms = start.elapsed().as_millis() as u64;

		match &result {
			Ok(response) => {
				tracing::info!(%method, %path, status = response.status.as_u16(), elapsed_ms, "request");
			}
			Err(err) if err.is_client_error() => {
				tracing::info!(%method, %path, status = err.status_code().as_u16(), elapsed_ms, "request");
			}
			Err(err) => {
				tracing::error!(%method, %path, status = err.status_code().as_u16(), elapsed_ms, error = %err, "request failed");
			}
		}

		result
	}
}
