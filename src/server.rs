//! HTTP/1.1 server built on hyper.

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::StatusCode;
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::Service;
use hyper_util::rt::TokioIo;
use std::future::Future;
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;

use crate::http::{Handler, Request, Response};

/// Default maximum request body size (2.5 MB, Django's DATA_UPLOAD_MAX_MEMORY_SIZE)
const DEFAULT_MAX_BODY_SIZE: usize = 2_621_440;

/// Pause after a failed `accept`, e.g. when out of file descriptors
const ACCEPT_ERROR_BACKOFF: Duration = Duration::from_millis(100);

pub type ServerResult<T> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

pub struct HttpServer {
	handler: Arc<dyn Handler>,
	max_body_size: usize,
	open_connections: Arc<AtomicUsize>,
}

impl HttpServer {
	pub fn new(handler: Arc<dyn Handler>) -> Self {
		Self {
			handler,
			max_body_size: DEFAULT_MAX_BODY_SIZE,
			open_connections: Arc::new(AtomicUsize::new(0)),
		}
	}

	pub fn with_max_body_size(mut self, max_body_size: usize) -> Self {
		self.max_body_size = max_body_size;
		self
	}

	/// Live count of connections still being served
	///
	/// Finished connections are reaped as the accept loop runs.
	pub fn open_connections(&self) -> Arc<AtomicUsize> {
		self.open_connections.clone()
	}

	/// Serve until the process is interrupted
	pub async fn listen(self, addr: SocketAddr) -> ServerResult<()> {
		self.listen_with_shutdown(addr, shutdown_signal()).await
	}

	/// Serve until `shutdown` resolves
	///
	/// Open connections are asked to finish their in-flight request before
	/// the call returns.
	pub async fn listen_with_shutdown<F>(self, addr: SocketAddr, shutdown: F) -> ServerResult<()>
	where
		F: Future<Output = ()> + Send,
	{
		let listener = TcpListener::bind(addr).await?;
		tracing::info!(address = %listener.local_addr()?, "Starting development server");

		let (shutdown_tx, shutdown_rx) = watch::channel(false);
		let mut connections = tokio::task::JoinSet::new();
		tokio::pin!(shutdown);

		loop {
			self.open_connections.store(connections.len(), Ordering::Relaxed);
			tokio::select! {
				result = listener.accept() => {
					let (stream, remote_addr) = match result {
						Ok(accepted) => accepted,
						Err(err) => {
							tracing::warn!(error = %err, "Failed to accept connection");
							tokio::time::sleep(ACCEPT_ERROR_BACKOFF).await;
							continue;
						}
					};
					let service = RequestService {
						handler: self.handler.clone(),
						remote_addr,
						max_body_size: self.max_body_size,
					};
					connections.spawn(serve_connection(stream, service, shutdown_rx.clone()));
				}
				Some(joined) = connections.join_next(), if !connections.is_empty() => {
					if let Err(err) = joined {
						tracing::error!(error = %err, "Connection task failed");
					}
				}
				_ = &mut shutdown => {
					tracing::info!("Shutdown signal received, stopping server");
					break;
				}
			}
		}

		let _ = shutdown_tx.send(true);
		while connections.join_next().await.is_some() {}
		self.open_connections.store(0, Ordering::Relaxed);
		tracing::info!("Server stopped");
		Ok(())
	}
}

async fn serve_connection(stream: TcpStream, service: RequestService, mut shutdown: watch::Receiver<bool>) {
	let remote_addr = service.remote_addr;
	let conn = http1::Builder::new().serve_connection(TokioIo::new(stream), service);
	tokio::pin!(conn);

	tokio::select! {
		result = conn.as_mut() => {
			if let Err(err) = result {
				tracing::debug!(%remote_addr, error = %err, "Connection closed with error");
			}
		}
		_ = shutdown.changed() => {
			conn.as_mut().graceful_shutdown();
			if let Err(err) = conn.await {
				tracing::debug!(%remote_addr, error = %err, "Error while draining connection");
			}
		}
	}
}

struct RequestService {
	handler: Arc<dyn Handler>,
	remote_addr: SocketAddr,
	max_body_size: usize,
}

impl Service<hyper::Request<Incoming>> for RequestService {
	type Response = hyper::Response<Full<Bytes>>;
	type Error = hyper::http::Error;
	type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

	fn call(&self, req: hyper::Request<Incoming>) -> Self::Future {
		let handler = self.handler.clone();
		let remote_addr = self.remote_addr;
		let max_body_size = self.max_body_size;

		Box::pin(async move {
			let (parts, body) = req.into_parts();

			let body = match http_body_util::Limited::new(body, max_body_size).collect().await {
				Ok(collected) => collected.to_bytes(),
				Err(_) => {
					return hyper::Response::builder()
						.status(StatusCode::PAYLOAD_TOO_LARGE)
						.body(Full::new(Bytes::from("Request body too large")));
				}
			};

			let mut request = Request::new(parts.method, parts.uri, parts.version, parts.headers, body);
			request.remote_addr = Some(remote_addr);

			let response = handler.handle(request).await.unwrap_or_else(Response::from);

			let mut builder = hyper::Response::builder().status(response.status);
			for (key, value) in response.headers.iter() {
				builder = builder.header(key, value);
			}
			builder.body(Full::new(response.body))
		})
	}
}

/// Resolves on Ctrl+C, or SIGTERM on unix
pub async fn shutdown_signal() {
	let ctrl_c = async {
		if let Err(err) = tokio::signal::ctrl_c().await {
			tracing::error!(error = %err, "Failed to listen for Ctrl+C");
			std::future::pending::<()>().await;
		}
	};

	#[cfg(unix)]
	let terminate = async {
		match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
			Ok(mut signal) => {
				signal.recv().await;
			}
			Err(err) => {
				tracing::error!(error = %err, "Failed to listen for SIGTERM");
				std::future::pending::<()>().await;
			}
		}
	};

	#[cfg(not(unix))]
	let terminate = std::future::pending::<()>();

	tokio::select! {
		_ = ctrl_c => {},
		_ = terminate => {},
	}
}
