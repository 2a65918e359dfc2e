//! HTTP request and response types and the handler abstractions.

mod extensions;
mod middleware;
mod request;
mod response;

pub use extensions::Extensions;
pub use middleware::{FnHandler, Handler, Middleware, MiddlewareChain};
pub use request::{Request, RequestBuilder};
pub use response::Response;

pub use hyper::{HeaderMap, Method, StatusCode, Uri, Version};
