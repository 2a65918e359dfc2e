//! URL routing and reverse resolution.
//!
//! Routes are declared with [`path`], grouped per application and mounted
//! into a [`DefaultRouter`] under a prefix and a namespace:
//!
//! ```rust
//! use mysite::urls::{DefaultRouter, path};
//! use mysite::http::{FnHandler, Method, Request, Response};
//! use std::sync::Arc;
//!
//! async fn index(_request: Request) -> mysite::Result<Response> {
//!     Ok(Response::ok())
//! }
//!
//! let mut router = DefaultRouter::new();
//! router
//!     .mount(
//!         "/polls/",
//!         vec![path("", Arc::new(FnHandler::new(index))).with_name("index")],
//!         Some("polls"),
//!     )
//!     .unwrap();
//!
//! assert_eq!(router.reverser().reverse::<&str>("polls:index", &[]).unwrap(), "/polls/");
//! ```

mod pattern;
mod reverse;
mod route;
mod router;

pub use pattern::{ParamKind, PathPattern};
pub use reverse::UrlReverser;
pub use route::{Route, path};
pub use router::DefaultRouter;
