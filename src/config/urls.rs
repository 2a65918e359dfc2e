//! URL configuration for the site
//!
//! ```text
//! /                      -> redirect to polls:index
//! /polls/...             -> polls app (namespace "polls")
//! <admin.url_prefix>...  -> admin site (namespace "admin")
//! ```

use hyper::Method;
use std::sync::Arc;

use crate::admin::AdminSite;
use crate::apps::polls;
use crate::conf::Settings;
use crate::exception::Result;
use crate::http::{FnHandler, Request, Response};
use crate::shortcuts::redirect_to;
use crate::urls::{DefaultRouter, path};

async fn root(request: Request) -> Result<Response> {
	redirect_to::<&str>(&request, "polls:index", &[])
}

/// Build the site's route table
pub fn routes(settings: &Settings, admin: &AdminSite) -> Result<DefaultRouter> {
	let mut router = DefaultRouter::new();
	router.add_route(
		path("/", Arc::new(FnHandler::new(root)))
			.with_name("root")
			.with_methods(&[Method::GET]),
	)?;
	router.mount("/polls/", polls::urls::url_patterns(), Some(polls::urls::APP_NAME))?;

	if settings.admin.enabled {
		router.mount(
			&settings.admin.url_prefix,
			admin.url_patterns(),
			Some(crate::admin::NAMESPACE),
		)?;
	}
	Ok(router)
}
