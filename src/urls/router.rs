use async_trait::async_trait;
use hyper::Method;

use super::{PathPattern, Route, UrlReverser};
use crate::exception::{Error, Result};
use crate::http::{Handler, Request, Response};

/// Ordered route table, similar to Django's URLResolver
///
/// The first route whose pattern matches the path and accepts the method
/// handles the request.
pub struct DefaultRouter {
	routes: Vec<(PathPattern, Route)>,
	reverser: UrlReverser,
	append_slash: bool,
}

impl Default for DefaultRouter {
	fn default() -> Self {
		Self::new()
	}
}

impl DefaultRouter {
	pub fn new() -> Self {
		Self {
			routes: Vec::new(),
			reverser: UrlReverser::new(),
			append_slash: true,
		}
	}

	/// Redirect `GET /polls` to `/polls/` when only the latter matches
	pub fn with_append_slash(mut self, enabled: bool) -> Self {
		self.append_slash = enabled;
		self
	}

	pub fn add_route(&mut self, route: Route) -> Result<()> {
		let pattern = PathPattern::new(route.path.clone())?;
		if let Some(full_name) = route.full_name() {
			self.reverser.register(full_name, pattern.clone());
		}
		self.routes.push((pattern, route));
		Ok(())
	}

	/// Mount routes under a prefix, optionally tagging them with a namespace
	pub fn mount(&mut self, prefix: &str, routes: Vec<Route>, namespace: Option<&str>) -> Result<()> {
		let prefix = prefix.trim_end_matches('/');

		for mut route in routes {
			route.path = format!("{}/{}", prefix, route.path.trim_start_matches('/'));
			if let Some(ns) = namespace {
				route.namespace = Some(ns.to_string());
			}
			self.add_route(route)?;
		}
		Ok(())
	}

	pub fn reverser(&self) -> &UrlReverser {
		&self.reverser
	}

	pub fn routes(&self) -> impl Iterator<Item = &Route> {
		self.routes.iter().map(|(_, route)| route)
	}

	fn redirect_with_slash(&self, request: &Request) -> Option<Response> {
		if !self.append_slash
			|| !(request.method == Method::GET || request.method == Method::HEAD)
			|| request.path().ends_with('/')
		{
			return None;
		}

		let candidate = format!("{}/", request.path());
		self.routes
			.iter()
			.any(|(pattern, _)| pattern.match_path(&candidate).is_some())
			.then(|| {
				let location = match request.uri.query() {
					Some(query) => format!("{}?{}", candidate, query),
					None => candidate,
				};
				Response::permanent_redirect(&location)
			})
	}
}

#[async_trait]
impl Handler for DefaultRouter {
	async fn handle(&self, mut request: Request) -> Result<Response> {
		let mut disallowed: Option<&Route> = None;

		for (pattern, route) in &self.routes {
			let Some(params) = pattern.match_path(request.path()) else {
				continue;
			};
			if !route.allows(&request.method) {
				disallowed.get_or_insert(route);
				continue;
			}
			for (key, value) in params {
				request.set_path_param(key, value);
			}
			return route.handler().handle(request).await;
		}

		if let Some(route) = disallowed {
			return Err(Error::MethodNotAllowed(route.allow_header()));
		}
		if let Some(redirect) = self.redirect_with_slash(&request) {
			return Ok(redirect);
		}

		Err(Error::NotFound(format!(
			"No route found for {}",
			request.path()
		)))
	}
}
