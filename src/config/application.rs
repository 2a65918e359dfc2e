use async_trait::async_trait;
use sqlx::SqlitePool;
use std::sync::Arc;

use super::urls;
use crate::admin::AdminSite;
use crate::apps::polls;
use crate::conf::Settings;
use crate::exception::Result;
use crate::http::{Handler, MiddlewareChain, Request, Response};
use crate::middleware::LoggingMiddleware;
use crate::state::AppState;
use crate::templates::TemplateEngine;

/// One entry of the route table, as printed by `manage showurls`
#[derive(Debug, Clone, PartialEq)]
pub struct RouteInfo {
	pub path: String,
	pub name: Option<String>,
	pub methods: String,
}

/// The assembled site: routes, middleware and shared state
///
/// Every request gets the [`AppState`] attached before routing, and errors
/// raised by views are turned into HTML error responses here.
pub struct Application {
	handler: Arc<dyn Handler>,
	state: Arc<AppState>,
	routes: Vec<RouteInfo>,
}

impl Application {
	pub fn build(settings: Settings, pool: SqlitePool) -> Result<Self> {
		let mut admin = AdminSite::new(settings.admin.site_header.clone());
		polls::admin::register(&mut admin);

		let router = urls::routes(&settings, &admin)?;
		let routes = router
			.routes()
			.map(|route| RouteInfo {
				path: route.path.clone(),
				name: route.full_name(),
				methods: route.allow_header(),
			})
			.collect();
		let reverser = Arc::new(router.reverser().clone());
		let templates = TemplateEngine::new(reverser.clone())?;

		let handler = MiddlewareChain::new(Arc::new(router))
			.with_middleware(Arc::new(LoggingMiddleware::new()))
			.build();

		let state = Arc::new(AppState {
			settings,
			pool,
			templates,
			reverser,
			admin: Arc::new(admin),
		});

		Ok(Self {
			handler,
			state,
			routes,
		})
	}

	pub fn state(&self) -> &Arc<AppState> {
		&self.state
	}

	pub fn routes(&self) -> &[RouteInfo] {
		&self.routes
	}
}

#[async_trait]
impl Handler for Application {
	async fn handle(&self, request: Request) -> Result<Response> {
		request.extensions.insert(self.state.clone());
		match self.handler.handle(request).await {
			Ok(response) => Ok(response),
			Err(err) => Ok(Response::from(err)),
		}
	}
}
