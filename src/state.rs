use sqlx::SqlitePool;
use std::sync::Arc;

use crate::admin::AdminSite;
use crate::conf::Settings;
use crate::exception::{Error, Result};
use crate::http::Request;
use crate::templates::TemplateEngine;
use crate::urls::UrlReverser;

/// Everything a view needs besides the request itself
pub struct AppState {
	pub settings: Settings,
	pub pool: SqlitePool,
	pub templates: TemplateEngine,
	pub reverser: Arc<UrlReverser>,
	pub admin: Arc<AdminSite>,
}

impl AppState {
	/// Fetch the state the application attached to the request
	pub fn from_request(request: &Request) -> Result<Arc<AppState>> {
		request
			.extensions
			.get::<Arc<AppState>>()
			.ok_or_else(|| Error::Internal("Application state missing from request".to_string()))
	}
}
