//! Admin site registry and URL configuration.

use hyper::Method;
use indexmap::IndexMap;
use serde::Serialize;
use std::sync::Arc;

use super::ModelAdmin;
use super::views;
use crate::exception::{Error, Result};
use crate::http::FnHandler;
use crate::urls::{Route, path};

pub const NAMESPACE: &str = "admin";

/// Registered models of one app, as listed on the admin index
#[derive(Debug, Clone, Serialize)]
pub struct AppEntry {
	pub app_label: String,
	pub name: String,
	pub models: Vec<ModelEntry>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ModelEntry {
	pub model_name: String,
	pub verbose_name_plural: String,
}

/// Admin site holding the registered model admins
pub struct AdminSite {
	site_header: String,
	registry: IndexMap<(String, String), Arc<dyn ModelAdmin>>,
}

impl AdminSite {
	pub fn new(site_header: impl Into<String>) -> Self {
		Self {
			site_header: site_header.into(),
			registry: IndexMap::new(),
		}
	}

	pub fn site_header(&self) -> &str {
		&self.site_header
	}

	/// Register a model admin; a later registration for the same model wins
	pub fn register<A: ModelAdmin + 'static>(&mut self, admin: A) {
		let key = (admin.app_label().to_string(), admin.model_name().to_string());
		tracing::debug!(app = %key.0, model = %key.1, "Registered model admin");
		self.registry.insert(key, Arc::new(admin));
	}

	pub fn is_registered(&self, app_label: &str, model_name: &str) -> bool {
		self.registry
			.contains_key(&(app_label.to_string(), model_name.to_string()))
	}

	/// Look up the admin for a model, 404 when not registered
	pub fn get(&self, app_label: &str, model_name: &str) -> Result<Arc<dyn ModelAdmin>> {
		self.registry
			.get(&(app_label.to_string(), model_name.to_string()))
			.cloned()
			.ok_or_else(|| {
				Error::NotFound(format!(
					"Model '{}.{}' is not registered in the admin",
					app_label, model_name
				))
			})
	}

	pub fn models(&self) -> impl Iterator<Item = &Arc<dyn ModelAdmin>> {
		self.registry.values()
	}

	/// Registered models grouped by app, in registration order
	pub fn apps(&self) -> Vec<AppEntry> {
		let mut apps: IndexMap<String, AppEntry> = IndexMap::new();
		for admin in self.registry.values() {
			let app_label = admin.app_label().to_string();
			apps.entry(app_label.clone())
				.or_insert_with(|| AppEntry {
					name: super::humanize_field_name(&app_label),
					app_label,
					models: Vec::new(),
				})
				.models
				.push(ModelEntry {
					model_name: admin.model_name().to_string(),
					verbose_name_plural: admin.verbose_name_plural(),
				});
		}
		apps.into_values().collect()
	}

	/// Admin routes, to be mounted under the admin prefix with the `admin`
	/// namespace
	pub fn url_patterns(&self) -> Vec<Route> {
		vec![
			path("", Arc::new(FnHandler::new(views::index)))
				.with_name("index")
				.with_methods(&[Method::GET]),
			path(
				"{app_label}/{model_name}/",
				Arc::new(FnHandler::new(views::changelist_view)),
			)
			.with_name("changelist")
			.with_methods(&[Method::GET]),
			path(
				"{app_label}/{model_name}/add/",
				Arc::new(FnHandler::new(views::add_view)),
			)
			.with_name("add")
			.with_methods(&[Method::GET, Method::POST]),
			path(
				"{app_label}/{model_name}/{object_id:int}/change/",
				Arc::new(FnHandler::new(views::change_view)),
			)
			.with_name("change")
			.with_methods(&[Method::GET, Method::POST]),
			path(
				"{app_label}/{model_name}/{object_id:int}/delete/",
				Arc::new(FnHandler::new(views::delete_view)),
			)
			.with_name("delete")
			.with_methods(&[Method::GET, Method::POST]),
		]
	}
}
