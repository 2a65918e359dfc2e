//! # mysite
//!
//! The polls tutorial site: a `Question`/`Choice` model pair, public views to
//! list questions, vote and read results, and an admin panel to manage them.
//!
//! The web layer is small and follows the usual request flow:
//!
//! - [`http`] - request/response types, the [`Handler`] and middleware traits
//! - [`urls`] - path patterns, named routes and URL reversing
//! - [`server`] - the hyper-based HTTP/1.1 server
//! - [`templates`] / [`shortcuts`] - Tera rendering and view helpers
//! - [`db`] - SQLite pool and embedded migrations
//! - [`admin`] - a Django-style model admin
//! - [`apps::polls`] - the polls application itself
//! - [`config`] - wiring everything into an [`config::Application`]
//!
//! ## Quick Example
//!
//! ```rust,no_run
//! use mysite::conf::Settings;
//! use mysite::config::Application;
//! use mysite::db;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let settings = Settings::load()?;
//! let pool = db::create_pool(&settings.database.url, settings.database.max_connections).await?;
//! db::run_migrations(&pool).await?;
//!
//! let app = Application::build(settings, pool)?;
//! # let _ = app;
//! # Ok(())
//! # }
//! ```

pub mod admin;
pub mod apps;
pub mod commands;
pub mod conf;
pub mod config;
pub mod db;
pub mod exception;
pub mod http;
pub mod logging;
pub mod middleware;
pub mod server;
pub mod shortcuts;
pub mod state;
pub mod templates;
pub mod urls;

pub use exception::{Error, Result};
pub use http::{Handler, Request, Response};
pub use state::AppState;
