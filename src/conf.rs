//! Layered site settings.
//!
//! Settings are assembled from sources merged in priority order:
//! built-in defaults, then an optional TOML file, then environment variables.
//!
//! ```toml
//! debug = false
//!
//! [server]
//! host = "0.0.0.0"
//! port = 8000
//!
//! [database]
//! url = "sqlite://db.sqlite3"
//! ```
//!
//! Environment variables use the `MYSITE_` prefix and `__` between the
//! section and the key, e.g. `MYSITE_DATABASE__URL=sqlite::memory:`.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};

pub const ENV_PREFIX: &str = "MYSITE_";
pub const SETTINGS_FILE_ENV: &str = "MYSITE_SETTINGS_FILE";
pub const DEFAULT_SETTINGS_FILE: &str = "settings.toml";

#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
	#[error("IO error reading {path}: {source}")]
	Io {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	#[error("TOML error: {0}")]
	Toml(#[from] toml::de::Error),

	#[error("Invalid value for {key}: {message}")]
	InvalidValue { key: String, message: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
	pub debug: bool,
	pub server: ServerSettings,
	pub database: DatabaseSettings,
	pub logging: LoggingSettings,
	pub admin: AdminSettings,
	pub polls: PollsSettings,
}

impl Default for Settings {
	fn default() -> Self {
		Self {
			debug: true,
			server: ServerSettings::default(),
			database: DatabaseSettings::default(),
			logging: LoggingSettings::default(),
			admin: AdminSettings::default(),
			polls: PollsSettings::default(),
		}
	}
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
	pub host: String,
	pub port: u16,
}

impl Default for ServerSettings {
	fn default() -> Self {
		Self {
			host: "127.0.0.1".to_string(),
			port: 8000,
		}
	}
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseSettings {
	pub url: String,
	pub max_connections: u32,
}

impl Default for DatabaseSettings {
	fn default() -> Self {
		Self {
			url: "sqlite://db.sqlite3".to_string(),
			max_connections: 5,
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
	#[default]
	Pretty,
	Compact,
	Json,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
	/// Default directive for the env filter; `RUST_LOG` wins when set
	pub level: String,
	pub format: LogFormat,
}

impl Default for LoggingSettings {
	fn default() -> Self {
		Self {
			level: "info".to_string(),
			format: LogFormat::Pretty,
		}
	}
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdminSettings {
	pub enabled: bool,
	pub url_prefix: String,
	pub site_header: String,
}

impl Default for AdminSettings {
	fn default() -> Self {
		Self {
			enabled: true,
			url_prefix: "/admin/".to_string(),
			site_header: "Site administration".to_string(),
		}
	}
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollsSettings {
	/// Number of questions on the index page
	pub index_limit: u32,
}

impl Default for PollsSettings {
	fn default() -> Self {
		Self { index_limit: 5 }
	}
}

/// A layer of configuration values
pub trait ConfigSource {
	fn load(&self) -> Result<IndexMap<String, Value>, SettingsError>;

	fn description(&self) -> String;
}

/// Built-in defaults
pub struct DefaultSource;

impl ConfigSource for DefaultSource {
	fn load(&self) -> Result<IndexMap<String, Value>, SettingsError> {
		match serde_json::to_value(Settings::default()) {
			Ok(Value::Object(map)) => Ok(map.into_iter().collect()),
			_ => Ok(IndexMap::new()),
		}
	}

	fn description(&self) -> String {
		"defaults".to_string()
	}
}

/// TOML settings file; a missing optional file contributes nothing
pub struct TomlFileSource {
	path: PathBuf,
	required: bool,
}

impl TomlFileSource {
	pub fn new(path: impl Into<PathBuf>) -> Self {
		Self {
			path: path.into(),
			required: true,
		}
	}

	pub fn optional(mut self) -> Self {
		self.required = false;
		self
	}
}

impl ConfigSource for TomlFileSource {
	fn load(&self) -> Result<IndexMap<String, Value>, SettingsError> {
		let content = match std::fs::read_to_string(&self.path) {
			Ok(content) => content,
			Err(e) if !self.required && e.kind() == std::io::ErrorKind::NotFound => {
				return Ok(IndexMap::new());
			}
			Err(source) => {
				return Err(SettingsError::Io {
					path: self.path.clone(),
					source,
				});
			}
		};

		let table: toml::Table = toml::from_str(&content)?;
		match serde_json::to_value(table) {
			Ok(Value::Object(map)) => Ok(map.into_iter().collect()),
			Ok(_) => Ok(IndexMap::new()),
			Err(e) => Err(SettingsError::InvalidValue {
				key: self.path.display().to_string(),
				message: e.to_string(),
			}),
		}
	}

	fn description(&self) -> String {
		format!("file {}", self.path.display())
	}
}

/// `MYSITE_SECTION__KEY=value` environment overrides
///
/// Values are typed after the default found at the same key, so
/// `MYSITE_SERVER__PORT=9000` becomes a number and `MYSITE_DEBUG=off` a bool.
pub struct EnvSource {
	prefix: String,
	vars: Option<Vec<(String, String)>>,
}

impl EnvSource {
	pub fn new() -> Self {
		Self {
			prefix: ENV_PREFIX.to_string(),
			vars: None,
		}
	}

	/// Read from the given pairs instead of the process environment
	pub fn with_vars(mut self, vars: Vec<(String, String)>) -> Self {
		self.vars = Some(vars);
		self
	}
}

impl Default for EnvSource {
	fn default() -> Self {
		Self::new()
	}
}

impl ConfigSource for EnvSource {
	fn load(&self) -> Result<IndexMap<String, Value>, SettingsError> {
		let defaults = DefaultSource.load()?;
		let vars = match &self.vars {
			Some(vars) => vars.clone(),
			None => std::env::vars().collect(),
		};

		let mut config: IndexMap<String, Value> = IndexMap::new();
		for (key, raw) in vars {
			let Some(stripped) = key.strip_prefix(&self.prefix) else {
				continue;
			};
			if key == SETTINGS_FILE_ENV {
				continue;
			}

			let path: Vec<String> = stripped.to_lowercase().split("__").map(str::to_string).collect();
			let default = lookup(&defaults, &path);
			let value = parse_env_value(&key, &raw, default)?;

			match path.as_slice() {
				[field] => {
					config.insert(field.clone(), value);
				}
				[section, field] => {
					let entry = config
						.entry(section.clone())
						.or_insert_with(|| Value::Object(Default::default()));
					if let Value::Object(map) = entry {
						map.insert(field.clone(), value);
					}
				}
				_ => {
					tracing::warn!(variable = %key, "Ignoring environment variable nested too deeply");
				}
			}
		}
		Ok(config)
	}

	fn description(&self) -> String {
		format!("environment ({}*)", self.prefix)
	}
}

fn lookup<'a>(defaults: &'a IndexMap<String, Value>, path: &[String]) -> Option<&'a Value> {
	let (first, rest) = path.split_first()?;
	rest.iter()
		.try_fold(defaults.get(first)?, |value, key| value.get(key))
}

fn parse_env_value(key: &str, raw: &str, default: Option<&Value>) -> Result<Value, SettingsError> {
	let invalid = |message: &str| SettingsError::InvalidValue {
		key: key.to_string(),
		message: format!("{} (got '{}')", message, raw),
	};

	match default {
		Some(Value::Bool(_)) => match raw.trim().to_lowercase().as_str() {
			"true" | "1" | "yes" | "on" => Ok(Value::Bool(true)),
			"false" | "0" | "no" | "off" => Ok(Value::Bool(false)),
			_ => Err(invalid("expected a boolean")),
		},
		Some(Value::Number(_)) => raw
			.trim()
			.parse::<u64>()
			.map(Value::from)
			.map_err(|_| invalid("expected a non-negative integer")),
		_ => Ok(Value::String(raw.to_string())),
	}
}

/// Recursively merge `overlay` into `base`; overlay wins on conflicts
fn merge(base: &mut IndexMap<String, Value>, overlay: IndexMap<String, Value>) {
	for (key, value) in overlay {
		match (base.get_mut(&key), value) {
			(Some(Value::Object(existing)), Value::Object(incoming)) => {
				for (k, v) in incoming {
					existing.insert(k, v);
				}
			}
			(_, value) => {
				base.insert(key, value);
			}
		}
	}
}

impl Settings {
	/// Load defaults, `settings.toml` (or `$MYSITE_SETTINGS_FILE`) and the environment
	pub fn load() -> Result<Self, SettingsError> {
		let source = match std::env::var(SETTINGS_FILE_ENV) {
			Ok(path) => TomlFileSource::new(path),
			Err(_) => TomlFileSource::new(DEFAULT_SETTINGS_FILE).optional(),
		};
		Self::from_sources(&[&DefaultSource, &source, &EnvSource::new()])
	}

	/// Load with an explicit settings file, which must exist
	pub fn load_from(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
		let source = TomlFileSource::new(path.as_ref());
		Self::from_sources(&[&DefaultSource, &source, &EnvSource::new()])
	}

	/// Merge sources in order, later ones overriding earlier ones
	pub fn from_sources(sources: &[&dyn ConfigSource]) -> Result<Self, SettingsError> {
		let mut merged = IndexMap::new();
		for source in sources {
			tracing::debug!(source = %source.description(), "Loading settings");
			merge(&mut merged, source.load()?);
		}

		let value = Value::Object(merged.into_iter().collect());
		let settings: Settings = serde_json::from_value(value).map_err(|e| SettingsError::InvalidValue {
			key: "settings".to_string(),
			message: e.to_string(),
		})?;
		settings.validate()?;
		Ok(settings)
	}

	pub fn validate(&self) -> Result<(), SettingsError> {
		let invalid = |key: &str, message: &str| {
			Err(SettingsError::InvalidValue {
				key: key.to_string(),
				message: message.to_string(),
			})
		};

		if self.database.url.trim().is_empty() {
			return invalid("database.url", "must not be empty");
		}
		if self.server.port == 0 {
			return invalid("server.port", "must not be 0");
		}
		if self.polls.index_limit == 0 {
			return invalid("polls.index_limit", "must be at least 1");
		}
		if !self.admin.url_prefix.starts_with('/') || !self.admin.url_prefix.ends_with('/') {
			return invalid("admin.url_prefix", "must start and end with '/'");
		}
		if self.admin.enabled && self.admin.url_prefix == "/" {
			return invalid("admin.url_prefix", "must not be the site root");
		}
		Ok(())
	}

	/// `host:port` the development server binds to
	pub fn bind_address(&self) -> String {
		format!("{}:{}", self.server.host, self.server.port)
	}
}
