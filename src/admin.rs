//! Django-style admin interface.
//!
//! Models are exposed by implementing [`ModelAdmin`] and registering the
//! implementation on an [`AdminSite`]. The site serves an index page and,
//! per model, a change list with search, date filters, sorting and
//! pagination, add and change forms with inline editing of related rows,
//! and a delete confirmation page.
//!
//! ```rust,ignore
//! let mut site = AdminSite::new("Site administration");
//! site.register(QuestionAdmin);
//! site.register(ChoiceAdmin);
//! ```

mod filters;
mod inline;
mod model_admin;
mod query;
mod site;
mod views;

pub use filters::{DateFilter, FilterChoice, FilterInfo};
pub use inline::{InlineFormData, InlineModelAdmin, InlineType, parse_inline_formset};
pub use model_admin::{ChangeList, ModelAdmin};
pub use query::ListQueryParams;
pub use site::{AdminSite, AppEntry, ModelEntry, NAMESPACE};

use chrono::{DateTime, NaiveDateTime, Utc};
use indexmap::IndexMap;
use serde::Serialize;
use std::collections::HashMap;

/// Submitted form data, one value per field name
pub type FormData = HashMap<String, String>;

/// Field-level validation messages, keyed by field name
pub type FormErrors = IndexMap<String, String>;

/// Value of a change list cell
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum FieldValue {
	Text(String),
	Integer(i64),
	Boolean(bool),
	DateTime(DateTime<Utc>),
	Null,
}

impl FieldValue {
	/// Text shown in the change list
	pub fn display(&self) -> String {
		match self {
			FieldValue::Text(s) => s.clone(),
			FieldValue::Integer(n) => n.to_string(),
			FieldValue::Boolean(true) => "True".to_string(),
			FieldValue::Boolean(false) => "False".to_string(),
			FieldValue::DateTime(dt) => dt.format("%b. %-d, %Y, %-I:%M %p").to_string(),
			FieldValue::Null => "-".to_string(),
		}
	}
}

/// One row of a change list
#[derive(Debug, Clone, Serialize)]
pub struct AdminRow {
	pub id: i64,
	/// String form of the object, like Django's `__str__`
	pub repr: String,
	pub values: IndexMap<String, FieldValue>,
}

/// Kind of form widget for a field
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FieldKind {
	Text { max_length: usize },
	Integer,
	DateTime,
	/// `<select>` filled from [`ModelAdmin::field_choices`]
	ForeignKey,
}

/// Form field definition
#[derive(Debug, Clone, Serialize)]
pub struct FormField {
	pub name: String,
	pub label: String,
	pub kind: FieldKind,
	pub required: bool,
	/// Value shown in a fresh form
	pub initial: Option<String>,
}

impl FormField {
	pub fn text(name: &str, label: &str, max_length: usize) -> Self {
		Self::new(name, label, FieldKind::Text { max_length })
	}

	pub fn integer(name: &str, label: &str) -> Self {
		Self::new(name, label, FieldKind::Integer)
	}

	pub fn datetime(name: &str, label: &str) -> Self {
		Self::new(name, label, FieldKind::DateTime)
	}

	pub fn foreign_key(name: &str, label: &str) -> Self {
		Self::new(name, label, FieldKind::ForeignKey)
	}

	fn new(name: &str, label: &str, kind: FieldKind) -> Self {
		Self {
			name: name.to_string(),
			label: label.to_string(),
			kind,
			required: true,
			initial: None,
		}
	}

	pub fn with_initial(mut self, initial: impl Into<String>) -> Self {
		self.initial = Some(initial.into());
		self
	}

	/// Check a submitted value, returning the error message if invalid
	pub fn validate(&self, raw: Option<&str>) -> Option<String> {
		let value = raw.map(str::trim).unwrap_or("");
		if value.is_empty() {
			return self.required.then(|| "This field is required.".to_string());
		}
		match &self.kind {
			FieldKind::Text { max_length } => {
				let length = raw.unwrap_or("").chars().count();
				(length > *max_length).then(|| {
					format!(
						"Ensure this value has at most {} characters (it has {}).",
						max_length, length
					)
				})
			}
			FieldKind::Integer => value
				.parse::<i64>()
				.is_err()
				.then(|| "Enter a whole number.".to_string()),
			FieldKind::ForeignKey => value
				.parse::<i64>()
				.is_err()
				.then(|| "Select a valid choice.".to_string()),
			FieldKind::DateTime => parse_datetime(value)
				.is_none()
				.then(|| "Enter a valid date/time.".to_string()),
		}
	}
}

/// Group of fields on the change form
#[derive(Debug, Clone, Serialize)]
pub struct Fieldset {
	pub name: Option<String>,
	pub fields: Vec<String>,
	/// `collapse` renders the fieldset folded
	pub classes: Vec<String>,
}

impl Fieldset {
	pub fn new(name: Option<&str>, fields: &[&str]) -> Self {
		Self {
			name: name.map(str::to_string),
			fields: fields.iter().map(|f| f.to_string()).collect(),
			classes: Vec::new(),
		}
	}

	pub fn with_classes(mut self, classes: &[&str]) -> Self {
		self.classes = classes.iter().map(|c| c.to_string()).collect();
		self
	}

	pub fn is_collapsed(&self) -> bool {
		self.classes.iter().any(|c| c == "collapse")
	}
}

/// An existing related row shown inline on the change form
#[derive(Debug, Clone, Serialize)]
pub struct InlineRow {
	pub id: Option<i64>,
	pub values: IndexMap<String, String>,
}

/// Object loaded for the change form
#[derive(Debug, Clone, Serialize)]
pub struct AdminObject {
	pub id: i64,
	pub repr: String,
	/// Field values as form strings
	pub values: IndexMap<String, String>,
	/// Related rows, keyed by inline prefix
	pub inline_rows: IndexMap<String, Vec<InlineRow>>,
}

/// Result of [`ModelAdmin::save`]
#[derive(Debug, Clone, PartialEq)]
pub enum SaveOutcome {
	Saved(i64),
	Invalid(FormErrors),
}

/// Parse the value of a `datetime-local` input, interpreted as UTC
///
/// # Examples
///
/// ```
/// use mysite::admin::parse_datetime;
///
/// assert!(parse_datetime("2024-05-01T09:30").is_some());
/// assert!(parse_datetime("2024-05-01T09:30:15").is_some());
/// assert!(parse_datetime("yesterday").is_none());
/// ```
pub fn parse_datetime(value: &str) -> Option<DateTime<Utc>> {
	let value = value.trim();
	["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"]
		.iter()
		.find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
		.map(|naive| naive.and_utc())
		.or_else(|| DateTime::parse_from_rfc3339(value).ok().map(|dt| dt.with_timezone(&Utc)))
}

/// Format a timestamp for a `datetime-local` input
pub fn format_datetime_input(value: &DateTime<Utc>) -> String {
	value.format("%Y-%m-%dT%H:%M:%S").to_string()
}

/// "pub_date" -> "Pub date"
pub fn humanize_field_name(field: &str) -> String {
	let words = field.replace("__", " ").replace('_', " ");
	let mut chars = words.trim().chars();
	match chars.next() {
		Some(first) => first.to_uppercase().chain(chars).collect(),
		None => String::new(),
	}
}
