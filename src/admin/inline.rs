//! Inline editing of related rows on the parent's change form.
//!
//! Inline rows are submitted Django formset style:
//!
//! ```text
//! choice_set-TOTAL_FORMS=4
//! choice_set-0-id=12
//! choice_set-0-choice_text=Not much
//! choice_set-0-votes=3
//! choice_set-0-DELETE=on
//! choice_set-1-id=
//! choice_set-1-choice_text=The sky
//! ...
//! ```

use indexmap::IndexMap;
use serde::Serialize;

use super::{FormData, FormErrors, FormField};

/// Upper bound on `TOTAL_FORMS`, like Django's `absolute_max`
const MAX_INLINE_FORMS: usize = 1000;

/// Type of inline formset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum InlineType {
	/// Each related object in its own block
	Stacked,
	/// Related objects as rows of a table
	Tabular,
}

/// Configuration for inline model admin
#[derive(Debug, Clone, Serialize)]
pub struct InlineModelAdmin {
	/// Name of the related model
	model_name: String,
	/// Foreign key field pointing at the parent
	fk_name: String,
	verbose_name_plural: String,
	inline_type: InlineType,
	fields: Vec<FormField>,
	/// Number of extra empty forms to display
	extra: usize,
	can_delete: bool,
}

impl InlineModelAdmin {
	pub fn new(model_name: impl Into<String>, fk_name: impl Into<String>) -> Self {
		let model_name = model_name.into();
		Self {
			verbose_name_plural: format!("{}s", super::humanize_field_name(&model_name)),
			model_name,
			fk_name: fk_name.into(),
			inline_type: InlineType::Stacked,
			fields: Vec::new(),
			extra: 3,
			can_delete: true,
		}
	}

	pub fn with_type(mut self, inline_type: InlineType) -> Self {
		self.inline_type = inline_type;
		self
	}

	pub fn with_fields(mut self, fields: Vec<FormField>) -> Self {
		self.fields = fields;
		self
	}

	pub fn with_extra(mut self, extra: usize) -> Self {
		self.extra = extra;
		self
	}

	pub fn with_verbose_name_plural(mut self, name: impl Into<String>) -> Self {
		self.verbose_name_plural = name.into();
		self
	}

	pub fn model_name(&self) -> &str {
		&self.model_name
	}

	pub fn fk_name(&self) -> &str {
		&self.fk_name
	}

	pub fn inline_type(&self) -> InlineType {
		self.inline_type
	}

	pub fn fields(&self) -> &[FormField] {
		&self.fields
	}

	pub fn extra(&self) -> usize {
		self.extra
	}

	pub fn can_delete(&self) -> bool {
		self.can_delete
	}

	pub fn verbose_name_plural(&self) -> &str {
		&self.verbose_name_plural
	}

	/// Form field prefix, e.g. `choice_set`
	pub fn prefix(&self) -> String {
		format!("{}_set", self.model_name)
	}
}

/// One submitted inline form
#[derive(Debug, Clone, PartialEq)]
pub struct InlineFormData {
	pub id: Option<i64>,
	pub values: IndexMap<String, String>,
	pub delete: bool,
}

impl InlineFormData {
	/// A new row left as rendered (empty or at its initial values)
	pub fn is_blank(&self, inline: &InlineModelAdmin) -> bool {
		self.id.is_none()
			&& inline.fields().iter().all(|field| {
				let value = self.values.get(&field.name).map(|v| v.trim()).unwrap_or("");
				value.is_empty() || Some(value) == field.initial.as_deref()
			})
	}

	/// Field errors for this row, keyed `<prefix>-<index>-<field>`
	pub fn validate(&self, inline: &InlineModelAdmin, index: usize) -> FormErrors {
		let mut errors = FormErrors::new();
		for field in inline.fields() {
			if let Some(message) = field.validate(self.values.get(&field.name).map(String::as_str)) {
				errors.insert(format!("{}-{}-{}", inline.prefix(), index, field.name), message);
			}
		}
		errors
	}
}

/// Read the formset for `inline` out of the submitted form
pub fn parse_inline_formset(inline: &InlineModelAdmin, data: &FormData) -> Vec<InlineFormData> {
	let prefix = inline.prefix();
	let total: usize = data
		.get(&format!("{}-TOTAL_FORMS", prefix))
		.and_then(|v| v.trim().parse().ok())
		.unwrap_or(0)
		.min(MAX_INLINE_FORMS);

	(0..total)
		.map(|index| {
			let key = |name: &str| format!("{}-{}-{}", prefix, index, name);
			let id = data.get(&key("id")).and_then(|v| v.trim().parse().ok());
			let values = inline
				.fields()
				.iter()
				.map(|field| {
					let value = data.get(&key(&field.name)).cloned().unwrap_or_default();
					(field.name.clone(), value)
				})
				.collect();
			let delete = data
				.get(&key("DELETE"))
				.is_some_and(|v| matches!(v.as_str(), "on" | "true" | "1"));
			InlineFormData { id, values, delete }
		})
		.collect()
}
