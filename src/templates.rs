//! Template loading and rendering.
//!
//! Templates under `templates/` are embedded into the binary with rust-embed
//! and rendered with Tera. Two helpers are registered on top of Tera's
//! builtins:
//!
//! - `url(name=..., args=[...])` reverses a named route, like Django's `{% url %}`
//! - `pluralize` appends `s` (or the given suffix) unless the value is 1

use rust_embed::RustEmbed;
use std::collections::HashMap;
use std::sync::Arc;
use tera::{Context, Tera, Value};

use crate::exception::{Error, Result};
use crate::urls::UrlReverser;

/// Embedded template directory
#[derive(RustEmbed)]
#[folder = "templates/"]
struct TemplateAssets;

/// Shared, cheaply clonable Tera instance
#[derive(Clone)]
pub struct TemplateEngine {
	tera: Arc<Tera>,
}

impl TemplateEngine {
	pub fn new(reverser: Arc<UrlReverser>) -> Result<Self> {
		let mut templates = Vec::new();
		for name in TemplateAssets::iter() {
			let Some(file) = TemplateAssets::get(&name) else {
				continue;
			};
			let source = String::from_utf8(file.data.into_owned())
				.map_err(|e| Error::Internal(format!("Template '{}' is not UTF-8: {}", name, e)))?;
			templates.push((name.to_string(), source));
		}

		let mut tera = Tera::default();
		tera.add_raw_templates(templates)?;
		tera.register_function("url", UrlFunction { reverser });
		tera.register_filter("pluralize", pluralize);

		tracing::debug!(count = tera.get_template_names().count(), "Loaded templates");
		Ok(Self {
			tera: Arc::new(tera),
		})
	}

	pub fn render(&self, name: &str, context: &Context) -> Result<String> {
		Ok(self.tera.render(name, context)?)
	}

	pub fn has_template(&self, name: &str) -> bool {
		self.tera.get_template_names().any(|n| n == name)
	}
}

struct UrlFunction {
	reverser: Arc<UrlReverser>,
}

impl tera::Function for UrlFunction {
	fn call(&self, args: &HashMap<String, Value>) -> tera::Result<Value> {
		let name = args
			.get("name")
			.and_then(Value::as_str)
			.ok_or_else(|| tera::Error::msg("url() requires a `name` argument"))?;

		let positional: Vec<String> = match args.get("args") {
			None => Vec::new(),
			Some(Value::Array(values)) => values.iter().map(value_to_param).collect(),
			Some(other) => vec![value_to_param(other)],
		};

		self.reverser
			.reverse(name, &positional)
			.map(Value::String)
			.map_err(|e| tera::Error::msg(e.to_string()))
	}

	// Reversed URLs only contain pattern text and validated parameters
	fn is_safe(&self) -> bool {
		true
	}
}

fn value_to_param(value: &Value) -> String {
	match value {
		Value::String(s) => s.clone(),
		other => other.to_string(),
	}
}

/// `{{ count|pluralize }}`, `{{ count|pluralize(suffix="es") }}`
fn pluralize(value: &Value, args: &HashMap<String, Value>) -> tera::Result<Value> {
	let count = match value {
		Value::Number(n) => n.as_f64().unwrap_or(0.0),
		Value::Array(items) => items.len() as f64,
		Value::String(s) => s.parse().unwrap_or(0.0),
		_ => 0.0,
	};
	let suffix = args.get("suffix").and_then(Value::as_str).unwrap_or("s");

	Ok(Value::String(if count == 1.0 {
		String::new()
	} else {
		suffix.to_string()
	}))
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::urls::PathPattern;
	use rstest::rstest;
	use serde_json::json;

	fn engine() -> TemplateEngine {
		let mut reverser = UrlReverser::new();
		reverser.register(
			"polls:detail",
			PathPattern::new("/polls/{question_id:int}/").unwrap(),
		);
		TemplateEngine::new(Arc::new(reverser)).unwrap()
	}

	#[rstest]
	#[case(json!(0), "s")]
	#[case(json!(1), "")]
	#[case(json!(2), "s")]
	fn test_pluralize(#[case] value: Value, #[case] expected: &str) {
		let result = pluralize(&value, &HashMap::new()).unwrap();
		assert_eq!(result, Value::String(expected.to_string()));
	}

	#[rstest]
	fn test_embedded_templates_are_loaded() {
		let engine = engine();
		assert!(engine.has_template("polls/index.html"));
		assert!(engine.has_template("polls/detail.html"));
		assert!(engine.has_template("polls/results.html"));
		assert!(engine.has_template("admin/change_list.html"));
	}

	#[rstest]
	fn test_url_function_is_not_escaped() {
		let engine = engine();
		let mut tera = (*engine.tera).clone();
		tera.add_raw_template("link.html", r#"<a href="{{ url(name="polls:detail", args=[id]) }}">"#)
			.unwrap();
		let mut context = Context::new();
		context.insert("id", &5);
		assert_eq!(
			tera.render("link.html", &context).unwrap(),
			r#"<a href="/polls/5/">"#
		);
	}
}
