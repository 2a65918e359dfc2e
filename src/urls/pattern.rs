//! Path patterns with typed placeholders.
//!
//! `{name}` matches a single path segment, `{name:int}` matches digits only.

use regex::Regex;
use std::collections::HashMap;

use crate::exception::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
	Str,
	Int,
}

impl ParamKind {
	fn regex(self) -> &'static str {
		match self {
			ParamKind::Str => "[^/]+",
			ParamKind::Int => "[0-9]+",
		}
	}
}

/// Compiled URL pattern
#[derive(Debug, Clone)]
pub struct PathPattern {
	pattern: String,
	regex: Regex,
	params: Vec<(String, ParamKind)>,
}

impl PathPattern {
	/// Compile a pattern such as `/polls/{question_id:int}/vote/`
	///
	/// # Examples
	///
	/// ```
	/// use mysite::urls::PathPattern;
	///
	/// let pattern = PathPattern::new("/polls/{question_id:int}/").unwrap();
	/// let params = pattern.match_path("/polls/5/").unwrap();
	/// assert_eq!(params["question_id"], "5");
	/// assert!(pattern.match_path("/polls/five/").is_none());
	/// ```
	pub fn new(pattern: impl Into<String>) -> Result<Self> {
		let pattern = pattern.into();
		let mut regex = String::from("^");
		let mut params = Vec::new();
		let mut rest = pattern.as_str();

		while let Some(start) = rest.find('{') {
			regex.push_str(&regex::escape(&rest[..start]));
			let end = rest[start..]
				.find('}')
				.map(|offset| start + offset)
				.ok_or_else(|| Error::Internal(format!("Unclosed placeholder in '{}'", pattern)))?;

			let spec = &rest[start + 1..end];
			let (name, kind) = match spec.split_once(':') {
				Some((name, "int")) => (name, ParamKind::Int),
				Some((name, "str")) => (name, ParamKind::Str),
				Some((_, other)) => {
					return Err(Error::Internal(format!(
						"Unknown converter '{}' in '{}'",
						other, pattern
					)));
				}
				None => (spec, ParamKind::Str),
			};
			if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
				return Err(Error::Internal(format!(
					"Invalid placeholder name '{}' in '{}'",
					name, pattern
				)));
			}

			regex.push_str(&format!("(?P<{}>{})", name, kind.regex()));
			params.push((name.to_string(), kind));
			rest = &rest[end + 1..];
		}
		regex.push_str(&regex::escape(rest));
		regex.push('$');

		let regex = Regex::new(&regex)
			.map_err(|e| Error::Internal(format!("Invalid pattern '{}': {}", pattern, e)))?;

		Ok(Self {
			pattern,
			regex,
			params,
		})
	}

	pub fn pattern(&self) -> &str {
		&self.pattern
	}

	pub fn params(&self) -> &[(String, ParamKind)] {
		&self.params
	}

	/// Match a request path, returning the captured parameters
	pub fn match_path(&self, path: &str) -> Option<HashMap<String, String>> {
		let captures = self.regex.captures(path)?;
		Some(
			self.params
				.iter()
				.filter_map(|(name, _)| {
					captures
						.name(name)
						.map(|m| (name.clone(), m.as_str().to_string()))
				})
				.collect(),
		)
	}

	/// Substitute parameter values into the pattern
	pub fn build(&self, values: &HashMap<String, String>) -> Result<String> {
		let mut url = String::with_capacity(self.pattern.len());
		let mut rest = self.pattern.as_str();

		for (name, kind) in &self.params {
			let start = rest.find('{').unwrap_or(rest.len());
			let end = rest[start..].find('}').map(|o| start + o).unwrap_or(rest.len());
			url.push_str(&rest[..start]);

			let value = values
				.get(name)
				.ok_or_else(|| Error::Reverse(format!("Missing parameter '{}' for '{}'", name, self.pattern)))?;
			validate_param(name, *kind, value)?;
			url.push_str(value);

			rest = rest.get(end + 1..).unwrap_or("");
		}
		url.push_str(rest);
		Ok(url)
	}
}

/// Reject values that would change the shape of the reversed URL
fn validate_param(name: &str, kind: ParamKind, value: &str) -> Result<()> {
	if value.is_empty() || value.contains(['/', '?', '#']) {
		return Err(Error::Reverse(format!(
			"Invalid value '{}' for parameter '{}'",
			value, name
		)));
	}
	if kind == ParamKind::Int && !value.chars().all(|c| c.is_ascii_digit()) {
		return Err(Error::Reverse(format!(
			"Parameter '{}' expects an integer, got '{}'",
			name, value
		)));
	}
	Ok(())
}
