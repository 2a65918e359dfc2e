//! URL reverse resolution, the equivalent of Django's `reverse()`.

use std::collections::HashMap;

use super::PathPattern;
use crate::exception::{Error, Result};

/// Maps route names (`"namespace:name"`) to their patterns
#[derive(Debug, Clone, Default)]
pub struct UrlReverser {
	routes: HashMap<String, PathPattern>,
}

impl UrlReverser {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn register(&mut self, name: impl Into<String>, pattern: PathPattern) {
		self.routes.insert(name.into(), pattern);
	}

	/// Reverse with positional arguments, filled in pattern order
	///
	/// # Examples
	///
	/// ```
	/// use mysite::urls::{PathPattern, UrlReverser};
	///
	/// let mut reverser = UrlReverser::new();
	/// reverser.register("polls:detail", PathPattern::new("/polls/{question_id:int}/").unwrap());
	///
	/// assert_eq!(reverser.reverse("polls:detail", &["7"]).unwrap(), "/polls/7/");
	/// assert!(reverser.reverse("polls:detail", &["seven"]).is_err());
	/// assert!(reverser.reverse::<&str>("polls:missing", &[]).is_err());
	/// ```
	pub fn reverse<S: AsRef<str>>(&self, name: &str, args: &[S]) -> Result<String> {
		let pattern = self.lookup(name)?;
		if args.len() != pattern.params().len() {
			return Err(Error::Reverse(format!(
				"'{}' expects {} argument(s), got {}",
				name,
				pattern.params().len(),
				args.len()
			)));
		}

		let values = pattern
			.params()
			.iter()
			.zip(args)
			.map(|((param, _), value)| (param.clone(), value.as_ref().to_string()))
			.collect();
		pattern.build(&values)
	}

	/// Reverse with named arguments
	pub fn reverse_with(&self, name: &str, kwargs: &HashMap<String, String>) -> Result<String> {
		self.lookup(name)?.build(kwargs)
	}

	pub fn has_route(&self, name: &str) -> bool {
		self.routes.contains_key(name)
	}

	/// Registered names, sorted
	pub fn route_names(&self) -> Vec<&str> {
		let mut names: Vec<&str> = self.routes.keys().map(String::as_str).collect();
		names.sort_unstable();
		names
	}

	fn lookup(&self, name: &str) -> Result<&PathPattern> {
		self.routes
			.get(name)
			.ok_or_else(|| Error::Reverse(format!("Reverse for '{}' not found", name)))
	}
}
