use std::collections::{BTreeMap, HashMap};

/// Change list query string: `?q=` search, `?o=` ordering, `?p=` page and
/// one parameter per `list_filter` field
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListQueryParams {
	pub search: Option<String>,
	/// Column name, `-` prefixed for descending
	pub ordering: Option<String>,
	/// 1-based page number
	pub page: usize,
	pub filters: BTreeMap<String, String>,
}

impl ListQueryParams {
	/// Pick the recognised parameters out of a request's query string
	pub fn from_query(query: &HashMap<String, String>, list_filter: &[&str]) -> Self {
		let search = query
			.get("q")
			.map(|q| q.trim().to_string())
			.filter(|q| !q.is_empty());
		let ordering = query.get("o").cloned().filter(|o| !o.is_empty());
		let page = query
			.get("p")
			.and_then(|p| p.parse::<usize>().ok())
			.unwrap_or(1)
			.max(1);
		let filters = list_filter
			.iter()
			.filter_map(|field| {
				query
					.get(*field)
					.filter(|v| !v.is_empty())
					.map(|v| (field.to_string(), v.clone()))
			})
			.collect();

		Self {
			search,
			ordering,
			page,
			filters,
		}
	}

	/// Whitespace-separated search terms
	pub fn search_terms(&self) -> Vec<&str> {
		self.search
			.as_deref()
			.map(|q| q.split_whitespace().collect())
			.unwrap_or_default()
	}

	fn pairs(&self) -> Vec<(String, String)> {
		let mut pairs = Vec::new();
		if let Some(q) = &self.search {
			pairs.push(("q".to_string(), q.clone()));
		}
		for (field, value) in &self.filters {
			pairs.push((field.clone(), value.clone()));
		}
		if let Some(o) = &self.ordering {
			pairs.push(("o".to_string(), o.clone()));
		}
		if self.page > 1 {
			pairs.push(("p".to_string(), self.page.to_string()));
		}
		pairs
	}

	/// Encoded query string including the leading `?`, or empty
	pub fn to_query_string(&self) -> String {
		let pairs = self.pairs();
		if pairs.is_empty() {
			return String::new();
		}
		serde_urlencoded::to_string(pairs)
			.map(|encoded| format!("?{}", encoded))
			.unwrap_or_default()
	}

	/// Same query with one filter changed, back on the first page
	pub fn with_filter(&self, field: &str, value: Option<&str>) -> Self {
		let mut next = self.clone();
		match value {
			Some(value) => next.filters.insert(field.to_string(), value.to_string()),
			None => next.filters.remove(field),
		};
		next.page = 1;
		next
	}

	pub fn with_ordering(&self, ordering: &str) -> Self {
		let mut next = self.clone();
		next.ordering = Some(ordering.to_string());
		next.page = 1;
		next
	}

	pub fn with_page(&self, page: usize) -> Self {
		let mut next = self.clone();
		next.page = page;
		next
	}
}
