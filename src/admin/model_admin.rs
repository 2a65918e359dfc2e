//! Model admin configuration and trait
//!
//! This module defines how models are displayed and managed in the admin
//! interface. Configuration hooks have Django's defaults; an implementation
//! supplies the SQL describing its table and the data hooks for loading and
//! saving single objects. The change list query (search, filters, ordering,
//! pagination) is built generically from those pieces.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::sqlite::SqliteRow;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};

use super::{
	AdminObject, AdminRow, DateFilter, FieldKind, Fieldset, FormData, FormField, InlineModelAdmin,
	ListQueryParams, SaveOutcome, humanize_field_name,
};
use crate::apps::polls::models::like_pattern;
use crate::exception::Result;

/// Page of a change list
#[derive(Debug, Clone, Serialize)]
pub struct ChangeList {
	pub rows: Vec<AdminRow>,
	/// Rows matching the search and filters
	pub result_count: i64,
	/// Rows in the table
	pub total_count: i64,
	pub page: usize,
	pub num_pages: usize,
}

/// Trait for configuring model administration
#[async_trait]
pub trait ModelAdmin: Send + Sync {
	fn app_label(&self) -> &str;

	/// Lowercase model name used in URLs, e.g. `question`
	fn model_name(&self) -> &str;

	fn verbose_name(&self) -> String {
		humanize_field_name(self.model_name())
	}

	fn verbose_name_plural(&self) -> String {
		format!("{}s", self.verbose_name())
	}

	/// Editable fields of the change form
	fn fields(&self) -> Vec<FormField>;

	/// Layout of the change form; one unnamed fieldset by default
	fn fieldsets(&self) -> Vec<Fieldset> {
		let names: Vec<String> = self.fields().into_iter().map(|f| f.name).collect();
		let names: Vec<&str> = names.iter().map(String::as_str).collect();
		vec![Fieldset::new(None, &names)]
	}

	/// Columns of the change list; `__str__` is the object's string form
	fn list_display(&self) -> Vec<&str> {
		vec!["__str__"]
	}

	/// Date fields offered as sidebar filters
	fn list_filter(&self) -> Vec<&str> {
		vec![]
	}

	/// Fields matched by the search box; `fk__field` follows a foreign key
	fn search_fields(&self) -> Vec<&str> {
		vec![]
	}

	fn search_help_text(&self) -> Option<&str> {
		None
	}

	fn inlines(&self) -> Vec<InlineModelAdmin> {
		vec![]
	}

	/// Default ordering (prefix with "-" for descending)
	fn ordering(&self) -> Vec<&str> {
		vec!["-id"]
	}

	fn list_per_page(&self) -> usize {
		100
	}

	/// Header of a computed column, like Django's `@admin.display(description=...)`
	fn display_description(&self, _field: &str) -> Option<String> {
		None
	}

	/// Header of a change list column
	fn column_label(&self, field: &str) -> String {
		if let Some(description) = self.display_description(field) {
			return description;
		}
		match field {
			"__str__" => self.verbose_name().to_uppercase(),
			"id" => "ID".to_string(),
			_ => self
				.fields()
				.into_iter()
				.find(|f| f.name == field)
				.map(|f| f.label)
				.unwrap_or_else(|| humanize_field_name(field)),
		}
	}

	/// SQL `FROM` target, joins included, e.g. `polls_question q`
	fn from_clause(&self) -> &str;

	/// Columns selected for [`row_from`](Self::row_from)
	fn select_columns(&self) -> &str;

	/// SQL expression for a field name used in search, filters and ordering
	fn lookup_column(&self, field: &str) -> Option<String>;

	/// SQL expression a change list column sorts by, if sortable
	fn sort_column(&self, field: &str) -> Option<String> {
		self.lookup_column(field)
	}

	fn row_from(&self, row: &SqliteRow) -> Result<AdminRow>;

	async fn get_object(&self, pool: &SqlitePool, id: i64) -> Result<Option<AdminObject>>;

	/// Validate and store the submitted form; `id` is `None` when adding
	async fn save(&self, pool: &SqlitePool, id: Option<i64>, data: &FormData) -> Result<SaveOutcome>;

	async fn delete(&self, pool: &SqlitePool, id: i64) -> Result<bool>;

	/// `(value, label)` options for a foreign key field
	async fn field_choices(&self, _pool: &SqlitePool, _field: &str) -> Result<Vec<(String, String)>> {
		Ok(Vec::new())
	}

	/// One page of rows matching the search, filters and ordering
	async fn changelist(
		&self,
		pool: &SqlitePool,
		params: &ListQueryParams,
		now: DateTime<Utc>,
	) -> Result<ChangeList> {
		let total_count: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", self.from_clause()))
			.fetch_one(pool)
			.await?;

		let mut count_query = QueryBuilder::<Sqlite>::new(format!("SELECT COUNT(*) FROM {}", self.from_clause()));
		push_conditions(&mut count_query, self, params, now);
		let result_count: i64 = count_query.build_query_scalar().fetch_one(pool).await?;

		let per_page = self.list_per_page().max(1);
		let num_pages = (result_count.max(0) as usize).div_ceil(per_page).max(1);
		let page = params.page.clamp(1, num_pages);

		let mut query = QueryBuilder::<Sqlite>::new(format!(
			"SELECT {} FROM {}",
			self.select_columns(),
			self.from_clause()
		));
		push_conditions(&mut query, self, params, now);
		query.push(" ORDER BY ").push(order_by(self, params));
		query
			.push(" LIMIT ")
			.push_bind(per_page as i64)
			.push(" OFFSET ")
			.push_bind(((page - 1) * per_page) as i64);

		let rows = query
			.build()
			.fetch_all(pool)
			.await?
			.iter()
			.map(|row| self.row_from(row))
			.collect::<Result<Vec<_>>>()?;

		Ok(ChangeList {
			rows,
			result_count,
			total_count,
			page,
			num_pages,
		})
	}
}

/// Append the `WHERE` clause for search terms and date filters
///
/// Every search term must match at least one search field.
fn push_conditions<A: ModelAdmin + ?Sized>(
	query: &mut QueryBuilder<'_, Sqlite>,
	admin: &A,
	params: &ListQueryParams,
	now: DateTime<Utc>,
) {
	let mut keyword = " WHERE ";

	let columns: Vec<String> = admin
		.search_fields()
		.iter()
		.filter_map(|field| admin.lookup_column(field))
		.collect();
	if !columns.is_empty() {
		for term in params.search_terms() {
			query.push(keyword).push("(");
			keyword = " AND ";
			for (i, column) in columns.iter().enumerate() {
				if i > 0 {
					query.push(" OR ");
				}
				query
					.push(column)
					.push(" LIKE ")
					.push_bind(like_pattern(term))
					.push(" ESCAPE '\\'");
			}
			query.push(")");
		}
	}

	let fields = admin.fields();
	for (field, value) in &params.filters {
		let is_date = fields
			.iter()
			.any(|f| &f.name == field && f.kind == FieldKind::DateTime);
		if !is_date || !admin.list_filter().contains(&field.as_str()) {
			continue;
		}
		let (Some((start, end)), Some(column)) =
			(DateFilter::from_param(value).range(now), admin.lookup_column(field))
		else {
			continue;
		};
		query
			.push(keyword)
			.push(&column)
			.push(" >= ")
			.push_bind(start)
			.push(" AND ")
			.push(&column)
			.push(" < ")
			.push_bind(end);
		keyword = " AND ";
	}
}

/// `ORDER BY` expression from `?o=` or the default ordering, with the
/// primary key as tie-breaker
fn order_by<A: ModelAdmin + ?Sized>(admin: &A, params: &ListQueryParams) -> String {
	let requested = params.ordering.as_deref().and_then(|ordering| {
		let (field, descending) = match ordering.strip_prefix('-') {
			Some(field) => (field, true),
			None => (ordering, false),
		};
		if !admin.list_display().contains(&field) {
			return None;
		}
		admin.sort_column(field).map(|column| (column, descending))
	});

	let mut terms: Vec<String> = match requested {
		Some((column, descending)) => vec![direction(column, descending)],
		None => admin
			.ordering()
			.iter()
			.filter_map(|entry| {
				let (field, descending) = match entry.strip_prefix('-') {
					Some(field) => (field, true),
					None => (*entry, false),
				};
				admin.lookup_column(field).map(|c| direction(c, descending))
			})
			.collect(),
	};

	if let Some(pk) = admin.lookup_column("id") {
		terms.push(format!("{} DESC", pk));
	}
	terms.join(", ")
}

fn direction(column: String, descending: bool) -> String {
	format!("{} {}", column, if descending { "DESC" } else { "ASC" })
}
