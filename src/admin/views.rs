//! Admin views: index, change list, add/change forms and delete confirmation.

use chrono::Utc;
use indexmap::IndexMap;
use serde::Serialize;
use sqlx::SqlitePool;
use std::sync::Arc;
use tera::Context;

use super::{
	DateFilter, FieldKind, FieldValue, FilterChoice, FilterInfo, FormData, FormErrors, FormField,
	InlineFormData, InlineModelAdmin, InlineType, ListQueryParams, ModelAdmin, SaveOutcome,
	parse_inline_formset,
};
use crate::exception::Result;
use crate::http::{Method, Request, Response};
use crate::shortcuts::{get_object_or_404, redirect, render};
use crate::state::AppState;

#[derive(Debug, Serialize)]
struct ColumnContext {
	field: String,
	label: String,
	sortable: bool,
	/// `asc` or `desc` when the list is sorted by this column
	sorted: Option<&'static str>,
	sort_query: String,
}

#[derive(Debug, Serialize)]
struct CellContext {
	text: String,
	/// `yes` or `no` for boolean cells, rendered as an icon
	boolean: Option<&'static str>,
	link: Option<String>,
}

#[derive(Debug, Serialize)]
struct RowContext {
	id: i64,
	cells: Vec<CellContext>,
}

#[derive(Debug, Serialize)]
struct PageLink {
	number: usize,
	query: String,
	current: bool,
}

#[derive(Debug, Serialize)]
struct OptionContext {
	value: String,
	label: String,
	selected: bool,
}

#[derive(Debug, Serialize)]
struct FieldContext {
	name: String,
	label: String,
	widget: &'static str,
	required: bool,
	max_length: Option<usize>,
	value: String,
	error: Option<String>,
	options: Vec<OptionContext>,
}

#[derive(Debug, Serialize)]
struct FieldsetContext {
	name: Option<String>,
	collapsed: bool,
	fields: Vec<FieldContext>,
}

#[derive(Debug, Serialize)]
struct InlineFormContext {
	index: usize,
	id: Option<i64>,
	delete: bool,
	cells: Vec<FieldContext>,
}

#[derive(Debug, Serialize)]
struct InlineContext {
	prefix: String,
	verbose_name_plural: String,
	tabular: bool,
	can_delete: bool,
	headers: Vec<String>,
	forms: Vec<InlineFormContext>,
	total_forms: usize,
}

#[derive(Debug, Serialize)]
struct RelatedContext {
	verbose_name_plural: String,
	items: Vec<String>,
}

fn widget(kind: &FieldKind) -> &'static str {
	match kind {
		FieldKind::Text { .. } => "text",
		FieldKind::Integer => "number",
		FieldKind::DateTime => "datetime",
		FieldKind::ForeignKey => "select",
	}
}

/// `?` when a query string would otherwise be empty, so links still clear it
fn href(query: String) -> String {
	if query.is_empty() { "?".to_string() } else { query }
}

fn model_admin(request: &Request, state: &AppState) -> Result<Arc<dyn ModelAdmin>> {
	let app_label: String = request.path_param("app_label")?;
	let model_name: String = request.path_param("model_name")?;
	state.admin.get(&app_label, &model_name)
}

fn base_context(state: &AppState, admin: &dyn ModelAdmin) -> Context {
	let mut context = Context::new();
	context.insert("site_header", state.admin.site_header());
	context.insert("app_label", admin.app_label());
	context.insert("model_name", admin.model_name());
	context.insert("verbose_name", &admin.verbose_name());
	context.insert("verbose_name_plural", &admin.verbose_name_plural());
	context
}

fn url(state: &AppState, name: &str, admin: &dyn ModelAdmin, id: Option<i64>) -> Result<String> {
	let mut args = vec![admin.app_label().to_string(), admin.model_name().to_string()];
	args.extend(id.map(|id| id.to_string()));
	state.reverser.reverse(&format!("admin:{}", name), &args)
}

/// Admin index listing the registered models per app
///
/// GET /admin/
pub async fn index(request: Request) -> Result<Response> {
	let state = AppState::from_request(&request)?;
	let mut context = Context::new();
	context.insert("site_header", state.admin.site_header());
	context.insert("app_list", &state.admin.apps());
	render(&request, "admin/index.html", context)
}

/// Change list with search, date filters, sorting and pagination
///
/// GET /admin/{app_label}/{model_name}/
pub async fn changelist_view(request: Request) -> Result<Response> {
	let state = AppState::from_request(&request)?;
	let admin = model_admin(&request, &state)?;
	let params = ListQueryParams::from_query(&request.query_params, &admin.list_filter());
	let change_list = admin.changelist(&state.pool, &params, Utc::now()).await?;

	let list_display = admin.list_display();
	let columns: Vec<ColumnContext> = list_display
		.iter()
		.map(|field| {
			let descending = format!("-{}", field);
			let sorted = match params.ordering.as_deref() {
				Some(o) if o == *field => Some("asc"),
				Some(o) if o == descending => Some("desc"),
				_ => None,
			};
			let toggled = if sorted == Some("asc") { descending.as_str() } else { *field };
			ColumnContext {
				field: field.to_string(),
				label: admin.column_label(field),
				sortable: admin.sort_column(field).is_some(),
				sorted,
				sort_query: href(params.with_ordering(toggled).to_query_string()),
			}
		})
		.collect();

	let mut rows = Vec::with_capacity(change_list.rows.len());
	for row in &change_list.rows {
		let change_url = url(&state, "change", admin.as_ref(), Some(row.id))?;
		let cells = list_display
			.iter()
			.enumerate()
			.map(|(i, field)| {
				let value = match *field {
					"__str__" => FieldValue::Text(row.repr.clone()),
					_ => row.values.get(*field).cloned().unwrap_or(FieldValue::Null),
				};
				let boolean = match value {
					FieldValue::Boolean(b) => Some(if b { "yes" } else { "no" }),
					_ => None,
				};
				CellContext {
					text: value.display(),
					boolean,
					link: (i == 0).then(|| change_url.clone()),
				}
			})
			.collect();
		rows.push(RowContext { id: row.id, cells });
	}

	let filters: Vec<FilterInfo> = admin
		.list_filter()
		.iter()
		.map(|field| {
			let current = params.filters.get(*field).map(|v| DateFilter::from_param(v));
			FilterInfo {
				field: field.to_string(),
				title: admin.column_label(field).to_lowercase(),
				choices: DateFilter::ALL
					.iter()
					.map(|filter| FilterChoice {
						value: filter.param().map(str::to_string),
						label: filter.label().to_string(),
						selected: current.unwrap_or(DateFilter::Any) == *filter,
						query: href(params.with_filter(field, filter.param()).to_query_string()),
					})
					.collect(),
			}
		})
		.collect();

	let pages: Vec<PageLink> = (1..=change_list.num_pages)
		.map(|number| PageLink {
			number,
			query: href(params.with_page(number).to_query_string()),
			current: number == change_list.page,
		})
		.collect();

	let mut context = base_context(&state, admin.as_ref());
	context.insert("columns", &columns);
	context.insert("rows", &rows);
	context.insert("filters", &filters);
	context.insert("has_search", &!admin.search_fields().is_empty());
	context.insert("search_query", params.search.as_deref().unwrap_or(""));
	context.insert("search_help_text", &admin.search_help_text());
	context.insert("result_count", &change_list.result_count);
	context.insert("total_count", &change_list.total_count);
	context.insert("page", &change_list.page);
	context.insert("num_pages", &change_list.num_pages);
	context.insert("pages", &pages);
	context.insert("add_url", &url(&state, "add", admin.as_ref(), None)?);
	render(&request, "admin/change_list.html", context)
}

/// Add form
///
/// GET|POST /admin/{app_label}/{model_name}/add/
pub async fn add_view(request: Request) -> Result<Response> {
	change_form(request, None).await
}

/// Change form
///
/// GET|POST /admin/{app_label}/{model_name}/{object_id}/change/
pub async fn change_view(request: Request) -> Result<Response> {
	let object_id: i64 = request.path_param("object_id")?;
	change_form(request, Some(object_id)).await
}

async fn change_form(request: Request, object_id: Option<i64>) -> Result<Response> {
	let state = AppState::from_request(&request)?;
	let admin = model_admin(&request, &state)?;

	let object = match object_id {
		Some(id) => {
			let object = admin.get_object(&state.pool, id).await?;
			Some(get_object_or_404(object, &admin.verbose_name())?)
		}
		None => None,
	};

	if request.method == Method::POST {
		let data: FormData = request.form_pairs()?.into_iter().collect();
		match admin.save(&state.pool, object_id, &data).await? {
			SaveOutcome::Saved(id) => {
				tracing::info!(
					model = admin.model_name(),
					id,
					added = object_id.is_none(),
					"Saved object in admin"
				);
				let location = if data.contains_key("_continue") {
					url(&state, "change", admin.as_ref(), Some(id))?
				} else if data.contains_key("_addanother") {
					url(&state, "add", admin.as_ref(), None)?
				} else {
					url(&state, "changelist", admin.as_ref(), None)?
				};
				return Ok(redirect(&location));
			}
			SaveOutcome::Invalid(errors) => {
				let values = admin
					.fields()
					.iter()
					.map(|f| (f.name.clone(), data.get(&f.name).cloned().unwrap_or_default()))
					.collect();
				let inline_forms = admin
					.inlines()
					.iter()
					.map(|inline| (inline.prefix(), parse_inline_formset(inline, &data)))
					.collect();
				let form = FormState {
					object_id,
					repr: object.as_ref().map(|o| o.repr.clone()),
					values,
					inline_forms,
					errors,
				};
				return render_change_form(&request, &state, admin.as_ref(), form).await;
			}
		}
	}

	let form = match object {
		Some(object) => {
			let inline_forms = admin
				.inlines()
				.iter()
				.map(|inline| {
					let prefix = inline.prefix();
					let mut forms: Vec<InlineFormData> = object
						.inline_rows
						.get(&prefix)
						.map(|rows| {
							rows.iter()
								.map(|row| InlineFormData {
									id: row.id,
									values: row.values.clone(),
									delete: false,
								})
								.collect()
						})
						.unwrap_or_default();
					forms.extend(blank_inline_forms(inline));
					(prefix, forms)
				})
				.collect();
			FormState {
				object_id,
				repr: Some(object.repr),
				values: object.values,
				inline_forms,
				errors: FormErrors::new(),
			}
		}
		None => FormState {
			object_id: None,
			repr: None,
			values: admin
				.fields()
				.iter()
				.map(|f| (f.name.clone(), f.initial.clone().unwrap_or_default()))
				.collect(),
			inline_forms: admin
				.inlines()
				.iter()
				.map(|inline| (inline.prefix(), blank_inline_forms(inline)))
				.collect(),
			errors: FormErrors::new(),
		},
	};
	render_change_form(&request, &state, admin.as_ref(), form).await
}

/// Values to show on a change form
struct FormState {
	object_id: Option<i64>,
	repr: Option<String>,
	values: IndexMap<String, String>,
	inline_forms: IndexMap<String, Vec<InlineFormData>>,
	errors: FormErrors,
}

fn blank_inline_forms(inline: &InlineModelAdmin) -> Vec<InlineFormData> {
	let values: IndexMap<String, String> = inline
		.fields()
		.iter()
		.map(|f| (f.name.clone(), f.initial.clone().unwrap_or_default()))
		.collect();
	(0..inline.extra())
		.map(|_| InlineFormData {
			id: None,
			values: values.clone(),
			delete: false,
		})
		.collect()
}

async fn field_context(
	admin: &dyn ModelAdmin,
	pool: &SqlitePool,
	field: &FormField,
	name: String,
	value: String,
	error: Option<String>,
) -> Result<FieldContext> {
	let options = match field.kind {
		FieldKind::ForeignKey => admin
			.field_choices(pool, &field.name)
			.await?
			.into_iter()
			.map(|(option, label)| OptionContext {
				selected: option == value,
				value: option,
				label,
			})
			.collect(),
		_ => Vec::new(),
	};
	let max_length = match field.kind {
		FieldKind::Text { max_length } => Some(max_length),
		_ => None,
	};
	Ok(FieldContext {
		name,
		label: field.label.clone(),
		widget: widget(&field.kind),
		required: field.required,
		max_length,
		value,
		error,
		options,
	})
}

async fn render_change_form(
	request: &Request,
	state: &AppState,
	admin: &dyn ModelAdmin,
	form: FormState,
) -> Result<Response> {
	let fields = admin.fields();

	let mut fieldsets = Vec::new();
	for fieldset in admin.fieldsets() {
		let mut contexts = Vec::new();
		for name in &fieldset.fields {
			let Some(field) = fields.iter().find(|f| &f.name == name) else {
				continue;
			};
			let value = form.values.get(name).cloned().unwrap_or_default();
			let error = form.errors.get(name).cloned();
			contexts.push(field_context(admin, &state.pool, field, name.clone(), value, error).await?);
		}
		fieldsets.push(FieldsetContext {
			collapsed: fieldset.is_collapsed(),
			name: fieldset.name,
			fields: contexts,
		});
	}

	let mut inlines = Vec::new();
	for inline in admin.inlines() {
		let prefix = inline.prefix();
		let rows = form.inline_forms.get(&prefix).cloned().unwrap_or_default();
		let mut forms = Vec::with_capacity(rows.len());
		for (index, row) in rows.iter().enumerate() {
			let mut cells = Vec::new();
			for field in inline.fields() {
				let name = format!("{}-{}-{}", prefix, index, field.name);
				let value = row.values.get(&field.name).cloned().unwrap_or_default();
				let error = form.errors.get(&name).cloned();
				cells.push(field_context(admin, &state.pool, field, name, value, error).await?);
			}
			forms.push(InlineFormContext {
				index,
				id: row.id,
				delete: row.delete,
				cells,
			});
		}
		inlines.push(InlineContext {
			verbose_name_plural: inline.verbose_name_plural().to_string(),
			tabular: inline.inline_type() == InlineType::Tabular,
			can_delete: inline.can_delete(),
			headers: inline.fields().iter().map(|f| f.label.clone()).collect(),
			total_forms: forms.len(),
			forms,
			prefix,
		});
	}

	let error_note = match form.errors.len() {
		0 => None,
		1 => Some("Please correct the error below."),
		_ => Some("Please correct the errors below."),
	};
	let title = match form.object_id {
		Some(_) => format!("Change {}", admin.verbose_name().to_lowercase()),
		None => format!("Add {}", admin.verbose_name().to_lowercase()),
	};

	let mut context = base_context(state, admin);
	context.insert("title", &title);
	context.insert("object_id", &form.object_id);
	context.insert("object_repr", &form.repr);
	context.insert("fieldsets", &fieldsets);
	context.insert("inlines", &inlines);
	context.insert("errors", &form.errors);
	context.insert("error_note", &error_note);
	context.insert("changelist_url", &url(state, "changelist", admin, None)?);
	if let Some(id) = form.object_id {
		context.insert("delete_url", &url(state, "delete", admin, Some(id))?);
	}
	render(request, "admin/change_form.html", context)
}

/// Delete confirmation; POST deletes the object
///
/// GET|POST /admin/{app_label}/{model_name}/{object_id}/delete/
pub async fn delete_view(request: Request) -> Result<Response> {
	let state = AppState::from_request(&request)?;
	let admin = model_admin(&request, &state)?;
	let object_id: i64 = request.path_param("object_id")?;
	let object = admin.get_object(&state.pool, object_id).await?;
	let object = get_object_or_404(object, &admin.verbose_name())?;

	if request.method == Method::POST {
		admin.delete(&state.pool, object_id).await?;
		tracing::info!(model = admin.model_name(), id = object_id, "Deleted object in admin");
		return Ok(redirect(&url(&state, "changelist", admin.as_ref(), None)?));
	}

	let related: Vec<RelatedContext> = admin
		.inlines()
		.iter()
		.filter_map(|inline| {
			let rows = object.inline_rows.get(&inline.prefix())?;
			let first_field = inline.fields().first()?;
			Some(RelatedContext {
				verbose_name_plural: inline.verbose_name_plural().to_string(),
				items: rows
					.iter()
					.filter_map(|row| row.values.get(&first_field.name).cloned())
					.collect(),
			})
		})
		.filter(|related| !related.items.is_empty())
		.collect();

	let mut context = base_context(&state, admin.as_ref());
	context.insert("object_id", &object_id);
	context.insert("object_repr", &object.repr);
	context.insert("related", &related);
	context.insert("change_url", &url(&state, "change", admin.as_ref(), Some(object_id))?);
	context.insert("changelist_url", &url(&state, "changelist", admin.as_ref(), None)?);
	render(&request, "admin/delete_confirmation.html", context)
}
