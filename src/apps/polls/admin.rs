//! Admin configuration for the polls models.

use async_trait::async_trait;
use indexmap::IndexMap;
use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row, SqlitePool};

use super::models::{Choice, ChoiceManager, MAX_TEXT_LENGTH, Question, QuestionManager};
use crate::admin::{
	AdminObject, AdminRow, AdminSite, FieldValue, Fieldset, FormData, FormErrors, FormField,
	InlineModelAdmin, InlineRow, InlineType, ModelAdmin, SaveOutcome, format_datetime_input,
	parse_datetime, parse_inline_formset,
};
use crate::exception::{Error, Result};

use super::urls::APP_NAME;

const INVALID_CHOICE: &str = "Select a valid choice. That choice is not one of the available choices.";

fn field_errors(fields: &[FormField], data: &FormData) -> FormErrors {
	let mut errors = FormErrors::new();
	for field in fields {
		if let Some(message) = field.validate(data.get(&field.name).map(String::as_str)) {
			errors.insert(field.name.clone(), message);
		}
	}
	errors
}

fn value<'a>(data: &'a FormData, name: &str) -> &'a str {
	data.get(name).map(|v| v.trim()).unwrap_or("")
}

/// Choices edited as table rows on the question form
pub fn choice_inline() -> InlineModelAdmin {
	InlineModelAdmin::new("choice", "question")
		.with_type(InlineType::Tabular)
		.with_extra(3)
		.with_fields(vec![
			FormField::text("choice_text", "Choice text", MAX_TEXT_LENGTH),
			FormField::integer("votes", "Votes").with_initial("0"),
		])
}

/// Admin for [`Question`], with its choices inline
pub struct QuestionAdmin;

#[async_trait]
impl ModelAdmin for QuestionAdmin {
	fn app_label(&self) -> &str {
		APP_NAME
	}

	fn model_name(&self) -> &str {
		"question"
	}

	fn fields(&self) -> Vec<FormField> {
		vec![
			FormField::text("question_text", "Question text", MAX_TEXT_LENGTH),
			FormField::datetime("pub_date", "Date published"),
		]
	}

	fn fieldsets(&self) -> Vec<Fieldset> {
		vec![
			Fieldset::new(None, &["question_text"]),
			Fieldset::new(Some("Date Information"), &["pub_date"]).with_classes(&["collapse"]),
		]
	}

	fn inlines(&self) -> Vec<InlineModelAdmin> {
		vec![choice_inline()]
	}

	fn list_display(&self) -> Vec<&str> {
		vec!["question_text", "pub_date", "was_published_recently", "id"]
	}

	fn list_filter(&self) -> Vec<&str> {
		vec!["pub_date"]
	}

	fn search_fields(&self) -> Vec<&str> {
		vec!["question_text"]
	}

	fn display_description(&self, field: &str) -> Option<String> {
		(field == "was_published_recently").then(|| "Published recently?".to_string())
	}

	fn from_clause(&self) -> &str {
		"polls_question q"
	}

	fn select_columns(&self) -> &str {
		"q.id, q.question_text, q.pub_date"
	}

	fn lookup_column(&self, field: &str) -> Option<String> {
		match field {
			"id" | "question_text" | "pub_date" => Some(format!("q.{}", field)),
			_ => None,
		}
	}

	fn sort_column(&self, field: &str) -> Option<String> {
		match field {
			"was_published_recently" => Some("q.pub_date".to_string()),
			_ => self.lookup_column(field),
		}
	}

	fn row_from(&self, row: &SqliteRow) -> Result<AdminRow> {
		let question = Question::from_row(row)?;
		let values = IndexMap::from([
			("question_text".to_string(), FieldValue::Text(question.question_text.clone())),
			("pub_date".to_string(), FieldValue::DateTime(question.pub_date)),
			(
				"was_published_recently".to_string(),
				FieldValue::Boolean(question.was_published_recently()),
			),
			("id".to_string(), FieldValue::Integer(question.id)),
		]);
		Ok(AdminRow {
			id: question.id,
			repr: question.to_string(),
			values,
		})
	}

	async fn get_object(&self, pool: &SqlitePool, id: i64) -> Result<Option<AdminObject>> {
		let Some(question) = QuestionManager::new(pool.clone()).get(id).await? else {
			return Ok(None);
		};
		let choices = ChoiceManager::new(pool.clone()).for_question(id).await?;

		let rows = choices
			.into_iter()
			.map(|choice| InlineRow {
				id: Some(choice.id),
				values: IndexMap::from([
					("choice_text".to_string(), choice.choice_text),
					("votes".to_string(), choice.votes.to_string()),
				]),
			})
			.collect();

		Ok(Some(AdminObject {
			id: question.id,
			repr: question.to_string(),
			values: IndexMap::from([
				("question_text".to_string(), question.question_text.clone()),
				("pub_date".to_string(), format_datetime_input(&question.pub_date)),
			]),
			inline_rows: IndexMap::from([(choice_inline().prefix(), rows)]),
		}))
	}

	/// Save the question and its inline choices in one transaction
	///
	/// Blank extra rows are ignored; rows ticked for deletion are removed.
	async fn save(&self, pool: &SqlitePool, id: Option<i64>, data: &FormData) -> Result<SaveOutcome> {
		let inline = choice_inline();
		let forms = parse_inline_formset(&inline, data);

		let mut errors = field_errors(&self.fields(), data);
		for (index, form) in forms.iter().enumerate() {
			if form.delete || form.is_blank(&inline) {
				continue;
			}
			errors.extend(form.validate(&inline, index));
		}
		let pub_date = parse_datetime(value(data, "pub_date"));
		let (true, Some(pub_date)) = (errors.is_empty(), pub_date) else {
			return Ok(SaveOutcome::Invalid(errors));
		};
		let question_text = value(data, "question_text");

		let mut tx = pool.begin().await?;
		let question_id = match id {
			Some(id) => {
				let result = sqlx::query("UPDATE polls_question SET question_text = ?, pub_date = ? WHERE id = ?")
					.bind(question_text)
					.bind(pub_date)
					.bind(id)
					.execute(&mut *tx)
					.await?;
				if result.rows_affected() == 0 {
					return Err(Error::NotFound(format!("Question {} does not exist", id)));
				}
				id
			}
			None => {
				sqlx::query_scalar("INSERT INTO polls_question (question_text, pub_date) VALUES (?, ?) RETURNING id")
					.bind(question_text)
					.bind(pub_date)
					.fetch_one(&mut *tx)
					.await?
			}
		};

		for form in &forms {
			let choice_text = form.values.get("choice_text").map(|v| v.trim()).unwrap_or("");
			let votes: i64 = form
				.values
				.get("votes")
				.and_then(|v| v.trim().parse().ok())
				.unwrap_or(0);
			match (form.id, form.delete) {
				(Some(choice_id), true) => {
					sqlx::query("DELETE FROM polls_choice WHERE id = ? AND question_id = ?")
						.bind(choice_id)
						.bind(question_id)
						.execute(&mut *tx)
						.await?;
				}
				(Some(choice_id), false) => {
					sqlx::query("UPDATE polls_choice SET choice_text = ?, votes = ? WHERE id = ? AND question_id = ?")
						.bind(choice_text)
						.bind(votes)
						.bind(choice_id)
						.bind(question_id)
						.execute(&mut *tx)
						.await?;
				}
				(None, true) => {}
				(None, false) => {
					if form.is_blank(&inline) {
						continue;
					}
					sqlx::query("INSERT INTO polls_choice (question_id, choice_text, votes) VALUES (?, ?, ?)")
						.bind(question_id)
						.bind(choice_text)
						.bind(votes)
						.execute(&mut *tx)
						.await?;
				}
			}
		}

		tx.commit().await?;
		Ok(SaveOutcome::Saved(question_id))
	}

	async fn delete(&self, pool: &SqlitePool, id: i64) -> Result<bool> {
		QuestionManager::new(pool.clone()).delete(id).await
	}
}

/// Admin for [`Choice`], searchable by the text of its question
pub struct ChoiceAdmin;

#[async_trait]
impl ModelAdmin for ChoiceAdmin {
	fn app_label(&self) -> &str {
		APP_NAME
	}

	fn model_name(&self) -> &str {
		"choice"
	}

	fn fields(&self) -> Vec<FormField> {
		vec![
			FormField::foreign_key("question", "Question"),
			FormField::text("choice_text", "Choice text", MAX_TEXT_LENGTH),
			FormField::integer("votes", "Votes").with_initial("0"),
		]
	}

	fn search_fields(&self) -> Vec<&str> {
		vec!["question__question_text"]
	}

	fn search_help_text(&self) -> Option<&str> {
		Some("Search for the question")
	}

	fn from_clause(&self) -> &str {
		"polls_choice c JOIN polls_question q ON q.id = c.question_id"
	}

	fn select_columns(&self) -> &str {
		"c.id, c.question_id, c.choice_text, c.votes, q.question_text"
	}

	fn lookup_column(&self, field: &str) -> Option<String> {
		match field {
			"id" | "choice_text" | "votes" => Some(format!("c.{}", field)),
			"question" => Some("c.question_id".to_string()),
			"question__question_text" => Some("q.question_text".to_string()),
			_ => None,
		}
	}

	fn row_from(&self, row: &SqliteRow) -> Result<AdminRow> {
		let choice = Choice::from_row(row)?;
		let question_text: String = row.try_get("question_text")?;
		let values = IndexMap::from([
			("question".to_string(), FieldValue::Text(question_text)),
			("choice_text".to_string(), FieldValue::Text(choice.choice_text.clone())),
			("votes".to_string(), FieldValue::Integer(choice.votes)),
		]);
		Ok(AdminRow {
			id: choice.id,
			repr: choice.to_string(),
			values,
		})
	}

	async fn get_object(&self, pool: &SqlitePool, id: i64) -> Result<Option<AdminObject>> {
		let choice = ChoiceManager::new(pool.clone()).get(id).await?;
		Ok(choice.map(|choice| AdminObject {
			id: choice.id,
			repr: choice.to_string(),
			values: IndexMap::from([
				("question".to_string(), choice.question_id.to_string()),
				("choice_text".to_string(), choice.choice_text),
				("votes".to_string(), choice.votes.to_string()),
			]),
			inline_rows: IndexMap::new(),
		}))
	}

	async fn save(&self, pool: &SqlitePool, id: Option<i64>, data: &FormData) -> Result<SaveOutcome> {
		let mut errors = field_errors(&self.fields(), data);
		let question_id = value(data, "question").parse::<i64>().ok();
		if let Some(question_id) = question_id
			&& QuestionManager::new(pool.clone()).get(question_id).await?.is_none()
		{
			errors.insert("question".to_string(), INVALID_CHOICE.to_string());
		}
		let votes = value(data, "votes").parse::<i64>().ok();
		let (true, Some(question_id), Some(votes)) = (errors.is_empty(), question_id, votes) else {
			return Ok(SaveOutcome::Invalid(errors));
		};

		let manager = ChoiceManager::new(pool.clone());
		let choice_text = value(data, "choice_text");
		let choice_id = match id {
			Some(id) => {
				manager
					.update(&Choice {
						id,
						question_id,
						choice_text: choice_text.to_string(),
						votes,
					})
					.await?;
				id
			}
			None => manager.create(question_id, choice_text, votes).await?.id,
		};
		Ok(SaveOutcome::Saved(choice_id))
	}

	async fn delete(&self, pool: &SqlitePool, id: i64) -> Result<bool> {
		ChoiceManager::new(pool.clone()).delete(id).await
	}

	async fn field_choices(&self, pool: &SqlitePool, field: &str) -> Result<Vec<(String, String)>> {
		if field != "question" {
			return Ok(Vec::new());
		}
		let questions = QuestionManager::new(pool.clone()).all().await?;
		Ok(questions
			.into_iter()
			.map(|q| (q.id.to_string(), q.question_text))
			.collect())
	}
}

/// Register the polls admins on `site`
pub fn register(site: &mut AdminSite) {
	site.register(QuestionAdmin);
	site.register(ChoiceAdmin);
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::admin::ListQueryParams;
	use crate::db;
	use chrono::{DateTime, Duration, Utc};
	use rstest::*;
	use std::collections::HashMap;

	#[fixture]
	async fn pool() -> SqlitePool {
		let pool = db::create_pool("sqlite::memory:", 1).await.unwrap();
		db::run_migrations(&pool).await.unwrap();
		pool
	}

	async fn question(pool: &SqlitePool, text: &str, pub_date: DateTime<Utc>) -> Question {
		QuestionManager::new(pool.clone())
			.create(text, pub_date)
			.await
			.unwrap()
	}

	fn form(pairs: &[(&str, &str)]) -> FormData {
		pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
	}

	fn params(pairs: &[(&str, &str)]) -> ListQueryParams {
		let query: HashMap<String, String> =
			pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
		ListQueryParams::from_query(&query, &QuestionAdmin.list_filter())
	}

	#[rstest]
	fn test_question_admin_configuration() {
		let admin = QuestionAdmin;
		let fieldsets = admin.fieldsets();
		assert_eq!(fieldsets[1].name.as_deref(), Some("Date Information"));
		assert!(fieldsets[1].is_collapsed());
		assert!(!fieldsets[0].is_collapsed());

		let inline = &admin.inlines()[0];
		assert_eq!(inline.inline_type(), InlineType::Tabular);
		assert_eq!(inline.extra(), 3);

		assert_eq!(admin.column_label("was_published_recently"), "Published recently?");
		assert_eq!(admin.column_label("pub_date"), "Date published");
		assert_eq!(admin.column_label("id"), "ID");
	}

	#[rstest]
	#[tokio::test]
	async fn test_changelist_search_and_order(#[future] pool: SqlitePool) {
		let pool = pool.await;
		let now = Utc::now();
		question(&pool, "What's up?", now - Duration::days(3)).await;
		question(&pool, "What is 50% of 10?", now - Duration::days(1)).await;
		question(&pool, "Favourite colour?", now).await;

		let list = QuestionAdmin.changelist(&pool, &params(&[("q", "what")]), now).await.unwrap();
		assert_eq!(list.result_count, 2);
		assert_eq!(list.total_count, 3);
		assert_eq!(list.rows[0].repr, "What is 50% of 10?");

		let list = QuestionAdmin.changelist(&pool, &params(&[("q", "50%")]), now).await.unwrap();
		assert_eq!(list.result_count, 1);

		let list = QuestionAdmin
			.changelist(&pool, &params(&[("o", "pub_date")]), now)
			.await
			.unwrap();
		assert_eq!(list.rows[0].repr, "What's up?");
	}

	#[rstest]
	#[tokio::test]
	async fn test_changelist_date_filter(#[future] pool: SqlitePool) {
		let pool = pool.await;
		let now = Utc::now();
		question(&pool, "Recent", now - Duration::hours(1)).await;
		question(&pool, "Old", now - Duration::days(400)).await;

		let list = QuestionAdmin
			.changelist(&pool, &params(&[("pub_date", "past_7_days")]), now)
			.await
			.unwrap();
		assert_eq!(list.result_count, 1);
		assert_eq!(list.rows[0].repr, "Recent");
		assert_eq!(
			list.rows[0].values["was_published_recently"],
			FieldValue::Boolean(true)
		);
	}

	#[rstest]
	#[tokio::test]
	async fn test_save_question_with_inline_choices(#[future] pool: SqlitePool) {
		let pool = pool.await;
		let outcome = QuestionAdmin
			.save(
				&pool,
				None,
				&form(&[
					("question_text", "What's new?"),
					("pub_date", "2024-05-01T09:30"),
					("choice_set-TOTAL_FORMS", "3"),
					("choice_set-0-choice_text", "Not much"),
					("choice_set-0-votes", "0"),
					("choice_set-1-choice_text", "The sky"),
					("choice_set-1-votes", "2"),
					("choice_set-2-choice_text", ""),
					("choice_set-2-votes", "0"),
				]),
			)
			.await
			.unwrap();
		let SaveOutcome::Saved(id) = outcome else {
			panic!("expected a saved question, got {:?}", outcome);
		};

		let object = QuestionAdmin.get_object(&pool, id).await.unwrap().unwrap();
		assert_eq!(object.values["pub_date"], "2024-05-01T09:30:00");
		let rows = &object.inline_rows["choice_set"];
		assert_eq!(rows.len(), 2);
		assert_eq!(rows[1].values["votes"], "2");

		let first = rows[0].id.unwrap().to_string();
		let second = rows[1].id.unwrap().to_string();
		let outcome = QuestionAdmin
			.save(
				&pool,
				Some(id),
				&form(&[
					("question_text", "What's new today?"),
					("pub_date", "2024-05-01T09:30"),
					("choice_set-TOTAL_FORMS", "2"),
					("choice_set-0-id", first.as_str()),
					("choice_set-0-choice_text", "Not much"),
					("choice_set-0-votes", "0"),
					("choice_set-0-DELETE", "on"),
					("choice_set-1-id", second.as_str()),
					("choice_set-1-choice_text", "The sky"),
					("choice_set-1-votes", "5"),
				]),
			)
			.await
			.unwrap();
		assert_eq!(outcome, SaveOutcome::Saved(id));

		let choices = ChoiceManager::new(pool.clone()).for_question(id).await.unwrap();
		assert_eq!(choices.len(), 1);
		assert_eq!(choices[0].votes, 5);
	}

	#[rstest]
	#[tokio::test]
	async fn test_invalid_question_form(#[future] pool: SqlitePool) {
		let pool = pool.await;
		let outcome = QuestionAdmin
			.save(
				&pool,
				None,
				&form(&[
					("question_text", ""),
					("pub_date", "soon"),
					("choice_set-TOTAL_FORMS", "1"),
					("choice_set-0-choice_text", ""),
					("choice_set-0-votes", "4"),
				]),
			)
			.await
			.unwrap();

		let SaveOutcome::Invalid(errors) = outcome else {
			panic!("expected errors, got {:?}", outcome);
		};
		assert_eq!(errors["question_text"], "This field is required.");
		assert_eq!(errors["pub_date"], "Enter a valid date/time.");
		assert!(errors.contains_key("choice_set-0-choice_text"));
		assert_eq!(QuestionManager::new(pool).count().await.unwrap(), 0);
	}

	#[rstest]
	#[tokio::test]
	async fn test_choice_admin_searches_question_text(#[future] pool: SqlitePool) {
		let pool = pool.await;
		let now = Utc::now();
		let q1 = question(&pool, "Best editor?", now).await;
		let q2 = question(&pool, "Best shell?", now).await;
		let choices = ChoiceManager::new(pool.clone());
		choices.create(q1.id, "vim", 0).await.unwrap();
		choices.create(q2.id, "zsh", 0).await.unwrap();

		let query = HashMap::from([("q".to_string(), "editor".to_string())]);
		let params = ListQueryParams::from_query(&query, &[]);
		let list = ChoiceAdmin.changelist(&pool, &params, now).await.unwrap();
		assert_eq!(list.result_count, 1);
		assert_eq!(list.rows[0].repr, "vim");
		assert_eq!(list.rows[0].values["question"], FieldValue::Text("Best editor?".into()));
	}

	#[rstest]
	#[tokio::test]
	async fn test_choice_admin_rejects_unknown_question(#[future] pool: SqlitePool) {
		let pool = pool.await;
		let outcome = ChoiceAdmin
			.save(
				&pool,
				None,
				&form(&[("question", "99"), ("choice_text", "x"), ("votes", "0")]),
			)
			.await
			.unwrap();
		let SaveOutcome::Invalid(errors) = outcome else {
			panic!("expected errors, got {:?}", outcome);
		};
		assert_eq!(errors["question"], INVALID_CHOICE);
	}
}
