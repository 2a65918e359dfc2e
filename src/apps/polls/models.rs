use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use std::fmt;

use crate::exception::{Error, Result};

/// Maximum length of `question_text` and `choice_text`
pub const MAX_TEXT_LENGTH: usize = 200;

/// Question model representing a poll question
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Question {
	pub id: i64,
	pub question_text: String,
	pub pub_date: DateTime<Utc>,
}

impl Question {
	/// Unsaved question; `id` is assigned on insert
	pub fn new(question_text: impl Into<String>, pub_date: DateTime<Utc>) -> Self {
		Self {
			id: 0,
			question_text: question_text.into(),
			pub_date,
		}
	}

	/// Check if the question was published within the last day
	pub fn was_published_recently(&self) -> bool {
		self.was_published_recently_at(Utc::now())
	}

	/// Published no more than one day before `now`, and not after it
	///
	/// # Examples
	///
	/// ```
	/// use chrono::{Duration, Utc};
	/// use mysite::apps::polls::Question;
	///
	/// let now = Utc::now();
	/// assert!(Question::new("q", now - Duration::hours(2)).was_published_recently_at(now));
	/// assert!(!Question::new("q", now + Duration::hours(2)).was_published_recently_at(now));
	/// ```
	pub fn was_published_recently_at(&self, now: DateTime<Utc>) -> bool {
		let one_day_ago = now - Duration::days(1);
		self.pub_date >= one_day_ago && self.pub_date <= now
	}
}

impl fmt::Display for Question {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.question_text)
	}
}

/// Choice model representing an answer option for a question
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Choice {
	pub id: i64,
	pub question_id: i64,
	pub choice_text: String,
	pub votes: i64,
}

impl fmt::Display for Choice {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.choice_text)
	}
}

/// Check a required, length-limited text field
pub fn validate_text(field: &str, value: &str) -> Result<()> {
	if value.trim().is_empty() {
		return Err(Error::BadRequest(format!("{}: This field is required.", field)));
	}
	let length = value.chars().count();
	if length > MAX_TEXT_LENGTH {
		return Err(Error::BadRequest(format!(
			"{}: Ensure this value has at most {} characters (it has {}).",
			field, MAX_TEXT_LENGTH, length
		)));
	}
	Ok(())
}

/// Escape `%`, `_` and `\` for a `LIKE ... ESCAPE '\'` pattern
pub(crate) fn like_pattern(term: &str) -> String {
	let mut pattern = String::with_capacity(term.len() + 2);
	pattern.push('%');
	for c in term.chars() {
		if matches!(c, '%' | '_' | '\\') {
			pattern.push('\\');
		}
		pattern.push(c);
	}
	pattern.push('%');
	pattern
}

const QUESTION_COLUMNS: &str = "id, question_text, pub_date";
const CHOICE_COLUMNS: &str = "id, question_id, choice_text, votes";

/// Table-level operations on `polls_question`
#[derive(Clone)]
pub struct QuestionManager {
	pool: SqlitePool,
}

impl QuestionManager {
	pub fn new(pool: SqlitePool) -> Self {
		Self { pool }
	}

	pub async fn create(&self, question_text: &str, pub_date: DateTime<Utc>) -> Result<Question> {
		validate_text("question_text", question_text)?;
		let question = sqlx::query_as::<_, Question>(&format!(
			"INSERT INTO polls_question (question_text, pub_date) VALUES (?, ?) RETURNING {}",
			QUESTION_COLUMNS
		))
		.bind(question_text)
		.bind(pub_date)
		.fetch_one(&self.pool)
		.await?;
		tracing::debug!(id = question.id, "Created question");
		Ok(question)
	}

	pub async fn get(&self, id: i64) -> Result<Option<Question>> {
		Ok(sqlx::query_as::<_, Question>(&format!(
			"SELECT {} FROM polls_question WHERE id = ?",
			QUESTION_COLUMNS
		))
		.bind(id)
		.fetch_optional(&self.pool)
		.await?)
	}

	/// Like [`get`](Self::get), but hides questions published after `now`
	pub async fn get_published(&self, id: i64, now: DateTime<Utc>) -> Result<Option<Question>> {
		Ok(sqlx::query_as::<_, Question>(&format!(
			"SELECT {} FROM polls_question WHERE id = ? AND pub_date <= ?",
			QUESTION_COLUMNS
		))
		.bind(id)
		.bind(now)
		.fetch_optional(&self.pool)
		.await?)
	}

	/// The `limit` most recently published questions, newest first
	pub async fn latest_published(&self, now: DateTime<Utc>, limit: u32) -> Result<Vec<Question>> {
		Ok(sqlx::query_as::<_, Question>(&format!(
			"SELECT {} FROM polls_question WHERE pub_date <= ? ORDER BY pub_date DESC, id DESC LIMIT ?",
			QUESTION_COLUMNS
		))
		.bind(now)
		.bind(limit)
		.fetch_all(&self.pool)
		.await?)
	}

	pub async fn all(&self) -> Result<Vec<Question>> {
		Ok(sqlx::query_as::<_, Question>(&format!(
			"SELECT {} FROM polls_question ORDER BY pub_date DESC, id DESC",
			QUESTION_COLUMNS
		))
		.fetch_all(&self.pool)
		.await?)
	}

	/// Case-insensitive substring match on `question_text`
	pub async fn search(&self, term: &str) -> Result<Vec<Question>> {
		Ok(sqlx::query_as::<_, Question>(&format!(
			"SELECT {} FROM polls_question WHERE question_text LIKE ? ESCAPE '\\' ORDER BY pub_date DESC, id DESC",
			QUESTION_COLUMNS
		))
		.bind(like_pattern(term))
		.fetch_all(&self.pool)
		.await?)
	}

	/// Questions with `from <= pub_date < to`
	pub async fn filter_pub_date(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> Result<Vec<Question>> {
		Ok(sqlx::query_as::<_, Question>(&format!(
			"SELECT {} FROM polls_question WHERE pub_date >= ? AND pub_date < ? ORDER BY pub_date DESC, id DESC",
			QUESTION_COLUMNS
		))
		.bind(from)
		.bind(to)
		.fetch_all(&self.pool)
		.await?)
	}

	pub async fn update(&self, question: &Question) -> Result<()> {
		validate_text("question_text", &question.question_text)?;
		let result = sqlx::query("UPDATE polls_question SET question_text = ?, pub_date = ? WHERE id = ?")
			.bind(&question.question_text)
			.bind(question.pub_date)
			.bind(question.id)
			.execute(&self.pool)
			.await?;
		if result.rows_affected() == 0 {
			return Err(Error::NotFound(format!("Question {} does not exist", question.id)));
		}
		Ok(())
	}

	/// Delete a question and, through the foreign key, its choices
	pub async fn delete(&self, id: i64) -> Result<bool> {
		let result = sqlx::query("DELETE FROM polls_question WHERE id = ?")
			.bind(id)
			.execute(&self.pool)
			.await?;
		Ok(result.rows_affected() > 0)
	}

	pub async fn count(&self) -> Result<i64> {
		Ok(sqlx::query_scalar("SELECT COUNT(*) FROM polls_question")
			.fetch_one(&self.pool)
			.await?)
	}
}

/// Table-level operations on `polls_choice`
#[derive(Clone)]
pub struct ChoiceManager {
	pool: SqlitePool,
}

impl ChoiceManager {
	pub fn new(pool: SqlitePool) -> Self {
		Self { pool }
	}

	pub async fn create(&self, question_id: i64, choice_text: &str, votes: i64) -> Result<Choice> {
		validate_text("choice_text", choice_text)?;
		Ok(sqlx::query_as::<_, Choice>(&format!(
			"INSERT INTO polls_choice (question_id, choice_text, votes) VALUES (?, ?, ?) RETURNING {}",
			CHOICE_COLUMNS
		))
		.bind(question_id)
		.bind(choice_text)
		.bind(votes)
		.fetch_one(&self.pool)
		.await?)
	}

	pub async fn get(&self, id: i64) -> Result<Option<Choice>> {
		Ok(sqlx::query_as::<_, Choice>(&format!(
			"SELECT {} FROM polls_choice WHERE id = ?",
			CHOICE_COLUMNS
		))
		.bind(id)
		.fetch_optional(&self.pool)
		.await?)
	}

	/// Choices of a question in creation order
	pub async fn for_question(&self, question_id: i64) -> Result<Vec<Choice>> {
		Ok(sqlx::query_as::<_, Choice>(&format!(
			"SELECT {} FROM polls_choice WHERE question_id = ? ORDER BY id",
			CHOICE_COLUMNS
		))
		.bind(question_id)
		.fetch_all(&self.pool)
		.await?)
	}

	/// A choice, only if it belongs to `question_id`
	pub async fn get_for_question(&self, question_id: i64, choice_id: i64) -> Result<Option<Choice>> {
		Ok(sqlx::query_as::<_, Choice>(&format!(
			"SELECT {} FROM polls_choice WHERE id = ? AND question_id = ?",
			CHOICE_COLUMNS
		))
		.bind(choice_id)
		.bind(question_id)
		.fetch_optional(&self.pool)
		.await?)
	}

	/// Add one vote in a single statement
	///
	/// Returns `false` when the choice does not exist or belongs to another
	/// question. Concurrent votes never overwrite each other.
	pub async fn increment_votes(&self, question_id: i64, choice_id: i64) -> Result<bool> {
		let result = sqlx::query("UPDATE polls_choice SET votes = votes + 1 WHERE id = ? AND question_id = ?")
			.bind(choice_id)
			.bind(question_id)
			.execute(&self.pool)
			.await?;
		Ok(result.rows_affected() == 1)
	}

	/// Choices whose question text contains `term`
	pub async fn search_by_question_text(&self, term: &str) -> Result<Vec<Choice>> {
		Ok(sqlx::query_as::<_, Choice>(
			"SELECT c.id, c.question_id, c.choice_text, c.votes FROM polls_choice c \
			 JOIN polls_question q ON q.id = c.question_id \
			 WHERE q.question_text LIKE ? ESCAPE '\\' ORDER BY c.id",
		)
		.bind(like_pattern(term))
		.fetch_all(&self.pool)
		.await?)
	}

	pub async fn update(&self, choice: &Choice) -> Result<()> {
		validate_text("choice_text", &choice.choice_text)?;
		let result = sqlx::query("UPDATE polls_choice SET question_id = ?, choice_text = ?, votes = ? WHERE id = ?")
			.bind(choice.question_id)
			.bind(&choice.choice_text)
			.bind(choice.votes)
			.bind(choice.id)
			.execute(&self.pool)
			.await?;
		if result.rows_affected() == 0 {
			return Err(Error::NotFound(format!("Choice {} does not exist", choice.id)));
		}
		Ok(())
	}

	pub async fn delete(&self, id: i64) -> Result<bool> {
		let result = sqlx::query("DELETE FROM polls_choice WHERE id = ?")
			.bind(id)
			.execute(&self.pool)
			.await?;
		Ok(result.rows_affected() > 0)
	}

	pub async fn total_votes(&self, question_id: i64) -> Result<i64> {
		Ok(sqlx::query_scalar("SELECT COALESCE(SUM(votes), 0) FROM polls_choice WHERE question_id = ?")
			.bind(question_id)
			.fetch_one(&self.pool)
			.await?)
	}
}
