use chrono::Utc;
use serde::Deserialize;
use tera::Context;

use super::models::{ChoiceManager, Question, QuestionManager};
use crate::exception::Result;
use crate::http::{Request, Response};
use crate::shortcuts::{get_object_or_404, redirect_to, render};
use crate::state::AppState;

pub const NO_CHOICE_SELECTED: &str = "You didn't select a choice.";

/// Body of the vote form
#[derive(Debug, Default, Deserialize)]
pub struct VoteForm {
	pub choice: Option<String>,
}

impl VoteForm {
	/// The selected choice id, if one was sent and it is a number
	pub fn choice_id(&self) -> Option<i64> {
		self.choice.as_deref().and_then(|raw| raw.trim().parse().ok())
	}
}

/// Look up a published question named by the `question_id` path parameter
async fn published_question(request: &Request, state: &AppState) -> Result<Question> {
	let question_id: i64 = request.path_param("question_id")?;
	let question = QuestionManager::new(state.pool.clone())
		.get_published(question_id, Utc::now())
		.await?;
	get_object_or_404(question, "Question")
}

/// Index view - the latest published questions
///
/// GET /polls/
pub async fn index(request: Request) -> Result<Response> {
	let state = AppState::from_request(&request)?;
	let latest_question_list = QuestionManager::new(state.pool.clone())
		.latest_published(Utc::now(), state.settings.polls.index_limit)
		.await?;

	let mut context = Context::new();
	context.insert("latest_question_list", &latest_question_list);
	render(&request, "polls/index.html", context)
}

async fn render_detail(
	request: &Request,
	state: &AppState,
	question: &Question,
	error_message: Option<&str>,
) -> Result<Response> {
	let choices = ChoiceManager::new(state.pool.clone())
		.for_question(question.id)
		.await?;

	let mut context = Context::new();
	context.insert("question", question);
	context.insert("choices", &choices);
	if let Some(message) = error_message {
		context.insert("error_message", message);
	}
	render(request, "polls/detail.html", context)
}

/// Detail view - a question with its voting form
///
/// GET /polls/{question_id}/
pub async fn detail(request: Request) -> Result<Response> {
	let state = AppState::from_request(&request)?;
	let question = published_question(&request, &state).await?;
	render_detail(&request, &state, &question, None).await
}

/// Results view - vote counts for a question
///
/// GET /polls/{question_id}/results/
pub async fn results(request: Request) -> Result<Response> {
	let state = AppState::from_request(&request)?;
	let question = published_question(&request, &state).await?;
	let choices = ChoiceManager::new(state.pool.clone());
	let choice_list = choices.for_question(question.id).await?;
	let total_votes = choices.total_votes(question.id).await?;

	let mut context = Context::new();
	context.insert("question", &question);
	context.insert("choices", &choice_list);
	context.insert("total_votes", &total_votes);
	render(&request, "polls/results.html", context)
}

/// Vote view - record a vote, then redirect to the results
///
/// POST /polls/{question_id}/vote/
///
/// A missing, malformed or foreign choice re-displays the voting form with
/// an error message instead.
pub async fn vote(request: Request) -> Result<Response> {
	let state = AppState::from_request(&request)?;
	let question = published_question(&request, &state).await?;

	let form: VoteForm = request.form().unwrap_or_default();
	let voted = match form.choice_id() {
		Some(choice_id) => {
			ChoiceManager::new(state.pool.clone())
				.increment_votes(question.id, choice_id)
				.await?
		}
		None => false,
	};

	if !voted {
		tracing::debug!(question_id = question.id, choice = ?form.choice, "Vote without a valid choice");
		return render_detail(&request, &state, &question, Some(NO_CHOICE_SELECTED)).await;
	}

	redirect_to(&request, "polls:results", &[question.id.to_string()])
}
