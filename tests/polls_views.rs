//! Integration tests for the public polls views
//!
//! Each test gets its own application on a fresh in-memory SQLite database
//! and talks to it through the in-process test client.

use hyper::StatusCode;
use mysite::apps::polls::ChoiceManager;
use mysite::test::{Client, create_choice, create_question, test_application};
use rstest::*;
use serde_json::Value;
use sqlx::SqlitePool;

/// Fixture: migrated application and a handle on its database
#[fixture]
async fn site() -> (Client, SqlitePool) {
	let app = test_application().await.expect("Failed to build application");
	let pool = app.state().pool.clone();
	(Client::for_application(app), pool)
}

fn question_texts(value: Option<&Value>) -> Vec<String> {
	value
		.and_then(Value::as_array)
		.expect("latest_question_list missing from context")
		.iter()
		.map(|q| q["question_text"].as_str().unwrap_or_default().to_string())
		.collect()
}

// Index view

#[rstest]
#[tokio::test]
async fn test_index_without_questions(#[future] site: (Client, SqlitePool)) {
	let (client, _pool) = site.await;

	let response = client.get("/polls/").await.unwrap();

	response.assert_status(StatusCode::OK);
	response.assert_contains("No polls are available.");
	assert!(question_texts(response.context_value("latest_question_list")).is_empty());
}

#[rstest]
#[tokio::test]
async fn test_index_shows_past_question(#[future] site: (Client, SqlitePool)) {
	let (client, pool) = site.await;
	create_question(&pool, "Past question.", -30).await.unwrap();

	let response = client.get("/polls/").await.unwrap();

	response.assert_status(StatusCode::OK);
	response.assert_contains("Past question.");
	assert_eq!(
		question_texts(response.context_value("latest_question_list")),
		vec!["Past question."]
	);
}

#[rstest]
#[tokio::test]
async fn test_index_hides_future_question(#[future] site: (Client, SqlitePool)) {
	let (client, pool) = site.await;
	create_question(&pool, "Future question.", 30).await.unwrap();

	let response = client.get("/polls/").await.unwrap();

	response.assert_contains("No polls are available.");
	response.assert_not_contains("Future question.");
	assert!(question_texts(response.context_value("latest_question_list")).is_empty());
}

#[rstest]
#[tokio::test]
async fn test_index_with_future_and_past_question(#[future] site: (Client, SqlitePool)) {
	let (client, pool) = site.await;
	create_question(&pool, "Past question.", -30).await.unwrap();
	create_question(&pool, "Future question.", 30).await.unwrap();

	let response = client.get("/polls/").await.unwrap();

	assert_eq!(
		question_texts(response.context_value("latest_question_list")),
		vec!["Past question."]
	);
}

#[rstest]
#[tokio::test]
async fn test_index_orders_newest_first(#[future] site: (Client, SqlitePool)) {
	let (client, pool) = site.await;
	create_question(&pool, "Past question 1.", -30).await.unwrap();
	create_question(&pool, "Past question 2.", -5).await.unwrap();

	let response = client.get("/polls/").await.unwrap();

	assert_eq!(
		question_texts(response.context_value("latest_question_list")),
		vec!["Past question 2.", "Past question 1."]
	);
}

#[rstest]
#[tokio::test]
async fn test_index_is_limited_to_five(#[future] site: (Client, SqlitePool)) {
	let (client, pool) = site.await;
	for days in 1..=7 {
		create_question(&pool, &format!("Question {}", days), -days).await.unwrap();
	}

	let response = client.get("/polls/").await.unwrap();

	let texts = question_texts(response.context_value("latest_question_list"));
	assert_eq!(texts.len(), 5);
	assert_eq!(texts[0], "Question 1");
	response.assert_not_contains("Question 7");
}

// Detail view

#[rstest]
#[tokio::test]
async fn test_detail_of_future_question_is_404(#[future] site: (Client, SqlitePool)) {
	let (client, pool) = site.await;
	let future = create_question(&pool, "Future question.", 5).await.unwrap();

	let response = client.get(&format!("/polls/{}/", future.id)).await.unwrap();

	response.assert_status(StatusCode::NOT_FOUND);
}

#[rstest]
#[tokio::test]
async fn test_detail_of_past_question(#[future] site: (Client, SqlitePool)) {
	let (client, pool) = site.await;
	let past = create_question(&pool, "Past Question.", -5).await.unwrap();
	create_choice(&pool, &past).await.unwrap();

	let response = client.get(&format!("/polls/{}/", past.id)).await.unwrap();

	response.assert_status(StatusCode::OK);
	response.assert_contains(&past.question_text);
	response.assert_contains("This is a choice.");
	response.assert_contains(&format!("action=\"/polls/{}/vote/\"", past.id));
}

#[rstest]
#[tokio::test]
async fn test_detail_of_missing_question_is_404(#[future] site: (Client, SqlitePool)) {
	let (client, _pool) = site.await;

	let response = client.get("/polls/999/").await.unwrap();

	response.assert_status(StatusCode::NOT_FOUND);
	response.assert_contains("No Question matches the given query.");
}

#[rstest]
#[tokio::test]
async fn test_non_numeric_question_id_is_404(#[future] site: (Client, SqlitePool)) {
	let (client, _pool) = site.await;

	let response = client.get("/polls/abc/").await.unwrap();

	response.assert_status(StatusCode::NOT_FOUND);
}

#[rstest]
#[tokio::test]
async fn test_detail_with_many_choices(#[future] site: (Client, SqlitePool)) {
	let (client, pool) = site.await;
	let question = create_question(&pool, "Many choices.", -1).await.unwrap();
	for _ in 0..10 {
		create_choice(&pool, &question).await.unwrap();
	}

	let response = client.get(&format!("/polls/{}/", question.id)).await.unwrap();

	response.assert_status(StatusCode::OK);
	assert_eq!(response.text().matches("type=\"radio\"").count(), 10);
}

// Results view

#[rstest]
#[tokio::test]
async fn test_results_of_future_question_is_404(#[future] site: (Client, SqlitePool)) {
	let (client, pool) = site.await;
	let future = create_question(&pool, "Future question.", 5).await.unwrap();

	let response = client.get(&format!("/polls/{}/results/", future.id)).await.unwrap();

	response.assert_status(StatusCode::NOT_FOUND);
}

#[rstest]
#[tokio::test]
async fn test_results_show_vote_counts(#[future] site: (Client, SqlitePool)) {
	let (client, pool) = site.await;
	let question = create_question(&pool, "What's up?", -1).await.unwrap();
	let choices = ChoiceManager::new(pool.clone());
	choices.create(question.id, "Not much", 1).await.unwrap();
	choices.create(question.id, "The sky", 2).await.unwrap();

	let response = client.get(&format!("/polls/{}/results/", question.id)).await.unwrap();

	response.assert_status(StatusCode::OK);
	response.assert_contains("Not much -- 1 vote<");
	response.assert_contains("The sky -- 2 votes");
	response.assert_contains("Vote again?");
	assert_eq!(response.context_value("total_votes"), Some(&Value::from(3)));
}

// Vote view

#[rstest]
#[tokio::test]
async fn test_vote_records_and_redirects(#[future] site: (Client, SqlitePool)) {
	let (client, pool) = site.await;
	let question = create_question(&pool, "Past Question.", -5).await.unwrap();
	let choice = create_choice(&pool, &question).await.unwrap();

	let response = client
		.post_form(
			&format!("/polls/{}/vote/", question.id),
			&[("choice", choice.id.to_string())],
		)
		.await
		.unwrap();

	response.assert_redirects(&format!("/polls/{}/results/", question.id));
	let choice = ChoiceManager::new(pool).get(choice.id).await.unwrap().unwrap();
	assert_eq!(choice.votes, 1);
}

#[rstest]
#[tokio::test]
async fn test_vote_with_many_choices_counts_only_the_selected_one(#[future] site: (Client, SqlitePool)) {
	let (client, pool) = site.await;
	let question = create_question(&pool, "Many choices.", -1).await.unwrap();
	let mut choices = Vec::new();
	for _ in 0..10 {
		choices.push(create_choice(&pool, &question).await.unwrap());
	}
	let selected = choices[6].id;

	let response = client
		.post_form(
			&format!("/polls/{}/vote/", question.id),
			&[("choice", selected.to_string())],
		)
		.await
		.unwrap();

	response.assert_redirects(&format!("/polls/{}/results/", question.id));
	let manager = ChoiceManager::new(pool);
	for choice in &choices {
		let votes = manager.get(choice.id).await.unwrap().unwrap().votes;
		let expected = if choice.id == selected { 1 } else { 0 };
		assert_eq!(votes, expected, "votes for choice {}", choice.id);
	}
}

#[rstest]
#[tokio::test]
async fn test_vote_without_choice_redisplays_form(#[future] site: (Client, SqlitePool)) {
	let (client, pool) = site.await;
	let question = create_question(&pool, "Past Question.", -5).await.unwrap();
	let choice = create_choice(&pool, &question).await.unwrap();

	let response = client
		.post_form::<&str, &str>(&format!("/polls/{}/vote/", question.id), &[])
		.await
		.unwrap();

	response.assert_status(StatusCode::OK);
	response.assert_contains("You didn't select a choice.");
	let choice = ChoiceManager::new(pool).get(choice.id).await.unwrap().unwrap();
	assert_eq!(choice.votes, 0);
}

#[rstest]
#[case("abc")]
#[case("999")]
#[tokio::test]
async fn test_vote_with_invalid_choice(
	#[future] site: (Client, SqlitePool),
	#[case] choice: &str,
) {
	let (client, pool) = site.await;
	let question = create_question(&pool, "Past Question.", -5).await.unwrap();
	create_choice(&pool, &question).await.unwrap();

	let response = client
		.post_form(&format!("/polls/{}/vote/", question.id), &[("choice", choice)])
		.await
		.unwrap();

	response.assert_status(StatusCode::OK);
	response.assert_contains("You didn't select a choice.");
}

#[rstest]
#[tokio::test]
async fn test_vote_for_choice_of_other_question(#[future] site: (Client, SqlitePool)) {
	let (client, pool) = site.await;
	let question = create_question(&pool, "First.", -5).await.unwrap();
	let other = create_question(&pool, "Second.", -5).await.unwrap();
	let foreign = create_choice(&pool, &other).await.unwrap();

	let response = client
		.post_form(
			&format!("/polls/{}/vote/", question.id),
			&[("choice", foreign.id.to_string())],
		)
		.await
		.unwrap();

	response.assert_contains("You didn't select a choice.");
	let foreign = ChoiceManager::new(pool).get(foreign.id).await.unwrap().unwrap();
	assert_eq!(foreign.votes, 0);
}

#[rstest]
#[tokio::test]
async fn test_vote_on_future_question_is_404(#[future] site: (Client, SqlitePool)) {
	let (client, pool) = site.await;
	let question = create_question(&pool, "Future question.", 5).await.unwrap();
	let choice = create_choice(&pool, &question).await.unwrap();

	let response = client
		.post_form(
			&format!("/polls/{}/vote/", question.id),
			&[("choice", choice.id.to_string())],
		)
		.await
		.unwrap();

	response.assert_status(StatusCode::NOT_FOUND);
}

#[rstest]
#[tokio::test]
async fn test_vote_requires_post(#[future] site: (Client, SqlitePool)) {
	let (client, pool) = site.await;
	let question = create_question(&pool, "Past Question.", -5).await.unwrap();

	let response = client.get(&format!("/polls/{}/vote/", question.id)).await.unwrap();

	response.assert_status(StatusCode::METHOD_NOT_ALLOWED);
	assert_eq!(response.header("allow"), Some("POST"));
}

// Routing

#[rstest]
#[tokio::test]
async fn test_root_redirects_to_index(#[future] site: (Client, SqlitePool)) {
	let (client, _pool) = site.await;

	let response = client.get("/").await.unwrap();

	response.assert_redirects("/polls/");
}

#[rstest]
#[tokio::test]
async fn test_missing_trailing_slash_redirects(#[future] site: (Client, SqlitePool)) {
	let (client, _pool) = site.await;

	let response = client.get("/polls").await.unwrap();

	response.assert_status(StatusCode::MOVED_PERMANENTLY);
	assert_eq!(response.location(), Some("/polls/"));
}
