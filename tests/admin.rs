//! Integration tests for the admin site

use hyper::StatusCode;
use mysite::apps::polls::{ChoiceManager, QuestionManager};
use mysite::test::{Client, create_choice, create_question, test_application};
use rstest::*;
use sqlx::SqlitePool;

#[fixture]
async fn site() -> (Client, SqlitePool) {
	let app = test_application().await.expect("Failed to build application");
	let pool = app.state().pool.clone();
	(Client::for_application(app), pool)
}

#[rstest]
#[tokio::test]
async fn test_index_lists_registered_models(#[future] site: (Client, SqlitePool)) {
	let (client, _pool) = site.await;

	let response = client.get("/admin/").await.unwrap();

	response.assert_status(StatusCode::OK);
	response.assert_contains("Site administration");
	response.assert_contains("href=\"/admin/polls/question/\"");
	response.assert_contains("Questions");
	response.assert_contains("Choices");
}

#[rstest]
#[tokio::test]
async fn test_unregistered_model_is_404(#[future] site: (Client, SqlitePool)) {
	let (client, _pool) = site.await;

	let response = client.get("/admin/polls/poll/").await.unwrap();

	response.assert_status(StatusCode::NOT_FOUND);
}

#[rstest]
#[tokio::test]
async fn test_question_changelist(#[future] site: (Client, SqlitePool)) {
	let (client, pool) = site.await;
	create_question(&pool, "What's up?", 0).await.unwrap();
	create_question(&pool, "Old news", -60).await.unwrap();

	let response = client.get("/admin/polls/question/").await.unwrap();

	response.assert_status(StatusCode::OK);
	response.assert_contains("What's up?");
	response.assert_contains("Old news");
	response.assert_contains("Question text");
	response.assert_contains("Date published");
	response.assert_contains("Published recently?");
	response.assert_contains("By date published");
	response.assert_contains("Past 7 days");
	response.assert_contains("name=\"q\"");
	response.assert_contains("2 questions");
}

#[rstest]
#[tokio::test]
async fn test_question_changelist_search_and_filter(#[future] site: (Client, SqlitePool)) {
	let (client, pool) = site.await;
	create_question(&pool, "What's up?", 0).await.unwrap();
	create_question(&pool, "Old news", -60).await.unwrap();

	let response = client.get("/admin/polls/question/?q=news").await.unwrap();
	response.assert_contains("Old news");
	response.assert_not_contains("What's up?");
	response.assert_contains("1 result (");

	let response = client
		.get("/admin/polls/question/?pub_date=past_7_days")
		.await
		.unwrap();
	response.assert_contains("What's up?");
	response.assert_not_contains("Old news");
}

#[rstest]
#[tokio::test]
async fn test_add_question_with_choices(#[future] site: (Client, SqlitePool)) {
	let (client, pool) = site.await;

	let response = client.get("/admin/polls/question/add/").await.unwrap();
	response.assert_status(StatusCode::OK);
	response.assert_contains("Add question");
	response.assert_contains("<details class=\"collapse\">");
	response.assert_contains("Date Information");
	response.assert_contains("name=\"choice_set-TOTAL_FORMS\" value=\"3\"");

	let response = client
		.post_form(
			"/admin/polls/question/add/",
			&[
				("question_text", "What's new?"),
				("pub_date", "2024-05-01T09:30"),
				("choice_set-TOTAL_FORMS", "3"),
				("choice_set-0-id", ""),
				("choice_set-0-choice_text", "Not much"),
				("choice_set-0-votes", "0"),
				("choice_set-1-id", ""),
				("choice_set-1-choice_text", "The sky"),
				("choice_set-1-votes", "0"),
				("choice_set-2-id", ""),
				("choice_set-2-choice_text", ""),
				("choice_set-2-votes", "0"),
				("_save", "Save"),
			],
		)
		.await
		.unwrap();

	response.assert_redirects("/admin/polls/question/");
	let questions = QuestionManager::new(pool.clone()).all().await.unwrap();
	assert_eq!(questions.len(), 1);
	assert_eq!(questions[0].question_text, "What's new?");
	let choices = ChoiceManager::new(pool).for_question(questions[0].id).await.unwrap();
	let texts: Vec<&str> = choices.iter().map(|c| c.choice_text.as_str()).collect();
	assert_eq!(texts, vec!["Not much", "The sky"]);
}

#[rstest]
#[tokio::test]
async fn test_add_question_with_errors(#[future] site: (Client, SqlitePool)) {
	let (client, pool) = site.await;

	let response = client
		.post_form(
			"/admin/polls/question/add/",
			&[
				("question_text", "Kept value"),
				("pub_date", ""),
				("choice_set-TOTAL_FORMS", "0"),
			],
		)
		.await
		.unwrap();

	response.assert_status(StatusCode::OK);
	response.assert_contains("Please correct the error below.");
	response.assert_contains("This field is required.");
	response.assert_contains("value=\"Kept value\"");
	assert_eq!(QuestionManager::new(pool).count().await.unwrap(), 0);
}

#[rstest]
#[tokio::test]
async fn test_change_question(#[future] site: (Client, SqlitePool)) {
	let (client, pool) = site.await;
	let question = create_question(&pool, "Before", -1).await.unwrap();
	let choice = create_choice(&pool, &question).await.unwrap();
	let url = format!("/admin/polls/question/{}/change/", question.id);

	let response = client.get(&url).await.unwrap();
	response.assert_status(StatusCode::OK);
	response.assert_contains("Change question");
	response.assert_contains("value=\"Before\"");
	response.assert_contains("This is a choice.");
	response.assert_contains("name=\"choice_set-TOTAL_FORMS\" value=\"4\"");

	let choice_id = choice.id.to_string();
	let response = client
		.post_form(
			&url,
			&[
				("question_text", "After"),
				("pub_date", "2024-05-01T09:30:00"),
				("choice_set-TOTAL_FORMS", "1"),
				("choice_set-0-id", choice_id.as_str()),
				("choice_set-0-choice_text", "Edited choice"),
				("choice_set-0-votes", "7"),
				("_continue", "Save and continue editing"),
			],
		)
		.await
		.unwrap();

	response.assert_redirects(&url);
	let question = QuestionManager::new(pool.clone()).get(question.id).await.unwrap().unwrap();
	assert_eq!(question.question_text, "After");
	let choice = ChoiceManager::new(pool).get(choice.id).await.unwrap().unwrap();
	assert_eq!(choice.choice_text, "Edited choice");
	assert_eq!(choice.votes, 7);
}

#[rstest]
#[tokio::test]
async fn test_change_missing_question_is_404(#[future] site: (Client, SqlitePool)) {
	let (client, _pool) = site.await;

	let response = client.get("/admin/polls/question/42/change/").await.unwrap();

	response.assert_status(StatusCode::NOT_FOUND);
}

#[rstest]
#[tokio::test]
async fn test_delete_question(#[future] site: (Client, SqlitePool)) {
	let (client, pool) = site.await;
	let question = create_question(&pool, "Doomed", -1).await.unwrap();
	let choice = create_choice(&pool, &question).await.unwrap();
	let url = format!("/admin/polls/question/{}/delete/", question.id);

	let response = client.get(&url).await.unwrap();
	response.assert_status(StatusCode::OK);
	response.assert_contains("Are you sure?");
	response.assert_contains("Choices: This is a choice.");

	let response = client.post_form(&url, &[("post", "yes")]).await.unwrap();

	response.assert_redirects("/admin/polls/question/");
	assert!(QuestionManager::new(pool.clone()).get(question.id).await.unwrap().is_none());
	assert!(ChoiceManager::new(pool).get(choice.id).await.unwrap().is_none());
}

#[rstest]
#[tokio::test]
async fn test_choice_changelist_search(#[future] site: (Client, SqlitePool)) {
	let (client, pool) = site.await;
	let editor = create_question(&pool, "Best editor?", -1).await.unwrap();
	let shell = create_question(&pool, "Best shell?", -1).await.unwrap();
	let choices = ChoiceManager::new(pool);
	choices.create(editor.id, "vim", 0).await.unwrap();
	choices.create(shell.id, "zsh", 0).await.unwrap();

	let response = client.get("/admin/polls/choice/?q=editor").await.unwrap();

	response.assert_status(StatusCode::OK);
	response.assert_contains("Search for the question");
	response.assert_contains("vim");
	response.assert_not_contains("zsh");
}

#[rstest]
#[tokio::test]
async fn test_add_choice_form_lists_questions(#[future] site: (Client, SqlitePool)) {
	let (client, pool) = site.await;
	let question = create_question(&pool, "Best editor?", -1).await.unwrap();

	let response = client.get("/admin/polls/choice/add/").await.unwrap();
	response.assert_contains(&format!("<option value=\"{}\">Best editor?</option>", question.id));

	let question_id = question.id.to_string();
	let response = client
		.post_form(
			"/admin/polls/choice/add/",
			&[
				("question", question_id.as_str()),
				("choice_text", "emacs"),
				("votes", "0"),
				("_addanother", "Save and add another"),
			],
		)
		.await
		.unwrap();

	response.assert_redirects("/admin/polls/choice/add/");
	let choices = ChoiceManager::new(pool).for_question(question.id).await.unwrap();
	assert_eq!(choices[0].choice_text, "emacs");
}
