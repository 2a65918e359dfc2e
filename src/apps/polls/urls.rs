use hyper::Method;
use std::sync::Arc;

use super::views;
use crate::http::FnHandler;
use crate::urls::{Route, path};

pub const APP_NAME: &str = "polls";

pub fn url_patterns() -> Vec<Route> {
	vec![
		path("", Arc::new(FnHandler::new(views::index)))
			.with_name("index")
			.with_methods(&[Method::GET]),
		path("{question_id:int}/", Arc::new(FnHandler::new(views::detail)))
			.with_name("detail")
			.with_methods(&[Method::GET]),
		path("{question_id:int}/results/", Arc::new(FnHandler::new(views::results)))
			.with_name("results")
			.with_methods(&[Method::GET]),
		path("{question_id:int}/vote/", Arc::new(FnHandler::new(views::vote)))
			.with_name("vote")
			.with_methods(&[Method::POST]),
	]
}
