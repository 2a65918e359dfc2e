//! View shortcuts, similar to `django.shortcuts`.

use tera::Context;

use crate::exception::{Error, Result};
use crate::http::{Request, Response};
use crate::state::AppState;

/// Render a template into an HTML response
///
/// The context is attached to the response so tests can inspect what the
/// template received.
pub fn render(request: &Request, template_name: &str, context: Context) -> Result<Response> {
	let state = AppState::from_request(request)?;
	let html = state.templates.render(template_name, &context)?;
	Ok(Response::ok()
		.with_html(html)
		.with_context(context.into_json()))
}

/// 302 redirect to a literal location
pub fn redirect(location: &str) -> Response {
	Response::temporary_redirect(location)
}

/// 302 redirect to a named route
pub fn redirect_to<S: AsRef<str>>(request: &Request, name: &str, args: &[S]) -> Result<Response> {
	let state = AppState::from_request(request)?;
	let location = state.reverser.reverse(name, args)?;
	Ok(redirect(&location))
}

/// Unwrap a lookup result or fail with a 404
///
/// # Examples
///
/// ```
/// use mysite::shortcuts::get_object_or_404;
///
/// assert_eq!(get_object_or_404(Some(3), "Question").unwrap(), 3);
/// assert!(get_object_or_404(None::<i32>, "Question").is_err());
/// ```
pub fn get_object_or_404<T>(object: Option<T>, model_name: &str) -> Result<T> {
	object.ok_or_else(|| Error::NotFound(format!("No {} matches the given query.", model_name)))
}

/// Fail with a 404 when a list is empty
pub fn get_list_or_404<T>(objects: Vec<T>, model_name: &str) -> Result<Vec<T>> {
	if objects.is_empty() {
		return Err(Error::NotFound(format!("No {} matches the given query.", model_name)));
	}
	Ok(objects)
}
