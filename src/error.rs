use std::borrow::Cow;

use axum::{
	body::Body,
	extract::rejection,
	http::{Response, StatusCode},
	response::IntoResponse,
	Json,
};
use serde::Serialize;
use tower_governor::GovernorError;
use validator::{ValidationErrors, ValidationErrorsKind};

use crate::{backend, redirect::{self, EncodedRedirect}};

/// Error type for the JSON endpoints.
///
/// The Display trait is not sent to the client, so it can show
/// sensitive information.
#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("validation error: {0}")]
	Validation(#[from] ValidationErrors),
	#[error("query error: {0}")]
	Query(#[from] rejection::QueryRejection),
	#[error("backend error: {0}")]
	Backend(#[from] backend::Error),
	#[error("rate limited: {0:?}")]
	RateLimited(GovernorError),
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
	pub success: bool,
	pub errors: Vec<String>,
}

impl ErrorResponse {
	fn new(errors: Vec<String>) -> Self {
		Self {
			success: false,
			errors,
		}
	}
}

impl IntoResponse for Error {
	fn into_response(self) -> Response<Body> {
		match self {
			Error::Validation(errors) => (
				StatusCode::BAD_REQUEST,
				Json(ErrorResponse::new(messages(&errors, &[]))),
			)
				.into_response(),
			Error::Query(error) => (
				StatusCode::BAD_REQUEST,
				Json(ErrorResponse::new(vec![error.body_text()])),
			)
				.into_response(),
			Error::RateLimited(GovernorError::TooManyRequests { .. }) => (
				StatusCode::TOO_MANY_REQUESTS,
				Json(ErrorResponse::new(vec!["Too many requests".into()])),
			)
				.into_response(),
			error => {
				tracing::error!(%error, "request failed");

				(
					StatusCode::INTERNAL_SERVER_ERROR,
					Json(ErrorResponse::new(Vec::new())),
				)
					.into_response()
			}
		}
	}
}

/// Flattens validation errors into their human messages.
///
/// Fields named in `order` come first, in that order, at every nesting level.
/// The rest follow in name order, so the output never depends on hash map
/// iteration order. A rule without a message contributes its code.
pub fn messages(errors: &ValidationErrors, order: &[&str]) -> Vec<String> {
	let mut fields = errors.errors().iter().collect::<Vec<_>>();
	let mut messages = Vec::new();

	fields.sort_by_key(|(field, _)| {
		let position = order.iter().position(|name| name == *field);

		(position.unwrap_or(order.len()), **field)
	});

	for (_, kind) in fields {
		match kind {
			ValidationErrorsKind::Field(errors) => {
				messages.extend(errors.iter().map(|error| {
					error
						.message
						.as_ref()
						.map_or_else(|| error.code.to_string(), ToString::to_string)
				}));
			}
			ValidationErrorsKind::Struct(errors) => messages.extend(self::messages(errors, order)),
			ValidationErrorsKind::List(errors) => {
				for errors in errors.values() {
					messages.extend(self::messages(errors, order));
				}
			}
		}
	}

	messages
}

/// Errors of a form action, shown to the user on the page the action redirects to.
///
/// The Display output of the implementor is the message the user sees.
pub trait ErrorShape: std::error::Error + Sized {
	/// Whether the error comes from something other than the user's input.
	fn is_internal(&self) -> bool {
		false
	}

	fn message(&self) -> Cow<'_, str> {
		self.to_string().into()
	}

	fn log(&self, path: &str) {
		if self.is_internal() {
			tracing::error!(error = ?self, path, "action failed");
		} else {
			tracing::warn!(error = %self, path, "action rejected");
		}
	}

	fn redirect(self, path: &str) -> EncodedRedirect {
		self.log(path);
		redirect::error(path, &self.message())
	}
}

#[cfg(test)]
mod test {
	use validator::Validate;

	use super::*;

	#[derive(Validate)]
	struct Inner {
		#[validate(length(min = 1, message = "Inner name is required"))]
		name: String,
	}

	#[derive(Validate)]
	struct Outer {
		#[validate(length(min = 3, message = "Zeta is too short"))]
		zeta: String,
		#[validate(length(min = 3, message = "Alpha is too short"))]
		alpha: String,
		#[validate(nested)]
		inner: Inner,
		#[validate(range(min = 1))]
		count: u8,
	}

	fn outer() -> Outer {
		Outer {
			zeta: String::new(),
			alpha: String::new(),
			inner: Inner {
				name: String::new(),
			},
			count: 0,
		}
	}

	#[test]
	fn test_messages_are_sorted_and_nested() {
		let errors = outer().validate().unwrap_err();

		assert_eq!(
			messages(&errors, &[]),
			[
				"Alpha is too short",
				"range",
				"Inner name is required",
				"Zeta is too short"
			]
		);
	}

	#[test]
	fn test_messages_follow_the_given_order() {
		let errors = outer().validate().unwrap_err();

		assert_eq!(
			messages(&errors, &["zeta", "inner", "alpha"]),
			[
				"Zeta is too short",
				"Inner name is required",
				"Alpha is too short",
				"range"
			]
		);
	}
}
