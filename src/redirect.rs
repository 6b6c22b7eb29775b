//! Messages carried from a form action to the page it redirects to.
//!
//! An action answers with `303 See Other` to `{path}?success=...` or
//! `{path}?error=...`, and the page reads the message back with
//! [`FormMessage`]. Anything survives the trip, including `&`, `=`, `+`,
//! `%` and non-ASCII text.

use std::convert::Infallible;

use axum::{
	extract::FromRequestParts,
	http::request,
	response::{IntoResponse, Redirect, Response},
};
use url::form_urlencoded;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Kind {
	Error,
	Success,
}

impl Kind {
	pub const fn key(self) -> &'static str {
		match self {
			Self::Error => "error",
			Self::Success => "success",
		}
	}
}

/// A `303 See Other` to a page, with a message in its query string.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EncodedRedirect {
	location: String,
}

impl EncodedRedirect {
	pub fn location(&self) -> &str {
		&self.location
	}
}

impl IntoResponse for EncodedRedirect {
	fn into_response(self) -> Response {
		Redirect::to(&self.location).into_response()
	}
}

pub fn encoded_redirect(kind: Kind, path: &str, message: &str) -> EncodedRedirect {
	tracing::info!(kind = kind.key(), path, message, "redirecting with message");

	let query = form_urlencoded::Serializer::new(String::new())
		.append_pair(kind.key(), message)
		.finish();
	let separator = if path.contains('?') { '&' } else { '?' };

	EncodedRedirect {
		location: format!("{path}{separator}{query}"),
	}
}

pub fn success(path: &str, message: &str) -> EncodedRedirect {
	encoded_redirect(Kind::Success, path, message)
}

pub fn error(path: &str, message: &str) -> EncodedRedirect {
	encoded_redirect(Kind::Error, path, message)
}

/// The message a page was redirected with, if any.
///
/// When several keys are present, `success` wins over `error`, which wins
/// over `message`. As an extractor it never rejects.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum FormMessage {
	#[default]
	None,
	Success(String),
	Error(String),
	Message(String),
}

#[derive(Default)]
struct RawMessage {
	success: Option<String>,
	error: Option<String>,
	message: Option<String>,
}

impl From<RawMessage> for FormMessage {
	fn from(raw: RawMessage) -> Self {
		if let Some(message) = raw.success {
			Self::Success(message)
		} else if let Some(message) = raw.error {
			Self::Error(message)
		} else if let Some(message) = raw.message {
			Self::Message(message)
		} else {
			Self::None
		}
	}
}

impl FormMessage {
	/// Decodes a raw query string, without the leading `?`.
	pub fn decode(query: &str) -> Self {
		let mut raw = RawMessage::default();

		for (key, value) in form_urlencoded::parse(query.as_bytes()) {
			let slot = match key.as_ref() {
				"success" => &mut raw.success,
				"error" => &mut raw.error,
				"message" => &mut raw.message,
				_ => continue,
			};

			slot.get_or_insert_with(|| value.into_owned());
		}

		raw.into()
	}

	pub fn is_success(&self) -> bool {
		matches!(self, Self::Success(..))
	}

	pub fn is_none(&self) -> bool {
		matches!(self, Self::None)
	}
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for FormMessage
where
	S: Send + Sync,
{
	type Rejection = Infallible;

	async fn from_request_parts(
		parts: &mut request::Parts,
		_state: &S,
	) -> Result<Self, Self::Rejection> {
		Ok(parts.uri.query().map(Self::decode).unwrap_or_default())
	}
}

#[cfg(test)]
mod test {
	use axum::http::{header, StatusCode};

	use super::*;

	fn query(redirect: &EncodedRedirect) -> &str {
		redirect
			.location()
			.split_once('?')
			.map_or("", |(_, query)| query)
	}

	#[test]
	fn test_message_survives_the_redirect() {
		for message in [
			"Password or email invalid",
			"a&b=c",
			"100% + more",
			"Ünïcödé 🐾",
			"",
		] {
			let redirect = error("/sign-in", message);

			assert!(redirect.location().starts_with("/sign-in?error="));
			assert_eq!(
				FormMessage::decode(query(&redirect)),
				FormMessage::Error(message.into())
			);
		}
	}

	#[test]
	fn test_success_wins() {
		assert_eq!(
			FormMessage::decode("message=c&error=b&success=a"),
			FormMessage::Success("a".into())
		);
		assert_eq!(
			FormMessage::decode("message=c&error=b"),
			FormMessage::Error("b".into())
		);
		assert_eq!(FormMessage::decode("message=c"), FormMessage::Message("c".into()));
		assert_eq!(FormMessage::decode("other=1"), FormMessage::None);
	}

	#[test]
	fn test_existing_query_is_kept() {
		let redirect = success("/sign-up?step=3", "done");

		assert_eq!(redirect.location(), "/sign-up?step=3&success=done");
	}

	#[test]
	fn test_response_is_see_other() {
		let response = success("/sign-up", "Thanks").into_response();

		assert_eq!(response.status(), StatusCode::SEE_OTHER);
		assert_eq!(response.headers()[header::LOCATION], "/sign-up?success=Thanks");
	}
}
