use axum::http::{header, HeaderMap};
use cookie::{time::Duration, Cookie, SameSite};

pub const COOKIE_NAME: &str = "petzli-session";
pub const VERIFIER_COOKIE_NAME: &str = "petzli-code-verifier";

/// Creates a session cookie holding the backend access token, with no expiry
pub fn create_cookie(token: &str) -> Cookie<'static> {
	Cookie::build((COOKIE_NAME, token.to_owned()))
		.secure(!cfg!(debug_assertions))
		.http_only(true)
		.same_site(SameSite::Lax)
		.path("/")
		.into()
}

/// Creates an empty session cookie used to invalidate a previous one
pub fn clear_cookie() -> Cookie<'static> {
	Cookie::build(COOKIE_NAME)
		.http_only(true)
		.path("/")
		.max_age(Duration::ZERO)
		.into()
}

/// Holds the PKCE verifier between leaving for the backend and `/auth/callback`.
pub fn verifier_cookie(verifier: &str) -> Cookie<'static> {
	Cookie::build((VERIFIER_COOKIE_NAME, verifier.to_owned()))
		.secure(!cfg!(debug_assertions))
		.http_only(true)
		.same_site(SameSite::Lax)
		.path("/")
		.max_age(Duration::minutes(10))
		.into()
}

pub fn clear_verifier_cookie() -> Cookie<'static> {
	Cookie::build(VERIFIER_COOKIE_NAME)
		.http_only(true)
		.path("/")
		.max_age(Duration::ZERO)
		.into()
}

/// Finds the value of a request cookie.
pub fn find(headers: &HeaderMap, name: &str) -> Option<String> {
	headers
		.get_all(header::COOKIE)
		.into_iter()
		.filter_map(|value| value.to_str().ok())
		.flat_map(Cookie::split_parse)
		.filter_map(Result::ok)
		.find(|cookie| cookie.name() == name)
		.map(|cookie| cookie.value().to_owned())
}

#[cfg(test)]
mod test {
	use axum::http::HeaderValue;

	use super::*;

	#[test]
	fn test_find_among_other_cookies() {
		let mut headers = HeaderMap::new();

		headers.append(header::COOKIE, HeaderValue::from_static("theme=dark"));
		headers.append(
			header::COOKIE,
			HeaderValue::from_static("a=1; petzli-session=token; b=2"),
		);

		assert_eq!(find(&headers, COOKIE_NAME).as_deref(), Some("token"));
		assert_eq!(find(&headers, VERIFIER_COOKIE_NAME), None);
	}

	#[test]
	fn test_clear_cookie_expires() {
		let cookie = clear_cookie().to_string();

		assert!(cookie.starts_with("petzli-session=;"));
		assert!(cookie.contains("Max-Age=0"));
	}
}
