use axum::{
	extract::{FromRef, FromRequestParts},
	http::request,
	response::Redirect,
};

use crate::{backend::SharedBackend, model::AuthUser, session};

pub const SIGN_IN_PATH: &str = "/sign-in";

/// Extracts the session token and its user from the request.
///
/// Browsers without a session cookie, or with one the backend no longer
/// accepts, are redirected to the sign-in page.
///
/// ```ignore
/// async fn route(session: Session) {
///   println!("{:?}", session.user);
/// }
/// ```
#[derive(Debug)]
pub struct Session {
	pub token: String,
	pub user: AuthUser,
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for Session
where
	SharedBackend: FromRef<S>,
	S: Sync + Send,
{
	type Rejection = Redirect;

	async fn from_request_parts(
		parts: &mut request::Parts,
		state: &S,
	) -> Result<Self, Self::Rejection> {
		let token = session::find(&parts.headers, session::COOKIE_NAME)
			.ok_or_else(|| Redirect::to(SIGN_IN_PATH))?;

		let backend = SharedBackend::from_ref(state);
		let user = backend.user(&token).await.map_err(|error| {
			tracing::debug!(%error, "session rejected");
			Redirect::to(SIGN_IN_PATH)
		})?;

		Ok(Session { token, user })
	}
}
