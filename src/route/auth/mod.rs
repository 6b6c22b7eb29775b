use axum::{
	routing::{get, post},
	Router,
};

use crate::{backend, error, AppState};

pub mod model;
pub mod route;

pub const SIGN_IN: &str = "/sign-in";
pub const SIGN_UP: &str = "/sign-up";
pub const FORGOT_PASSWORD: &str = "/forgot-password";
pub const RESET_PASSWORD: &str = "/protected/reset-password";
pub const PROTECTED: &str = "/protected";

/// An error that can occur during authentication.
///
/// Note that the messages are presented to the user, so they should not contain
/// sensitive information.
#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("All required fields must be filled")]
	MissingFields,
	#[error("All pet information is required")]
	MissingPetInfo,
	#[error("{0}")]
	Invalid(String),
	#[error("Username already exists")]
	UsernameTaken,
	#[error("Password or email invalid")]
	InvalidCredentials,
	#[error("Email is required")]
	EmailRequired,
	#[error("Could not reset password")]
	ResetFailed(#[source] backend::Error),
	#[error("Password and confirm password are required")]
	PasswordRequired,
	#[error("Passwords do not match")]
	PasswordMismatch,
	#[error("Password update failed")]
	PasswordUpdateFailed(#[source] backend::Error),
	#[error("Could not start {0} sign-in")]
	NoAuthorizationUrl(String),
	#[error("{0}")]
	Callback(String),
	#[error("{0}")]
	Backend(#[from] backend::Error),
}

impl error::ErrorShape for Error {
	fn is_internal(&self) -> bool {
		matches!(
			self,
			Self::ResetFailed(..)
				| Self::PasswordUpdateFailed(..)
				| Self::NoAuthorizationUrl(..)
				| Self::Backend(..)
		)
	}
}

pub fn routes() -> Router<AppState> {
	use route::*;

	Router::new()
		.route(SIGN_IN, get(sign_in_page).post(sign_in))
		.route(SIGN_UP, get(sign_up_page).post(register))
		.route("/sign-up/step", post(sign_up_step))
		.route(FORGOT_PASSWORD, get(forgot_password_page).post(forgot_password))
		.route(RESET_PASSWORD, get(reset_password_page).post(reset_password))
		.route("/sign-out", post(sign_out))
		.route("/auth/oauth", post(oauth_login))
		.route("/auth/callback", get(callback))
		.route("/api/username-availability", get(username_availability))
}

/// Whether `target` stays on this site.
pub fn is_local_path(target: &str) -> bool {
	target.starts_with('/') && !target.starts_with("//") && !target.contains('\\')
}

/// How a provider is named to users.
pub fn provider_label(provider: &str) -> String {
	match provider {
		"github" => "GitHub".into(),
		"gitlab" => "GitLab".into(),
		provider => {
			let mut chars = provider.chars();

			chars
				.next()
				.map(|first| first.to_uppercase().chain(chars).collect())
				.unwrap_or_default()
		}
	}
}
