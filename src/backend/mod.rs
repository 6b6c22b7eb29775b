//! The managed backend that owns accounts, tables and object storage.
//!
//! Handlers only talk to [`Backend`]; [`HttpBackend`] speaks to a
//! Supabase-compatible deployment and [`MemoryBackend`] keeps everything in
//! process for local development and tests.

mod http;
mod memory;

use std::{fmt, sync::Arc, time::Duration};

use async_trait::async_trait;
use axum::body::Bytes;
use uuid::Uuid;

pub use http::HttpBackend;
pub use memory::{MemoryBackend, Operation};

use crate::{
	config::Config,
	model::{AuthSession, AuthUser, NewAccount, NewPost, Post, Profile},
};

pub type SharedBackend = Arc<dyn Backend>;

/// A uniqueness violation reported by the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Conflict {
	Email,
	Username,
	Other(String),
}

impl fmt::Display for Conflict {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Email => f.write_str("User already registered"),
			Self::Username => f.write_str("Username already exists"),
			Self::Other(message) => f.write_str(message),
		}
	}
}

/// An error returned by a backend call.
///
/// `Status` carries the backend's own message, which is shown to the user
/// by some actions.
#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("request failed: {0}")]
	Transport(#[from] reqwest::Error),
	#[error("{message}")]
	Status { status: u16, message: String },
	#[error("unexpected response: {0}")]
	Decode(String),
	#[error("{0}")]
	Conflict(Conflict),
	#[error("Invalid login credentials")]
	InvalidCredentials,
	#[error("not authenticated")]
	Unauthenticated,
	#[error("not found")]
	NotFound,
}

/// A PKCE verifier for the auth flows that come back through `/auth/callback`.
///
/// The `plain` method is used, so the challenge is the verifier itself.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Pkce {
	verifier: String,
}

impl Pkce {
	pub const METHOD: &'static str = "plain";

	pub fn generate() -> Self {
		Self {
			verifier: format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple()),
		}
	}

	pub fn verifier(&self) -> &str {
		&self.verifier
	}

	pub fn challenge(&self) -> &str {
		&self.verifier
	}
}

#[async_trait]
pub trait Backend: Send + Sync {
	/// Creates an account, attaching `account.metadata` to it.
	async fn sign_up(&self, account: &NewAccount, redirect_to: &str, pkce: &Pkce)
		-> Result<(), Error>;

	async fn sign_in_with_password(&self, email: &str, password: &str)
		-> Result<AuthSession, Error>;

	/// Exchanges a code handed to `/auth/callback` for a session.
	async fn exchange_code(&self, code: &str, verifier: &str) -> Result<AuthSession, Error>;

	async fn sign_out(&self, token: &str) -> Result<(), Error>;

	/// Sends a password reset email whose link leads to `redirect_to`.
	async fn reset_password_for_email(
		&self,
		email: &str,
		redirect_to: &str,
		pkce: &Pkce,
	) -> Result<(), Error>;

	async fn update_password(&self, token: &str, password: &str) -> Result<(), Error>;

	/// Resolves an access token to its user.
	async fn user(&self, token: &str) -> Result<AuthUser, Error>;

	/// Returns the provider URL to send the browser to, if the provider is available.
	fn oauth_url(&self, provider: &str, redirect_to: &str, pkce: &Pkce) -> Option<String>;

	async fn find_profile(&self, user_name: &str) -> Result<Option<Profile>, Error>;

	async fn upload(
		&self,
		token: &str,
		bucket: &str,
		path: &str,
		content_type: &str,
		bytes: Bytes,
	) -> Result<(), Error>;

	async fn remove(&self, token: &str, bucket: &str, path: &str) -> Result<(), Error>;

	async fn insert_post(&self, token: &str, post: &NewPost) -> Result<(), Error>;

	/// Lists posts with their author's profile, in whatever order the backend returns.
	async fn posts(&self, token: &str) -> Result<Vec<Post>, Error>;

	/// The publicly servable URL of a stored object.
	fn public_url(&self, bucket: &str, path: &str) -> String;
}

#[derive(Debug, thiserror::Error)]
pub enum ConnectError {
	#[error("invalid backend url: {0}")]
	Url(#[from] url::ParseError),
	#[error("BACKEND_ANON_KEY must be set together with BACKEND_URL")]
	MissingKey,
	#[error("could not build http client: {0}")]
	Client(#[from] reqwest::Error),
}

/// Picks the backend described by the configuration.
///
/// Without `BACKEND_URL`, everything is kept in memory and lost on restart.
pub fn connect(config: &Config) -> Result<SharedBackend, ConnectError> {
	let Some(url) = config.backend_url.as_deref() else {
		tracing::warn!("BACKEND_URL is not set, using the in-memory backend");

		return Ok(Arc::new(MemoryBackend::new(
			&config.site_origin,
			[config.oauth_provider.clone()],
		)));
	};

	let key = config
		.backend_anon_key
		.clone()
		.ok_or(ConnectError::MissingKey)?;

	let backend = HttpBackend::new(
		url.parse()?,
		key,
		Duration::from_secs(config.backend_timeout_secs),
	)?;

	tracing::info!(url, "using the http backend");

	Ok(Arc::new(backend))
}
