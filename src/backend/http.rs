use std::time::Duration;

use async_trait::async_trait;
use axum::body::Bytes;
use reqwest::{header, Client, Method, RequestBuilder, Response, StatusCode, Url};
use serde::{de::DeserializeOwned, Deserialize};
use serde_json::json;

use super::{Backend, Conflict, Error, Pkce};
use crate::model::{AuthSession, AuthUser, NewAccount, NewPost, Post, Profile};

/// Postgres' `unique_violation`.
const UNIQUE_VIOLATION: &str = "23505";

/// Talks to a Supabase-compatible deployment over its REST endpoints.
///
/// Requests made on behalf of a user carry their access token, so the
/// backend's row-level policies apply; everything else uses the anon key.
pub struct HttpBackend {
	client: Client,
	base: Url,
	anon_key: String,
}

/// The union of the error bodies returned by the auth, table and storage services.
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
	msg: Option<String>,
	message: Option<String>,
	error_description: Option<String>,
	error: Option<String>,
	error_code: Option<String>,
	code: Option<serde_json::Value>,
	details: Option<String>,
}

impl HttpBackend {
	pub fn new(base: Url, anon_key: String, timeout: Duration) -> Result<Self, reqwest::Error> {
		let client = Client::builder().timeout(timeout).build()?;

		Ok(Self {
			client,
			base,
			anon_key,
		})
	}

	fn endpoint(&self, path: &str) -> Result<Url, Error> {
		self.base
			.join(path)
			.map_err(|error| Error::Decode(format!("invalid endpoint {path}: {error}")))
	}

	fn request(&self, method: Method, path: &str, token: Option<&str>) -> Result<RequestBuilder, Error> {
		Ok(self
			.client
			.request(method, self.endpoint(path)?)
			.header("apikey", &self.anon_key)
			.bearer_auth(token.unwrap_or(&self.anon_key)))
	}

	fn object_path(bucket: &str, path: &str) -> String {
		format!("/storage/v1/object/{bucket}/{path}")
	}
}

async fn send(request: RequestBuilder) -> Result<Response, Error> {
	let response = request.send().await?;
	let status = response.status();

	if status.is_success() {
		return Ok(response);
	}

	let body = response.bytes().await?;

	Err(status_error(status, &body))
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, Error> {
	response
		.json()
		.await
		.map_err(|error| Error::Decode(error.to_string()))
}

/// Maps an unsuccessful response onto [`Error`], keeping the backend's message.
fn status_error(status: StatusCode, body: &[u8]) -> Error {
	let body = serde_json::from_slice::<ErrorBody>(body).unwrap_or_default();
	let code = body.code.as_ref().map(|code| match code {
		serde_json::Value::String(code) => code.clone(),
		code => code.to_string(),
	});

	let message = body
		.msg
		.or(body.message)
		.or(body.error_description)
		.or_else(|| body.error.clone())
		.unwrap_or_else(|| status.canonical_reason().unwrap_or("request failed").to_owned());

	match (body.error_code.as_deref(), body.error.as_deref(), code.as_deref()) {
		(Some("invalid_credentials"), ..) | (_, Some("invalid_grant"), _) => Error::InvalidCredentials,
		(Some("user_already_exists" | "email_exists"), ..) => Error::Conflict(Conflict::Email),
		(.., Some(UNIQUE_VIOLATION)) => {
			let details = body.details.unwrap_or_default();

			if details.contains("user_name") || message.contains("user_name") {
				Error::Conflict(Conflict::Username)
			} else {
				Error::Conflict(Conflict::Other(message))
			}
		}
		_ if status == StatusCode::UNAUTHORIZED => Error::Unauthenticated,
		_ if status == StatusCode::NOT_FOUND => Error::NotFound,
		_ => Error::Status {
			status: status.as_u16(),
			message,
		},
	}
}

#[async_trait]
impl Backend for HttpBackend {
	async fn sign_up(&self, account: &NewAccount, redirect_to: &str, pkce: &Pkce) -> Result<(), Error> {
		let request = self
			.request(Method::POST, "/auth/v1/signup", None)?
			.query(&[("redirect_to", redirect_to)])
			.json(&json!({
				"email": account.email,
				"password": account.password,
				"data": account.metadata,
				"code_challenge": pkce.challenge(),
				"code_challenge_method": Pkce::METHOD,
			}));

		send(request).await?;
		Ok(())
	}

	async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<AuthSession, Error> {
		let request = self
			.request(Method::POST, "/auth/v1/token", None)?
			.query(&[("grant_type", "password")])
			.json(&json!({ "email": email, "password": password }));

		decode(send(request).await?).await
	}

	async fn exchange_code(&self, code: &str, verifier: &str) -> Result<AuthSession, Error> {
		let request = self
			.request(Method::POST, "/auth/v1/token", None)?
			.query(&[("grant_type", "pkce")])
			.json(&json!({ "auth_code": code, "code_verifier": verifier }));

		decode(send(request).await?).await
	}

	async fn sign_out(&self, token: &str) -> Result<(), Error> {
		send(self.request(Method::POST, "/auth/v1/logout", Some(token))?).await?;
		Ok(())
	}

	async fn reset_password_for_email(&self, email: &str, redirect_to: &str, pkce: &Pkce) -> Result<(), Error> {
		let request = self
			.request(Method::POST, "/auth/v1/recover", None)?
			.query(&[("redirect_to", redirect_to)])
			.json(&json!({
				"email": email,
				"code_challenge": pkce.challenge(),
				"code_challenge_method": Pkce::METHOD,
			}));

		send(request).await?;
		Ok(())
	}

	async fn update_password(&self, token: &str, password: &str) -> Result<(), Error> {
		let request = self
			.request(Method::PUT, "/auth/v1/user", Some(token))?
			.json(&json!({ "password": password }));

		send(request).await?;
		Ok(())
	}

	async fn user(&self, token: &str) -> Result<AuthUser, Error> {
		decode(send(self.request(Method::GET, "/auth/v1/user", Some(token))?).await?).await
	}

	fn oauth_url(&self, provider: &str, redirect_to: &str, pkce: &Pkce) -> Option<String> {
		let mut url = self.endpoint("/auth/v1/authorize").ok()?;

		url.query_pairs_mut()
			.append_pair("provider", provider)
			.append_pair("redirect_to", redirect_to)
			.append_pair("code_challenge", pkce.challenge())
			.append_pair("code_challenge_method", Pkce::METHOD);

		Some(url.into())
	}

	async fn find_profile(&self, user_name: &str) -> Result<Option<Profile>, Error> {
		let filter = format!("eq.{user_name}");
		let request = self
			.request(Method::GET, "/rest/v1/profiles", None)?
			.query(&[
				("select", "user_name,avatar_url"),
				("user_name", filter.as_str()),
				("limit", "1"),
			]);

		let profiles: Vec<Profile> = decode(send(request).await?).await?;

		Ok(profiles.into_iter().next())
	}

	async fn upload(
		&self,
		token: &str,
		bucket: &str,
		path: &str,
		content_type: &str,
		bytes: Bytes,
	) -> Result<(), Error> {
		let request = self
			.request(Method::POST, &Self::object_path(bucket, path), Some(token))?
			.header(header::CONTENT_TYPE, content_type)
			.header("x-upsert", "false")
			.body(bytes);

		send(request).await?;
		Ok(())
	}

	async fn remove(&self, token: &str, bucket: &str, path: &str) -> Result<(), Error> {
		send(self.request(Method::DELETE, &Self::object_path(bucket, path), Some(token))?).await?;
		Ok(())
	}

	async fn insert_post(&self, token: &str, post: &NewPost) -> Result<(), Error> {
		let request = self
			.request(Method::POST, "/rest/v1/posts", Some(token))?
			.header("Prefer", "return=minimal")
			.json(post);

		send(request).await?;
		Ok(())
	}

	async fn posts(&self, token: &str) -> Result<Vec<Post>, Error> {
		let request = self
			.request(Method::GET, "/rest/v1/posts", Some(token))?
			.query(&[("select", "*,profiles(user_name,avatar_url)")]);

		decode(send(request).await?).await
	}

	fn public_url(&self, bucket: &str, path: &str) -> String {
		format!(
			"{}/storage/v1/object/public/{bucket}/{path}",
			self.base.as_str().trim_end_matches('/')
		)
	}
}

#[cfg(test)]
mod test {
	use super::*;

	fn backend() -> HttpBackend {
		HttpBackend::new(
			"https://project.example.co".parse().unwrap(),
			"anon".into(),
			Duration::from_secs(1),
		)
		.unwrap()
	}

	#[test]
	fn test_invalid_grant_is_invalid_credentials() {
		let body = br#"{"error":"invalid_grant","error_description":"Invalid login credentials"}"#;

		assert!(matches!(
			status_error(StatusCode::BAD_REQUEST, body),
			Error::InvalidCredentials
		));
	}

	#[test]
	fn test_existing_user_is_email_conflict() {
		let body = br#"{"code":422,"error_code":"user_already_exists","msg":"User already registered"}"#;

		assert!(matches!(
			status_error(StatusCode::UNPROCESSABLE_ENTITY, body),
			Error::Conflict(Conflict::Email)
		));
	}

	#[test]
	fn test_unique_violation_on_user_name() {
		let body = br#"{"code":"23505","details":"Key (user_name)=(rex) already exists.","message":"duplicate key value violates unique constraint \"profiles_user_name_key\""}"#;

		assert!(matches!(
			status_error(StatusCode::CONFLICT, body),
			Error::Conflict(Conflict::Username)
		));
	}

	#[test]
	fn test_status_error_keeps_backend_message() {
		let body = br#"{"msg":"Email rate limit exceeded"}"#;
		let error = status_error(StatusCode::TOO_MANY_REQUESTS, body);

		assert_eq!(error.to_string(), "Email rate limit exceeded");
	}

	#[test]
	fn test_status_error_without_body() {
		let error = status_error(StatusCode::BAD_GATEWAY, b"");

		assert_eq!(error.to_string(), "Bad Gateway");
	}

	#[test]
	fn test_oauth_url() {
		let pkce = Pkce::generate();
		let url = backend()
			.oauth_url("github", "http://localhost:3000/auth/callback", &pkce)
			.unwrap();

		assert!(url.starts_with("https://project.example.co/auth/v1/authorize?provider=github"));
		assert!(url.contains("redirect_to=http%3A%2F%2Flocalhost%3A3000%2Fauth%2Fcallback"));
		assert!(url.contains(&format!("code_challenge={}", pkce.challenge())));
	}

	#[test]
	fn test_public_url() {
		assert_eq!(
			backend().public_url("posts", "images/a.png"),
			"https://project.example.co/storage/v1/object/public/posts/images/a.png"
		);
	}
}
