use std::{
	collections::{HashMap, HashSet},
	sync::{Mutex, MutexGuard, PoisonError},
};

use argon2::Argon2;
use async_trait::async_trait;
use axum::body::Bytes;
use chrono::Utc;
use url::Url;
use uuid::Uuid;

use super::{Backend, Conflict, Error, Pkce};
use crate::model::{AccountMetadata, AuthSession, AuthUser, NewAccount, NewPost, Post, Profile, UserType};

pub const KEY_LENGTH: usize = 32;

/// Backend calls that can be counted, and made to fail in tests.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Operation {
	SignUp,
	SignIn,
	ResetPassword,
	UpdatePassword,
	Upload,
	Remove,
	InsertPost,
	Posts,
}

struct Account {
	id: Uuid,
	email: String,
	password: [u8; KEY_LENGTH],
	metadata: AccountMetadata,
}

struct StoredObject {
	#[allow(dead_code)]
	content_type: String,
	bytes: Bytes,
}

#[derive(Default)]
struct Inner {
	accounts: Vec<Account>,
	/// Access token to account id.
	sessions: HashMap<String, Uuid>,
	/// Pending auth code to account id and PKCE challenge.
	codes: HashMap<String, (Uuid, String)>,
	objects: HashMap<(String, String), StoredObject>,
	posts: Vec<Post>,
	calls: HashMap<Operation, usize>,
	failing: HashSet<Operation>,
	/// Profile lookups find nothing, as on a replica lagging behind sign-ups.
	stale_profiles: bool,
}

impl Inner {
	/// Records a call, failing it if it was armed to fail.
	fn record(&mut self, operation: Operation) -> Result<(), Error> {
		*self.calls.entry(operation).or_default() += 1;

		if self.failing.remove(&operation) {
			return Err(Error::Status {
				status: 500,
				message: format!("{operation:?} failed"),
			});
		}

		Ok(())
	}

	fn account(&self, token: &str) -> Result<&Account, Error> {
		let id = self.sessions.get(token).ok_or(Error::Unauthenticated)?;

		self.accounts
			.iter()
			.find(|account| account.id == *id)
			.ok_or(Error::Unauthenticated)
	}

	fn open_session(&mut self, id: Uuid, email: &str) -> AuthSession {
		let token = Uuid::new_v4().simple().to_string();

		self.sessions.insert(token.clone(), id);

		AuthSession {
			access_token: token,
			refresh_token: None,
			user: AuthUser {
				id,
				email: Some(email.to_owned()),
			},
		}
	}

	fn profile(&self, id: Uuid) -> Option<Profile> {
		self.accounts
			.iter()
			.find(|account| account.id == id)
			.map(|account| Profile {
				user_name: account.metadata.user_name.clone(),
				avatar_url: None,
			})
	}
}

/// Keeps accounts, posts and objects in process.
///
/// Creating an account also creates its profile, which is what the database
/// trigger does on a real deployment. Nothing survives a restart.
pub struct MemoryBackend {
	inner: Mutex<Inner>,
	hasher: Argon2<'static>,
	origin: String,
	providers: Vec<String>,
}

/// Hashes a password with Argon2, using the account id as a salt.
fn hash_password(
	hasher: &Argon2,
	password: &str,
	id: &Uuid,
) -> Result<[u8; KEY_LENGTH], Error> {
	let mut hash = [0; KEY_LENGTH];

	hasher
		.hash_password_into(password.as_bytes(), id.as_bytes(), &mut hash)
		.map_err(|error| Error::Decode(format!("password hashing failed: {error}")))?;

	Ok(hash)
}

impl MemoryBackend {
	/// `providers` lists the OAuth providers that hand out authorization URLs.
	pub fn new(origin: &str, providers: impl IntoIterator<Item = String>) -> Self {
		Self {
			inner: Mutex::default(),
			hasher: Argon2::default(),
			origin: origin.trim_end_matches('/').to_owned(),
			providers: providers.into_iter().collect(),
		}
	}

	fn lock(&self) -> MutexGuard<'_, Inner> {
		self.inner.lock().unwrap_or_else(PoisonError::into_inner)
	}

	fn issue_code(&self, id: Uuid, pkce: &Pkce) -> String {
		let code = Uuid::new_v4().to_string();

		self.lock()
			.codes
			.insert(code.clone(), (id, pkce.challenge().to_owned()));

		code
	}

	/// Makes the next call of `operation` fail.
	pub fn fail_next(&self, operation: Operation) {
		self.lock().failing.insert(operation);
	}

	/// Makes every profile lookup miss, while sign-up still sees all accounts.
	pub fn stale_profiles(&self) {
		self.lock().stale_profiles = true;
	}

	/// How many times `operation` was called.
	pub fn calls(&self, operation: Operation) -> usize {
		self.lock().calls.get(&operation).copied().unwrap_or(0)
	}

	/// How many objects are in storage.
	pub fn objects(&self) -> usize {
		self.lock().objects.len()
	}
}

#[async_trait]
impl Backend for MemoryBackend {
	async fn sign_up(&self, account: &NewAccount, redirect_to: &str, _pkce: &Pkce) -> Result<(), Error> {
		let id = Uuid::new_v4();
		let password = hash_password(&self.hasher, &account.password, &id)?;
		let mut inner = self.lock();

		inner.record(Operation::SignUp)?;

		if inner
			.accounts
			.iter()
			.any(|existing| existing.email.eq_ignore_ascii_case(&account.email))
		{
			return Err(Error::Conflict(Conflict::Email));
		}

		if inner
			.accounts
			.iter()
			.any(|existing| existing.metadata.user_name == account.metadata.user_name)
		{
			return Err(Error::Conflict(Conflict::Username));
		}

		inner.accounts.push(Account {
			id,
			email: account.email.to_lowercase(),
			password,
			metadata: account.metadata.clone(),
		});

		tracing::info!(%id, redirect_to, "account created");

		Ok(())
	}

	async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<AuthSession, Error> {
		let (id, stored) = {
			let mut inner = self.lock();

			inner.record(Operation::SignIn)?;

			let account = inner
				.accounts
				.iter()
				.find(|account| account.email.eq_ignore_ascii_case(email))
				.ok_or(Error::InvalidCredentials)?;

			(account.id, account.password)
		};

		if hash_password(&self.hasher, password, &id)? != stored {
			return Err(Error::InvalidCredentials);
		}

		Ok(self.lock().open_session(id, email))
	}

	async fn exchange_code(&self, code: &str, verifier: &str) -> Result<AuthSession, Error> {
		let mut inner = self.lock();
		let (id, challenge) = inner.codes.remove(code).ok_or(Error::Status {
			status: 400,
			message: "Invalid or expired auth code".into(),
		})?;

		if challenge != verifier {
			return Err(Error::Status {
				status: 400,
				message: "Code verifier does not match".into(),
			});
		}

		let email = inner
			.accounts
			.iter()
			.find(|account| account.id == id)
			.map(|account| account.email.clone())
			.ok_or(Error::NotFound)?;

		Ok(inner.open_session(id, &email))
	}

	async fn sign_out(&self, token: &str) -> Result<(), Error> {
		self.lock().sessions.remove(token);
		Ok(())
	}

	async fn reset_password_for_email(&self, email: &str, redirect_to: &str, pkce: &Pkce) -> Result<(), Error> {
		let id = {
			let mut inner = self.lock();

			inner.record(Operation::ResetPassword)?;
			inner
				.accounts
				.iter()
				.find(|account| account.email.eq_ignore_ascii_case(email))
				.map(|account| account.id)
		};

		// Unknown addresses succeed silently so registered emails are not revealed.
		if let Some(id) = id {
			let code = self.issue_code(id, pkce);

			tracing::info!(redirect_to, %code, "password reset link issued");
		}

		Ok(())
	}

	async fn update_password(&self, token: &str, password: &str) -> Result<(), Error> {
		let id = {
			let mut inner = self.lock();

			inner.record(Operation::UpdatePassword)?;
			inner.account(token)?.id
		};

		let hashed = hash_password(&self.hasher, password, &id)?;

		if let Some(account) = self.lock().accounts.iter_mut().find(|account| account.id == id) {
			account.password = hashed;
		}

		Ok(())
	}

	async fn user(&self, token: &str) -> Result<AuthUser, Error> {
		let inner = self.lock();
		let account = inner.account(token)?;

		Ok(AuthUser {
			id: account.id,
			email: Some(account.email.clone()),
		})
	}

	/// Stands in for the provider: the returned URL leads straight back to
	/// `redirect_to` with a code for a per-provider account.
	fn oauth_url(&self, provider: &str, redirect_to: &str, pkce: &Pkce) -> Option<String> {
		if !self.providers.iter().any(|enabled| enabled == provider) {
			return None;
		}

		let mut url = Url::parse(redirect_to).ok()?;
		let email = format!("{provider}@oauth.petzli.local");

		let id = {
			let mut inner = self.lock();

			if let Some(account) = inner.accounts.iter().find(|account| account.email == email) {
				account.id
			} else {
				let id = Uuid::new_v4();

				inner.accounts.push(Account {
					id,
					email,
					password: [0; KEY_LENGTH],
					metadata: AccountMetadata {
						user_name: format!("{provider}_{}", &id.simple().to_string()[..8]),
						user_type: UserType::NoPet,
						pet_name: None,
						pet_age: None,
						pet_gender: None,
					},
				});

				id
			}
		};

		let code = self.issue_code(id, pkce);

		url.query_pairs_mut().append_pair("code", &code);

		Some(url.into())
	}

	async fn find_profile(&self, user_name: &str) -> Result<Option<Profile>, Error> {
		let inner = self.lock();

		if inner.stale_profiles {
			return Ok(None);
		}

		Ok(inner
			.accounts
			.iter()
			.find(|account| account.metadata.user_name == user_name)
			.and_then(|account| inner.profile(account.id)))
	}

	async fn upload(
		&self,
		token: &str,
		bucket: &str,
		path: &str,
		content_type: &str,
		bytes: Bytes,
	) -> Result<(), Error> {
		let mut inner = self.lock();

		inner.record(Operation::Upload)?;
		inner.account(token)?;

		let key = (bucket.to_owned(), path.to_owned());

		if inner.objects.contains_key(&key) {
			return Err(Error::Conflict(Conflict::Other("The resource already exists".into())));
		}

		inner.objects.insert(
			key,
			StoredObject {
				content_type: content_type.to_owned(),
				bytes,
			},
		);

		Ok(())
	}

	async fn remove(&self, token: &str, bucket: &str, path: &str) -> Result<(), Error> {
		let mut inner = self.lock();

		inner.record(Operation::Remove)?;
		inner.account(token)?;
		inner
			.objects
			.remove(&(bucket.to_owned(), path.to_owned()))
			.map(|object| tracing::debug!(path, size = object.bytes.len(), "object removed"))
			.ok_or(Error::NotFound)
	}

	async fn insert_post(&self, token: &str, post: &NewPost) -> Result<(), Error> {
		let mut inner = self.lock();

		inner.record(Operation::InsertPost)?;

		if inner.account(token)?.id != post.author_id {
			return Err(Error::Status {
				status: 403,
				message: "new row violates row-level security policy".into(),
			});
		}

		let id = i64::try_from(inner.posts.len()).unwrap_or(i64::MAX).saturating_add(1);

		inner.posts.push(Post {
			id,
			title: post.title.clone(),
			description: post.description.clone(),
			location: post.location.clone(),
			image: post.image.clone(),
			author_id: post.author_id,
			created_at: Utc::now(),
			profiles: None,
		});

		Ok(())
	}

	async fn posts(&self, token: &str) -> Result<Vec<Post>, Error> {
		let mut inner = self.lock();

		inner.record(Operation::Posts)?;
		inner.account(token)?;

		Ok(inner
			.posts
			.iter()
			.map(|post| Post {
				profiles: inner.profile(post.author_id),
				..post.clone()
			})
			.collect())
	}

	fn public_url(&self, bucket: &str, path: &str) -> String {
		format!("{}/storage/v1/object/public/{bucket}/{path}", self.origin)
	}
}

#[cfg(test)]
mod test {
	use super::*;

	fn account(user_name: &str, email: &str) -> NewAccount {
		NewAccount {
			email: email.into(),
			password: "hunter2hunter".into(),
			metadata: AccountMetadata {
				user_name: user_name.into(),
				user_type: UserType::NoPet,
				pet_name: None,
				pet_age: None,
				pet_gender: None,
			},
		}
	}

	fn backend() -> MemoryBackend {
		MemoryBackend::new("http://localhost:3000", ["github".to_owned()])
	}

	#[tokio::test]
	async fn test_sign_up_then_sign_in() {
		let backend = backend();
		let pkce = Pkce::generate();

		backend
			.sign_up(&account("rex", "rex@petzli.dev"), "/", &pkce)
			.await
			.unwrap();

		let session = backend
			.sign_in_with_password("Rex@Petzli.dev", "hunter2hunter")
			.await
			.unwrap();

		assert_eq!(backend.user(&session.access_token).await.unwrap().id, session.user.id);
		assert!(backend.find_profile("rex").await.unwrap().is_some());
	}

	#[tokio::test]
	async fn test_wrong_password_is_invalid_credentials() {
		let backend = backend();

		backend
			.sign_up(&account("rex", "rex@petzli.dev"), "/", &Pkce::generate())
			.await
			.unwrap();

		assert!(matches!(
			backend.sign_in_with_password("rex@petzli.dev", "wrong-password").await,
			Err(Error::InvalidCredentials)
		));
	}

	#[tokio::test]
	async fn test_duplicate_user_name_conflicts() {
		let backend = backend();
		let pkce = Pkce::generate();

		backend
			.sign_up(&account("rex", "rex@petzli.dev"), "/", &pkce)
			.await
			.unwrap();

		assert!(matches!(
			backend.sign_up(&account("rex", "other@petzli.dev"), "/", &pkce).await,
			Err(Error::Conflict(Conflict::Username))
		));
	}

	#[tokio::test]
	async fn test_oauth_code_requires_matching_verifier() {
		let backend = backend();
		let pkce = Pkce::generate();
		let url = backend
			.oauth_url("github", "http://localhost:3000/auth/callback", &pkce)
			.unwrap();

		let url = Url::parse(&url).unwrap();
		let code = url
			.query_pairs()
			.find(|(key, _)| key == "code")
			.map(|(_, value)| value.into_owned())
			.unwrap();

		assert!(backend.exchange_code(&code, "not-the-verifier").await.is_err());

		assert!(backend.oauth_url("gitlab", "http://localhost:3000/auth/callback", &pkce).is_none());
	}
}
