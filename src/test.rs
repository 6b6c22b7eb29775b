use std::sync::Arc;

use axum::http::{header, HeaderValue};
use axum_test::{TestRequest, TestResponse, TestServer};
use url::form_urlencoded;

use crate::{
	backend::{Backend, MemoryBackend, Pkce},
	config::Config,
	model::{AccountMetadata, NewAccount, UserType},
	session, State,
};

pub const EMAIL: &str = "petlover@petzli.dev";
pub const PASSWORD: &str = "hunter2hunter";

pub fn app() -> (TestServer, Arc<MemoryBackend>) {
	let backend = Arc::new(MemoryBackend::new(
		"http://localhost:3000",
		["github".to_owned()],
	));
	let state = State {
		backend: backend.clone(),
		config: Arc::new(Config::default()),
	};

	(TestServer::new(crate::app(state)).unwrap(), backend)
}

/// Creates a confirmed no-pet account.
pub async fn register(backend: &MemoryBackend, user_name: &str, email: &str) {
	let account = NewAccount {
		email: email.into(),
		password: PASSWORD.into(),
		metadata: AccountMetadata {
			user_name: user_name.into(),
			user_type: UserType::NoPet,
			pet_name: None,
			pet_age: None,
			pet_gender: None,
		},
	};

	backend
		.sign_up(&account, "http://localhost:3000/auth/callback", &Pkce::generate())
		.await
		.unwrap();
}

/// Registers `petlover` and returns a `Cookie` header carrying its session.
pub async fn signed_in(backend: &MemoryBackend) -> HeaderValue {
	register(backend, "petlover", EMAIL).await;

	let auth = backend.sign_in_with_password(EMAIL, PASSWORD).await.unwrap();

	HeaderValue::from_str(&format!("{}={}", session::COOKIE_NAME, auth.access_token)).unwrap()
}

/// A GET for `target`, with its query string passed as query parameters.
pub fn follow(app: &TestServer, target: &str) -> TestRequest {
	let (path, query) = target.split_once('?').unwrap_or((target, ""));

	form_urlencoded::parse(query.as_bytes()).fold(app.get(path), |request, (key, value)| {
		request.add_query_param(&key, value.as_ref())
	})
}

const BOUNDARY: &str = "petzli-test-boundary";

/// A `multipart/form-data` body built by hand.
#[derive(Default)]
pub struct MultipartForm {
	body: Vec<u8>,
	html: bool,
}

impl MultipartForm {
	pub fn new() -> Self {
		Self::default()
	}

	/// Sends the form the way a browser does, asking for a page back.
	pub fn html(&mut self) -> &mut Self {
		self.html = true;
		self
	}

	pub fn text(&mut self, name: &str, value: &str) -> &mut Self {
		self.body.extend_from_slice(
			format!(
				"--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
			)
			.as_bytes(),
		);
		self
	}

	pub fn file(&mut self, name: &str, file_name: &str, content_type: &str, bytes: &[u8]) -> &mut Self {
		self.body.extend_from_slice(
			format!(
				"--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\nContent-Type: {content_type}\r\n\r\n"
			)
			.as_bytes(),
		);
		self.body.extend_from_slice(bytes);
		self.body.extend_from_slice(b"\r\n");
		self
	}

	pub async fn send(mut self, app: &TestServer, path: &str, cookie: HeaderValue) -> TestResponse {
		self.body
			.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

		let mut request = app
			.post(path)
			.add_header(header::COOKIE, cookie)
			.bytes(self.body.into())
			.content_type(&format!("multipart/form-data; boundary={BOUNDARY}"));

		if self.html {
			request = request.add_header(header::ACCEPT, HeaderValue::from_static("text/html"));
		}

		request.await
	}
}
