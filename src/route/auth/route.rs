use std::sync::Arc;

use axum::{
	extract::State,
	http::{header, HeaderMap},
	response::{AppendHeaders, Html, IntoResponse, Redirect, Response},
	Form, Json,
};
use validator::Validate;

use crate::{
	backend::{self, Conflict, Pkce, SharedBackend},
	config::Config,
	error::{self, ErrorShape},
	extract::{Query, Session},
	page,
	redirect::{self, EncodedRedirect, FormMessage},
	session,
	username::{self, Availability},
	wizard::{Event, Step, Transition, Wizard},
	AppState,
};

use super::{
	is_local_path, model, provider_label, Error, FORGOT_PASSWORD, PROTECTED, RESET_PASSWORD,
	SIGN_IN, SIGN_UP,
};

const SIGNED_UP: &str = "Thanks for signing up! Please check your email for a verification link.";
const RESET_EMAIL_SENT: &str = "Check your email for a link to reset your password.";

fn present(value: Option<String>) -> Option<String> {
	value.filter(|value| !value.is_empty())
}

pub async fn sign_in_page(State(config): State<Arc<Config>>, message: FormMessage) -> Html<String> {
	page::auth::sign_in(&message, &provider_label(&config.oauth_provider))
}

pub async fn forgot_password_page(message: FormMessage) -> Html<String> {
	page::auth::forgot_password(&message)
}

pub async fn reset_password_page(_session: Session, message: FormMessage) -> Html<String> {
	page::auth::reset_password(&message)
}

/// Renders the wizard from its first step, or its last one after a successful sign-up.
pub async fn sign_up_page(State(config): State<Arc<Config>>, message: FormMessage) -> Html<String> {
	let mut wizard = if message.is_success() {
		Wizard::resume(Step::Details, Default::default(), Availability::Unknown)
	} else {
		Wizard::default()
	};

	wizard.apply(Event::Redirected(message.clone()));
	page::sign_up::render(&wizard, &message, &provider_label(&config.oauth_provider))
}

/// Validates a registration and creates the account, returning the PKCE
/// verifier for the confirmation link.
async fn create_account(state: &AppState, form: model::RegisterForm) -> Result<Pkce, Error> {
	let registration = form.into_registration()?;

	registration
		.validate()
		.map_err(|errors| Error::Invalid(error::messages(&errors, model::FIELDS).join(", ")))?;

	let user_name = &registration.credentials().username;

	if username::check(state.backend.as_ref(), user_name).await? == Availability::Taken {
		return Err(Error::UsernameTaken);
	}

	let pkce = Pkce::generate();

	state
		.backend
		.sign_up(
			&registration.into_account(),
			&state.config.callback_url(None),
			&pkce,
		)
		.await
		.map_err(|error| match error {
			backend::Error::Conflict(Conflict::Username) => Error::UsernameTaken,
			error => Error::Backend(error),
		})?;

	Ok(pkce)
}

fn signed_up(pkce: &Pkce) -> Response {
	(
		[(
			header::SET_COOKIE,
			session::verifier_cookie(pkce.verifier()).to_string(),
		)],
		redirect::success(SIGN_UP, SIGNED_UP),
	)
		.into_response()
}

/// Register account
/// Creates an account with the pet details attached, then asks the user to
/// confirm their email.
pub async fn register(
	State(state): State<AppState>,
	Form(form): Form<model::RegisterForm>,
) -> Result<Response, EncodedRedirect> {
	let pkce = create_account(&state, form)
		.await
		.map_err(|error| error.redirect(SIGN_UP))?;

	Ok(signed_up(&pkce))
}

/// Moves the sign-up wizard one step, submitting the registration from its last step.
pub async fn sign_up_step(
	State(state): State<AppState>,
	Form(form): Form<model::StepForm>,
) -> Response {
	let step = form
		.step
		.parse()
		.ok()
		.and_then(Step::from_number)
		.unwrap_or_default();
	let event = if form.intent == "back" {
		Event::Back
	} else {
		Event::Next
	};

	let availability = if step == Step::Credentials && event == Event::Next {
		username::check(state.backend.as_ref(), form.draft.username.trim())
			.await
			.unwrap_or_else(|error| {
				tracing::warn!(%error, "username check failed");
				Availability::Unknown
			})
	} else {
		Availability::Unknown
	};

	let mut wizard = Wizard::resume(step, form.draft, availability);
	let provider = provider_label(&state.config.oauth_provider);

	let message = match wizard.apply(event) {
		Transition::Submit(form) => match create_account(&state, form).await {
			Ok(pkce) => return signed_up(&pkce),
			Err(error) => {
				error.log(SIGN_UP);
				FormMessage::Error(error.message().into_owned())
			}
		},
		Transition::Blocked(blocker) => FormMessage::Error(blocker.to_string()),
		Transition::Moved { .. } | Transition::Ignored => FormMessage::None,
	};

	page::sign_up::render(&wizard, &message, &provider).into_response()
}

/// Sign in
/// Signs in with an email and password, setting the session cookie.
pub async fn sign_in(
	State(backend): State<SharedBackend>,
	Form(form): Form<model::SignInForm>,
) -> Result<Response, EncodedRedirect> {
	let input = model::SignInInput::from(form);

	if input.validate().is_err() {
		return Err(Error::InvalidCredentials.redirect(SIGN_IN));
	}

	let session = backend
		.sign_in_with_password(&input.email, &input.password)
		.await
		.map_err(|error| match error {
			backend::Error::InvalidCredentials => Error::InvalidCredentials,
			error => Error::Backend(error),
		})
		.map_err(|error| error.redirect(SIGN_IN))?;

	let cookie = session::create_cookie(&session.access_token);

	Ok(([(header::SET_COOKIE, cookie.to_string())], Redirect::to(PROTECTED)).into_response())
}

/// Forgot password
/// Sends a password reset link, which leads back through `/auth/callback`.
pub async fn forgot_password(
	State(backend): State<SharedBackend>,
	State(config): State<Arc<Config>>,
	Form(form): Form<model::ForgotPasswordForm>,
) -> Result<Response, EncodedRedirect> {
	let email = present(form.email.map(|email| email.trim().to_owned()))
		.ok_or_else(|| Error::EmailRequired.redirect(FORGOT_PASSWORD))?;
	let pkce = Pkce::generate();

	backend
		.reset_password_for_email(&email, &config.callback_url(Some(RESET_PASSWORD)), &pkce)
		.await
		.map_err(|error| Error::ResetFailed(error).redirect(FORGOT_PASSWORD))?;

	let cookie = [(
		header::SET_COOKIE,
		session::verifier_cookie(pkce.verifier()).to_string(),
	)];

	match present(form.callback_url).filter(|target| is_local_path(target)) {
		Some(target) => Ok((cookie, Redirect::to(&target)).into_response()),
		None => Ok((cookie, redirect::success(FORGOT_PASSWORD, RESET_EMAIL_SENT)).into_response()),
	}
}

/// Reset password
/// Sets a new password for the signed-in account. Stops at the first failed check.
pub async fn reset_password(
	State(backend): State<SharedBackend>,
	session: Session,
	Form(form): Form<model::ResetPasswordForm>,
) -> Result<EncodedRedirect, EncodedRedirect> {
	let (Some(password), Some(confirm_password)) =
		(present(form.password), present(form.confirm_password))
	else {
		return Err(Error::PasswordRequired.redirect(RESET_PASSWORD));
	};

	if password != confirm_password {
		return Err(Error::PasswordMismatch.redirect(RESET_PASSWORD));
	}

	backend
		.update_password(&session.token, &password)
		.await
		.map_err(|error| Error::PasswordUpdateFailed(error).redirect(RESET_PASSWORD))?;

	Ok(redirect::success(RESET_PASSWORD, "Password updated"))
}

/// Sign out
/// Ends the backend session, if any, and clears the session cookie.
pub async fn sign_out(State(backend): State<SharedBackend>, session: Option<Session>) -> Response {
	if let Some(session) = session {
		if let Err(error) = backend.sign_out(&session.token).await {
			tracing::warn!(%error, "backend sign-out failed");
		}
	}

	(
		[(header::SET_COOKIE, session::clear_cookie().to_string())],
		Redirect::to(SIGN_IN),
	)
		.into_response()
}

/// OAuth sign-in
/// Sends the browser to the provider, keeping the PKCE verifier in a cookie.
pub async fn oauth_login(
	State(backend): State<SharedBackend>,
	State(config): State<Arc<Config>>,
	Form(form): Form<model::OAuthForm>,
) -> Result<Response, EncodedRedirect> {
	let provider = present(form.provider).unwrap_or_else(|| config.oauth_provider.clone());
	let pkce = Pkce::generate();

	let url = backend
		.oauth_url(&provider, &config.callback_url(None), &pkce)
		.ok_or_else(|| Error::NoAuthorizationUrl(provider_label(&provider)).redirect(SIGN_IN))?;

	Ok((
		[(
			header::SET_COOKIE,
			session::verifier_cookie(pkce.verifier()).to_string(),
		)],
		Redirect::to(&url),
	)
		.into_response())
}

/// Auth callback
/// Exchanges the code from an emailed link or an OAuth provider for a session.
pub async fn callback(
	State(backend): State<SharedBackend>,
	headers: HeaderMap,
	axum::extract::Query(query): axum::extract::Query<model::CallbackQuery>,
) -> Result<Response, EncodedRedirect> {
	if let Some(description) = query.error_description {
		return Err(Error::Callback(description).redirect(SIGN_IN));
	}

	let code = present(query.code)
		.ok_or_else(|| Error::Callback("Missing authorization code".into()).redirect(SIGN_IN))?;
	let verifier = session::find(&headers, session::VERIFIER_COOKIE_NAME).ok_or_else(|| {
		Error::Callback("This link has expired, please try again".into()).redirect(SIGN_IN)
	})?;

	let auth = backend
		.exchange_code(&code, &verifier)
		.await
		.map_err(|error| Error::Backend(error).redirect(SIGN_IN))?;

	let target = query
		.redirect_to
		.filter(|target| is_local_path(target))
		.unwrap_or_else(|| PROTECTED.to_owned());

	Ok((
		AppendHeaders([
			(
				header::SET_COOKIE,
				session::create_cookie(&auth.access_token).to_string(),
			),
			(
				header::SET_COOKIE,
				session::clear_verifier_cookie().to_string(),
			),
		]),
		Redirect::to(&target),
	)
		.into_response())
}

/// Username availability
/// Reports whether a username could be registered right now.
pub async fn username_availability(
	State(backend): State<SharedBackend>,
	Query(query): Query<model::UsernameQuery>,
) -> Result<Json<model::UsernameAvailability>, crate::Error> {
	let name = query.username.trim().to_owned();
	let status = username::check(backend.as_ref(), &name).await?;

	Ok(Json(model::UsernameAvailability::new(name, status)))
}
