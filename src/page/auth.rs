use axum::response::Html;
use maud::html;

use super::{layout, message_box};
use crate::redirect::FormMessage;

/// `provider` is the display name of the OAuth provider offered below the form.
pub fn sign_in(message: &FormMessage, provider: &str) -> Html<String> {
	let content = html! {
		form.auth method="post" action="/sign-in" {
			h1 { "Sniff around" br; "your furry feed." }
			label for="email" { "Email address" }
			input id="email" type="email" name="email" placeholder="Example: whiskers@meowmail.com" required;
			label for="password" { "Password" }
			input id="password" type="password" name="password" placeholder="Enter your secret paw-sword" required;
			a href="/forgot-password" { "Forgot password?" }
			a href="/sign-up" { "Haven't created your account yet? Sign up" }
			button type="submit" { "Log in" }
			(message_box(message))
		}
		form.oauth method="post" action="/auth/oauth" {
			button type="submit" { "Log in with " (provider) }
		}
	};

	layout("Sign in", false, &content)
}

pub fn forgot_password(message: &FormMessage) -> Html<String> {
	let content = html! {
		form.auth method="post" action="/forgot-password" {
			h1 { "Reset Password" }
			p {
				"Already have an account? "
				a href="/sign-in" { "Sign in" }
			}
			label for="email" { "Email" }
			input id="email" type="email" name="email" placeholder="you@example.com" required;
			button type="submit" { "Send reset link" }
			(message_box(message))
		}
	};

	layout("Forgot password", false, &content)
}

pub fn reset_password(message: &FormMessage) -> Html<String> {
	let content = html! {
		form.auth method="post" action="/protected/reset-password" {
			h1 { "Reset password" }
			p { "Please enter your new password below." }
			label for="password" { "New password" }
			input id="password" type="password" name="password" placeholder="New password" required;
			label for="confirmPassword" { "Confirm password" }
			input id="confirmPassword" type="password" name="confirmPassword" placeholder="Confirm password" required;
			button type="submit" { "Reset password" }
			(message_box(message))
		}
	};

	layout("Reset password", true, &content)
}
