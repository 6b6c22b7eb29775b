//! Server-rendered pages.
//!
//! Every page goes through [`layout`], and interpolated values are escaped by
//! [`maud`].

pub mod auth;
pub mod feed;
pub mod post;
pub mod sign_up;

use axum::response::Html;
use maud::{html, Markup, DOCTYPE};

use crate::redirect::FormMessage;

const DESCRIPTION: &str = "Petzli is a social network for pet lovers to share their pets, \
	connect with other pet owners, and discover pet-related content.";

/// Wraps `content` in the document shell shared by every page.
pub fn layout(title: &str, signed_in: bool, content: &Markup) -> Html<String> {
	let markup = html! {
		(DOCTYPE)
		html lang="en" {
			head {
				meta charset="utf-8";
				meta name="viewport" content="width=device-width, initial-scale=1";
				meta name="description" content=(DESCRIPTION);
				title { (title) " | Petzli" }
			}
			body {
				header {
					nav {
						a.brand href="/" { "Petzli" }
						@if signed_in {
							a href="/protected" { "Feed" }
							a href="/protected/create" { "New post" }
							form method="post" action="/sign-out" {
								button type="submit" { "Sign out" }
							}
						} @else {
							a href="/sign-in" { "Login" }
						}
					}
				}
				main { (content) }
				footer {
					p { "Petzli, the social feed for pet lovers" }
				}
			}
		}
	};

	Html(markup.into_string())
}

/// The message a form action redirected with. Renders nothing without one.
pub fn message_box(message: &FormMessage) -> Markup {
	html! {
		@match message {
			FormMessage::None => {},
			FormMessage::Success(text) => div.message.success role="status" { (text) },
			FormMessage::Error(text) => div.message.error role="alert" { (capitalize(text)) },
			FormMessage::Message(text) => div.message.info { (text) },
		}
	}
}

fn capitalize(text: &str) -> String {
	let mut chars = text.chars();

	chars
		.next()
		.map(|first| first.to_uppercase().chain(chars).collect())
		.unwrap_or_default()
}

pub fn home() -> Html<String> {
	let content = html! {
		section.hero {
			h1 { "Welcome to Petzli" }
			p {
				"The social feed for pet lovers. Share your pet's adventures, \
				connect with other owners, and discover a world of furry friends."
			}
			a.button href="/sign-up" { "Get Started" }
			a.button.outline href="/sign-in" { "Sign In" }
		}
		section {
			h2 { "Why Petzli?" }
			ul {
				li { "Share photos and stories of your pets" }
				li { "Connect with other pet owners" }
				li { "Discover tips and tricks for pet care" }
				li { "Safe, friendly, and fun community" }
			}
		}
	};

	layout("Pet Social Network", false, &content)
}

#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn test_message_box() {
		assert_eq!(message_box(&FormMessage::None).into_string(), "");

		let html = message_box(&FormMessage::Error("<b>passwords</b> differ".into())).into_string();

		assert!(html.contains("&lt;b&gt;passwords&lt;/b&gt; differ"));
		assert!(html.contains(r#"role="alert""#));

		let html = message_box(&FormMessage::Error("passwords differ".into())).into_string();

		assert!(html.contains("Passwords differ"));
	}
}
