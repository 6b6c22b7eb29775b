use axum::response::Html;
use chrono::{DateTime, Utc};
use maud::{html, Markup};

use super::{layout, message_box};
use crate::{model::FeedPost, redirect::FormMessage};

/// A short age like `5m` or `2w`.
fn ago(created_at: DateTime<Utc>, now: DateTime<Utc>) -> String {
	let elapsed = now.signed_duration_since(created_at);

	match elapsed.num_minutes() {
		..=0 => "now".into(),
		minutes @ 1..=59 => format!("{minutes}m"),
		_ => match elapsed.num_hours() {
			hours @ ..=23 => format!("{hours}h"),
			_ => match elapsed.num_days() {
				days @ ..=6 => format!("{days}d"),
				days => format!("{}w", days / 7),
			},
		},
	}
}

fn card(item: &FeedPost, now: DateTime<Utc>) -> Markup {
	let post = &item.post;
	let author = post.profiles.as_ref();
	let avatar = author.and_then(|profile| profile.avatar_url.as_deref());
	let user_name = author.map_or("unknown", |profile| profile.user_name.as_str());

	html! {
		article.post {
			header {
				@if let Some(avatar) = avatar {
					img.avatar src=(avatar) alt="User Avatar" width="26" height="26";
				} @else {
					span.avatar {}
				}
				span.author { "@" (user_name) }
				time datetime=(post.created_at.to_rfc3339()) { (ago(post.created_at, now)) }
			}
			img.image src=(item.image_url) alt=(post.title) loading="lazy";
			h2 { (post.title) }
			@if let Some(location) = &post.location {
				p.location { (location) }
			}
			@if let Some(description) = &post.description {
				p.description { (description) }
			}
		}
	}
}

pub fn render(posts: &[FeedPost], message: &FormMessage) -> Html<String> {
	let now = Utc::now();

	let content = html! {
		(message_box(message))
		@if posts.is_empty() && message.is_none() {
			p.empty {
				"No posts yet. "
				a href="/protected/create" { "Share the first one" }
			}
		}
		@for post in posts {
			(card(post, now))
		}
	};

	layout("Feed", true, &content)
}

#[cfg(test)]
mod test {
	use chrono::Duration;

	use super::*;

	#[test]
	fn test_ago() {
		let now = Utc::now();

		for (elapsed, expected) in [
			(Duration::seconds(30), "now"),
			(Duration::minutes(5), "5m"),
			(Duration::hours(3), "3h"),
			(Duration::days(2), "2d"),
			(Duration::days(15), "2w"),
		] {
			assert_eq!(ago(now - elapsed, now), expected);
		}
	}
}
