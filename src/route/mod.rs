use axum::{response::Html, routing::get, Router};

use crate::{page, AppState};

pub mod auth;
pub mod post;

async fn home() -> Html<String> {
	page::home()
}

pub fn routes() -> Router<AppState> {
	Router::new()
		.route("/", get(home))
		.merge(auth::routes())
		.merge(post::routes())
}
