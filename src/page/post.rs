use axum::response::Html;
use maud::html;

use super::{layout, message_box};
use crate::{redirect::FormMessage, route::post::CREATE};

/// The composer. It posts `multipart/form-data`, and the browser comes back
/// here with a message if the post could not be created.
pub fn create(message: &FormMessage) -> Html<String> {
	let content = html! {
		h1 { "Create post" }
		form.composer method="post" action=(CREATE) enctype="multipart/form-data" {
			label for="file" { "Photo" }
			input id="file" type="file" name="file" accept="image/*" required;
			label for="title" { "Title" }
			input id="title" type="text" name="title" placeholder="Give your post a title"
				minlength="5" maxlength="100" required;
			label for="description" { "Description" }
			textarea id="description" name="description" maxlength="500"
				placeholder="Tell us about this moment" {}
			label for="location" { "Location" }
			input id="location" type="text" name="location" maxlength="100"
				placeholder="Where was this taken?" required;
			button type="submit" { "Share" }
			(message_box(message))
		}
	};

	layout("Create post", true, &content)
}
