use std::sync::Arc;

use axum::{
	extract::{multipart::MultipartRejection, Multipart, State},
	http::{header, HeaderMap},
	response::{Html, IntoResponse, Response},
	Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
	backend::SharedBackend,
	config::Config,
	error,
	extract::Session,
	model::{FeedPost, NewPost},
	page,
	redirect::{self, FormMessage},
};

use super::{model, Cleanup, Error, CREATE, FEED};

const POST_CREATED: &str = "Post created";

/// Feed
/// Lists posts with their author, in the order the backend returns them.
pub async fn feed(
	State(backend): State<SharedBackend>,
	State(config): State<Arc<Config>>,
	session: Session,
	message: FormMessage,
) -> Html<String> {
	match backend.posts(&session.token).await {
		Ok(posts) => {
			let posts = posts
				.into_iter()
				.map(|post| FeedPost {
					image_url: backend.public_url(&config.storage_bucket, &post.image),
					post,
				})
				.collect::<Vec<_>>();

			page::feed::render(&posts, &message)
		}
		Err(error) => {
			tracing::error!(%error, "could not load posts");

			page::feed::render(&[], &FormMessage::Error("Could not load posts".into()))
		}
	}
}

pub async fn create_page(_session: Session, message: FormMessage) -> Html<String> {
	page::post::create(&message)
}

/// Whether the client asked for a page rather than a JSON result.
fn wants_html(headers: &HeaderMap) -> bool {
	headers
		.get(header::ACCEPT)
		.and_then(|accept| accept.to_str().ok())
		.is_some_and(|accept| accept.contains("text/html"))
}

/// Create post
/// Uploads the image, then inserts the post pointing at it. If the insert
/// fails, the image is removed again.
///
/// Browsers submitting the composer are redirected with a message. Other
/// clients get a [`model::CreatePostResult`].
pub async fn create_post(
	State(backend): State<SharedBackend>,
	State(config): State<Arc<Config>>,
	session: Session,
	headers: HeaderMap,
	multipart: Result<Multipart, MultipartRejection>,
) -> Response {
	let result = match multipart {
		Ok(mut multipart) => create(&backend, &config, &session, &mut multipart).await,
		Err(rejection) => Err(Error::Rejected(rejection)),
	};

	match (result, wants_html(&headers)) {
		(Ok(()), false) => Json(model::CreatePostResult::created()).into_response(),
		(Ok(()), true) => redirect::success(FEED, POST_CREATED).into_response(),
		(Err(error), false) => error.into_response(),
		(Err(error), true) => {
			error.log();
			redirect::error(CREATE, &error.to_string()).into_response()
		}
	}
}

async fn create(
	backend: &SharedBackend,
	config: &Config,
	session: &Session,
	multipart: &mut Multipart,
) -> Result<(), Error> {
	let input = model::CreatePostInput::from_multipart(multipart).await?;

	input
		.validate()
		.map_err(|errors| Error::Validation(error::messages(&errors, model::FIELDS).join(", ")))?;

	let extension = input.file.extension().unwrap_or_else(|| "img".into());
	let path = format!("images/{}.{extension}", Uuid::new_v4());
	let bucket = config.storage_bucket.as_str();

	backend
		.upload(
			&session.token,
			bucket,
			&path,
			&input.file.content_type,
			input.file.bytes,
		)
		.await
		.map_err(Error::Storage)?;

	let post = NewPost {
		title: input.title,
		description: input.description,
		location: input.location,
		image: path,
		author_id: session.user.id,
	};

	if let Err(source) = backend.insert_post(&session.token, &post).await {
		let cleanup = match backend.remove(&session.token, bucket, &post.image).await {
			Ok(()) => Cleanup::Removed,
			Err(error) => Cleanup::Failed(error),
		};

		return Err(Error::Insert { source, cleanup });
	}

	tracing::info!(path = %post.image, author = %post.author_id, "post created");

	Ok(())
}
