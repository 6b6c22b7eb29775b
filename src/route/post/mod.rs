use axum::{
	body::Body,
	extract::{
		multipart::{MultipartError, MultipartRejection},
		DefaultBodyLimit,
	},
	http::{Response, StatusCode},
	response::IntoResponse,
	routing::get,
	Json, Router,
};

use crate::{backend, AppState};

pub mod draft;
pub mod model;
pub mod route;

pub const FEED: &str = "/protected";
pub const CREATE: &str = "/protected/create";

/// Room for a full-size image plus the text fields.
const BODY_LIMIT: usize = 8 * 1024 * 1024;

/// What happened to the uploaded image after the insert failed.
#[derive(Debug)]
pub enum Cleanup {
	Removed,
	Failed(backend::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("{0}")]
	Validation(String),
	#[error("Could not read the form: {0}")]
	Multipart(#[from] MultipartError),
	#[error("Could not read the form: {0}")]
	Rejected(#[from] MultipartRejection),
	#[error("Could not upload the image: {0}")]
	Storage(#[source] backend::Error),
	#[error("Could not save the post: {source}")]
	Insert {
		source: backend::Error,
		cleanup: Cleanup,
	},
}

impl Error {
	pub fn stage(&self) -> model::Stage {
		match self {
			Self::Validation(..) | Self::Multipart(..) | Self::Rejected(..) => model::Stage::Validation,
			Self::Storage(..) => model::Stage::Storage,
			Self::Insert { .. } => model::Stage::Database,
		}
	}

	/// Whether the uploaded image is still in storage with no post pointing at it.
	pub fn orphaned(&self) -> bool {
		matches!(
			self,
			Self::Insert {
				cleanup: Cleanup::Failed(..),
				..
			}
		)
	}

	fn status(&self) -> StatusCode {
		match self.stage() {
			model::Stage::Validation => StatusCode::BAD_REQUEST,
			model::Stage::Storage | model::Stage::Database => StatusCode::BAD_GATEWAY,
		}
	}

	pub fn log(&self) {
		match self {
			Self::Insert {
				cleanup: Cleanup::Failed(cleanup),
				..
			} => {
				tracing::error!(error = %self, %cleanup, "post failed and its image was orphaned");
			}
			_ if self.stage() == model::Stage::Validation => {
				tracing::warn!(error = %self, "post rejected");
			}
			_ => tracing::error!(error = %self, "post failed"),
		}
	}
}

impl IntoResponse for Error {
	fn into_response(self) -> Response<Body> {
		self.log();

		let status = self.status();
		let failure = model::Failure {
			stage: self.stage(),
			orphaned: self.orphaned(),
			message: self.to_string(),
		};

		(status, Json(model::CreatePostResult::failed(failure))).into_response()
	}
}

pub fn routes() -> Router<AppState> {
	use route::*;

	Router::new()
		.route(FEED, get(feed))
		.route(
			CREATE,
			get(create_page)
				.post(create_post)
				.layer(DefaultBodyLimit::max(BODY_LIMIT)),
		)
}
