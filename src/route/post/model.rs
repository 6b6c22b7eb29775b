use axum::{
	body::Bytes,
	extract::{multipart::MultipartError, Multipart},
};
use serde::Serialize;
use validator::{Validate, ValidationError};

/// Uploads must be strictly smaller than this.
pub const MAX_FILE_SIZE: usize = 5 * 1024 * 1024;

fn invalid(code: &'static str, message: &'static str) -> ValidationError {
	let mut error = ValidationError::new(code);

	error.message = Some(message.into());
	error
}

/// A file received from a multipart form.
#[derive(Clone, Debug, Default, Serialize)]
pub struct Upload {
	pub file_name: String,
	pub content_type: String,
	pub bytes: Bytes,
}

impl Upload {
	pub fn is_image(&self) -> bool {
		self.content_type.starts_with("image/")
	}

	/// The lowercased extension of the file name, or the MIME subtype when the
	/// name has none.
	pub fn extension(&self) -> Option<String> {
		let from_name = self
			.file_name
			.rsplit_once('.')
			.map(|(_, extension)| extension);
		let from_type = self
			.content_type
			.strip_prefix("image/")
			.map(|subtype| subtype.split(['+', ';']).next().unwrap_or(subtype));

		from_name
			.into_iter()
			.chain(from_type)
			.find(|extension| {
				!extension.is_empty() && extension.chars().all(|c| c.is_ascii_alphanumeric())
			})
			.map(str::to_ascii_lowercase)
	}
}

fn validate_upload(upload: &Upload) -> Result<(), ValidationError> {
	if upload.bytes.is_empty() {
		return Err(invalid("file_empty", "Please upload a file"));
	}

	if upload.bytes.len() >= MAX_FILE_SIZE {
		return Err(invalid("file_size", "File size must be under 5MB"));
	}

	if !upload.is_image() {
		return Err(invalid("file_type", "File must be an image"));
	}

	Ok(())
}

fn validate_title(title: &str) -> Result<(), ValidationError> {
	match title.chars().count() {
		..=4 => Err(invalid("title_length", "Title must be at least 5 characters")),
		101.. => Err(invalid("title_length", "Title cannot exceed 100 characters")),
		_ => Ok(()),
	}
}

/// Post fields in the order their messages are reported.
pub const FIELDS: &[&str] = &["title", "description", "location", "file"];

#[derive(Debug, Validate)]
pub struct CreatePostInput {
	#[validate(custom(function = "validate_title"))]
	pub title: String,
	#[validate(length(max = 500, message = "Description cannot exceed 500 characters"))]
	pub description: Option<String>,
	#[validate(length(max = 100, message = "Location cannot exceed 100 characters"))]
	pub location: Option<String>,
	#[validate(custom(function = "validate_upload"))]
	pub file: Upload,
}

impl CreatePostInput {
	/// Reads the post fields from a multipart body. The image may be sent as
	/// `file` or `image`; unknown fields are skipped.
	pub async fn from_multipart(multipart: &mut Multipart) -> Result<Self, MultipartError> {
		let mut input = Self {
			title: String::new(),
			description: None,
			location: None,
			file: Upload::default(),
		};

		while let Some(field) = multipart.next_field().await? {
			let name = field.name().unwrap_or_default().to_owned();

			match name.as_str() {
				"title" => input.title = field.text().await?,
				"description" => input.description = non_empty(field.text().await?),
				"location" => input.location = non_empty(field.text().await?),
				"file" | "image" => {
					let file_name = field.file_name().unwrap_or_default().to_owned();
					let content_type = field.content_type().unwrap_or_default().to_owned();

					input.file = Upload {
						file_name,
						content_type,
						bytes: field.bytes().await?,
					};
				}
				_ => {}
			}
		}

		Ok(input)
	}
}

fn non_empty(value: String) -> Option<String> {
	(!value.is_empty()).then_some(value)
}

/// Where a post creation failed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
	Validation,
	Storage,
	Database,
}

#[derive(Debug, Serialize)]
pub struct Failure {
	pub stage: Stage,
	pub message: String,
	/// Whether an uploaded image was left behind in storage.
	pub orphaned: bool,
}

#[derive(Debug, Serialize)]
pub struct CreatePostResult {
	pub success: bool,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub error: Option<Failure>,
}

impl CreatePostResult {
	pub fn created() -> Self {
		Self {
			success: true,
			error: None,
		}
	}

	pub fn failed(failure: Failure) -> Self {
		Self {
			success: false,
			error: Some(failure),
		}
	}
}
