//! State of the post composer on the create page.
//!
//! The composer keeps one local preview of the chosen image. Previews are
//! handles from an [`ObjectUrls`] source (object URLs in a browser), and a
//! handle is revoked before its replacement is created, so at most one is
//! ever live.
//!
//! This is a model for the client side of the composer. The server only sees
//! the finished multipart form, so nothing in the router builds a draft.

use std::fmt;

use super::model::Upload;

/// Creates and releases preview handles for local files.
pub trait ObjectUrls {
	type Handle;

	fn create(&mut self, file: &Upload) -> Self::Handle;
	fn revoke(&mut self, handle: Self::Handle);
}

#[derive(Debug, PartialEq, Eq)]
pub enum DraftError {
	Unsupported,
	InFlight,
	Incomplete(Vec<&'static str>),
}

impl fmt::Display for DraftError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Unsupported => f.write_str("Unsupported file"),
			Self::InFlight => f.write_str("A post is already being submitted"),
			Self::Incomplete(problems) => f.write_str(&problems.join(" ")),
		}
	}
}

impl std::error::Error for DraftError {}

/// What the composer shows once a submission went through.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Submitted {
	pub title: String,
	pub location: String,
	pub image_name: String,
}

pub struct PostDraft<U: ObjectUrls> {
	urls: U,
	title: String,
	location: String,
	file: Option<Upload>,
	preview: Option<U::Handle>,
	submitting: bool,
	submitted: Option<Submitted>,
}

impl<U: ObjectUrls> PostDraft<U> {
	pub fn new(urls: U) -> Self {
		Self {
			urls,
			title: String::new(),
			location: String::new(),
			file: None,
			preview: None,
			submitting: false,
			submitted: None,
		}
	}

	pub fn set_title(&mut self, title: impl Into<String>) {
		self.title = title.into();
	}

	pub fn set_location(&mut self, location: impl Into<String>) {
		self.location = location.into();
	}

	/// Fills the location with coordinates, as "use my location" does.
	pub fn use_coordinates(&mut self, latitude: f64, longitude: f64) {
		self.location = format!("{latitude:.6}, {longitude:.6}");
	}

	/// Takes a picked or dropped file, replacing the previous one and its preview.
	pub fn accept(&mut self, file: Upload) -> Result<(), DraftError> {
		if !file.is_image() {
			return Err(DraftError::Unsupported);
		}

		if let Some(previous) = self.preview.take() {
			self.urls.revoke(previous);
		}

		self.preview = Some(self.urls.create(&file));
		self.file = Some(file);

		Ok(())
	}

	pub fn preview(&self) -> Option<&U::Handle> {
		self.preview.as_ref()
	}

	pub fn location(&self) -> &str {
		&self.location
	}

	pub fn is_submitting(&self) -> bool {
		self.submitting
	}

	pub fn submitted(&self) -> Option<&Submitted> {
		self.submitted.as_ref()
	}

	/// Problems to fix before the post can be sent.
	pub fn check(&self) -> Vec<&'static str> {
		let mut problems = Vec::new();

		if self.title.trim().is_empty() {
			problems.push("Title is required.");
		}

		if self.location.trim().is_empty() {
			problems.push("Location is required.");
		}

		if self.file.is_none() {
			problems.push("An image is required.");
		}

		problems
	}

	pub fn begin_submit(&mut self) -> Result<(), DraftError> {
		if self.submitting {
			return Err(DraftError::InFlight);
		}

		self.submitted = None;

		let problems = self.check();

		if !problems.is_empty() {
			return Err(DraftError::Incomplete(problems));
		}

		self.submitting = true;
		Ok(())
	}

	pub fn finish_submit(&mut self) -> Option<&Submitted> {
		if !self.submitting {
			return None;
		}

		self.submitting = false;
		self.submitted = Some(Submitted {
			title: self.title.trim().to_owned(),
			location: self.location.trim().to_owned(),
			image_name: self
				.file
				.as_ref()
				.map_or_else(|| "image".to_owned(), |file| file.file_name.clone()),
		});

		self.submitted.as_ref()
	}

	/// Drops the file and revokes its preview.
	pub fn clear(&mut self) {
		if let Some(preview) = self.preview.take() {
			self.urls.revoke(preview);
		}

		self.file = None;
	}
}

impl<U: ObjectUrls> Drop for PostDraft<U> {
	fn drop(&mut self) {
		self.clear();
	}
}

#[cfg(test)]
mod test {
	use std::{cell::RefCell, rc::Rc};

	use axum::body::Bytes;

	use super::*;

	#[derive(Default)]
	struct Log {
		next: u32,
		live: Vec<u32>,
		events: Vec<String>,
	}

	#[derive(Clone, Default)]
	struct Urls(Rc<RefCell<Log>>);

	impl ObjectUrls for Urls {
		type Handle = u32;

		fn create(&mut self, file: &Upload) -> u32 {
			let mut log = self.0.borrow_mut();

			log.next += 1;

			let handle = log.next;

			log.live.push(handle);
			log.events.push(format!("create {handle} {}", file.file_name));
			handle
		}

		fn revoke(&mut self, handle: u32) {
			let mut log = self.0.borrow_mut();

			log.live.retain(|live| *live != handle);
			log.events.push(format!("revoke {handle}"));
		}
	}

	fn upload(name: &str, content_type: &str) -> Upload {
		Upload {
			file_name: name.into(),
			content_type: content_type.into(),
			bytes: Bytes::from_static(b"data"),
		}
	}

	#[test]
	fn test_previous_preview_is_revoked_first() {
		let urls = Urls::default();
		let mut draft = PostDraft::new(urls.clone());

		draft.accept(upload("a.png", "image/png")).unwrap();
		draft.accept(upload("b.png", "image/png")).unwrap();

		assert_eq!(draft.preview(), Some(&2));
		assert_eq!(urls.0.borrow().events, ["create 1 a.png", "revoke 1", "create 2 b.png"]);
		assert_eq!(urls.0.borrow().live, [2]);

		drop(draft);

		assert!(urls.0.borrow().live.is_empty());
	}

	#[test]
	fn test_unsupported_file_keeps_the_preview() {
		let urls = Urls::default();
		let mut draft = PostDraft::new(urls.clone());

		draft.accept(upload("a.png", "image/png")).unwrap();

		assert_eq!(
			draft.accept(upload("notes.txt", "text/plain")),
			Err(DraftError::Unsupported)
		);
		assert_eq!(draft.preview(), Some(&1));
	}

	#[test]
	fn test_submit_guard() {
		let mut draft = PostDraft::new(Urls::default());

		assert_eq!(
			draft.begin_submit(),
			Err(DraftError::Incomplete(vec![
				"Title is required.",
				"Location is required.",
				"An image is required."
			]))
		);

		draft.set_title(" Rex at the beach ");
		draft.use_coordinates(50.822_53, -0.137_163);
		draft.accept(upload("rex.png", "image/png")).unwrap();

		assert_eq!(draft.location(), "50.822530, -0.137163");

		draft.begin_submit().unwrap();
		assert_eq!(draft.begin_submit(), Err(DraftError::InFlight));

		let submitted = draft.finish_submit().cloned().unwrap();

		assert_eq!(submitted.title, "Rex at the beach");
		assert_eq!(submitted.image_name, "rex.png");
		assert!(!draft.is_submitting());
		assert_eq!(draft.finish_submit(), None);
	}
}
