//! Debounced username availability, as a client of the credentials step runs it.
//!
//! The served wizard checks availability once per submitted step. This model
//! is for clients that check while the user types, such as a script behind the
//! `data-availability` endpoint on the username input. The server never builds
//! one itself.

use std::{sync::Arc, time::Duration};

use tokio::sync::watch;

use crate::{
	backend::SharedBackend,
	debounce::Debouncer,
	username::{self, Availability},
};

/// Live username availability for the credentials step.
///
/// Every keystroke goes through [`UsernameProbe::input`]; only the check for
/// the latest text reaches subscribers.
pub struct UsernameProbe {
	backend: SharedBackend,
	debouncer: Debouncer<String, Availability>,
}

impl UsernameProbe {
	pub const DELAY: Duration = Duration::from_millis(500);

	pub fn new(backend: SharedBackend) -> Self {
		Self {
			backend,
			debouncer: Debouncer::new(Self::DELAY),
		}
	}

	pub fn subscribe(&self) -> watch::Receiver<Option<(String, Availability)>> {
		self.debouncer.subscribe()
	}

	pub fn input(&mut self, text: &str) {
		let name = text
			.chars()
			.filter(|c| !c.is_whitespace())
			.collect::<String>();

		if !username::is_well_formed(&name) {
			self.debouncer.resolve(name, Availability::Invalid);
			return;
		}

		self.debouncer.resolve(name.clone(), Availability::Checking);

		let backend = Arc::clone(&self.backend);
		let key = name.clone();

		self.debouncer.schedule(name, async move {
			username::check(backend.as_ref(), &key)
				.await
				.unwrap_or_else(|error| {
					tracing::warn!(%error, username = %key, "username check failed");
					Availability::Unknown
				})
		});
	}
}
