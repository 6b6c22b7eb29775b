use serde::Serialize;

use crate::backend::{self, Backend};

/// Names nobody may register, compared case-insensitively.
pub const RESERVED: [&str; 6] = ["admin", "test", "user", "pet", "cat", "dog"];

pub const MIN_LENGTH: usize = 3;
pub const MAX_LENGTH: usize = 30;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Availability {
	#[default]
	Unknown,
	Checking,
	Available,
	Taken,
	Invalid,
}

/// 3 to 30 characters out of ASCII letters, digits and `_`.
pub fn is_well_formed(name: &str) -> bool {
	(MIN_LENGTH..=MAX_LENGTH).contains(&name.chars().count())
		&& name
			.chars()
			.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

pub fn is_reserved(name: &str) -> bool {
	RESERVED
		.iter()
		.any(|reserved| reserved.eq_ignore_ascii_case(name))
}

/// Whether `name` could be registered right now.
///
/// This is advisory: the backend's unique constraint decides at sign-up.
pub async fn check(backend: &dyn Backend, name: &str) -> Result<Availability, backend::Error> {
	if !is_well_formed(name) {
		return Ok(Availability::Invalid);
	}

	if is_reserved(name) {
		return Ok(Availability::Taken);
	}

	Ok(match backend.find_profile(name).await? {
		Some(_) => Availability::Taken,
		None => Availability::Available,
	})
}

#[cfg(test)]
mod test {
	use super::*;
	use crate::{backend::MemoryBackend, test::register};

	#[test]
	fn test_well_formed() {
		assert!(is_well_formed("rex_the_dog"));
		assert!(!is_well_formed("ab"));
		assert!(!is_well_formed(&"a".repeat(31)));
		assert!(!is_well_formed("rex!"));
		assert!(!is_well_formed("rëx"));
	}

	#[tokio::test]
	async fn test_check() {
		let backend = MemoryBackend::new("http://localhost:3000", []);

		register(&backend, "rex", "rex@petzli.dev").await;

		assert_eq!(check(&backend, "Admin").await.unwrap(), Availability::Taken);
		assert_eq!(check(&backend, "rex").await.unwrap(), Availability::Taken);
		assert_eq!(check(&backend, "fido").await.unwrap(), Availability::Available);
		assert_eq!(check(&backend, "a b").await.unwrap(), Availability::Invalid);
	}
}
